use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::camera::PerspectiveCamera;
use crate::core::gpu_context::GpuContext;
use crate::core::viewport::CanvasId;
use crate::error::DeviceError;
use crate::lifecycle::ViewerStatus;
use crate::loaders::RadianceMap;
use crate::overlay::Overlay;
use crate::scene::Scene;
use crate::traits::{RenderBackend, RenderDevice};
use crate::types::{CameraUniform, EnvironmentUniform, LineVertex, MeshVertex};
use crate::window::WindowSurface;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const RADIANCE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.06,
    a: 1.0,
};

/// Creates [`WgpuDevice`]s for winit windows
#[derive(Debug, Clone, Default)]
pub struct WgpuBackend {
    pub overlay: bool,
}

impl WgpuBackend {
    pub fn new(overlay: bool) -> Self {
        Self { overlay }
    }
}

impl RenderBackend for WgpuBackend {
    type Surface = WindowSurface;
    type Device = WgpuDevice;

    fn initialize(&mut self, surface: &WindowSurface) -> Result<WgpuDevice, DeviceError> {
        pollster::block_on(WgpuDevice::new(surface.inner().clone(), self.overlay))
    }
}

struct MeshBuffers {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_count: u32,
}

struct LineBuffer {
    vertices: wgpu::Buffer,
    vertex_count: u32,
}

/// Environment currently uploaded to the GPU
struct RadianceTexture {
    source: Option<Arc<RadianceMap>>,
    view: wgpu::TextureView,
    max_mip: f32,
}

/// wgpu rendering context bound to one window
pub struct WgpuDevice {
    canvas: CanvasId,
    window: Arc<Window>,
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    depth_view: wgpu::TextureView,
    pixel_ratio: f64,

    camera_buffer: wgpu::Buffer,
    environment_buffer: wgpu::Buffer,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    radiance: RadianceTexture,

    background_pipeline: wgpu::RenderPipeline,
    mesh_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,

    meshes: Vec<MeshBuffers>,
    lines: Option<LineBuffer>,
    synced_revision: Option<u64>,

    overlay: Option<Overlay>,
    status: Option<ViewerStatus>,
}

impl WgpuDevice {
    pub async fn new(window: Arc<Window>, overlay: bool) -> Result<Self, DeviceError> {
        let size = window.inner_size();

        let instance = GpuContext::instance();
        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| DeviceError::CreateSurface(e.to_string()))?;
        let gpu = GpuContext::new_with_surface(&instance, &surface).await?;

        let surface_config = gpu.surface_config(&surface, size.width, size.height)?;
        surface.configure(gpu.device(), &surface_config);

        let device = gpu.device();
        let depth_view = Self::create_depth_view(device, &surface_config);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera Buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let environment_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Environment Buffer"),
            contents: bytemuck::cast_slice(&[EnvironmentUniform::default()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Radiance Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let bind_group_layout = Self::create_bind_group_layout(device);
        let radiance = Self::placeholder_radiance(gpu.device(), gpu.queue());
        let bind_group = Self::create_bind_group(
            device,
            &bind_group_layout,
            &camera_buffer,
            &environment_buffer,
            &radiance.view,
            &sampler,
        );

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let format = surface_config.format;
        let background_pipeline = Self::create_pipeline(
            device,
            &pipeline_layout,
            PipelineKind::Background,
            format,
        );
        let mesh_pipeline =
            Self::create_pipeline(device, &pipeline_layout, PipelineKind::Mesh, format);
        let line_pipeline =
            Self::create_pipeline(device, &pipeline_layout, PipelineKind::Lines, format);

        let overlay = overlay.then(|| Overlay::new(device, format, &window));

        log::info!(
            "Render device ready: {}x{} {:?}",
            surface_config.width,
            surface_config.height,
            format
        );

        Ok(Self {
            canvas: CanvasId::next(),
            window,
            gpu,
            surface,
            surface_config,
            depth_view,
            pixel_ratio: 1.0,
            camera_buffer,
            environment_buffer,
            bind_group_layout,
            bind_group,
            sampler,
            radiance,
            background_pipeline,
            mesh_pipeline,
            line_pipeline,
            meshes: Vec::new(),
            lines: None,
            synced_revision: None,
            overlay,
            status: None,
        })
    }

    /// Give the overlay first look at a window event.
    /// Returns true when it consumed the event.
    pub fn handle_window_event(&mut self, event: &winit::event::WindowEvent) -> bool {
        match self.overlay.as_mut() {
            Some(overlay) => overlay.handle_event(&self.window, event),
            None => false,
        }
    }

    pub fn pixel_ratio(&self) -> f64 {
        self.pixel_ratio
    }

    fn create_depth_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        let uniform = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                uniform(0),
                uniform(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
            label: Some("scene_bind_group_layout"),
        })
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        camera_buffer: &wgpu::Buffer,
        environment_buffer: &wgpu::Buffer,
        radiance_view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: environment_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(radiance_view),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some("scene_bind_group"),
        })
    }

    /// 1x1 black texture bound until an environment arrives
    fn placeholder_radiance(device: &wgpu::Device, queue: &wgpu::Queue) -> RadianceTexture {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Radiance Placeholder"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: RADIANCE_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0u8; 8],
        );

        RadianceTexture {
            source: None,
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            max_mip: 0.0,
        }
    }

    /// Upload every mip level of a radiance map as RGBA16F
    fn upload_radiance(&self, map: &Arc<RadianceMap>) -> RadianceTexture {
        let base = map.base();
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("Radiance Map"),
            size: wgpu::Extent3d {
                width: base.width,
                height: base.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: map.mip_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RADIANCE_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (mip, level) in map.levels().iter().enumerate() {
            // f16 has no Pod impl; pack little-endian bytes directly
            let bytes: Vec<u8> = level
                .texels
                .iter()
                .flat_map(|texel| texel.iter())
                .flat_map(|&c| half::f16::from_f32(c).to_le_bytes())
                .collect();

            self.gpu.queue().write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: mip as u32,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &bytes,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(level.width * 8),
                    rows_per_image: Some(level.height),
                },
                wgpu::Extent3d {
                    width: level.width,
                    height: level.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        log::debug!(
            "Uploaded radiance map {}x{} with {} mips",
            base.width,
            base.height,
            map.mip_count()
        );

        RadianceTexture {
            source: Some(map.clone()),
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            max_mip: (map.mip_count() - 1) as f32,
        }
    }

    fn create_pipeline(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        kind: PipelineKind,
        surface_format: wgpu::TextureFormat,
    ) -> wgpu::RenderPipeline {
        let (label, source) = match kind {
            PipelineKind::Background => ("Background Pipeline", include_str!("background.wgsl")),
            PipelineKind::Mesh => ("Mesh Pipeline", include_str!("mesh.wgsl")),
            PipelineKind::Lines => ("Line Pipeline", include_str!("lines.wgsl")),
        };

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let buffers = match kind {
            PipelineKind::Background => vec![],
            PipelineKind::Mesh => vec![MeshVertex::layout()],
            PipelineKind::Lines => vec![LineVertex::layout()],
        };
        let topology = match kind {
            PipelineKind::Lines => wgpu::PrimitiveTopology::LineList,
            _ => wgpu::PrimitiveTopology::TriangleList,
        };
        // The sky sits behind everything and never writes depth
        let (depth_write_enabled, depth_compare) = match kind {
            PipelineKind::Background => (false, wgpu::CompareFunction::LessEqual),
            _ => (true, wgpu::CompareFunction::Less),
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &buffers,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        })
    }

    /// Bring GPU buffers in line with the scene after it changed
    fn sync_scene(&mut self, scene: &Scene) {
        if self.synced_revision == Some(scene.revision()) {
            return;
        }

        let environment_changed = match (scene.environment(), &self.radiance.source) {
            (Some(map), Some(current)) => !Arc::ptr_eq(map, current),
            (None, None) => false,
            _ => true,
        };
        if environment_changed {
            self.radiance = match scene.environment() {
                Some(map) => self.upload_radiance(map),
                None => Self::placeholder_radiance(self.gpu.device(), self.gpu.queue()),
            };
            self.bind_group = Self::create_bind_group(
                self.gpu.device(),
                &self.bind_group_layout,
                &self.camera_buffer,
                &self.environment_buffer,
                &self.radiance.view,
                &self.sampler,
            );

            let uniform = EnvironmentUniform {
                max_mip: self.radiance.max_mip,
                enabled: if self.radiance.source.is_some() { 1.0 } else { 0.0 },
                _pad: [0.0; 2],
            };
            self.gpu
                .queue()
                .write_buffer(&self.environment_buffer, 0, bytemuck::cast_slice(&[uniform]));
        }

        let device = self.gpu.device();
        self.meshes = scene
            .models()
            .flat_map(|model| model.meshes.iter())
            .filter(|mesh| !mesh.indices.is_empty())
            .map(|mesh| MeshBuffers {
                vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Vertex Buffer"),
                    contents: bytemuck::cast_slice(&mesh.vertices),
                    usage: wgpu::BufferUsages::VERTEX,
                }),
                indices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Mesh Index Buffer"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: wgpu::BufferUsages::INDEX,
                }),
                index_count: mesh.indices.len() as u32,
            })
            .collect();

        let line_vertices = scene.line_vertices();
        self.lines = (!line_vertices.is_empty()).then(|| LineBuffer {
            vertices: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Line Vertex Buffer"),
                contents: bytemuck::cast_slice(&line_vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            vertex_count: line_vertices.len() as u32,
        });

        log::debug!(
            "Synced scene revision {}: {} mesh buffers, environment {}",
            scene.revision(),
            self.meshes.len(),
            if self.radiance.source.is_some() { "installed" } else { "absent" }
        );
        self.synced_revision = Some(scene.revision());
    }

    fn reconfigure(&mut self) {
        self.surface
            .configure(self.gpu.device(), &self.surface_config);
        self.depth_view = Self::create_depth_view(self.gpu.device(), &self.surface_config);
    }
}

#[derive(Debug, Clone, Copy)]
enum PipelineKind {
    Background,
    Mesh,
    Lines,
}

impl RenderDevice for WgpuDevice {
    fn canvas(&self) -> CanvasId {
        self.canvas
    }

    fn resize(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        if (width, height) == (self.surface_config.width, self.surface_config.height) {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure();
    }

    fn set_pixel_ratio(&mut self, ratio: f64) {
        self.pixel_ratio = ratio;
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        (self.surface_config.width, self.surface_config.height)
    }

    fn set_status(&mut self, status: &ViewerStatus) {
        self.status = Some(status.clone());
    }

    fn draw_frame(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), DeviceError> {
        self.sync_scene(scene);

        self.gpu.queue().write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[camera.to_uniform()]),
        );

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated; reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            render_pass.set_bind_group(0, &self.bind_group, &[]);

            if scene.background().is_some() {
                render_pass.set_pipeline(&self.background_pipeline);
                render_pass.draw(0..3, 0..1);
            }

            render_pass.set_pipeline(&self.mesh_pipeline);
            for mesh in &self.meshes {
                render_pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                render_pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }

            if let Some(lines) = &self.lines {
                render_pass.set_pipeline(&self.line_pipeline);
                render_pass.set_vertex_buffer(0, lines.vertices.slice(..));
                render_pass.draw(0..lines.vertex_count, 0..1);
            }
        }

        if let (Some(overlay), Some(status)) = (self.overlay.as_mut(), self.status.as_ref()) {
            overlay.render(
                self.gpu.device(),
                self.gpu.queue(),
                &mut encoder,
                &view,
                &self.window,
                [self.surface_config.width, self.surface_config.height],
                self.pixel_ratio as f32,
                status,
            );
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}
