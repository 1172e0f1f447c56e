use winit::window::Window;

use crate::lifecycle::ViewerStatus;
use crate::loaders::LoadState;

/// egui diagnostics panel drawn over the rendered scene
pub struct Overlay {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

impl Overlay {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();
        let state = egui_winit::State::new(
            ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// Returns true when egui consumed the event
    pub fn handle_event(&mut self, window: &Window, event: &winit::event::WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        window: &Window,
        size_in_pixels: [u32; 2],
        pixels_per_point: f32,
        status: &ViewerStatus,
    ) {
        let raw_input = self.state.take_egui_input(window);
        let full_output = self.ctx.run(raw_input, |ctx| status_window(ctx, status));

        self.state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        for (id, image_delta) in &full_output.textures_delta.set {
            self.renderer.update_texture(device, queue, *id, image_delta);
        }

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels,
            pixels_per_point,
        };
        self.renderer
            .update_buffers(device, queue, encoder, &tris, &screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut render_pass = render_pass.forget_lifetime();
            self.renderer
                .render(&mut render_pass, &tris, &screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }
}

fn load_label(state: LoadState) -> (&'static str, egui::Color32) {
    match state {
        LoadState::Idle => ("idle", egui::Color32::GRAY),
        LoadState::Loading => ("loading", egui::Color32::from_rgb(255, 200, 100)),
        LoadState::Done => ("ready", egui::Color32::from_rgb(100, 255, 100)),
        LoadState::Failed => ("failed", egui::Color32::from_rgb(255, 100, 100)),
    }
}

fn status_window(ctx: &egui::Context, status: &ViewerStatus) {
    egui::Window::new("Viewer")
        .title_bar(true)
        .resizable(false)
        .fixed_pos(egui::pos2(10.0, 10.0))
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading(
                egui::RichText::new(format!("{:.0} FPS", status.fps))
                    .size(28.0)
                    .color(egui::Color32::from_rgb(74, 158, 255)),
            );
            let frame_time_ms = if status.fps > 0.0 { 1000.0 / status.fps } else { 0.0 };
            ui.label(
                egui::RichText::new(format!("{:.2} ms", frame_time_ms))
                    .size(14.0)
                    .color(egui::Color32::GRAY),
            );

            ui.add_space(5.0);
            ui.separator();

            ui.label(
                egui::RichText::new("Camera")
                    .size(16.0)
                    .color(egui::Color32::from_rgb(100, 200, 100)),
            );
            let p = status.camera_position;
            let t = status.camera_target;
            ui.monospace(format!("Pos:    ({:.1}, {:.1}, {:.1})", p.x, p.y, p.z));
            ui.monospace(format!("Target: ({:.1}, {:.1}, {:.1})", t.x, t.y, t.z));

            ui.add_space(5.0);
            ui.separator();

            ui.label(
                egui::RichText::new("Assets")
                    .size(16.0)
                    .color(egui::Color32::from_rgb(200, 150, 100)),
            );
            for (name, state) in [("Environment", status.environment), ("Model", status.model)] {
                let (text, color) = load_label(state);
                ui.horizontal(|ui| {
                    ui.monospace(format!("{:<12}", name));
                    ui.label(egui::RichText::new(text).monospace().color(color));
                });
            }

            ui.add_space(5.0);
            ui.separator();

            ui.monospace(format!(
                "Viewport: {}x{} @{:.2}",
                status.viewport.width, status.viewport.height, status.viewport.pixel_ratio
            ));
            ui.monospace(format!("Frame: {}", status.frame));
        });
}
