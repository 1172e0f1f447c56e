use thiserror::Error;

/// Widest base level kept after conversion; larger sources are reduced first
pub const DEFAULT_MAX_BASE_WIDTH: u32 = 1024;
/// Mip generation stops once a level is this narrow
pub const DEFAULT_MIN_LEVEL_WIDTH: u32 = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefilterError {
    #[error("equirectangular image has zero size")]
    Empty,

    #[error("expected {expected} texels for the given size, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
}

/// One level of a radiance map
#[derive(Debug, Clone, PartialEq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Surface roughness this level approximates, 0 = mirror, 1 = fully diffuse
    pub roughness: f32,
    pub texels: Vec<[f32; 4]>,
}

/// Pre-filtered, mipmapped equirectangular radiance map.
///
/// Level sizes follow GPU mip rules (`max(1, base >> level)`), so the chain
/// uploads directly as a mipmapped texture.
#[derive(Debug, Clone, PartialEq)]
pub struct RadianceMap {
    levels: Vec<MipLevel>,
}

impl RadianceMap {
    pub fn levels(&self) -> &[MipLevel] {
        &self.levels
    }

    pub fn base(&self) -> &MipLevel {
        &self.levels[0]
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }
}

/// Converts equirectangular images into [`RadianceMap`]s.
///
/// Holds scratch memory between conversions; call [`RadianceGenerator::dispose`]
/// once done to release it.
#[derive(Debug)]
pub struct RadianceGenerator {
    max_base_width: u32,
    min_level_width: u32,
    scratch: Vec<[f32; 4]>,
}

impl Default for RadianceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RadianceGenerator {
    pub fn new() -> Self {
        Self {
            max_base_width: DEFAULT_MAX_BASE_WIDTH,
            min_level_width: DEFAULT_MIN_LEVEL_WIDTH,
            scratch: Vec::new(),
        }
    }

    pub fn with_limits(max_base_width: u32, min_level_width: u32) -> Self {
        Self {
            max_base_width: max_base_width.max(1),
            min_level_width: min_level_width.max(1),
            scratch: Vec::new(),
        }
    }

    pub fn from_equirectangular(
        &mut self,
        width: u32,
        height: u32,
        texels: Vec<[f32; 4]>,
    ) -> Result<RadianceMap, PrefilterError> {
        if width == 0 || height == 0 {
            return Err(PrefilterError::Empty);
        }
        let expected = width as usize * height as usize;
        if texels.len() != expected {
            return Err(PrefilterError::SizeMismatch {
                expected,
                actual: texels.len(),
            });
        }

        let (mut w, mut h, mut base) = (width, height, texels);
        while w > self.max_base_width {
            let (next, nw, nh) = downsample(&base, w, h);
            base = next;
            w = nw;
            h = nh;
        }

        let mut levels = vec![MipLevel {
            width: w,
            height: h,
            roughness: 0.0,
            texels: base,
        }];

        while w / 2 >= self.min_level_width {
            let prev = &levels[levels.len() - 1];
            let (mut next, nw, nh) = downsample(&prev.texels, w, h);
            self.blur(&mut next, nw, nh, levels.len());
            w = nw;
            h = nh;
            levels.push(MipLevel {
                width: w,
                height: h,
                roughness: 0.0,
                texels: next,
            });
        }

        let last = (levels.len() - 1).max(1) as f32;
        for (i, level) in levels.iter_mut().enumerate() {
            level.roughness = i as f32 / last;
        }

        Ok(RadianceMap { levels })
    }

    /// Release scratch memory
    pub fn dispose(self) {
        log::debug!(
            "Radiance generator released {} scratch texels",
            self.scratch.capacity()
        );
    }

    /// Separable [1 2 1] blur, `passes` times. Wraps horizontally, clamps vertically.
    fn blur(&mut self, texels: &mut [[f32; 4]], width: u32, height: u32, passes: usize) {
        let (w, h) = (width as usize, height as usize);
        self.scratch.resize(texels.len(), [0.0; 4]);

        for _ in 0..passes {
            for y in 0..h {
                for x in 0..w {
                    let left = texels[y * w + (x + w - 1) % w];
                    let mid = texels[y * w + x];
                    let right = texels[y * w + (x + 1) % w];
                    self.scratch[y * w + x] = weighted(left, mid, right);
                }
            }
            for y in 0..h {
                for x in 0..w {
                    let up = self.scratch[y.saturating_sub(1) * w + x];
                    let mid = self.scratch[y * w + x];
                    let down = self.scratch[(y + 1).min(h - 1) * w + x];
                    texels[y * w + x] = weighted(up, mid, down);
                }
            }
        }
    }
}

fn weighted(a: [f32; 4], b: [f32; 4], c: [f32; 4]) -> [f32; 4] {
    std::array::from_fn(|i| 0.25 * a[i] + 0.5 * b[i] + 0.25 * c[i])
}

/// 2x2 box downsample, wrapping horizontally
fn downsample(src: &[[f32; 4]], width: u32, height: u32) -> (Vec<[f32; 4]>, u32, u32) {
    let (w, h) = (width as usize, height as usize);
    let nw = (w / 2).max(1);
    let nh = (h / 2).max(1);

    let mut out = Vec::with_capacity(nw * nh);
    for y in 0..nh {
        let y0 = (2 * y).min(h - 1);
        let y1 = (2 * y + 1).min(h - 1);
        for x in 0..nw {
            let x0 = (2 * x) % w;
            let x1 = (2 * x + 1) % w;
            let taps = [src[y0 * w + x0], src[y0 * w + x1], src[y1 * w + x0], src[y1 * w + x1]];
            out.push(std::array::from_fn(|i| {
                taps.iter().map(|t| t[i]).sum::<f32>() * 0.25
            }));
        }
    }
    (out, nw as u32, nh as u32)
}
