//! Mip mapped textures with scalar (trilinear) and gradient (anisotropic) filtering.
use std::path::Path;

use glam::{Vec2, Vec4};

use crate::{color::linear_from_srgb, lod::TextureLod, math::float::FloatAsExt, Error, Result};

/// Upper bound on the number of taps along the major axis of an anisotropic footprint
pub const MAX_ANISOTROPY: u32 = 16;

#[derive(Debug, Clone)]
struct MipLevel {
    width: u32,
    height: u32,
    texels: Vec<Vec4>,
}

impl MipLevel {
    fn texel(&self, x: i64, y: i64) -> Vec4 {
        // Repeat addressing
        let x = x.rem_euclid(self.width as i64) as usize;
        let y = y.rem_euclid(self.height as i64) as usize;
        self.texels[y * self.width as usize + x]
    }

    fn bilinear(&self, uv: Vec2) -> Vec4 {
        let p = uv * Vec2::new(self.width as f32, self.height as f32) - 0.5;
        let base = p.floor();
        let f = p - base;
        let (x, y) = (base.x as i64, base.y as i64);

        let top = self.texel(x, y).lerp(self.texel(x + 1, y), f.x);
        let bottom = self.texel(x, y + 1).lerp(self.texel(x + 1, y + 1), f.x);
        top.lerp(bottom, f.y)
    }

    /// 2x2 box filter, odd dimensions fold their last row/column into the previous texel
    fn downsample(&self) -> Self {
        let width = (self.width / 2).max(1);
        let height = (self.height / 2).max(1);
        let mut texels = Vec::with_capacity((width * height) as usize);
        for y in 0..height {
            for x in 0..width {
                let (x0, y0) = (2 * x as i64, 2 * y as i64);
                let x1 = (x0 + 1).min(self.width as i64 - 1);
                let y1 = (y0 + 1).min(self.height as i64 - 1);
                let sum = self.texel(x0, y0)
                    + self.texel(x1, y0)
                    + self.texel(x0, y1)
                    + self.texel(x1, y1);
                texels.push(0.25 * sum);
            }
        }
        Self {
            width,
            height,
            texels,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MipTexture {
    levels: Vec<MipLevel>,
}

impl MipTexture {
    /// Build a texture and its full mip chain from row major texels
    pub fn new(width: u32, height: u32, texels: Vec<Vec4>) -> Result<Self> {
        if width == 0 || height == 0 || texels.len() != (width * height) as usize {
            return Err(Error::InvalidTexture {
                width,
                height,
                texels: texels.len(),
            });
        }

        Ok(Self::from_base_level(MipLevel {
            width,
            height,
            texels,
        }))
    }

    fn from_base_level(base: MipLevel) -> Self {
        let mut levels = vec![base];
        while let Some(last) = levels.last().filter(|l| l.width > 1 || l.height > 1) {
            let next = last.downsample();
            levels.push(next);
        }
        Self { levels }
    }

    /// Load an image file. Color textures are stored in sRGB and are linearized, alpha is kept
    /// as is.
    pub fn from_image<P: AsRef<Path>>(path: P, srgb: bool) -> Result<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| Error::Image {
                path: path.to_owned(),
                source,
            })?
            .to_rgba32f();
        let (width, height) = image.dimensions();
        let texels = image
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                let rgb = [r, g, b].map(|c| if srgb { linear_from_srgb(c) } else { c });
                Vec4::new(rgb[0], rgb[1], rgb[2], a)
            })
            .collect();
        log::debug!("loaded texture {} ({width}x{height})", path.display());
        Self::new(width, height, texels)
    }

    /// A `size`x`size` checkerboard of `squares`x`squares` cells
    pub fn checkerboard(size: u32, squares: u32, odd: Vec4, even: Vec4) -> Self {
        let size = size.max(1);
        let cell = (size / squares.max(1)).max(1);
        let texels = (0..size * size)
            .map(|i| {
                let (x, y) = (i % size / cell, i / size / cell);
                if (x + y) % 2 == 0 {
                    even
                } else {
                    odd
                }
            })
            .collect();
        Self::from_base_level(MipLevel {
            width: size,
            height: size,
            texels,
        })
    }

    pub fn width(&self) -> u32 {
        self.levels[0].width
    }

    pub fn height(&self) -> u32 {
        self.levels[0].height
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn level_dimensions(&self, level: usize) -> Option<(u32, u32)> {
        self.levels.get(level).map(|l| (l.width, l.height))
    }

    pub fn sample(&self, uv: Vec2, lod: TextureLod) -> Vec4 {
        match lod {
            TextureLod::Mip0 => self.levels[0].bilinear(uv),
            TextureLod::Lambda(lambda) => {
                let texture_term = 0.5 * f32::log2((self.width() * self.height()) as f32);
                self.sample_level(uv, lambda + texture_term)
            }
            TextureLod::Gradients { duv_dx, duv_dy } => self.sample_grad(uv, duv_dx, duv_dy),
        }
    }

    /// Trilinear lookup at a fractional mip level
    pub fn sample_level(&self, uv: Vec2, level: f32) -> Vec4 {
        let max_level = (self.levels.len() - 1) as f32;
        let level = match level.into_finite() {
            Some(level) => level.clamp(0.0, max_level),
            None if level == f32::INFINITY => max_level,
            None => 0.0,
        };

        let lower = level.floor() as usize;
        let upper = (lower + 1).min(self.levels.len() - 1);
        let f = level - lower as f32;

        let a = self.levels[lower].bilinear(uv);
        if f == 0.0 || lower == upper {
            return a;
        }
        a.lerp(self.levels[upper].bilinear(uv), f)
    }

    /// Anisotropic lookup: several trilinear taps along the major axis of the pixel footprint.
    pub fn sample_grad(&self, uv: Vec2, duv_dx: Vec2, duv_dy: Vec2) -> Vec4 {
        let dims = Vec2::new(self.width() as f32, self.height() as f32);
        let px = (duv_dx * dims).length();
        let py = (duv_dy * dims).length();

        let (p_max, p_min, major) = if px >= py {
            (px, py, duv_dx)
        } else {
            (py, px, duv_dy)
        };

        let taps = match (p_max / p_min).into_finite() {
            Some(ratio) => (ratio.ceil() as u32).clamp(1, MAX_ANISOTROPY),
            None if p_max > 0.0 => MAX_ANISOTROPY,
            None => 1,
        };
        let level = f32::log2(p_max / taps as f32);

        if taps == 1 {
            return self.sample_level(uv, level);
        }

        let sum = (0..taps)
            .map(|i| {
                let offset = (i as f32 + 0.5) / taps as f32 - 0.5;
                self.sample_level(uv + offset * major, level)
            })
            .fold(Vec4::ZERO, |acc, s| acc + s);
        sum / taps as f32
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec4};

    use super::MipTexture;
    use crate::lod::TextureLod;

    fn checker() -> MipTexture {
        MipTexture::checkerboard(64, 8, Vec4::ZERO, Vec4::ONE)
    }

    #[test]
    fn mip_chain() {
        let texture = MipTexture::new(8, 2, vec![Vec4::ONE; 16]).unwrap();
        let dims: Vec<_> = (0..texture.level_count())
            .map(|l| texture.level_dimensions(l).unwrap())
            .collect();
        assert_eq!(dims, vec![(8, 2), (4, 1), (2, 1), (1, 1)]);
    }

    #[test]
    fn rejects_bad_sizes() {
        assert!(MipTexture::new(4, 4, vec![Vec4::ONE; 3]).is_err());
        assert!(MipTexture::new(0, 4, vec![]).is_err());
    }

    #[test]
    fn coarsest_level_is_the_average() {
        let texture = checker();
        let average = texture.sample_level(Vec2::new(0.3, 0.7), 100.0);
        assert!((average - Vec4::splat(0.5)).abs().max_element() < 1e-5);
    }

    #[test]
    fn lambda_accounts_for_texture_size() {
        let texture = checker();
        // one texel per pixel is level 0: lambda = -log2(64)
        let fine = texture.sample(Vec2::new(0.5 / 64.0, 0.5 / 64.0), TextureLod::Lambda(-6.0));
        assert_eq!(fine, Vec4::ONE);
        let coarse = texture.sample(Vec2::new(0.5 / 64.0, 0.5 / 64.0), TextureLod::Lambda(0.0));
        assert!((coarse - Vec4::splat(0.5)).abs().max_element() < 1e-5);
    }

    #[test]
    fn nan_lambda_falls_back_to_finest_level() {
        let texture = checker();
        let uv = Vec2::new(0.5 / 64.0, 0.5 / 64.0);
        assert_eq!(texture.sample_level(uv, f32::NAN), texture.sample(uv, TextureLod::Mip0));
    }

    #[test]
    fn anisotropic_keeps_detail_along_minor_axis() {
        // Stripes along x: the texture only varies with u
        let texels = (0..64 * 64)
            .map(|i| if (i % 64) / 4 % 2 == 0 { Vec4::ONE } else { Vec4::ZERO })
            .collect();
        let texture = MipTexture::new(64, 64, texels).unwrap();
        let uv = Vec2::new(2.0 / 64.0, 0.5);

        // Long footprint along v, one texel wide along u
        let duv_dx = Vec2::new(1.0 / 64.0, 0.0);
        let duv_dy = Vec2::new(0.0, 16.0 / 64.0);

        let aniso = texture.sample(uv, TextureLod::Gradients { duv_dx, duv_dy });
        let iso = texture.sample(uv, TextureLod::Lambda(f32::log2(16.0 / 64.0)));
        assert!(aniso.x > 0.9, "{aniso:?}");
        assert!(iso.x < aniso.x);
    }
}
