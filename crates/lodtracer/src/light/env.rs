use std::f32::consts::{PI, TAU};

use glam::{Vec2, Vec3};

use crate::{color::Rgb, lod::TextureLod, material::MipTexture};

/// Radiance arriving from infinitely far away
#[derive(Debug, Clone)]
pub enum EnvMap {
    Constant(Rgb),
    /// Blend from `horizon` to `zenith` above the horizon, flat `ground` below
    Gradient {
        zenith: Rgb,
        horizon: Rgb,
        ground: Rgb,
    },
    /// Equirectangular map, +y up
    LatLong { texture: MipTexture, intensity: f32 },
}

impl Default for EnvMap {
    fn default() -> Self {
        EnvMap::Gradient {
            zenith: Rgb::from_array([0.5, 0.7, 0.9]),
            horizon: Rgb::splat(1.0),
            ground: Rgb::splat(0.2),
        }
    }
}

impl EnvMap {
    /// `dir` is expected to be normalized
    pub fn eval(&self, dir: Vec3) -> Rgb {
        match self {
            EnvMap::Constant(radiance) => *radiance,
            EnvMap::Gradient {
                zenith,
                horizon,
                ground,
            } => {
                if dir.y < 0.0 {
                    *ground
                } else {
                    Rgb(horizon.0.lerp(zenith.0, dir.y))
                }
            }
            EnvMap::LatLong { texture, intensity } => {
                let uv = lat_long_uv(dir);
                let texel = texture.sample(uv, TextureLod::Mip0);
                *intensity * Rgb(texel.truncate())
            }
        }
    }
}

fn lat_long_uv(dir: Vec3) -> Vec2 {
    let h = dir.y.clamp(-1.0, 1.0);
    let u = 0.5 + f32::atan2(dir.x, dir.z) / TAU;
    let v = f32::acos(h) / PI;
    Vec2::new(u, v)
}
