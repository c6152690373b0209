//! Texture level of detail estimation along rays.
//!
//! Four estimators are available, see [LodMode]. The per ray state each one carries is held
//! in [LodState]; what a texture lookup needs from it is a [TextureLod].

mod ray_cone;
mod ray_diff;

pub use ray_cone::{surface_spread_angle, triangle_lod_constant, RayCone};
pub use ray_diff::{lambda_isotropic, BarycentricDiffs, RayDiff};

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, derive_more::Display)]
pub enum LodMode {
    /// Always sample the finest mip level
    #[display("mip0")]
    Mip0,
    #[default]
    #[display("ray cones")]
    RayCones,
    #[display("ray differentials (isotropic)")]
    RayDiffsIsotropic,
    #[display("ray differentials (anisotropic)")]
    RayDiffsAnisotropic,
}

/// The footprint state travelling with a ray. Exactly one variant is active for a whole path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LodState {
    Mip0,
    RayCone(RayCone),
    RayDiffIsotropic(RayDiff),
    RayDiffAnisotropic(RayDiff),
}

impl LodState {
    pub fn mode(&self) -> LodMode {
        match self {
            LodState::Mip0 => LodMode::Mip0,
            LodState::RayCone(_) => LodMode::RayCones,
            LodState::RayDiffIsotropic(_) => LodMode::RayDiffsIsotropic,
            LodState::RayDiffAnisotropic(_) => LodMode::RayDiffsAnisotropic,
        }
    }

    /// Wrap a ray differential in the variant matching `mode`. Cone and mip0 modes carry no
    /// differential.
    pub fn from_ray_diff(mode: LodMode, ray_diff: RayDiff) -> Self {
        match mode {
            LodMode::RayDiffsAnisotropic => LodState::RayDiffAnisotropic(ray_diff),
            LodMode::RayDiffsIsotropic => LodState::RayDiffIsotropic(ray_diff),
            LodMode::Mip0 | LodMode::RayCones => LodState::Mip0,
        }
    }

    pub fn ray_diff(&self) -> Option<&RayDiff> {
        match self {
            LodState::RayDiffIsotropic(ray_diff) | LodState::RayDiffAnisotropic(ray_diff) => {
                Some(ray_diff)
            }
            _ => None,
        }
    }
}

/// How a texture is filtered at a shading point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextureLod {
    Mip0,
    /// Texture independent lod: the texture adds `0.5 * log2(width * height)` to it.
    Lambda(f32),
    /// Texture coordinate derivatives per pixel, for anisotropic filtering.
    Gradients { duv_dx: Vec2, duv_dy: Vec2 },
}

#[cfg(test)]
mod tests {
    use super::{LodMode, LodState, RayDiff};

    #[test]
    fn state_matches_mode() {
        for mode in [LodMode::RayDiffsIsotropic, LodMode::RayDiffsAnisotropic] {
            let state = LodState::from_ray_diff(mode, RayDiff::ZERO);
            assert_eq!(state.mode(), mode);
            assert_eq!(state.ray_diff(), Some(&RayDiff::ZERO));
        }
        assert_eq!(LodState::from_ray_diff(LodMode::RayCones, RayDiff::ZERO).ray_diff(), None);
    }

    #[test]
    fn display() {
        assert_eq!(LodMode::RayCones.to_string(), "ray cones");
    }
}
