use core::fmt::Display;
use std::{ops::Range, str::FromStr};

use clap::ValueEnum;
use glam::Vec3;
use lodtracer::{
    integrator::PrimaryHitSource,
    lod::LodMode,
    scene::{
        examples::{AlphaFenceScene, MirrorFloorScene},
        SceneBuilder,
    },
};

#[derive(Debug, Default, Clone, Copy, ValueEnum)]
pub enum AvailableScene {
    #[default]
    MirrorFloor,
    AlphaFence,
    /// Only what `--obj` brings in, under a gradient sky
    Empty,
}

impl AvailableScene {
    pub fn insert_into(self, builder: &mut SceneBuilder) -> lodtracer::Result<()> {
        match self {
            AvailableScene::MirrorFloor => MirrorFloorScene::insert_into(builder),
            AvailableScene::AlphaFence => AlphaFenceScene::insert_into(builder),
            AvailableScene::Empty => {
                builder.set_env_map(Default::default());
                Ok(())
            }
        }
    }
}

#[derive(Default, Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AvailableLodMode {
    Mip0,
    #[default]
    RayCones,
    RayDiffsIsotropic,
    RayDiffsAnisotropic,
}

impl From<AvailableLodMode> for LodMode {
    fn from(val: AvailableLodMode) -> Self {
        match val {
            AvailableLodMode::Mip0 => LodMode::Mip0,
            AvailableLodMode::RayCones => LodMode::RayCones,
            AvailableLodMode::RayDiffsIsotropic => LodMode::RayDiffsIsotropic,
            AvailableLodMode::RayDiffsAnisotropic => LodMode::RayDiffsAnisotropic,
        }
    }
}

#[derive(Default, Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum AvailablePrimaryHit {
    #[default]
    Rasterized,
    RayTraced,
}

impl From<AvailablePrimaryHit> for PrimaryHitSource {
    fn from(val: AvailablePrimaryHit) -> Self {
        match val {
            AvailablePrimaryHit::Rasterized => PrimaryHitSource::Rasterized,
            AvailablePrimaryHit::RayTraced => PrimaryHitSource::RayTraced,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl FromStr for Dimensions {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut split_it = s.split('x');
        let (Some(a), Some(b), None) = (split_it.next(), split_it.next(), split_it.next()) else {
            return Err(anyhow::anyhow!("incorrect format, expected `width`x`height`"));
        };
        let width: u32 = a.parse()?;
        let height: u32 = b.parse()?;
        if width == 0 || height == 0 {
            return Err(anyhow::anyhow!("dimensions must be non zero"));
        }

        Ok(Dimensions { width, height })
    }
}

impl Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("{}x{}", self.width, self.height))
    }
}

/// Linear color given as `r,g,b`, or a single gray value
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color(pub Vec3);

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let components = s
            .split(',')
            .map(|c| c.trim().parse::<f32>())
            .collect::<Result<Vec<_>, _>>()?;
        match components[..] {
            [v] => Ok(Color(Vec3::splat(v))),
            [r, g, b] => Ok(Color(Vec3::new(r, g, b))),
            _ => Err(anyhow::anyhow!("expected `r,g,b` or a single value")),
        }
    }
}

/// A pixel range, `x0..x1` or a single coordinate `x`
pub fn parse_range(s: &str) -> Option<Range<u32>> {
    let Some((start, end)) = s.split_once("..") else {
        return s.parse::<u32>().ok().map(|x| x..(x + 1));
    };

    Some(start.parse().ok()?..end.parse().ok()?)
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{parse_range, Color, Dimensions};

    #[test]
    fn dimensions() {
        let d: Dimensions = "800x600".parse().unwrap();
        assert_eq!(
            d,
            Dimensions {
                width: 800,
                height: 600
            }
        );
        assert_eq!(d.to_string(), "800x600");

        assert!("800".parse::<Dimensions>().is_err());
        assert!("800x600x2".parse::<Dimensions>().is_err());
        assert!("0x600".parse::<Dimensions>().is_err());
        assert!("ax600".parse::<Dimensions>().is_err());
    }

    #[test]
    fn color() {
        assert_eq!("0.5".parse::<Color>().unwrap(), Color(Vec3::splat(0.5)));
        assert_eq!(
            "1, 0.5,0".parse::<Color>().unwrap(),
            Color(Vec3::new(1.0, 0.5, 0.0))
        );
        assert!("1,2".parse::<Color>().is_err());
        assert!("red".parse::<Color>().is_err());
    }

    #[test]
    fn range() {
        assert_eq!(parse_range("4"), Some(4..5));
        assert_eq!(parse_range("1..7"), Some(1..7));
        assert_eq!(parse_range("1..x"), None);
    }
}
