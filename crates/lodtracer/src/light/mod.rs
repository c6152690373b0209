//! Analytic lights and the environment.
pub mod env;

pub use env::EnvMap;

use glam::Vec3;

use crate::color::Rgb;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalyticLight {
    Point {
        position: Vec3,
        intensity: Rgb,
    },
    Directional {
        /// Direction the light travels in
        direction: Vec3,
        irradiance: Rgb,
    },
    /// A point light restricted to a cone, with a smooth falloff between the two half angles
    Spot {
        position: Vec3,
        direction: Vec3,
        intensity: Rgb,
        cos_inner: f32,
        cos_outer: f32,
    },
}

/// Incident light at a shading point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSample {
    /// Normalized direction from the shading point to the light
    pub dir: Vec3,
    /// Distance to the light, infinite for directional lights
    pub distance: f32,
    /// Incident radiance (or irradiance for delta lights)
    pub li: Rgb,
}

impl AnalyticLight {
    pub fn spot(position: Vec3, direction: Vec3, intensity: Rgb, inner: f32, outer: f32) -> Self {
        AnalyticLight::Spot {
            position,
            direction: direction.normalize(),
            intensity,
            cos_inner: inner.cos(),
            cos_outer: outer.cos(),
        }
    }

    /// Returns None when the point receives nothing from this light.
    pub fn sample(&self, pos: Vec3) -> Option<LightSample> {
        match *self {
            AnalyticLight::Point {
                position,
                intensity,
            } => Self::sample_position(position, pos, intensity),
            AnalyticLight::Directional {
                direction,
                irradiance,
            } => {
                let dir = (-direction).try_normalize()?;
                Some(LightSample {
                    dir,
                    distance: f32::INFINITY,
                    li: irradiance,
                })
            }
            AnalyticLight::Spot {
                position,
                direction,
                intensity,
                cos_inner,
                cos_outer,
            } => {
                let mut sample = Self::sample_position(position, pos, intensity)?;
                let cos = direction.dot(-sample.dir);
                let falloff = smoothstep(cos_outer, cos_inner, cos);
                if falloff <= 0.0 {
                    return None;
                }
                sample.li = falloff * sample.li;
                Some(sample)
            }
        }
    }

    fn sample_position(light: Vec3, pos: Vec3, intensity: Rgb) -> Option<LightSample> {
        let to_light = light - pos;
        let distance_squared = to_light.length_squared();
        if distance_squared <= 0.0 {
            return None;
        }
        let distance = distance_squared.sqrt();
        Some(LightSample {
            dir: to_light / distance,
            distance,
            li: intensity / distance_squared,
        })
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 >= edge1 {
        return if x >= edge1 { 1.0 } else { 0.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Number of analytic lights of each type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LightCounts {
    pub point: u32,
    pub directional: u32,
    pub spot: u32,
}

impl LightCounts {
    pub fn from_lights(lights: &[AnalyticLight]) -> Self {
        lights
            .iter()
            .fold(Self::default(), |mut counts, light| {
                match light {
                    AnalyticLight::Point { .. } => counts.point += 1,
                    AnalyticLight::Directional { .. } => counts.directional += 1,
                    AnalyticLight::Spot { .. } => counts.spot += 1,
                }
                counts
            })
    }

    pub fn total(&self) -> u32 {
        self.point + self.directional + self.spot
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::{AnalyticLight, LightCounts};
    use crate::color::Rgb;

    #[test]
    fn point_light_falls_off_with_distance() {
        let light = AnalyticLight::Point {
            position: Vec3::new(0.0, 2.0, 0.0),
            intensity: Rgb::splat(4.0),
        };
        let sample = light.sample(Vec3::ZERO).unwrap();
        assert_eq!(sample.dir, Vec3::Y);
        assert_eq!(sample.distance, 2.0);
        assert_eq!(sample.li, Rgb::splat(1.0));

        assert!(light.sample(Vec3::new(0.0, 2.0, 0.0)).is_none());
    }

    #[test]
    fn directional_light_points_back() {
        let light = AnalyticLight::Directional {
            direction: Vec3::new(0.0, -2.0, 0.0),
            irradiance: Rgb::splat(1.0),
        };
        let sample = light.sample(Vec3::ZERO).unwrap();
        assert_eq!(sample.dir, Vec3::Y);
        assert!(sample.distance.is_infinite());
    }

    #[test]
    fn spot_light_cone() {
        let light = AnalyticLight::spot(
            Vec3::new(0.0, 1.0, 0.0),
            -Vec3::Y,
            Rgb::splat(1.0),
            0.2,
            0.4,
        );
        assert_eq!(light.sample(Vec3::ZERO).unwrap().li, Rgb::splat(1.0));
        assert!(light.sample(Vec3::new(1.0, 0.0, 0.0)).is_none());
        let penumbra = light.sample(Vec3::new(0.3f32.tan(), 0.0, 0.0)).unwrap();
        assert!(penumbra.li.0.x > 0.0 && penumbra.li.0.x < 1.0);
    }

    #[test]
    fn counts() {
        let lights = [
            AnalyticLight::Point {
                position: Vec3::ZERO,
                intensity: Rgb::splat(1.0),
            },
            AnalyticLight::Directional {
                direction: Vec3::Y,
                irradiance: Rgb::splat(1.0),
            },
            AnalyticLight::Point {
                position: Vec3::ONE,
                intensity: Rgb::splat(1.0),
            },
        ];
        let counts = LightCounts::from_lights(&lights);
        assert_eq!(
            counts,
            LightCounts {
                point: 2,
                directional: 1,
                spot: 0
            }
        );
        assert_eq!(counts.total(), 3);
    }
}
