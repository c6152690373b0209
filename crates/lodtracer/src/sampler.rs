//! Per pixel pseudo-random sample streams.
use std::hash::{DefaultHasher, Hash, Hasher};

use glam::{UVec2, Vec2};
use rand::{distributions::Uniform, prelude::Distribution, SeedableRng};

use crate::Rng;

fn seed_rng(x: u32, y: u32, frame: u32) -> Rng {
    let mut hasher = DefaultHasher::new();
    (x, y, frame).hash(&mut hasher);
    Rng::seed_from_u64(hasher.finish())
}

/// A deterministic stream of uniform samples in $\left[0, 1\right[$.
///
/// The stream only depends on the pixel and the frame it is created for, so
/// two renders with the same inputs draw the same samples.
#[derive(Clone, Debug)]
pub struct SampleGenerator {
    rng: Rng,
    uniform: Uniform<f32>,
}

impl SampleGenerator {
    pub fn new(pixel: UVec2, frame: u32) -> Self {
        Self {
            rng: seed_rng(pixel.x, pixel.y, frame),
            uniform: Uniform::new(0., 1.),
        }
    }

    /// Discard the next `dimensions` samples. Lets several passes sharing the
    /// same seed use independent dimensions of the stream.
    pub fn advance(&mut self, dimensions: u32) {
        for _ in 0..dimensions {
            self.next_1d();
        }
    }

    pub fn next_1d(&mut self) -> f32 {
        self.uniform.sample(&mut self.rng)
    }

    pub fn next_2d(&mut self) -> Vec2 {
        Vec2 {
            x: self.next_1d(),
            y: self.next_1d(),
        }
    }
}
