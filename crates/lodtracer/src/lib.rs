pub mod camera;
pub mod color;
pub mod error;
pub mod gbuffer;
pub mod integrator;
pub mod light;
pub mod loader;
pub mod lod;
pub mod material;
pub mod math;
pub mod ray;
pub mod sampler;
pub mod scene;
pub mod utils;

pub use error::{Error, Result};
pub use rand_xoshiro::Xoshiro256StarStar as Rng;
