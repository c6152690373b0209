pub mod bounds;
pub mod float;
pub mod frame;
pub mod transform;
pub mod vec;
