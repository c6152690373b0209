use glam::{Mat3, Vec3};

/// Represent an orthonormal frame
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    frame: Mat3,
}

impl Frame {
    /// Construct a Frame from a single vector using the algorithm described in
    /// “Building an Orthonormal Basis, Revisited (JCGT).” https://jcgt.org/published/0006/01/01/.
    /// n is expected to be normalized and will be used as the +z axis
    pub fn new(n: Vec3) -> Self {
        let sign = 1.0_f32.copysign(n.z);
        let a = -1.0 / (sign + n.z);
        let b = n.x * n.y * a;

        Self {
            frame: Mat3::from_cols(
                Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x),
                Vec3::new(b, sign + n.y * n.y * a, -n.y),
                n,
            ),
        }
    }

    pub fn x(&self) -> Vec3 {
        self.frame.col(0)
    }
    pub fn y(&self) -> Vec3 {
        self.frame.col(1)
    }
    pub fn z(&self) -> Vec3 {
        self.frame.col(2)
    }
}
