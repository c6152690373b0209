//! Linear RGB radiance and its conversion to display values.
use std::ops::{Add, AddAssign, Div, Mul, MulAssign};

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Linear RGB triplet. Used for radiance, throughput and reflectances alike.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Zeroable, Pod)]
pub struct Rgb(pub Vec3);

impl Rgb {
    pub const fn from_array(arr: [f32; 3]) -> Self {
        Self(Vec3::from_array(arr))
    }

    pub fn splat(v: f32) -> Self {
        Self(Vec3::splat(v))
    }

    pub fn to_array(self) -> [f32; 3] {
        self.0.to_array()
    }

    pub fn is_black(self) -> bool {
        self.0 == Vec3::ZERO
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    /// Rec. 709 relative luminance
    pub fn luminance(&self) -> f32 {
        self.0.dot(Vec3::new(0.2126, 0.7152, 0.0722))
    }

    /// Gamma encode into sRGB, clamping to the displayable range.
    pub fn to_srgb(self) -> [f32; 3] {
        self.to_array().map(srgb_from_linear)
    }

    pub fn to_srgb_bytes(self) -> [u8; 3] {
        self.to_srgb().map(|c| (c * 255. + 0.5) as u8)
    }
}

fn srgb_from_linear(linear: f32) -> f32 {
    let linear = linear.clamp(0.0, 1.0);
    if linear.is_nan() {
        0.0
    } else if linear <= 0.0031308 {
        12.92 * linear
    } else {
        1.055 * linear.powf(1.0 / 2.4) - 0.055
    }
}

pub fn linear_from_srgb(srgb: f32) -> f32 {
    let srgb = srgb.clamp(0.0, 1.0);
    if srgb.is_nan() {
        0.0
    } else if srgb <= 0.04045 {
        srgb / 12.92
    } else {
        ((srgb + 0.055) / 1.055).powf(2.4)
    }
}

impl Add for Rgb {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Rgb {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Mul for Rgb {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl MulAssign for Rgb {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 *= rhs.0;
    }
}

impl Mul<Rgb> for f32 {
    type Output = Rgb;

    fn mul(self, rhs: Rgb) -> Self::Output {
        Rgb(self * rhs.0)
    }
}

impl Div<f32> for Rgb {
    type Output = Rgb;

    fn div(self, rhs: f32) -> Self::Output {
        Rgb(self.0 / rhs)
    }
}

impl From<[f32; 3]> for Rgb {
    fn from(val: [f32; 3]) -> Self {
        Rgb::from_array(val)
    }
}
