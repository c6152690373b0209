use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// A ray/triangle intersection, enough to fetch the vertex data of the hit point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub instance_id: u32,
    pub primitive_index: u32,
    /// Weights of the second and third vertex
    pub barycentrics: Vec2,
}

impl TriangleHit {
    pub fn barycentric_weights(&self) -> [f32; 3] {
        let Vec2 { x, y } = self.barycentrics;
        [1.0 - x - y, x, y]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum HitKind {
    None = 0,
    Triangle = 1,
}

const KIND_SHIFT: u32 = 28;
const INSTANCE_MASK: u32 = (1 << KIND_SHIFT) - 1;

/// Hit record as stored in a visibility buffer.
///
/// Word 0 holds the hit kind in its upper 4 bits and the instance id below, word 1 the
/// primitive index and words 2 and 3 the barycentrics as raw f32 bits.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Zeroable, Pod)]
pub struct PackedHitInfo(pub [u32; 4]);

impl PackedHitInfo {
    pub const NONE: Self = Self([0; 4]);

    pub fn kind(&self) -> Option<HitKind> {
        match self.0[0] >> KIND_SHIFT {
            0 => Some(HitKind::None),
            1 => Some(HitKind::Triangle),
            _ => None,
        }
    }

    /// Returns None for empty or unknown records
    pub fn decode(&self) -> Option<TriangleHit> {
        if self.kind() != Some(HitKind::Triangle) {
            return None;
        }
        let [word0, primitive_index, b1, b2] = self.0;
        Some(TriangleHit {
            instance_id: word0 & INSTANCE_MASK,
            primitive_index,
            barycentrics: Vec2::new(f32::from_bits(b1), f32::from_bits(b2)),
        })
    }
}

impl From<&TriangleHit> for PackedHitInfo {
    fn from(hit: &TriangleHit) -> Self {
        Self([
            ((HitKind::Triangle as u32) << KIND_SHIFT) | (hit.instance_id & INSTANCE_MASK),
            hit.primitive_index,
            hit.barycentrics.x.to_bits(),
            hit.barycentrics.y.to_bits(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::{HitKind, PackedHitInfo, TriangleHit};

    #[test]
    fn encoding() {
        let hit = TriangleHit {
            instance_id: 3,
            primitive_index: 1234,
            barycentrics: Vec2::new(0.25, 0.125),
        };
        let packed = PackedHitInfo::from(&hit);
        assert_eq!(packed.0[0], 0x1000_0003);
        assert_eq!(packed.kind(), Some(HitKind::Triangle));
        assert_eq!(packed.decode(), Some(hit));
    }

    #[test]
    fn empty_and_unknown_records() {
        assert_eq!(PackedHitInfo::NONE.kind(), Some(HitKind::None));
        assert_eq!(PackedHitInfo::NONE.decode(), None);
        assert_eq!(PackedHitInfo([0x7000_0000, 0, 0, 0]).decode(), None);
    }
}
