//! Bounding volume hierarchy over the world space triangles of a scene.
//!
//! Built top down by sorting primitive centroids along the longest axis of their bounds and
//! splitting at the median, then flattened depth first: the first child of an interior node is
//! stored right after it.
use glam::{Vec2, Vec3};

use crate::{math::bounds::Bounds, ray::Ray};

const MAX_PRIMITIVES_PER_LEAF: usize = 4;

/// Identifies a triangle of a mesh instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimitiveRef {
    pub instance: u32,
    pub primitive: u32,
}

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { first: u32, count: u32 },
    Interior { second_child: u32, axis: u8 },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    bounds: Bounds,
    kind: NodeKind,
}

/// What the traversal should do after visiting a primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Visit {
    /// Not hit, or the hit was discarded
    Continue,
    /// A closer hit was found at this distance
    Hit { t: f32 },
    /// Stop the traversal right away
    Terminate,
}

#[derive(Debug, Default)]
pub struct Bvh {
    nodes: Vec<Node>,
    primitives: Vec<PrimitiveRef>,
}

impl Bvh {
    pub fn build(primitives: Vec<(PrimitiveRef, Bounds)>) -> Self {
        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * primitives.len()),
            primitives: Vec::with_capacity(primitives.len()),
        };
        if !primitives.is_empty() {
            bvh.build_recursive(primitives);
        }
        log::debug!(
            "built bvh: {} nodes over {} primitives",
            bvh.nodes.len(),
            bvh.primitives.len()
        );
        bvh
    }

    fn build_recursive(&mut self, mut primitives: Vec<(PrimitiveRef, Bounds)>) {
        let bounds = primitives
            .iter()
            .fold(Bounds::EMPTY, |acc, (_, b)| acc.union(*b));

        if primitives.len() <= MAX_PRIMITIVES_PER_LEAF {
            self.nodes.push(Node {
                bounds,
                kind: NodeKind::Leaf {
                    first: self.primitives.len() as u32,
                    count: primitives.len() as u32,
                },
            });
            self.primitives.extend(primitives.into_iter().map(|(p, _)| p));
            return;
        }

        let centroid_bounds = primitives
            .iter()
            .fold(Bounds::EMPTY, |acc, (_, b)| acc.grow(b.centroid()));
        let axis = centroid_bounds.main_axis();
        primitives.sort_by(|(_, a), (_, b)| {
            a.centroid()[axis].total_cmp(&b.centroid()[axis])
        });

        let second_batch = primitives.split_off(primitives.len() / 2);
        let first_batch = primitives;

        let node = self.nodes.len();
        self.nodes.push(Node {
            bounds,
            kind: NodeKind::Interior {
                second_child: 0,
                axis: axis as u8,
            },
        });
        self.build_recursive(first_batch);
        let second_child = self.nodes.len() as u32;
        self.build_recursive(second_batch);
        self.nodes[node].kind = NodeKind::Interior {
            second_child,
            axis: axis as u8,
        };
    }

    pub fn bounds(&self) -> Bounds {
        self.nodes.first().map_or(Bounds::EMPTY, |n| n.bounds)
    }

    /// Visit every primitive whose node overlaps the ray, shrinking the search range on each
    /// reported hit.
    pub fn traverse(&self, ray: &Ray, mut visit: impl FnMut(PrimitiveRef, &Ray) -> Visit) {
        if self.nodes.is_empty() {
            return;
        }

        let mut ray = *ray;
        let inv_direction = ray.direction.recip();
        let mut stack = Vec::with_capacity(64);
        stack.push(0u32);

        while let Some(index) = stack.pop() {
            let node = &self.nodes[index as usize];
            if node.bounds.ray_intersect(&ray, inv_direction).is_none() {
                continue;
            }

            match node.kind {
                NodeKind::Leaf { first, count } => {
                    for &primitive in &self.primitives[first as usize..(first + count) as usize] {
                        match visit(primitive, &ray) {
                            Visit::Continue => (),
                            Visit::Hit { t } => ray.t_max = t,
                            Visit::Terminate => return,
                        }
                    }
                }
                NodeKind::Interior { second_child, axis } => {
                    // Visit the child on the side the ray comes from first
                    if ray.direction[axis as usize] < 0.0 {
                        stack.push(index + 1);
                        stack.push(second_child);
                    } else {
                        stack.push(second_child);
                        stack.push(index + 1);
                    }
                }
            }
        }
    }
}

/// Möller-Trumbore ray/triangle test. Returns the distance and the barycentric weights of
/// the second and third vertex.
pub fn intersect_triangle(ray: &Ray, [p0, p1, p2]: [Vec3; 3]) -> Option<(f32, Vec2)> {
    let edge1 = p1 - p0;
    let edge2 = p2 - p0;
    let pvec = ray.direction.cross(edge2);
    let det = edge1.dot(pvec);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;

    let tvec = ray.origin - p0;
    let b1 = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let b2 = ray.direction.dot(qvec) * inv_det;
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    ray.contains(t).then_some((t, Vec2::new(b1, b2)))
}

#[cfg(test)]
mod tests {
    use glam::{Vec2, Vec3};
    use rand::{Rng, SeedableRng};

    use super::{intersect_triangle, Bvh, PrimitiveRef, Visit};
    use crate::{math::bounds::Bounds, ray::Ray};

    #[test]
    fn triangle_hit() {
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];
        let ray = Ray::new(Vec3::new(0.25, 0.5, 1.0), -Vec3::Z);
        let (t, bary) = intersect_triangle(&ray, triangle).unwrap();
        assert!((t - 1.0).abs() < 1e-6);
        assert!((bary - Vec2::new(0.25, 0.5)).length() < 1e-6);

        let miss = Ray::new(Vec3::new(0.75, 0.5, 1.0), -Vec3::Z);
        assert!(intersect_triangle(&miss, triangle).is_none());

        let short = Ray::new_with_range(Vec3::new(0.25, 0.5, 1.0), -Vec3::Z, 0.0..0.5);
        assert!(intersect_triangle(&short, triangle).is_none());
    }

    #[test]
    fn matches_brute_force() {
        let mut rng = crate::Rng::seed_from_u64(7);
        let triangles: Vec<[Vec3; 3]> = (0..200)
            .map(|_| {
                let center = 10.0 * Vec3::new(rng.gen(), rng.gen(), rng.gen());
                [0, 1, 2].map(|_| center + Vec3::new(rng.gen(), rng.gen(), rng.gen()) - 0.5)
            })
            .collect();

        let bvh = Bvh::build(
            triangles
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    (
                        PrimitiveRef {
                            instance: 0,
                            primitive: i as u32,
                        },
                        Bounds::from_points(t),
                    )
                })
                .collect(),
        );

        for _ in 0..200 {
            let origin = Vec3::new(rng.gen(), rng.gen(), rng.gen()) * 10.0;
            let direction = Vec3::new(rng.gen(), rng.gen(), rng.gen()) - 0.5;
            let ray = Ray::new(origin, direction);

            let brute = triangles
                .iter()
                .filter_map(|t| intersect_triangle(&ray, *t).map(|(t, _)| t))
                .min_by(f32::total_cmp);

            let mut closest = None;
            bvh.traverse(&ray, |p, ray| {
                match intersect_triangle(ray, triangles[p.primitive as usize]) {
                    Some((t, _)) => {
                        closest = Some(t);
                        Visit::Hit { t }
                    }
                    None => Visit::Continue,
                }
            });

            assert_eq!(closest, brute);
        }
    }

    #[test]
    fn empty() {
        let bvh = Bvh::build(vec![]);
        let mut visited = false;
        bvh.traverse(&Ray::new(Vec3::ZERO, Vec3::X), |_, _| {
            visited = true;
            Visit::Continue
        });
        assert!(!visited);
    }
}
