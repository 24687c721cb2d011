//! Bounding volumes and frustum tests used by visibility culling

use crate::foundation::math::{Mat4, Transform, Vec3};

/// Result of testing a volume against a frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intersection {
    /// Entirely inside every plane
    Inside,
    /// Entirely outside at least one plane
    Outside,
    /// Straddles at least one plane
    Intersect,
}

/// Axis-aligned box in node-local space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5))
    }
}

impl BoundingBox {
    /// Create a new box from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create a box centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Get the center of the box
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the box
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this box contains a local-space point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Whether a world-space point lies inside the box placed by `world`
    pub fn contains_world_point(&self, world: &Transform, point: &Vec3) -> bool {
        if world.scale.iter().any(|s| s.abs() <= f32::EPSILON) {
            return false;
        }
        let local = world.rotation.inverse() * (point - world.position);
        self.contains_point(&local.component_div(&world.scale))
    }

    /// Bounding sphere of the box placed by `world`
    pub fn world_sphere(&self, world: &Transform) -> (Vec3, f32) {
        let center = world.transform_point(&self.center());
        let scaled = self.extents().component_mul(&world.scale.abs());
        (center, scaled.norm())
    }

    /// The eight corners of the box placed by `world`
    pub fn world_corners(&self, world: &Transform) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
        .map(|corner| world.transform_point(&corner))
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector pointing into the frustum
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Build a normalized plane from `(a, b, c, d)` coefficients
    fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.norm();
        if length <= f32::EPSILON {
            return Self {
                normal: Vec3::zeros(),
                distance: 0.0,
            };
        }
        Self {
            normal: normal / length,
            distance: d / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum used for culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes (left, right, bottom, top, near, far), normals facing inward
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix (Gribb-Hartmann)
    pub fn from_matrix(vp: &Mat4) -> Self {
        let row = |i: usize| vp.row(i).transpose();
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let plane = |v: nalgebra::Vector4<f32>| Plane::from_coefficients(v.x, v.y, v.z, v.w);

        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r3 + r2),
                plane(r3 - r2),
            ],
        }
    }

    /// Whether every plane is degenerate (nothing can be tested)
    pub fn is_empty(&self) -> bool {
        self.planes.iter().all(|p| p.normal == Vec3::zeros())
    }

    /// Classify a sphere against the frustum
    pub fn sphere_inside(&self, center: &Vec3, radius: f32) -> Intersection {
        let mut result = Intersection::Inside;
        for plane in &self.planes {
            let distance = plane.distance_to_point(center);
            if distance < -radius {
                return Intersection::Outside;
            }
            if distance < radius {
                result = Intersection::Intersect;
            }
        }
        result
    }

    /// Classify a convex point set (box corners) against the frustum
    pub fn box_inside(&self, corners: &[Vec3; 8]) -> Intersection {
        let mut result = Intersection::Inside;
        for plane in &self.planes {
            let inside = corners
                .iter()
                .filter(|corner| plane.distance_to_point(corner) >= 0.0)
                .count();
            if inside == 0 {
                return Intersection::Outside;
            }
            if inside < corners.len() {
                result = Intersection::Intersect;
            }
        }
        result
    }
}
