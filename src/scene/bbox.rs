//! Axis-aligned bounding boxes and the incrementally maintained scene bbox.

use glam::{Affine3A, Vec3};

/// An axis-aligned bounding box. `Default` is the empty box (`min > max`), so the
/// first `union` call establishes real bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }
}

impl BoundingBox {
    #[must_use]
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut b = Self::default();
        for &p in points {
            b.grow_point(p);
        }
        b
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn grow_point(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    pub fn union(&mut self, other: BoundingBox) {
        if other.is_empty() {
            return;
        }
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    #[must_use]
    pub fn diagonal(&self) -> Vec3 {
        self.max - self.min
    }

    /// Transforms all eight corners by `xform` and returns the new axis-aligned
    /// bounds — used when a shape's `toWorld` changes and its world-space AABB must
    /// be re-derived for the scene bbox union.
    #[must_use]
    pub fn transformed(&self, xform: Affine3A) -> Self {
        if self.is_empty() {
            return *self;
        }
        let mut out = Self::default();
        for i in 0..8 {
            let corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.grow_point(xform.transform_point3(corner));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_unions_to_the_other_operand() {
        let mut a = BoundingBox::default();
        assert!(a.is_empty());
        a.union(BoundingBox::from_points(&[Vec3::ZERO, Vec3::ONE]));
        assert_eq!(a.min, Vec3::ZERO);
        assert_eq!(a.max, Vec3::ONE);
    }

    #[test]
    fn transformed_box_covers_translated_corners() {
        let b = BoundingBox::from_points(&[Vec3::ZERO, Vec3::ONE]);
        let moved = b.transformed(Affine3A::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(moved.min, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(moved.max, Vec3::new(2.0, 1.0, 1.0));
    }
}
