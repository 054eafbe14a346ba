use super::{Ray, Vec3};

/// Direction components smaller than this are treated as parallel to a slab.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Axis aligned bounding box stored by its two extreme corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Box3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Box3 {
    /// A box containing nothing: including any point makes it valid.
    pub fn empty() -> Box3 {
        Box3 {
            min: Vec3::splat(f64::INFINITY),
            max: Vec3::splat(f64::NEG_INFINITY),
        }
    }

    pub fn from_min_max(min: Vec3, max: Vec3) -> Box3 {
        Box3 {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Box3 {
        let mut bbox = Box3::empty();
        for point in points {
            bbox.include_point(point);
        }
        bbox
    }

    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grows the box by `amount` on every side.
    pub fn padded(&self, amount: f64) -> Box3 {
        Box3 {
            min: self.min - Vec3::splat(amount),
            max: self.max + Vec3::splat(amount),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Slab test. Returns the entry and exit distances along the ray
    /// (entry may be negative when the origin is inside the box).
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f64, f64)> {
        if !self.is_valid() {
            return None;
        }
        let mut t_min = f64::NEG_INFINITY;
        let mut t_max = f64::INFINITY;

        let axes = [
            (self.min.x, self.max.x, ray.origin.x, ray.direction.x),
            (self.min.y, self.max.y, ray.origin.y, ray.direction.y),
            (self.min.z, self.max.z, ray.origin.z, ray.direction.z),
        ];
        for (slab_min, slab_max, origin, direction) in axes {
            if direction.abs() < PARALLEL_EPSILON {
                // parallel to this slab: only a hit if the origin already lies between its planes
                if origin < slab_min || origin > slab_max {
                    return None;
                }
                continue;
            }
            let mut t1 = (slab_min - origin) / direction;
            let mut t2 = (slab_max - origin) / direction;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        // the whole box is behind us
        if t_max < 0.0 {
            return None;
        }
        Some((t_min, t_max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Box3 {
        Box3::from_min_max(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_ray_through_box() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::z_axis());
        let (t_min, t_max) = unit_box().intersect_ray(&ray).unwrap();
        assert!((t_min - 4.0).abs() < 1e-9);
        assert!((t_max - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_ray_outside_slab_misses() {
        let ray = Ray::new(Vec3::new(0.0, 2.0, -5.0), Vec3::z_axis());
        assert!(unit_box().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_parallel_ray_inside_slab_hits() {
        let ray = Ray::new(Vec3::new(0.5, 0.5, -5.0), Vec3::z_axis());
        assert!(unit_box().intersect_ray(&ray).is_some());
    }

    #[test]
    fn test_box_behind_ray_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::z_axis());
        assert!(unit_box().intersect_ray(&ray).is_none());
    }

    #[test]
    fn test_empty_box_grows_to_points() {
        let mut bbox = Box3::empty();
        assert!(!bbox.is_valid());
        bbox.include_point(Vec3::new(1.0, -2.0, 3.0));
        bbox.include_point(Vec3::new(-1.0, 2.0, 0.0));
        assert!(bbox.is_valid());
        assert_eq!(bbox.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(bbox.max, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(bbox.center(), Vec3::new(0.0, 0.0, 1.5));
    }
}
