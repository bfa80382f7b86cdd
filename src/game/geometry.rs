//! Axis-aligned volumes and ray queries

use glam::Vec3;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    /// Build from a centre position and full size
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Inclusive test on the X/Z footprint only
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x >= self.min.x && x <= self.max.x && z >= self.min.z && z <= self.max.z
    }

    /// Slab-method ray intersection. Returns the entry distance along `dir`
    /// (or 0 when the origin is inside), `None` on a miss or beyond `max_dist`.
    /// `dir` must be normalized.
    pub fn ray_distance(&self, origin: Vec3, dir: Vec3, max_dist: f32) -> Option<f32> {
        let inv = Vec3::new(
            if dir.x.abs() > 1e-6 { 1.0 / dir.x } else { f32::MAX },
            if dir.y.abs() > 1e-6 { 1.0 / dir.y } else { f32::MAX },
            if dir.z.abs() > 1e-6 { 1.0 / dir.z } else { f32::MAX },
        );

        let t1 = (self.min - origin) * inv;
        let t2 = (self.max - origin) * inv;
        let tmin = t1.min(t2).max_element();
        let tmax = t1.max(t2).min_element();

        if tmax < 0.0 || tmin > tmax {
            return None;
        }
        let t = tmin.max(0.0);
        (t <= max_dist).then_some(t)
    }
}

/// Ray against the horizontal plane `y = height`, restricted to a square
/// footprint of `half_extent` around the origin.
pub fn ray_ground_distance(
    origin: Vec3,
    dir: Vec3,
    height: f32,
    half_extent: f32,
    max_dist: f32,
) -> Option<f32> {
    if dir.y.abs() <= 1e-6 {
        return None;
    }
    let t = (height - origin.y) / dir.y;
    if t < 0.0 || t > max_dist {
        return None;
    }
    let p = origin + dir * t;
    (p.x.abs() <= half_extent && p.z.abs() <= half_extent).then_some(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box_at(center: Vec3) -> Aabb {
        Aabb::from_center_size(center, Vec3::ONE)
    }

    #[test]
    fn from_center_size_round_trips() {
        let aabb = Aabb::from_center_size(Vec3::new(-5.0, 1.75, -10.0), Vec3::new(4.0, 0.5, 4.0));
        assert_eq!(aabb.min, Vec3::new(-7.0, 1.5, -12.0));
        assert_eq!(aabb.max, Vec3::new(-3.0, 2.0, -8.0));
        assert_eq!(aabb.center(), Vec3::new(-5.0, 1.75, -10.0));
    }

    #[test]
    fn ray_hits_box_in_front() {
        let aabb = unit_box_at(Vec3::new(0.0, 0.0, -10.0));
        let t = aabb.ray_distance(Vec3::ZERO, Vec3::NEG_Z, 100.0);
        assert_eq!(t, Some(9.5));
    }

    #[test]
    fn ray_misses_box_behind_or_beside() {
        let behind = unit_box_at(Vec3::new(0.0, 0.0, 10.0));
        assert!(behind.ray_distance(Vec3::ZERO, Vec3::NEG_Z, 100.0).is_none());

        let beside = unit_box_at(Vec3::new(3.0, 0.0, -10.0));
        assert!(beside.ray_distance(Vec3::ZERO, Vec3::NEG_Z, 100.0).is_none());
    }

    #[test]
    fn ray_respects_max_distance() {
        let aabb = unit_box_at(Vec3::new(0.0, 0.0, -10.0));
        assert!(aabb.ray_distance(Vec3::ZERO, Vec3::NEG_Z, 5.0).is_none());
    }

    #[test]
    fn ray_from_inside_reports_zero() {
        let aabb = unit_box_at(Vec3::ZERO);
        assert_eq!(aabb.ray_distance(Vec3::ZERO, Vec3::X, 10.0), Some(0.0));
    }

    #[test]
    fn ground_plane_hit_only_when_looking_down() {
        let origin = Vec3::new(0.0, 1.6, 0.0);
        let down = Vec3::new(0.0, -1.0, -1.0).normalize();
        let t = ray_ground_distance(origin, down, 0.0, 50.0, 1000.0).unwrap();
        assert!((origin + down * t).y.abs() < 1e-4);

        assert!(ray_ground_distance(origin, Vec3::NEG_Z, 0.0, 50.0, 1000.0).is_none());
        assert!(ray_ground_distance(origin, Vec3::Y, 0.0, 50.0, 1000.0).is_none());
    }
}
