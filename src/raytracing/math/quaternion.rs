use std::ops;

use super::Vec3;

/// Below this squared magnitude a quaternion is treated as zero.
const DEGENERATE_NORM_SQUARED: f64 = 1e-12;

/// Rotation stored as a unit quaternion `x*i + y*j + z*k + w`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ops::Mul<Quaternion> for Quaternion {
    type Output = Self;

    /// Hamilton product: `self * rhs` applies `rhs` first, then `self`.
    #[inline(always)]
    fn mul(self, rhs: Quaternion) -> Self::Output {
        Quaternion {
            w: self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            x: self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            y: self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            z: self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        }
    }
}

impl ops::Mul<Vec3> for Quaternion {
    type Output = Vec3;

    #[inline(always)]
    fn mul(self, rhs: Vec3) -> Self::Output {
        self.rotate(rhs)
    }
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion::new(0.0, 0.0, 0.0, 1.0);

    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Quaternion {
        Quaternion { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis`. A zero axis gives the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Quaternion {
        let axis = axis.normalize();
        if axis == Vec3::ZERO {
            return Self::IDENTITY;
        }
        let half = angle * 0.5;
        let sin_half = half.sin();
        Quaternion::new(
            axis.x * sin_half,
            axis.y * sin_half,
            axis.z * sin_half,
            half.cos(),
        )
        .normalize()
    }

    #[inline(always)]
    pub fn squared_len(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    #[inline(always)]
    pub fn len(&self) -> f64 {
        self.squared_len().sqrt()
    }

    /// Unit quaternion; a (near) zero quaternion falls back to the identity.
    pub fn normalize(&self) -> Quaternion {
        let squared_len = self.squared_len();
        if squared_len < DEGENERATE_NORM_SQUARED {
            return Self::IDENTITY;
        }
        let len = squared_len.sqrt();
        Quaternion::new(self.x / len, self.y / len, self.z / len, self.w / len)
    }

    #[inline(always)]
    pub fn conjugate(&self) -> Quaternion {
        Quaternion::new(-self.x, -self.y, -self.z, self.w)
    }

    /// `conjugate / |q|²`; a (near) zero quaternion falls back to the identity.
    pub fn inverse(&self) -> Quaternion {
        let squared_len = self.squared_len();
        if squared_len < DEGENERATE_NORM_SQUARED {
            return Self::IDENTITY;
        }
        let conjugate = self.conjugate();
        Quaternion::new(
            conjugate.x / squared_len,
            conjugate.y / squared_len,
            conjugate.z / squared_len,
            conjugate.w / squared_len,
        )
    }

    /// Rotates `v` as the vector part of `q * v * q⁻¹`.
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let qv = Quaternion::new(v.x, v.y, v.z, 0.0);
        let rotated = *self * qv * self.inverse();
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    pub fn approx_eq(&self, other: &Quaternion, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
            && (self.w - other.w).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_times_inverse_is_identity() {
        let rotations = [
            Quaternion::from_axis_angle(Vec3::x_axis(), 0.3),
            Quaternion::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), -PI / 8.0),
            Quaternion::from_axis_angle(Vec3::new(0.25, 1.0, 0.5), 2.5),
        ];
        for q in rotations {
            assert!((q * q.inverse()).approx_eq(&Quaternion::IDENTITY, 1e-9));
            assert!((q.inverse() * q).approx_eq(&Quaternion::IDENTITY, 1e-9));
        }
    }

    #[test]
    fn test_rotate_quarter_turn_around_z() {
        let q = Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2);
        let rotated = q.rotate(Vec3::x_axis());
        assert!(rotated.approx_eq(Vec3::y_axis(), 1e-9));
    }

    #[test]
    fn test_multiplication_composes_rotations() {
        let a = Quaternion::from_axis_angle(Vec3::z_axis(), FRAC_PI_2);
        let b = Quaternion::from_axis_angle(Vec3::x_axis(), FRAC_PI_2);
        let v = Vec3::new(0.3, -1.2, 2.0);
        // a * b applies b first
        assert!((a * b).rotate(v).approx_eq(a.rotate(b.rotate(v)), 1e-9));
        // and the order matters
        assert!(!(a * b).rotate(v).approx_eq((b * a).rotate(v), 1e-6));
    }

    #[test]
    fn test_degenerate_quaternion_falls_back_to_identity() {
        let zero = Quaternion::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(zero.inverse(), Quaternion::IDENTITY);
        assert_eq!(zero.normalize(), Quaternion::IDENTITY);
        assert_eq!(
            Quaternion::from_axis_angle(Vec3::ZERO, 1.0),
            Quaternion::IDENTITY
        );
    }
}
