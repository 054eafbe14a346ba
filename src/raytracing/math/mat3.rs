use super::Vec3;

/// Determinants below this magnitude are treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Row-major 3x3 matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat3 {
    value: [f64; 9],
}

impl Mat3 {
    /// Builds the matrix whose columns are `a`, `b` and `c`.
    pub fn from_columns(a: Vec3, b: Vec3, c: Vec3) -> Mat3 {
        Mat3 {
            value: [a.x, b.x, c.x, a.y, b.y, c.y, a.z, b.z, c.z],
        }
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.value;
        m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /// Adjugate over determinant, or `None` for a singular matrix.
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();
        if det.abs() < SINGULAR_DETERMINANT {
            return None;
        }
        let m = &self.value;
        let inv_det = 1.0 / det;
        Some(Mat3 {
            value: [
                (m[4] * m[8] - m[5] * m[7]) * inv_det,
                (m[2] * m[7] - m[1] * m[8]) * inv_det,
                (m[1] * m[5] - m[2] * m[4]) * inv_det,
                (m[5] * m[6] - m[3] * m[8]) * inv_det,
                (m[0] * m[8] - m[2] * m[6]) * inv_det,
                (m[2] * m[3] - m[0] * m[5]) * inv_det,
                (m[3] * m[7] - m[4] * m[6]) * inv_det,
                (m[1] * m[6] - m[0] * m[7]) * inv_det,
                (m[0] * m[4] - m[1] * m[3]) * inv_det,
            ],
        })
    }

    pub fn apply(&self, v: Vec3) -> Vec3 {
        let m = &self.value;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z,
            m[3] * v.x + m[4] * v.y + m[5] * v.z,
            m[6] * v.x + m[7] * v.y + m[8] * v.z,
        )
    }

    /// Solves `self * x = rhs`, `None` when the system is singular.
    pub fn solve(&self, rhs: Vec3) -> Option<Vec3> {
        self.inverse().map(|inverse| inverse.apply(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_of_axes_is_axes() {
        let axes = Mat3::from_columns(Vec3::x_axis(), Vec3::y_axis(), Vec3::z_axis());
        assert_eq!(axes.inverse(), Some(axes));
    }

    #[test]
    fn test_solve_recovers_solution() {
        let m = Mat3::from_columns(
            Vec3::new(2.0, -3.0, -2.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, 2.0, 2.0),
        );
        let x = m.solve(Vec3::new(8.0, -11.0, -3.0)).unwrap();
        assert!(x.approx_eq(Vec3::new(2.0, 3.0, -1.0), 1e-9));
    }

    #[test]
    fn test_singular_matrix_has_no_inverse() {
        // two equal columns
        let m = Mat3::from_columns(Vec3::x_axis(), Vec3::x_axis(), Vec3::z_axis());
        assert!(m.inverse().is_none());
        assert!(m.solve(Vec3::one()).is_none());
    }
}
