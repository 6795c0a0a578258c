// src/vector_ops.rs
//! Small 3D/4D helpers shared by the quadric machinery.
//!
//! Everything runs in double precision so vertex coordinates survive a
//! write/parse cycle bit for bit.

use nalgebra::{Matrix4, Vector3, Vector4};

pub type Vec3 = Vector3<f64>;
pub type Vec4 = Vector4<f64>;
pub type Mat4 = Matrix4<f64>;

/// Shared epsilon: pads normal denominators and gates the determinant of
/// the optimal-position solve.
pub const EPSILON: f64 = 1e-7;

/// Unit normal of the triangle (a, b, c).
///
/// The denominator is padded by [`EPSILON`] so degenerate triangles yield
/// a finite near-zero vector instead of NaN.
pub fn triangle_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let cross = (b - a).cross(&(c - a));
    cross / (cross.norm() + EPSILON)
}

/// Fundamental error quadric `K_p = p * pT` of the plane through `anchor`
/// with the given unit `normal`.
pub fn plane_quadric(normal: Vec3, anchor: Vec3) -> Mat4 {
    let d = -normal.dot(&anchor);
    let p = Vec4::new(normal.x, normal.y, normal.z, d);
    p * p.transpose()
}

/// Lift a position into homogeneous coordinates (1 in the fourth slot).
#[inline(always)]
pub fn homogeneous(v: Vec3) -> Vec4 {
    Vec4::new(v.x, v.y, v.z, 1.0)
}

/// Scalar quadric error `vT * Q * v`.
#[inline(always)]
pub fn quadric_error(q: &Mat4, v_bar: &Vec4) -> f64 {
    v_bar.dot(&(q * v_bar))
}

/// Componentwise midpoint of two positions.
#[inline(always)]
pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    (a + b) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_normal_unit_square_face() {
        let n = triangle_normal(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        assert!(n.x.abs() < 1e-9);
        assert!(n.y.abs() < 1e-9);
        assert!((n.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_normal_degenerate_is_finite() {
        let p = Vec3::new(2.0, 2.0, 2.0);
        let n = triangle_normal(p, p, p);
        assert!(n.iter().all(|c| c.is_finite()));
        assert!(n.norm() < 1e-6);
    }

    #[test]
    fn test_plane_quadric_is_symmetric() {
        let q = plane_quadric(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.5, 0.5, 3.0));
        assert_eq!(q, q.transpose());
    }

    #[test]
    fn test_quadric_error_zero_on_plane() {
        let q = plane_quadric(Vec3::new(0.0, 0.0, 1.0), Vec3::new(0.0, 0.0, 2.0));
        let on_plane = homogeneous(Vec3::new(7.0, -3.0, 2.0));
        assert!(quadric_error(&q, &on_plane).abs() < 1e-12);

        let off_plane = homogeneous(Vec3::new(0.0, 0.0, 5.0));
        assert!((quadric_error(&q, &off_plane) - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_midpoint() {
        let m = midpoint(Vec3::new(0.0, 2.0, -4.0), Vec3::new(2.0, 4.0, 4.0));
        assert_eq!(m, Vec3::new(1.0, 3.0, 0.0));
    }
}
