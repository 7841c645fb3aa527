use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Compute the absolute difference between two angles (radians),
/// normalized into `[0, π]`.
pub fn angle_diff_abs(a: f32, b: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut diff = (b - a).rem_euclid(two_pi);
    if diff >= PI {
        diff -= two_pi;
    }
    diff.abs()
}

/// Check whether two directions (given as angles in radians)
/// are approximately orthogonal within the given `tolerance`.
pub fn is_orthogonal(reference_angle: f32, other_angle: f32, tolerance: f32) -> bool {
    let diff_abs = angle_diff_abs(reference_angle, other_angle);
    (FRAC_PI_2 - diff_abs).abs() <= tolerance.abs()
}

/// Angle between an undirected axis (mod π) and a directed vector angle,
/// in `[0, π/2]`.
pub fn axis_vec_diff(axis_angle: f32, vec_angle: f32) -> f32 {
    let diff_abs = angle_diff_abs(axis_angle, vec_angle);
    diff_abs.min(PI - diff_abs)
}

/// Wrap an angle defined modulo π/2 into `(-π/4, π/4]`.
pub fn wrap_quarter(angle: f32) -> f32 {
    let a = angle.rem_euclid(FRAC_PI_2);
    if a > FRAC_PI_4 {
        a - FRAC_PI_2
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonality() {
        let tol = 1e-3;
        assert!(is_orthogonal(0.0, FRAC_PI_2, tol));
        assert!(is_orthogonal(FRAC_PI_4, 3.0 * FRAC_PI_4, tol));
        assert!(!is_orthogonal(0.0, 0.25, 0.05));
    }

    #[test]
    fn axis_difference_ignores_direction() {
        assert!(axis_vec_diff(0.0, PI).abs() < 1e-6);
        assert!((axis_vec_diff(0.0, FRAC_PI_4) - FRAC_PI_4).abs() < 1e-6);
        assert!((axis_vec_diff(FRAC_PI_4, -FRAC_PI_4) - FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn quarter_wrap_range() {
        for a in [-3.0f32, -0.5, 0.0, 0.3, 0.9, 2.0, 7.0] {
            let w = wrap_quarter(a);
            assert!(w > -FRAC_PI_4 - 1e-6 && w <= FRAC_PI_4 + 1e-6, "{a} -> {w}");
            let k = ((a - w) / FRAC_PI_2).round();
            assert!((a - w - k * FRAC_PI_2).abs() < 1e-5);
        }
    }
}
