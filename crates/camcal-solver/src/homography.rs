use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

/// Similarity `T` moving `pts` to their centroid and scaling the mean
/// distance to √2 (Hartley normalization).
pub fn conditioning<'a>(pts: impl IntoIterator<Item = &'a Point2<f64>>) -> Matrix3<f64> {
    let pts: Vec<&Point2<f64>> = pts.into_iter().collect();
    if pts.is_empty() {
        return Matrix3::identity();
    }
    let n = pts.len() as f64;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in &pts {
        cx += p.x;
        cy += p.y;
    }
    cx /= n;
    cy /= n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-12 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };
    Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

/// Map `p` through `h`; `None` for points at infinity.
#[inline]
pub fn apply(h: &Matrix3<f64>, p: &Point2<f64>) -> Option<Point2<f64>> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    if v.z.abs() < 1e-12 {
        return None;
    }
    Some(Point2::new(v.x / v.z, v.y / v.z))
}

/// Estimate `H` such that `dst ~ H * src` with the normalized DLT.
///
/// Needs at least 4 correspondences; the result is scaled so `H[(2,2)] = 1`.
pub fn estimate_homography(src: &[Point2<f64>], dst: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    if src.len() != dst.len() || src.len() < 4 {
        return None;
    }

    let t_src = conditioning(src);
    let t_dst = conditioning(dst);

    let n = src.len();
    let mut a = DMatrix::<f64>::zeros(2 * n, 9);
    for (k, (s, d)) in src.iter().zip(dst).enumerate() {
        let sn = t_src * Vector3::new(s.x, s.y, 1.0);
        let dn = t_dst * Vector3::new(d.x, d.y, 1.0);
        let (x, y) = (sn.x, sn.y);
        let (u, v) = (dn.x, dn.y);

        // [ -x -y -1   0  0  0   u*x u*y u ]
        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        // [ 0  0  0  -x -y -1   v*x v*y v ]
        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    // smallest right singular vector
    let svd = a.svd(false, true);
    let vt = svd.v_t?;
    let last = vt.nrows().checked_sub(1)?;
    let h = vt.row(last);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    let h = t_dst.try_inverse()? * hn * t_src;
    let s = h[(2, 2)];
    if s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> Vec<Point2<f64>> {
        (0..6)
            .flat_map(|j| (0..9).map(move |i| Point2::new(i as f64 * 0.023, j as f64 * 0.023)))
            .collect()
    }

    #[test]
    fn recovers_projective_map() {
        let h_gt = Matrix3::new(
            2800.0, 120.0, 210.0, //
            -90.0, 2650.0, 160.0, //
            0.4, -0.3, 1.0,
        );
        let src = grid();
        let dst: Vec<_> = src.iter().map(|p| apply(&h_gt, p).unwrap()).collect();

        let h = estimate_homography(&src, &dst).expect("homography");
        for (s, d) in src.iter().zip(&dst) {
            let p = apply(&h, s).unwrap();
            assert_relative_eq!(p.x, d.x, epsilon = 1e-6);
            assert_relative_eq!(p.y, d.y, epsilon = 1e-6);
        }
    }

    #[test]
    fn rejects_too_few_points() {
        let src = grid();
        assert!(estimate_homography(&src[..3], &src[..3]).is_none());
        assert!(estimate_homography(&src[..5], &src[..4]).is_none());
    }

    #[test]
    fn conditioning_centers_and_scales() {
        let pts = vec![
            Point2::new(10.0, 10.0),
            Point2::new(30.0, 10.0),
            Point2::new(30.0, 30.0),
            Point2::new(10.0, 30.0),
        ];
        let t = conditioning(&pts);
        let mapped: Vec<_> = pts.iter().map(|p| apply(&t, p).unwrap()).collect();
        let cx: f64 = mapped.iter().map(|p| p.x).sum::<f64>() / 4.0;
        let mean: f64 = mapped.iter().map(|p| p.coords.norm()).sum::<f64>() / 4.0;
        assert_relative_eq!(cx, 0.0, epsilon = 1e-12);
        assert_relative_eq!(mean, std::f64::consts::SQRT_2, epsilon = 1e-12);
    }
}
