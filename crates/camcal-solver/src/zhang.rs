use crate::CalibrateError;
use nalgebra::{DMatrix, Matrix3, SVector};

/// Zhang's closed form needs the null vector of a 6-column system.
pub const MIN_VIEWS: usize = 3;

/// The 6-vector `v_ij(H)` of Zhang's method.
fn v_ij(h: &Matrix3<f64>, i: usize, j: usize) -> SVector<f64, 6> {
    let hi = h.column(i);
    let hj = h.column(j);
    SVector::<f64, 6>::from_row_slice(&[
        hi[0] * hj[0],
        hi[0] * hj[1] + hi[1] * hj[0],
        hi[1] * hj[1],
        hi[2] * hj[0] + hi[0] * hj[2],
        hi[2] * hj[1] + hi[1] * hj[2],
        hi[2] * hj[2],
    ])
}

/// Estimate the intrinsic matrix from plane-to-image homographies, with
/// skew constrained to zero.
///
/// `conditioning` is a pixel similarity (see [`crate::conditioning`]) applied
/// to every homography before solving; it keeps the entries of `B = K⁻ᵀK⁻¹`
/// on comparable scales. The returned matrix is in raw pixel units.
pub fn estimate_intrinsics(
    homographies: &[Matrix3<f64>],
    conditioning: &Matrix3<f64>,
) -> Result<Matrix3<f64>, CalibrateError> {
    if homographies.len() < MIN_VIEWS {
        return Err(CalibrateError::NotEnoughViews {
            have: homographies.len(),
            need: MIN_VIEWS,
        });
    }

    let m = homographies.len();
    let mut v = DMatrix::<f64>::zeros(2 * m + 1, 6);
    for (k, h) in homographies.iter().enumerate() {
        let hc = conditioning * h;
        let norm = hc.norm();
        if norm < 1e-12 {
            return Err(CalibrateError::DegenerateIntrinsics("zero homography"));
        }
        let hc = hc / norm;
        let v11 = v_ij(&hc, 0, 0);
        let v22 = v_ij(&hc, 1, 1);
        let v12 = v_ij(&hc, 0, 1);
        v.row_mut(2 * k).copy_from(&v12.transpose());
        v.row_mut(2 * k + 1).copy_from(&(v11 - v22).transpose());
    }

    // Zero skew: B12 = 0, weighted to dominate the data rows.
    let weight = 10.0
        * v.row_iter()
            .map(|r| r.norm())
            .fold(0.0f64, f64::max)
            .max(1.0);
    v[(2 * m, 1)] = weight;

    let svd = v.svd(false, true);
    let s = &svd.singular_values;
    if s.len() < 6 || s[4] <= 1e-12 * s[0] {
        return Err(CalibrateError::DegenerateIntrinsics(
            "views do not constrain the intrinsics",
        ));
    }
    let v_t = svd
        .v_t
        .ok_or(CalibrateError::DegenerateIntrinsics("svd failed"))?;
    let b = v_t.row(v_t.nrows() - 1);
    let sign = if b[0] < 0.0 { -1.0 } else { 1.0 };
    let (b11, b12, b22, b13, b23, b33) = (
        sign * b[0],
        sign * b[1],
        sign * b[2],
        sign * b[3],
        sign * b[4],
        sign * b[5],
    );

    let denom = b11 * b22 - b12 * b12;
    let denom_norm = b11 * b11 + b22 * b22;
    if denom_norm <= 0.0 || denom.abs() / denom_norm < 1e-9 {
        return Err(CalibrateError::DegenerateIntrinsics(
            "views do not constrain the focal lengths",
        ));
    }

    let cy = (b12 * b13 - b11 * b23) / denom;
    let lambda = b33 - (b13 * b13 + cy * (b12 * b13 - b11 * b23)) / b11;
    let fx2 = lambda / b11;
    let fy2 = lambda * b11 / denom;
    if !(fx2 > 0.0 && fy2 > 0.0) {
        return Err(CalibrateError::DegenerateIntrinsics("negative focal length"));
    }
    let fx = fx2.sqrt();
    let fy = fy2.sqrt();
    let cx = -b13 * fx2 / lambda;

    let k_cond = Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0);
    let t_inv = conditioning
        .try_inverse()
        .ok_or(CalibrateError::DegenerateIntrinsics("singular conditioning"))?;
    let mut k = t_inv * k_cond;
    k[(0, 1)] = 0.0;
    Ok(k)
}
