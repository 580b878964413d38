//! Element-wise averaging of phase-shifted frame matrices.

use ctcsmooth_ark::{Matrix, Precision};

use crate::error::{SmoothError, SmoothResult};

/// Averages the matrices produced for one utterance by each phase.
///
/// With a single input the matrix is returned unchanged. Otherwise the row
/// count of the last matrix is the reference length: earlier matrices
/// longer than it are cut to that many rows, shorter ones are left alone
/// and produce [`SmoothError::ShapeMismatch`]. The result keeps the first
/// matrix's precision.
pub fn average_frames(key: &str, mut mats: Vec<Matrix>) -> SmoothResult<Matrix> {
    if mats.len() <= 1 {
        return mats.pop().ok_or(SmoothError::NoStreams);
    }

    let (ref_rows, ref_cols) = match mats.last() {
        Some(last) => last.shape(),
        None => return Err(SmoothError::NoStreams),
    };
    let n = mats.len();

    for m in mats.iter_mut().take(n - 1) {
        m.truncate_rows(ref_rows);
        if m.shape() != (ref_rows, ref_cols) {
            return Err(SmoothError::ShapeMismatch {
                key: key.to_string(),
                expected_rows: ref_rows,
                expected_cols: ref_cols,
                got_rows: m.rows(),
                got_cols: m.cols(),
            });
        }
    }

    if mats.iter().all(|m| m.precision() == Precision::Float) {
        Ok(mean_f32(mats))
    } else {
        Ok(mean_f64(mats))
    }
}

/// Sums and divides in `f32`, so `FM` output matches single-precision
/// arithmetic bit for bit.
fn mean_f32(mats: Vec<Matrix>) -> Matrix {
    let n = mats.len();
    let mut iter = mats.into_iter();
    let Some(mut out) = iter.next() else {
        return Matrix::zeros(0, 0, Precision::Float);
    };
    let mut acc: Vec<f32> = out.as_slice().iter().map(|&v| v as f32).collect();
    for m in iter {
        for (a, &v) in acc.iter_mut().zip(m.as_slice()) {
            *a += v as f32;
        }
    }
    let scale = n as f32;
    for (o, a) in out.as_mut_slice().iter_mut().zip(&acc) {
        *o = (*a / scale) as f64;
    }
    out
}

fn mean_f64(mats: Vec<Matrix>) -> Matrix {
    let n = mats.len();
    let mut iter = mats.into_iter();
    let Some(mut out) = iter.next() else {
        return Matrix::zeros(0, 0, Precision::Double);
    };
    for m in iter {
        for (a, v) in out.as_mut_slice().iter_mut().zip(m.as_slice()) {
            *a += v;
        }
    }
    let scale = n as f64;
    for v in out.as_mut_slice() {
        *v /= scale;
    }
    out
}
