//! Dense row-major matrix as stored in Kaldi archives.

/// On-disk element precision of a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// 32-bit float (`FM`).
    #[default]
    Float,
    /// 64-bit float (`DM`).
    Double,
}

impl Precision {
    /// Returns the binary type token, including the trailing space.
    pub fn token(&self) -> &'static [u8] {
        match self {
            Precision::Float => b"FM ",
            Precision::Double => b"DM ",
        }
    }
}

/// A dense matrix of shape `(rows, cols)`.
///
/// Values are held as `f64` regardless of precision; `precision` records
/// how the matrix was stored and how it will be written back.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
    precision: Precision,
}

impl Matrix {
    /// Creates a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize, precision: Precision) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
            precision,
        }
    }

    /// Creates a matrix from row-major data.
    ///
    /// Returns `None` if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>, precision: Precision) -> Option<Self> {
        if data.len() != rows * cols {
            return None;
        }
        Some(Self {
            rows,
            cols,
            data,
            precision,
        })
    }

    /// Creates a `Float` matrix from a slice of rows.
    ///
    /// Returns `None` if the rows have differing lengths.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Option<Self> {
        let cols = rows.first().map(|r| r.as_ref().len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for r in rows {
            let r = r.as_ref();
            if r.len() != cols {
                return None;
            }
            data.extend_from_slice(r);
        }
        Self::from_vec(rows.len(), cols, data, Precision::Float)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Returns the row-major backing data.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Returns row `r`.
    ///
    /// # Panics
    ///
    /// Panics if `r >= rows`.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Returns the element at `(r, c)`, or `None` if out of bounds.
    pub fn get(&self, r: usize, c: usize) -> Option<f64> {
        if r >= self.rows || c >= self.cols {
            return None;
        }
        Some(self.data[r * self.cols + c])
    }

    /// Iterates over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks(0) panics, so an empty matrix yields nothing explicitly.
        let chunk = self.cols.max(1);
        self.data.chunks(chunk).take(if self.cols == 0 { 0 } else { self.rows })
    }

    /// Keeps only the first `rows` rows. Does nothing if the matrix is
    /// already that short.
    pub fn truncate_rows(&mut self, rows: usize) {
        if rows < self.rows {
            self.rows = rows;
            self.data.truncate(rows * self.cols);
        }
    }

    /// Returns true if the matrix has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
