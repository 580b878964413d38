//! Archive writer.

use std::io::Write;

use crate::error::{ArkError, ArkResult};
use crate::matrix::{Matrix, Precision};

/// Output encoding for [`ArkWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArkFormat {
    /// `\0B` binary matrices (default).
    #[default]
    Binary,
    /// Human-readable `[ ... ]` matrices.
    Text,
}

/// Writes `(key, matrix)` records in archive order.
pub struct ArkWriter<W: Write> {
    inner: W,
    format: ArkFormat,
}

impl<W: Write> ArkWriter<W> {
    /// Creates a writer using `format`.
    pub fn new(inner: W, format: ArkFormat) -> Self {
        Self { inner, format }
    }

    /// Writes one record.
    ///
    /// Keys must be non-empty and contain no whitespace.
    pub fn write(&mut self, key: &str, mat: &Matrix) -> ArkResult<()> {
        if key.is_empty() || key.chars().any(char::is_whitespace) {
            return Err(ArkError::InvalidKey(key.to_string()));
        }
        self.inner.write_all(key.as_bytes())?;
        self.inner.write_all(b" ")?;
        match self.format {
            ArkFormat::Binary => self.write_binary(mat),
            ArkFormat::Text => self.write_text(mat),
        }
    }

    /// Flushes the underlying stream.
    pub fn flush(&mut self) -> ArkResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Returns the underlying stream without flushing.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn write_binary(&mut self, mat: &Matrix) -> ArkResult<()> {
        let w = &mut self.inner;
        w.write_all(b"\0B")?;
        w.write_all(mat.precision().token())?;
        write_dim(w, mat.rows())?;
        write_dim(w, mat.cols())?;

        let mut buf = Vec::with_capacity(mat.as_slice().len() * 8);
        match mat.precision() {
            Precision::Float => {
                for &v in mat.as_slice() {
                    buf.extend_from_slice(&(v as f32).to_le_bytes());
                }
            }
            Precision::Double => {
                for &v in mat.as_slice() {
                    buf.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
        w.write_all(&buf)?;
        Ok(())
    }

    fn write_text(&mut self, mat: &Matrix) -> ArkResult<()> {
        let w = &mut self.inner;
        if mat.is_empty() {
            w.write_all(b" [ ]\n")?;
            return Ok(());
        }
        w.write_all(b" [")?;
        for row in mat.iter_rows() {
            w.write_all(b"\n ")?;
            for &v in row {
                match mat.precision() {
                    Precision::Float => write!(w, " {}", v as f32)?,
                    Precision::Double => write!(w, " {}", v)?,
                }
            }
            w.write_all(b" ")?;
        }
        w.write_all(b"]\n")?;
        Ok(())
    }
}

fn write_dim<W: Write>(w: &mut W, n: usize) -> ArkResult<()> {
    let n = i32::try_from(n)
        .map_err(|_| ArkError::InvalidHeader(format!("dimension {} exceeds int32", n)))?;
    w.write_all(&[4])?;
    w.write_all(&n.to_le_bytes())?;
    Ok(())
}
