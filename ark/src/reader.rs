//! Sequential reader for matrix archives.
//!
//! Each record is `<key> ` followed by either a binary matrix
//! (`\0B` + type token + payload) or a text matrix (`[ ... ]`).
//! Supported binary types:
//!
//! | token | payload |
//! |-------|---------|
//! | `FM`  | `\x04 i32 rows`, `\x04 i32 cols`, `f32` row-major |
//! | `DM`  | same, `f64` |
//! | `CM`  | global header, per-column percentiles, `u8` column-major |
//! | `CM2` | global header, `u16` row-major |
//! | `CM3` | global header, `u8` row-major |

use std::io::{self, BufRead, Read};

use crate::error::{ArkError, ArkResult};
use crate::matrix::{Matrix, Precision};

/// Longest type token accepted before the terminating space.
const MAX_TOKEN_LEN: usize = 8;

/// Scale for 16-bit compressed values.
const U16_SCALE: f32 = 1.52590218966964e-05;

/// Reads `(key, matrix)` records from a buffered byte stream.
///
/// Iteration ends cleanly when the stream is exhausted between records.
/// After the first error the iterator is fused.
pub struct ArkReader<R> {
    inner: R,
    done: bool,
}

impl<R: BufRead> ArkReader<R> {
    /// Creates a reader over `inner`.
    pub fn new(inner: R) -> Self {
        Self { inner, done: false }
    }

    /// Reads the next record, or `None` at end of stream.
    pub fn read_next(&mut self) -> ArkResult<Option<(String, Matrix)>> {
        let Some(key) = self.read_key()? else {
            return Ok(None);
        };

        let mut marker = [0u8; 2];
        read_exact(&mut self.inner, &mut marker)?;
        let mat = if marker == *b"\0B" {
            self.read_binary()?
        } else {
            self.read_text(&marker)?
        };
        Ok(Some((key, mat)))
    }

    fn read_key(&mut self) -> ArkResult<Option<String>> {
        // Skip separators left behind by text records.
        loop {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }
            let skip = buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            let exhausted = skip == buf.len();
            self.inner.consume(skip);
            if !exhausted {
                break;
            }
        }

        let mut raw = Vec::new();
        self.inner.read_until(b' ', &mut raw)?;
        if raw.last() != Some(&b' ') {
            return Err(ArkError::UnexpectedEof);
        }
        raw.pop();

        let key = String::from_utf8(raw)
            .map_err(|e| ArkError::InvalidKey(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
        if key.chars().any(char::is_whitespace) {
            return Err(ArkError::InvalidKey(key));
        }
        Ok(Some(key))
    }

    fn read_token(&mut self) -> ArkResult<String> {
        let mut token = Vec::with_capacity(4);
        loop {
            let mut b = [0u8; 1];
            read_exact(&mut self.inner, &mut b)?;
            if b[0] == b' ' {
                break;
            }
            token.push(b[0]);
            if token.len() > MAX_TOKEN_LEN {
                return Err(ArkError::UnsupportedType(
                    String::from_utf8_lossy(&token).into_owned(),
                ));
            }
        }
        Ok(String::from_utf8_lossy(&token).into_owned())
    }

    fn read_binary(&mut self) -> ArkResult<Matrix> {
        let token = self.read_token()?;
        match token.as_str() {
            "FM" => self.read_full(Precision::Float),
            "DM" => self.read_full(Precision::Double),
            "CM" => self.read_compressed_percentile(),
            "CM2" => self.read_compressed_linear(2),
            "CM3" => self.read_compressed_linear(1),
            _ => Err(ArkError::UnsupportedType(token)),
        }
    }

    fn read_dim(&mut self) -> ArkResult<usize> {
        let mut size = [0u8; 1];
        read_exact(&mut self.inner, &mut size)?;
        if size[0] != 4 {
            return Err(ArkError::InvalidHeader(format!(
                "expected int32 size marker 4, got {}",
                size[0]
            )));
        }
        let mut b = [0u8; 4];
        read_exact(&mut self.inner, &mut b)?;
        to_dim(i32::from_le_bytes(b))
    }

    /// Reads exactly `len` payload bytes. The buffer only grows as bytes
    /// arrive, so a corrupt header cannot force a huge allocation.
    fn read_payload(&mut self, len: usize) -> ArkResult<Vec<u8>> {
        let mut raw = Vec::new();
        (&mut self.inner).take(len as u64).read_to_end(&mut raw)?;
        if raw.len() != len {
            return Err(ArkError::UnexpectedEof);
        }
        Ok(raw)
    }

    fn read_full(&mut self, precision: Precision) -> ArkResult<Matrix> {
        let rows = self.read_dim()?;
        let cols = self.read_dim()?;
        let width = match precision {
            Precision::Float => 4,
            Precision::Double => 8,
        };
        let raw = self.read_payload(payload_len(rows, cols, width)?)?;

        let data = match precision {
            Precision::Float => raw
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
                .collect(),
            Precision::Double => raw
                .chunks_exact(8)
                .map(|c| {
                    let mut b = [0u8; 8];
                    b.copy_from_slice(c);
                    f64::from_le_bytes(b)
                })
                .collect(),
        };

        Matrix::from_vec(rows, cols, data, precision)
            .ok_or_else(|| ArkError::InvalidHeader("payload does not match dimensions".into()))
    }

    fn read_global_header(&mut self) -> ArkResult<GlobalHeader> {
        let mut b = [0u8; 16];
        read_exact(&mut self.inner, &mut b)?;
        Ok(GlobalHeader {
            min_value: f32::from_le_bytes([b[0], b[1], b[2], b[3]]),
            range: f32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            rows: to_dim(i32::from_le_bytes([b[8], b[9], b[10], b[11]]))?,
            cols: to_dim(i32::from_le_bytes([b[12], b[13], b[14], b[15]]))?,
        })
    }

    fn read_compressed_percentile(&mut self) -> ArkResult<Matrix> {
        let h = self.read_global_header()?;

        let raw = self.read_payload(payload_len(h.cols, 1, 8)?)?;
        let col_headers: Vec<[f32; 4]> = raw
            .chunks_exact(8)
            .map(|c| {
                let mut p = [0f32; 4];
                for (i, v) in p.iter_mut().enumerate() {
                    let q = u16::from_le_bytes([c[2 * i], c[2 * i + 1]]);
                    *v = h.min_value + h.range * U16_SCALE * q as f32;
                }
                p
            })
            .collect();

        let bytes = self.read_payload(payload_len(h.rows, h.cols, 1)?)?;

        let mut mat = Matrix::zeros(h.rows, h.cols, Precision::Float);
        let out = mat.as_mut_slice();
        // Column-major on disk.
        for (c, p) in col_headers.iter().enumerate() {
            for r in 0..h.rows {
                let v = bytes[c * h.rows + r];
                out[r * h.cols + c] = percentile_value(p, v) as f64;
            }
        }
        Ok(mat)
    }

    fn read_compressed_linear(&mut self, width: usize) -> ArkResult<Matrix> {
        let h = self.read_global_header()?;
        let raw = self.read_payload(payload_len(h.rows, h.cols, width)?)?;

        let data: Vec<f64> = if width == 2 {
            let step = h.range / 65535.0;
            raw.chunks_exact(2)
                .map(|c| (h.min_value + step * u16::from_le_bytes([c[0], c[1]]) as f32) as f64)
                .collect()
        } else {
            let step = h.range / 255.0;
            raw.iter()
                .map(|&v| (h.min_value + step * v as f32) as f64)
                .collect()
        };

        Matrix::from_vec(h.rows, h.cols, data, Precision::Float)
            .ok_or_else(|| ArkError::InvalidHeader("payload does not match dimensions".into()))
    }

    fn read_text(&mut self, lead: &[u8; 2]) -> ArkResult<Matrix> {
        let mut body = lead.to_vec();
        if !lead.contains(&b']') {
            self.inner.read_until(b']', &mut body)?;
            if body.last() != Some(&b']') {
                return Err(ArkError::UnexpectedEof);
            }
        }

        let text = std::str::from_utf8(&body)
            .map_err(|_| ArkError::InvalidText("not valid utf-8".into()))?;
        let text = text.trim_start();
        let inner = text
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| ArkError::InvalidText(format!("expected '[...]', got {:?}", truncate(text))))?;

        let mut cols = None;
        let mut rows = 0usize;
        let mut data = Vec::new();
        for line in inner.lines() {
            let before = data.len();
            for tok in line.split_whitespace() {
                let v: f64 = tok
                    .parse()
                    .map_err(|_| ArkError::InvalidText(format!("bad number {:?}", tok)))?;
                data.push(v);
            }
            let width = data.len() - before;
            if width == 0 {
                continue;
            }
            match cols {
                None => cols = Some(width),
                Some(c) if c != width => {
                    return Err(ArkError::InvalidText(format!(
                        "row {} has {} columns, expected {}",
                        rows, width, c
                    )));
                }
                Some(_) => {}
            }
            rows += 1;
        }

        Matrix::from_vec(rows, cols.unwrap_or(0), data, Precision::Float)
            .ok_or_else(|| ArkError::InvalidText("inconsistent shape".into()))
    }
}

impl<R: BufRead> Iterator for ArkReader<R> {
    type Item = ArkResult<(String, Matrix)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(rec)) => Some(Ok(rec)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

struct GlobalHeader {
    min_value: f32,
    range: f32,
    rows: usize,
    cols: usize,
}

fn percentile_value(p: &[f32; 4], v: u8) -> f32 {
    let v = v as f32;
    if v <= 64.0 {
        p[0] + (p[1] - p[0]) * v / 64.0
    } else if v <= 192.0 {
        p[1] + (p[2] - p[1]) * (v - 64.0) / 128.0
    } else {
        p[2] + (p[3] - p[2]) * (v - 192.0) / 63.0
    }
}

/// Byte length of a `rows x cols` payload of `width`-byte elements.
fn payload_len(rows: usize, cols: usize, width: usize) -> ArkResult<usize> {
    rows.checked_mul(cols)
        .and_then(|n| n.checked_mul(width))
        .ok_or_else(|| {
            ArkError::InvalidHeader(format!("matrix size {}x{} overflows", rows, cols))
        })
}

fn to_dim(v: i32) -> ArkResult<usize> {
    usize::try_from(v).map_err(|_| ArkError::InvalidHeader(format!("negative dimension {}", v)))
}

fn read_exact<R: io::Read>(r: &mut R, buf: &mut [u8]) -> ArkResult<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ArkError::UnexpectedEof,
        _ => ArkError::Io(e),
    })
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(32) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
