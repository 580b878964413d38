//! Kaldi archive (ark) matrix codec.
//!
//! Reads and writes the table format produced by Kaldi tools such as
//! `nnet-forward` and `net-output-extract`:
//!
//! ```text
//! <key> \0B FM <rows> <cols> <f32 data...>    binary
//! <key>  [ 1 2 3 \n 4 5 6 ]                   text
//! ```
//!
//! Read specifiers follow Kaldi conventions, so `"some-tool ... ark:- |"`
//! runs the command through the shell and reads its stdout.
//!
//! # Example
//!
//! ```rust
//! use ctcsmooth_ark::{ArkFormat, ArkReader, ArkWriter, Matrix};
//!
//! let m = Matrix::from_rows(&[[0.5, 0.5]]).unwrap();
//! let mut w = ArkWriter::new(Vec::new(), ArkFormat::Binary);
//! w.write("utt1", &m).unwrap();
//!
//! let mut r = ArkReader::new(std::io::Cursor::new(w.into_inner()));
//! let (key, back) = r.next().unwrap().unwrap();
//! assert_eq!(key, "utt1");
//! assert_eq!(back, m);
//! ```

mod error;
mod matrix;
mod reader;
pub mod specifier;
mod writer;

pub use error::{ArkError, ArkResult};
pub use matrix::{Matrix, Precision};
pub use reader::ArkReader;
pub use specifier::{open_input, open_rspecifier, Input, PipeInput};
pub use writer::{ArkFormat, ArkWriter};
