#![warn(missing_docs)]
//! This crate defines the snarkjs/circom artifacts consumed by the Poseidon2 Groth16 harness and
//! utilities to read them from files. Only the `bn254` curve (`bn128` in circom) is supported.
mod binfile;
pub mod groth16;
pub mod serde_compat;
pub mod traits;

pub use binfile::ZKeyParserError;

/// Indicates whether we should check if deserialized points are valid
/// points on the curve.
/// `No` skips those checks, which is by orders of magnitude faster,
/// but must only be used for trusted artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckElement {
    /// Perform curve and subgroup checks
    Yes,
    /// Skip curve and subgroup checks
    No,
}

pub(crate) mod reader_utils {
    use std::io::Read;
    use std::str::Utf8Error;
    use thiserror::Error;

    /// Error type describing errors during reading circom file headers
    #[derive(Debug, Error)]
    pub enum InvalidHeaderError {
        /// Error during IO operations (reading/opening file, etc.)
        #[error(transparent)]
        IoError(#[from] std::io::Error),
        /// File header is not valid UTF-8
        #[error(transparent)]
        Utf8Error(#[from] Utf8Error),
        /// File header does not match the expected header
        #[error("Wrong header. Expected {0} but got {1}")]
        WrongHeader(String, String),
    }

    pub(crate) fn read_header<R: Read>(
        mut reader: R,
        should_header: &str,
    ) -> Result<(), InvalidHeaderError> {
        let mut buf = [0_u8; 4];
        reader.read_exact(&mut buf)?;
        let is_header = std::str::from_utf8(&buf[..])?;
        if is_header == should_header {
            Ok(())
        } else {
            Err(InvalidHeaderError::WrongHeader(
                should_header.to_owned(),
                is_header.to_owned(),
            ))
        }
    }
}
