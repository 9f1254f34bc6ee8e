//! Reader for the sectioned binary container snarkjs uses for `.zkey` files.
//!
//! Layout: a four byte magic, a `u32` version, a `u32` section count, then for every section a
//! `u32` type id, a `u64` length and the section payload. All integers are little-endian.
use std::collections::HashMap;
use std::io::{Cursor, Read};

use ark_serialize::SerializationError;
use byteorder::{LittleEndian, ReadBytesExt};
use thiserror::Error;

use crate::reader_utils::{self, InvalidHeaderError};

/// Error type describing errors during parsing zkey files
#[derive(Debug, Error)]
pub enum ZKeyParserError {
    /// Error during serialization
    #[error(transparent)]
    SerializationError(#[from] SerializationError),
    /// Error describing that an invalid modulus was found in the header for the chosen curve
    #[error("invalid {0} modulus found in header for chosen curve")]
    InvalidPrimeInHeader(&'static str),
    /// Error describing that the zkey is not a Groth16 zkey
    #[error("unsupported protocol id {0}, only Groth16 (1) is supported")]
    UnsupportedProtocol(u32),
    /// Error describing that the container version is not understood
    #[error("unsupported zkey version {0}")]
    UnsupportedVersion(u32),
    /// Error describing that a required section is absent
    #[error("zkey is missing section {0}")]
    MissingSection(u32),
    /// Error describing that a section is shorter or longer than its header claims
    #[error("corrupted zkey: {0}")]
    CorruptedBinFile(String),
    /// Error during IO operations (reading/opening file, etc.)
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// File header does not match the expected header
    #[error(transparent)]
    WrongHeader(#[from] InvalidHeaderError),
}

/// The sections of a binary circom file, keyed by section id.
#[derive(Debug)]
pub(crate) struct BinFile {
    sections: HashMap<u32, Vec<u8>>,
}

impl BinFile {
    const SUPPORTED_VERSION: u32 = 1;

    pub(crate) fn from_reader<R: Read>(
        mut reader: R,
        magic: &str,
    ) -> Result<Self, ZKeyParserError> {
        reader_utils::read_header(&mut reader, magic)?;
        let version = reader.read_u32::<LittleEndian>()?;
        if version != Self::SUPPORTED_VERSION {
            return Err(ZKeyParserError::UnsupportedVersion(version));
        }
        let num_sections = reader.read_u32::<LittleEndian>()?;
        tracing::debug!("reading {magic} v{version} with {num_sections} sections");

        let mut sections = HashMap::with_capacity(num_sections as usize);
        for _ in 0..num_sections {
            let id = reader.read_u32::<LittleEndian>()?;
            let len = reader.read_u64::<LittleEndian>()?;
            let mut payload = Vec::new();
            let read = (&mut reader).take(len).read_to_end(&mut payload)?;
            if read as u64 != len {
                return Err(ZKeyParserError::CorruptedBinFile(format!(
                    "section {id} claims {len} bytes but only {read} are present"
                )));
            }
            if sections.insert(id, payload).is_some() {
                return Err(ZKeyParserError::CorruptedBinFile(format!(
                    "section {id} appears twice"
                )));
            }
        }
        Ok(Self { sections })
    }

    /// Returns a reader over the payload of section `id`.
    pub(crate) fn section(&self, id: u32) -> Result<Cursor<&[u8]>, ZKeyParserError> {
        self.sections
            .get(&id)
            .map(|payload| Cursor::new(payload.as_slice()))
            .ok_or(ZKeyParserError::MissingSection(id))
    }
}

/// Checks that a section reader has been consumed entirely.
pub(crate) fn expect_consumed(
    section: &Cursor<&[u8]>,
    id: u32,
) -> Result<(), ZKeyParserError> {
    let len = section.get_ref().len() as u64;
    if section.position() == len {
        Ok(())
    } else {
        Err(ZKeyParserError::CorruptedBinFile(format!(
            "section {id} has {} trailing bytes",
            len - section.position()
        )))
    }
}

#[cfg(test)]
mod tests {
    use byteorder::{LittleEndian, WriteBytesExt};

    use super::{BinFile, ZKeyParserError};

    fn container(version: u32, sections: &[(u32, &[u8])]) -> Vec<u8> {
        let mut buf = b"zkey".to_vec();
        buf.write_u32::<LittleEndian>(version).unwrap();
        buf.write_u32::<LittleEndian>(sections.len() as u32).unwrap();
        for (id, payload) in sections {
            buf.write_u32::<LittleEndian>(*id).unwrap();
            buf.write_u64::<LittleEndian>(payload.len() as u64).unwrap();
            buf.extend_from_slice(payload);
        }
        buf
    }

    #[test]
    fn reads_sections_by_id() {
        let bytes = container(1, &[(2, b"two"), (1, b"one")]);
        let binfile = BinFile::from_reader(bytes.as_slice(), "zkey").unwrap();
        assert_eq!(*binfile.section(1).unwrap().get_ref(), b"one");
        assert_eq!(*binfile.section(2).unwrap().get_ref(), b"two");
        assert!(matches!(
            binfile.section(3),
            Err(ZKeyParserError::MissingSection(3))
        ));
    }

    #[test]
    fn rejects_wrong_magic() {
        let bytes = container(1, &[]);
        assert!(matches!(
            BinFile::from_reader(bytes.as_slice(), "r1cs"),
            Err(ZKeyParserError::WrongHeader(_))
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let bytes = container(2, &[]);
        assert!(matches!(
            BinFile::from_reader(bytes.as_slice(), "zkey"),
            Err(ZKeyParserError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn rejects_truncated_section() {
        let mut bytes = container(1, &[(1, b"payload")]);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            BinFile::from_reader(bytes.as_slice(), "zkey"),
            Err(ZKeyParserError::CorruptedBinFile(_))
        ));
    }
}
