//! Conversions between field elements and their textual forms.

use ark_ff::{BigInteger, PrimeField};

use crate::{Fr, Poseidon2Error, hash::bytes_to_elements};

/// Parses a hex string, with or without `0x` prefix, reducing it modulo the field order.
///
/// Odd-length strings are accepted as if they carried a leading zero.
pub fn hex_to_field(hex_string: &str) -> Result<Fr, Poseidon2Error> {
    let digits = hex_string
        .strip_prefix("0x")
        .or_else(|| hex_string.strip_prefix("0X"))
        .unwrap_or(hex_string);
    let bytes = if digits.len() % 2 == 1 {
        hex::decode(format!("0{digits}"))?
    } else {
        hex::decode(digits)?
    };
    Ok(Fr::from_be_bytes_mod_order(&bytes))
}

/// Formats `x` as `0x` followed by 64 lowercase hex digits.
pub fn field_to_hex(x: &Fr) -> String {
    format!("0x{}", hex::encode(x.into_bigint().to_bytes_be()))
}

/// Splits the UTF-8 bytes of `text` into 31-byte big-endian field elements.
pub fn str_to_elements(text: &str) -> Vec<Fr> {
    bytes_to_elements(text.as_bytes())
}
