//! Traits for reading the binary encoding of field elements and curve points found in circom
//! files into their arkworks representation.

use std::io::Read;

use ark_ec::{AffineRepr, pairing::Pairing};
use ark_ff::{BigInteger, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, SerializationError};

use crate::CheckElement;

type SerResult<T> = Result<T, SerializationError>;

/// Bridge trait to deserialize the pairing elements contained in circom files into
/// [`ark_ec::pairing::Pairing`] representation.
///
/// Circom writes base field elements in Montgomery form, little-endian. Points are written
/// uncompressed as `x || y`, the point at infinity as all zeroes.
pub trait CircomArkworksPairingBridge: Pairing {
    /// Size of an uncompressed element of G1 in bytes
    const G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize;
    /// Size of an uncompressed element of G2 in bytes
    const G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize;
    /// Size of an element of the scalar field in bytes
    const SCALAR_FIELD_BYTE_SIZE: usize;
    /// Size of an element of the base field in bytes
    const BASE_FIELD_BYTE_SIZE: usize;

    /// Returns the name of the curve as defined in circom
    fn get_circom_name() -> String;

    /// Deserializes an element of G1 from bytes already in Montgomery form.
    fn g1_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G1Affine>;

    /// Deserializes an element of G2 from bytes already in Montgomery form.
    fn g2_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G2Affine>;

    /// Deserializes an element of [`Pairing::BaseField`] from bytes already in Montgomery form.
    fn fq_from_montgomery_reader(reader: impl Read) -> SerResult<Self::BaseField>;

    /// Deserializes an element of [`Pairing::ScalarField`] from bytes already in Montgomery form.
    fn fr_from_montgomery_reader(reader: impl Read) -> SerResult<Self::ScalarField>;

    /// Deserializes an element of [`Pairing::ScalarField`] as stored in the coefficient section
    /// of a Groth16 zkey. snarkjs multiplies these by `R` once more before writing them, so an
    /// additional Montgomery reduction is needed.
    fn fr_from_reader_for_groth16_zkey(reader: impl Read) -> SerResult<Self::ScalarField>;

    /// Deserializes `num` elements of G1.
    fn g1_vec_from_reader(
        mut reader: impl Read,
        num: usize,
        check: CheckElement,
    ) -> SerResult<Vec<Self::G1Affine>> {
        let mut buf = vec![0u8; Self::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED * num];
        reader.read_exact(&mut buf)?;

        #[cfg(feature = "parallel")]
        use rayon::prelude::*;

        #[cfg(feature = "parallel")]
        let chunks = buf.par_chunks_exact(Self::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED);
        #[cfg(not(feature = "parallel"))]
        let chunks = buf.chunks_exact(Self::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED);

        chunks
            .map(|chunk| Self::g1_from_bytes(chunk, check))
            .collect::<SerResult<Vec<_>>>()
    }

    /// Deserializes `num` elements of G2.
    fn g2_vec_from_reader(
        mut reader: impl Read,
        num: usize,
        check: CheckElement,
    ) -> SerResult<Vec<Self::G2Affine>> {
        let mut buf = vec![0u8; Self::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED * num];
        reader.read_exact(&mut buf)?;

        #[cfg(feature = "parallel")]
        use rayon::prelude::*;

        #[cfg(feature = "parallel")]
        let chunks = buf.par_chunks_exact(Self::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED);
        #[cfg(not(feature = "parallel"))]
        let chunks = buf.chunks_exact(Self::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED);

        chunks
            .map(|chunk| Self::g2_from_bytes(chunk, check))
            .collect::<SerResult<Vec<_>>>()
    }

    /// Returns `true` if `bytes` is the little-endian encoding of the base field modulus.
    fn is_base_field_modulus(bytes: &[u8]) -> bool {
        <Self::BaseField as PrimeField>::MODULUS.to_bytes_le() == bytes
    }

    /// Returns `true` if `bytes` is the little-endian encoding of the scalar field modulus.
    fn is_scalar_field_modulus(bytes: &[u8]) -> bool {
        <Self::ScalarField as PrimeField>::MODULUS.to_bytes_le() == bytes
    }
}

impl CircomArkworksPairingBridge for ark_bn254::Bn254 {
    const G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize = 64;
    const G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED: usize = 128;
    const SCALAR_FIELD_BYTE_SIZE: usize = 32;
    const BASE_FIELD_BYTE_SIZE: usize = 32;

    fn get_circom_name() -> String {
        "bn128".to_owned()
    }

    fn g1_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G1Affine> {
        let x = Self::fq_from_montgomery_reader(&bytes[..Self::BASE_FIELD_BYTE_SIZE])?;
        let y = Self::fq_from_montgomery_reader(&bytes[Self::BASE_FIELD_BYTE_SIZE..])?;

        if x.is_zero() && y.is_zero() {
            return Ok(Self::G1Affine::zero());
        }

        let p = Self::G1Affine::new_unchecked(x, y);
        if check == CheckElement::Yes
            && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
        {
            return Err(SerializationError::InvalidData);
        }
        Ok(p)
    }

    fn g2_from_bytes(bytes: &[u8], check: CheckElement) -> SerResult<Self::G2Affine> {
        let n = Self::BASE_FIELD_BYTE_SIZE;
        let x0 = Self::fq_from_montgomery_reader(&bytes[..n])?;
        let x1 = Self::fq_from_montgomery_reader(&bytes[n..n * 2])?;
        let y0 = Self::fq_from_montgomery_reader(&bytes[n * 2..n * 3])?;
        let y1 = Self::fq_from_montgomery_reader(&bytes[n * 3..n * 4])?;

        let x = ark_bn254::Fq2::new(x0, x1);
        let y = ark_bn254::Fq2::new(y0, y1);

        if x.is_zero() && y.is_zero() {
            return Ok(Self::G2Affine::zero());
        }

        let p = Self::G2Affine::new_unchecked(x, y);
        if check == CheckElement::Yes
            && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
        {
            return Err(SerializationError::InvalidData);
        }
        Ok(p)
    }

    fn fr_from_montgomery_reader(mut reader: impl Read) -> SerResult<Self::ScalarField> {
        let mut buf = [0u8; Self::SCALAR_FIELD_BYTE_SIZE];
        reader.read_exact(&mut buf)?;
        let bigint =
            <Self::ScalarField as PrimeField>::BigInt::deserialize_uncompressed(buf.as_slice())?;
        Ok(Self::ScalarField::new_unchecked(bigint))
    }

    fn fr_from_reader_for_groth16_zkey(reader: impl Read) -> SerResult<Self::ScalarField> {
        Ok(Self::ScalarField::new_unchecked(
            Self::fr_from_montgomery_reader(reader)?.into_bigint(),
        ))
    }

    fn fq_from_montgomery_reader(mut reader: impl Read) -> SerResult<Self::BaseField> {
        let mut buf = [0u8; Self::BASE_FIELD_BYTE_SIZE];
        reader.read_exact(&mut buf)?;
        let bigint =
            <Self::BaseField as PrimeField>::BigInt::deserialize_uncompressed(buf.as_slice())?;
        Ok(Self::BaseField::new_unchecked(bigint))
    }
}
