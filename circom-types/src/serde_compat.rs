//! Serde helpers that read and write arkworks BN254 types the way snarkjs does in its JSON files.
//!
//! Field elements are decimal strings. Points are written in projective form: a G1 point is
//! `[x, y, z]`, a G2 point is `[[x0, x1], [y0, y1], [z0, z1]]`. The point at infinity is
//! `["0", "1", "0"]` on G1 and `[["0", "0"], ["1", "0"], ["0", "0"]]` on G2.
//!
//! Use the functions with serde's field attributes:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct MyStruct {
//!     #[serde(serialize_with = "circom_types::serde_compat::serialize_g1")]
//!     #[serde(deserialize_with = "circom_types::serde_compat::deserialize_g1")]
//!     point: ark_bn254::G1Affine,
//! }
//! ```
use std::marker::PhantomData;

use ark_bn254::{Fq, Fq2, Fq6, Fq12, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{PrimeField, Zero};
use serde::{Serializer, de, ser::SerializeSeq as _};

use crate::CheckElement;

#[derive(Debug)]
struct InvalidElement;

/// Serialize a prime field element as a decimal string.
pub fn serialize_f<S: Serializer>(p: &impl PrimeField, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&decimal(p))
}

// `Display` on field elements drops leading zeroes, which prints zero as an empty string.
fn decimal(f: &impl PrimeField) -> String {
    f.into_bigint().to_string()
}

/// Serialize a sequence of prime field elements as an array of decimal strings.
pub fn serialize_f_seq<S: Serializer, F: PrimeField>(ps: &[F], ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(ps.len()))?;
    for p in ps {
        seq.serialize_element(&decimal(p))?;
    }
    seq.end()
}

/// Deserialize a prime field element from a decimal string.
///
/// Values at or above the modulus are reduced, as snarkjs does for circuit inputs.
pub fn deserialize_f<'de, F, D>(deserializer: D) -> Result<F, D::Error>
where
    D: de::Deserializer<'de>,
    F: PrimeField,
{
    deserializer.deserialize_str(FieldVisitor::<F>(PhantomData))
}

/// Deserialize a sequence of prime field elements from an array of decimal strings.
pub fn deserialize_f_seq<'de, D, F>(deserializer: D) -> Result<Vec<F>, D::Error>
where
    D: de::Deserializer<'de>,
    F: PrimeField,
{
    deserializer.deserialize_seq(FieldSeqVisitor::<F>(PhantomData))
}

/// Serialize a G1 point as `[x, y, "1"]`, or `["0", "1", "0"]` for the point at infinity.
pub fn serialize_g1<S: Serializer>(p: &G1Affine, ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(3))?;
    for coordinate in g1_to_strings(p) {
        seq.serialize_element(&coordinate)?;
    }
    seq.end()
}

/// Serialize a sequence of G1 points as an array of `[x, y, z]` arrays.
pub fn serialize_g1_seq<S: Serializer>(ps: &[G1Affine], ser: S) -> Result<S::Ok, S::Error> {
    let mut seq = ser.serialize_seq(Some(ps.len()))?;
    for p in ps {
        seq.serialize_element(&g1_to_strings(p))?;
    }
    seq.end()
}

/// Serialize a G2 point as `[[x0, x1], [y0, y1], ["1", "0"]]`.
pub fn serialize_g2<S: Serializer>(p: &G2Affine, ser: S) -> Result<S::Ok, S::Error> {
    let coordinates = match p.xy() {
        Some((x, y)) => [
            [decimal(&x.c0), decimal(&x.c1)],
            [decimal(&y.c0), decimal(&y.c1)],
            ["1".to_owned(), "0".to_owned()],
        ],
        None => [
            ["0".to_owned(), "0".to_owned()],
            ["1".to_owned(), "0".to_owned()],
            ["0".to_owned(), "0".to_owned()],
        ],
    };
    let mut seq = ser.serialize_seq(Some(3))?;
    for coordinate in coordinates {
        seq.serialize_element(&coordinate)?;
    }
    seq.end()
}

/// Serialize an element of the target group as `[[[String; 2]; 3]; 2]`.
pub fn serialize_gt<S: Serializer>(p: &Fq12, ser: S) -> Result<S::Ok, S::Error> {
    let fq6_to_strings = |c: &Fq6| {
        [c.c0, c.c1, c.c2].map(|fq2| [decimal(&fq2.c0), decimal(&fq2.c1)])
    };
    let mut seq = ser.serialize_seq(Some(2))?;
    seq.serialize_element(&fq6_to_strings(&p.c0))?;
    seq.serialize_element(&fq6_to_strings(&p.c1))?;
    seq.end()
}

/// Deserialize a G1 point and check that it lies on the curve and in the prime order subgroup.
pub fn deserialize_g1<'de, D>(deserializer: D) -> Result<G1Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    let [x, y, z] = deserializer.deserialize_seq(StringArrayVisitor::<3>)?;
    g1_from_strings(&x, &y, &z, CheckElement::Yes)
        .map_err(|_| de::Error::custom("invalid projective point on G1"))
}

/// Deserialize a sequence of G1 points, checking every point.
pub fn deserialize_g1_seq<'de, D>(deserializer: D) -> Result<Vec<G1Affine>, D::Error>
where
    D: de::Deserializer<'de>,
{
    deserializer.deserialize_seq(G1SeqVisitor)
}

/// Deserialize a G2 point and check that it lies on the curve and in the prime order subgroup.
pub fn deserialize_g2<'de, D>(deserializer: D) -> Result<G2Affine, D::Error>
where
    D: de::Deserializer<'de>,
{
    let [x, y, z] = deserializer.deserialize_seq(Fq2ArrayVisitor::<3>)?;
    g2_from_strings(&x, &y, &z, CheckElement::Yes)
        .map_err(|_| de::Error::custom("invalid projective point on G2"))
}

/// Deserialize an element of the target group from `[[[String; 2]; 3]; 2]`.
pub fn deserialize_gt<'de, D>(deserializer: D) -> Result<Fq12, D::Error>
where
    D: de::Deserializer<'de>,
{
    let [c0, c1] = deserializer.deserialize_seq(Fq6PairVisitor)?;
    let to_fq6 = |c: [[String; 2]; 3]| -> Result<Fq6, InvalidElement> {
        Ok(Fq6::new(
            fq2_from_strings(&c[0])?,
            fq2_from_strings(&c[1])?,
            fq2_from_strings(&c[2])?,
        ))
    };
    let c0 = to_fq6(c0).map_err(|_| de::Error::custom("invalid element of Fq12"))?;
    let c1 = to_fq6(c1).map_err(|_| de::Error::custom("invalid element of Fq12"))?;
    Ok(Fq12::new(c0, c1))
}

fn g1_to_strings(p: &G1Affine) -> [String; 3] {
    match p.xy() {
        Some((x, y)) => [decimal(&x), decimal(&y), "1".to_owned()],
        None => ["0".to_owned(), "1".to_owned(), "0".to_owned()],
    }
}

fn fq_from_str(s: &str) -> Result<Fq, InvalidElement> {
    s.parse::<Fq>().map_err(|_| InvalidElement)
}

fn fq2_from_strings(c: &[String; 2]) -> Result<Fq2, InvalidElement> {
    Ok(Fq2::new(fq_from_str(&c[0])?, fq_from_str(&c[1])?))
}

fn g1_from_strings(
    x: &str,
    y: &str,
    z: &str,
    check: CheckElement,
) -> Result<G1Affine, InvalidElement> {
    let (x, y, z) = (fq_from_str(x)?, fq_from_str(y)?, fq_from_str(z)?);
    if z.is_zero() {
        return Ok(G1Affine::zero());
    }
    let p = G1Projective::new_unchecked(x, y, z).into_affine();
    if check == CheckElement::Yes
        && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
    {
        return Err(InvalidElement);
    }
    Ok(p)
}

fn g2_from_strings(
    x: &[String; 2],
    y: &[String; 2],
    z: &[String; 2],
    check: CheckElement,
) -> Result<G2Affine, InvalidElement> {
    let (x, y, z) = (
        fq2_from_strings(x)?,
        fq2_from_strings(y)?,
        fq2_from_strings(z)?,
    );
    if z.is_zero() {
        return Ok(G2Affine::zero());
    }
    let p = G2Projective::new_unchecked(x, y, z).into_affine();
    if check == CheckElement::Yes
        && (!p.is_on_curve() || !p.is_in_correct_subgroup_assuming_on_curve())
    {
        return Err(InvalidElement);
    }
    Ok(p)
}

struct FieldVisitor<F>(PhantomData<F>);

impl<'de, F: PrimeField> de::Visitor<'de> for FieldVisitor<F> {
    type Value = F;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a decimal string representing an element of F_{}", F::MODULUS)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        F::from_str(v).map_err(|_| E::custom(format!("invalid field element: {v:?}")))
    }
}

struct FieldSeqVisitor<F>(PhantomData<F>);

impl<'de, F: PrimeField> de::Visitor<'de> for FieldSeqVisitor<F> {
    type Value = Vec<F>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a sequence of decimal strings in F_{}", F::MODULUS)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or_default());
        while let Some(s) = seq.next_element::<String>()? {
            values.push(
                F::from_str(&s)
                    .map_err(|_| de::Error::custom(format!("invalid field element: {s:?}")))?,
            );
        }
        Ok(values)
    }
}

/// Reads exactly `N` strings.
struct StringArrayVisitor<const N: usize>;

impl<'de, const N: usize> de::Visitor<'de> for StringArrayVisitor<N> {
    type Value = [String; N];

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a sequence of {N} decimal strings")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::with_capacity(N);
        while let Some(s) = seq.next_element::<String>()? {
            if values.len() == N {
                return Err(de::Error::invalid_length(N + 1, &self));
            }
            values.push(s);
        }
        values
            .try_into()
            .map_err(|values: Vec<String>| de::Error::invalid_length(values.len(), &self))
    }
}

/// Reads exactly `N` pairs of strings, i.e. the coordinates of a point on G2.
struct Fq2ArrayVisitor<const N: usize>;

impl<'de, const N: usize> de::Visitor<'de> for Fq2ArrayVisitor<N> {
    type Value = [[String; 2]; N];

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(formatter, "a sequence of {N} pairs of decimal strings")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = Vec::with_capacity(N);
        while let Some(pair) = seq.next_element::<[String; 2]>()? {
            if values.len() == N {
                return Err(de::Error::invalid_length(N + 1, &self));
            }
            values.push(pair);
        }
        values
            .try_into()
            .map_err(|values: Vec<[String; 2]>| de::Error::invalid_length(values.len(), &self))
    }
}

struct Fq6PairVisitor;

impl<'de> de::Visitor<'de> for Fq6PairVisitor {
    type Value = [[[String; 2]; 3]; 2];

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("an element of Fq12 as a sequence of form [[[String; 2]; 3]; 2]")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let c0 = seq
            .next_element::<[[String; 2]; 3]>()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let c1 = seq
            .next_element::<[[String; 2]; 3]>()?
            .ok_or_else(|| de::Error::invalid_length(1, &self))?;
        if seq.next_element::<de::IgnoredAny>()?.is_some() {
            return Err(de::Error::invalid_length(3, &self));
        }
        Ok([c0, c1])
    }
}

struct G1SeqVisitor;

impl<'de> de::Visitor<'de> for G1SeqVisitor {
    type Value = Vec<G1Affine>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence of projective points on G1")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut values = vec![];
        while let Some([x, y, z]) = seq.next_element::<[String; 3]>()? {
            values.push(
                g1_from_strings(&x, &y, &z, CheckElement::Yes)
                    .map_err(|_| de::Error::custom("invalid projective point on G1"))?,
            );
        }
        Ok(values)
    }
}
