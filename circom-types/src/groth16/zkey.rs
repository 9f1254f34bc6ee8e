//! This module defines the [`ZKey`] struct, the Groth16 proving key written by
//! `snarkjs groth16 setup` / `snarkjs zkey contribute`, converted to arkworks types.
//!
//! Sections of a Groth16 zkey:
//!
//! | id | content                                                                 |
//! |----|-------------------------------------------------------------------------|
//! | 1  | protocol id (1 = Groth16)                                               |
//! | 2  | field sizes and moduli, `nVars`, `nPublic`, domain size, α₁ β₁ β₂ γ₂ δ₁ δ₂ |
//! | 3  | IC, `nPublic + 1` points in G1                                          |
//! | 4  | the non-zero coefficients of the A and B matrices                       |
//! | 5  | A query, `nVars` points in G1                                           |
//! | 6  | B query, `nVars` points in G1                                           |
//! | 7  | B query, `nVars` points in G2                                           |
//! | 8  | C query (the `l_query` of arkworks), `nVars - nPublic - 1` points in G1 |
//! | 9  | H query, `domainSize` points in G1                                      |
//! | 10 | contributions (ignored)                                                 |
use std::io::{Cursor, Read};
use std::path::Path;

use ark_ec::pairing::Pairing;
use ark_groth16::{ProvingKey, VerifyingKey};
use ark_relations::r1cs::ConstraintMatrices;
use byteorder::{LittleEndian, ReadBytesExt};

use crate::CheckElement;
use crate::ZKeyParserError;
use crate::binfile::{self, BinFile};
use crate::traits::CircomArkworksPairingBridge;

type Result<T> = std::result::Result<T, ZKeyParserError>;

const GROTH16_PROTOCOL_ID: u32 = 1;

/// A Groth16 proving key together with the constraint matrices of the circuit, read from a
/// snarkjs `.zkey` file.
#[derive(Debug, Clone)]
pub struct ZKey<P: Pairing> {
    /// The number of public inputs (outputs and public inputs of the circuit)
    pub n_public: usize,
    /// The size of the evaluation domain
    pub domain_size: usize,
    /// The proving key, including the verifying key
    pub pk: ProvingKey<P>,
    /// The A and B matrices of the circuit, without the constraints that bind the public
    /// inputs. The C matrix is left empty as the circom reduction never reads it.
    pub matrices: ConstraintMatrices<P::ScalarField>,
}

#[derive(Debug)]
struct HeaderGroth<P: Pairing> {
    n_vars: usize,
    n_public: usize,
    domain_size: usize,
    alpha_g1: P::G1Affine,
    beta_g1: P::G1Affine,
    beta_g2: P::G2Affine,
    gamma_g2: P::G2Affine,
    delta_g1: P::G1Affine,
    delta_g2: P::G2Affine,
}

impl<P: Pairing + CircomArkworksPairingBridge> ZKey<P> {
    /// Deserializes a [`ZKey`] from a reader, optionally checking every point.
    pub fn from_reader<R: Read>(reader: R, check: CheckElement) -> Result<Self> {
        let binfile = BinFile::from_reader(reader, "zkey")?;

        let mut section = binfile.section(1)?;
        let protocol = section.read_u32::<LittleEndian>()?;
        if protocol != GROTH16_PROTOCOL_ID {
            return Err(ZKeyParserError::UnsupportedProtocol(protocol));
        }

        let header = HeaderGroth::<P>::read(&mut binfile.section(2)?, check)?;
        tracing::debug!(
            n_vars = header.n_vars,
            n_public = header.n_public,
            domain_size = header.domain_size,
            "read groth16 zkey header"
        );
        if header.n_vars <= header.n_public {
            return Err(ZKeyParserError::CorruptedBinFile(format!(
                "nVars ({}) must exceed nPublic ({})",
                header.n_vars, header.n_public
            )));
        }
        let n_private = header.n_vars - header.n_public - 1;

        let ic = read_g1_section::<P>(&binfile, 3, header.n_public + 1, check)?;
        let matrices = read_coefficients::<P>(&binfile, &header)?;
        let a_query = read_g1_section::<P>(&binfile, 5, header.n_vars, check)?;
        let b_g1_query = read_g1_section::<P>(&binfile, 6, header.n_vars, check)?;
        let b_g2_query = read_g2_section::<P>(&binfile, 7, header.n_vars, check)?;
        let l_query = read_g1_section::<P>(&binfile, 8, n_private, check)?;
        let h_query = read_g1_section::<P>(&binfile, 9, header.domain_size, check)?;

        let vk = VerifyingKey::<P> {
            alpha_g1: header.alpha_g1,
            beta_g2: header.beta_g2,
            gamma_g2: header.gamma_g2,
            delta_g2: header.delta_g2,
            gamma_abc_g1: ic,
        };
        let pk = ProvingKey::<P> {
            vk,
            beta_g1: header.beta_g1,
            delta_g1: header.delta_g1,
            a_query,
            b_g1_query,
            b_g2_query,
            h_query,
            l_query,
        };
        Ok(Self {
            n_public: header.n_public,
            domain_size: header.domain_size,
            pk,
            matrices,
        })
    }

    /// Reads a [`ZKey`] from a file, optionally checking every point.
    pub fn from_path(path: impl AsRef<Path>, check: CheckElement) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file), check)
    }

    /// Returns the constraint matrices and the proving key.
    pub fn as_inner(&self) -> (&ConstraintMatrices<P::ScalarField>, &ProvingKey<P>) {
        (&self.matrices, &self.pk)
    }

    /// Consumes `self` and returns the constraint matrices and the proving key.
    pub fn into_inner(self) -> (ConstraintMatrices<P::ScalarField>, ProvingKey<P>) {
        (self.matrices, self.pk)
    }
}

impl<P: Pairing + CircomArkworksPairingBridge> HeaderGroth<P> {
    fn read(section: &mut Cursor<&[u8]>, check: CheckElement) -> Result<Self> {
        let n8q = section.read_u32::<LittleEndian>()? as usize;
        let mut q = vec![0u8; n8q];
        section.read_exact(&mut q)?;
        if n8q != P::BASE_FIELD_BYTE_SIZE || !P::is_base_field_modulus(&q) {
            return Err(ZKeyParserError::InvalidPrimeInHeader("base field"));
        }
        let n8r = section.read_u32::<LittleEndian>()? as usize;
        let mut r = vec![0u8; n8r];
        section.read_exact(&mut r)?;
        if n8r != P::SCALAR_FIELD_BYTE_SIZE || !P::is_scalar_field_modulus(&r) {
            return Err(ZKeyParserError::InvalidPrimeInHeader("scalar field"));
        }

        let n_vars = section.read_u32::<LittleEndian>()? as usize;
        let n_public = section.read_u32::<LittleEndian>()? as usize;
        let domain_size = section.read_u32::<LittleEndian>()? as usize;

        let alpha_g1 = read_g1::<P>(&mut *section, check)?;
        let beta_g1 = read_g1::<P>(&mut *section, check)?;
        let beta_g2 = read_g2::<P>(&mut *section, check)?;
        let gamma_g2 = read_g2::<P>(&mut *section, check)?;
        let delta_g1 = read_g1::<P>(&mut *section, check)?;
        let delta_g2 = read_g2::<P>(&mut *section, check)?;
        binfile::expect_consumed(section, 2)?;

        Ok(Self {
            n_vars,
            n_public,
            domain_size,
            alpha_g1,
            beta_g1,
            beta_g2,
            gamma_g2,
            delta_g1,
            delta_g2,
        })
    }
}

fn read_g1<P: CircomArkworksPairingBridge>(
    mut reader: impl Read,
    check: CheckElement,
) -> Result<P::G1Affine> {
    let mut buf = vec![0u8; P::G1_SERIALIZED_BYTE_SIZE_UNCOMPRESSED];
    reader.read_exact(&mut buf)?;
    Ok(P::g1_from_bytes(&buf, check)?)
}

fn read_g2<P: CircomArkworksPairingBridge>(
    mut reader: impl Read,
    check: CheckElement,
) -> Result<P::G2Affine> {
    let mut buf = vec![0u8; P::G2_SERIALIZED_BYTE_SIZE_UNCOMPRESSED];
    reader.read_exact(&mut buf)?;
    Ok(P::g2_from_bytes(&buf, check)?)
}

fn read_g1_section<P: CircomArkworksPairingBridge>(
    binfile: &BinFile,
    id: u32,
    num: usize,
    check: CheckElement,
) -> Result<Vec<P::G1Affine>> {
    let mut section = binfile.section(id)?;
    let points = P::g1_vec_from_reader(&mut section, num, check)?;
    binfile::expect_consumed(&section, id)?;
    Ok(points)
}

fn read_g2_section<P: CircomArkworksPairingBridge>(
    binfile: &BinFile,
    id: u32,
    num: usize,
    check: CheckElement,
) -> Result<Vec<P::G2Affine>> {
    let mut section = binfile.section(id)?;
    let points = P::g2_vec_from_reader(&mut section, num, check)?;
    binfile::expect_consumed(&section, id)?;
    Ok(points)
}

/// Reads section 4 into the A and B matrices.
///
/// snarkjs appends one constraint per public input (and the constant one) to A. arkworks
/// adds those itself during the reduction, so they are cut off here.
fn read_coefficients<P: CircomArkworksPairingBridge>(
    binfile: &BinFile,
    header: &HeaderGroth<P>,
) -> Result<ConstraintMatrices<P::ScalarField>> {
    let mut section = binfile.section(4)?;
    let num_coeffs = section.read_u32::<LittleEndian>()?;

    let mut matrices: [Vec<Vec<(P::ScalarField, usize)>>; 2] = [vec![], vec![]];
    let mut max_constraint_index = 0;
    for _ in 0..num_coeffs {
        let matrix = section.read_u32::<LittleEndian>()? as usize;
        let constraint = section.read_u32::<LittleEndian>()? as usize;
        let signal = section.read_u32::<LittleEndian>()? as usize;
        let value = P::fr_from_reader_for_groth16_zkey(&mut section)?;

        if matrix > 1 {
            return Err(ZKeyParserError::CorruptedBinFile(format!(
                "coefficient refers to matrix {matrix}"
            )));
        }
        if signal >= header.n_vars {
            return Err(ZKeyParserError::CorruptedBinFile(format!(
                "coefficient refers to signal {signal} but there are only {} signals",
                header.n_vars
            )));
        }
        let rows = &mut matrices[matrix];
        if rows.len() <= constraint {
            rows.resize_with(constraint + 1, Vec::new);
        }
        rows[constraint].push((value, signal));
        max_constraint_index = max_constraint_index.max(constraint);
    }
    binfile::expect_consumed(&section, 4)?;

    let num_constraints = (max_constraint_index + 1).saturating_sub(header.n_public + 1);
    let [mut a, mut b] = matrices;
    a.resize_with(num_constraints, Vec::new);
    b.resize_with(num_constraints, Vec::new);

    Ok(ConstraintMatrices {
        num_instance_variables: header.n_public + 1,
        num_witness_variables: header.n_vars - header.n_public - 1,
        num_constraints,
        a_num_non_zero: a.iter().map(Vec::len).sum(),
        b_num_non_zero: b.iter().map(Vec::len).sum(),
        c_num_non_zero: 0,
        a,
        b,
        c: vec![],
    })
}

#[cfg(test)]
mod tests {
    use ark_bn254::{Bn254, Fq, Fr, G1Affine, G1Projective, G2Affine, G2Projective};
    use ark_ec::{AffineRepr, CurveGroup};
    use ark_ff::{BigInteger, PrimeField, UniformRand};
    use ark_serialize::CanonicalSerialize;
    use byteorder::{LittleEndian, WriteBytesExt};

    use super::ZKey;
    use crate::{CheckElement, ZKeyParserError};

    const N_VARS: usize = 4;
    const N_PUBLIC: usize = 1;
    const DOMAIN_SIZE: usize = 4;

    fn write_fq(buf: &mut Vec<u8>, f: &Fq) {
        f.0.serialize_uncompressed(&mut *buf).unwrap();
    }

    fn write_g1(buf: &mut Vec<u8>, p: &G1Affine) {
        match p.xy() {
            Some((x, y)) => {
                write_fq(buf, &x);
                write_fq(buf, &y);
            }
            None => buf.extend_from_slice(&[0u8; 64]),
        }
    }

    fn write_g2(buf: &mut Vec<u8>, p: &G2Affine) {
        let (x, y) = p.xy().unwrap();
        for f in [x.c0, x.c1, y.c0, y.c1] {
            write_fq(buf, &f);
        }
    }

    /// Writes `value` the way snarkjs stores coefficients.
    fn write_coeff(buf: &mut Vec<u8>, matrix: u32, constraint: u32, signal: u32, value: Fr) {
        buf.write_u32::<LittleEndian>(matrix).unwrap();
        buf.write_u32::<LittleEndian>(constraint).unwrap();
        buf.write_u32::<LittleEndian>(signal).unwrap();
        Fr::from_bigint(value.0)
            .unwrap()
            .0
            .serialize_uncompressed(&mut *buf)
            .unwrap();
    }

    struct Fixture {
        g1: Vec<G1Affine>,
        g2: Vec<G2Affine>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut rng = ark_std::test_rng();
            Self {
                g1: (0..32)
                    .map(|_| G1Projective::rand(&mut rng).into_affine())
                    .collect(),
                g2: (0..16)
                    .map(|_| G2Projective::rand(&mut rng).into_affine())
                    .collect(),
            }
        }

        fn sections(&self, protocol: u32) -> Vec<(u32, Vec<u8>)> {
            let mut header = Vec::new();
            header.write_u32::<LittleEndian>(32).unwrap();
            header.extend(Fq::MODULUS.to_bytes_le());
            header.write_u32::<LittleEndian>(32).unwrap();
            header.extend(Fr::MODULUS.to_bytes_le());
            header.write_u32::<LittleEndian>(N_VARS as u32).unwrap();
            header.write_u32::<LittleEndian>(N_PUBLIC as u32).unwrap();
            header.write_u32::<LittleEndian>(DOMAIN_SIZE as u32).unwrap();
            write_g1(&mut header, &self.g1[0]);
            write_g1(&mut header, &self.g1[1]);
            write_g2(&mut header, &self.g2[0]);
            write_g2(&mut header, &self.g2[1]);
            write_g1(&mut header, &self.g1[2]);
            write_g2(&mut header, &self.g2[2]);

            // one constraint: w2 * w0 = ..., then the two public input constraints
            let mut coeffs = Vec::new();
            coeffs.write_u32::<LittleEndian>(4).unwrap();
            write_coeff(&mut coeffs, 0, 0, 2, Fr::from(3u64));
            write_coeff(&mut coeffs, 1, 0, 0, Fr::from(5u64));
            write_coeff(&mut coeffs, 0, 1, 0, Fr::from(1u64));
            write_coeff(&mut coeffs, 0, 2, 1, Fr::from(1u64));

            let g1_section = |range: std::ops::Range<usize>| {
                let mut buf = Vec::new();
                self.g1[range].iter().for_each(|p| write_g1(&mut buf, p));
                buf
            };
            let mut b2 = Vec::new();
            self.g2[3..3 + N_VARS]
                .iter()
                .for_each(|p| write_g2(&mut b2, p));
            let mut a = g1_section(6..6 + N_VARS);
            // a variable that never appears in A has the point at infinity
            a[64..128].fill(0);

            vec![
                (1, protocol.to_le_bytes().to_vec()),
                (2, header),
                (3, g1_section(3..3 + N_PUBLIC + 1)),
                (4, coeffs),
                (5, a),
                (6, g1_section(10..10 + N_VARS)),
                (7, b2),
                (8, g1_section(14..14 + N_VARS - N_PUBLIC - 1)),
                (9, g1_section(16..16 + DOMAIN_SIZE)),
                (10, vec![]),
            ]
        }
    }

    fn container(sections: &[(u32, Vec<u8>)]) -> Vec<u8> {
        let mut buf = b"zkey".to_vec();
        buf.write_u32::<LittleEndian>(1).unwrap();
        buf.write_u32::<LittleEndian>(sections.len() as u32).unwrap();
        for (id, payload) in sections {
            buf.write_u32::<LittleEndian>(*id).unwrap();
            buf.write_u64::<LittleEndian>(payload.len() as u64).unwrap();
            buf.extend_from_slice(payload);
        }
        buf
    }

    #[test]
    fn can_read_groth16_zkey() {
        let fixture = Fixture::new();
        let bytes = container(&fixture.sections(1));
        let zkey = ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::Yes).unwrap();

        assert_eq!(zkey.n_public, N_PUBLIC);
        assert_eq!(zkey.domain_size, DOMAIN_SIZE);
        let (matrices, pk) = zkey.as_inner();
        assert_eq!(pk.vk.alpha_g1, fixture.g1[0]);
        assert_eq!(pk.beta_g1, fixture.g1[1]);
        assert_eq!(pk.vk.beta_g2, fixture.g2[0]);
        assert_eq!(pk.vk.gamma_g2, fixture.g2[1]);
        assert_eq!(pk.delta_g1, fixture.g1[2]);
        assert_eq!(pk.vk.delta_g2, fixture.g2[2]);
        assert_eq!(pk.vk.gamma_abc_g1, fixture.g1[3..5]);
        assert_eq!(pk.a_query[0], fixture.g1[6]);
        assert!(pk.a_query[1].is_zero());
        assert_eq!(pk.b_g1_query, fixture.g1[10..14]);
        assert_eq!(pk.b_g2_query, fixture.g2[3..7]);
        assert_eq!(pk.l_query, fixture.g1[14..16]);
        assert_eq!(pk.h_query, fixture.g1[16..20]);

        assert_eq!(matrices.num_instance_variables, 2);
        assert_eq!(matrices.num_witness_variables, 2);
        assert_eq!(matrices.num_constraints, 1);
        assert_eq!(matrices.a, vec![vec![(Fr::from(3u64), 2)]]);
        assert_eq!(matrices.b, vec![vec![(Fr::from(5u64), 0)]]);
        assert_eq!(matrices.a_num_non_zero, 1);
    }

    #[test]
    fn rejects_plonk_zkey() {
        let bytes = container(&Fixture::new().sections(2));
        assert!(matches!(
            ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::Yes),
            Err(ZKeyParserError::UnsupportedProtocol(2))
        ));
    }

    #[test]
    fn rejects_foreign_curve() {
        let mut sections = Fixture::new().sections(1);
        // replace q by r
        let r = Fr::MODULUS.to_bytes_le();
        sections[1].1[4..36].copy_from_slice(&r);
        let bytes = container(&sections);
        assert!(matches!(
            ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::Yes),
            Err(ZKeyParserError::InvalidPrimeInHeader("base field"))
        ));
    }

    #[test]
    fn rejects_missing_h_section() {
        let mut sections = Fixture::new().sections(1);
        sections.retain(|(id, _)| *id != 9);
        let bytes = container(&sections);
        assert!(matches!(
            ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::Yes),
            Err(ZKeyParserError::MissingSection(9))
        ));
    }

    #[test]
    fn detects_invalid_points_only_when_checking() {
        let mut sections = Fixture::new().sections(1);
        // corrupt the y coordinate of the first IC point
        sections[2].1[40] ^= 1;
        let bytes = container(&sections);
        assert!(ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::Yes).is_err());
        assert!(ZKey::<Bn254>::from_reader(bytes.as_slice(), CheckElement::No).is_ok());
    }
}
