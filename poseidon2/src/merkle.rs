//! Binary Merkle tree over Poseidon2.
//!
//! Nodes are combined with the width-2 compression `P([left, right])[0]`. A level with an odd
//! number of nodes pairs its last node with zero, and the root of an empty tree is zero.

use std::io::{Cursor, Read};

use ark_ff::{BigInteger, PrimeField, Zero};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Fr, Poseidon2Error, Poseidon2Permutation};

/// An authentication path from a leaf to the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    /// The sibling at every level, starting at the leaves
    pub siblings: Vec<Fr>,
    /// `true` if the sibling at the same level sits to the right of the path
    pub directions: Vec<bool>,
}

impl MerkleProof {
    /// Encodes the proof as a little-endian `u32` length, the siblings as 32-byte big-endian
    /// integers and the directions as a bitmap, least significant bit first.
    ///
    /// Fails if siblings and directions disagree in length or the path is too long for the
    /// length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Poseidon2Error> {
        if self.directions.len() != self.siblings.len() {
            return Err(Poseidon2Error::MalformedProof(format!(
                "{} siblings but {} directions",
                self.siblings.len(),
                self.directions.len()
            )));
        }
        let len = length_prefix(self.siblings.len())?;
        let mut out = Vec::with_capacity(4 + self.siblings.len() * 32 + self.directions.len() / 8 + 1);
        // infallible on a Vec
        let _ = out.write_u32::<LittleEndian>(len);
        for sibling in &self.siblings {
            out.extend(sibling.into_bigint().to_bytes_be());
        }
        for chunk in self.directions.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .fold(0u8, |acc, (bit, &right)| acc | (u8::from(right) << bit));
            out.push(byte);
        }
        Ok(out)
    }

    /// Decodes a proof written by [`MerkleProof::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Poseidon2Error> {
        let mut cursor = Cursor::new(bytes);
        let len = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| Poseidon2Error::MalformedProof("missing length prefix".to_owned()))?
            as usize;

        let mut siblings = Vec::with_capacity(len.min(256));
        let mut buf = [0u8; 32];
        for i in 0..len {
            cursor.read_exact(&mut buf).map_err(|_| {
                Poseidon2Error::MalformedProof(format!("truncated at sibling {i} of {len}"))
            })?;
            siblings.push(Fr::from_be_bytes_mod_order(&buf));
        }

        let mut bitmap = Vec::new();
        cursor
            .read_to_end(&mut bitmap)
            .map_err(|e| Poseidon2Error::MalformedProof(e.to_string()))?;
        if bitmap.len() != len.div_ceil(8) {
            return Err(Poseidon2Error::MalformedProof(format!(
                "expected {} direction bytes but got {}",
                len.div_ceil(8),
                bitmap.len()
            )));
        }
        let directions = (0..len)
            .map(|i| bitmap[i / 8] & (1 << (i % 8)) != 0)
            .collect();

        Ok(Self {
            siblings,
            directions,
        })
    }
}

fn length_prefix(len: usize) -> Result<u32, Poseidon2Error> {
    u32::try_from(len)
        .map_err(|_| Poseidon2Error::MalformedProof(format!("{len} levels exceed the length prefix")))
}

/// Builds roots and proofs for binary Merkle trees.
#[derive(Debug, Clone)]
pub struct Poseidon2Merkle {
    permutation: Poseidon2Permutation,
}

impl Default for Poseidon2Merkle {
    fn default() -> Self {
        Self::new()
    }
}

impl Poseidon2Merkle {
    /// Creates a tree hasher using the width-2 permutation.
    pub fn new() -> Self {
        Self {
            permutation: Poseidon2Permutation::for_width(2),
        }
    }

    /// Compresses two nodes into their parent.
    pub fn compress(&self, left: Fr, right: Fr) -> Fr {
        let mut state = [left, right];
        self.permutation.permute_mut(&mut state);
        state[0]
    }

    fn next_level(&self, level: &[Fr]) -> Vec<Fr> {
        level
            .chunks(2)
            .map(|pair| self.compress(pair[0], pair.get(1).copied().unwrap_or_else(Fr::zero)))
            .collect()
    }

    /// The root over `leaves`.
    pub fn root(&self, leaves: &[Fr]) -> Fr {
        let Some(first) = leaves.first() else {
            return Fr::zero();
        };
        if leaves.len() == 1 {
            return *first;
        }
        let mut level = self.next_level(leaves);
        while level.len() > 1 {
            level = self.next_level(&level);
        }
        level[0]
    }

    /// The authentication path for the leaf at `index`.
    pub fn proof(&self, leaves: &[Fr], index: usize) -> Result<MerkleProof, Poseidon2Error> {
        if index >= leaves.len() {
            return Err(Poseidon2Error::IndexOutOfRange {
                index,
                len: leaves.len(),
            });
        }

        let mut siblings = Vec::new();
        let mut directions = Vec::new();
        let mut level = leaves.to_vec();
        let mut index = index;
        while level.len() > 1 {
            let right = index % 2 == 0;
            let sibling = if right {
                level.get(index + 1).copied().unwrap_or_else(Fr::zero)
            } else {
                level[index - 1]
            };
            siblings.push(sibling);
            directions.push(right);
            level = self.next_level(&level);
            index /= 2;
        }

        Ok(MerkleProof {
            siblings,
            directions,
        })
    }

    /// Recomputes the root from `leaf` along `proof` and compares it with `root`.
    ///
    /// A proof whose siblings and directions differ in length never verifies.
    pub fn verify(&self, leaf: Fr, proof: &MerkleProof, root: Fr) -> bool {
        if proof.siblings.len() != proof.directions.len() {
            return false;
        }
        let computed = proof
            .siblings
            .iter()
            .zip(&proof.directions)
            .fold(leaf, |node, (&sibling, &right)| {
                if right {
                    self.compress(node, sibling)
                } else {
                    self.compress(sibling, node)
                }
            });
        computed == root
    }
}

#[cfg(test)]
mod tests {
    use ark_ff::Zero;
    use proptest::prelude::*;

    use super::{MerkleProof, Poseidon2Merkle, length_prefix};
    use crate::{Fr, Poseidon2Error};

    fn leaves(n: u64) -> Vec<Fr> {
        (1..=n).map(|i| Fr::from(i * 100)).collect()
    }

    #[test]
    fn empty_and_single_leaf_roots() {
        let merkle = Poseidon2Merkle::new();
        assert!(merkle.root(&[]).is_zero());
        assert_eq!(merkle.root(&[Fr::from(5u64)]), Fr::from(5u64));
    }

    #[test]
    fn odd_level_pairs_with_zero() {
        let merkle = Poseidon2Merkle::new();
        let l = leaves(3);
        let expected = merkle.compress(
            merkle.compress(l[0], l[1]),
            merkle.compress(l[2], Fr::zero()),
        );
        assert_eq!(merkle.root(&l), expected);
    }

    #[test]
    fn proof_for_eight_leaves() {
        let merkle = Poseidon2Merkle::new();
        let l = leaves(8);
        let root = merkle.root(&l);
        let proof = merkle.proof(&l, 3).unwrap();
        assert_eq!(proof.siblings.len(), 3);
        assert_eq!(proof.siblings[0], l[2]);
        assert_eq!(proof.directions, vec![false, false, true]);
        assert!(merkle.verify(l[3], &proof, root));
        assert!(!merkle.verify(l[4], &proof, root));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let merkle = Poseidon2Merkle::new();
        let err = merkle.proof(&leaves(4), 4).unwrap_err();
        assert!(matches!(
            err,
            Poseidon2Error::IndexOutOfRange { index: 4, len: 4 }
        ));
    }

    #[test]
    fn mismatched_proof_does_not_verify() {
        let merkle = Poseidon2Merkle::new();
        let l = leaves(4);
        let root = merkle.root(&l);
        let mut proof = merkle.proof(&l, 0).unwrap();
        proof.directions.pop();
        assert!(!merkle.verify(l[0], &proof, root));
    }

    #[test]
    fn serialized_layout() {
        let proof = MerkleProof {
            siblings: vec![Fr::from(1u64), Fr::from(258u64)],
            directions: vec![true, false],
        };
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(bytes.len(), 4 + 64 + 1);
        assert_eq!(&bytes[..4], &[2, 0, 0, 0]);
        assert_eq!(bytes[35], 1);
        assert_eq!(&bytes[66..68], &[1, 2]);
        assert_eq!(bytes[68], 0b01);
        assert_eq!(MerkleProof::from_bytes(&bytes).unwrap(), proof);
    }

    #[test]
    fn rejects_truncated_proof() {
        let merkle = Poseidon2Merkle::new();
        let bytes = merkle.proof(&leaves(9), 8).unwrap().to_bytes().unwrap();
        for cut in [0, 3, 40, bytes.len() - 1] {
            assert!(matches!(
                MerkleProof::from_bytes(&bytes[..cut]),
                Err(Poseidon2Error::MalformedProof(_))
            ));
        }
    }

    #[test]
    fn encoding_rejects_inconsistent_paths() {
        let proof = MerkleProof {
            siblings: leaves(3),
            directions: vec![true, false],
        };
        assert!(matches!(
            proof.to_bytes(),
            Err(Poseidon2Error::MalformedProof(_))
        ));
        assert_eq!(length_prefix(u32::MAX as usize).unwrap(), u32::MAX);
        assert!(matches!(
            length_prefix(u32::MAX as usize + 1),
            Err(Poseidon2Error::MalformedProof(_))
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn every_leaf_has_a_valid_proof(values in prop::collection::vec(any::<u64>(), 1..12)) {
            let merkle = Poseidon2Merkle::new();
            let l: Vec<Fr> = values.into_iter().map(Fr::from).collect();
            let root = merkle.root(&l);
            for (i, leaf) in l.iter().enumerate() {
                let proof = merkle.proof(&l, i).unwrap();
                prop_assert!(merkle.verify(*leaf, &proof, root));
                let decoded = MerkleProof::from_bytes(&proof.to_bytes().unwrap()).unwrap();
                prop_assert_eq!(decoded, proof);
            }
        }
    }
}
