//! Merkle accumulator math.
//!
//! The consensus set of live elements is summarized by a forest of
//! perfect binary Merkle trees, one per set bit of the leaf count. A
//! leaf's membership proof is the list of sibling subtree roots along
//! the path to the root of the tree containing it; the proof length for
//! leaf `i` in a forest of `n` leaves is `bit_length(i ^ n) - 1`.

use crate::elements::{FileContractElement, SiacoinElement, SiafundElement};
use crate::encoding::{Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use crate::hash::{hash_all, Hash256};
use serde::{Deserialize, Serialize};

/// Hash of an interior node from its two children.
pub fn node_hash(left: Hash256, right: Hash256) -> Hash256 {
    hash_all("sia/node", &[&left.0, &right.0])
}

fn leaf_hash(domain: &str, payload: &[u8], spent: bool) -> Hash256 {
    hash_all(domain, &[payload, &[spent as u8]])
}

// Leaf hashes cover the element's payload but not its proof: the proof
// changes as the forest grows, the leaf does not.

pub fn siacoin_leaf_hash(elem: &SiacoinElement, spent: bool) -> Hash256 {
    let mut e = Encoder::new();
    elem.state_element.id.encode(&mut e);
    e.write_u64(elem.state_element.leaf_index);
    elem.siacoin_output.encode(&mut e);
    e.write_u64(elem.maturity_height);
    leaf_hash("sia/leaf/siacoin", &e.finish(), spent)
}

pub fn siafund_leaf_hash(elem: &SiafundElement, spent: bool) -> Hash256 {
    let mut e = Encoder::new();
    elem.state_element.id.encode(&mut e);
    e.write_u64(elem.state_element.leaf_index);
    elem.siafund_output.encode(&mut e);
    leaf_hash("sia/leaf/siafund", &e.finish(), spent)
}

pub fn contract_leaf_hash(elem: &FileContractElement, spent: bool) -> Hash256 {
    let mut e = Encoder::new();
    elem.state_element.id.encode(&mut e);
    e.write_u64(elem.state_element.leaf_index);
    elem.contract.encode(&mut e);
    leaf_hash("sia/leaf/contract", &e.finish(), spent)
}

/// Folds a leaf hash through its proof, reproducing the root of the
/// subtree of height `proof.len()` containing the leaf.
pub fn proof_root(leaf: Hash256, leaf_index: u64, proof: &[Hash256]) -> Hash256 {
    let mut root = leaf;
    for (i, &sibling) in proof.iter().enumerate() {
        root = if leaf_index & (1 << i) == 0 {
            node_hash(root, sibling)
        } else {
            node_hash(sibling, root)
        };
    }
    root
}

/// The roots of the accumulator forest. `trees[h]` is meaningful only
/// when bit `h` of `num_leaves` is set.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AccumulatorRepr", try_from = "AccumulatorRepr")]
pub struct ElementAccumulator {
    pub num_leaves: u64,
    pub trees: [Hash256; 64],
}

impl Default for ElementAccumulator {
    fn default() -> Self {
        Self {
            num_leaves: 0,
            trees: [Hash256::default(); 64],
        }
    }
}

impl std::fmt::Debug for ElementAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementAccumulator")
            .field("num_leaves", &self.num_leaves)
            .field("roots", &self.roots().collect::<Vec<_>>())
            .finish()
    }
}

impl ElementAccumulator {
    pub fn has_tree_at_height(&self, height: usize) -> bool {
        height < 64 && self.num_leaves & (1 << height) != 0
    }

    /// Roots of the populated trees, ascending by height.
    pub fn roots(&self) -> impl Iterator<Item = (usize, Hash256)> + '_ {
        (0..64)
            .filter(|&h| self.has_tree_at_height(h))
            .map(|h| (h, self.trees[h]))
    }

    fn contains(&self, leaf: Hash256, leaf_index: u64, proof: &[Hash256]) -> bool {
        self.has_tree_at_height(proof.len())
            && self.trees[proof.len()] == proof_root(leaf, leaf_index, proof)
    }

    pub fn contains_unspent_siacoin_element(&self, elem: &SiacoinElement) -> bool {
        self.contains(
            siacoin_leaf_hash(elem, false),
            elem.state_element.leaf_index,
            &elem.state_element.merkle_proof,
        )
    }

    pub fn contains_spent_siacoin_element(&self, elem: &SiacoinElement) -> bool {
        self.contains(
            siacoin_leaf_hash(elem, true),
            elem.state_element.leaf_index,
            &elem.state_element.merkle_proof,
        )
    }

    pub fn contains_unspent_siafund_element(&self, elem: &SiafundElement) -> bool {
        self.contains(
            siafund_leaf_hash(elem, false),
            elem.state_element.leaf_index,
            &elem.state_element.merkle_proof,
        )
    }

    pub fn contains_spent_siafund_element(&self, elem: &SiafundElement) -> bool {
        self.contains(
            siafund_leaf_hash(elem, true),
            elem.state_element.leaf_index,
            &elem.state_element.merkle_proof,
        )
    }

    pub fn contains_unresolved_file_contract(&self, elem: &FileContractElement) -> bool {
        self.contains(
            contract_leaf_hash(elem, false),
            elem.state_element.leaf_index,
            &elem.state_element.merkle_proof,
        )
    }
}

impl SiaEncode for ElementAccumulator {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.num_leaves);
        for (_, root) in self.roots() {
            root.encode(e);
        }
    }
}

impl SiaDecode for ElementAccumulator {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let num_leaves = d.read_u64()?;
        let mut trees = [Hash256::default(); 64];
        for h in 0..64 {
            if num_leaves & (1 << h) != 0 {
                trees[h] = Hash256::decode(d)?;
            }
        }
        Ok(ElementAccumulator { num_leaves, trees })
    }
}

/// JSON shape: the leaf count plus the populated roots ascending by
/// height, mirroring the binary encoding.
#[derive(Serialize, Deserialize)]
struct AccumulatorRepr {
    num_leaves: u64,
    trees: Vec<Hash256>,
}

impl From<ElementAccumulator> for AccumulatorRepr {
    fn from(acc: ElementAccumulator) -> Self {
        AccumulatorRepr {
            num_leaves: acc.num_leaves,
            trees: acc.roots().map(|(_, root)| root).collect(),
        }
    }
}

impl TryFrom<AccumulatorRepr> for ElementAccumulator {
    type Error = String;

    fn try_from(repr: AccumulatorRepr) -> Result<Self, Self::Error> {
        if repr.trees.len() != repr.num_leaves.count_ones() as usize {
            return Err(format!(
                "accumulator with {} leaves requires {} roots, got {}",
                repr.num_leaves,
                repr.num_leaves.count_ones(),
                repr.trees.len()
            ));
        }
        let mut trees = [Hash256::default(); 64];
        let mut roots = repr.trees.into_iter();
        for h in 0..64 {
            if repr.num_leaves & (1 << h) != 0 {
                trees[h] = roots.next().unwrap();
            }
        }
        Ok(ElementAccumulator {
            num_leaves: repr.num_leaves,
            trees,
        })
    }
}
