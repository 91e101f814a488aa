//! Deterministic chain simulator.
//!
//! Plays the role of the chain manager in tests: maintains its own
//! copy of the element accumulator (leaf hashes plus the full interior
//! level structure, mirroring the geometry of the on-disk hash store)
//! and emits fully-populated [`ApplyUpdate`]/[`RevertUpdate`]s whose
//! element proofs and consensus roots are mutually consistent.

use sia_types::{
    contract_leaf_hash, hash_all, node_hash, siacoin_leaf_hash, siafund_leaf_hash, Address,
    ApplyUpdate, Block, BlockHeader, BlockId, ConsensusState, Currency, ElementAccumulator,
    ElementId, FileContract, FileContractElement, Hash256, RevertUpdate, SiacoinElement,
    SiacoinOutput, SiafundElement, StateElement, Transaction,
};

/// A deterministic test address.
pub fn test_address(seed: u64) -> Address {
    Address(hash_all("sim/address", &[&seed.to_be_bytes()]))
}

struct Snapshot {
    prev_state: ConsensusState,
    prev_leaves: Vec<Hash256>,
    update: ApplyUpdate,
}

/// An in-memory chain whose genesis holds ten active contracts with a
/// combined payout of 825 SC.
pub struct ChainSim {
    state: ConsensusState,
    leaves: Vec<Hash256>,
    history: Vec<Snapshot>,
}

impl ChainSim {
    pub fn new() -> Self {
        let mut sim = ChainSim {
            state: ConsensusState::default(),
            leaves: Vec::new(),
            history: Vec::new(),
        };
        // five contracts of 80 SC and five of 85 SC: 825 SC active
        let contracts = (0..10u64)
            .map(|i| FileContract {
                filesize: 0,
                file_merkle_root: Hash256::default(),
                window_start: 5,
                window_end: 10,
                renter_output: SiacoinOutput {
                    value: Currency::siacoins(40),
                    address: test_address(1000 + i),
                },
                host_output: SiacoinOutput {
                    value: Currency::siacoins(if i < 5 { 40 } else { 45 }),
                    address: test_address(2000 + i),
                },
                revision_number: 0,
            })
            .collect();
        let genesis = Block {
            header: BlockHeader {
                parent_id: BlockId::default(),
                timestamp: 0,
                height: 0,
            },
            transactions: vec![Transaction {
                file_contracts: contracts,
                ..Default::default()
            }],
        };
        sim.apply_block(genesis);
        sim
    }

    /// The update that created the genesis state.
    pub fn genesis_update(&self) -> ApplyUpdate {
        self.history[0].update.clone()
    }

    /// The current tip state.
    pub fn tip_state(&self) -> ConsensusState {
        self.state.clone()
    }

    /// Mines a block containing the given transactions and returns its
    /// apply update.
    pub fn mine_block(&mut self, txns: Vec<Transaction>) -> ApplyUpdate {
        let height = self.state.index.height + 1;
        let block = Block {
            header: BlockHeader {
                parent_id: self.state.index.id,
                timestamp: height * 600,
                height,
            },
            transactions: txns,
        };
        self.apply_block(block)
    }

    /// Mines a block whose single transaction mints the given outputs.
    pub fn mine_block_with_siacoin_outputs(
        &mut self,
        outputs: Vec<SiacoinOutput>,
    ) -> ApplyUpdate {
        self.mine_block(vec![Transaction {
            siacoin_outputs: outputs,
            ..Default::default()
        }])
    }

    /// Rolls the tip block back and returns its revert update, with
    /// element proofs valid in the restored state.
    pub fn revert_block(&mut self) -> RevertUpdate {
        assert!(self.history.len() > 1, "cannot revert genesis");
        let snap = self.history.pop().unwrap();
        self.leaves = snap.prev_leaves;
        self.state = snap.prev_state;

        let levels = build_levels(&self.leaves);
        let n = self.leaves.len() as u64;
        let reproof = |elem: &mut StateElement| {
            elem.merkle_proof = proof_for(&levels, n, elem.leaf_index);
        };

        let mut cru = RevertUpdate {
            state: self.state.clone(),
            block: snap.update.block,
            new_siacoin_elements: snap.update.new_siacoin_elements,
            new_siafund_elements: snap.update.new_siafund_elements,
            new_file_contracts: snap.update.new_file_contracts,
            revised_file_contracts: snap.update.revised_file_contracts,
            spent_siacoins: snap.update.spent_siacoins,
            spent_siafunds: snap.update.spent_siafunds,
            resolved_file_contracts: snap.update.resolved_file_contracts,
        };
        // the re-materialized elements exist in the restored forest;
        // the new_* elements are only deleted and keep their proofs
        for elem in &mut cru.spent_siacoins {
            reproof(&mut elem.state_element);
        }
        for elem in &mut cru.spent_siafunds {
            reproof(&mut elem.state_element);
        }
        for elem in &mut cru.resolved_file_contracts {
            reproof(&mut elem.state_element);
        }
        for txn in &mut cru.block.transactions {
            for rev in &mut txn.file_contract_revisions {
                reproof(&mut rev.parent.state_element);
            }
        }
        cru
    }

    fn apply_block(&mut self, block: Block) -> ApplyUpdate {
        let prev_state = self.state.clone();
        let prev_leaves = self.leaves.clone();

        let mut spent_siacoins = Vec::new();
        let mut spent_siafunds = Vec::new();
        let mut resolved = Vec::new();
        let mut revised = Vec::new();
        let mut new_siacoins = Vec::new();
        let mut new_siafunds = Vec::new();
        let mut new_contracts = Vec::new();

        // one traversal: spends and revisions flip their leaf in
        // place, new elements take the next leaf as they appear
        for txn in &block.transactions {
            let txid = txn.id();
            let mut output_index = 0u64;

            for input in &txn.siacoin_inputs {
                let parent = input.parent.clone();
                self.leaves[parent.state_element.leaf_index as usize] =
                    siacoin_leaf_hash(&parent, true);
                spent_siacoins.push(parent);
            }
            for input in &txn.siafund_inputs {
                let parent = input.parent.clone();
                self.leaves[parent.state_element.leaf_index as usize] =
                    siafund_leaf_hash(&parent, true);
                spent_siafunds.push(parent);
            }
            for resolution in &txn.file_contract_resolutions {
                let parent = resolution.parent.clone();
                self.leaves[parent.state_element.leaf_index as usize] =
                    contract_leaf_hash(&parent, true);
                resolved.push(parent);
            }
            for rev in &txn.file_contract_revisions {
                let elem = FileContractElement {
                    state_element: StateElement {
                        id: rev.parent.id(),
                        leaf_index: rev.parent.state_element.leaf_index,
                        merkle_proof: Vec::new(),
                    },
                    contract: rev.revision.clone(),
                };
                self.leaves[elem.state_element.leaf_index as usize] =
                    contract_leaf_hash(&elem, false);
                revised.push(elem);
            }

            for output in &txn.siacoin_outputs {
                let elem = SiacoinElement {
                    state_element: StateElement {
                        id: ElementId {
                            source: txid.0,
                            index: output_index,
                        },
                        leaf_index: self.leaves.len() as u64,
                        merkle_proof: Vec::new(),
                    },
                    siacoin_output: *output,
                    maturity_height: 0,
                };
                output_index += 1;
                self.leaves.push(siacoin_leaf_hash(&elem, false));
                new_siacoins.push(elem);
            }
            for output in &txn.siafund_outputs {
                let elem = SiafundElement {
                    state_element: StateElement {
                        id: ElementId {
                            source: txid.0,
                            index: output_index,
                        },
                        leaf_index: self.leaves.len() as u64,
                        merkle_proof: Vec::new(),
                    },
                    siafund_output: *output,
                };
                output_index += 1;
                self.leaves.push(siafund_leaf_hash(&elem, false));
                new_siafunds.push(elem);
            }
            for contract in &txn.file_contracts {
                let elem = FileContractElement {
                    state_element: StateElement {
                        id: ElementId {
                            source: txid.0,
                            index: output_index,
                        },
                        leaf_index: self.leaves.len() as u64,
                        merkle_proof: Vec::new(),
                    },
                    contract: contract.clone(),
                };
                output_index += 1;
                self.leaves.push(contract_leaf_hash(&elem, false));
                new_contracts.push(elem);
            }
        }

        let levels = build_levels(&self.leaves);
        let n = self.leaves.len() as u64;
        let reproof = |elem: &mut StateElement| {
            elem.merkle_proof = proof_for(&levels, n, elem.leaf_index);
        };
        for elem in &mut spent_siacoins {
            reproof(&mut elem.state_element);
        }
        for elem in &mut spent_siafunds {
            reproof(&mut elem.state_element);
        }
        for elem in &mut resolved {
            reproof(&mut elem.state_element);
        }
        for elem in &mut revised {
            reproof(&mut elem.state_element);
        }
        for elem in &mut new_siacoins {
            reproof(&mut elem.state_element);
        }
        for elem in &mut new_siafunds {
            reproof(&mut elem.state_element);
        }
        for elem in &mut new_contracts {
            reproof(&mut elem.state_element);
        }

        self.state = ConsensusState {
            index: block.index(),
            elements: accumulator_from(&levels, n),
        };

        let update = ApplyUpdate {
            state: self.state.clone(),
            block,
            new_siacoin_elements: new_siacoins,
            new_siafund_elements: new_siafunds,
            new_file_contracts: new_contracts,
            revised_file_contracts: revised,
            spent_siacoins,
            spent_siafunds,
            resolved_file_contracts: resolved,
        };
        self.history.push(Snapshot {
            prev_state,
            prev_leaves,
            update: update.clone(),
        });
        update
    }
}

impl Default for ChainSim {
    fn default() -> Self {
        Self::new()
    }
}

/// All interior node hashes, level by level. `levels[i][j]` is the
/// hash of leaves `[j * 2^i, (j + 1) * 2^i)`; incomplete tail ranges
/// are never referenced because forest trees align to their size.
fn build_levels(leaves: &[Hash256]) -> Vec<Vec<Hash256>> {
    let mut levels = Vec::with_capacity(64);
    levels.push(leaves.to_vec());
    for i in 1..64 {
        let prev: &Vec<Hash256> = &levels[i - 1];
        let mut level = Vec::with_capacity(prev.len() / 2);
        for j in 0..prev.len() / 2 {
            level.push(node_hash(prev[2 * j], prev[2 * j + 1]));
        }
        levels.push(level);
    }
    levels
}

/// Sibling hashes along the path from a leaf to the root of its tree,
/// walking the same positions the hash store reads.
fn proof_for(levels: &[Vec<Hash256>], num_leaves: u64, leaf_index: u64) -> Vec<Hash256> {
    assert!(leaf_index < num_leaves);
    let len = (64 - (leaf_index ^ num_leaves).leading_zeros()) as usize - 1;
    let mut proof = Vec::with_capacity(len);
    let mut pos = leaf_index;
    for (i, level) in levels.iter().enumerate().take(len) {
        let subtree_size = 1u64 << i;
        if leaf_index & subtree_size == 0 {
            pos += subtree_size;
        } else {
            pos -= subtree_size;
        }
        proof.push(level[(pos / subtree_size) as usize]);
    }
    proof
}

/// Roots of the forest: one tree per set bit of the leaf count, larger
/// trees to the left.
fn accumulator_from(levels: &[Vec<Hash256>], num_leaves: u64) -> ElementAccumulator {
    let mut trees = [Hash256::default(); 64];
    for height in 0..64u32 {
        if num_leaves & (1 << height) != 0 {
            let start = num_leaves & !((1u64 << (height + 1)) - 1);
            trees[height as usize] = levels[height as usize][(start >> height) as usize];
        }
    }
    ElementAccumulator { num_leaves, trees }
}

/// Builds a transaction spending the address's first unspent coin into
/// the given outputs, returning any change to the sender.
pub fn send_siacoins(
    explorer: &sia_explorer::Explorer,
    from: Address,
    mut outputs: Vec<SiacoinOutput>,
) -> Transaction {
    let ids = explorer
        .unspent_siacoin_elements(&from)
        .expect("unspent lookup");
    let parent = explorer
        .siacoin_element(ids.first().expect("address has no unspent coins"))
        .expect("element lookup");
    let spent: Currency = outputs.iter().map(|output| output.value).sum();
    let change = parent
        .siacoin_output
        .value
        .checked_sub(spent)
        .expect("insufficient funds");
    outputs.push(SiacoinOutput {
        value: change,
        address: from,
    });
    Transaction {
        siacoin_inputs: vec![sia_types::SiacoinInput { parent }],
        siacoin_outputs: outputs,
        ..Default::default()
    }
}
