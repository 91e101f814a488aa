//! Consensus snapshots, rolling chain statistics, and update diffs.

use crate::accumulator::ElementAccumulator;
use crate::block::{Block, ChainIndex};
use crate::currency::Currency;
use crate::elements::{FileContractElement, SiacoinElement, SiafundElement};
use crate::encoding::{Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use serde::{Deserialize, Serialize};

/// Snapshot of the consensus state after a block, as delivered by the
/// chain manager. The indexer stores it verbatim and reads back the
/// accumulator roots to answer proof-verification queries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsensusState {
    pub index: ChainIndex,
    pub elements: ElementAccumulator,
}

impl SiaEncode for ConsensusState {
    fn encode(&self, e: &mut Encoder) {
        self.index.encode(e);
        self.elements.encode(e);
    }
}

impl SiaDecode for ConsensusState {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(ConsensusState {
            index: ChainIndex::decode(d)?,
            elements: ElementAccumulator::decode(d)?,
        })
    }
}

/// Rolling per-block summary. Spent counters reset every block; the
/// contract counters carry forward cumulatively.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainStats {
    pub block: Block,

    /// Siacoin elements spent in this block.
    pub spent_siacoins_count: u64,
    /// Siafund elements spent in this block.
    pub spent_siafunds_count: u64,

    /// Contracts currently active.
    pub active_contract_count: u64,
    /// Sum of renter and host payouts across active contracts.
    pub active_contract_cost: Currency,
    /// Bytes bound by active contracts.
    pub active_contract_size: u64,

    /// All-time contract payout volume.
    pub total_contract_cost: Currency,
    /// All-time contract size volume, revisions included.
    pub total_contract_size: u64,
    /// All-time size volume contributed by revisions alone.
    pub total_revision_volume: u64,
}

impl ChainStats {
    /// Seeds the stats for a new block: cumulative counters carry over,
    /// per-block counters start at zero.
    pub fn carry_forward(prev: &ChainStats, block: Block) -> ChainStats {
        ChainStats {
            block,
            spent_siacoins_count: 0,
            spent_siafunds_count: 0,
            active_contract_count: prev.active_contract_count,
            active_contract_cost: prev.active_contract_cost,
            active_contract_size: prev.active_contract_size,
            total_contract_cost: prev.total_contract_cost,
            total_contract_size: prev.total_contract_size,
            total_revision_volume: prev.total_revision_volume,
        }
    }
}

impl SiaEncode for ChainStats {
    fn encode(&self, e: &mut Encoder) {
        self.block.encode(e);
        e.write_u64(self.spent_siacoins_count);
        e.write_u64(self.spent_siafunds_count);
        e.write_u64(self.active_contract_count);
        self.active_contract_cost.encode(e);
        e.write_u64(self.active_contract_size);
        self.total_contract_cost.encode(e);
        e.write_u64(self.total_contract_size);
        e.write_u64(self.total_revision_volume);
    }
}

impl SiaDecode for ChainStats {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(ChainStats {
            block: Block::decode(d)?,
            spent_siacoins_count: d.read_u64()?,
            spent_siafunds_count: d.read_u64()?,
            active_contract_count: d.read_u64()?,
            active_contract_cost: Currency::decode(d)?,
            active_contract_size: d.read_u64()?,
            total_contract_cost: Currency::decode(d)?,
            total_contract_size: d.read_u64()?,
            total_revision_volume: d.read_u64()?,
        })
    }
}

/// The diff produced by applying one block. Every element is fully
/// populated, including its post-apply state element (leaf index and
/// proof). The lists are disjoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyUpdate {
    pub state: ConsensusState,
    pub block: Block,

    pub new_siacoin_elements: Vec<SiacoinElement>,
    pub new_siafund_elements: Vec<SiafundElement>,
    pub new_file_contracts: Vec<FileContractElement>,
    pub revised_file_contracts: Vec<FileContractElement>,
    pub spent_siacoins: Vec<SiacoinElement>,
    pub spent_siafunds: Vec<SiafundElement>,
    pub resolved_file_contracts: Vec<FileContractElement>,
}

/// The diff that undoes one block. `state` is the consensus state being
/// reverted to (the parent of `block`); element proofs are valid in that
/// restored state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RevertUpdate {
    pub state: ConsensusState,
    pub block: Block,

    pub new_siacoin_elements: Vec<SiacoinElement>,
    pub new_siafund_elements: Vec<SiafundElement>,
    pub new_file_contracts: Vec<FileContractElement>,
    pub revised_file_contracts: Vec<FileContractElement>,
    pub spent_siacoins: Vec<SiacoinElement>,
    pub spent_siafunds: Vec<SiafundElement>,
    pub resolved_file_contracts: Vec<FileContractElement>,
}
