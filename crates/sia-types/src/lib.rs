//! # sia-types
//!
//! Core domain types for the Sia explorer:
//!
//! - hashes, addresses, and identifiers with their textual forms
//! - elements (siacoin/siafund outputs, file contracts) and blocks
//! - the deterministic binary codec used for every KV key and value
//! - Merkle accumulator math for membership proofs

mod accumulator;
mod block;
mod currency;
mod elements;
pub mod encoding;
mod hash;
mod state;

pub use accumulator::{
    contract_leaf_hash, node_hash, proof_root, siacoin_leaf_hash, siafund_leaf_hash,
    ElementAccumulator,
};
pub use block::{
    Block, BlockHeader, ChainIndex, FileContractResolution, FileContractRevision, SiacoinInput,
    SiafundInput, Transaction,
};
pub use currency::Currency;
pub use elements::{
    FileContract, FileContractElement, SiacoinElement, SiacoinOutput, SiafundElement,
    SiafundOutput, StateElement,
};
pub use encoding::{from_bytes, to_bytes, DecodeError, SiaDecode, SiaEncode};
pub use hash::{hash_all, Address, BlockId, ElementId, Hash256, ParseIdError, TransactionId};
pub use state::{ApplyUpdate, ChainStats, ConsensusState, RevertUpdate};
