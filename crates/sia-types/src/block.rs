//! Blocks, transactions, and chain indices.

use crate::currency::Currency;
use crate::encoding::{to_bytes, Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use crate::elements::{FileContractElement, SiacoinElement, SiacoinOutput, SiafundElement, SiafundOutput};
use crate::elements::FileContract;
use crate::hash::{hash_all, Address, BlockId, ParseIdError, TransactionId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Uniquely names a block by height and id. The textual form
/// `<height>::<block-hex>` is the canonical primary key for
/// per-block rows and API paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ChainIndex {
    pub height: u64,
    pub id: BlockId,
}

impl fmt::Display for ChainIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.height, self.id)
    }
}

impl FromStr for ChainIndex {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (height, id) = s
            .split_once("::")
            .ok_or_else(|| ParseIdError::new("chain index", "missing '::' separator"))?;
        Ok(ChainIndex {
            height: height
                .parse()
                .map_err(|_| ParseIdError::new("chain index", "bad height"))?,
            id: id
                .parse()
                .map_err(|_| ParseIdError::new("chain index", "bad block id"))?,
        })
    }
}

impl SiaEncode for ChainIndex {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.height);
        self.id.encode(e);
    }
}

impl SiaDecode for ChainIndex {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(ChainIndex {
            height: d.read_u64()?,
            id: BlockId::decode(d)?,
        })
    }
}

/// Spends a siacoin element. The parent is carried in full so that the
/// indexer can attribute the spend without a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiacoinInput {
    pub parent: SiacoinElement,
}

impl SiaEncode for SiacoinInput {
    fn encode(&self, e: &mut Encoder) {
        self.parent.encode(e);
    }
}

impl SiaDecode for SiacoinInput {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiacoinInput {
            parent: SiacoinElement::decode(d)?,
        })
    }
}

/// Spends a siafund element.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiafundInput {
    pub parent: SiafundElement,
}

impl SiaEncode for SiafundInput {
    fn encode(&self, e: &mut Encoder) {
        self.parent.encode(e);
    }
}

impl SiaDecode for SiafundInput {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiafundInput {
            parent: SiafundElement::decode(d)?,
        })
    }
}

/// Replaces the terms of an active contract.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContractRevision {
    pub parent: FileContractElement,
    pub revision: FileContract,
}

impl SiaEncode for FileContractRevision {
    fn encode(&self, e: &mut Encoder) {
        self.parent.encode(e);
        self.revision.encode(e);
    }
}

impl SiaDecode for FileContractRevision {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(FileContractRevision {
            parent: FileContractElement::decode(d)?,
            revision: FileContract::decode(d)?,
        })
    }
}

/// Finalizes an active contract, releasing its payouts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContractResolution {
    pub parent: FileContractElement,
}

impl SiaEncode for FileContractResolution {
    fn encode(&self, e: &mut Encoder) {
        self.parent.encode(e);
    }
}

impl SiaDecode for FileContractResolution {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(FileContractResolution {
            parent: FileContractElement::decode(d)?,
        })
    }
}

/// A transaction: spends of existing elements and creation of new ones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub siacoin_inputs: Vec<SiacoinInput>,
    pub siacoin_outputs: Vec<SiacoinOutput>,
    pub siafund_inputs: Vec<SiafundInput>,
    pub siafund_outputs: Vec<SiafundOutput>,
    pub file_contracts: Vec<FileContract>,
    pub file_contract_revisions: Vec<FileContractRevision>,
    pub file_contract_resolutions: Vec<FileContractResolution>,
    pub miner_fee: Currency,
    pub arbitrary_data: Vec<u8>,
}

impl Transaction {
    pub fn id(&self) -> TransactionId {
        TransactionId(hash_all("sia/id/transaction", &[&to_bytes(self)]))
    }

    /// Every address touched by this transaction, deduplicated in
    /// first-seen order: parent addresses of coin and fund inputs, plus
    /// addresses of coin and fund outputs.
    pub fn covered_addresses(&self) -> Vec<Address> {
        let mut seen = HashSet::new();
        let mut addrs = Vec::new();
        let mut push = |addr: Address| {
            if seen.insert(addr) {
                addrs.push(addr);
            }
        };
        for input in &self.siacoin_inputs {
            push(input.parent.address());
        }
        for output in &self.siacoin_outputs {
            push(output.address);
        }
        for input in &self.siafund_inputs {
            push(input.parent.address());
        }
        for output in &self.siafund_outputs {
            push(output.address);
        }
        addrs
    }
}

impl SiaEncode for Transaction {
    fn encode(&self, e: &mut Encoder) {
        self.siacoin_inputs.encode(e);
        self.siacoin_outputs.encode(e);
        self.siafund_inputs.encode(e);
        self.siafund_outputs.encode(e);
        self.file_contracts.encode(e);
        self.file_contract_revisions.encode(e);
        self.file_contract_resolutions.encode(e);
        self.miner_fee.encode(e);
        e.write_bytes(&self.arbitrary_data);
    }
}

impl SiaDecode for Transaction {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Transaction {
            siacoin_inputs: Vec::decode(d)?,
            siacoin_outputs: Vec::decode(d)?,
            siafund_inputs: Vec::decode(d)?,
            siafund_outputs: Vec::decode(d)?,
            file_contracts: Vec::decode(d)?,
            file_contract_revisions: Vec::decode(d)?,
            file_contract_resolutions: Vec::decode(d)?,
            miner_fee: Currency::decode(d)?,
            arbitrary_data: d.read_bytes()?,
        })
    }
}

/// Block header. Consensus fields beyond chain linkage are out of the
/// indexer's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockHeader {
    pub parent_id: BlockId,
    pub timestamp: u64,
    pub height: u64,
}

impl BlockHeader {
    pub fn id(&self) -> BlockId {
        BlockId(hash_all("sia/id/block", &[&to_bytes(self)]))
    }
}

impl SiaEncode for BlockHeader {
    fn encode(&self, e: &mut Encoder) {
        self.parent_id.encode(e);
        e.write_u64(self.timestamp);
        e.write_u64(self.height);
    }
}

impl SiaDecode for BlockHeader {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(BlockHeader {
            parent_id: BlockId::decode(d)?,
            timestamp: d.read_u64()?,
            height: d.read_u64()?,
        })
    }
}

/// A full block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn index(&self) -> ChainIndex {
        ChainIndex {
            height: self.header.height,
            id: self.header.id(),
        }
    }
}

impl SiaEncode for Block {
    fn encode(&self, e: &mut Encoder) {
        self.header.encode(e);
        self.transactions.encode(e);
    }
}

impl SiaDecode for Block {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Block {
            header: BlockHeader::decode(d)?,
            transactions: Vec::decode(d)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::from_bytes;
    use crate::elements::StateElement;
    use crate::hash::{ElementId, Hash256};

    #[test]
    fn chain_index_text_round_trip() {
        let idx = ChainIndex {
            height: 92,
            id: BlockId(hash_all("test", &[b"block"])),
        };
        let parsed: ChainIndex = idx.to_string().parse().unwrap();
        assert_eq!(parsed, idx);
        assert!("92".parse::<ChainIndex>().is_err());
        assert!("nope::beef".parse::<ChainIndex>().is_err());
    }

    #[test]
    fn transaction_round_trip_and_stable_id() {
        let txn = Transaction {
            siacoin_outputs: vec![SiacoinOutput {
                value: Currency::siacoins(7),
                address: Address(hash_all("test", &[b"dest"])),
            }],
            miner_fee: Currency::siacoins(1),
            arbitrary_data: b"hello".to_vec(),
            ..Default::default()
        };
        let decoded = from_bytes::<Transaction>(&to_bytes(&txn)).unwrap();
        assert_eq!(decoded, txn);
        assert_eq!(decoded.id(), txn.id());
    }

    #[test]
    fn covered_addresses_deduplicates() {
        let addr = Address(hash_all("test", &[b"same"]));
        let other = Address(hash_all("test", &[b"other"]));
        let txn = Transaction {
            siacoin_inputs: vec![SiacoinInput {
                parent: SiacoinElement {
                    state_element: StateElement {
                        id: ElementId {
                            source: Hash256::default(),
                            index: 0,
                        },
                        leaf_index: 0,
                        merkle_proof: vec![],
                    },
                    siacoin_output: SiacoinOutput {
                        value: Currency::siacoins(2),
                        address: addr,
                    },
                    maturity_height: 0,
                },
            }],
            siacoin_outputs: vec![
                SiacoinOutput {
                    value: Currency::siacoins(1),
                    address: addr,
                },
                SiacoinOutput {
                    value: Currency::siacoins(1),
                    address: other,
                },
            ],
            ..Default::default()
        };
        assert_eq!(txn.covered_addresses(), vec![addr, other]);
    }

    #[test]
    fn block_index_matches_header() {
        let block = Block {
            header: BlockHeader {
                parent_id: BlockId(hash_all("test", &[b"parent"])),
                timestamp: 1_700_000_000,
                height: 5,
            },
            transactions: vec![],
        };
        let idx = block.index();
        assert_eq!(idx.height, 5);
        assert_eq!(idx.id, block.header.id());
    }
}
