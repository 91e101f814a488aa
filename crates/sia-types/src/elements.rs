//! Accumulator elements and their typed payloads.

use crate::currency::Currency;
use crate::encoding::{Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use crate::hash::{Address, ElementId, Hash256};
use serde::{Deserialize, Serialize};

/// The accumulator-facing part of an element: its id, the leaf it
/// occupies, and the sibling hashes proving its membership.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateElement {
    pub id: ElementId,
    pub leaf_index: u64,
    pub merkle_proof: Vec<Hash256>,
}

impl SiaEncode for StateElement {
    fn encode(&self, e: &mut Encoder) {
        self.id.encode(e);
        e.write_u64(self.leaf_index);
        self.merkle_proof.encode(e);
    }
}

impl SiaDecode for StateElement {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(StateElement {
            id: ElementId::decode(d)?,
            leaf_index: d.read_u64()?,
            merkle_proof: Vec::decode(d)?,
        })
    }
}

/// A volume of siacoins sent to an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiacoinOutput {
    pub value: Currency,
    pub address: Address,
}

impl SiaEncode for SiacoinOutput {
    fn encode(&self, e: &mut Encoder) {
        self.value.encode(e);
        self.address.encode(e);
    }
}

impl SiaDecode for SiacoinOutput {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiacoinOutput {
            value: Currency::decode(d)?,
            address: Address::decode(d)?,
        })
    }
}

/// A volume of siafunds sent to an address. Funds are a fixed-supply
/// count, not a divisible currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiafundOutput {
    pub value: u64,
    pub address: Address,
}

impl SiaEncode for SiafundOutput {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.value);
        self.address.encode(e);
    }
}

impl SiaDecode for SiafundOutput {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiafundOutput {
            value: d.read_u64()?,
            address: Address::decode(d)?,
        })
    }
}

/// The agreed terms of a storage contract: how much data is bound, the
/// proof window, and the payouts to each party when it resolves.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContract {
    pub filesize: u64,
    pub file_merkle_root: Hash256,
    pub window_start: u64,
    pub window_end: u64,
    pub renter_output: SiacoinOutput,
    pub host_output: SiacoinOutput,
    pub revision_number: u64,
}

impl FileContract {
    /// Combined payout of both parties; the amount a contract binds
    /// while it is active.
    pub fn payout(&self) -> Currency {
        self.renter_output.value + self.host_output.value
    }
}

impl SiaEncode for FileContract {
    fn encode(&self, e: &mut Encoder) {
        e.write_u64(self.filesize);
        self.file_merkle_root.encode(e);
        e.write_u64(self.window_start);
        e.write_u64(self.window_end);
        self.renter_output.encode(e);
        self.host_output.encode(e);
        e.write_u64(self.revision_number);
    }
}

impl SiaDecode for FileContract {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(FileContract {
            filesize: d.read_u64()?,
            file_merkle_root: Hash256::decode(d)?,
            window_start: d.read_u64()?,
            window_end: d.read_u64()?,
            renter_output: SiacoinOutput::decode(d)?,
            host_output: SiacoinOutput::decode(d)?,
            revision_number: d.read_u64()?,
        })
    }
}

/// A siacoin output in the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiacoinElement {
    pub state_element: StateElement,
    pub siacoin_output: SiacoinOutput,
    /// Height before which the output may not be spent (non-zero for
    /// timelocked payouts).
    pub maturity_height: u64,
}

impl SiacoinElement {
    pub fn id(&self) -> ElementId {
        self.state_element.id
    }

    pub fn address(&self) -> Address {
        self.siacoin_output.address
    }
}

impl SiaEncode for SiacoinElement {
    fn encode(&self, e: &mut Encoder) {
        self.state_element.encode(e);
        self.siacoin_output.encode(e);
        e.write_u64(self.maturity_height);
    }
}

impl SiaDecode for SiacoinElement {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiacoinElement {
            state_element: StateElement::decode(d)?,
            siacoin_output: SiacoinOutput::decode(d)?,
            maturity_height: d.read_u64()?,
        })
    }
}

/// A siafund output in the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SiafundElement {
    pub state_element: StateElement,
    pub siafund_output: SiafundOutput,
}

impl SiafundElement {
    pub fn id(&self) -> ElementId {
        self.state_element.id
    }

    pub fn address(&self) -> Address {
        self.siafund_output.address
    }
}

impl SiaEncode for SiafundElement {
    fn encode(&self, e: &mut Encoder) {
        self.state_element.encode(e);
        self.siafund_output.encode(e);
    }
}

impl SiaDecode for SiafundElement {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(SiafundElement {
            state_element: StateElement::decode(d)?,
            siafund_output: SiafundOutput::decode(d)?,
        })
    }
}

/// A file contract in the accumulator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileContractElement {
    pub state_element: StateElement,
    pub contract: FileContract,
}

impl FileContractElement {
    pub fn id(&self) -> ElementId {
        self.state_element.id
    }
}

impl SiaEncode for FileContractElement {
    fn encode(&self, e: &mut Encoder) {
        self.state_element.encode(e);
        self.contract.encode(e);
    }
}

impl SiaDecode for FileContractElement {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(FileContractElement {
            state_element: StateElement::decode(d)?,
            contract: FileContract::decode(d)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{from_bytes, to_bytes};
    use crate::hash::hash_all;

    fn sample_siacoin() -> SiacoinElement {
        SiacoinElement {
            state_element: StateElement {
                id: ElementId {
                    source: hash_all("test/txn", &[b"a"]),
                    index: 1,
                },
                leaf_index: 42,
                merkle_proof: vec![hash_all("test/sib", &[b"b"])],
            },
            siacoin_output: SiacoinOutput {
                value: Currency::siacoins(7),
                address: Address(hash_all("test/addr", &[b"c"])),
            },
            maturity_height: 144,
        }
    }

    #[test]
    fn siacoin_element_round_trip() {
        let elem = sample_siacoin();
        assert_eq!(
            from_bytes::<SiacoinElement>(&to_bytes(&elem)).unwrap(),
            elem
        );
    }

    #[test]
    fn contract_element_round_trip() {
        let fce = FileContractElement {
            state_element: StateElement {
                id: ElementId {
                    source: hash_all("test/txn", &[b"fc"]),
                    index: 0,
                },
                leaf_index: 7,
                merkle_proof: vec![],
            },
            contract: FileContract {
                filesize: 1 << 30,
                file_merkle_root: hash_all("test/root", &[b"data"]),
                window_start: 5,
                window_end: 10,
                renter_output: SiacoinOutput {
                    value: Currency::siacoins(58),
                    address: Address(hash_all("test/addr", &[b"r"])),
                },
                host_output: SiacoinOutput {
                    value: Currency::siacoins(19),
                    address: Address(hash_all("test/addr", &[b"h"])),
                },
                revision_number: 3,
            },
        };
        assert_eq!(fce.contract.payout(), Currency::siacoins(77));
        assert_eq!(
            from_bytes::<FileContractElement>(&to_bytes(&fce)).unwrap(),
            fce
        );
    }

    #[test]
    fn siafund_element_round_trip() {
        let elem = SiafundElement {
            state_element: StateElement {
                id: ElementId {
                    source: hash_all("test/txn", &[b"sf"]),
                    index: 2,
                },
                leaf_index: 9,
                merkle_proof: vec![hash_all("test/sib", &[b"x"]), hash_all("test/sib", &[b"y"])],
            },
            siafund_output: SiafundOutput {
                value: 10_000,
                address: Address(hash_all("test/addr", &[b"f"])),
            },
        };
        assert_eq!(
            from_bytes::<SiafundElement>(&to_bytes(&elem)).unwrap(),
            elem
        );
    }

    #[test]
    fn truncated_element_fails_to_decode() {
        let buf = to_bytes(&sample_siacoin());
        assert!(from_bytes::<SiacoinElement>(&buf[..buf.len() - 4]).is_err());
    }
}
