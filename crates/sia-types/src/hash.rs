//! Hash and identifier newtypes.

use crate::encoding::{Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use blake2::{Blake2b, Digest};
use digest::consts::U32;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

type Blake2b256 = Blake2b<U32>;

/// Computes the Blake2b-256 hash of a domain tag followed by the given
/// byte chunks. Every hash in the system is domain-separated this way.
pub fn hash_all(domain: &str, chunks: &[&[u8]]) -> Hash256 {
    let mut hasher = Blake2b256::new();
    hasher.update(domain.as_bytes());
    for chunk in chunks {
        hasher.update(chunk);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    Hash256(out)
}

/// A generic 256-bit hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

/// Error parsing a textual identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {reason}")]
pub struct ParseIdError {
    kind: &'static str,
    reason: &'static str,
}

impl ParseIdError {
    pub(crate) fn new(kind: &'static str, reason: &'static str) -> Self {
        Self { kind, reason }
    }
}

impl FromStr for Hash256 {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| ParseIdError::new("hash", "not hex"))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ParseIdError::new("hash", "must be 32 bytes"))?;
        Ok(Hash256(arr))
    }
}

impl Serialize for Hash256 {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash256 {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl SiaEncode for Hash256 {
    fn encode(&self, e: &mut Encoder) {
        e.write_fixed(&self.0);
    }
}

impl SiaDecode for Hash256 {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Hash256(d.read_fixed()?))
    }
}

macro_rules! hash_newtype {
    ($(#[$doc:meta])* $name:ident, $kind:literal) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
            Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Hash256);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<Hash256>()
                    .map($name)
                    .map_err(|_| ParseIdError::new($kind, "not a 32-byte hex string"))
            }
        }

        impl SiaEncode for $name {
            fn encode(&self, e: &mut Encoder) {
                self.0.encode(e);
            }
        }

        impl SiaDecode for $name {
            fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
                Ok($name(Hash256::decode(d)?))
            }
        }
    };
}

hash_newtype!(
    /// A 32-byte spend destination.
    Address,
    "address"
);
hash_newtype!(
    /// Identifies a block.
    BlockId,
    "block id"
);
hash_newtype!(
    /// Identifies a transaction.
    TransactionId,
    "transaction id"
);

/// Identifies an accumulator leaf: the hash of the entity that created
/// the element plus the index of the output within it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ElementId {
    pub source: Hash256,
    pub index: u64,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.index)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementId({})", self)
    }
}

impl FromStr for ElementId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, index) = s
            .split_once(':')
            .ok_or_else(|| ParseIdError::new("element id", "missing ':' separator"))?;
        Ok(ElementId {
            source: source
                .parse()
                .map_err(|_| ParseIdError::new("element id", "bad source hash"))?,
            index: index
                .parse()
                .map_err(|_| ParseIdError::new("element id", "bad output index"))?,
        })
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl SiaEncode for ElementId {
    fn encode(&self, e: &mut Encoder) {
        self.source.encode(e);
        e.write_u64(self.index);
    }
}

impl SiaDecode for ElementId {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(ElementId {
            source: Hash256::decode(d)?,
            index: d.read_u64()?,
        })
    }
}
