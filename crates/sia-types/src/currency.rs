//! 128-bit coin amounts.

use crate::encoding::{Decoder, DecodeError, Encoder, SiaDecode, SiaEncode};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

/// One siacoin, in base units.
const COIN: u128 = 1_000_000_000_000_000_000_000_000;

/// A quantity of siacoins, in base units. Arithmetic panics on overflow
/// and underflow; amounts that reach the stats pipeline are bounded by
/// the supply, so a wrap indicates corrupt input.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Currency(pub u128);

impl Currency {
    pub const ZERO: Currency = Currency(0);

    /// Returns n whole siacoins.
    pub fn siacoins(n: u64) -> Self {
        Currency(COIN * n as u128)
    }

    pub fn checked_add(self, rhs: Currency) -> Option<Currency> {
        self.0.checked_add(rhs.0).map(Currency)
    }

    pub fn checked_sub(self, rhs: Currency) -> Option<Currency> {
        self.0.checked_sub(rhs.0).map(Currency)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Currency {
    type Output = Currency;

    fn add(self, rhs: Currency) -> Currency {
        self.checked_add(rhs).expect("currency overflow")
    }
}

impl AddAssign for Currency {
    fn add_assign(&mut self, rhs: Currency) {
        *self = *self + rhs;
    }
}

impl Sub for Currency {
    type Output = Currency;

    fn sub(self, rhs: Currency) -> Currency {
        self.checked_sub(rhs).expect("currency underflow")
    }
}

impl SubAssign for Currency {
    fn sub_assign(&mut self, rhs: Currency) {
        *self = *self - rhs;
    }
}

impl Sum for Currency {
    fn sum<I: Iterator<Item = Currency>>(iter: I) -> Currency {
        iter.fold(Currency::ZERO, Add::add)
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Currency({})", self.0)
    }
}

impl FromStr for Currency {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Currency)
    }
}

// JSON carries amounts as decimal strings; u128 does not survive every
// JSON consumer as a number.
impl Serialize for Currency {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for Currency {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl SiaEncode for Currency {
    fn encode(&self, e: &mut Encoder) {
        e.write_u128(self.0);
    }
}

impl SiaDecode for Currency {
    fn decode(d: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok(Currency(d.read_u128()?))
    }
}
