//! # BigAmount
//!
//! Arbitrary-precision signed integer used for every balance, fee, amount and
//! reward on the ledger. Arithmetic is exact, so applying and then reverting a
//! transaction restores the original value bit for bit.
//!
//! Amounts serialize as base-10 strings in both JSON and bincode so they never
//! pass through a float.

use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Exact integer amount in the smallest currency unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BigAmount(BigInt);

impl BigAmount {
    /// The zero amount.
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    /// Division that returns `None` instead of panicking on a zero divisor.
    pub fn checked_div(&self, rhs: &BigAmount) -> Option<BigAmount> {
        if rhs.is_zero() {
            None
        } else {
            Some(Self(&self.0 / &rhs.0))
        }
    }

    /// Lossy conversion for metrics and logging only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::MAX)
    }

    /// Value as `u64` when it fits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
}

impl fmt::Display for BigAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error returned when parsing a malformed amount string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid amount: {0}")]
pub struct ParseAmountError(String);

impl FromStr for BigAmount {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s.trim())
            .map(Self)
            .map_err(|_| ParseAmountError(s.to_string()))
    }
}

macro_rules! impl_from_primitive {
    ($($t:ty),*) => {
        $(
            impl From<$t> for BigAmount {
                fn from(value: $t) -> Self {
                    Self(BigInt::from(value))
                }
            }
        )*
    };
}

impl_from_primitive!(u8, u32, u64, u128, i32, i64, i128);

impl Add for BigAmount {
    type Output = BigAmount;
    fn add(self, rhs: BigAmount) -> BigAmount {
        Self(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a BigAmount> for &'a BigAmount {
    type Output = BigAmount;
    fn add(self, rhs: &'a BigAmount) -> BigAmount {
        BigAmount(&self.0 + &rhs.0)
    }
}

impl Sub for BigAmount {
    type Output = BigAmount;
    fn sub(self, rhs: BigAmount) -> BigAmount {
        Self(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a BigAmount> for &'a BigAmount {
    type Output = BigAmount;
    fn sub(self, rhs: &'a BigAmount) -> BigAmount {
        BigAmount(&self.0 - &rhs.0)
    }
}

impl Mul for BigAmount {
    type Output = BigAmount;
    fn mul(self, rhs: BigAmount) -> BigAmount {
        Self(self.0 * rhs.0)
    }
}

impl<'a> Mul<&'a BigAmount> for &'a BigAmount {
    type Output = BigAmount;
    fn mul(self, rhs: &'a BigAmount) -> BigAmount {
        BigAmount(&self.0 * &rhs.0)
    }
}

/// Truncating division. Panics on a zero divisor like primitive integers;
/// use [`BigAmount::checked_div`] when the divisor is untrusted.
impl Div for BigAmount {
    type Output = BigAmount;
    fn div(self, rhs: BigAmount) -> BigAmount {
        Self(self.0 / rhs.0)
    }
}

impl Neg for BigAmount {
    type Output = BigAmount;
    fn neg(self) -> BigAmount {
        Self(-self.0)
    }
}

impl AddAssign<&BigAmount> for BigAmount {
    fn add_assign(&mut self, rhs: &BigAmount) {
        self.0 += &rhs.0;
    }
}

impl SubAssign<&BigAmount> for BigAmount {
    fn sub_assign(&mut self, rhs: &BigAmount) {
        self.0 -= &rhs.0;
    }
}

impl<'a> Sum<&'a BigAmount> for BigAmount {
    fn sum<I: Iterator<Item = &'a BigAmount>>(iter: I) -> Self {
        iter.fold(BigAmount::zero(), |acc, x| &acc + x)
    }
}

impl Sum for BigAmount {
    fn sum<I: Iterator<Item = BigAmount>>(iter: I) -> Self {
        iter.fold(BigAmount::zero(), |acc, x| acc + x)
    }
}

impl Serialize for BigAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for BigAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> de::Visitor<'de> for AmountVisitor {
            type Value = BigAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base-10 integer string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<BigAmount, E> {
                BigAmount::from_str(v).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(AmountVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amt(v: i64) -> BigAmount {
        BigAmount::from(v)
    }

    #[test]
    fn test_arithmetic_is_exact() {
        let big = BigAmount::from_str("123456789012345678901234567890").unwrap();
        let one = amt(1);
        let sum = &big + &one;
        assert_eq!(&sum - &one, big);
        assert_eq!(sum.to_string(), "123456789012345678901234567891");
    }

    #[test]
    fn test_sign_inspection() {
        assert!(BigAmount::zero().is_zero());
        assert!(amt(-1).is_negative());
        assert!(amt(5).is_positive());
        assert!(!amt(0).is_negative());
        assert!((amt(100) - amt(101)).is_negative());
    }

    #[test]
    fn test_checked_div() {
        assert_eq!(amt(10).checked_div(&amt(3)), Some(amt(3)));
        assert_eq!(amt(10).checked_div(&BigAmount::zero()), None);
    }

    #[test]
    fn test_ordering_and_sum() {
        let values = [amt(3), amt(1), amt(2)];
        let total: BigAmount = values.iter().sum();
        assert_eq!(total, amt(6));
        assert!(amt(1) < amt(2));
        assert_eq!(values.iter().max(), Some(&amt(3)));
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&amt(899)).unwrap();
        assert_eq!(json, "\"899\"");
        let back: BigAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amt(899));
        assert!(serde_json::from_str::<BigAmount>("\"12x\"").is_err());
    }

    #[test]
    fn test_bincode_roundtrip() {
        let value = BigAmount::from_str("-98765432109876543210").unwrap();
        let bytes = bincode::serialize(&value).unwrap();
        let back: BigAmount = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back, value);
    }
}
