//! Value Objects for grocery commerce

use rand::{distributions::Alphanumeric, Rng};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign};
use thiserror::Error;

/// Amount of rupiah. Every platform price is IDR, so the currency is implied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const CURRENCY: &'static str = "IDR";

    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn rupiah(amount: i64) -> Self { Self(Decimal::from(amount)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }

    pub fn times(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Subtracts, flooring at zero.
    pub fn saturating_sub(&self, other: Money) -> Money {
        if other.0 >= self.0 { Money::ZERO } else { Money(self.0 - other.0) }
    }

    /// `p` percent of this amount, rounded to whole rupiah.
    pub fn percent(&self, p: Percentage) -> Money {
        Money(self.0 * p.value() / Decimal::ONE_HUNDRED).rounded()
    }

    pub fn min(self, other: Money) -> Money { if other < self { other } else { self } }

    pub fn cap(self, limit: Option<Money>) -> Money {
        match limit { Some(l) => self.min(l), None => self }
    }

    fn rounded(self) -> Money {
        Money(self.0.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) { self.0 += rhs.0; }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::ZERO, |a, b| a + b) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", Self::CURRENCY, self.0) }
}

/// Percentage in the half-open range (0, 100].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Percentage(Decimal);

impl Percentage {
    pub fn new(value: Decimal) -> Result<Self, ValueError> {
        if value <= Decimal::ZERO || value > Decimal::ONE_HUNDRED {
            return Err(ValueError::PercentageOutOfRange(value));
        }
        Ok(Self(value))
    }
    pub fn value(&self) -> Decimal { self.0 }
}

impl TryFrom<Decimal> for Percentage {
    type Error = ValueError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Percentage> for Decimal {
    fn from(p: Percentage) -> Decimal { p.0 }
}

/// Voucher or referral code.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    pub fn new(value: impl Into<String>) -> Result<Self, ValueError> {
        let value = value.into().trim().to_uppercase();
        if value.len() < 4 || value.len() > 32 {
            return Err(ValueError::CodeLength(value.len()));
        }
        if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(ValueError::CodeCharacters(value));
        }
        Ok(Self(value))
    }

    /// Random code: `PREFIX-XXXXXXXX`, or just the random part for an empty prefix.
    pub fn generate(prefix: &str) -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(|c| char::from(c).to_ascii_uppercase())
            .collect();
        if prefix.is_empty() { Self(suffix) } else { Self(format!("{}-{}", prefix.to_uppercase(), suffix)) }
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for Code {
    type Error = ValueError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Code> for String {
    fn from(c: Code) -> String { c.0 }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// WGS84 coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValueError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValueError::Coordinates(latitude, longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Great-circle distance (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * Self::EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    #[error("percentage must be in (0, 100], got {0}")]
    PercentageOutOfRange(Decimal),
    #[error("code must be 4 to 32 characters, got {0}")]
    CodeLength(usize),
    #[error("code may only contain letters, digits and '-': {0}")]
    CodeCharacters(String),
    #[error("invalid coordinates ({0}, {1})")]
    Coordinates(f64, f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(v: i64) -> Percentage { Percentage::new(Decimal::from(v)).unwrap() }

    #[test]
    fn test_code_normalized() {
        let code = Code::new("  hemat-10 ").unwrap();
        assert_eq!(code.as_str(), "HEMAT-10");
        assert!(Code::new("ab").is_err());
        assert!(Code::new("NO SPACES").is_err());
    }

    #[test]
    fn test_generated_code_is_valid() {
        let code = Code::generate("ref");
        assert!(code.as_str().starts_with("REF-"));
        assert!(Code::new(code.as_str()).is_ok());
    }

    #[test]
    fn test_money_percent_rounds_to_rupiah() {
        assert_eq!(Money::rupiah(12_345).percent(pct(10)), Money::rupiah(1_235));
        assert_eq!(Money::rupiah(999).percent(pct(50)), Money::rupiah(500));
    }

    #[test]
    fn test_saturating_sub_floors_at_zero() {
        assert_eq!(Money::rupiah(5_000).saturating_sub(Money::rupiah(7_000)), Money::ZERO);
        assert_eq!(Money::rupiah(5_000).saturating_sub(Money::rupiah(2_000)), Money::rupiah(3_000));
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(Percentage::new(Decimal::ZERO).is_err());
        assert!(Percentage::new(Decimal::from(101)).is_err());
        assert!(Percentage::new(Decimal::ONE_HUNDRED).is_ok());
    }

    #[test]
    fn test_distance_jakarta_bandung() {
        let jakarta = GeoPoint::new(-6.2088, 106.8456).unwrap();
        let bandung = GeoPoint::new(-6.9175, 107.6191).unwrap();
        let d = jakarta.distance_km(&bandung);
        assert!((110.0..120.0).contains(&d), "got {d}");
    }
}
