//! Value Objects for the storefront

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stock strictly below this (and above zero) counts as running low.
pub const LOW_STOCK_THRESHOLD: u32 = 5;

const CODE_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Human-readable product code, `PID-` followed by five base-36 characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductCode(String);

impl ProductCode {
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let suffix: String = (0..5).map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char).collect();
        Self(format!("PID-{suffix}"))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, CodeError> {
        let value = value.into().trim().to_uppercase();
        let suffix = value.strip_prefix("PID-").ok_or(CodeError::Prefix)?;
        if suffix.len() != 5 || !suffix.bytes().all(|b| CODE_ALPHABET.contains(&b)) { return Err(CodeError::Shape); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for ProductCode {
    type Error = CodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl From<ProductCode> for String {
    fn from(code: ProductCode) -> Self { code.0 }
}

/// Order number, `OID-` followed by a four digit suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderNumber(String);

impl OrderNumber {
    pub const MIN_SUFFIX: u16 = 1000;
    pub const MAX_SUFFIX: u16 = 9999;

    pub fn from_suffix(suffix: u16) -> Result<Self, CodeError> {
        if !(Self::MIN_SUFFIX..=Self::MAX_SUFFIX).contains(&suffix) { return Err(CodeError::Shape); }
        Ok(Self(format!("OID-{suffix}")))
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!("OID-{}", rng.gen_range(Self::MIN_SUFFIX..=Self::MAX_SUFFIX)))
    }

    pub fn parse(value: impl Into<String>) -> Result<Self, CodeError> {
        let value = value.into();
        let suffix = value.strip_prefix("OID-").ok_or(CodeError::Prefix)?;
        if suffix.len() != 4 || !suffix.bytes().all(|b| b.is_ascii_digit()) { return Err(CodeError::Shape); }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for OrderNumber {
    type Error = CodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::parse(value) }
}

impl From<OrderNumber> for String {
    fn from(number: OrderNumber) -> Self { number.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CodeError { Prefix, Shape }
impl std::error::Error for CodeError {}
impl fmt::Display for CodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Prefix => write!(f, "unexpected code prefix"), Self::Shape => write!(f, "malformed code") }
    }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_positive(&self) -> bool { self.amount > Decimal::ZERO }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money { Money::new(self.amount * Decimal::from(qty), &self.currency) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}", self.currency, self.amount) }
}

#[derive(Debug, Clone)] pub enum MoneyError { CurrencyMismatch }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Currency mismatch") }
}

/// Units on hand for a product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
    pub fn is_low(&self) -> bool { self.0 > 0 && self.0 < LOW_STOCK_THRESHOLD }
}

/// Review score between one and five stars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Option<Self> { (1..=5).contains(&value).then_some(Self(value)) }
    pub fn value(&self) -> u8 { self.0 }
}

impl TryFrom<u8> for Rating {
    type Error = String;
    fn try_from(value: u8) -> Result<Self, Self::Error> { Self::new(value).ok_or_else(|| format!("rating {value} is outside 1..=5")) }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self { rating.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use rust_decimal_macros::dec;

    #[test]
    fn test_product_code() {
        let code = ProductCode::generate(&mut StdRng::seed_from_u64(7));
        assert!(code.as_str().starts_with("PID-"));
        assert_eq!(ProductCode::parse(code.as_str()).unwrap(), code);
        assert_eq!(ProductCode::parse("pid-ab12z").unwrap().as_str(), "PID-AB12Z");
        assert_eq!(ProductCode::parse("SKU-AB12Z"), Err(CodeError::Prefix));
    }

    #[test]
    fn test_order_number_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let n = OrderNumber::random(&mut rng);
            assert!(OrderNumber::parse(n.as_str()).is_ok(), "{n}");
        }
        assert_eq!(OrderNumber::from_suffix(1234).unwrap().as_str(), "OID-1234");
        assert!(OrderNumber::from_suffix(999).is_err());
        assert!(OrderNumber::parse("OID-12a4").is_err());
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(dec!(100), "LKR");
        let b = Money::new(dec!(50), "lkr");
        assert_eq!(a.add(&b).unwrap().amount(), dec!(150));
        assert!(a.add(&Money::new(dec!(1), "USD")).is_err());
        assert_eq!(a.multiply(3).amount(), dec!(300));
    }

    #[test]
    fn test_low_stock_window() {
        assert!(!Quantity::new(0).is_low());
        assert!(Quantity::new(1).is_low());
        assert!(Quantity::new(4).is_low());
        assert!(!Quantity::new(5).is_low());
        assert_eq!(Quantity::new(3).subtract(4), None);
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_none());
        assert_eq!(Rating::new(5).map(|r| r.value()), Some(5));
        assert!(serde_json::from_str::<Rating>("6").is_err());
    }
}
