//! Prices in integer minor currency units.
//!
//! Catalog prices are stored as whole cents (or the equivalent minor unit for
//! the shop currency). Integer arithmetic keeps totals exact without a decimal
//! dependency.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Catalog prices must be strictly positive.
    #[error("price must be a positive number of minor units (got {0})")]
    NotPositive(i64),
}

/// A catalog price in minor currency units (e.g. cents).
///
/// ```
/// use finvise_core::Price;
///
/// let price = Price::from_minor_units(1999).unwrap();
/// assert_eq!(price.minor_units(), 1999);
/// assert_eq!(price.to_string(), "19.99");
///
/// assert!(Price::from_minor_units(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    /// Create a price, rejecting zero and negative amounts.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::NotPositive` if `minor_units <= 0`.
    pub const fn from_minor_units(minor_units: i64) -> Result<Self, PriceError> {
        if minor_units <= 0 {
            return Err(PriceError::NotPositive(minor_units));
        }
        Ok(Self(minor_units))
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor_units(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}

impl TryFrom<i64> for Price {
    type Error = PriceError;

    fn try_from(minor_units: i64) -> Result<Self, Self::Error> {
        Self::from_minor_units(minor_units)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let minor_units = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::from_minor_units(minor_units)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_positive() {
        assert_eq!(Price::from_minor_units(0), Err(PriceError::NotPositive(0)));
        assert_eq!(
            Price::try_from(-150),
            Err(PriceError::NotPositive(-150))
        );
    }

    #[test]
    fn test_display_pads_cents() {
        assert_eq!(Price::from_minor_units(100).unwrap().to_string(), "1.00");
        assert_eq!(Price::from_minor_units(5).unwrap().to_string(), "0.05");
    }

    #[test]
    fn test_serializes_as_integer() {
        let price = Price::from_minor_units(150).unwrap();
        assert_eq!(serde_json::to_string(&price).unwrap(), "150");
    }

    #[test]
    fn test_deserialize_validates() {
        let price: Price = serde_json::from_str("2500").unwrap();
        assert_eq!(price.minor_units(), 2500);
        assert!(serde_json::from_str::<Price>("0").is_err());
        assert!(serde_json::from_str::<Price>("-1").is_err());
    }
}
