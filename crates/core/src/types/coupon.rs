//! Coupon domain enums.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How a coupon's amount is interpreted when applied to a cart total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponType {
    /// Subtract the coupon amount once.
    FixedAmount,
    /// Subtract `total * amount / 100`.
    Percentage,
}

impl CouponType {
    /// The snake_case string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FixedAmount => "fixed_amount",
            Self::Percentage => "percentage",
        }
    }

    /// Parse the snake_case string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "fixed_amount" => Some(Self::FixedAmount),
            "percentage" => Some(Self::Percentage),
            _ => None,
        }
    }
}

impl fmt::Display for CouponType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CouponType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CouponType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Self::from_str_opt(&s).ok_or_else(|| format!("unknown coupon type: {s}").into())
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CouponType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for ty in [CouponType::FixedAmount, CouponType::Percentage] {
            assert_eq!(CouponType::from_str_opt(ty.as_str()), Some(ty));
        }
        assert_eq!(CouponType::from_str_opt("bogof"), None);
    }
}
