//! Audit log enums.

use core::fmt;

use serde::{Deserialize, Serialize};

/// The kind of entity an audit entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Category,
    SubCategory,
    Brand,
    Product,
    Coupon,
    User,
}

impl AuditEntity {
    /// The snake_case string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::SubCategory => "sub_category",
            Self::Brand => "brand",
            Self::Product => "product",
            Self::Coupon => "coupon",
            Self::User => "user",
        }
    }

    /// Parse the snake_case string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "category" => Some(Self::Category),
            "sub_category" => Some(Self::SubCategory),
            "brand" => Some(Self::Brand),
            "product" => Some(Self::Product),
            "coupon" => Some(Self::Coupon),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The mutation an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    /// The snake_case string form used in storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// Parse the snake_case string form.
    #[must_use]
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "create" => Some(Self::Create),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! text_column {
    ($name:ident, $label:literal) => {
        #[cfg(feature = "postgres")]
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(
                value: sqlx::postgres::PgValueRef<'r>,
            ) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Self::from_str_opt(&s).ok_or_else(|| format!("unknown {}: {s}", $label).into())
            }
        }

        #[cfg(feature = "postgres")]
        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }
    };
}

text_column!(AuditEntity, "audit entity");
text_column!(AuditAction, "audit action");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for entity in [
            AuditEntity::Category,
            AuditEntity::SubCategory,
            AuditEntity::Brand,
            AuditEntity::Product,
            AuditEntity::Coupon,
            AuditEntity::User,
        ] {
            assert_eq!(AuditEntity::from_str_opt(entity.as_str()), Some(entity));
        }
        for action in [AuditAction::Create, AuditAction::Update, AuditAction::Delete] {
            assert_eq!(AuditAction::from_str_opt(action.as_str()), Some(action));
        }
    }
}
