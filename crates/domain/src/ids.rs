use crate::errors::DomainError;
use serde::{Deserialize, Serialize};

/// ULID ベースの不透明な識別子を定義する
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $error:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// 新しいIDを生成
            pub fn new() -> Self {
                Self(ulid::Ulid::new().to_string())
            }

            /// 文字列からIDを作成
            pub fn from_string(id: impl Into<String>) -> Result<Self, DomainError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(DomainError::$error(
                        concat!($label, " cannot be empty").to_string(),
                    ));
                }
                Ok(Self(id))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// 商品ID
    ProductId,
    InvalidProductId,
    "Product ID"
);
define_id!(
    /// カテゴリID
    CategoryId,
    InvalidCategoryId,
    "Category ID"
);
define_id!(
    /// 注文ID
    OrderId,
    InvalidOrderId,
    "Order ID"
);
define_id!(
    /// 注文明細ID
    LineItemId,
    InvalidLineItemId,
    "Line item ID"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = OrderId::new();
        let b = OrderId::new();
        assert_ne!(a, b);
        assert!(!a.as_str().is_empty());
    }

    #[test]
    fn test_from_string_rejects_blank() {
        assert_eq!(ProductId::from_string("p1").unwrap().as_str(), "p1");
        assert!(ProductId::from_string("").is_err());
        assert!(CategoryId::from_string("   ").is_err());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = OrderId::from_string("o1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"o1\"");
    }
}
