use crate::ports::StoreError;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use domain::{CategoryId, LineItemId, OrderId, ProductId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

/// DynamoDB アイテムのエンティティタイプ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Product,
    Category,
    /// カテゴリ名の一意性を保証するためのガードアイテム
    CategoryName,
    Order,
    LineItem,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Product => "Product",
            EntityType::Category => "Category",
            EntityType::CategoryName => "CategoryName",
            EntityType::Order => "Order",
            EntityType::LineItem => "LineItem",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s {
            "Product" => Some(EntityType::Product),
            "Category" => Some(EntityType::Category),
            "CategoryName" => Some(EntityType::CategoryName),
            "Order" => Some(EntityType::Order),
            "LineItem" => Some(EntityType::LineItem),
            _ => None,
        }
    }
}

pub const PRODUCTS_PK: &str = "PRODUCTS";
pub const CATEGORIES_PK: &str = "CATEGORIES";
pub const CATEGORY_NAMES_PK: &str = "CATEGORY_NAMES";
pub const ORDERS_PK: &str = "ORDERS";

pub const PRODUCT_SK_PREFIX: &str = "PRODUCT#";
pub const CATEGORY_SK_PREFIX: &str = "CATEGORY#";
pub const ORDER_SK_PREFIX: &str = "ORDER#";
pub const LINE_ITEM_SK_PREFIX: &str = "ITEM#";

/// DynamoDB Single Table Design のキー構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbKeys {
    pub pk: String,
    pub sk: String,
}

impl DynamoDbKeys {
    /// ULID のソートキーで作成順に並ぶ
    pub fn for_product(id: &ProductId) -> Self {
        Self {
            pk: PRODUCTS_PK.to_string(),
            sk: format!("{PRODUCT_SK_PREFIX}{id}"),
        }
    }

    pub fn for_category(id: &CategoryId) -> Self {
        Self {
            pk: CATEGORIES_PK.to_string(),
            sk: format!("{CATEGORY_SK_PREFIX}{id}"),
        }
    }

    pub fn for_category_name(name: &str) -> Self {
        Self {
            pk: CATEGORY_NAMES_PK.to_string(),
            sk: format!("NAME#{name}"),
        }
    }

    pub fn for_order(id: &OrderId) -> Self {
        Self {
            pk: ORDERS_PK.to_string(),
            sk: format!("{ORDER_SK_PREFIX}{id}"),
        }
    }

    /// 明細は注文ごとのパーティションに、バッチ内の位置順で並ぶ
    pub fn for_line_item(order_id: &OrderId, position: usize, id: &LineItemId) -> Self {
        Self {
            pk: Self::line_item_partition(order_id),
            sk: format!("{LINE_ITEM_SK_PREFIX}{position:04}#{id}"),
        }
    }

    pub fn line_item_partition(order_id: &OrderId) -> String {
        format!("ORDER#{order_id}#ITEMS")
    }

    pub fn to_key_map(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([
            ("PK".to_string(), AttributeValue::S(self.pk.clone())),
            ("SK".to_string(), AttributeValue::S(self.sk.clone())),
        ])
    }
}

/// DynamoDB アイテムの基本構造
#[derive(Debug, Clone, PartialEq)]
pub struct DynamoDbItem {
    pub keys: DynamoDbKeys,
    pub entity_type: EntityType,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl DynamoDbItem {
    /// エンティティを JSON の Data 属性として格納するアイテムを作成
    pub fn encode<T: Serialize>(
        keys: DynamoDbKeys,
        entity_type: EntityType,
        entity: &T,
        created_at: DateTime<Utc>,
    ) -> Result<Self, StoreError> {
        let data = serde_json::to_value(entity).map_err(|e| {
            StoreError::Rejected(format!(
                "Failed to serialize {}: {e}",
                entity_type.as_str()
            ))
        })?;
        Ok(Self {
            keys,
            entity_type,
            data,
            created_at,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            StoreError::Corrupt(format!(
                "Failed to deserialize {} {}: {e}",
                self.entity_type.as_str(),
                self.keys.sk
            ))
        })
    }

    /// DynamoDB AttributeValue マップに変換
    pub fn to_attribute_map(&self) -> HashMap<String, AttributeValue> {
        let mut map = self.keys.to_key_map();
        map.insert(
            "EntityType".to_string(),
            AttributeValue::S(self.entity_type.as_str().to_string()),
        );
        map.insert("Data".to_string(), AttributeValue::S(self.data.to_string()));
        map.insert(
            "CreatedAt".to_string(),
            AttributeValue::S(self.created_at.to_rfc3339()),
        );
        map
    }

    /// DynamoDB AttributeValue マップから復元
    pub fn from_attribute_map(map: &HashMap<String, AttributeValue>) -> Result<Self, StoreError> {
        let keys = DynamoDbKeys {
            pk: string_attribute(map, "PK")?.clone(),
            sk: string_attribute(map, "SK")?.clone(),
        };

        let entity_type = EntityType::from_string(string_attribute(map, "EntityType")?)
            .ok_or_else(|| StoreError::Corrupt(format!("Unknown EntityType for {}", keys.sk)))?;

        let data = serde_json::from_str(string_attribute(map, "Data")?)
            .map_err(|e| StoreError::Corrupt(format!("Failed to parse Data JSON: {e}")))?;

        let created_at = DateTime::parse_from_rfc3339(string_attribute(map, "CreatedAt")?)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("Invalid CreatedAt: {e}")))?;

        Ok(Self {
            keys,
            entity_type,
            data,
            created_at,
        })
    }
}

pub fn string_attribute<'a>(
    map: &'a HashMap<String, AttributeValue>,
    name: &str,
) -> Result<&'a String, StoreError> {
    map.get(name)
        .and_then(|v| v.as_s().ok())
        .ok_or_else(|| StoreError::Corrupt(format!("Missing {name}")))
}

/// カテゴリ名ガードアイテム
pub fn category_name_guard(name: &str, category_id: &CategoryId) -> HashMap<String, AttributeValue> {
    let mut map = DynamoDbKeys::for_category_name(name).to_key_map();
    map.insert(
        "EntityType".to_string(),
        AttributeValue::S(EntityType::CategoryName.as_str().to_string()),
    );
    map.insert(
        "CategoryId".to_string(),
        AttributeValue::S(category_id.to_string()),
    );
    map
}
