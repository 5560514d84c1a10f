use crate::errors::DomainError;
use crate::ids::{LineItemId, OrderId, ProductId};
use crate::money;
use crate::product::Product;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 注文ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// 文字列からステータスを作成
    pub fn from_string(status: &str) -> Result<Self, DomainError> {
        match status.trim().to_lowercase().as_str() {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            _ => Err(DomainError::InvalidOrderStatus(status.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// 正常系フロー上の位置（cancelled はフロー外）
    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// 前進のみの遷移グラフで `next` へ移れるか
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(current), Some(target)) => target > current,
            (None, Some(_)) => false,
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// ステータス変更の許可ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusTransitionPolicy {
    /// どのステータスからでも任意のステータスへ変更可能
    #[default]
    Unrestricted,
    /// pending → processing → shipped → delivered の前進のみ、cancelled は未完了状態から
    ForwardOnly,
}

impl StatusTransitionPolicy {
    pub fn from_string(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "unrestricted" => Some(StatusTransitionPolicy::Unrestricted),
            "forward_only" => Some(StatusTransitionPolicy::ForwardOnly),
            _ => None,
        }
    }

    pub fn check(&self, from: OrderStatus, to: OrderStatus) -> Result<(), DomainError> {
        match self {
            StatusTransitionPolicy::Unrestricted => Ok(()),
            StatusTransitionPolicy::ForwardOnly if from.can_advance_to(to) => Ok(()),
            StatusTransitionPolicy::ForwardOnly => Err(DomainError::InvalidStatusTransition {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

/// 注文ヘッダー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    /// 作成時点で確定した合計金額
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub fn from_new(id: OrderId, order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            status: order.status,
            total: order.total,
            created_at,
        }
    }
}

/// ストアへ送る注文ヘッダー（IDはストアが採番）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub total: Decimal,
}

/// 注文明細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub order_id: OrderId,
    /// 商品への弱参照（商品が削除されても明細は残る）
    pub product_id: ProductId,
    pub quantity: u32,
    /// 注文時点の単価
    pub unit_price: Decimal,
}

impl OrderLineItem {
    pub fn from_new(id: LineItemId, item: NewOrderLineItem) -> Self {
        Self {
            id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }

    pub fn subtotal(&self) -> Option<Decimal> {
        money::line_total(self.unit_price, self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderLineItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// 注文詳細の明細行（商品は削除済みの場合がある）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItemDetail {
    pub item: OrderLineItem,
    pub product: Option<Product>,
}

/// 注文詳細
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub order: Order,
    pub items: Vec<LineItemDetail>,
}

impl OrderDetails {
    pub fn new(order: Order, items: Vec<OrderLineItem>, products: &[Product]) -> Self {
        let items = items
            .into_iter()
            .map(|item| {
                let product = products.iter().find(|p| p.id == item.product_id).cloned();
                LineItemDetail { item, product }
            })
            .collect();
        Self { order, items }
    }

    /// 明細から再計算した合計（明細が欠けていればヘッダーの合計と一致しない）。
    /// 桁あふれの場合は `None`
    pub fn items_total(&self) -> Option<Decimal> {
        money::checked_sum(self.items.iter().map(|d| d.item.subtotal()))
    }

    pub fn is_consistent(&self) -> bool {
        self.items_total() == Some(self.order.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_string() {
        assert_eq!(
            OrderStatus::from_string("pending").unwrap(),
            OrderStatus::Pending
        );
        assert_eq!(
            OrderStatus::from_string("SHIPPED").unwrap(),
            OrderStatus::Shipped
        );
        assert!(OrderStatus::from_string("lost").is_err());
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_status_round_trip_all() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unrestricted_allows_anything() {
        let policy = StatusTransitionPolicy::Unrestricted;
        assert!(policy
            .check(OrderStatus::Delivered, OrderStatus::Pending)
            .is_ok());
        assert!(policy
            .check(OrderStatus::Cancelled, OrderStatus::Shipped)
            .is_ok());
    }

    #[test]
    fn test_forward_only_graph() {
        let policy = StatusTransitionPolicy::ForwardOnly;
        assert!(policy
            .check(OrderStatus::Pending, OrderStatus::Processing)
            .is_ok());
        // 途中のステータスを飛ばす前進は許可
        assert!(policy
            .check(OrderStatus::Pending, OrderStatus::Delivered)
            .is_ok());
        assert!(policy
            .check(OrderStatus::Shipped, OrderStatus::Cancelled)
            .is_ok());
        assert!(policy
            .check(OrderStatus::Processing, OrderStatus::Processing)
            .is_ok());

        assert!(policy
            .check(OrderStatus::Shipped, OrderStatus::Pending)
            .is_err());
        assert!(policy
            .check(OrderStatus::Delivered, OrderStatus::Cancelled)
            .is_err());
        assert!(policy
            .check(OrderStatus::Cancelled, OrderStatus::Pending)
            .is_err());
    }

    #[test]
    fn test_policy_from_string() {
        assert_eq!(
            StatusTransitionPolicy::from_string("forward_only"),
            Some(StatusTransitionPolicy::ForwardOnly)
        );
        assert_eq!(StatusTransitionPolicy::from_string("strict"), None);
    }

    #[test]
    fn test_details_without_items_is_inconsistent() {
        let order = Order::from_new(
            OrderId::new(),
            NewOrder {
                customer_name: "Ana".to_string(),
                customer_email: "ana@x.com".to_string(),
                customer_phone: None,
                status: OrderStatus::Pending,
                total: Decimal::new(2000, 2),
            },
            Utc::now(),
        );
        let details = OrderDetails::new(order, vec![], &[]);
        assert_eq!(details.items_total(), Some(Decimal::ZERO));
        assert!(!details.is_consistent());
    }

    #[test]
    fn test_overflowing_line_item_does_not_panic() {
        let order_id = OrderId::new();
        let item = OrderLineItem::from_new(
            LineItemId::new(),
            NewOrderLineItem {
                order_id: order_id.clone(),
                product_id: ProductId::new(),
                quantity: u32::MAX,
                unit_price: Decimal::MAX,
            },
        );
        assert_eq!(item.subtotal(), None);

        let order = Order::from_new(
            order_id,
            NewOrder {
                customer_name: "Ana".to_string(),
                customer_email: "ana@x.com".to_string(),
                customer_phone: None,
                status: OrderStatus::Pending,
                total: Decimal::ONE,
            },
            Utc::now(),
        );
        let details = OrderDetails::new(order, vec![item], &[]);
        assert_eq!(details.items_total(), None);
        assert!(!details.is_consistent());
    }
}
