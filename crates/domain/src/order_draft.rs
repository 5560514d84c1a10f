//! 作成中の注文（ドラフト）
//!
//! 顧客情報と明細を保持し、現在のカタログ価格から合計を算出する。
//! 永続化は行わない。

use crate::errors::DomainError;
use crate::money;
use crate::ids::{OrderId, ProductId};
use crate::order::{NewOrder, NewOrderLineItem, OrderStatus};
use crate::product::Product;
use crate::validation::{self, Field, Rule, ValidationFailure};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const CUSTOMER_NAME_MAX: usize = 200;
pub const CUSTOMER_EMAIL_MAX: usize = 255;
pub const CUSTOMER_PHONE_MAX: usize = 20;

/// 1明細あたりの数量の上限
pub const LINE_ITEM_QUANTITY_MAX: u32 = 100_000;

/// ドラフトの明細行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLineItem {
    pub product_id: ProductId,
    pub quantity: u32,
}

impl DraftLineItem {
    pub fn new(product_id: ProductId, quantity: u32) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<DraftLineItem>,
}

/// カタログのスナップショットから単価を引く（存在しない商品は 0）
fn unit_price(catalog: &[Product], product_id: &ProductId) -> Decimal {
    catalog
        .iter()
        .find(|p| &p.id == product_id)
        .map(|p| p.price)
        .unwrap_or(Decimal::ZERO)
}

impl OrderDraft {
    pub fn new(customer_name: impl Into<String>, customer_email: impl Into<String>) -> Self {
        Self {
            customer_name: customer_name.into(),
            customer_email: customer_email.into(),
            ..Self::default()
        }
    }

    /// 先頭の商品・数量 1 で明細を追加する。カタログが空なら何もしない
    pub fn add_line_item(&mut self, catalog: &[Product]) -> bool {
        match catalog.first() {
            Some(product) => {
                self.items.push(DraftLineItem::new(product.id.clone(), 1));
                true
            }
            None => false,
        }
    }

    pub fn remove_line_item(&mut self, index: usize) -> Result<DraftLineItem, DomainError> {
        self.check_index(index)?;
        Ok(self.items.remove(index))
    }

    pub fn set_line_item_product(
        &mut self,
        index: usize,
        product_id: ProductId,
    ) -> Result<(), DomainError> {
        self.check_index(index)?;
        self.items[index].product_id = product_id;
        Ok(())
    }

    /// 入力値を正の整数として解釈して数量を更新する。
    /// 不正な値の場合は数量を変更せずにエラーを返す
    pub fn set_line_item_quantity(&mut self, index: usize, input: &str) -> Result<u32, DomainError> {
        self.check_index(index)?;
        let quantity = parse_quantity(input)?;
        self.items[index].quantity = quantity;
        Ok(quantity)
    }

    fn check_index(&self, index: usize) -> Result<(), DomainError> {
        if index >= self.items.len() {
            return Err(DomainError::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }
        Ok(())
    }

    /// Σ(単価 × 数量)。カタログに無い商品は 0 として扱う。
    /// 表示用で panic しない。桁あふれの場合は `Decimal::MAX` を返し、送信時に `checked_total` で拒否される
    pub fn compute_total(&self, catalog: &[Product]) -> Decimal {
        self.checked_total(catalog).unwrap_or(Decimal::MAX)
    }

    /// 合計を計算する。桁あふれは検証エラー
    pub fn checked_total(&self, catalog: &[Product]) -> Result<Decimal, ValidationFailure> {
        money::checked_sum(
            self.items
                .iter()
                .map(|item| money::line_total(unit_price(catalog, &item.product_id), item.quantity)),
        )
        .ok_or_else(|| ValidationFailure::new(Field::Items, Rule::AmountOverflow))
    }

    /// 最初に違反したルールを返す
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        validation::required_text(&self.customer_name, Field::CustomerName, CUSTOMER_NAME_MAX)?;
        validation::email(&self.customer_email, Field::CustomerEmail, CUSTOMER_EMAIL_MAX)?;
        validation::optional_text(
            self.customer_phone.as_deref(),
            Field::CustomerPhone,
            CUSTOMER_PHONE_MAX,
        )?;
        if self.items.is_empty() {
            return Err(ValidationFailure::new(Field::Items, Rule::AtLeastOneItem));
        }
        if let Some(index) = self.items.iter().position(|item| item.quantity == 0) {
            return Err(ValidationFailure::new(Field::Quantity, Rule::MustBePositive).at(index));
        }
        if let Some(index) = self
            .items
            .iter()
            .position(|item| item.quantity > LINE_ITEM_QUANTITY_MAX)
        {
            return Err(ValidationFailure::new(
                Field::Quantity,
                Rule::MaxValue {
                    max: u64::from(LINE_ITEM_QUANTITY_MAX),
                },
            )
            .at(index));
        }
        Ok(())
    }

    /// 注文ヘッダー（フェーズ1で書き込む内容）
    pub fn order_header(&self, catalog: &[Product]) -> Result<NewOrder, ValidationFailure> {
        let total = self.checked_total(catalog)?;
        let customer_phone = match self.customer_phone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(phone) => Some(phone.to_string()),
        };
        Ok(NewOrder {
            customer_name: self.customer_name.trim().to_string(),
            customer_email: self.customer_email.trim().to_string(),
            customer_phone,
            status: self.status,
            total,
        })
    }

    /// 注文明細（フェーズ2で一括書き込みする内容）
    pub fn line_items_for(&self, order_id: &OrderId, catalog: &[Product]) -> Vec<NewOrderLineItem> {
        self.items
            .iter()
            .map(|item| NewOrderLineItem {
                order_id: order_id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
                unit_price: unit_price(catalog, &item.product_id),
            })
            .collect()
    }
}

fn parse_quantity(input: &str) -> Result<u32, DomainError> {
    let quantity = input
        .trim()
        .parse::<i64>()
        .map_err(|_| DomainError::InvalidQuantity(input.to_string()))?;
    if quantity <= 0 || quantity > i64::from(LINE_ITEM_QUANTITY_MAX) {
        return Err(DomainError::InvalidQuantity(input.to_string()));
    }
    u32::try_from(quantity).map_err(|_| DomainError::InvalidQuantity(input.to_string()))
}
