use crate::errors::DomainError;
use crate::ids::ProductId;
use crate::money;
use crate::validation::{self, Field, Rule, ValidationFailure};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 在庫が少ないと判定するデフォルトの閾値
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

pub const PRODUCT_NAME_MAX: usize = 200;
pub const PRODUCT_DESCRIPTION_MAX: usize = 1000;
pub const PRODUCT_CATEGORY_MAX: usize = 100;
pub const PRODUCT_SIZE_MAX: usize = 50;
pub const PRODUCT_COLOR_MAX: usize = 50;

/// 価格の上限と小数点以下の桁数
pub const PRODUCT_PRICE_MAX: u64 = 1_000_000;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const PRODUCT_STOCK_MAX: u32 = 1_000_000;

/// 商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    /// カテゴリ名への弱参照
    pub category: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// ストアが採番したIDと作成日時で商品を組み立てる
    pub fn from_input(id: ProductId, input: ProductInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            price: input.price,
            stock: input.stock,
            category: input.category,
            size: input.size,
            color: input.color,
            image_url: input.image_url,
            created_at,
        }
    }

    /// 編集内容を反映する（ID と作成日時は変わらない）
    pub fn apply(&mut self, input: ProductInput) {
        self.name = input.name;
        self.description = input.description;
        self.price = input.price;
        self.stock = input.stock;
        self.category = input.category;
        self.size = input.size;
        self.color = input.color;
        self.image_url = input.image_url;
    }

    /// 在庫金額（価格 × 在庫数）。桁あふれの場合は `None`
    pub fn stock_value(&self) -> Option<Decimal> {
        money::line_total(self.price, self.stock)
    }

    pub fn stock_level(&self, threshold: u32) -> StockLevel {
        StockLevel::for_stock(self.stock, threshold)
    }
}

/// 在庫バッジ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    Low,
    Healthy,
}

impl StockLevel {
    pub fn for_stock(stock: u32, threshold: u32) -> Self {
        if stock < threshold {
            StockLevel::Low
        } else {
            StockLevel::Healthy
        }
    }

    pub fn is_low(&self) -> bool {
        matches!(self, StockLevel::Low)
    }
}

/// 検証済みの商品入力
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: u32,
    pub category: Option<String>,
    pub size: Option<String>,
    pub color: Option<String>,
    pub image_url: Option<String>,
}

/// 商品フォーム（オペレーターが入力したままの値）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    pub price: String,
    pub stock: String,
    pub category: String,
    pub size: String,
    pub color: String,
    pub image_url: String,
}

impl ProductForm {
    /// 既存の商品から編集用フォームを作成
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone().unwrap_or_default(),
            price: product.price.to_string(),
            stock: product.stock.to_string(),
            category: product.category.clone().unwrap_or_default(),
            size: product.size.clone().unwrap_or_default(),
            color: product.color.clone().unwrap_or_default(),
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }

    /// フォームを検証し、最初に違反したルールを返す
    pub fn validate(&self) -> Result<ProductInput, DomainError> {
        let name = validation::required_text(&self.name, Field::ProductName, PRODUCT_NAME_MAX)?;
        let description = validation::optional_text(
            Some(&self.description),
            Field::Description,
            PRODUCT_DESCRIPTION_MAX,
        )?;
        let price = parse_price(&self.price)?;
        let stock = parse_stock(&self.stock)?;
        let category =
            validation::optional_text(Some(&self.category), Field::Category, PRODUCT_CATEGORY_MAX)?;
        let size = validation::optional_text(Some(&self.size), Field::Size, PRODUCT_SIZE_MAX)?;
        let color = validation::optional_text(Some(&self.color), Field::Color, PRODUCT_COLOR_MAX)?;
        let image_url = match self.image_url.trim() {
            "" => None,
            url => Some(url.to_string()),
        };

        Ok(ProductInput {
            name,
            description,
            price,
            stock,
            category,
            size,
            color,
            image_url,
        })
    }
}

fn parse_price(raw: &str) -> Result<Decimal, ValidationFailure> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationFailure::new(Field::Price, Rule::Required));
    }
    let price = Decimal::from_str(raw)
        .map_err(|_| ValidationFailure::new(Field::Price, Rule::NotANumber))?;
    if price <= Decimal::ZERO {
        return Err(ValidationFailure::new(Field::Price, Rule::MustBePositive));
    }
    if price > Decimal::from(PRODUCT_PRICE_MAX) {
        return Err(ValidationFailure::new(
            Field::Price,
            Rule::MaxValue {
                max: PRODUCT_PRICE_MAX,
            },
        ));
    }
    if price.normalize().scale() > PRICE_DECIMAL_PLACES {
        return Err(ValidationFailure::new(
            Field::Price,
            Rule::MaxDecimalPlaces {
                max: PRICE_DECIMAL_PLACES,
            },
        ));
    }
    Ok(price)
}

fn parse_stock(raw: &str) -> Result<u32, ValidationFailure> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationFailure::new(Field::Stock, Rule::Required));
    }
    let stock = raw
        .parse::<i64>()
        .map_err(|_| ValidationFailure::new(Field::Stock, Rule::NotAnInteger))?;
    if stock < 0 {
        return Err(ValidationFailure::new(Field::Stock, Rule::MustNotBeNegative));
    }
    if stock > i64::from(PRODUCT_STOCK_MAX) {
        return Err(ValidationFailure::new(
            Field::Stock,
            Rule::MaxValue {
                max: u64::from(PRODUCT_STOCK_MAX),
            },
        ));
    }
    u32::try_from(stock).map_err(|_| ValidationFailure::new(Field::Stock, Rule::NotAnInteger))
}
