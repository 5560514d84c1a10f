//! ダッシュボードとレポート用の集計

use crate::errors::DomainError;
use crate::money;
use crate::order::Order;
use crate::product::{Product, StockLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// カテゴリ未設定の商品をまとめるラベル
pub const UNCATEGORIZED_LABEL: &str = "未分類";

/// ダッシュボードに表示する最近の商品数
pub const RECENT_PRODUCTS_LIMIT: usize = 5;

/// 在庫不足ランキングの件数
pub const LOW_STOCK_RANKING_LIMIT: usize = 5;

fn overflow(what: &str) -> DomainError {
    DomainError::AmountOverflow(what.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub low_stock_count: usize,
    /// Σ(価格 × 在庫数)
    pub stock_value: Decimal,
}

impl InventorySummary {
    pub fn from_products(products: &[Product], threshold: u32) -> Result<Self, DomainError> {
        Ok(Self {
            total_products: products.len(),
            low_stock_count: products
                .iter()
                .filter(|p| StockLevel::for_stock(p.stock, threshold).is_low())
                .count(),
            stock_value: money::checked_sum(products.iter().map(Product::stock_value))
                .ok_or_else(|| overflow("stock value"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub name: String,
    pub product_count: usize,
    pub stock_value: Decimal,
}

/// カテゴリ別の商品数と在庫金額（初出順）
pub fn category_breakdown(products: &[Product]) -> Result<Vec<CategoryBreakdown>, DomainError> {
    let mut breakdown: Vec<CategoryBreakdown> = Vec::new();
    for product in products {
        let name = product.category.as_deref().unwrap_or(UNCATEGORIZED_LABEL);
        let value = product
            .stock_value()
            .ok_or_else(|| overflow("category stock value"))?;
        match breakdown.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => {
                entry.product_count += 1;
                entry.stock_value = entry
                    .stock_value
                    .checked_add(value)
                    .ok_or_else(|| overflow("category stock value"))?;
            }
            None => breakdown.push(CategoryBreakdown {
                name: name.to_string(),
                product_count: 1,
                stock_value: value,
            }),
        }
    }
    Ok(breakdown)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockEntry {
    pub name: String,
    pub stock: u32,
}

/// 在庫の少ない順に上位 `limit` 件
pub fn low_stock_ranking(products: &[Product], threshold: u32, limit: usize) -> Vec<LowStockEntry> {
    let mut low: Vec<&Product> = products
        .iter()
        .filter(|p| StockLevel::for_stock(p.stock, threshold).is_low())
        .collect();
    low.sort_by_key(|p| p.stock);
    low.into_iter()
        .take(limit)
        .map(|p| LowStockEntry {
            name: p.name.clone(),
            stock: p.stock,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStats {
    pub total_orders: usize,
    pub total_revenue: Decimal,
}

impl OrderStats {
    pub fn from_orders(orders: &[Order]) -> Result<Self, DomainError> {
        Ok(Self {
            total_orders: orders.len(),
            total_revenue: money::checked_sum(orders.iter().map(|o| Some(o.total)))
                .ok_or_else(|| overflow("revenue"))?,
        })
    }
}

/// ダッシュボード表示内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub inventory: InventorySummary,
    /// 新しい順の最近の商品と在庫バッジ
    pub recent_products: Vec<(Product, StockLevel)>,
}

impl DashboardSummary {
    /// `products` は新しい順で渡すこと
    pub fn build(products: &[Product], threshold: u32) -> Result<Self, DomainError> {
        Ok(Self {
            inventory: InventorySummary::from_products(products, threshold)?,
            recent_products: products
                .iter()
                .take(RECENT_PRODUCTS_LIMIT)
                .map(|p| (p.clone(), p.stock_level(threshold)))
                .collect(),
        })
    }
}

/// レポート画面の表示内容
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReport {
    pub inventory: InventorySummary,
    pub categories: Vec<CategoryBreakdown>,
    pub low_stock: Vec<LowStockEntry>,
    pub orders: OrderStats,
}

impl StoreReport {
    pub fn build(
        products: &[Product],
        orders: &[Order],
        threshold: u32,
    ) -> Result<Self, DomainError> {
        Ok(Self {
            inventory: InventorySummary::from_products(products, threshold)?,
            categories: category_breakdown(products)?,
            low_stock: low_stock_ranking(products, threshold, LOW_STOCK_RANKING_LIMIT),
            orders: OrderStats::from_orders(orders)?,
        })
    }
}
