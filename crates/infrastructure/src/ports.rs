//! データストアと画像ストレージのポート
//!
//! アダプター（インメモリ、DynamoDB）は失敗を `StoreError` に変換して返す。
//! サービス層はそれを `AppError` の分類に写像する。

use async_trait::async_trait;
use domain::{
    Category, CategoryId, CategoryInput, NewOrder, NewOrderLineItem, Order, OrderId,
    OrderLineItem, OrderStatus, Product, ProductId, ProductInput,
};
use shared::AppError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// 一時的な障害（スロットリング、タイムアウト、接続失敗）
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// 一意制約違反
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// 保存済みレコードを復元できない
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    /// 書き込み失敗を利用者向けの分類に変換
    pub fn into_write_error(self, operation: &str) -> AppError {
        match self {
            StoreError::Conflict(message) => AppError::AlreadyExists(message),
            StoreError::NotFound(message) => AppError::NotFound(message),
            other => AppError::remote_write(operation, other),
        }
    }

    pub fn into_read_error(self, resource: &str) -> AppError {
        AppError::remote_read(resource, self)
    }
}

/// 一覧の並び順（作成日時）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub order: SortOrder,
    pub limit: Option<usize>,
}

impl ListOptions {
    pub fn newest(limit: usize) -> Self {
        Self {
            order: SortOrder::NewestFirst,
            limit: Some(limit),
        }
    }

    /// 作成順に並んだ一覧に並び順と件数制限を適用する
    pub fn apply<T>(&self, mut oldest_first: Vec<T>) -> Vec<T> {
        if self.order == SortOrder::NewestFirst {
            oldest_first.reverse();
        }
        if let Some(limit) = self.limit {
            oldest_first.truncate(limit);
        }
        oldest_first
    }
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self, options: ListOptions) -> Result<Vec<Product>, StoreError>;
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError>;
    async fn update_product(
        &self,
        id: &ProductId,
        input: ProductInput,
    ) -> Result<Product, StoreError>;
    /// 存在しない場合も成功
    async fn delete_product(&self, id: &ProductId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// 名前の昇順
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError>;
    /// 同名のカテゴリがあれば `Conflict`
    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError>;
    async fn update_category(
        &self,
        id: &CategoryId,
        input: CategoryInput,
    ) -> Result<Category, StoreError>;
    async fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn list_orders(&self, options: ListOptions) -> Result<Vec<Order>, StoreError>;
    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError>;
    /// IDと作成日時はストアが採番する
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, StoreError>;
    /// 注文の明細も合わせて削除する
    async fn delete_order(&self, id: &OrderId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait LineItemStore: Send + Sync {
    /// 挿入順
    async fn list_line_items(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, StoreError>;
    /// 一括挿入。一部だけが保存されることはない
    async fn insert_line_items(
        &self,
        items: Vec<NewOrderLineItem>,
    ) -> Result<Vec<OrderLineItem>, StoreError>;
}

#[async_trait]
pub trait ImageStorage: Send + Sync {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;
    fn public_url(&self, key: &str) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ErrorKind;

    #[test]
    fn test_list_options_apply() {
        let items = vec![1, 2, 3, 4];
        assert_eq!(ListOptions::default().apply(items.clone()), vec![4, 3, 2, 1]);
        assert_eq!(ListOptions::newest(2).apply(items.clone()), vec![4, 3]);
        let oldest = ListOptions {
            order: SortOrder::OldestFirst,
            limit: Some(3),
        };
        assert_eq!(oldest.apply(items), vec![1, 2, 3]);
    }

    #[test]
    fn test_error_mapping() {
        assert!(StoreError::Unavailable("throttled".into()).is_retryable());
        assert!(!StoreError::Rejected("bad".into()).is_retryable());

        let err = StoreError::Conflict("Camisas".into()).into_write_error("カテゴリの作成");
        assert_eq!(err, AppError::AlreadyExists("Camisas".into()));

        let err = StoreError::Unavailable("timeout".into()).into_write_error("注文の作成");
        assert_eq!(err.kind(), ErrorKind::RemoteWriteFailure);

        let err = StoreError::Corrupt("bad json".into()).into_read_error("商品");
        assert_eq!(err.kind(), ErrorKind::RemoteReadFailure);
    }
}
