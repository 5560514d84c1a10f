//! DynamoDB のシングルテーブル設計によるストア実装
//!
//! - 商品・カテゴリ・注文はエンティティごとのパーティションに ULID のソートキーで格納
//! - カテゴリ名の一意性はガードアイテムを同一トランザクションで書き込んで保証
//! - 明細の一括挿入は注文ヘッダーの存在確認を含む単一トランザクション
//! - 読み取りのみ指数バックオフで再試行し、書き込みは再試行しない

use crate::dynamodb::DynamoDbClient;
use crate::models::{
    category_name_guard, DynamoDbItem, DynamoDbKeys, EntityType, CATEGORIES_PK,
    CATEGORY_SK_PREFIX, LINE_ITEM_SK_PREFIX, ORDERS_PK, ORDER_SK_PREFIX, PRODUCTS_PK,
    PRODUCT_SK_PREFIX,
};
use crate::ports::{
    CategoryStore, LineItemStore, ListOptions, OrderStore, ProductStore, SortOrder, StoreError,
};
use crate::retry::{retry_store_read, RetryConfig};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::types::{
    AttributeValue, ConditionCheck, Delete, Put, TransactWriteItem,
};
use chrono::Utc;
use domain::{
    Category, CategoryId, CategoryInput, LineItemId, NewOrder, NewOrderLineItem, Order, OrderId,
    OrderLineItem, OrderStatus, Product, ProductId, ProductInput,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use tracing::{debug, info};

/// TransactWriteItems の上限
pub const TRANSACTION_LIMIT: usize = 100;

/// 注文削除（ヘッダー + 明細）が1トランザクションに収まる明細数
pub const MAX_LINE_ITEMS_PER_ORDER: usize = TRANSACTION_LIMIT - 1;

fn build_error(error: BuildError) -> StoreError {
    StoreError::Rejected(format!("Invalid request: {error}"))
}

#[derive(Clone)]
pub struct DynamoDbStore {
    db: DynamoDbClient,
    retry: RetryConfig,
}

impl DynamoDbStore {
    pub fn new(db: DynamoDbClient, retry: RetryConfig) -> Self {
        Self { db, retry }
    }

    /// パーティション内のアイテムをページングしながら取得（`limit` 件で打ち切り）
    async fn query_all(
        &self,
        pk: &str,
        sk_prefix: &str,
        ascending: bool,
        limit: Option<usize>,
    ) -> Result<Vec<DynamoDbItem>, StoreError> {
        let mut items = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;

        loop {
            let output = self
                .db
                .client()
                .query()
                .table_name(self.db.table_name())
                .key_condition_expression("PK = :pk AND begins_with(SK, :sk)")
                .expression_attribute_values(":pk", AttributeValue::S(pk.to_string()))
                .expression_attribute_values(":sk", AttributeValue::S(sk_prefix.to_string()))
                .scan_index_forward(ascending)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| self.db.convert_error(e))?;

            for map in output.items.unwrap_or_default() {
                items.push(DynamoDbItem::from_attribute_map(&map)?);
            }

            let reached_limit = limit.is_some_and(|limit| items.len() >= limit);
            match output.last_evaluated_key {
                Some(key) if !reached_limit => start_key = Some(key),
                _ => break,
            }
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn list<T: DeserializeOwned>(
        &self,
        pk: &str,
        sk_prefix: &str,
        ascending: bool,
        limit: Option<usize>,
    ) -> Result<Vec<T>, StoreError> {
        let items = retry_store_read(
            || self.query_all(pk, sk_prefix, ascending, limit),
            &self.retry,
        )
        .await?;
        debug!(pk, count = items.len(), "クエリ完了");
        items.iter().map(DynamoDbItem::decode).collect()
    }

    async fn get<T: DeserializeOwned>(&self, keys: &DynamoDbKeys) -> Result<Option<T>, StoreError> {
        let output = retry_store_read(
            || async {
                self.db
                    .client()
                    .get_item()
                    .table_name(self.db.table_name())
                    .set_key(Some(keys.to_key_map()))
                    .send()
                    .await
                    .map_err(|e| self.db.convert_error(e))
            },
            &self.retry,
        )
        .await?;

        match output.item {
            Some(map) => Ok(Some(DynamoDbItem::from_attribute_map(&map)?.decode()?)),
            None => Ok(None),
        }
    }

    /// 新規作成（同じキーが存在すれば `Conflict`）
    async fn put_new(&self, item: &DynamoDbItem) -> Result<(), StoreError> {
        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item.to_attribute_map()))
            .condition_expression("attribute_not_exists(PK)")
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;
        Ok(())
    }

    /// 既存アイテムの上書き（存在しなければ `NotFound`）
    async fn put_existing(&self, item: &DynamoDbItem) -> Result<(), StoreError> {
        self.db
            .client()
            .put_item()
            .table_name(self.db.table_name())
            .set_item(Some(item.to_attribute_map()))
            .condition_expression("attribute_exists(PK)")
            .send()
            .await
            .map_err(|e| match self.db.convert_error(e) {
                StoreError::Conflict(_) => StoreError::NotFound(item.keys.sk.clone()),
                other => other,
            })?;
        Ok(())
    }

    async fn delete(&self, keys: &DynamoDbKeys) -> Result<(), StoreError> {
        self.db
            .client()
            .delete_item()
            .table_name(self.db.table_name())
            .set_key(Some(keys.to_key_map()))
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;
        Ok(())
    }

    async fn transact(&self, items: Vec<TransactWriteItem>) -> Result<(), StoreError> {
        if items.len() > TRANSACTION_LIMIT {
            return Err(StoreError::Rejected(format!(
                "Transaction too large: {} items (max {TRANSACTION_LIMIT})",
                items.len()
            )));
        }
        self.db
            .client()
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|e| self.db.convert_error(e))?;
        Ok(())
    }

    fn put_op(
        &self,
        item: HashMap<String, AttributeValue>,
        condition: Option<&str>,
    ) -> Result<TransactWriteItem, StoreError> {
        let put = Put::builder()
            .table_name(self.db.table_name())
            .set_item(Some(item))
            .set_condition_expression(condition.map(str::to_string))
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().put(put).build())
    }

    fn delete_op(&self, keys: &DynamoDbKeys) -> Result<TransactWriteItem, StoreError> {
        let delete = Delete::builder()
            .table_name(self.db.table_name())
            .set_key(Some(keys.to_key_map()))
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    fn exists_check(&self, keys: &DynamoDbKeys) -> Result<TransactWriteItem, StoreError> {
        let check = ConditionCheck::builder()
            .table_name(self.db.table_name())
            .set_key(Some(keys.to_key_map()))
            .condition_expression("attribute_exists(PK)")
            .build()
            .map_err(build_error)?;
        Ok(TransactWriteItem::builder().condition_check(check).build())
    }

    fn category_item(category: &Category) -> Result<DynamoDbItem, StoreError> {
        DynamoDbItem::encode(
            DynamoDbKeys::for_category(&category.id),
            EntityType::Category,
            category,
            category.created_at,
        )
    }
}

fn scan_forward(options: &ListOptions) -> bool {
    options.order == SortOrder::OldestFirst
}

#[async_trait]
impl ProductStore for DynamoDbStore {
    async fn list_products(&self, options: ListOptions) -> Result<Vec<Product>, StoreError> {
        self.list(PRODUCTS_PK, PRODUCT_SK_PREFIX, scan_forward(&options), options.limit)
            .await
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.get(&DynamoDbKeys::for_product(id)).await
    }

    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        let product = Product::from_input(ProductId::new(), input, Utc::now());
        let item = DynamoDbItem::encode(
            DynamoDbKeys::for_product(&product.id),
            EntityType::Product,
            &product,
            product.created_at,
        )?;
        self.put_new(&item).await?;
        info!(product_id = %product.id, "商品を作成しました");
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        input: ProductInput,
    ) -> Result<Product, StoreError> {
        let mut product: Product = self
            .get(&DynamoDbKeys::for_product(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product.apply(input);
        let item = DynamoDbItem::encode(
            DynamoDbKeys::for_product(id),
            EntityType::Product,
            &product,
            product.created_at,
        )?;
        self.put_existing(&item).await?;
        info!(product_id = %id, "商品を更新しました");
        Ok(product)
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), StoreError> {
        self.delete(&DynamoDbKeys::for_product(id)).await?;
        info!(product_id = %id, "商品を削除しました");
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for DynamoDbStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut categories: Vec<Category> =
            self.list(CATEGORIES_PK, CATEGORY_SK_PREFIX, true, None).await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        let category = Category::from_input(CategoryId::new(), input, Utc::now());
        let item = Self::category_item(&category)?;

        let ops = vec![
            self.put_op(item.to_attribute_map(), Some("attribute_not_exists(PK)"))?,
            self.put_op(
                category_name_guard(&category.name, &category.id),
                Some("attribute_not_exists(PK)"),
            )?,
        ];
        self.transact(ops).await.map_err(|e| match e {
            StoreError::Conflict(_) => StoreError::Conflict(category.name.clone()),
            other => other,
        })?;

        info!(category_id = %category.id, name = %category.name, "カテゴリを作成しました");
        Ok(category)
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        input: CategoryInput,
    ) -> Result<Category, StoreError> {
        let mut category: Category = self
            .get(&DynamoDbKeys::for_category(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("category {id}")))?;
        let previous_name = std::mem::replace(&mut category.name, input.name);
        category.description = input.description;
        let item = Self::category_item(&category)?;

        if previous_name == category.name {
            self.put_existing(&item).await?;
        } else {
            let ops = vec![
                self.put_op(item.to_attribute_map(), Some("attribute_exists(PK)"))?,
                self.delete_op(&DynamoDbKeys::for_category_name(&previous_name))?,
                self.put_op(
                    category_name_guard(&category.name, &category.id),
                    Some("attribute_not_exists(PK)"),
                )?,
            ];
            self.transact(ops).await.map_err(|e| match e {
                StoreError::Conflict(_) => StoreError::Conflict(category.name.clone()),
                other => other,
            })?;
        }

        info!(category_id = %id, "カテゴリを更新しました");
        Ok(category)
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError> {
        let category: Option<Category> = self.get(&DynamoDbKeys::for_category(id)).await?;
        let Some(category) = category else {
            return Ok(());
        };
        let ops = vec![
            self.delete_op(&DynamoDbKeys::for_category(id))?,
            self.delete_op(&DynamoDbKeys::for_category_name(&category.name))?,
        ];
        self.transact(ops).await?;
        info!(category_id = %id, "カテゴリを削除しました");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for DynamoDbStore {
    async fn list_orders(&self, options: ListOptions) -> Result<Vec<Order>, StoreError> {
        self.list(ORDERS_PK, ORDER_SK_PREFIX, scan_forward(&options), options.limit)
            .await
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.get(&DynamoDbKeys::for_order(id)).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let order = Order::from_new(OrderId::new(), order, Utc::now());
        let item = DynamoDbItem::encode(
            DynamoDbKeys::for_order(&order.id),
            EntityType::Order,
            &order,
            order.created_at,
        )?;
        self.put_new(&item).await?;
        info!(order_id = %order.id, total = %order.total, "注文ヘッダーを作成しました");
        Ok(order)
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        let mut order: Order = self
            .get(&DynamoDbKeys::for_order(id))
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        order.status = status;
        let item = DynamoDbItem::encode(
            DynamoDbKeys::for_order(id),
            EntityType::Order,
            &order,
            order.created_at,
        )?;
        self.put_existing(&item).await?;
        info!(order_id = %id, status = %status, "注文ステータスを更新しました");
        Ok(order)
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), StoreError> {
        let partition = DynamoDbKeys::line_item_partition(id);
        let line_items = retry_store_read(
            || self.query_all(&partition, LINE_ITEM_SK_PREFIX, true, None),
            &self.retry,
        )
        .await?;

        let mut ops = Vec::with_capacity(line_items.len() + 1);
        ops.push(self.delete_op(&DynamoDbKeys::for_order(id))?);
        for item in &line_items {
            ops.push(self.delete_op(&item.keys)?);
        }
        self.transact(ops).await?;
        info!(order_id = %id, line_items = line_items.len(), "注文を削除しました");
        Ok(())
    }
}

#[async_trait]
impl LineItemStore for DynamoDbStore {
    async fn list_line_items(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, StoreError> {
        let partition = DynamoDbKeys::line_item_partition(order_id);
        self.list(&partition, LINE_ITEM_SK_PREFIX, true, None).await
    }

    async fn insert_line_items(
        &self,
        items: Vec<NewOrderLineItem>,
    ) -> Result<Vec<OrderLineItem>, StoreError> {
        let Some(order_id) = items.first().map(|item| item.order_id.clone()) else {
            return Ok(Vec::new());
        };
        if items.iter().any(|item| item.order_id != order_id) {
            return Err(StoreError::Rejected(
                "line items must belong to a single order".to_string(),
            ));
        }
        if items.len() > MAX_LINE_ITEMS_PER_ORDER {
            return Err(StoreError::Rejected(format!(
                "too many line items: {} (max {MAX_LINE_ITEMS_PER_ORDER})",
                items.len()
            )));
        }

        let created_at = Utc::now();
        let inserted: Vec<OrderLineItem> = items
            .into_iter()
            .map(|item| OrderLineItem::from_new(LineItemId::new(), item))
            .collect();

        let mut ops = Vec::with_capacity(inserted.len() + 1);
        ops.push(self.exists_check(&DynamoDbKeys::for_order(&order_id))?);
        for (position, line_item) in inserted.iter().enumerate() {
            let item = DynamoDbItem::encode(
                DynamoDbKeys::for_line_item(&order_id, position, &line_item.id),
                EntityType::LineItem,
                line_item,
                created_at,
            )?;
            ops.push(self.put_op(item.to_attribute_map(), Some("attribute_not_exists(PK)"))?);
        }

        self.transact(ops).await.map_err(|e| match e {
            StoreError::Conflict(_) => {
                StoreError::Rejected(format!("order {order_id} does not exist"))
            }
            other => other,
        })?;

        info!(order_id = %order_id, count = inserted.len(), "注文明細を作成しました");
        Ok(inserted)
    }
}
