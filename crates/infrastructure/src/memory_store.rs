//! インメモリのストア実装
//!
//! ローカル実行とテストで使用する。障害注入（`fail_next`）と
//! 呼び出しの一時停止（`hold`）は `test-support` フィーチャーでのみ有効。

use crate::ports::{
    CategoryStore, ImageStorage, LineItemStore, ListOptions, OrderStore, ProductStore, StoreError,
};
use async_trait::async_trait;
use chrono::Utc;
use domain::{
    Category, CategoryId, CategoryInput, LineItemId, NewOrder, NewOrderLineItem, Order, OrderId,
    OrderLineItem, OrderStatus, Product, ProductId, ProductInput,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// 障害注入の対象となる操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    ListProducts,
    GetProduct,
    InsertProduct,
    UpdateProduct,
    DeleteProduct,
    ListCategories,
    InsertCategory,
    UpdateCategory,
    DeleteCategory,
    ListOrders,
    GetOrder,
    InsertOrder,
    UpdateOrderStatus,
    DeleteOrder,
    ListLineItems,
    InsertLineItems,
    PutObject,
}

#[cfg(any(test, feature = "test-support"))]
mod faults {
    use super::StoreOperation;
    use crate::ports::StoreError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::{Mutex, Notify};
    use tracing::debug;

    #[derive(Default)]
    struct Faults {
        failures: HashMap<StoreOperation, StoreError>,
        holds: HashMap<StoreOperation, Arc<Notify>>,
        calls: HashMap<StoreOperation, usize>,
    }

    #[derive(Clone, Default)]
    pub(super) struct FaultInjector {
        faults: Arc<Mutex<Faults>>,
    }

    impl FaultInjector {
        /// 呼び出しを記録し、注入された障害があれば返す
        pub(super) async fn enter(&self, op: StoreOperation) -> Result<(), StoreError> {
            let (failure, hold) = {
                let mut faults = self.faults.lock().await;
                *faults.calls.entry(op).or_insert(0) += 1;
                let failure = faults.failures.remove(&op);
                let hold = faults.holds.remove(&op);
                (failure, hold)
            };

            if let Some(hold) = hold {
                debug!(?op, "操作を一時停止中");
                hold.notified().await;
            }

            match failure {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }

        pub(super) async fn fail_next(&self, op: StoreOperation, error: StoreError) {
            self.faults.lock().await.failures.insert(op, error);
        }

        pub(super) async fn hold(&self, op: StoreOperation) -> Arc<Notify> {
            let notify = Arc::new(Notify::new());
            self.faults.lock().await.holds.insert(op, notify.clone());
            notify
        }

        pub(super) async fn call_count(&self, op: StoreOperation) -> usize {
            self.faults
                .lock()
                .await
                .calls
                .get(&op)
                .copied()
                .unwrap_or(0)
        }
    }
}

/// 障害注入が無効なビルドでは何もしない
#[cfg(not(any(test, feature = "test-support")))]
mod faults {
    use super::StoreOperation;
    use crate::ports::StoreError;

    #[derive(Clone, Default)]
    pub(super) struct FaultInjector;

    impl FaultInjector {
        #[inline]
        pub(super) async fn enter(&self, _op: StoreOperation) -> Result<(), StoreError> {
            Ok(())
        }
    }
}

use faults::FaultInjector;

#[derive(Default)]
struct Tables {
    // いずれも作成順
    products: Vec<Product>,
    categories: Vec<Category>,
    orders: Vec<Order>,
    line_items: Vec<OrderLineItem>,
}

#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    faults: FaultInjector,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 次の `op` の呼び出しを `error` で失敗させる
    #[cfg(any(test, feature = "test-support"))]
    pub async fn fail_next(&self, op: StoreOperation, error: StoreError) {
        self.faults.fail_next(op, error).await;
    }

    /// 次の `op` の呼び出しを、返された `Notify` に通知されるまで停止させる
    #[cfg(any(test, feature = "test-support"))]
    pub async fn hold(&self, op: StoreOperation) -> Arc<tokio::sync::Notify> {
        self.faults.hold(op).await
    }

    #[cfg(any(test, feature = "test-support"))]
    pub async fn call_count(&self, op: StoreOperation) -> usize {
        self.faults.call_count(op).await
    }
}

#[async_trait]
impl ProductStore for InMemoryStore {
    async fn list_products(&self, options: ListOptions) -> Result<Vec<Product>, StoreError> {
        self.faults.enter(StoreOperation::ListProducts).await?;
        let tables = self.tables.read().await;
        Ok(options.apply(tables.products.clone()))
    }

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        self.faults.enter(StoreOperation::GetProduct).await?;
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| &p.id == id).cloned())
    }

    async fn insert_product(&self, input: ProductInput) -> Result<Product, StoreError> {
        self.faults.enter(StoreOperation::InsertProduct).await?;
        let product = Product::from_input(ProductId::new(), input, Utc::now());
        self.tables.write().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &ProductId,
        input: ProductInput,
    ) -> Result<Product, StoreError> {
        self.faults.enter(StoreOperation::UpdateProduct).await?;
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
        product.apply(input);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &ProductId) -> Result<(), StoreError> {
        self.faults.enter(StoreOperation::DeleteProduct).await?;
        self.tables.write().await.products.retain(|p| &p.id != id);
        Ok(())
    }
}

#[async_trait]
impl CategoryStore for InMemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        self.faults.enter(StoreOperation::ListCategories).await?;
        let mut categories = self.tables.read().await.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn insert_category(&self, input: CategoryInput) -> Result<Category, StoreError> {
        self.faults.enter(StoreOperation::InsertCategory).await?;
        let mut tables = self.tables.write().await;
        if tables.categories.iter().any(|c| c.name == input.name) {
            return Err(StoreError::Conflict(input.name));
        }
        let category = Category::from_input(CategoryId::new(), input, Utc::now());
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: &CategoryId,
        input: CategoryInput,
    ) -> Result<Category, StoreError> {
        self.faults.enter(StoreOperation::UpdateCategory).await?;
        let mut tables = self.tables.write().await;
        if tables
            .categories
            .iter()
            .any(|c| &c.id != id && c.name == input.name)
        {
            return Err(StoreError::Conflict(input.name));
        }
        let category = tables
            .categories
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("category {id}")))?;
        category.name = input.name;
        category.description = input.description;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: &CategoryId) -> Result<(), StoreError> {
        self.faults.enter(StoreOperation::DeleteCategory).await?;
        self.tables.write().await.categories.retain(|c| &c.id != id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for InMemoryStore {
    async fn list_orders(&self, options: ListOptions) -> Result<Vec<Order>, StoreError> {
        self.faults.enter(StoreOperation::ListOrders).await?;
        let tables = self.tables.read().await;
        Ok(options.apply(tables.orders.clone()))
    }

    async fn get_order(&self, id: &OrderId) -> Result<Option<Order>, StoreError> {
        self.faults.enter(StoreOperation::GetOrder).await?;
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| &o.id == id).cloned())
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        self.faults.enter(StoreOperation::InsertOrder).await?;
        let order = Order::from_new(OrderId::new(), order, Utc::now());
        self.tables.write().await.orders.push(order.clone());
        Ok(order)
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, StoreError> {
        self.faults.enter(StoreOperation::UpdateOrderStatus).await?;
        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| &o.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        order.status = status;
        Ok(order.clone())
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), StoreError> {
        self.faults.enter(StoreOperation::DeleteOrder).await?;
        let mut tables = self.tables.write().await;
        tables.line_items.retain(|item| &item.order_id != id);
        tables.orders.retain(|o| &o.id != id);
        Ok(())
    }
}

#[async_trait]
impl LineItemStore for InMemoryStore {
    async fn list_line_items(&self, order_id: &OrderId) -> Result<Vec<OrderLineItem>, StoreError> {
        self.faults.enter(StoreOperation::ListLineItems).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .line_items
            .iter()
            .filter(|item| &item.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_line_items(
        &self,
        items: Vec<NewOrderLineItem>,
    ) -> Result<Vec<OrderLineItem>, StoreError> {
        self.faults.enter(StoreOperation::InsertLineItems).await?;
        let mut tables = self.tables.write().await;
        if let Some(missing) = items
            .iter()
            .find(|item| !tables.orders.iter().any(|o| o.id == item.order_id))
        {
            return Err(StoreError::Rejected(format!(
                "order {} does not exist",
                missing.order_id
            )));
        }
        let inserted: Vec<OrderLineItem> = items
            .into_iter()
            .map(|item| OrderLineItem::from_new(LineItemId::new(), item))
            .collect();
        tables.line_items.extend(inserted.iter().cloned());
        Ok(inserted)
    }
}

/// インメモリの画像ストレージ
#[derive(Clone)]
pub struct InMemoryImageStorage {
    base_url: String,
    objects: Arc<RwLock<HashMap<String, (String, Vec<u8>)>>>,
    faults: FaultInjector,
}

impl InMemoryImageStorage {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            faults: FaultInjector::default(),
        }
    }

    /// 保存済みオブジェクトの Content-Type とサイズ
    pub async fn object(&self, key: &str) -> Option<(String, usize)> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(content_type, bytes)| (content_type.clone(), bytes.len()))
    }

    #[cfg(any(test, feature = "test-support"))]
    pub async fn fail_next(&self, error: StoreError) {
        self.faults.fail_next(StoreOperation::PutObject, error).await;
    }

    #[cfg(any(test, feature = "test-support"))]
    pub async fn call_count(&self) -> usize {
        self.faults.call_count(StoreOperation::PutObject).await
    }
}

#[async_trait]
impl ImageStorage for InMemoryImageStorage {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.faults.enter(StoreOperation::PutObject).await?;
        let mut objects = self.objects.write().await;
        if objects.contains_key(key) {
            return Err(StoreError::Conflict(format!("object {key} already exists")));
        }
        objects.insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product_input(name: &str) -> ProductInput {
        ProductInput {
            name: name.to_string(),
            description: None,
            price: Decimal::new(1000, 2),
            stock: 5,
            category: None,
            size: None,
            color: None,
            image_url: None,
        }
    }

    fn new_order() -> NewOrder {
        NewOrder {
            customer_name: "Ana".to_string(),
            customer_email: "ana@x.com".to_string(),
            customer_phone: None,
            status: OrderStatus::Pending,
            total: Decimal::new(2000, 2),
        }
    }

    #[tokio::test]
    async fn test_products_listed_newest_first() {
        let store = InMemoryStore::new();
        store.insert_product(product_input("A")).await.unwrap();
        store.insert_product(product_input("B")).await.unwrap();
        store.insert_product(product_input("C")).await.unwrap();

        let names: Vec<String> = store
            .list_products(ListOptions::default())
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["C", "B", "A"]);

        let recent = store.list_products(ListOptions::newest(1)).await.unwrap();
        assert_eq!(recent[0].name, "C");
    }

    #[tokio::test]
    async fn test_category_name_is_unique() {
        let store = InMemoryStore::new();
        let input = CategoryInput {
            name: "Camisas".to_string(),
            description: None,
        };
        let camisas = store.insert_category(input.clone()).await.unwrap();
        assert_eq!(
            store.insert_category(input).await.unwrap_err(),
            StoreError::Conflict("Camisas".to_string())
        );

        let calcas = store
            .insert_category(CategoryInput {
                name: "Calças".to_string(),
                description: None,
            })
            .await
            .unwrap();
        // 自分自身の名前への更新は許可
        assert!(store
            .update_category(
                &camisas.id,
                CategoryInput {
                    name: "Camisas".to_string(),
                    description: Some("Manga curta".to_string()),
                }
            )
            .await
            .is_ok());
        assert!(matches!(
            store
                .update_category(
                    &calcas.id,
                    CategoryInput {
                        name: "Camisas".to_string(),
                        description: None,
                    }
                )
                .await,
            Err(StoreError::Conflict(_))
        ));

        let names: Vec<String> = store
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Calças", "Camisas"]);
    }

    #[tokio::test]
    async fn test_delete_order_cascades_to_line_items() {
        let store = InMemoryStore::new();
        let order = store.insert_order(new_order()).await.unwrap();
        let product_id = ProductId::new();
        store
            .insert_line_items(vec![NewOrderLineItem {
                order_id: order.id.clone(),
                product_id,
                quantity: 2,
                unit_price: Decimal::new(1000, 2),
            }])
            .await
            .unwrap();
        assert_eq!(store.list_line_items(&order.id).await.unwrap().len(), 1);

        store.delete_order(&order.id).await.unwrap();
        assert!(store.get_order(&order.id).await.unwrap().is_none());
        assert!(store.list_line_items(&order.id).await.unwrap().is_empty());

        // 削除は冪等
        assert!(store.delete_order(&order.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_line_items_require_existing_order() {
        let store = InMemoryStore::new();
        let result = store
            .insert_line_items(vec![NewOrderLineItem {
                order_id: OrderId::new(),
                product_id: ProductId::new(),
                quantity: 1,
                unit_price: Decimal::ONE,
            }])
            .await;
        assert!(matches!(result, Err(StoreError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let store = InMemoryStore::new();
        store
            .fail_next(
                StoreOperation::InsertOrder,
                StoreError::Unavailable("down".to_string()),
            )
            .await;

        assert!(store.insert_order(new_order()).await.is_err());
        assert!(store.insert_order(new_order()).await.is_ok());
        assert_eq!(store.call_count(StoreOperation::InsertOrder).await, 2);
        assert_eq!(
            store.list_orders(ListOptions::default()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_image_storage_public_url() {
        let storage = InMemoryImageStorage::new("http://localhost:9000/product-images/");
        storage
            .put_object("abc.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(
            storage.public_url("abc.png"),
            "http://localhost:9000/product-images/abc.png"
        );
        assert_eq!(
            storage.object("abc.png").await,
            Some(("image/png".to_string(), 3))
        );
    }
}
