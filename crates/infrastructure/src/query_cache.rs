use crate::ports::{CategoryStore, ListOptions, OrderStore, ProductStore};
use domain::{Category, Order, Product};
use shared::AppError;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// キャッシュ対象の読み取り
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Products,
    Categories,
    Orders,
}

type Slot<T> = RwLock<Option<Arc<Vec<T>>>>;

/// 一覧読み取りのキャッシュ
///
/// 書き込みが成功したら関連するキーを `invalidate` し、
/// 次の読み取りで再取得させる。
#[derive(Default)]
pub struct QueryCache {
    products: Slot<Product>,
    categories: Slot<Category>,
    orders: Slot<Order>,
}

/// キャッシュがあれば返し、無ければ `load` の結果を格納する。
/// 読み込み中は書き込みロックを保持するので同じキーの取得は一度にまとまる
async fn get_or_load<T, F, Fut>(slot: &Slot<T>, key: QueryKey, load: F) -> Result<Arc<Vec<T>>, AppError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, AppError>>,
{
    if let Some(cached) = slot.read().await.as_ref() {
        debug!(?key, "キャッシュヒット");
        return Ok(cached.clone());
    }

    let mut guard = slot.write().await;
    if let Some(cached) = guard.as_ref() {
        return Ok(cached.clone());
    }
    debug!(?key, "キャッシュミス。再取得します");
    let loaded = Arc::new(load().await?);
    *guard = Some(loaded.clone());
    Ok(loaded)
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn products<F, Fut>(&self, load: F) -> Result<Arc<Vec<Product>>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Product>, AppError>>,
    {
        get_or_load(&self.products, QueryKey::Products, load).await
    }

    pub async fn categories<F, Fut>(&self, load: F) -> Result<Arc<Vec<Category>>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Category>, AppError>>,
    {
        get_or_load(&self.categories, QueryKey::Categories, load).await
    }

    pub async fn orders<F, Fut>(&self, load: F) -> Result<Arc<Vec<Order>>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Order>, AppError>>,
    {
        get_or_load(&self.orders, QueryKey::Orders, load).await
    }

    pub async fn invalidate(&self, keys: &[QueryKey]) {
        for key in keys {
            match key {
                QueryKey::Products => *self.products.write().await = None,
                QueryKey::Categories => *self.categories.write().await = None,
                QueryKey::Orders => *self.orders.write().await = None,
            }
        }
        debug!(?keys, "キャッシュを無効化しました");
    }

    pub async fn is_cached(&self, key: QueryKey) -> bool {
        match key {
            QueryKey::Products => self.products.read().await.is_some(),
            QueryKey::Categories => self.categories.read().await.is_some(),
            QueryKey::Orders => self.orders.read().await.is_some(),
        }
    }
}

/// 新しい順の全商品（キャッシュ経由）
pub async fn cached_products<S>(store: &S, cache: &QueryCache) -> Result<Arc<Vec<Product>>, AppError>
where
    S: ProductStore + ?Sized,
{
    cache
        .products(|| async {
            store
                .list_products(ListOptions::default())
                .await
                .map_err(|e| e.into_read_error("商品"))
        })
        .await
}

/// 名前順の全カテゴリ（キャッシュ経由）
pub async fn cached_categories<S>(
    store: &S,
    cache: &QueryCache,
) -> Result<Arc<Vec<Category>>, AppError>
where
    S: CategoryStore + ?Sized,
{
    cache
        .categories(|| async {
            store
                .list_categories()
                .await
                .map_err(|e| e.into_read_error("カテゴリ"))
        })
        .await
}

/// 新しい順の全注文（キャッシュ経由）
pub async fn cached_orders<S>(store: &S, cache: &QueryCache) -> Result<Arc<Vec<Order>>, AppError>
where
    S: OrderStore + ?Sized,
{
    cache
        .orders(|| async {
            store
                .list_orders(ListOptions::default())
                .await
                .map_err(|e| e.into_read_error("注文"))
        })
        .await
}
