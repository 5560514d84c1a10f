use crate::catalog_service::CatalogService;
use crate::dynamodb::DynamoDbClient;
use crate::dynamodb_store::DynamoDbStore;
use crate::image_upload::ImageUploadService;
use crate::memory_store::{InMemoryImageStorage, InMemoryStore};
use crate::order_service::OrderService;
use crate::ports::{CategoryStore, ImageStorage, LineItemStore, OrderStore, ProductStore};
use crate::query_cache::QueryCache;
use crate::report_service::ReportService;
use crate::retry::RetryConfig;
use shared::{Config, StoreBackend};
use std::sync::Arc;
use tracing::info;

/// 管理画面が使用するサービス一式。すべて同じキャッシュを共有する
pub struct AdminServices<S> {
    pub catalog: CatalogService<S>,
    pub orders: OrderService<S>,
    pub reports: ReportService<S>,
    pub images: ImageUploadService<dyn ImageStorage>,
    pub cache: Arc<QueryCache>,
}

impl<S> AdminServices<S>
where
    S: ProductStore + CategoryStore + OrderStore + LineItemStore,
{
    pub fn new(store: Arc<S>, images: Arc<dyn ImageStorage>, config: &Config) -> Self {
        let cache = Arc::new(QueryCache::new());
        Self {
            catalog: CatalogService::new(store.clone(), cache.clone()),
            orders: OrderService::new(store.clone(), cache.clone(), config),
            reports: ReportService::new(store, cache.clone(), config),
            images: ImageUploadService::new(images),
            cache,
        }
    }
}

/// 設定で選択されたストアのサービス
pub enum Backend {
    Memory(AdminServices<InMemoryStore>),
    DynamoDb(AdminServices<DynamoDbStore>),
}

impl Backend {
    pub async fn from_config(config: &Config) -> Self {
        let images: Arc<dyn ImageStorage> =
            Arc::new(InMemoryImageStorage::new(config.image_public_base_url.clone()));

        match config.store_backend {
            StoreBackend::Memory => {
                info!("インメモリストアを使用します");
                Backend::Memory(AdminServices::new(
                    Arc::new(InMemoryStore::new()),
                    images,
                    config,
                ))
            }
            StoreBackend::DynamoDb => {
                info!(table = %config.dynamodb_table, "DynamoDB ストアを使用します");
                let client = DynamoDbClient::new(config).await;
                let store = DynamoDbStore::new(client, RetryConfig::from_config(config));
                Backend::DynamoDb(AdminServices::new(Arc::new(store), images, config))
            }
        }
    }
}
