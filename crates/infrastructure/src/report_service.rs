use crate::ports::{OrderStore, ProductStore};
use crate::query_cache::{cached_orders, cached_products, QueryCache};
use domain::{DashboardSummary, StoreReport};
use shared::{AppError, Config};
use std::sync::Arc;
use tracing::debug;

/// ダッシュボードとレポートの集計
pub struct ReportService<S> {
    store: Arc<S>,
    cache: Arc<QueryCache>,
    low_stock_threshold: u32,
}

impl<S> ReportService<S>
where
    S: ProductStore + OrderStore,
{
    pub fn new(store: Arc<S>, cache: Arc<QueryCache>, config: &Config) -> Self {
        Self {
            store,
            cache,
            low_stock_threshold: config.low_stock_threshold,
        }
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, AppError> {
        let products = cached_products(self.store.as_ref(), &self.cache).await?;
        let summary = DashboardSummary::build(&products, self.low_stock_threshold)?;
        debug!(
            total_products = summary.inventory.total_products,
            low_stock = summary.inventory.low_stock_count,
            "ダッシュボードを集計しました"
        );
        Ok(summary)
    }

    pub async fn store_report(&self) -> Result<StoreReport, AppError> {
        let products = cached_products(self.store.as_ref(), &self.cache).await?;
        let orders = cached_orders(self.store.as_ref(), &self.cache).await?;
        Ok(StoreReport::build(&products, &orders, self.low_stock_threshold)?)
    }
}
