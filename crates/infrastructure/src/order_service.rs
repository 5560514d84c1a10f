//! 注文の作成と管理
//!
//! 作成は二段階の書き込みで行う。
//! 1. 注文ヘッダーを書き込み、ストアが採番したIDを受け取る
//! 2. そのIDを持つ明細を一括で書き込む
//!
//! フェーズ2が失敗した場合の扱いは `LineItemFailurePolicy` で決まる。

use crate::ports::{LineItemStore, OrderStore, ProductStore, StoreError};
use crate::query_cache::{cached_orders, cached_products, QueryCache, QueryKey};
use domain::{Order, OrderDetails, OrderDraft, OrderId, OrderStatus, Product, StatusTransitionPolicy};
use shared::{AppError, Config, LineItemFailurePolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// 書き込み中フラグ。drop で解除される
struct SubmissionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SubmissionGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AppError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AppError::SubmissionInProgress)?;
        Ok(Self { flag })
    }
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct OrderService<S> {
    store: Arc<S>,
    cache: Arc<QueryCache>,
    line_item_failure: LineItemFailurePolicy,
    transitions: StatusTransitionPolicy,
    submitting: AtomicBool,
}

impl<S> OrderService<S>
where
    S: OrderStore + LineItemStore + ProductStore,
{
    pub fn new(store: Arc<S>, cache: Arc<QueryCache>, config: &Config) -> Self {
        Self::with_policies(
            store,
            cache,
            config.line_item_failure_policy,
            config.status_transition_policy,
        )
    }

    pub fn with_policies(
        store: Arc<S>,
        cache: Arc<QueryCache>,
        line_item_failure: LineItemFailurePolicy,
        transitions: StatusTransitionPolicy,
    ) -> Self {
        Self {
            store,
            cache,
            line_item_failure,
            transitions,
            submitting: AtomicBool::new(false),
        }
    }

    /// 送信ボタンを無効化すべきか
    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// ドラフトを検証して注文を作成する。
    /// 失敗してもドラフトは変更されない
    pub async fn submit(&self, draft: &OrderDraft, catalog: &[Product]) -> Result<Order, AppError> {
        // 検証エラーの場合は通信しない
        draft.validate()?;
        let header = draft.order_header(catalog)?;
        let _guard = SubmissionGuard::acquire(&self.submitting)?;

        let order = self.store.insert_order(header).await.map_err(|e| {
            error!(error = %e, "注文ヘッダーの作成に失敗しました");
            AppError::remote_write("注文の作成", e)
        })?;
        info!(order_id = %order.id, total = %order.total, "注文ヘッダーを作成しました");

        let items = draft.line_items_for(&order.id, catalog);
        let count = items.len();
        if let Err(e) = self.store.insert_line_items(items).await {
            return Err(self.recover_line_item_failure(&order, e).await);
        }
        info!(order_id = %order.id, count, "注文明細を作成しました");

        self.cache
            .invalidate(&[QueryKey::Orders, QueryKey::Products])
            .await;
        Ok(order)
    }

    async fn recover_line_item_failure(&self, order: &Order, cause: StoreError) -> AppError {
        error!(order_id = %order.id, error = %cause, "注文明細の作成に失敗しました");

        let orphaned_order_id = match self.line_item_failure {
            LineItemFailurePolicy::LeaveHeader => {
                warn!(order_id = %order.id, "明細のない注文ヘッダーが残っています");
                Some(order.id.to_string())
            }
            LineItemFailurePolicy::Compensate => match self.store.delete_order(&order.id).await {
                Ok(()) => {
                    info!(order_id = %order.id, "補償として注文ヘッダーを削除しました");
                    None
                }
                Err(e) => {
                    error!(order_id = %order.id, error = %e, "注文ヘッダーの削除に失敗しました");
                    Some(order.id.to_string())
                }
            },
        };

        // 残ったヘッダーが一覧に表示されるように再取得させる
        self.cache.invalidate(&[QueryKey::Orders]).await;

        AppError::RemoteWrite {
            operation: "注文明細の作成".to_string(),
            message: cause.to_string(),
            orphaned_order_id,
        }
    }

    /// 新しい順の注文一覧
    pub async fn list_orders(&self) -> Result<Arc<Vec<Order>>, AppError> {
        cached_orders(self.store.as_ref(), &self.cache).await
    }

    /// 注文と明細。削除済みの商品は `product: None` になる
    pub async fn order_details(&self, id: &OrderId) -> Result<OrderDetails, AppError> {
        let order = self
            .store
            .get_order(id)
            .await
            .map_err(|e| e.into_read_error("注文"))?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
        let items = self
            .store
            .list_line_items(id)
            .await
            .map_err(|e| e.into_read_error("注文明細"))?;
        let products = cached_products(self.store.as_ref(), &self.cache).await?;

        let details = OrderDetails::new(order, items, &products);
        if !details.is_consistent() {
            warn!(order_id = %id, "注文の合計と明細の合計が一致しません");
        }
        Ok(details)
    }

    pub async fn update_status(&self, id: &OrderId, status: OrderStatus) -> Result<Order, AppError> {
        let current = self
            .store
            .get_order(id)
            .await
            .map_err(|e| e.into_read_error("注文"))?
            .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
        self.transitions.check(current.status, status)?;

        let order = self
            .store
            .update_order_status(id, status)
            .await
            .map_err(|e| e.into_write_error("ステータスの更新"))?;
        info!(order_id = %id, from = %current.status, to = %status, "注文ステータスを変更しました");

        self.cache.invalidate(&[QueryKey::Orders]).await;
        Ok(order)
    }

    /// 注文と明細を削除する
    pub async fn delete_order(&self, id: &OrderId) -> Result<(), AppError> {
        self.store
            .delete_order(id)
            .await
            .map_err(|e| e.into_write_error("注文の削除"))?;
        info!(order_id = %id, "注文を削除しました");

        self.cache.invalidate(&[QueryKey::Orders]).await;
        Ok(())
    }
}
