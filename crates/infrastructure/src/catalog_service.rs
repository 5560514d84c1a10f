use crate::ports::{CategoryStore, ProductStore};
use crate::query_cache::{cached_categories, cached_products, QueryCache, QueryKey};
use domain::{
    CatalogFilter, CatalogView, Category, CategoryForm, CategoryId, Product, ProductForm,
    ProductId,
};
use shared::AppError;
use std::sync::Arc;
use tracing::info;

/// 商品とカテゴリの管理
pub struct CatalogService<S> {
    store: Arc<S>,
    cache: Arc<QueryCache>,
}

impl<S> CatalogService<S>
where
    S: ProductStore + CategoryStore,
{
    pub fn new(store: Arc<S>, cache: Arc<QueryCache>) -> Self {
        Self { store, cache }
    }

    /// 新しい順の全商品
    pub async fn products(&self) -> Result<Arc<Vec<Product>>, AppError> {
        cached_products(self.store.as_ref(), &self.cache).await
    }

    /// フィルターを適用した商品一覧
    pub async fn catalog_view(&self, filter: &CatalogFilter) -> Result<CatalogView, AppError> {
        let products = self.products().await?;
        Ok(filter.view(&products))
    }

    pub async fn product(&self, id: &ProductId) -> Result<Product, AppError> {
        self.store
            .get_product(id)
            .await
            .map_err(|e| e.into_read_error("商品"))?
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))
    }

    pub async fn create_product(&self, form: &ProductForm) -> Result<Product, AppError> {
        let input = form.validate()?;
        let product = self
            .store
            .insert_product(input)
            .await
            .map_err(|e| e.into_write_error("商品の作成"))?;
        info!(product_id = %product.id, name = %product.name, "商品を作成しました");
        self.cache.invalidate(&[QueryKey::Products]).await;
        Ok(product)
    }

    pub async fn update_product(
        &self,
        id: &ProductId,
        form: &ProductForm,
    ) -> Result<Product, AppError> {
        let input = form.validate()?;
        let product = self
            .store
            .update_product(id, input)
            .await
            .map_err(|e| e.into_write_error("商品の更新"))?;
        info!(product_id = %id, "商品を更新しました");
        self.cache.invalidate(&[QueryKey::Products]).await;
        Ok(product)
    }

    /// 既存の注文明細は商品IDをそのまま保持する
    pub async fn delete_product(&self, id: &ProductId) -> Result<(), AppError> {
        self.store
            .delete_product(id)
            .await
            .map_err(|e| e.into_write_error("商品の削除"))?;
        info!(product_id = %id, "商品を削除しました");
        self.cache.invalidate(&[QueryKey::Products]).await;
        Ok(())
    }

    /// 名前順の全カテゴリ
    pub async fn categories(&self) -> Result<Arc<Vec<Category>>, AppError> {
        cached_categories(self.store.as_ref(), &self.cache).await
    }

    /// カテゴリと、その名前を参照している商品数
    pub async fn categories_with_counts(&self) -> Result<Vec<(Category, usize)>, AppError> {
        let categories = self.categories().await?;
        let products = self.products().await?;
        Ok(categories
            .iter()
            .map(|category| (category.clone(), category.product_count(&products)))
            .collect())
    }

    pub async fn create_category(&self, form: &CategoryForm) -> Result<Category, AppError> {
        let input = form.validate()?;
        let category = self
            .store
            .insert_category(input)
            .await
            .map_err(|e| e.into_write_error("カテゴリの作成"))?;
        info!(category_id = %category.id, name = %category.name, "カテゴリを作成しました");
        self.cache.invalidate(&[QueryKey::Categories]).await;
        Ok(category)
    }

    /// 名前を変更しても商品のカテゴリ名は変わらない
    pub async fn update_category(
        &self,
        id: &CategoryId,
        form: &CategoryForm,
    ) -> Result<Category, AppError> {
        let input = form.validate()?;
        let category = self
            .store
            .update_category(id, input)
            .await
            .map_err(|e| e.into_write_error("カテゴリの更新"))?;
        info!(category_id = %id, "カテゴリを更新しました");
        self.cache.invalidate(&[QueryKey::Categories]).await;
        Ok(category)
    }

    /// 商品は削除しない
    pub async fn delete_category(&self, id: &CategoryId) -> Result<(), AppError> {
        self.store
            .delete_category(id)
            .await
            .map_err(|e| e.into_write_error("カテゴリの削除"))?;
        info!(category_id = %id, "カテゴリを削除しました");
        self.cache.invalidate(&[QueryKey::Categories]).await;
        Ok(())
    }
}
