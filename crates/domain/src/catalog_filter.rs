//! 商品一覧の表示用フィルター
//!
//! 入力コレクションとフィルター状態だけから表示リストを導出する純粋関数。

use crate::product::Product;
use serde::{Deserialize, Serialize};

/// 価格ソート方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSort {
    /// 入力順（新しい順）を維持
    #[default]
    None,
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogFilter {
    pub search_text: String,
    /// 空文字は「全カテゴリ」
    pub category_name: String,
    pub price_sort: PriceSort,
}

impl CatalogFilter {
    pub fn new(
        search_text: impl Into<String>,
        category_name: impl Into<String>,
        price_sort: PriceSort,
    ) -> Self {
        Self {
            search_text: search_text.into(),
            category_name: category_name.into(),
            price_sort,
        }
    }

    /// 商品がフィルター条件を満たすか
    pub fn matches(&self, product: &Product) -> bool {
        let matches_search = product
            .name
            .to_lowercase()
            .contains(&self.search_text.to_lowercase());
        let matches_category = self.category_name.is_empty()
            || product.category.as_deref() == Some(self.category_name.as_str());
        matches_search && matches_category
    }

    /// フィルターとソートを適用した表示リストを返す
    pub fn apply(&self, products: &[Product]) -> Vec<Product> {
        let mut result: Vec<Product> = products
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();

        // sort_by は安定ソートなので同額の商品は入力順を保つ
        match self.price_sort {
            PriceSort::None => {}
            PriceSort::Ascending => result.sort_by(|a, b| a.price.cmp(&b.price)),
            PriceSort::Descending => result.sort_by(|a, b| b.price.cmp(&a.price)),
        }
        result
    }

    pub fn view(&self, products: &[Product]) -> CatalogView {
        CatalogView {
            products: self.apply(products),
            catalog_is_empty: products.is_empty(),
        }
    }
}

/// 一覧が空のときに表示する状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyState {
    /// 商品が1件も登録されていない
    NoProducts,
    /// 商品はあるが条件に一致しない
    NoMatches,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogView {
    pub products: Vec<Product>,
    pub catalog_is_empty: bool,
}

impl CatalogView {
    /// 空表示の種類は元のコレクションが空かどうかで判定する
    pub fn empty_state(&self) -> Option<EmptyState> {
        if self.catalog_is_empty {
            Some(EmptyState::NoProducts)
        } else if self.products.is_empty() {
            Some(EmptyState::NoMatches)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ProductId;
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(id: &str, name: &str, price: i64, category: Option<&str>) -> Product {
        Product {
            id: ProductId::from_string(id).unwrap(),
            name: name.to_string(),
            description: None,
            price: Decimal::new(price, 2),
            stock: 5,
            category: category.map(str::to_string),
            size: None,
            color: None,
            image_url: None,
            created_at: Utc::now(),
        }
    }

    fn catalog() -> Vec<Product> {
        vec![
            product("p1", "Camisa Azul", 5990, Some("Camisas")),
            product("p2", "Calça Preta", 8990, Some("Calças")),
            product("p3", "Camisa Verde", 5990, Some("Camisas")),
            product("p4", "Boné", 2990, None),
        ]
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let products = vec![
            product("a", "Camisa Azul", 100, None),
            product("b", "Calça Preta", 100, None),
        ];
        let filter = CatalogFilter::new("camisa", "", PriceSort::None);
        let result = filter.apply(&products);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name, "Camisa Azul");
    }

    #[test]
    fn test_default_filter_keeps_input_order() {
        let result = CatalogFilter::default().apply(&catalog());
        assert_eq!(ids(&result), vec!["p1", "p2", "p3", "p4"]);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let result = CatalogFilter::new("", "Camisas", PriceSort::None).apply(&catalog());
        assert_eq!(ids(&result), vec!["p1", "p3"]);

        let result = CatalogFilter::new("", "camisas", PriceSort::None).apply(&catalog());
        assert!(result.is_empty());
    }

    #[test]
    fn test_price_sort_is_stable() {
        let asc = CatalogFilter::new("", "", PriceSort::Ascending).apply(&catalog());
        // p1 と p3 は同額なので入力順のまま
        assert_eq!(ids(&asc), vec!["p4", "p1", "p3", "p2"]);

        let desc = CatalogFilter::new("", "", PriceSort::Descending).apply(&catalog());
        assert_eq!(ids(&desc), vec!["p2", "p1", "p3", "p4"]);
    }

    #[test]
    fn test_sorting_twice_is_idempotent() {
        for sort in [PriceSort::Ascending, PriceSort::Descending] {
            let filter = CatalogFilter::new("", "", sort);
            let once = filter.apply(&catalog());
            let twice = filter.apply(&once);
            assert_eq!(ids(&once), ids(&twice));
        }
    }

    #[test]
    fn test_result_is_subset_matching_predicate() {
        let filters = [
            CatalogFilter::new("ca", "", PriceSort::Ascending),
            CatalogFilter::new("CAMISA", "Camisas", PriceSort::Descending),
            CatalogFilter::new("zzz", "", PriceSort::None),
            CatalogFilter::new("", "Calças", PriceSort::None),
        ];
        let products = catalog();
        for filter in filters {
            let result = filter.apply(&products);
            assert!(result.len() <= products.len());
            for p in &result {
                assert!(products.contains(p));
                assert!(filter.matches(p));
            }
        }
    }

    #[test]
    fn test_empty_state_uses_original_collection() {
        let filter = CatalogFilter::new("zzz", "", PriceSort::None);
        assert_eq!(filter.view(&[]).empty_state(), Some(EmptyState::NoProducts));
        assert_eq!(
            filter.view(&catalog()).empty_state(),
            Some(EmptyState::NoMatches)
        );
        assert_eq!(CatalogFilter::default().view(&catalog()).empty_state(), None);
    }
}
