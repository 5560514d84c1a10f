use crate::errors::DomainError;
use crate::ids::CategoryId;
use crate::product::Product;
use crate::validation::{self, Field};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CATEGORY_NAME_MAX: usize = 100;
pub const CATEGORY_DESCRIPTION_MAX: usize = 500;

/// カテゴリ（名前はストア側で一意）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn from_input(id: CategoryId, input: CategoryInput, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: input.name,
            description: input.description,
            created_at,
        }
    }

    /// このカテゴリ名を参照している商品数
    pub fn product_count(&self, products: &[Product]) -> usize {
        products
            .iter()
            .filter(|p| p.category.as_deref() == Some(self.name.as_str()))
            .count()
    }
}

/// 検証済みのカテゴリ入力
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<CategoryInput, DomainError> {
        let name = validation::required_text(&self.name, Field::CategoryName, CATEGORY_NAME_MAX)?;
        let description = validation::optional_text(
            Some(&self.description),
            Field::Description,
            CATEGORY_DESCRIPTION_MAX,
        )?;
        Ok(CategoryInput { name, description })
    }
}
