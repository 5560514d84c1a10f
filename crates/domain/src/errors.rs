use crate::validation::ValidationFailure;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("Invalid ProductId: {0}")]
    InvalidProductId(String),

    #[error("Invalid CategoryId: {0}")]
    InvalidCategoryId(String),

    #[error("Invalid OrderId: {0}")]
    InvalidOrderId(String),

    #[error("Invalid LineItemId: {0}")]
    InvalidLineItemId(String),

    #[error("Invalid order status: {0}")]
    InvalidOrderStatus(String),

    #[error("Status transition not allowed: {from} -> {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("Line item index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// 集計中の金額が表現できる範囲を超えた
    #[error("Amount overflow in {0}")]
    AmountOverflow(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),

    #[error("Image too large: {size} bytes (max {max})")]
    ImageTooLarge { size: usize, max: usize },
}

impl DomainError {
    /// 入力検証エラーの場合は詳細を返す
    pub fn as_validation(&self) -> Option<&ValidationFailure> {
        match self {
            DomainError::Validation(failure) => Some(failure),
            _ => None,
        }
    }

    /// 画像アップロードの事前チェックで発生するエラーかどうか
    pub fn is_upload_rejection(&self) -> bool {
        matches!(
            self,
            DomainError::UnsupportedImageType(_) | DomainError::ImageTooLarge { .. }
        )
    }
}
