use crate::auth::AuthError;
use domain::{DomainError, Field, Rule, ValidationFailure};
use thiserror::Error;

/// アプリケーション全体で使用される包括的なエラー型
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    // ドメインエラー（入力検証を含む）
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    // リモートストアへの書き込み失敗
    #[error("Remote write failed during {operation}: {message}")]
    RemoteWrite {
        operation: String,
        message: String,
        /// 明細を持たないまま残った注文ヘッダー
        orphaned_order_id: Option<String>,
    },

    // リモートストアからの読み取り失敗
    #[error("Remote read failed for {resource}: {message}")]
    RemoteRead { resource: String, message: String },

    // 画像ストレージへの書き込み失敗
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // 認証エラー
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    // 同じ書き込みが処理中
    #[error("Another submission is already in progress")]
    SubmissionInProgress,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        AppError::Domain(DomainError::Validation(failure))
    }
}

/// エラーの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 利用者が修正できる入力エラー（インライン表示、ドラフト保持）
    ValidationFailure,
    /// ストアが書き込みを拒否（通知表示、ドラフト保持、自動リトライなし）
    RemoteWriteFailure,
    /// 一覧などの取得失敗（空/エラー表示）
    RemoteReadFailure,
    /// 画像の形式・サイズ不正、またはストレージの拒否
    UploadFailure,
    AuthFailure,
    /// 書き込み処理中の重複操作
    Busy,
    Configuration,
}

impl AppError {
    pub fn remote_write(operation: impl Into<String>, message: impl ToString) -> Self {
        AppError::RemoteWrite {
            operation: operation.into(),
            message: message.to_string(),
            orphaned_order_id: None,
        }
    }

    pub fn remote_read(resource: impl Into<String>, message: impl ToString) -> Self {
        AppError::RemoteRead {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Domain(e) if e.is_upload_rejection() => ErrorKind::UploadFailure,
            AppError::Domain(_) => ErrorKind::ValidationFailure,
            AppError::RemoteWrite { .. } | AppError::AlreadyExists(_) | AppError::NotFound(_) => {
                ErrorKind::RemoteWriteFailure
            }
            AppError::RemoteRead { .. } => ErrorKind::RemoteReadFailure,
            AppError::Upload(_) => ErrorKind::UploadFailure,
            AppError::Auth(_) => ErrorKind::AuthFailure,
            AppError::SubmissionInProgress => ErrorKind::Busy,
            AppError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// 失敗してもドラフトやフォームの内容は保持される
    pub fn preserves_draft(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ValidationFailure | ErrorKind::RemoteWriteFailure | ErrorKind::Busy
        )
    }

    pub fn orphaned_order_id(&self) -> Option<&str> {
        match self {
            AppError::RemoteWrite {
                orphaned_order_id, ..
            } => orphaned_order_id.as_deref(),
            _ => None,
        }
    }

    /// ユーザー向けメッセージを取得
    pub fn user_message(&self) -> String {
        match self {
            AppError::Domain(DomainError::Validation(failure)) => validation_message(failure),
            AppError::Domain(DomainError::UnsupportedImageType(_)) => {
                "画像形式が無効です。JPG、PNG、WEBP を使用してください".to_string()
            }
            AppError::Domain(DomainError::ImageTooLarge { .. }) => {
                "画像が大きすぎます。最大 5MB までです".to_string()
            }
            AppError::Domain(DomainError::InvalidQuantity(_)) => {
                "数量は1以上の整数で入力してください".to_string()
            }
            AppError::Domain(DomainError::InvalidStatusTransition { .. }) => {
                "このステータスには変更できません".to_string()
            }
            AppError::Domain(DomainError::AmountOverflow(_)) => {
                "金額が大きすぎて集計できません".to_string()
            }
            AppError::Domain(_) => "入力データが無効です".to_string(),
            AppError::RemoteWrite {
                orphaned_order_id: Some(id),
                ..
            } => format!("注文明細の保存に失敗しました。注文 {id} は明細なしで残っています"),
            AppError::RemoteWrite { operation, .. } => format!("{operation}に失敗しました"),
            AppError::RemoteRead { resource, .. } => format!("{resource}の読み込みに失敗しました"),
            AppError::Upload(_) => "画像のアップロードに失敗しました".to_string(),
            AppError::AlreadyExists(_) => "同じ名前のカテゴリが既に存在します".to_string(),
            AppError::NotFound(_) => "リソースが見つかりません".to_string(),
            AppError::Auth(AuthError::InvalidCredentials) => {
                "メールアドレスまたはパスワードが正しくありません".to_string()
            }
            AppError::Auth(AuthError::AlreadyRegistered) => {
                "このメールアドレスは既に登録されています".to_string()
            }
            AppError::Auth(AuthError::Provider(message)) => message.clone(),
            AppError::SubmissionInProgress => "処理中です。しばらくお待ちください".to_string(),
            AppError::Configuration(_) => "予期しないエラーが発生しました".to_string(),
        }
    }
}

fn validation_message(failure: &ValidationFailure) -> String {
    match (&failure.field, &failure.rule) {
        (Field::Items, Rule::AtLeastOneItem) => "商品を1つ以上追加してください".to_string(),
        (_, Rule::Required) => format!("{}は必須です", field_label(failure.field)),
        (_, Rule::EmailFormat) => "メールアドレスが無効です".to_string(),
        (_, Rule::MaxLength { max }) => {
            format!("{}は{max}文字以内で入力してください", field_label(failure.field))
        }
        (_, Rule::MinLength { min }) => {
            format!("{}は{min}文字以上で入力してください", field_label(failure.field))
        }
        (_, Rule::MustBePositive) => format!("{}は正の値にしてください", field_label(failure.field)),
        (_, Rule::MustNotBeNegative) => {
            format!("{}は負の値にできません", field_label(failure.field))
        }
        (Field::Items, Rule::AmountOverflow) => "注文の合計金額が大きすぎます".to_string(),
        (_, Rule::AmountOverflow) => format!("{}の金額が大きすぎます", field_label(failure.field)),
        (_, Rule::MaxValue { max }) => {
            format!("{}は{max}以下にしてください", field_label(failure.field))
        }
        (_, Rule::MaxDecimalPlaces { max }) => {
            format!("{}の小数点以下は{max}桁までです", field_label(failure.field))
        }
        (_, Rule::NotANumber) | (_, Rule::NotAnInteger) => {
            format!("{}の形式が正しくありません", field_label(failure.field))
        }
        (_, Rule::AtLeastOneItem) => "1件以上入力してください".to_string(),
    }
}

fn field_label(field: Field) -> &'static str {
    match field {
        Field::CustomerName => "顧客名",
        Field::CustomerEmail | Field::Email => "メールアドレス",
        Field::CustomerPhone => "電話番号",
        Field::Status => "ステータス",
        Field::Items => "明細",
        Field::Quantity => "数量",
        Field::ProductName | Field::CategoryName => "名前",
        Field::Description => "説明",
        Field::Price => "価格",
        Field::Stock => "在庫",
        Field::Category => "カテゴリ",
        Field::Size => "サイズ",
        Field::Color => "色",
        Field::Password => "パスワード",
    }
}
