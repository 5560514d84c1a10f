//! 入力検証の共通ルール
//!
//! フォームの検証は最初に違反したルールだけを返す（first-error-wins）。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// 検証対象のフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    CustomerName,
    CustomerEmail,
    CustomerPhone,
    Status,
    Items,
    Quantity,
    ProductName,
    Description,
    Price,
    Stock,
    Category,
    Size,
    Color,
    CategoryName,
    Email,
    Password,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::CustomerName => "customer_name",
            Field::CustomerEmail => "customer_email",
            Field::CustomerPhone => "customer_phone",
            Field::Status => "status",
            Field::Items => "items",
            Field::Quantity => "quantity",
            Field::ProductName => "name",
            Field::Description => "description",
            Field::Price => "price",
            Field::Stock => "stock",
            Field::Category => "category",
            Field::Size => "size",
            Field::Color => "color",
            Field::CategoryName => "category_name",
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 違反したルールの種類
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "rule")]
pub enum Rule {
    Required,
    MaxLength { max: usize },
    MinLength { min: usize },
    EmailFormat,
    NotANumber,
    NotAnInteger,
    MustBePositive,
    MustNotBeNegative,
    MaxValue { max: u64 },
    MaxDecimalPlaces { max: u32 },
    /// 金額の計算結果が表現できる範囲を超えた
    AmountOverflow,
    AtLeastOneItem,
}

/// 構造化された検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    pub field: Field,
    pub rule: Rule,
    /// 行アイテムの検証時のみ設定される
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl ValidationFailure {
    pub fn new(field: Field, rule: Rule) -> Self {
        Self {
            field,
            rule,
            index: None,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule {
            Rule::Required => write!(f, "{} is required", self.field)?,
            Rule::MaxLength { max } => {
                write!(f, "{} must be at most {max} characters", self.field)?
            }
            Rule::MinLength { min } => {
                write!(f, "{} must be at least {min} characters", self.field)?
            }
            Rule::EmailFormat => write!(f, "{} is not a valid email", self.field)?,
            Rule::NotANumber => write!(f, "{} must be a number", self.field)?,
            Rule::NotAnInteger => write!(f, "{} must be an integer", self.field)?,
            Rule::MustBePositive => write!(f, "{} must be positive", self.field)?,
            Rule::MustNotBeNegative => write!(f, "{} must not be negative", self.field)?,
            Rule::MaxValue { max } => write!(f, "{} must be at most {max}", self.field)?,
            Rule::MaxDecimalPlaces { max } => {
                write!(f, "{} must have at most {max} decimal places", self.field)?
            }
            Rule::AmountOverflow => write!(f, "{} total is too large", self.field)?,
            Rule::AtLeastOneItem => write!(f, "{} must contain at least one entry", self.field)?,
        }
        if let Some(index) = self.index {
            write!(f, " (line {index})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationFailure {}

/// 前後の空白を除去した必須文字列を検証
pub fn required_text(value: &str, field: Field, max: usize) -> Result<String, ValidationFailure> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::new(field, Rule::Required));
    }
    max_length(trimmed, field, max)?;
    Ok(trimmed.to_string())
}

/// 任意の文字列を検証（空文字は未入力として扱う）
pub fn optional_text(
    value: Option<&str>,
    field: Field,
    max: usize,
) -> Result<Option<String>, ValidationFailure> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            max_length(trimmed, field, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

pub fn max_length(value: &str, field: Field, max: usize) -> Result<(), ValidationFailure> {
    if value.chars().count() > max {
        return Err(ValidationFailure::new(field, Rule::MaxLength { max }));
    }
    Ok(())
}

/// メールアドレスの形式と長さを検証
pub fn email(value: &str, field: Field, max: usize) -> Result<String, ValidationFailure> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::new(field, Rule::Required));
    }
    if !is_email(trimmed) {
        return Err(ValidationFailure::new(field, Rule::EmailFormat));
    }
    max_length(trimmed, field, max)?;
    Ok(trimmed.to_string())
}

pub fn is_email(value: &str) -> bool {
    EMAIL_PATTERN.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_trims() {
        assert_eq!(
            required_text("  Ana  ", Field::CustomerName, 200).unwrap(),
            "Ana"
        );
        assert_eq!(
            required_text("   ", Field::CustomerName, 200).unwrap_err(),
            ValidationFailure::new(Field::CustomerName, Rule::Required)
        );
    }

    #[test]
    fn test_max_length_counts_chars() {
        // マルチバイト文字もバイトではなく文字数で数える
        assert!(max_length("Calça", Field::ProductName, 5).is_ok());
        assert!(max_length("Calças", Field::ProductName, 5).is_err());
    }

    #[test]
    fn test_optional_text_blank_is_none() {
        assert_eq!(optional_text(Some("  "), Field::Size, 50).unwrap(), None);
        assert_eq!(optional_text(None, Field::Size, 50).unwrap(), None);
        assert_eq!(
            optional_text(Some(" M "), Field::Size, 50).unwrap(),
            Some("M".to_string())
        );
    }

    #[test]
    fn test_email_format() {
        assert!(is_email("ana@x.com"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("ana@x"));
        assert!(!is_email("a na@x.com"));

        let failure = email("not-an-email", Field::CustomerEmail, 255).unwrap_err();
        assert_eq!(failure.rule, Rule::EmailFormat);
    }

    #[test]
    fn test_display_includes_line_index() {
        let failure = ValidationFailure::new(Field::Quantity, Rule::MustBePositive).at(2);
        assert_eq!(failure.to_string(), "quantity must be positive (line 2)");
    }
}
