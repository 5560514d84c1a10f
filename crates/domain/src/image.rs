use crate::errors::DomainError;

/// アップロード可能な MIME タイプ
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// 最大サイズ（5MB）
pub const MAX_IMAGE_BYTES: usize = 5_242_880;

const EXTENSION_MAX: usize = 5;

fn is_safe_extension(ext: &str) -> bool {
    (1..=EXTENSION_MAX).contains(&ext.len()) && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// アップロード対象の画像ファイル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// 通信前に形式とサイズを検証する
    pub fn validate(&self) -> Result<(), DomainError> {
        if !ALLOWED_IMAGE_TYPES.contains(&self.content_type.as_str()) {
            return Err(DomainError::UnsupportedImageType(self.content_type.clone()));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(DomainError::ImageTooLarge {
                size: self.bytes.len(),
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(())
    }

    /// 拡張子（ファイル名から、使えなければ MIME サブタイプから）。
    /// ファイル名由来の拡張子は英数字 1〜5 文字のみ受け付ける
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if is_safe_extension(ext) => ext.to_ascii_lowercase(),
            _ => self
                .content_type
                .rsplit('/')
                .next()
                .unwrap_or("bin")
                .to_string(),
        }
    }

    /// 一意なオブジェクトキーを生成
    pub fn object_key(&self) -> String {
        format!(
            "{}.{}",
            ulid::Ulid::new().to_string().to_lowercase(),
            self.extension()
        )
    }
}
