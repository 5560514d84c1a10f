use crate::ports::ImageStorage;
use domain::ImageFile;
use shared::AppError;
use std::sync::Arc;
use tracing::{error, info};

/// 商品画像のアップロード
pub struct ImageUploadService<I: ?Sized> {
    storage: Arc<I>,
}

impl<I> ImageUploadService<I>
where
    I: ImageStorage + ?Sized,
{
    pub fn new(storage: Arc<I>) -> Self {
        Self { storage }
    }

    /// 形式とサイズを確認してから保存し、公開URLを返す
    pub async fn upload(&self, file: ImageFile) -> Result<String, AppError> {
        file.validate()?;

        let key = file.object_key();
        let size = file.bytes.len();
        self.storage
            .put_object(&key, &file.content_type, file.bytes)
            .await
            .map_err(|e| {
                error!(key = %key, error = %e, "画像のアップロードに失敗しました");
                AppError::Upload(e.to_string())
            })?;

        let url = self.storage.public_url(&key);
        info!(key = %key, size, "画像をアップロードしました");
        Ok(url)
    }
}
