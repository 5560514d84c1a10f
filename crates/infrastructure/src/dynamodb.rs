use crate::ports::StoreError;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::Client;
use shared::Config;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct DynamoDbClient {
    client: Client,
    table_name: String,
}

impl DynamoDbClient {
    /// 設定のリージョンとエンドポイント（DynamoDB Local など）でクライアントを作成
    pub async fn new(config: &Config) -> Self {
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &config.dynamodb_endpoint {
            debug!(endpoint = %endpoint, "カスタムエンドポイントを使用します");
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            table_name: config.dynamodb_table.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// SDK のエラーを `StoreError` に分類する
    pub fn convert_error<E, R>(&self, error: SdkError<E, R>) -> StoreError
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: std::fmt::Debug,
    {
        let detail = DisplayErrorContext(&error).to_string();
        let code = error
            .as_service_error()
            .and_then(|e| e.code())
            .map(str::to_string);

        let converted = match (&error, code.as_deref()) {
            (SdkError::TimeoutError(_), _)
            | (SdkError::DispatchFailure(_), _)
            | (SdkError::ResponseError(_), _) => StoreError::Unavailable(detail),
            (_, Some("ConditionalCheckFailedException")) => StoreError::Conflict(detail),
            (_, Some("TransactionCanceledException")) if detail.contains("ConditionalCheckFailed") => {
                StoreError::Conflict(detail)
            }
            (_, Some("TransactionCanceledException"))
            | (_, Some("TransactionConflictException"))
            | (_, Some("ProvisionedThroughputExceededException"))
            | (_, Some("ThrottlingException"))
            | (_, Some("RequestLimitExceeded"))
            | (_, Some("InternalServerError"))
            | (_, Some("ServiceUnavailable")) => StoreError::Unavailable(detail),
            _ => StoreError::Rejected(detail),
        };

        warn!(code = ?code, error = %converted, "DynamoDB 操作に失敗しました");
        converted
    }
}
