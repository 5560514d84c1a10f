pub mod app;
pub mod catalog_service;
pub mod dynamodb;
pub mod dynamodb_store;
pub mod image_upload;
pub mod memory_store;
pub mod models;
pub mod order_service;
pub mod ports;
pub mod query_cache;
pub mod report_service;
pub mod retry;

pub use app::*;
pub use catalog_service::*;
pub use dynamodb::*;
pub use dynamodb_store::*;
pub use image_upload::*;
pub use memory_store::*;
pub use models::*;
pub use order_service::*;
pub use ports::*;
pub use query_cache::*;
pub use report_service::*;
pub use retry::*;
