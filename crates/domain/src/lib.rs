pub mod catalog_filter;
pub mod category;
pub mod errors;
pub mod ids;
pub mod image;
pub mod money;
pub mod order;
pub mod order_draft;
pub mod product;
pub mod reports;
pub mod validation;

pub use catalog_filter::*;
pub use category::*;
pub use errors::*;
pub use ids::*;
pub use image::*;
pub use order::*;
pub use order_draft::*;
pub use product::*;
pub use reports::*;
pub use validation::{Field, Rule, ValidationFailure};
