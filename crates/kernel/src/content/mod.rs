//! Article content: storage-backed CRUD and body rendering.

mod article_service;
pub mod filter;

pub use article_service::{ArticleService, ArticleView};
pub use filter::FilterPipeline;
