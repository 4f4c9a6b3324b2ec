//! Database models.

pub mod article;
pub mod category;
pub mod plugin;
pub mod tag;

pub use article::{
    Article, ArticleDetail, ArticleFilter, CreateArticle, STATUS_DRAFT, STATUS_PUBLISHED,
    UpdateArticle,
};
pub use category::{Category, CreateCategory, UpdateCategory};
pub use plugin::{NewPlugin, Plugin};
pub use tag::{CreateTag, Tag, TagWithArticles, UpdateTag};
