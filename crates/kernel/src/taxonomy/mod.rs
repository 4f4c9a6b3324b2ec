//! Taxonomy: tags and categories.
//!
//! Tags are many-to-many with articles and can be merged into one another.
//! Categories form a tree and can be deleted with their articles migrated
//! to another category.

mod category_service;
mod merge;
mod tag_service;

pub use category_service::CategoryService;
pub use merge::plan_reassignment;
pub use tag_service::TagService;
