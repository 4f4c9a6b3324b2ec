//! Quill blog CMS kernel library.
//!
//! The `quill` binary is a thin shell over this library; integration tests
//! drive the same services and router.

pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod plugin;
pub mod routes;
pub mod slug;
pub mod state;
pub mod storage;
pub mod taxonomy;
