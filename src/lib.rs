//! Rich-content rendering core for a question bank.
//!
//! Markdown from the content API is turned into an HTML fragment with
//! highlighted, copyable code blocks and deferred diagrams
//! ([`application::render`]). A [`application::view::StableContentView`]
//! mounts fragments and schedules the [`application::enhance`] pass, which
//! binds listeners and renders diagrams without losing their state across
//! unrelated updates. [`application::hot`] ranks and rotates the hot-question
//! feed.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;

pub use qbank_api_types as api_types;
