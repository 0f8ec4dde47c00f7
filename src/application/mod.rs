//! Rendering core: markdown transformation, enhancement of mounted
//! fragments, the stable content view and the hot-question feed.

pub mod enhance;
pub mod error;
pub mod hooks;
pub mod hot;
pub mod render;
pub mod view;
