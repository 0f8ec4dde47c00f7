//! Domain rules shared by the rendering pipeline.

pub mod slug;
