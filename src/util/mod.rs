pub mod html;
pub(crate) mod lock;
