pub mod render;
pub mod theme;

pub use render::{Chrome, draw};
