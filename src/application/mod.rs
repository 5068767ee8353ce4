//! Application services layer.

pub mod render;
