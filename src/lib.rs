pub mod application;
pub mod cache;
pub mod config;
pub mod infra;
pub mod util;
