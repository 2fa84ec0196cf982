pub mod bot;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod sheets;
