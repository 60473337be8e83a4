pub mod app;
pub mod auth;
pub mod config;
pub mod database;
pub mod dispatch;
pub mod error;
pub mod managers;
pub mod middleware;
pub mod routing;
pub mod stack;
pub mod types;
pub mod validation;

pub use app::App;

#[cfg(test)]
pub mod testing;
