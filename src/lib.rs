pub mod app;
pub mod config;
pub mod context;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;

pub use app::create_app;
pub use config::{Config, ConfigError};
pub use context::AppContext;
pub use observability::{init_observability, shutdown_observability, Metrics};
