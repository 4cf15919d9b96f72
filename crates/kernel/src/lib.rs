//! Catalist kernel library.
//!
//! Category listing endpoints driven by a stored slug list, and a
//! change-triggered resync of every configured category to an external
//! collector. The `catalist` binary wires these together.

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod query;
pub mod routes;
pub mod settings;
pub mod state;
pub mod sync;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use routes::app;
pub use state::{AppState, Backends};
