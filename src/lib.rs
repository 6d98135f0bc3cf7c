pub mod api;
pub mod cli;
pub mod config;
pub mod handler;
pub mod health;
pub mod logging;
pub mod reconcile;
pub mod rib;
pub mod routes;
pub mod utils;

pub use config::Config;
pub use handler::{serve, Role};
