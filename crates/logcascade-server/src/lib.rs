//! logcascade Server
//!
//! HTTP upload endpoint and command-line front end for the classification
//! cascade. Tables are CSV files with `source` and `log_message` columns;
//! results come back as the same table with a `target_label` column.

pub mod cli;
pub mod client;
pub mod config;
pub mod routes;
pub mod server;
pub mod state;
pub mod table;

pub use config::ServerSettings;
pub use routes::{create_router, AppError};
pub use server::run_server;
pub use state::AppState;
pub use table::{classify_table, LogTable, TableError};
