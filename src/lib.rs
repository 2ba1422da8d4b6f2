//! spend-tracker records categorized spending in SQLite and checks every month against a limit.
//!
//! A month's limit is either the default from `config.json` or a limit set for that month. In
//! adaptive mode, spending over a month's limit is subtracted from the following month's limit.
//! The same commands are available from the `spend` CLI and from an MCP server.

pub mod args;
mod backup;
pub mod commands;
mod config;
mod db;
mod error;
pub mod limits;
mod mcp;
pub mod model;
mod utils;


pub use config::{Config, DEFAULT_LIMIT};
pub use error::{Error, ErrorType, Result};
pub use limits::LimitPolicy;
