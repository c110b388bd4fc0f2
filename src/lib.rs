//! EduWallet: a student finance tracker.
//!
//! Income, expense and savings-goal records live in a local SQLite store. Pure engines turn
//! those records into analytics ([`aggregate`]), alert events ([`alerts`]) and a weekly report
//! payload ([`report`]). Alerts and reports are rendered into emails ([`email`]) and handed to a
//! relay ([`notify`]), which is itself provided by this crate ([`relay`]).

pub mod aggregate;
pub mod alerts;
pub mod args;
pub mod commands;
mod config;
mod db;
pub mod email;
mod error;
mod mcp;
pub mod model;
pub mod notify;
pub mod relay;
pub mod report;
mod utils;


pub use config::Config;
pub use error::{Error, ErrorType, Result};
pub use notify::Mode;
