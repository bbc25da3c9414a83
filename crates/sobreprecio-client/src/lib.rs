pub mod analysis;
pub mod commands;
pub mod config;
pub mod contracts;
pub mod error;
mod import;
pub mod migrations;
pub mod setup;
pub mod state;

pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope, failure_from_error};
pub use error::{ClientError, ClientResult};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
