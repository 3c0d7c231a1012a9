pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod merge;
pub mod models;
pub mod storage;
pub mod sync;
pub mod table;
pub mod time;

pub use error::{FitError, Result};
