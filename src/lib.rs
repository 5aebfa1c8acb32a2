//! mrsi: templated-URL HTTP load generator
//!
//! A run renders concrete URLs from templates with a seeded randomizer,
//! dispatches them through a bounded queue to a pool of workers, and
//! aggregates one result per request into a [`RunSummary`].
//!
//! ```ignore
//! let config = RunConfig::load_profile(path)?.validate()?;
//! let executor = RequestHandler::build_client(&config)?;
//! let report = RequestHandler::run(&config, executor, cancel::trap_ctrl_c()).await?;
//! println!("{}", report.summary);
//! ```

pub mod aggregator;
pub mod cancel;
pub mod config;
pub mod error;
pub mod http_client;
pub mod logger;
pub mod request_handler;
pub mod sequencer;
pub mod stats;
pub mod url_randomizer;
pub mod worker;

pub use config::{IntRule, Method, RandomizerConfig, RunConfig, StringRule, ValidatedConfig};
pub use error::{RequestError, Result, RunError};
pub use request_handler::{RequestHandler, RunReport};
pub use stats::RunSummary;
