//! # Transaction pool
//!
//! The [`Censor`] wires the chain collaborators together and admits
//! transactions into the [`TxPool`]: `check_basic`, then `check_state`, then
//! insertion. Rejections are [`types::Error`]s.

mod censor;
mod config;
mod pool;

pub use censor::Censor;
pub use config::Config;
pub use pool::TxPool;
