//! Rate limited change generation for cdc-stress.
//!
//! A pool of workers issues create/delete batches against a
//! [`ChangeWriter`](cdc_core::ChangeWriter), each throttling itself toward a
//! per-worker share of the target rate.

mod error;
mod generator;
mod throttle;

pub use error::LoadError;
pub use generator::{LoadConfig, RateLimitedLoadGenerator};
pub use throttle::Throttle;
