pub mod config;
pub mod error;
pub mod listings;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod ports;
pub mod saga;
pub mod units;

pub use config::*;
pub use error::*;
pub use model::*;
pub use orchestrator::*;
pub use ports::*;
pub use saga::*;
