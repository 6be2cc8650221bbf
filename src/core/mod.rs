pub mod config;
pub mod error;
pub mod monitor;

pub use config::Configuration;
pub use error::{MonitorError, MonitorResult};
pub use monitor::{Monitor, MonitorEvent};
