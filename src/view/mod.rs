pub mod controller;
pub mod filter;

pub use controller::{Notification, NotificationLevel, ViewController};
pub use filter::{FilterConfig, FilterEngine};
