//! Background scheduling loop and its admin control surface.

pub mod control;
pub mod service;

pub use control::{SchedulerControl, SchedulerStatus};
pub use service::SchedulerService;
