//! Process-wide plumbing: config, policy, clock, errors, logging, service host.

pub mod clock;
pub mod config;
pub mod errors;
pub mod logging;
pub mod service_host;

pub use clock::{Clock, FrozenClock, SystemClock};
pub use config::{Config, Mode, Policy, PolicyStore, ScoreWeights};
pub use errors::{EngineError, EngineResult};
pub use service_host::{Service, ServiceHost};
