//! Core domain types: bookings, interpreters, environments, and typed ids.

pub mod booking;
pub mod decision_log;
pub mod environment;
pub mod ids;
pub mod interpreter;

pub use booking::{
    AutoAssignStatus, Booking, BookingKind, BookingStatus, DrType, MeetingType, PoolStatus,
};
pub use decision_log::{AssignmentDecisionLog, CandidateScore, DecisionOutcome};
pub use environment::Environment;
pub use ids::{BatchId, BookingId, EnvironmentId, Id, InterpreterId};
pub use interpreter::Interpreter;
