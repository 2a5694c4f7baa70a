#![forbid(unsafe_code)]

pub mod agenda;
pub mod date;
pub mod error;
pub mod library;
pub mod model;
pub mod scheduler;
pub mod session;
pub mod streak;
pub mod time;
pub mod urgency;

pub use date::StudyDate;
pub use error::Error;
pub use scheduler::{Difficulty, Schedule, Scheduler, Stage};
pub use time::Clock;
