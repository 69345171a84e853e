#![forbid(unsafe_code)]

//! Core domain model and business logic for the Kinetic workout tracker.
//!
//! This crate provides:
//! - Domain types (exercise variants, intensity profiles, workout records, tasks)
//! - Exercise catalog
//! - Kinetic session state machine and metabolic scoring
//! - Persistence (key-value stores, archive, schedule, health link)
//! - Assistant gateway boundary

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod score;
pub mod session;
pub mod storage;
pub mod archive;
pub mod schedule;
pub mod link;
pub mod assistant;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::default_catalog;
pub use config::Config;
pub use score::metabolic_score;
pub use session::{KineticSession, SessionPhase, SessionSnapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use archive::ArchiveStore;
pub use schedule::{NewTask, ScheduleStore};
pub use link::{HealthLink, LinkStatus};
pub use assistant::{AiGateway, Assistant, CommandGateway, OfflineGateway};
