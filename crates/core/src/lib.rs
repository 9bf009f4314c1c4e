//! Core domain model for the Repfuel coaching backend.
//!
//! Everything in this crate is deterministic and free of I/O: the per-user
//! document schema, the nutrition calculators, the layered configuration
//! loader, and the error taxonomy shared by the store and the agent.

pub mod calculators;
pub mod config;
pub mod domain;
pub mod errors;

pub use config::{
    AgentConfig, AppConfig, ConfigError, ConfigOverrides, LlmConfig, LoadOptions, LogFormat,
    MacroPolicy, MacroSplit,
};
pub use domain::calendar::{Calendar, ScheduledItem};
pub use domain::conversation::{AiContext, ConversationTurn, LearnedPreferences};
pub use domain::document::UserDocument;
pub use domain::goals::{Goals, MacroTargets, PrimaryGoal};
pub use domain::ids::generate_entry_id;
pub use domain::nutrition::{Adherence, DailyLog, DailyTotals, Food, Meal, MealType};
pub use domain::profile::{ActivityLevel, Gender, UserProfile};
pub use domain::workout::{Exercise, Intensity, WorkoutEntry, WorkoutType};
pub use errors::DomainError;
