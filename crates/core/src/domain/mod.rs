pub mod calendar;
pub mod conversation;
pub mod document;
pub mod goals;
pub mod ids;
pub mod nutrition;
pub mod profile;
pub mod progress;
pub mod settings;
pub mod workout;
