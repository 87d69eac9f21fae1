//! Command handlers for the Fathom CLI.

pub mod ask;
pub mod health;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use health::HealthCommand;
