pub mod config;
pub mod error;
pub mod messages;
pub mod runtime;
pub mod swerve;
