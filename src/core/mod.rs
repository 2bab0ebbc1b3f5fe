// Public modules
pub mod artifacts;
pub mod config;
pub mod deployer;
pub mod dispatch;
pub mod error;
pub mod hosts;
pub mod paths;
pub mod report;
pub mod rollout;
pub mod verify;

// Internal modules - not part of public API
pub(crate) mod slugify;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
