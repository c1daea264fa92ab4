pub mod config;
pub mod error;
pub mod templates;
pub mod types;

pub use error::{DeployError, ErrorKind};
pub use types::*;
