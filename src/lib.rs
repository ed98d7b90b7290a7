pub mod config;
pub mod error;
pub mod models;
pub mod server;
pub mod utils;

pub use error::{ExtractError, PortalError, StrandError};
pub use models::{Course, LoginCredentials};
pub use utils::courses::PortalClient;
pub use utils::strands::resolve_ambiguous_strands;
