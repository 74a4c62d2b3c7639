pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, RelayError, TetherError};
pub use id::{new_id, ConnectionId, SessionId, SESSION_CODE_ALPHABET};
pub use types::Role;

pub type Result<T> = std::result::Result<T, TetherError>;
