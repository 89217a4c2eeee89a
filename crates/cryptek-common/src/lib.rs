pub mod errors;
pub mod id;

pub use errors::{ConfigError, CryptekError, TransportError};
pub use id::{new_id, ListenerId, SessionKey};

pub type Result<T> = std::result::Result<T, CryptekError>;
