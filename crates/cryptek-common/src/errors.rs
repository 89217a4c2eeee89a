use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Failures raised by a realtime transport.
///
/// These never reach callers of the connection manager; they feed the
/// reconnect policy and the `error` event instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("connect timed out after {0}s")]
    Timeout(u64),

    #[error("connection closed")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CryptekError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("realtime.url must be a ws:// url".into());
        assert_eq!(
            err.to_string(),
            "config validation error: realtime.url must be a ws:// url"
        );
    }

    #[test]
    fn transport_error_display() {
        let err = TransportError::Connect("connection refused".into());
        assert_eq!(err.to_string(), "connect failed: connection refused");

        let err = TransportError::Timeout(15);
        assert_eq!(err.to_string(), "connect timed out after 15s");

        assert_eq!(TransportError::Closed.to_string(), "connection closed");

        let err = TransportError::Protocol("bad frame".into());
        assert_eq!(err.to_string(), "protocol error: bad frame");
    }

    #[test]
    fn cryptek_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: CryptekError = config_err.into();
        assert!(matches!(err, CryptekError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn cryptek_error_from_transport() {
        let err: CryptekError = TransportError::Closed.into();
        assert!(matches!(err, CryptekError::Transport(_)));
        assert_eq!(err.to_string(), "connection closed");
    }

    #[test]
    fn cryptek_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdin closed");
        let err: CryptekError = io_err.into();
        assert!(matches!(err, CryptekError::Io(_)));
        assert!(err.to_string().contains("stdin closed"));
    }

    #[test]
    fn cryptek_error_other_variants() {
        let err = CryptekError::Protocol("missing type".into());
        assert_eq!(err.to_string(), "protocol error: missing type");

        let err = CryptekError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
