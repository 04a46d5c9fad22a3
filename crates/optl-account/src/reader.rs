//! Reader boundary for account state.
//!
//! Defines only the trait and its error type. Concrete readers live in
//! `http.rs` (production) and `optl-testkit` (tests).

use std::fmt;

/// Errors a reader may return.
///
/// The poller treats every variant as transient: the tick is skipped and
/// polling continues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Network or transport failure (connect, timeout, reset).
    Transport(String),
    /// The endpoint answered with a non-success HTTP status.
    Http { status: u16, message: String },
    /// The response payload could not be decoded.
    Decode(String),
    /// Reader misconfiguration (bad base URL, missing token).
    Config(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Transport(msg) => write!(f, "transport error: {msg}"),
            ReadError::Http { status, message } => {
                write!(f, "account api http error status={status}: {message}")
            }
            ReadError::Decode(msg) => write!(f, "decode error: {msg}"),
            ReadError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for ReadError {}

/// Source of account state.
///
/// Implementations must be `Send + Sync` so a reader can be shared by every
/// session a daemon runs. A call performs exactly one read and no writes.
#[async_trait::async_trait]
pub trait AccountStateReader: Send + Sync {
    type State: Send;

    /// Human-readable name for logs (e.g. `"http:credits"`).
    fn source_name(&self) -> &'static str;

    async fn read_state(&self) -> Result<Self::State, ReadError>;
}

#[async_trait::async_trait]
impl<R> AccountStateReader for std::sync::Arc<R>
where
    R: AccountStateReader + ?Sized,
{
    type State = R::State;

    fn source_name(&self) -> &'static str {
        (**self).source_name()
    }

    async fn read_state(&self) -> Result<Self::State, ReadError> {
        (**self).read_state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct FixedReader(i64);

    #[async_trait::async_trait]
    impl AccountStateReader for FixedReader {
        type State = i64;

        fn source_name(&self) -> &'static str {
            "fixed"
        }

        async fn read_state(&self) -> Result<i64, ReadError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn arc_reader_delegates() {
        let r = Arc::new(FixedReader(7));
        assert_eq!(r.source_name(), "fixed");
        assert_eq!(r.read_state().await.unwrap(), 7);
    }

    #[test]
    fn reader_is_object_safe_via_box() {
        let _r: Box<dyn AccountStateReader<State = i64>> = Box::new(FixedReader(1));
    }

    #[test]
    fn read_error_display_http() {
        let err = ReadError::Http {
            status: 503,
            message: "upstream unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "account api http error status=503: upstream unavailable"
        );
    }

    #[test]
    fn read_error_display_transport() {
        let err = ReadError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
