use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no usable account for media code {0}")]
    NoAccount(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("account store error: {0}")]
    Store(String),

    #[error("session manager is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, SessionError>;
