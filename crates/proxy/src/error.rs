use thiserror::Error;

use crate::info::ProxyKind;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("no proxy available for type {0:?} region {1}")]
    Unavailable(ProxyKind, String),

    #[error("timed out waiting for an available proxy")]
    Timeout,

    #[error("proxy pool is shut down")]
    ShutDown,
}

pub type Result<T> = std::result::Result<T, ProxyError>;
