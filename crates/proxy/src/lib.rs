pub mod check;
pub mod error;
pub mod info;
pub mod pool;

pub use check::ProxyChecker;
pub use error::{ProxyError, Result};
pub use info::{ChannelStatus, ProxyInfo, ProxyKind, ProxyPoolStatus, ProxyRequest, DEFAULT_REGION};
pub use pool::{ProxyPool, ProxySource};
