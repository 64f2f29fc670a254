pub mod handlers;
pub mod middleware;
pub mod routes;

pub use routes::api_routes;

use std::sync::Arc;

use crawler::Kernel;
use webcore::Config;

/// Shared state handed to every handler: the crawl kernel (scheduler,
/// proxy pool, session manager, event bus) and the resolved config.
pub struct AppState {
    pub kernel: Arc<Kernel>,
    pub config: Config,
}
