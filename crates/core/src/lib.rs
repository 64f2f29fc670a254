pub mod bus;
pub mod collaborators;
pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;

pub use bus::*;
pub use collaborators::*;
pub use config::*;
pub use error::*;
pub use events::*;
