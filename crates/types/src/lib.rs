pub mod agent;
pub mod bounds;
pub mod config;
pub mod events;
pub mod params;

pub use agent::*;
pub use bounds::*;
pub use config::*;
pub use events::*;
pub use params::*;
