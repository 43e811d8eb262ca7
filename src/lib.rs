pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod models;
pub mod panel;
pub mod session;
pub mod shadow;
pub mod sim;
pub mod sync;
pub mod transport;
pub mod utils;

pub use error::PanelError;
pub use models::{Credentials, LightState, ShadowDocument};
