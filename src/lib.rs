pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod server;
pub mod translate;
pub mod upstream;

pub use config::{BridgeConfig, EnvTargetSource, RawTargetConfig, TargetConfig, TargetSource};
pub use error::{BridgeError, Result};
pub use logging::SharedExchangeLog;
pub use server::{build_router, AppState};
