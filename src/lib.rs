pub mod config;
pub mod error;
pub mod host;
pub mod kernel;
pub mod page;
pub mod services;

// Re-export the pieces a host needs to wire the companion up
pub use config::EngieConfig;
pub use error::{EngieError, Result};
pub use host::{HostBridge, TextBufferHost};
pub use kernel::controller::Controller;
pub use kernel::state::{EngieState, StateDelta};
pub use kernel::store::StateStore;
pub use page::snapshot::{PageSnapshot, PageSource, StaticPage};
pub use services::analysis::{AnalysisApi, HttpAnalysisClient};
