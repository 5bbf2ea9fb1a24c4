//! Remote workspace and job compilation engine for cluster-side proteomics searches.
//!
//! Projects live under `<root>/projects` on a [`store::RemoteStore`]; search
//! parameters are compiled into batch scripts by a [`compiler::SearchCompiler`]
//! and queued through a [`submit::JobSubmitter`].

pub mod archive;
pub mod compiler;
pub mod config;
pub mod connection;
pub mod error;
pub mod progress;
pub mod results;
pub mod store;
pub mod submit;
pub mod workspace;

pub use config::{AppConfig, SearchTool};
pub use connection::ConnectionContext;
pub use error::{EntityKind, Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
pub use results::ResultTable;
pub use workspace::{ResourceKind, ResourceSchema, WorkspaceManager};
