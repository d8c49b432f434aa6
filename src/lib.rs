//! ragbus library root.

pub mod agents;
pub mod cli;
pub mod config;
pub mod core;
pub mod documents;
pub mod error;
pub mod generation;
pub mod logging;
pub mod protocol;
pub mod providers;
pub mod retrieval;

pub use agents::Agent;
pub use cli::Commands;
pub use config::{load_settings, load_settings_or_default, Settings};
pub use self::core::{build_orchestrator, Orchestrator, RunOutcome, Session};
pub use error::{Error, Result};
pub use protocol::{Bus, Envelope, MsgType, Payload};
pub use providers::Provider;
