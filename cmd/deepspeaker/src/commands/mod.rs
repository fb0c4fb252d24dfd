//! CLI commands module.

mod config;
mod embed;
mod init;
mod score;
mod summary;
mod util;

pub use config::ConfigCommand;
pub use embed::EmbedCommand;
pub use init::InitCommand;
pub use score::ScoreCommand;
pub use summary::SummaryCommand;

// Re-export utils for use in commands
pub(crate) use util::*;
