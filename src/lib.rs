pub mod branch;
pub mod commands;
pub mod commit;
pub mod config;
pub mod error;
pub mod evaluate;
pub mod exclusion;
pub mod fsutil;
pub mod git;
pub mod lock;
pub mod logging;
pub mod monitor;
pub mod output;
pub mod registry;
pub mod signal;
pub mod stats;

#[cfg(test)]
mod test_utils;

pub use branch::TempBranchManager;
pub use commit::{CommitOrchestrator, CommitOutcome, CommitTrigger};
pub use config::{GlobalSettings, UntrackedPolicy};
pub use error::{CommitwatchError, Result};
pub use evaluate::{evaluate, ChangeState};
pub use exclusion::ExclusionIndex;
pub use monitor::{CheckReport, DirectoryStatus, Monitor};
pub use registry::{Policy, Registry};
pub use stats::{gather, ChangeStats};
