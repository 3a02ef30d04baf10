//! 核心层：错误类型与恢复、运行状态机、优雅关闭

pub mod error;
pub mod recovery;
pub mod shutdown;
pub mod state;

pub use error::{AgentError, ExtractionError, PipelineError, RecoveryAction, ToolError};
pub use recovery::RecoveryEngine;
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{AgentPhase, RunState};
