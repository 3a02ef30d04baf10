//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供 ReAct 循环决定是带提示重试还是终止。

use crate::core::{AgentError, RecoveryAction};
use crate::tools::ToolKind;

/// 语义化错误恢复：格式错误与幻觉工具可以重试，其余一律终止
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous output was not valid JSON: {raw}. \
                To call a tool, output exactly one JSON object and nothing else: \
                {{\"tool\": \"<tool name>\", \"input\": \"<text for the tool>\"}}. \
                To finish, reply with the final answer as plain text."
            )),
            AgentError::HallucinatedTool(name) => RecoveryAction::RetryWithPrompt(format!(
                "There is no tool named '{name}'. Available tools: {}. \
                Call one of them or reply with the final answer.",
                ToolKind::ALL
                    .iter()
                    .map(|k| k.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            _ => RecoveryAction::Abort,
        }
    }
}
