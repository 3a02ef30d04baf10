//! 通用助手工具：把输入原样作为单条 User 消息交给对话模型

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ToolError;
use crate::llm::LlmClient;
use crate::memory::Message;
use crate::tools::{Tool, ToolKind};

pub struct GeneralTool {
    llm: Arc<dyn LlmClient>,
}

impl GeneralTool {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Tool for GeneralTool {
    fn kind(&self) -> ToolKind {
        ToolKind::General
    }

    fn description(&self) -> &str {
        "Use this tool for general-purpose tasks, including explanations, analysis, or summarization."
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let reply = self.llm.complete(&[Message::user(input)]).await?;
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient};
    use crate::tools::FailurePolicy;

    struct Unreachable;

    #[async_trait]
    impl LlmClient for Unreachable {
        async fn complete(&self, _messages: &[Message]) -> Result<String, LlmError> {
            Err(LlmError::Request("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_forwards_input_as_user_message() {
        let tool = GeneralTool::new(Arc::new(MockLlmClient::default()));
        let out = tool.execute("What is photosynthesis?").await.unwrap();
        assert_eq!(out, "Echo from Mock: What is photosynthesis?");
    }

    #[tokio::test]
    async fn test_llm_failure_propagates_and_aborts() {
        let tool = GeneralTool::new(Arc::new(Unreachable));
        let err = tool.execute("hi").await.unwrap_err();
        assert!(matches!(err, ToolError::Llm(LlmError::Request(_))));
        assert_eq!(tool.failure_policy(), FailurePolicy::Abort);
    }
}
