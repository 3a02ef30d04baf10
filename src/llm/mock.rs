//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! - `MockLlmClient::default()`：直接把最后一条 User 消息回显为最终回复（不调用工具）
//! - `MockLlmClient::scripted(..)`：按顺序返回预置输出，用完后重复最后一条

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError};
use crate::memory::{Message, Role};

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Vec<String>,
    cursor: AtomicUsize,
}

impl MockLlmClient {
    pub fn scripted<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: outputs.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// 已被调用的次数
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let n = self.cursor.fetch_add(1, Ordering::SeqCst);
        if let Some(last) = self.script.last() {
            return Ok(self.script.get(n).unwrap_or(last).clone());
        }

        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");
        Ok(format!("Echo from Mock: {}", last_user.trim()))
    }
}
