//! 对话线程
//!
//! 每次请求生成新的 ThreadId（UUID v4），线程只活在单次 Agent 运行内，运行结束即丢弃，
//! 不同请求之间没有共享的对话状态。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 线程标识
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(Uuid);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 一次运行的对话历史（不含 system，system 由 Planner 每轮拼接）
#[derive(Clone, Debug)]
pub struct ConversationThread {
    id: ThreadId,
    messages: Vec<Message>,
}

impl ConversationThread {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            messages: Vec::new(),
        }
    }

    pub fn id(&self) -> ThreadId {
        self.id
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 最后一条 assistant 消息（即最终回复）
    pub fn last_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_ids_are_unique() {
        assert_ne!(ThreadId::new(), ThreadId::new());
    }

    #[test]
    fn test_thread_id_serializes_as_uuid_string() {
        let id = ThreadId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
        let back: ThreadId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_last_assistant() {
        let mut thread = ConversationThread::new(ThreadId::new());
        assert!(thread.last_assistant().is_none());
        thread.push(Message::user("task"));
        thread.push(Message::assistant("first"));
        thread.push(Message::user("observation"));
        thread.push(Message::assistant("final"));
        assert_eq!(thread.last_assistant().unwrap().content, "final");
        assert_eq!(thread.len(), 4);
    }
}
