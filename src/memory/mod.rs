//! 记忆层：单次运行内的对话线程（消息与线程 id）

pub mod conversation;

pub use conversation::{ConversationThread, Message, Role, ThreadId};
