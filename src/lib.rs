//! TaskBee - 文档任务路由服务
//!
//! 模块划分：
//! - **agent**: 无头 Agent 运行时与文档流水线（提取 -> 任务提示 -> ReAct）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、恢复、运行状态机、优雅关闭
//! - **extract**: Office / OpenDocument / 纯文本 提取
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Gemini / Mock）
//! - **memory**: 单次运行内的对话线程
//! - **observability**: tracing 初始化
//! - **react**: Planner 与 ReAct 主循环
//! - **server**: HTTP 路由、上传落盘、错误到状态码的映射
//! - **tools**: 搜索 / 代码 / 通用 三个工具与执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod extract;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod server;
pub mod tools;
