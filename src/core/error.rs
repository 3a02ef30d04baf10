//! 错误类型
//!
//! - ExtractionError：文档提取失败（格式、压缩包、I/O）
//! - ToolError：单个工具的底层调用失败
//! - AgentError：ReAct 循环本身失败（与 RecoveryEngine 配合决定重试或终止）
//! - PipelineError：整条流水线的结果，交给 HTTP 层决定状态码

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::LlmError;

/// 文档提取失败
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed document archive: {0}")]
    Archive(String),

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("No readable parts found for {0}")]
    MissingContent(String),
}

/// 工具底层调用失败（网络、非 2xx、解码、输入不合法）
#[derive(Error, Debug)]
pub enum ToolError {
    /// 代码生成服务返回非成功状态，body 原样保留
    #[error("Generation failed ({status}): {body}")]
    Generation { status: u16, body: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid provider response: {0}")]
    Decode(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("Invalid tool input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Agent 运行过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("Hallucinated tool: {0}")]
    HallucinatedTool(String),

    #[error("Tool {tool} failed: {source}")]
    ToolExecutionFailed {
        tool: String,
        #[source]
        source: ToolError,
    },

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("LLM error: {0}")]
    LlmError(#[from] LlmError),

    /// 工具调用次数或决策轮数超出上限
    #[error("Exceeded {limit} {what}")]
    ExceededSteps { limit: usize, what: &'static str },
}

/// 流水线（提取 -> Agent）失败
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Task timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction task aborted: {0}")]
    Join(String),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone)]
pub enum RecoveryAction {
    /// 将提示注入下一轮，让 LLM 重试（如 JSON 格式错误、调用了不存在的工具）
    RetryWithPrompt(String),
    /// 终止当前任务
    Abort,
}
