//! Planner：决策策略与 Tool Call 解析
//!
//! 调用 LLM 得到最终回答或 JSON Tool Call；parse_llm_output 从文本中提取 JSON 并解析为 ToolCall 或直接回复。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// LLM 返回的 Tool Call：`{"tool": "search_tool", "input": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    pub tool: String,
    pub input: String,
}

#[derive(Deserialize)]
struct RawToolCall {
    tool: String,
    #[serde(default)]
    input: Value,
}

/// Planner 输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerOutput {
    /// 最终回答
    Response(String),
    /// 需要执行工具
    ToolCall(ToolCall),
}

/// 解析 LLM 输出：以 `{` 开头，或 ```json 代码块里是带 `tool` 字段的对象时按 Tool Call 解析，否则视为最终回答
///
/// 回答正文里出现的花括号或 JSON 示例不会被误当成工具调用；
/// 只有整段输出就是 JSON（裸对象或单独的代码块）时，格式错误才返回 JsonParseError。
pub fn parse_llm_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();

    if trimmed.starts_with('{') {
        return Ok(match tool_call_from_json(trimmed)? {
            Some(tc) => PlannerOutput::ToolCall(tc),
            None => PlannerOutput::Response(trimmed.to_string()),
        });
    }

    let Some((before, block, after)) = split_json_fence(trimmed) else {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    };
    let fence_only = before.trim().is_empty() && after.trim().is_empty();
    match tool_call_from_json(block) {
        Ok(Some(tc)) => Ok(PlannerOutput::ToolCall(tc)),
        Ok(None) => Ok(PlannerOutput::Response(trimmed.to_string())),
        Err(e) if fence_only => Err(e),
        Err(_) => Ok(PlannerOutput::Response(trimmed.to_string())),
    }
}

/// 拆出第一个 ```json 代码块：(块前文本, 块内容, 块后文本)；缺少结尾 ``` 时块延伸到末尾
fn split_json_fence(text: &str) -> Option<(&str, &str, &str)> {
    let start = text.find("```json")?;
    let rest = &text[start + 7..];
    Some(match rest.find("```") {
        Some(end) => (&text[..start], rest[..end].trim(), &rest[end + 3..]),
        None => (&text[..start], rest.trim(), ""),
    })
}

/// JSON 文本 -> ToolCall；不是对象、没有 tool 字段或 tool 为空时返回 None
fn tool_call_from_json(json_str: &str) -> Result<Option<ToolCall>, AgentError> {
    let parse_err = |e: serde_json::Error| AgentError::JsonParseError(format!("{}: {}", e, json_str));
    let value: Value = serde_json::from_str(json_str).map_err(parse_err)?;
    if value.get("tool").is_none() {
        return Ok(None);
    }
    let parsed: RawToolCall = serde_json::from_value(value).map_err(parse_err)?;

    let tool = parsed.tool.trim();
    if tool.is_empty() {
        return Ok(None);
    }
    let input = match parsed.input {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(Some(ToolCall {
        tool: tool.to_string(),
        input,
    }))
}

/// 生成决策模型的 system prompt：固定指令 + 工具列表 + 调用格式
pub fn build_system_prompt(tools: &[(String, String)], schema: &str) -> String {
    let tool_lines: Vec<String> = tools
        .iter()
        .map(|(name, desc)| format!("- {}: {}", name, desc))
        .collect();
    format!(
        "You are an assistant that completes the tasks found in a user's document. \
Decide for each task which tool fits best:\n\
- programming tasks go to programming_assistant\n\
- tasks needing current or live information go to search_tool\n\
- everything else goes to general_assistant\n\n\
Available tools:\n{}\n\n\
To call a tool, reply with exactly one JSON object and nothing else, matching this schema:\n{}\n\n\
After you receive an observation you may call another tool. \
When every task is answered, reply with the final answer as plain text (no JSON).",
        tool_lines.join("\n"),
        schema
    )
}

/// Planner：持有决策 LLM 与 system prompt
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 拼 system + 对话历史后调用 LLM
    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = Vec::with_capacity(messages.len() + 1);
        full_messages.push(Message::system(self.system_prompt.clone()));
        full_messages.extend_from_slice(messages);
        Ok(self.llm.complete(&full_messages).await?)
    }
}
