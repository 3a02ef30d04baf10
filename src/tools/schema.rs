//! 工具调用 JSON Schema 生成（schemars）
//!
//! 把「合法 tool call」的 JSON 结构注入 system prompt，减少 LLM 输出格式错误。

use schemars::{schema_for, JsonSchema};

use crate::tools::ToolKind;

/// 工具调用格式：`{"tool": "...", "input": "..."}`（仅用于 Schema 生成）
#[allow(dead_code)]
#[derive(JsonSchema)]
struct ToolCallFormat {
    /// 工具名：search_tool、programming_assistant 或 general_assistant
    pub tool: ToolKind,
    /// 交给工具的纯文本输入（搜索词、代码需求或问题）
    pub input: String,
}

/// 返回工具调用的 JSON Schema 字符串，可拼入 system prompt
pub fn tool_call_schema_json() -> String {
    let schema = schema_for!(ToolCallFormat);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lists_every_tool_name() {
        let schema = tool_call_schema_json();
        for kind in ToolKind::ALL {
            assert!(schema.contains(kind.name()), "missing {}", kind);
        }
        assert!(schema.contains("\"input\""));
    }
}
