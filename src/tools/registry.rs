//! 工具注册表
//!
//! 工具种类是封闭的 ToolKind 枚举（搜索 / 代码 / 通用），注册表是 ToolKind -> 实现 的分派表；
//! 每个工具声明自己的失败策略，由 ToolExecutor 统一执行。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;

use crate::core::ToolError;

/// 可被 Agent 选择的工具种类；serde 名即 LLM 看到的工具名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, JsonSchema)]
pub enum ToolKind {
    #[serde(rename = "search_tool")]
    Search,
    #[serde(rename = "programming_assistant")]
    Code,
    #[serde(rename = "general_assistant")]
    General,
}

impl ToolKind {
    /// 提示词中展示的顺序
    pub const ALL: [ToolKind; 3] = [ToolKind::Search, ToolKind::Code, ToolKind::General];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Search => "search_tool",
            ToolKind::Code => "programming_assistant",
            ToolKind::General => "general_assistant",
        }
    }

    /// 按 LLM 输出的工具名解析；接受少量常见别名
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "search_tool" | "search" | "tavily_search_results_json" => Some(ToolKind::Search),
            "programming_assistant" | "code" | "code_tool" => Some(ToolKind::Code),
            "general_assistant" | "general" | "general_tool" => Some(ToolKind::General),
            _ => None,
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 工具失败时编排器的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// 终止整次 Agent 运行
    Abort,
    /// 把错误文本作为 Observation 交回给决策模型
    Observe,
    /// 用固定文本替代输出，当作成功
    Fallback(&'static str),
}

/// 工具 trait：种类、描述（供 LLM 理解）、失败策略、异步执行（输入为纯文本）
#[async_trait]
pub trait Tool: Send + Sync {
    fn kind(&self) -> ToolKind;

    /// 工具描述（供 LLM 判断何时使用）
    fn description(&self) -> &str;

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Abort
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError>;
}

/// 工具注册表：按 ToolKind 存储 Arc<dyn Tool>
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<ToolKind, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同一种类重复注册时后者覆盖前者
    pub fn register(&mut self, tool: impl Tool + 'static) {
        self.tools.insert(tool.kind(), Arc::new(tool));
    }

    pub fn get(&self, kind: ToolKind) -> Option<Arc<dyn Tool>> {
        self.tools.get(&kind).cloned()
    }

    /// 已注册的工具种类，按 ToolKind::ALL 顺序
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|k| self.tools.contains_key(k))
            .collect()
    }

    /// 返回 (name, description) 列表，用于生成 prompt 中的 Available tools 段落
    pub fn tool_descriptions(&self) -> Vec<(String, String)> {
        self.kinds()
            .into_iter()
            .filter_map(|k| {
                self.tools
                    .get(&k)
                    .map(|t| (k.name().to_string(), t.description().to_string()))
            })
            .collect()
    }
}
