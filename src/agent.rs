//! Headless Agent 运行时
//!
//! 供 HTTP 层调用的无界面 Agent 逻辑：
//! create_agent_components 按配置构建 Planner / ToolExecutor / Recovery，
//! DocumentPipeline 对单个上传文件执行 提取 -> 任务提示 -> ReAct，返回最终回答。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::Instrument;

use crate::config::AppConfig;
use crate::core::{PipelineError, RecoveryEngine};
use crate::extract::{self, ExtractedContent};
use crate::llm::{create_llm, LlmClient, SamplingParams};
use crate::memory::{ConversationThread, ThreadId};
use crate::react::{build_system_prompt, react_loop, LoopLimits, Planner};
use crate::tools::{
    tool_call_schema_json, CodeTool, GeneralTool, SearchTool, ToolExecutor, ToolRegistry,
};

const TASK_INSTRUCTIONS: &str = "You are a helpful AI assistant with expertise in any subject.";

const TASK_STEPS: &str = "Please:
1. Read through the assignment carefully
2. For each question, provide:
   - A clear solution with step-by-step explanations
3. Format your response clearly with proper headings and sections
4. If there are multiple questions, answer them one by one
Don't just analyze the assignment - solve it completely with detailed explanations.";

/// 交给 Agent 的任务提示：固定指令 + 截断后内容的 JSON 字符串
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPrompt {
    text: String,
    embedded: String,
}

impl TaskPrompt {
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// 嵌入提示中的（已截断）文档内容
    pub fn embedded_content(&self) -> &str {
        &self.embedded
    }
}

/// 截断到前 cap 个字符后嵌入指令模板
pub fn build_task_prompt(content: &ExtractedContent, cap: usize) -> TaskPrompt {
    let embedded = content.truncated(cap);
    let quoted = serde_json::to_string(&embedded).unwrap_or_else(|_| format!("{:?}", embedded));
    TaskPrompt {
        text: format!(
            "{}\n\nHere is the assignment data: {}\n\n{}",
            TASK_INSTRUCTIONS, quoted, TASK_STEPS
        ),
        embedded,
    }
}

/// 预构建的 Agent 组件：Planner、ToolExecutor、Recovery 与运行上限，可被所有请求共享（均为只读）
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub recovery: RecoveryEngine,
    pub limits: LoopLimits,
}

impl AgentComponents {
    /// 用给定的决策模型与工具表组装；system prompt 由工具描述与调用 Schema 生成
    pub fn new(
        policy: Arc<dyn LlmClient>,
        tools: ToolRegistry,
        tool_timeout_secs: u64,
        limits: LoopLimits,
    ) -> Self {
        let system_prompt = build_system_prompt(&tools.tool_descriptions(), &tool_call_schema_json());
        Self {
            planner: Planner::new(policy, system_prompt),
            executor: ToolExecutor::new(tools, tool_timeout_secs),
            recovery: RecoveryEngine::new(),
            limits,
        }
    }
}

/// 创建 Agent 组件：决策模型用 [llm] 段，通用助手用 [tools.general] 段，注册搜索 / 代码 / 通用三个工具
pub fn create_agent_components(cfg: &AppConfig) -> AgentComponents {
    let policy = create_llm(
        cfg,
        &cfg.llm.model,
        SamplingParams::new(cfg.llm.temperature, cfg.llm.max_tokens),
    );
    let general_model = cfg
        .tools
        .general
        .model
        .as_deref()
        .unwrap_or(&cfg.llm.model);
    let general_llm = create_llm(
        cfg,
        general_model,
        SamplingParams::new(cfg.tools.general.temperature, cfg.tools.general.max_tokens),
    );

    let mut tools = ToolRegistry::new();
    tools.register(SearchTool::new(&cfg.tools.search));
    tools.register(CodeTool::new(&cfg.tools.code));
    tools.register(GeneralTool::new(general_llm));

    AgentComponents::new(
        policy,
        tools,
        cfg.tools.tool_timeout_secs,
        LoopLimits {
            max_tool_invocations: cfg.agent.max_tool_invocations,
            max_steps: cfg.agent.max_steps,
        },
    )
}

/// 上传文件 -> 最终回答
#[async_trait]
pub trait TaskPipeline: Send + Sync {
    async fn process_file(&self, path: &Path) -> Result<String, PipelineError>;
}

/// 默认流水线：提取（阻塞线程池）-> 任务提示 -> ReAct，整体受 task_timeout 约束
pub struct DocumentPipeline {
    components: Arc<AgentComponents>,
    truncate_chars: usize,
    task_timeout_secs: u64,
}

impl DocumentPipeline {
    pub fn new(components: Arc<AgentComponents>, truncate_chars: usize, task_timeout_secs: u64) -> Self {
        Self {
            components,
            truncate_chars,
            task_timeout_secs,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(
            Arc::new(create_agent_components(cfg)),
            cfg.app.truncate_chars,
            cfg.app.task_timeout_secs,
        )
    }

    async fn run(&self, path: &Path, thread_id: ThreadId) -> Result<String, PipelineError> {
        let owned = path.to_path_buf();
        let content = tokio::task::spawn_blocking(move || extract::extract(&owned))
            .await
            .map_err(|e| PipelineError::Join(e.to_string()))??;
        if content.is_empty() {
            tracing::warn!("document contains no text");
        }
        tracing::info!(fragments = content.fragments().len(), "document extracted");

        let prompt = build_task_prompt(&content, self.truncate_chars);
        let mut thread = ConversationThread::new(thread_id);
        let c = &self.components;
        let result = react_loop(
            &c.planner,
            &c.executor,
            &c.recovery,
            &mut thread,
            prompt.as_str(),
            c.limits,
        )
        .await?;

        let tools: Vec<&str> = result.invocations.iter().map(|i| i.tool.name()).collect();
        let (prompt_tokens, completion_tokens, total_tokens) = result.token_usage;
        tracing::info!(
            steps = result.steps,
            tools = ?tools,
            prompt_tokens,
            completion_tokens,
            total_tokens,
            "task complete"
        );
        Ok(result.response)
    }
}

#[async_trait]
impl TaskPipeline for DocumentPipeline {
    async fn process_file(&self, path: &Path) -> Result<String, PipelineError> {
        let thread_id = ThreadId::new();
        let span = tracing::info_span!("task", thread_id = %thread_id, file = %path.display());
        tokio::time::timeout(
            Duration::from_secs(self.task_timeout_secs),
            self.run(path, thread_id).instrument(span),
        )
        .await
        .map_err(|_| PipelineError::Timeout(self.task_timeout_secs))?
    }
}
