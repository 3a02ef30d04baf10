//! ReAct 主循环
//!
//! Plan -> Act (Tool) -> Observe -> 下一轮 Plan，直到策略给出最终回答。
//! 工具调用次数与决策轮数都有上限，超出返回 ExceededSteps；格式错误与幻觉工具交给 RecoveryEngine 决定是否重试。

use crate::core::{AgentError, AgentPhase, RecoveryAction, RecoveryEngine, RunState};
use crate::memory::{ConversationThread, Message, ThreadId};
use crate::react::{parse_llm_output, Planner, PlannerOutput};
use crate::tools::{ToolExecutor, ToolInvocation, ToolKind};

/// Observation 日志预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;

/// 单次运行的上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopLimits {
    pub max_tool_invocations: usize,
    pub max_steps: usize,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_tool_invocations: 10,
            max_steps: 20,
        }
    }
}

/// ReAct 循环执行结果：最终回答、按顺序的工具调用记录与本次 token 增量
#[derive(Debug)]
pub struct ReactResult {
    pub response: String,
    pub invocations: Vec<ToolInvocation>,
    pub thread_id: ThreadId,
    pub steps: usize,
    /// (prompt, completion, total)
    pub token_usage: (u64, u64, u64),
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(OBSERVATION_PREVIEW_CHARS).collect();
    if text.chars().count() > OBSERVATION_PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}

fn fail(state: &mut RunState, err: AgentError) -> Result<ReactResult, AgentError> {
    state.transition(AgentPhase::Failed);
    tracing::warn!(error = %err, steps = state.steps(), "agent run failed");
    Err(err)
}

/// 执行 ReAct 循环
///
/// task_prompt 作为第一条 User 消息写入 thread；每轮 plan -> 解析输出 ->
/// 若 ToolCall 则执行并写回 Observation，若 Response 则结束。
pub async fn react_loop(
    planner: &Planner,
    executor: &ToolExecutor,
    recovery: &RecoveryEngine,
    thread: &mut ConversationThread,
    task_prompt: &str,
    limits: LoopLimits,
) -> Result<ReactResult, AgentError> {
    thread.push(Message::user(task_prompt.to_string()));

    let (init_prompt, init_completion, _) = planner.token_usage();
    let mut state = RunState::new();
    let mut invocations: Vec<ToolInvocation> = Vec::new();

    loop {
        if state.steps() >= limits.max_steps {
            return fail(
                &mut state,
                AgentError::ExceededSteps {
                    limit: limits.max_steps,
                    what: "decision steps",
                },
            );
        }
        state.transition(AgentPhase::AwaitingDecision);
        tracing::debug!(step = state.steps(), "planning");

        let output = match planner.plan(thread.messages()).await {
            Ok(o) => o,
            Err(e) => match recovery.handle(&e) {
                RecoveryAction::RetryWithPrompt(prompt) => {
                    thread.push(Message::user(prompt));
                    continue;
                }
                RecoveryAction::Abort => return fail(&mut state, e),
            },
        };

        let tool_call = match parse_llm_output(&output) {
            Ok(PlannerOutput::Response(resp)) => {
                state.transition(AgentPhase::Done);
                thread.push(Message::assistant(resp.clone()));

                let (cur_prompt, cur_completion, _) = planner.token_usage();
                let prompt_tokens = cur_prompt.saturating_sub(init_prompt);
                let completion_tokens = cur_completion.saturating_sub(init_completion);
                return Ok(ReactResult {
                    response: resp,
                    invocations,
                    thread_id: thread.id(),
                    steps: state.steps(),
                    token_usage: (
                        prompt_tokens,
                        completion_tokens,
                        prompt_tokens + completion_tokens,
                    ),
                });
            }
            Ok(PlannerOutput::ToolCall(tc)) => tc,
            Err(e) => match recovery.handle(&e) {
                // 解析失败（如 JSON 错误），带提示重试
                RecoveryAction::RetryWithPrompt(prompt) => {
                    thread.push(Message::assistant(output));
                    thread.push(Message::user(prompt));
                    continue;
                }
                RecoveryAction::Abort => return fail(&mut state, e),
            },
        };

        let Some(kind) = ToolKind::from_name(&tool_call.tool) else {
            let e = AgentError::HallucinatedTool(tool_call.tool.clone());
            match recovery.handle(&e) {
                RecoveryAction::RetryWithPrompt(prompt) => {
                    tracing::warn!(tool = %tool_call.tool, "policy requested unknown tool");
                    thread.push(Message::assistant(output));
                    thread.push(Message::user(prompt));
                    continue;
                }
                RecoveryAction::Abort => return fail(&mut state, e),
            }
        };

        if state.tool_invocations() >= limits.max_tool_invocations {
            return fail(
                &mut state,
                AgentError::ExceededSteps {
                    limit: limits.max_tool_invocations,
                    what: "tool invocations",
                },
            );
        }
        state.transition(AgentPhase::ExecutingTool);
        tracing::info!(tool = %kind, invocation = state.tool_invocations(), "tool call");

        let invocation = match executor.execute(kind, &tool_call.input).await {
            Ok(inv) => inv,
            Err(e) => return fail(&mut state, e),
        };
        let observation = invocation.observation();
        tracing::debug!(tool = %kind, observation = %preview(&observation), "observation");

        // 将工具调用与结果写回对话，供下一轮 Plan 使用
        thread.push(Message::assistant(format!(
            "Tool call: {} | Input: {}",
            kind, tool_call.input
        )));
        thread.push(Message::user(format!(
            "Observation from {}: {}",
            kind, observation
        )));
        invocations.push(invocation);
    }
}
