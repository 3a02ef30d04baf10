//! Agent 运行状态机
//!
//! Idle -> AwaitingDecision -> (ExecutingTool -> AwaitingDecision)* -> Done | Failed。
//! 决策输出无法使用而需要重试时停留在 AwaitingDecision，步数照样累加。
//! Done 与 Failed 为终态；任何非法迁移都视为编程错误，只记录日志不改变状态。

use serde::Serialize;

/// 单次 Agent 运行所处阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentPhase {
    Idle,
    AwaitingDecision,
    ExecutingTool,
    Done,
    Failed,
}

impl AgentPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, AgentPhase::Done | AgentPhase::Failed)
    }

    pub fn can_transition_to(self, next: AgentPhase) -> bool {
        use AgentPhase::*;
        match (self, next) {
            (Idle, AwaitingDecision) => true,
            (AwaitingDecision, AwaitingDecision | ExecutingTool | Done | Failed) => true,
            (ExecutingTool, AwaitingDecision | Failed) => true,
            (Idle, Failed) => true,
            _ => false,
        }
    }
}

/// 运行状态：当前阶段 + 已执行步数
#[derive(Clone, Debug)]
pub struct RunState {
    phase: AgentPhase,
    steps: usize,
    tool_invocations: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            phase: AgentPhase::Idle,
            steps: 0,
            tool_invocations: 0,
        }
    }
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> AgentPhase {
        self.phase
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn tool_invocations(&self) -> usize {
        self.tool_invocations
    }

    /// 迁移到 next；非法迁移返回 false 且保持原状态
    pub fn transition(&mut self, next: AgentPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(from = ?self.phase, to = ?next, "illegal agent phase transition");
            return false;
        }
        tracing::debug!(from = ?self.phase, to = ?next, "agent phase");
        match next {
            AgentPhase::AwaitingDecision => self.steps += 1,
            AgentPhase::ExecutingTool => self.tool_invocations += 1,
            _ => {}
        }
        self.phase = next;
        true
    }
}
