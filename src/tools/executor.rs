//! 工具执行器
//!
//! 持有 ToolRegistry 与全局超时，execute(kind, input) 在超时内调用对应工具，
//! 再按工具声明的 FailurePolicy 处理失败：Fallback 替换为固定文本、Observe 交回给模型、Abort 终止运行。
//! 每次调用输出结构化审计日志（JSON）。

use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time::timeout;

use crate::core::{AgentError, ToolError};
use crate::tools::{FailurePolicy, ToolKind, ToolRegistry};

/// 单次工具调用记录（只在本次运行内保留）
#[derive(Debug, Clone, Serialize)]
pub struct ToolInvocation {
    pub tool: ToolKind,
    pub input: String,
    pub output: Result<String, String>,
}

impl ToolInvocation {
    /// 写回对话的 Observation 文本
    pub fn observation(&self) -> String {
        match &self.output {
            Ok(out) => out.clone(),
            Err(e) => format!("Error: {}", e),
        }
    }
}

/// 工具执行器：对每次调用施加超时，并按失败策略映射结果
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具；只有 Abort 策略的失败（或工具未注册）会返回 Err
    pub async fn execute(&self, kind: ToolKind, input: &str) -> Result<ToolInvocation, AgentError> {
        let tool = self
            .registry
            .get(kind)
            .ok_or_else(|| AgentError::HallucinatedTool(kind.name().to_string()))?;

        let start = Instant::now();
        let result = match timeout(self.timeout, tool.execute(input)).await {
            Ok(r) => r.map_err(Failure::Tool),
            Err(_) => Err(Failure::Timeout),
        };
        let policy = tool.failure_policy();

        let outcome = match (&result, policy) {
            (Ok(_), _) => "ok",
            (Err(_), FailurePolicy::Fallback(_)) => "fallback",
            (Err(Failure::Timeout), _) => "timeout",
            (Err(_), _) => "error",
        };
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": kind.name(),
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "input_preview": preview(input),
        });
        tracing::info!(audit = %audit, "tool");

        let output = match result {
            Ok(content) => Ok(content),
            Err(failure) => match policy {
                FailurePolicy::Fallback(text) => {
                    tracing::warn!(tool = %kind, error = %failure, "tool failed, using fallback output");
                    Ok(text.to_string())
                }
                FailurePolicy::Observe => {
                    tracing::warn!(tool = %kind, error = %failure, "tool failed, reporting to agent");
                    Err(failure.to_string())
                }
                FailurePolicy::Abort => {
                    tracing::error!(tool = %kind, error = %failure, "tool failed, aborting run");
                    return Err(failure.into_agent_error(kind));
                }
            },
        };

        Ok(ToolInvocation {
            tool: kind,
            input: input.to_string(),
            output,
        })
    }
}

#[derive(Debug, thiserror::Error)]
enum Failure {
    #[error(transparent)]
    Tool(ToolError),
    #[error("timed out")]
    Timeout,
}

impl Failure {
    fn into_agent_error(self, kind: ToolKind) -> AgentError {
        match self {
            Failure::Tool(source) => AgentError::ToolExecutionFailed {
                tool: kind.name().to_string(),
                source,
            },
            Failure::Timeout => AgentError::ToolTimeout(kind.name().to_string()),
        }
    }
}

fn preview(input: &str) -> String {
    if input.chars().count() > 200 {
        format!("{}...", input.chars().take(200).collect::<String>())
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::tools::Tool;

    struct Failing {
        kind: ToolKind,
        policy: FailurePolicy,
    }

    #[async_trait]
    impl Tool for Failing {
        fn kind(&self) -> ToolKind {
            self.kind
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn failure_policy(&self) -> FailurePolicy {
            self.policy
        }

        async fn execute(&self, _input: &str) -> Result<String, ToolError> {
            Err(ToolError::Request("boom".to_string()))
        }
    }

    struct Slow;

    #[async_trait]
    impl Tool for Slow {
        fn kind(&self) -> ToolKind {
            ToolKind::General
        }

        fn description(&self) -> &str {
            "never returns in time"
        }

        async fn execute(&self, _input: &str) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("late".to_string())
        }
    }

    fn executor_with(tool: impl Tool + 'static, timeout_secs: u64) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        registry.register(tool);
        ToolExecutor::new(registry, timeout_secs)
    }

    #[tokio::test]
    async fn test_fallback_policy_substitutes_text() {
        let executor = executor_with(
            Failing {
                kind: ToolKind::Code,
                policy: FailurePolicy::Fallback("degraded"),
            },
            5,
        );
        let inv = executor.execute(ToolKind::Code, "write code").await.unwrap();
        assert_eq!(inv.output, Ok("degraded".to_string()));
        assert_eq!(inv.observation(), "degraded");
    }

    #[tokio::test]
    async fn test_observe_policy_reports_error_to_agent() {
        let executor = executor_with(
            Failing {
                kind: ToolKind::Search,
                policy: FailurePolicy::Observe,
            },
            5,
        );
        let inv = executor.execute(ToolKind::Search, "news").await.unwrap();
        assert!(inv.output.is_err());
        assert!(inv.observation().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_abort_policy_propagates() {
        let executor = executor_with(
            Failing {
                kind: ToolKind::General,
                policy: FailurePolicy::Abort,
            },
            5,
        );
        let err = executor.execute(ToolKind::General, "explain").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecutionFailed { ref tool, .. } if tool == "general_assistant"));
    }

    #[tokio::test]
    async fn test_timeout_with_abort_policy() {
        let executor = executor_with(Slow, 1);
        let err = executor.execute(ToolKind::General, "slow").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolTimeout(_)));
    }

    #[tokio::test]
    async fn test_unregistered_tool_is_hallucination() {
        let executor = ToolExecutor::new(ToolRegistry::new(), 5);
        let err = executor.execute(ToolKind::Search, "q").await.unwrap_err();
        assert!(matches!(err, AgentError::HallucinatedTool(_)));
    }
}
