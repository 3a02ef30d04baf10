//! 代码助手工具：Hugging Face 推理接口上的代码生成模型
//!
//! 请求体 `{inputs, parameters: {max_length, num_beams, early_stopping}}`，
//! 响应取 `[0].generated_text`。失败时由执行器替换为固定文本。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::CodeSection;
use crate::core::ToolError;
use crate::tools::{FailurePolicy, Tool, ToolKind};

/// 模型返回空结果时的输出
pub const NO_CODE_GENERATED: &str = "No code generated.";
/// 调用失败时的替代输出
pub const CODE_GENERATION_FAILED: &str = "An error occurred while generating code.";

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_length: u32,
    num_beams: u32,
    early_stopping: bool,
}

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
}

pub struct CodeTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    parameters: GenerationParameters,
}

/// 解析推理接口响应：取第一项的 generated_text，缺失或为空时返回 NO_CODE_GENERATED
pub fn interpret_generation(body: &str) -> Result<String, ToolError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| ToolError::Decode(e.to_string()))?;
    let text = value
        .get(0)
        .and_then(|first| first.get("generated_text"))
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty());
    Ok(text.unwrap_or(NO_CODE_GENERATED).to_string())
}

impl CodeTool {
    pub fn new(cfg: &CodeSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: cfg.endpoint.clone(),
            api_key: std::env::var("HF_API_KEY").ok().filter(|k| !k.is_empty()),
            parameters: GenerationParameters {
                max_length: cfg.max_length,
                num_beams: cfg.num_beams,
                early_stopping: cfg.early_stopping,
            },
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[async_trait]
impl Tool for CodeTool {
    fn kind(&self) -> ToolKind {
        ToolKind::Code
    }

    fn description(&self) -> &str {
        "Use this tool for solving programming tasks, generating code, debugging, or any task involving coding."
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fallback(CODE_GENERATION_FAILED)
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(ToolError::MissingCredentials("HF_API_KEY"))?;
        tracing::info!(chars = input.chars().count(), "code tool request");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(key)
            .json(&GenerationRequest {
                inputs: input,
                parameters: &self.parameters,
            })
            .send()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ToolError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(ToolError::Generation {
                status: status.as_u16(),
                body,
            });
        }
        interpret_generation(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_text_is_taken_from_first_item() {
        let body = r#"[{"generated_text": "def add(a, b):\n    return a + b"}, {"generated_text": "x"}]"#;
        assert_eq!(
            interpret_generation(body).unwrap(),
            "def add(a, b):\n    return a + b"
        );
    }

    #[test]
    fn test_generated_text_keeps_leading_indentation() {
        let body = r#"[{"generated_text": "    return a + b\n"}]"#;
        assert_eq!(interpret_generation(body).unwrap(), "    return a + b\n");
    }

    #[test]
    fn test_empty_or_missing_text_means_no_code() {
        assert_eq!(interpret_generation("[]").unwrap(), NO_CODE_GENERATED);
        assert_eq!(
            interpret_generation(r#"[{"generated_text": "  "}]"#).unwrap(),
            NO_CODE_GENERATED
        );
        assert_eq!(
            interpret_generation(r#"{"error": "loading"}"#).unwrap(),
            NO_CODE_GENERATED
        );
    }

    #[test]
    fn test_undecodable_body_is_error() {
        let err = interpret_generation("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ToolError::Decode(_)));
    }

    #[tokio::test]
    async fn test_missing_key_fails_with_fallback_policy() {
        let mut tool = CodeTool::new(&CodeSection::default());
        tool.api_key = None;
        assert!(matches!(
            tool.execute("fizzbuzz").await,
            Err(ToolError::MissingCredentials("HF_API_KEY"))
        ));
        assert_eq!(
            tool.failure_policy(),
            FailurePolicy::Fallback(CODE_GENERATION_FAILED)
        );
    }
}
