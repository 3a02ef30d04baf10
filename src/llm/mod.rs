//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Gemini / Mock），以及按配置选择后端

pub mod gemini;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

pub use gemini::{create_gemini_client, gemini_api_key, GEMINI_BASE_URL, GEMINI_FLASH};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, SamplingParams};

use crate::config::AppConfig;

/// 实际使用的 LLM 后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Gemini,
    OpenAi,
    Mock,
}

/// 读取 OPENAI_API_KEY；空值视为未设置
pub fn openai_api_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}

/// 按 provider 与可用的 Key 选后端：两种 Key 都有时听 provider 的，只有一种时用那一种
pub fn select_backend(provider: &str, has_gemini_key: bool, has_openai_key: bool) -> LlmBackend {
    let provider = provider.trim().to_lowercase();
    match (has_gemini_key, has_openai_key) {
        (true, true) if provider == "openai" => LlmBackend::OpenAi,
        (true, _) => LlmBackend::Gemini,
        (false, true) => LlmBackend::OpenAi,
        (false, false) => LlmBackend::Mock,
    }
}

/// model 名是否属于该后端（Gemini 模型都以 gemini 开头）
pub fn model_fits_backend(backend: LlmBackend, model: &str) -> bool {
    let is_gemini_model = model.trim().to_lowercase().starts_with("gemini");
    match backend {
        LlmBackend::Gemini => is_gemini_model,
        LlmBackend::OpenAi => !is_gemini_model,
        LlmBackend::Mock => true,
    }
}

/// 根据配置与环境变量选择 LLM 后端（Gemini / OpenAI 兼容 / Mock）
///
/// model 与 sampling 由调用方给出：决策模型用 [llm] 段，通用助手工具用 [tools.general] 段。
pub fn create_llm(cfg: &AppConfig, model: &str, sampling: SamplingParams) -> Arc<dyn LlmClient> {
    let timeout = cfg.llm.timeouts.request;
    let openai_key = openai_api_key();
    let backend = select_backend(
        &cfg.llm.provider,
        gemini_api_key().is_some(),
        openai_key.is_some(),
    );
    if !model_fits_backend(backend, model) {
        tracing::error!(
            ?backend,
            model,
            provider = %cfg.llm.provider,
            "configured model does not belong to the selected LLM backend, calls will likely fail"
        );
    }

    match backend {
        LlmBackend::Gemini => {
            tracing::info!(model, "Using Gemini LLM");
            Arc::new(create_gemini_client(
                cfg.llm.base_url.as_deref(),
                Some(model),
                sampling,
                timeout,
            ))
        }
        LlmBackend::OpenAi => {
            tracing::info!(model, "Using OpenAI-compatible LLM");
            Arc::new(
                OpenAiClient::new(cfg.llm.base_url.as_deref(), model, openai_key.as_deref())
                    .with_sampling(sampling)
                    .with_timeout(timeout),
            )
        }
        LlmBackend::Mock => {
            tracing::warn!("No GEMINI_API_KEY / GOOGLE_API_KEY / OPENAI_API_KEY set, using Mock LLM");
            Arc::new(MockLlmClient::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_key_decides_backend() {
        assert_eq!(select_backend("gemini", false, true), LlmBackend::OpenAi);
        assert_eq!(select_backend("openai", true, false), LlmBackend::Gemini);
        assert_eq!(select_backend("gemini", false, false), LlmBackend::Mock);
    }

    #[test]
    fn test_provider_breaks_tie() {
        assert_eq!(select_backend("gemini", true, true), LlmBackend::Gemini);
        assert_eq!(select_backend(" OpenAI ", true, true), LlmBackend::OpenAi);
    }

    #[test]
    fn test_gemini_model_on_openai_backend_is_mismatch() {
        assert!(!model_fits_backend(LlmBackend::OpenAi, "gemini-1.5-flash"));
        assert!(model_fits_backend(LlmBackend::OpenAi, "gpt-4o-mini"));
        assert!(model_fits_backend(LlmBackend::Gemini, "gemini-1.5-flash"));
        assert!(!model_fits_backend(LlmBackend::Gemini, "gpt-4o-mini"));
        assert!(model_fits_backend(LlmBackend::Mock, "anything"));
    }
}
