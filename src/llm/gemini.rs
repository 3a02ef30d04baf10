//! Gemini 客户端（走 Google 提供的 OpenAI 兼容接口）
//!
//! - Base URL: https://generativelanguage.googleapis.com/v1beta/openai/
//! - 默认模型: gemini-1.5-flash

use crate::llm::{OpenAiClient, SamplingParams};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const GEMINI_FLASH: &str = "gemini-1.5-flash";

/// 读取 Gemini API Key：优先 GEMINI_API_KEY，其次 GOOGLE_API_KEY
pub fn gemini_api_key() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
        .filter(|k| !k.trim().is_empty())
}

/// 创建 Gemini 客户端；base_url 为 None 时使用官方兼容端点
pub fn create_gemini_client(
    base_url: Option<&str>,
    model: Option<&str>,
    sampling: SamplingParams,
    timeout_secs: u64,
) -> OpenAiClient {
    let api_key = gemini_api_key().unwrap_or_else(|| "placeholder".to_string());
    let model = model.unwrap_or(GEMINI_FLASH);

    OpenAiClient::new(
        Some(base_url.unwrap_or(GEMINI_BASE_URL)),
        model,
        Some(api_key.as_str()),
    )
    .with_sampling(sampling)
    .with_timeout(timeout_secs)
}
