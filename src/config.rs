//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TASKBEE__*` 覆盖（双下划线表示嵌套，如 `TASKBEE__SERVER__PORT=8080`）。
//! 兼容旧部署的环境变量：`ORIGIN`（允许的 CORS 来源）、`PORT`（监听端口）。
//! API Key 不进配置文件，只从环境变量读取（见 llm / tools 各客户端）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub server: ServerSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
}

/// [app] 段：上传目录、文本截断上限、单次任务总超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 上传文件落盘目录（只写不删）
    pub upload_dir: PathBuf,
    /// 提取文本进入 prompt 前保留的字符数
    pub truncate_chars: usize,
    /// 整条流水线（提取 + Agent）的超时（秒）
    pub task_timeout_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            upload_dir: PathBuf::from("uploads"),
            truncate_chars: 1000,
            task_timeout_secs: 300,
        }
    }
}

/// [server] 段：监听地址、CORS、上传大小、失败时是否降级为 200
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
    /// 唯一允许的浏览器来源；未设置时放开所有来源
    pub allowed_origin: Option<String>,
    pub max_upload_bytes: usize,
    /// true：提取 / Agent 失败时仍返回 200 且不带 result（旧行为）；false：按错误类型返回 4xx/5xx
    pub degrade_on_pipeline_error: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origin: None,
            max_upload_bytes: 25 * 1024 * 1024,
            degrade_on_pipeline_error: false,
        }
    }
}

/// [llm] 段：决策模型（ReAct policy）的后端、采样参数与超时
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：gemini / openai；实际选择还取决于环境变量里有哪个 API Key
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-flash".to_string(),
            base_url: None,
            temperature: 0.2,
            max_tokens: 2048,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次补全请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [agent] 段：工具调用次数与决策轮数上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_tool_invocations: usize,
    /// 包括 JSON 解析失败后的重试在内的决策轮数
    pub max_steps: usize,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_tool_invocations: 10,
            max_steps: 20,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
    pub search: SearchSection,
    pub code: CodeSection,
    pub general: GeneralSection,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 90,
            search: SearchSection::default(),
            code: CodeSection::default(),
            general: GeneralSection::default(),
        }
    }
}

/// [tools.search] 段：Tavily 搜索
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub endpoint: String,
    pub max_results: usize,
    pub timeout_secs: u64,
    pub max_result_chars: usize,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tavily.com/search".to_string(),
            max_results: 5,
            timeout_secs: 15,
            max_result_chars: 8000,
        }
    }
}

/// [tools.code] 段：Hugging Face 推理接口上的代码生成模型
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodeSection {
    pub endpoint: String,
    pub max_length: u32,
    pub num_beams: u32,
    pub early_stopping: bool,
    pub timeout_secs: u64,
}

impl Default for CodeSection {
    fn default() -> Self {
        Self {
            endpoint: "https://api-inference.huggingface.co/models/Salesforce/codet5-base"
                .to_string(),
            max_length: 1000,
            num_beams: 4,
            early_stopping: true,
            timeout_secs: 60,
        }
    }
}

/// [tools.general] 段：通用助手模型；model 未设置时沿用 [llm].model
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSection {
    pub model: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.2,
            max_tokens: 2048,
        }
    }
}

/// 从 config 目录加载配置，环境变量 TASKBEE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 叠加环境变量 TASKBEE__*（双下划线表示嵌套键）
/// 4. 最后应用旧变量 ORIGIN / PORT
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TASKBEE")
            .separator("__")
            .try_parsing(true),
    );

    builder = builder
        .set_override_option("server.allowed_origin", non_empty_env("ORIGIN"))?
        .set_override_option("server.port", non_empty_env("PORT"))?;

    let c = builder.build()?;
    c.try_deserialize()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
