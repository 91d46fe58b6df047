//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `CHHOTU__*` 覆盖（双下划线表示嵌套，如 `CHHOTU__ORACLE__PROVIDER=openai`）。
//! API Key 只从环境变量读取（`OPENAI_API_KEY` / `DEEPSEEK_API_KEY`），不写入配置文件。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::ChatError;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub session: SessionSection,
    pub oracle: OracleSection,
    pub backend: BackendSection,
    pub server: ServerSection,
}

/// [app] 段：应用名、对话历史上限
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    pub history_limit: usize,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            history_limit: crate::memory::DEFAULT_HISTORY_LIMIT,
        }
    }
}

/// [session] 段：会话 TTL（滑动）与过期清理周期
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            cleanup_interval_secs: 300,
        }
    }
}

/// [oracle] 段：LLM 后端选择
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OracleSection {
    /// ollama / openai / deepseek / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    /// 覆盖内置 system prompt 的文件
    pub system_prompt_path: Option<PathBuf>,
}

impl Default for OracleSection {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            base_url: Some(crate::llm::OLLAMA_BASE_URL.to_string()),
            timeout_secs: 120,
            system_prompt_path: None,
        }
    }
}

/// [backend] 段：餐厅管理后端
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackendSection {
    pub base_url: String,
    /// 单次操作调用超时（秒）
    pub timeout_secs: u64,
    /// 获取接地上下文的超时（秒）
    pub context_timeout_secs: u64,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_secs: 30,
            context_timeout_secs: 10,
        }
    }
}

/// [server] 段：HTTP 监听地址
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 从 config 目录加载配置，环境变量 CHHOTU__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path，则追加该文件（可覆盖前面的键）；文件不存在时报错
/// 3. 最后叠加环境变量 CHHOTU__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, ChatError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix("CHHOTU")
            .separator("__")
            .try_parsing(true),
    );

    builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ChatError::Config(e.to_string()))
}
