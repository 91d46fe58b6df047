//! 编排器构建器：按配置装配全部组件
//!
//! REPL 与 HTTP 服务共用同一套装配逻辑；测试可用 `with_*` 注入替身。

use std::sync::Arc;
use std::time::Duration;

use crate::config::{AppConfig, OracleSection};
use crate::core::{ChatError, Orchestrator};
use crate::gateway::{BackendContextProvider, ContextProvider, IntentOracle, MemorySessionStore, SessionStore};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient, DEEPSEEK_BASE_URL, OLLAMA_BASE_URL};
use crate::tools::{build_registry, BackendClient, ExecutionDispatcher, OperationRegistry};

/// 根据配置与环境变量选择 LLM 后端（Ollama / OpenAI / DeepSeek / Mock）
pub fn create_llm_from_config(cfg: &OracleSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    // base_url 仍是 Ollama 默认值时，云端 provider 使用各自的官方端点
    let custom_base = cfg
        .base_url
        .as_deref()
        .filter(|url| url.trim_end_matches('/') != OLLAMA_BASE_URL);

    match provider.as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        "deepseek" => match std::env::var("DEEPSEEK_API_KEY") {
            Ok(key) => {
                tracing::info!("Using DeepSeek LLM ({})", cfg.model);
                Arc::new(OpenAiClient::new(
                    Some(custom_base.unwrap_or(DEEPSEEK_BASE_URL)),
                    &cfg.model,
                    Some(&key),
                ))
            }
            Err(_) => {
                tracing::warn!("DEEPSEEK_API_KEY not set, using Mock LLM");
                Arc::new(MockLlmClient)
            }
        },
        "openai" => match std::env::var("OPENAI_API_KEY") {
            Ok(key) => {
                tracing::info!("Using OpenAI LLM ({})", cfg.model);
                Arc::new(OpenAiClient::new(custom_base, &cfg.model, Some(&key)))
            }
            Err(_) => {
                tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
                Arc::new(MockLlmClient)
            }
        },
        "ollama" => {
            let base = cfg.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            tracing::info!("Using Ollama LLM ({}) at {}", cfg.model, base);
            Arc::new(OpenAiClient::new(Some(base), &cfg.model, None))
        }
        other => {
            tracing::warn!("Unknown oracle provider '{}', using Mock LLM", other);
            Arc::new(MockLlmClient)
        }
    }
}

/// 编排器构建器：未注入的组件按配置创建
pub struct OrchestratorBuilder {
    config: AppConfig,
    llm: Option<Arc<dyn LlmClient>>,
    store: Option<Arc<dyn SessionStore>>,
    context_provider: Option<Arc<dyn ContextProvider>>,
    registry: Option<OperationRegistry>,
}

impl OrchestratorBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            llm: None,
            store: None,
            context_provider: None,
            registry: None,
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_context_provider(mut self, provider: Arc<dyn ContextProvider>) -> Self {
        self.context_provider = Some(provider);
        self
    }

    /// 使用自定义操作注册表（默认注册全部餐厅操作）
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 读取 system prompt 覆盖文件；读取失败时退回内置 prompt
    fn load_system_prompt(&self) -> Option<String> {
        let path = self.config.oracle.system_prompt_path.as_ref()?;
        match std::fs::read_to_string(path) {
            Ok(prompt) => Some(prompt),
            Err(e) => {
                tracing::warn!("Cannot read system prompt {:?} ({}), using built-in prompt", path, e);
                None
            }
        }
    }

    pub fn build(mut self) -> Result<Orchestrator, ChatError> {
        let cfg = &self.config;
        let backend = Arc::new(BackendClient::new(&cfg.backend.base_url, cfg.backend.timeout_secs)?);

        let registry = match self.registry.take() {
            Some(registry) => registry,
            None => build_registry(backend.clone())?,
        };
        let registry = Arc::new(registry);
        tracing::info!(operations = registry.len(), "operation registry ready");

        let llm = self
            .llm
            .clone()
            .unwrap_or_else(|| create_llm_from_config(&cfg.oracle));
        let mut oracle = IntentOracle::new(llm, registry.clone())
            .with_timeout(Duration::from_secs(cfg.oracle.timeout_secs));
        if let Some(prompt) = self.load_system_prompt() {
            oracle = oracle.with_system_prompt(prompt);
        }

        let store = self.store.clone().unwrap_or_else(|| {
            Arc::new(MemorySessionStore::new(cfg.app.history_limit, cfg.session.ttl_secs))
        });
        let context_provider = self
            .context_provider
            .clone()
            .unwrap_or_else(|| Arc::new(BackendContextProvider::new(backend.clone())));
        let dispatcher = ExecutionDispatcher::new(registry, cfg.backend.timeout_secs);

        Ok(Orchestrator::new(store, oracle, dispatcher, context_provider)
            .with_context_timeout(Duration::from_secs(cfg.backend.context_timeout_secs)))
    }
}
