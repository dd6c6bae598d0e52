use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Backend selection: "voyage" (HTTP API) or "stub" (deterministic, offline)
    pub provider: String,
    pub model: String,
    /// Vector dimension used by the stub provider; the real provider reports its own
    pub dimension: usize,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            model: "voyage-3.5-lite".to_string(),
            dimension: 256,
            batch_size: 32,
        }
    }
}

/// Chunk store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend selection: "lance" (persistent) or "memory" (in-process)
    pub backend: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
        }
    }
}

/// Chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 500,
        }
    }
}

/// Retrieval and web search limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub top_k: usize,
    pub max_web_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_web_results: 3,
        }
    }
}

/// Session store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Messages included when formatting history for prompts
    pub history_limit: usize,
    /// Hard cap per session; oldest messages are evicted beyond this
    pub max_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: 5,
            max_messages: 200,
        }
    }
}

/// Completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Backend selection: "openai" (OpenAI-compatible HTTP API) or "stub"
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 500,
        }
    }
}

/// Web search backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Backend selection: "duckduckgo" or "stub"
    pub provider: String,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            provider: "stub".to_string(),
        }
    }
}

/// One routable category handled by a specialist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialistConfig {
    /// Category identifier, lowercase (e.g. "it")
    pub name: String,
    /// Display label used in prompts and transcripts (e.g. "IT")
    pub label: String,
    /// Keyword hints fed to the classification prompt
    pub keywords: Vec<String>,
    /// Context terms appended to web search queries for this category
    pub search_context: Vec<String>,
    /// Fixed list of internal document file names searched lexically
    pub doc_files: Vec<String>,
    /// Human contact channel named in fallback answers
    pub contact: String,
}

/// Supervisor router configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouterConfig {
    /// Override for the internal documents root; defaults to the system storage dir
    pub docs_dir: Option<String>,
    pub specialists: Vec<SpecialistConfig>,
}

impl RouterConfig {
    /// The IT / Finance pair shipped in the default template
    pub fn default_specialists() -> Vec<SpecialistConfig> {
        vec![
            SpecialistConfig {
                name: "it".to_string(),
                label: "IT".to_string(),
                keywords: [
                    "technology", "software", "hardware", "networks", "passwords",
                    "security", "troubleshooting", "VPN", "laptops", "servers",
                    "email", "printers", "wifi",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                search_context: ["IT support", "technical help", "enterprise", "corporate"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                doc_files: [
                    "vpn_setup.txt",
                    "software_approval.txt",
                    "hardware_requests.txt",
                    "troubleshooting.txt",
                    "security_policies.txt",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                contact: "helpdesk@company.com or ext. 1234".to_string(),
            },
            SpecialistConfig {
                name: "finance".to_string(),
                label: "Finance".to_string(),
                keywords: [
                    "budget", "expenses", "reimbursement", "payroll", "salary",
                    "invoices", "payments", "accounting", "taxes", "billing",
                    "receipts", "procurement",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                search_context: [
                    "corporate finance",
                    "business finance",
                    "enterprise",
                    "company policy",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                doc_files: [
                    "reimbursement_policy.txt",
                    "budget_procedures.txt",
                    "payroll_info.txt",
                    "expense_guidelines.txt",
                    "financial_reports.txt",
                ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
                contact: "finance@company.com or ext. 5678".to_string(),
            },
        ]
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Main configuration for ragdesk
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
    pub chunking: ChunkingConfig,
    pub search: SearchConfig,
    pub session: SessionConfig,
    pub llm: LlmConfig,
    pub websearch: WebSearchConfig,
    pub router: RouterConfig,
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from config.toml file
    /// First tries to load from system config directory, falls back to embedded template
    pub fn load() -> Result<Self> {
        // Try to load from system config directory
        let config_path = crate::storage::get_system_config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Config doesn't exist, create from template
            let template_content = include_str!("../config-templates/default.toml");
            let config: Self = toml::from_str(template_content)?;

            // Save to system config directory
            if let Some(parent) = config_path.parent() {
                if !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&config_path, template_content)?;

            Ok(config)
        }
    }

    /// Configuration used by tests and offline runs: every backend is a stub
    pub fn stub() -> Self {
        let mut config = Self::default();
        config.router.specialists = RouterConfig::default_specialists();
        config
    }
}
