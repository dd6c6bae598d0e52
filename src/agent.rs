use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::embedding::create_embedding_provider;
use crate::ingest::Indexer;
use crate::llm::create_completion_provider;
use crate::pipeline::ChatPipeline;
use crate::router::SupervisorRouter;
use crate::session::SessionStore;
use crate::store::{create_chunk_store, ChunkStore};
use crate::websearch::{create_web_search_provider, StubWebSearch, WebSearchProvider};

/// The fully wired service components. Exists only when initialization got
/// far enough to serve requests.
pub struct AgentCore {
    pub sessions: Arc<SessionStore>,
    pub store: Arc<dyn ChunkStore>,
    pub indexer: Indexer,
    pub pipeline: ChatPipeline,
    pub router: SupervisorRouter,
}

/// Initialization outcome. Embeddings, the chunk store and the completion
/// backend are required; web search is not, since the router degrades to
/// internal documents without it.
pub enum AgentStatus {
    Ready(AgentCore),
    Degraded { core: AgentCore, reason: String },
    Failed { error: String },
}

/// The service's single lifecycle object. Handlers check its status
/// explicitly; there is no nullable global to probe.
pub struct Agent {
    status: AgentStatus,
    components: Vec<(String, String)>,
}

impl Agent {
    /// Wire every component from config. Never panics; any outcome is a
    /// well-formed Agent whose status says what happened.
    pub async fn init(config: &Config) -> Agent {
        let mut components: Vec<(String, String)> = Vec::new();
        let mut degraded_reason: Option<String> = None;

        let embeddings = match create_embedding_provider(&config.embedding) {
            Ok(provider) => {
                components.push(("embedding".to_string(), "ready".to_string()));
                provider
            }
            Err(e) => return Self::failed("embedding", e, components),
        };

        let store = match create_chunk_store(config, embeddings).await {
            Ok(store) => {
                components.push(("store".to_string(), "ready".to_string()));
                store
            }
            Err(e) => return Self::failed("store", e, components),
        };

        let llm = match create_completion_provider(&config.llm) {
            Ok(provider) => {
                components.push(("llm".to_string(), "ready".to_string()));
                provider
            }
            Err(e) => return Self::failed("llm", e, components),
        };

        // Web search is optional: specialists already treat a failing
        // provider as "no web evidence".
        let websearch: Arc<dyn WebSearchProvider> =
            match create_web_search_provider(&config.websearch) {
                Ok(provider) => {
                    components.push(("websearch".to_string(), "ready".to_string()));
                    provider
                }
                Err(e) => {
                    warn!("Web search unavailable, running without it: {:#}", e);
                    let reason = format!("websearch: {:#}", e);
                    components.push(("websearch".to_string(), reason.clone()));
                    degraded_reason = Some(reason);
                    Arc::new(StubWebSearch::failing())
                }
            };

        let sessions = Arc::new(SessionStore::new(&config.session));
        let indexer = Indexer::new(config, store.clone());
        let pipeline = ChatPipeline::new(config, sessions.clone(), store.clone(), llm.clone());
        let router = match SupervisorRouter::new(config, llm, websearch) {
            Ok(router) => {
                components.push(("router".to_string(), "ready".to_string()));
                router
            }
            Err(e) => return Self::failed("router", e, components),
        };

        let core = AgentCore {
            sessions,
            store,
            indexer,
            pipeline,
            router,
        };

        let status = match degraded_reason {
            Some(reason) => {
                info!(reason = %reason, "Agent initialized degraded");
                AgentStatus::Degraded { core, reason }
            }
            None => {
                info!("Agent initialized");
                AgentStatus::Ready(core)
            }
        };

        Agent { status, components }
    }

    fn failed(component: &str, error: anyhow::Error, mut components: Vec<(String, String)>) -> Agent {
        let message = format!("{:#}", error);
        warn!(component, "Agent initialization failed: {}", message);
        components.push((component.to_string(), message.clone()));
        Agent {
            status: AgentStatus::Failed {
                error: format!("{}: {}", component, message),
            },
            components,
        }
    }

    /// The wired components, if the agent can serve
    pub fn core(&self) -> Option<&AgentCore> {
        match &self.status {
            AgentStatus::Ready(core) | AgentStatus::Degraded { core, .. } => Some(core),
            AgentStatus::Failed { .. } => None,
        }
    }

    /// The wired components, or the initialization error
    pub fn try_core(&self) -> Result<&AgentCore> {
        match &self.status {
            AgentStatus::Ready(core) | AgentStatus::Degraded { core, .. } => Ok(core),
            AgentStatus::Failed { error } => {
                anyhow::bail!("Agent initialization failed: {}", error)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.core().is_some()
    }

    pub fn status_label(&self) -> &'static str {
        match &self.status {
            AgentStatus::Ready(_) => "ready",
            AgentStatus::Degraded { .. } => "degraded",
            AgentStatus::Failed { .. } => "failed",
        }
    }

    /// The error that stopped initialization, if any
    pub fn error(&self) -> Option<&str> {
        match &self.status {
            AgentStatus::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Per-component status map for the health endpoint
    pub fn components(&self) -> serde_json::Map<String, serde_json::Value> {
        self.components
            .iter()
            .map(|(name, status)| (name.clone(), serde_json::Value::String(status.clone())))
            .collect()
    }
}

/// Convenience for the CLI: an agent or the initialization error
pub async fn init_agent(config: &Config) -> Result<Agent> {
    let agent = Agent::init(config).await;
    if let Some(error) = agent.error() {
        anyhow::bail!("Agent initialization failed: {}", error);
    }
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stub_config_initializes_ready() {
        let agent = Agent::init(&Config::stub()).await;
        assert!(agent.is_ready());
        assert_eq!(agent.status_label(), "ready");
        assert!(agent.error().is_none());

        let components = agent.components();
        assert_eq!(components["embedding"], "ready");
        assert_eq!(components["store"], "ready");
        assert_eq!(components["llm"], "ready");
        assert_eq!(components["websearch"], "ready");
        assert_eq!(components["router"], "ready");
    }

    #[tokio::test]
    async fn test_unknown_backend_fails() {
        let mut config = Config::stub();
        config.store.backend = "cassette-tape".to_string();

        let agent = Agent::init(&config).await;
        assert!(!agent.is_ready());
        assert_eq!(agent.status_label(), "failed");
        assert!(agent.error().unwrap().contains("cassette-tape"));
    }
}
