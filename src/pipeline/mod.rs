
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::llm::CompletionProvider;
use crate::session::{Role, SessionStore};
use crate::store::{ChunkMatch, ChunkStore};

const REWRITE_INSTRUCTION: &str =
    "Given a chat history and a follow-up question, rewrite it as a standalone question.";

const COMPOSE_ROLE: &str = "You are a helpful assistant.";

/// Response of one conversational turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatOutcome {
    pub response: String,
    pub sources: Vec<String>,
    pub contextualized_query: String,
}

/// The conversational RAG pipeline: session history in, rewritten query,
/// top-k retrieval, grounded composition, history appended back out.
pub struct ChatPipeline {
    sessions: Arc<SessionStore>,
    store: Arc<dyn ChunkStore>,
    llm: Arc<dyn CompletionProvider>,
    history_limit: usize,
    top_k: usize,
    temperature: f32,
    max_tokens: u32,
}

impl ChatPipeline {
    pub fn new(
        config: &Config,
        sessions: Arc<SessionStore>,
        store: Arc<dyn ChunkStore>,
        llm: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            sessions,
            store,
            llm,
            history_limit: config.session.history_limit,
            top_k: config.search.top_k,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        }
    }

    /// Rewrite a follow-up question as a standalone one using the chat
    /// history. Advisory: blank history skips the model call entirely, and
    /// any backend failure falls back to the original query.
    pub async fn rewrite(&self, query: &str, history_text: &str) -> String {
        if history_text.trim().is_empty() {
            return query.to_string();
        }

        let user_prompt = format!("Chat:\n{}\n\nQuestion:\n{}", history_text, query);
        match self
            .llm
            .complete(
                REWRITE_INSTRUCTION,
                &user_prompt,
                self.temperature,
                self.max_tokens,
            )
            .await
        {
            Ok(rewritten) => rewritten.trim().to_string(),
            Err(e) => {
                warn!("Query rewrite failed, using original query: {:#}", e);
                query.to_string()
            }
        }
    }

    /// Top-k similarity search, a straight passthrough of the store's ranking
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<ChunkMatch>> {
        self.store.query(query, top_k).await
    }

    /// Compose a grounded answer from retrieved context and history. The
    /// instruction constrains the model to the supplied material; a backend
    /// failure yields a displayable error string, never an Err.
    pub async fn compose(&self, query: &str, context_text: &str, history_text: &str) -> String {
        let prompt = format!(
            "Answer based on the context and conversation history.\n\
             If unknown, say \"I don't know\".\n\n\
             Context:\n{}\n\n\
             History:\n{}\n\n\
             Human: {}\n\
             Assistant:",
            context_text, history_text, query
        );

        match self
            .llm
            .complete(COMPOSE_ROLE, &prompt, self.temperature, self.max_tokens)
            .await
        {
            Ok(answer) => answer.trim().to_string(),
            Err(e) => format!("Response error: {}", e),
        }
    }

    /// One conversational turn. Always returns a well-formed outcome;
    /// retrieval failures degrade to an empty context.
    pub async fn chat(&self, query: &str, session_id: &str, top_k: Option<usize>) -> ChatOutcome {
        let history = self.sessions.history_text(session_id, self.history_limit);
        let final_query = self.rewrite(query, &history).await;

        let matches = match self
            .retrieve(&final_query, top_k.unwrap_or(self.top_k))
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                warn!("Retrieval failed, composing without context: {:#}", e);
                Vec::new()
            }
        };

        let context_text = matches
            .iter()
            .map(|m| m.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        let sources: Vec<String> = matches.iter().map(|m| m.chunk.provenance()).collect();

        let answer = self.compose(&final_query, &context_text, &history).await;

        self.sessions.append(session_id, Role::User, query);
        self.sessions.append(session_id, Role::Assistant, &answer);

        ChatOutcome {
            response: answer,
            sources,
            contextualized_query: final_query,
        }
    }
}
