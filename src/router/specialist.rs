use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

use crate::config::SpecialistConfig;
use crate::constants::{SNIPPET_LINES_AFTER, SNIPPET_LINES_BEFORE, SNIPPET_MAX_CHARS};
use crate::llm::CompletionProvider;
use crate::router::state::AgentState;
use crate::websearch::WebSearchProvider;

/// A category-specific handler: gathers evidence from internal documents and
/// the web, then composes an answer. Every external dependency degrades;
/// the handler always produces a non-empty answer.
pub struct Specialist {
    config: SpecialistConfig,
    docs_dir: PathBuf,
    llm: Arc<dyn CompletionProvider>,
    websearch: Arc<dyn WebSearchProvider>,
    temperature: f32,
    max_tokens: u32,
    max_web_results: usize,
}

impl Specialist {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: SpecialistConfig,
        docs_dir: PathBuf,
        llm: Arc<dyn CompletionProvider>,
        websearch: Arc<dyn WebSearchProvider>,
        temperature: f32,
        max_tokens: u32,
        max_web_results: usize,
    ) -> Self {
        Self {
            config,
            docs_dir,
            llm,
            websearch,
            temperature,
            max_tokens,
            max_web_results,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn label(&self) -> &str {
        &self.config.label
    }

    pub fn keywords(&self) -> &[String] {
        &self.config.keywords
    }

    /// Whether a classification category refers to this specialist
    pub fn matches(&self, category: &str) -> bool {
        category.eq_ignore_ascii_case(&self.config.name)
            || category.eq_ignore_ascii_case(&self.config.label)
    }

    /// Lexical search over the fixed list of internal documents for this
    /// category: case-insensitive containment, capturing a window of lines
    /// around the first matching line of each file. One snippet per file.
    pub fn search_internal_docs(&self, query: &str) -> Vec<String> {
        let needle = query.to_lowercase();
        let mut snippets = Vec::new();

        for doc_file in &self.config.doc_files {
            let path = self.docs_dir.join(&self.config.name).join(doc_file);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            if !content.to_lowercase().contains(&needle) {
                continue;
            }

            let lines: Vec<&str> = content.lines().collect();
            for (i, line) in lines.iter().enumerate() {
                if line.to_lowercase().contains(&needle) {
                    let start = i.saturating_sub(SNIPPET_LINES_BEFORE);
                    let end = (i + SNIPPET_LINES_AFTER + 1).min(lines.len());
                    let window = lines[start..end].join(" ");
                    let window: String = window.chars().take(SNIPPET_MAX_CHARS).collect();
                    snippets.push(format!("From {}: {}...", doc_file, window));
                    break;
                }
            }
        }

        snippets
    }

    /// Ask the model for a web-search-friendly rephrasing. Advisory: any
    /// failure returns the original query.
    async fn enhance_query(&self, query: &str) -> String {
        let instruction = format!(
            "Transform the following user query into an optimized web search query \
             for {} information. Respond with only the enhanced search query, no \
             additional text.",
            self.config.label
        );

        match self
            .llm
            .complete(&instruction, query, self.temperature, self.max_tokens)
            .await
        {
            Ok(enhanced) => enhanced.trim().to_string(),
            Err(e) => {
                warn!(specialist = %self.config.name, "Query enhancement failed: {:#}", e);
                query.to_string()
            }
        }
    }

    /// Best-effort web search scoped with the category's context terms.
    /// Failure degrades to no web evidence.
    async fn search_web(&self, query: &str) -> Vec<crate::websearch::WebResult> {
        let enhanced = self.enhance_query(query).await;
        let scoped = if self.config.search_context.is_empty() {
            enhanced
        } else {
            format!("{} {}", enhanced, self.config.search_context.join(" "))
        };

        match self.websearch.search(&scoped, self.max_web_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!(specialist = %self.config.name, "Web search failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn generate(&self, query: &str, context: &str) -> anyhow::Result<String> {
        let system = format!(
            "You are a helpful {} support agent. Answer the user's query based on \
             the provided context. Be helpful and professional, use the context to \
             provide accurate information, and keep responses clear and actionable. \
             If the context doesn't contain the answer, acknowledge this and provide \
             general guidance.",
            self.config.label
        );
        let prompt = format!("Context:\n{}\n\nUser Query: {}\n\nResponse:", context, query);

        let answer = self
            .llm
            .complete(&system, &prompt, self.temperature, self.max_tokens)
            .await?;
        Ok(answer.trim().to_string())
    }

    /// Run the specialist step: gather evidence in order (internal docs,
    /// then web), compose, and finish the state. Never returns an empty
    /// answer.
    pub async fn handle(&self, state: AgentState) -> AgentState {
        let query = state.query.clone();

        let internal = self.search_internal_docs(&query);
        let web = self.search_web(&query).await;

        let mut sources = Vec::new();
        let mut context_parts: Vec<String> = Vec::new();

        if !internal.is_empty() {
            sources.push(format!("Internal {} Documentation", self.config.label));
            context_parts.extend(internal);
        }
        if !web.is_empty() {
            sources.push("Web Search".to_string());
            for result in &web {
                context_parts.push(format!(
                    "{}: {} (Source: {})",
                    result.title, result.snippet, result.url
                ));
            }
        }

        let answer = if context_parts.is_empty() {
            format!(
                "I couldn't find specific information about your {} query. \
                 Please contact {} for direct assistance.",
                self.config.label, self.config.contact
            )
        } else {
            let context = context_parts.join("\n\n");
            match self.generate(&query, &context).await {
                Ok(answer) => answer,
                Err(e) => {
                    warn!(specialist = %self.config.name, "Answer generation failed: {:#}", e);
                    format!(
                        "Based on available information:\n\n{}\n\nFor additional \
                         support, contact {}.",
                        context, self.config.contact
                    )
                }
            }
        };

        state
            .with_evidence(context_parts, sources)
            .with_answer(answer.clone())
            .with_transcript_entry(&self.config.name, &answer)
    }
}
