pub mod specialist;
pub mod state;

#[cfg(test)]
mod router_tests;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::CompletionProvider;
use crate::websearch::WebSearchProvider;

pub use specialist::Specialist;
pub use state::{AgentState, Classification, RouteOutcome, TranscriptEntry};

/// Supervisor-routed specialist workflow. One-shot state machine:
/// the supervisor classifies the query and dispatches to exactly one
/// specialist (or straight to the end state when nothing matches); no state
/// is ever revisited.
pub struct SupervisorRouter {
    llm: Arc<dyn CompletionProvider>,
    specialists: Vec<Specialist>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct RawClassification {
    category: String,
    #[serde(default)]
    confidence: f32,
    #[serde(default)]
    reasoning: String,
}

impl SupervisorRouter {
    pub fn new(
        config: &Config,
        llm: Arc<dyn CompletionProvider>,
        websearch: Arc<dyn WebSearchProvider>,
    ) -> Result<Self> {
        let docs_dir = match &config.router.docs_dir {
            Some(dir) => PathBuf::from(dir),
            None => crate::storage::get_internal_docs_dir()?,
        };

        let specialists = config
            .router
            .specialists
            .iter()
            .map(|spec| {
                Specialist::new(
                    spec.clone(),
                    docs_dir.clone(),
                    llm.clone(),
                    websearch.clone(),
                    config.llm.temperature,
                    config.llm.max_tokens,
                    config.search.max_web_results,
                )
            })
            .collect();

        Ok(Self {
            llm,
            specialists,
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        })
    }

    /// Route one query through supervisor and specialist to the end state
    pub async fn process(&self, query: &str) -> RouteOutcome {
        let state = AgentState::new(query);

        // SUPERVISOR
        let classification = self.classify(query).await;
        info!(
            category = %classification.category,
            confidence = classification.confidence,
            "Query classified"
        );
        let note = format!(
            "Query classified as {} with {:.2} confidence. {}",
            classification.category, classification.confidence, classification.reasoning
        );
        let state = state
            .with_transcript_entry("supervisor", &note)
            .with_classification(classification.clone());

        // SPECIALIST, or graceful no-route straight to END
        let state = match self
            .specialists
            .iter()
            .find(|s| s.matches(&classification.category))
        {
            Some(specialist) => specialist.handle(state).await,
            None => state,
        };

        RouteOutcome::from(state)
    }

    /// Zero-shot classification against the configured category set.
    /// Backend or parse failures, and categories outside the set, all yield
    /// the unclassified sentinel.
    async fn classify(&self, query: &str) -> Classification {
        let prompt = self.classification_prompt(query);

        let raw = match self
            .llm
            .complete(
                "You are a query classification system. Respond only with the \
                 requested JSON object, no additional text.",
                &prompt,
                self.temperature,
                self.max_tokens,
            )
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Classification call failed: {:#}", e);
                return Classification::unclassified(format!("Classification failed: {}", e));
            }
        };

        match parse_classification(&raw) {
            Ok(parsed) => self.validate(parsed),
            Err(e) => {
                warn!("Classification response unparseable: {:#}", e);
                Classification::unclassified(format!("Unparseable classification: {}", e))
            }
        }
    }

    fn classification_prompt(&self, query: &str) -> String {
        let labels: Vec<&str> = self.specialists.iter().map(|s| s.label()).collect();
        let mut prompt = format!(
            "Classify the following query into exactly one of these categories: {}.\n\n\
             Query: {}\n\n\
             Respond with a JSON object containing:\n\
             - \"category\": one of {}\n\
             - \"confidence\": a float between 0.0 and 1.0\n\
             - \"reasoning\": a brief explanation of why you chose this category\n\n",
            labels.join(", "),
            query,
            labels
                .iter()
                .map(|l| format!("\"{}\"", l))
                .collect::<Vec<_>>()
                .join(", "),
        );

        for specialist in &self.specialists {
            prompt.push_str(&format!(
                "{} queries typically involve: {}.\n",
                specialist.label(),
                specialist.keywords().join(", ")
            ));
        }

        prompt
    }

    /// Map a parsed category onto a configured specialist, or the sentinel
    fn validate(&self, raw: RawClassification) -> Classification {
        match self
            .specialists
            .iter()
            .find(|s| s.matches(&raw.category))
        {
            Some(specialist) => Classification {
                category: specialist.name().to_string(),
                confidence: raw.confidence.clamp(0.0, 1.0),
                reasoning: raw.reasoning,
            },
            None => Classification::unclassified(format!(
                "Category '{}' is not in the configured set",
                raw.category
            )),
        }
    }
}

/// Extract the JSON object from a model reply, tolerating code fences and
/// surrounding prose.
fn parse_classification(raw: &str) -> Result<RawClassification> {
    let start = raw.find('{').context("No JSON object in reply")?;
    let end = raw.rfind('}').context("No JSON object in reply")?;
    if end < start {
        anyhow::bail!("No JSON object in reply");
    }
    serde_json::from_str(&raw[start..=end]).context("Invalid classification JSON")
}
