use serde::Serialize;

use crate::constants::UNCLASSIFIED;

/// Supervisor verdict for one query. Category is always a configured
/// specialist name or the `unclassified` sentinel, never free text.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub category: String,
    pub confidence: f32,
    pub reasoning: String,
}

impl Classification {
    pub fn unclassified(reasoning: String) -> Self {
        Self {
            category: UNCLASSIFIED.to_string(),
            confidence: 0.0,
            reasoning,
        }
    }

    pub fn is_unclassified(&self) -> bool {
        self.category == UNCLASSIFIED
    }
}

/// One line of the routing transcript
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptEntry {
    pub speaker: String,
    pub content: String,
}

/// State threaded through the routing flow. Each transition consumes the
/// previous state and returns a new one; handlers never share a mutable
/// reference.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub query: String,
    pub classification: Option<Classification>,
    pub evidence: Vec<String>,
    pub sources: Vec<String>,
    pub answer: String,
    pub transcript: Vec<TranscriptEntry>,
}

impl AgentState {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            classification: None,
            evidence: Vec::new(),
            sources: Vec::new(),
            answer: String::new(),
            transcript: vec![TranscriptEntry {
                speaker: "human".to_string(),
                content: query.to_string(),
            }],
        }
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = Some(classification);
        self
    }

    pub fn with_evidence(mut self, evidence: Vec<String>, sources: Vec<String>) -> Self {
        self.evidence = evidence;
        self.sources = sources;
        self
    }

    pub fn with_answer(mut self, answer: String) -> Self {
        self.answer = answer;
        self
    }

    pub fn with_transcript_entry(mut self, speaker: &str, content: &str) -> Self {
        self.transcript.push(TranscriptEntry {
            speaker: speaker.to_string(),
            content: content.to_string(),
        });
        self
    }
}

/// Terminal state of one routed query, always well-formed
#[derive(Debug, Clone, Serialize)]
pub struct RouteOutcome {
    pub query: String,
    pub classification: Classification,
    pub answer: String,
    pub sources: Vec<String>,
    pub transcript: Vec<TranscriptEntry>,
}

impl From<AgentState> for RouteOutcome {
    fn from(state: AgentState) -> Self {
        Self {
            query: state.query,
            classification: state
                .classification
                .unwrap_or_else(|| Classification::unclassified("No classification ran".to_string())),
            answer: state.answer,
            sources: state.sources,
            transcript: state.transcript,
        }
    }
}
