use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::StubCompletions;
use crate::router::SupervisorRouter;
use crate::websearch::{StubWebSearch, WebResult, WebSearchProvider};

fn scratch_docs_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ragdesk-router-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_doc(docs_dir: &PathBuf, category: &str, file: &str, content: &str) {
    let dir = docs_dir.join(category);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join(file), content).unwrap();
}

struct Fixture {
    router: SupervisorRouter,
    llm: Arc<StubCompletions>,
    docs_dir: PathBuf,
}

fn fixture_with(websearch: Arc<dyn WebSearchProvider>) -> Fixture {
    let docs_dir = scratch_docs_dir();
    let mut config = Config::stub();
    config.router.docs_dir = Some(docs_dir.to_string_lossy().to_string());

    let llm = Arc::new(StubCompletions::new());
    let router = SupervisorRouter::new(&config, llm.clone(), websearch).unwrap();

    Fixture {
        router,
        llm,
        docs_dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(Arc::new(StubWebSearch::empty()))
}

#[tokio::test]
async fn test_routes_to_it_specialist() {
    let f = fixture();
    f.llm.push_reply(
        r#"{"category": "IT", "confidence": 0.92, "reasoning": "VPN is a technology topic"}"#,
    );

    let outcome = f.router.process("How do I set up the VPN?").await;

    assert_eq!(outcome.classification.category, "it");
    assert!((outcome.classification.confidence - 0.92).abs() < 1e-6);
    // No docs, no web hits: the fallback names the IT contact channel
    assert!(outcome.answer.contains("helpdesk@company.com or ext. 1234"));
}

#[tokio::test]
async fn test_routes_to_finance_specialist() {
    let f = fixture();
    f.llm.push_reply(
        r#"{"category": "finance", "confidence": 0.8, "reasoning": "expense question"}"#,
    );

    let outcome = f.router.process("How do I file an expense report?").await;

    assert_eq!(outcome.classification.category, "finance");
    assert!(outcome.answer.contains("finance@company.com or ext. 5678"));
}

#[tokio::test]
async fn test_unknown_category_ends_unrouted() {
    let f = fixture();
    f.llm.push_reply(
        r#"{"category": "astrology", "confidence": 0.7, "reasoning": "stars"}"#,
    );

    let outcome = f.router.process("What is my horoscope?").await;

    assert!(outcome.classification.is_unclassified());
    assert!(outcome.answer.is_empty());
    assert!(outcome.sources.is_empty());
    // Only the human query and the supervisor note made the transcript
    assert_eq!(outcome.transcript.len(), 2);
    // Exactly one model call: classification, no specialist ran
    assert_eq!(f.llm.calls().len(), 1);
}

#[tokio::test]
async fn test_classification_backend_failure_is_unclassified() {
    let f = fixture();
    f.llm.push_failure("backend unreachable");

    let outcome = f.router.process("anything").await;
    assert!(outcome.classification.is_unclassified());
    assert!(outcome
        .classification
        .reasoning
        .contains("Classification failed"));
}

#[tokio::test]
async fn test_unparseable_classification_is_unclassified() {
    let f = fixture();
    f.llm.push_reply("I think this is probably an IT question.");

    let outcome = f.router.process("anything").await;
    assert!(outcome.classification.is_unclassified());
    assert!(outcome
        .classification
        .reasoning
        .contains("Unparseable classification"));
}

#[tokio::test]
async fn test_classification_tolerates_fenced_json() {
    let f = fixture();
    f.llm.push_reply(
        "```json\n{\"category\": \"it\", \"confidence\": 0.85, \"reasoning\": \"vpn\"}\n```",
    );

    let outcome = f.router.process("vpn help").await;
    assert_eq!(outcome.classification.category, "it");
}

#[tokio::test]
async fn test_confidence_is_clamped() {
    let f = fixture();
    f.llm.push_reply(r#"{"category": "it", "confidence": 3.5, "reasoning": "sure"}"#);

    let outcome = f.router.process("vpn help").await;
    assert!((outcome.classification.confidence - 1.0).abs() < f32::EPSILON);
}

#[tokio::test]
async fn test_internal_docs_and_web_evidence_reach_the_answer() {
    let web = Arc::new(StubWebSearch::with_results(vec![WebResult {
        title: "VPN basics".to_string(),
        snippet: "A VPN tunnels traffic.".to_string(),
        url: "https://example.com/vpn".to_string(),
    }]));
    let f = fixture_with(web);
    write_doc(
        &f.docs_dir,
        "it",
        "vpn_setup.txt",
        "Connecting remotely\nInstall the client.\nUse the corporate VPN profile.\nRestart after install.\nCall helpdesk if it fails.",
    );

    // Replies in call order: classify, enhance, generate
    f.llm.push_reply(r#"{"category": "it", "confidence": 0.9, "reasoning": "vpn"}"#);
    f.llm.push_reply("corporate VPN setup guide");
    f.llm.push_reply("Install the client and use the corporate profile.");

    let outcome = f.router.process("vpn").await;

    assert_eq!(outcome.answer, "Install the client and use the corporate profile.");
    assert!(outcome
        .sources
        .contains(&"Internal IT Documentation".to_string()));
    assert!(outcome.sources.contains(&"Web Search".to_string()));

    // Both evidence kinds were in the generation prompt
    let calls = f.llm.calls();
    assert_eq!(calls.len(), 3);
    let prompt = &calls[2].user_prompt;
    assert!(prompt.contains("From vpn_setup.txt:"));
    assert!(prompt.contains("VPN basics: A VPN tunnels traffic. (Source: https://example.com/vpn)"));

    // Transcript: human, supervisor, specialist
    assert_eq!(outcome.transcript.len(), 3);
    assert_eq!(outcome.transcript[2].speaker, "it");
}

#[tokio::test]
async fn test_generation_failure_surfaces_raw_evidence() {
    let f = fixture();
    write_doc(
        &f.docs_dir,
        "it",
        "troubleshooting.txt",
        "Printer jams\nOpen the tray and remove the paper.\nPower cycle the printer.",
    );

    f.llm.push_reply(r#"{"category": "it", "confidence": 0.9, "reasoning": "printer"}"#);
    f.llm.push_reply("office printer jam fix"); // enhance
    f.llm.push_failure("generation backend down");

    let outcome = f.router.process("printer").await;

    assert!(outcome.answer.starts_with("Based on available information:"));
    assert!(outcome.answer.contains("From troubleshooting.txt:"));
    assert!(outcome.answer.contains("helpdesk@company.com or ext. 1234"));
}

#[tokio::test]
async fn test_web_search_failure_degrades_to_docs_only() {
    let f = fixture_with(Arc::new(StubWebSearch::failing()));
    write_doc(
        &f.docs_dir,
        "finance",
        "payroll_info.txt",
        "Payroll runs on the 25th of each month.",
    );

    f.llm.push_reply(
        r#"{"category": "finance", "confidence": 0.9, "reasoning": "payroll"}"#,
    );
    f.llm.push_reply("company payroll schedule"); // enhance
    f.llm.push_reply("Payroll runs on the 25th.");

    let outcome = f.router.process("payroll").await;

    assert_eq!(outcome.answer, "Payroll runs on the 25th.");
    assert_eq!(
        outcome.sources,
        vec!["Internal Finance Documentation".to_string()]
    );
}

#[tokio::test]
async fn test_lexical_search_takes_one_snippet_per_file() {
    let f = fixture();
    write_doc(
        &f.docs_dir,
        "it",
        "security_policies.txt",
        "Passwords expire every 90 days.\nOther rules.\nPasswords must be 12 characters.\nMore rules.",
    );

    f.llm.push_reply(r#"{"category": "it", "confidence": 0.9, "reasoning": "passwords"}"#);
    f.llm.push_reply("password policy"); // enhance
    f.llm.push_reply("See the policy.");

    f.router.process("passwords").await;

    let prompt = &f.llm.calls()[2].user_prompt;
    // First occurrence only: the window around line 0, not a second snippet
    assert_eq!(prompt.matches("From security_policies.txt:").count(), 1);
    assert!(prompt.contains("Passwords expire every 90 days."));
}

#[tokio::test]
async fn test_enhance_failure_falls_back_to_original_query() {
    let f = fixture_with(Arc::new(StubWebSearch::with_results(vec![WebResult {
        title: "t".to_string(),
        snippet: "s".to_string(),
        url: "u".to_string(),
    }])));

    f.llm.push_reply(r#"{"category": "it", "confidence": 0.9, "reasoning": "wifi"}"#);
    f.llm.push_failure("enhance backend down");
    f.llm.push_reply("Answer from web evidence.");

    let outcome = f.router.process("wifi keeps dropping").await;
    // The pipeline still reaches generation with web evidence
    assert_eq!(outcome.answer, "Answer from web evidence.");
    assert!(outcome.sources.contains(&"Web Search".to_string()));
}

#[tokio::test]
async fn test_classification_prompt_names_all_categories() {
    let f = fixture();
    f.llm.push_reply(r#"{"category": "it", "confidence": 0.5, "reasoning": "x"}"#);

    f.router.process("some query").await;

    let prompt = &f.llm.calls()[0].user_prompt;
    assert!(prompt.contains("IT, Finance"));
    assert!(prompt.contains("\"confidence\""));
    assert!(prompt.contains("passwords"));
    assert!(prompt.contains("reimbursement"));
}
