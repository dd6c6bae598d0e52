use chrono::{DateTime, Utc};
use colored::Colorize;

use crate::pipeline::ChatOutcome;
use crate::router::RouteOutcome;
use crate::store::{ChunkMatch, SourceInfo, StoreStats};

pub fn format_matches(matches: &[ChunkMatch]) -> String {
    if matches.is_empty() {
        return "No results found".to_string();
    }

    let mut output = String::new();

    for m in matches {
        output.push_str(&"━".repeat(60));
        output.push('\n');

        output.push_str(&m.chunk.provenance().blue().bold().to_string());
        output.push('\n');

        // Content preview (first 200 chars)
        let content = if m.chunk.text.chars().count() > 200 {
            format!("{}...", truncate_chars(&m.chunk.text, 200))
        } else {
            m.chunk.text.clone()
        };
        output.push_str(&content);
        output.push('\n');

        let score_pct = (m.score * 100.0) as u32;
        output.push_str(&format!("{}% relevant", score_pct).green().to_string());
        output.push_str("\n\n");
    }

    output
}

pub fn format_chat_outcome(outcome: &ChatOutcome) -> String {
    let mut output = String::new();

    output.push_str(&outcome.response);
    output.push('\n');

    if !outcome.sources.is_empty() {
        output.push('\n');
        output.push_str(&"Sources:".bold().to_string());
        output.push('\n');
        for source in &outcome.sources {
            output.push_str(&format!("  - {}", source.bright_black()));
            output.push('\n');
        }
    }

    output
}

pub fn format_route_outcome(outcome: &RouteOutcome) -> String {
    let mut output = String::new();

    let header = format!(
        "[{} / {:.0}%]",
        outcome.classification.category,
        outcome.classification.confidence * 100.0
    );
    output.push_str(&header.cyan().bold().to_string());
    output.push('\n');
    output.push_str(&outcome.classification.reasoning.bright_black().to_string());
    output.push_str("\n\n");

    if outcome.classification.is_unclassified() {
        output.push_str(&"No specialist handled this query".yellow().to_string());
        output.push('\n');
    } else {
        output.push_str(&outcome.answer);
        output.push('\n');
    }

    if !outcome.sources.is_empty() {
        output.push('\n');
        output.push_str(&"Sources:".bold().to_string());
        output.push('\n');
        for source in &outcome.sources {
            output.push_str(&format!("  - {}", source.bright_black()));
            output.push('\n');
        }
    }

    output
}

pub fn format_stats(stats: &StoreStats) -> String {
    let mut output = String::new();

    output.push_str(&"Index Statistics".bold().to_string());
    output.push('\n');
    output.push_str(&format!("Total Sources: {}", stats.total_sources));
    output.push('\n');
    output.push_str(&format!("Total Chunks: {}", stats.total_chunks));
    output.push('\n');

    if stats.total_sources > 0 {
        let avg = stats.total_chunks / stats.total_sources;
        output.push_str(&format!("Average Chunks/Source: {}", avg));
        output.push('\n');
    }

    if let Some(oldest) = stats.oldest_indexed {
        output.push_str(&format!("Oldest Indexed: {}", format_relative_time(oldest)));
        output.push('\n');
    }

    if let Some(newest) = stats.newest_indexed {
        output.push_str(&format!("Newest Indexed: {}", format_relative_time(newest)));
        output.push('\n');
    }

    output
}

pub fn format_source_list(sources: &[SourceInfo]) -> String {
    if sources.is_empty() {
        return "No sources indexed".to_string();
    }

    let mut output = String::new();

    output.push_str(
        &format!("{:<42} {:<8} {}\n", "Source", "Chunks", "Last Indexed")
            .bold()
            .to_string(),
    );
    output.push_str(&"─".repeat(72));
    output.push('\n');

    for source in sources {
        let id_truncated = if source.source_id.len() > 40 {
            format!("{}...", truncate_chars(&source.source_id, 37))
        } else {
            source.source_id.clone()
        };

        output.push_str(&format!(
            "{:<42} {:<8} {}\n",
            id_truncated,
            source.chunks,
            format_relative_time(source.indexed_at)
        ));
    }

    output
}

fn format_relative_time(dt: DateTime<Utc>) -> String {
    let now = Utc::now();
    let duration = now.signed_duration_since(dt);

    if duration.num_days() > 0 {
        format!("{} days ago", duration.num_days())
    } else if duration.num_hours() > 0 {
        format!("{} hours ago", duration.num_hours())
    } else if duration.num_minutes() > 0 {
        format!("{} minutes ago", duration.num_minutes())
    } else {
        "just now".to_string()
    }
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    input.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ChunkRecord;

    #[test]
    fn test_empty_matches() {
        assert_eq!(format_matches(&[]), "No results found");
    }

    #[test]
    fn test_match_formatting_includes_provenance_and_score() {
        let matches = vec![ChunkMatch {
            chunk: ChunkRecord::new("handbook.txt", 0, "Remote work policy.".to_string()),
            score: 0.87,
        }];

        let out = format_matches(&matches);
        assert!(out.contains("handbook.txt (chunk 0)"));
        assert!(out.contains("87% relevant"));
        assert!(out.contains("Remote work policy."));
    }

    #[test]
    fn test_long_content_is_truncated() {
        let matches = vec![ChunkMatch {
            chunk: ChunkRecord::new("long.txt", 0, "x".repeat(400)),
            score: 0.5,
        }];

        let out = format_matches(&matches);
        assert!(out.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn test_empty_sources() {
        assert_eq!(format_source_list(&[]), "No sources indexed");
    }

    #[test]
    fn test_stats_formatting() {
        let stats = StoreStats {
            total_sources: 2,
            total_chunks: 10,
            oldest_indexed: None,
            newest_indexed: None,
        };

        let out = format_stats(&stats);
        assert!(out.contains("Total Sources: 2"));
        assert!(out.contains("Total Chunks: 10"));
        assert!(out.contains("Average Chunks/Source: 5"));
    }
}
