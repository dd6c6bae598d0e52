use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::agent::{init_agent, Agent};
use crate::cli::Commands;
use crate::config::Config;
use crate::formatting;

pub async fn execute(config: &Config, command: Commands) -> Result<()> {
    match command {
        Commands::Index { paths } => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            for path in &paths {
                let outcome = core.indexer.index_file(path).await;
                if outcome.was_cached {
                    println!(
                        "{} {}",
                        outcome.source_id.blue(),
                        "unchanged, skipped".bright_black()
                    );
                } else {
                    println!(
                        "{} {} chunks",
                        outcome.source_id.blue(),
                        outcome.chunks_indexed
                    );
                }
            }
        }

        Commands::Ask {
            question,
            top_k,
            show_context,
        } => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            if show_context {
                let matches = core
                    .pipeline
                    .retrieve(&question, top_k.unwrap_or(config.search.top_k))
                    .await?;
                println!("{}", formatting::format_matches(&matches));
            }

            let session_id = core.sessions.create();
            let outcome = core.pipeline.chat(&question, &session_id, top_k).await;
            println!("{}", formatting::format_chat_outcome(&outcome));
        }

        Commands::Chat => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            let session_id = core.sessions.create();
            println!(
                "{} (session {}; type 'exit' to quit)",
                "Interactive chat".bold(),
                session_id.bright_black()
            );

            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                print!("{} ", "You:".green().bold());
                use std::io::Write;
                std::io::stdout().flush()?;

                let Some(line) = lines.next_line().await? else {
                    break;
                };
                let query = line.trim();
                if query.is_empty() {
                    continue;
                }
                if query == "exit" || query == "quit" {
                    break;
                }

                let outcome = core.pipeline.chat(query, &session_id, None).await;
                println!(
                    "{} {}",
                    "Assistant:".blue().bold(),
                    formatting::format_chat_outcome(&outcome)
                );
            }
        }

        Commands::Route { query, transcript } => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            let outcome = core.router.process(&query).await;
            println!("{}", formatting::format_route_outcome(&outcome));

            if transcript {
                println!("{}", "Transcript:".bold());
                for entry in &outcome.transcript {
                    println!("{}: {}", entry.speaker.cyan(), entry.content);
                }
            }
        }

        Commands::Sources { limit } => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            let sources = core.store.list_sources(limit).await?;
            println!("{}", formatting::format_source_list(&sources));
        }

        Commands::Stats => {
            let agent = init_agent(config).await?;
            let core = agent.try_core()?;

            let stats = core.store.stats().await?;
            println!("{}", formatting::format_stats(&stats));
        }

        Commands::Serve => {
            // The server starts even when initialization failed: the health
            // endpoint reports the failure and everything else returns 503.
            let agent = Arc::new(Agent::init(config).await);
            crate::server::serve(config, agent).await?;
        }
    }

    Ok(())
}
