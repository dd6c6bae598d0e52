use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ragdesk")]
#[command(version)]
#[command(about = "Retrieval-augmented support assistant with a supervisor-routed specialist workflow", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index documents into the chunk store
    Index {
        /// Files to index (.txt, .md, .pdf, .docx, .html)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Ask a single question against the indexed corpus
    Ask {
        /// The question to answer
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Show the retrieved chunks alongside the answer
        #[arg(long)]
        show_context: bool,
    },

    /// Interactive chat session with conversational memory
    Chat,

    /// Route a query through the supervisor to a specialist
    Route {
        /// The query to classify and handle
        query: String,

        /// Show the full routing transcript
        #[arg(long)]
        transcript: bool,
    },

    /// List indexed sources
    Sources {
        /// Maximum number of sources to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show index statistics
    Stats,

    /// Start the HTTP server
    Serve,
}
