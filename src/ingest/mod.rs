pub mod chunker;
pub mod indexer;

pub use chunker::SentenceChunker;
pub use indexer::{IndexOutcome, Indexer};
