/// Sentinel category used when the supervisor cannot map a query onto any
/// configured specialist. Never shown as a routable category.
pub const UNCLASSIFIED: &str = "unclassified";

/// User agent sent with all outbound HTTP requests.
pub const USER_AGENT: &str = concat!("Ragdesk/", env!("CARGO_PKG_VERSION"));

/// Timeout applied to every external HTTP call (embeddings, completions, web search).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Internal document snippets: lines captured around a matching line.
pub const SNIPPET_LINES_BEFORE: usize = 1;
pub const SNIPPET_LINES_AFTER: usize = 2;

/// Internal document snippets are truncated to this many characters.
pub const SNIPPET_MAX_CHARS: usize = 200;
