//! Upstream response fixtures

/// `/insights` as a bare array
pub const INSIGHTS_ARRAY: &str = r#"[
    {"title": "Sparse attention revisited", "summary": "Linear-time attention holds up at 1M tokens", "source": "arxiv"},
    {"title": "Rust in the kernel", "summary": "Second driver subsystem merged", "source": "github", "stars": 1200}
]"#;

/// `/insights` wrapped in an object
pub const INSIGHTS_WRAPPED: &str = r#"{
    "insights": [
        {"title": "Diffusion for tabular data", "summary": "Beats gradient boosting on 3 of 5 benchmarks"}
    ],
    "generatedAt": "2026-10-16T08:00:00Z"
}"#;

/// `/stats` document
pub const STATS: &str = r#"{"papersIndexed": 4812, "reposTracked": 311, "lastCrawl": "2026-10-16T07:55:00Z"}"#;

/// Something that is not JSON
pub const MALFORMED: &str = "<html><body>502 Bad Gateway</body></html>";

/// `/insights` where only some records carry a string title
pub const INSIGHTS_MIXED_TITLES: &str = r#"[
    {"title": "Graph transformers at scale", "source": "arxiv"},
    {"title": null, "summary": "Headline pending"},
    {"title": 2048, "summary": "Numbered release notes"},
    {"summary": "Record without a title"}
]"#;
