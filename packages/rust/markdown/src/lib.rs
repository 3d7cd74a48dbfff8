//! HTML-to-Markdown conversion.
//!
//! Conversion runs in three stages:
//! 1. [`preprocess`] - textual removal of comments and noisy attributes
//! 2. [`rules`] - an ordered rule table for drops, code blocks, links and
//!    images; everything else is converted by `htmd`
//! 3. [`cleanup`] - line-level normalization of the Markdown text
//!
//! Conversion never fails; malformed HTML yields best-effort Markdown.

mod cleanup;
mod preprocess;
mod rules;

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};
use url::Url;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Result of converting an HTML page to Markdown.
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// The final Markdown content.
    pub markdown: String,
    /// Text of the first H1, if any.
    pub title: Option<String>,
    /// Approximate word count, code blocks excluded.
    pub word_count: usize,
}

/// Options for the HTML-to-Markdown conversion.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// URL of the page; relative `href`/`src` values resolve against it.
    /// Without it, only already-absolute links are kept.
    pub base_url: Option<Url>,
}

impl ConvertOptions {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: Some(base_url),
        }
    }
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

/// Convert rendered HTML into cleaned Markdown.
#[instrument(skip_all, fields(html_len = html.len()))]
pub fn convert(html: &str, opts: &ConvertOptions) -> ConvertResult {
    let cleaned_html = preprocess::preprocess(html);

    let raw_markdown = rules::Renderer::new(opts.base_url.as_ref()).render(&cleaned_html);
    debug!(raw_len = raw_markdown.len(), "structural conversion complete");

    let markdown = cleanup::run_pipeline(&raw_markdown);
    let title = extract_title_from_markdown(&markdown);
    let word_count = count_words(&markdown);

    debug!(
        title = title.as_deref().unwrap_or(""),
        word_count,
        final_len = markdown.len(),
        "conversion complete"
    );

    ConvertResult {
        markdown,
        title,
        word_count,
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract title from the first H1 in the Markdown text.
fn extract_title_from_markdown(md: &str) -> Option<String> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^# (.+)$").expect("valid regex"));

    H1_RE.captures(md).map(|c| c[1].trim().to_string())
}

/// Count words in the Markdown body, excluding fenced code.
fn count_words(md: &str) -> usize {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```.*?```").expect("valid regex"));

    let without_code = CODE_BLOCK_RE.replace_all(md, "");
    without_code
        .split_whitespace()
        .filter(|w| !w.starts_with('#') || w.len() > 2)
        .count()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fixture_path(name: &str) -> std::path::PathBuf {
        std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name)
    }

    fn load_fixture(name: &str) -> String {
        fs::read_to_string(fixture_path(name))
            .unwrap_or_else(|e| panic!("failed to read fixture {name}: {e}"))
    }

    fn make_opts(url: &str) -> ConvertOptions {
        ConvertOptions::with_base_url(Url::parse(url).unwrap())
    }

    // --- Core conversion tests ---

    #[test]
    fn convert_simple_html() {
        let html = "<h1>Title</h1><p>Hello <strong>bold</strong> and <em>it</em>.</p>";
        let result = convert(html, &ConvertOptions::default());

        assert!(result.markdown.starts_with("# Title\n\nHello **bold**"));
        assert_eq!(result.title.as_deref(), Some("Title"));
        assert_eq!(result.word_count, 5);
    }

    #[test]
    fn code_fence_gets_language_and_no_padding() {
        let html = r#"<pre class="language-go">

fmt.Println()

</pre>"#;
        let result = convert(html, &ConvertOptions::default());
        assert_eq!(result.markdown, "```go\nfmt.Println()\n```");
    }

    #[test]
    fn code_fence_language_from_code_child() {
        let html = r#"<html><body><main>
            <h1>Code Example</h1>
            <pre class="hljs"><code class="hljs language-rust">fn main() {
    println!("hello");
}</code></pre>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/code"));
        assert!(result.markdown.contains("```rust\nfn main() {\n    println!(\"hello\");\n}\n```"));
    }

    #[test]
    fn noise_lines_are_dropped_even_inside_code() {
        let html = "<p>Intro</p><pre class=\"language-js\">try { run() } catch {}\n:root{color:red}\nrun()</pre>";
        let result = convert(html, &ConvertOptions::default());

        assert!(!result.markdown.contains("try {"));
        assert!(!result.markdown.contains(":root"));
        assert!(result.markdown.contains("```js\nrun()\n```"));
    }

    #[test]
    fn list_markers_start_at_column_zero_even_inside_code() {
        let html = "<pre>  - item\n    3. three</pre>";
        let result = convert(html, &ConvertOptions::default());
        assert_eq!(result.markdown, "```\n- item\n3. three\n```");
    }

    #[test]
    fn convert_strips_nav_and_footer() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <main><h1>Content</h1><p>Important text.</p></main>
            <footer><p>Copyright 2024</p></footer>
        </body></html>"#;

        let result = convert(html, &make_opts("https://example.com/"));
        assert_eq!(result.markdown, "# Content\n\nImportant text.");
    }

    #[test]
    fn convert_resolves_links_and_images() {
        let html = r#"<p>Read <a href="../api#client">the API</a>.</p>
            <p><img src="/img/logo.png" alt="Logo"></p>
            <p><img alt="missing source"></p>"#;

        let result = convert(html, &make_opts("https://example.com/guide/intro"));
        assert!(result.markdown.contains("[the API](https://example.com/api#client)"));
        assert!(result.markdown.contains("![Logo](https://example.com/img/logo.png)"));
        assert!(!result.markdown.contains("missing source"));
    }

    #[test]
    fn convert_keeps_table_cells() {
        let html = r#"<html><body><main>
            <h1>Data</h1>
            <table>
                <thead><tr><th>Name</th><th>Value</th></tr></thead>
                <tbody><tr><td>foo</td><td>bar</td></tr></tbody>
            </table>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/data"));
        for cell in ["Name", "Value", "foo", "bar"] {
            assert!(result.markdown.contains(cell), "missing {cell}: {}", result.markdown);
        }
        assert!(!result.markdown.contains("<table"));
    }

    #[test]
    fn convert_handles_lists() {
        let html = r#"<html><body><main>
            <h1>Lists</h1>
            <ul>
                <li>Item one</li>
                <li>Item <code>two</code></li>
            </ul>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/lists"));
        assert!(result.markdown.starts_with("# Lists"));
        assert!(result.markdown.lines().any(|l| l.starts_with("- ") && l.contains("Item one")));
        assert!(result.markdown.lines().any(|l| l.starts_with("- ") && l.contains("`two`")));
    }

    #[test]
    fn convert_blockquote_and_rule() {
        let html = "<blockquote><p>First</p></blockquote><hr><p>After</p>";
        let result = convert(html, &ConvertOptions::default());

        assert!(result.markdown.lines().any(|l| l.starts_with('>') && l.contains("First")));
        assert!(result.markdown.lines().any(|l| l == "---"));
        assert!(result.markdown.ends_with("After"));
    }

    #[test]
    fn convert_no_html_tags_in_output() {
        let html = r#"<html><body><main>
            <h1>Clean Output</h1>
            <p>This should be <strong>clean</strong> markdown.</p>
            <div class="note" data-role="callout"><p>A note.</p></div>
            <span style="color:red">inline</span>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/clean"));
        assert!(!result.markdown.contains('<'), "output contains tags: {}", result.markdown);
        assert!(result.markdown.contains("A note."));
        assert!(result.markdown.contains("inline"));
    }

    #[test]
    fn convert_drops_inline_noise_lines() {
        let html = r#"<body>
            <div>:root{--brand:#09f}</div>
            <p>Real content.</p>
            <div>{"props":{"pageProps":{}}}</div>
        </body>"#;

        let result = convert(html, &ConvertOptions::default());
        assert!(result.markdown.contains("Real content."));
        assert!(!result.markdown.contains(":root"));
        assert!(!result.markdown.contains("pageProps"));
    }

    // --- Fixture-based tests ---

    #[test]
    fn convert_docs_fixture() {
        let html = load_fixture("html/docs_page.html");
        let result = convert(&html, &make_opts("https://docs.example.com/guide/install"));
        let md = &result.markdown;

        assert_eq!(result.title.as_deref(), Some("Installation"));
        assert!(md.starts_with("# Installation"));
        assert!(md.contains("```bash\nnpm install example-tool\n```"));
        assert!(md.lines().any(|l| l == "- Node.js 20 or newer"));
        assert!(md.contains("[configuration guide](https://docs.example.com/guide/configuration)"));
        assert!(md.contains("--verbose"));
        assert!(md.lines().any(|l| l.starts_with("> ") && l.contains("restart your shell")));

        assert!(!md.contains("Edit this page"));
        assert!(!md.contains("gtag"));
        assert!(!md.contains(":root"));
        assert!(!md.contains("Main menu"));
        assert!(!md.contains("\n\n\n"));
        assert!(!md.contains("```bash\n\n"));
    }

    // --- Edge cases ---

    #[test]
    fn convert_empty_html() {
        let result = convert("<html><body></body></html>", &ConvertOptions::default());
        assert_eq!(result.markdown, "");
        assert_eq!(result.title, None);
        assert_eq!(result.word_count, 0);
    }

    #[test]
    fn convert_malformed_html_degrades() {
        let html = "<div><p>Unclosed <b>bold<ul><li>item</div></p><h2>Tail";
        let result = convert(html, &ConvertOptions::default());
        assert!(result.markdown.contains("Unclosed"));
        assert!(result.markdown.contains("item"));
        assert!(result.markdown.contains("Tail"));
        assert!(result.markdown.lines().any(|l| l.starts_with("## ")));
    }

    #[test]
    fn convert_deeply_nested() {
        let html = r#"<html><body><main>
            <div><div><div>
                <h1>Deep</h1>
                <p>Nested content.</p>
            </div></div></div>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/deep"));
        assert_eq!(result.markdown, "# Deep\n\nNested content.");
    }

    #[test]
    fn convert_survives_pathological_nesting() {
        let html = format!(
            "<h1>Deep</h1>{}leaf{}",
            "<div><span>".repeat(2000),
            "</span></div>".repeat(2000)
        );
        let result = convert(&html, &ConvertOptions::default());
        assert_eq!(result.title.as_deref(), Some("Deep"));
        assert!(result.markdown.contains("leaf"));
    }

    #[test]
    fn word_count_excludes_code_blocks() {
        let html = r#"<html><body><main>
            <h1>Title</h1>
            <p>One two three.</p>
            <pre><code>lots of code words that should not be counted</code></pre>
        </main></body></html>"#;

        let result = convert(html, &make_opts("https://example.com/wc"));
        assert_eq!(result.word_count, 4);
    }
}
