//! Textual clean-up of raw HTML before it is parsed.
//!
//! These passes are regex-based and deliberately lossy: they strip comments
//! and presentation/tracking attributes so the structural walker sees less
//! noise.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Run all pre-processing passes.
pub(crate) fn preprocess(html: &str) -> String {
    let result = strip_comments(html);
    let result = reduce_class_attributes(&result);
    strip_noise_attributes(&result)
}

/// Remove `<!-- ... -->` comments, including multi-line ones.
fn strip_comments(html: &str) -> String {
    static COMMENT_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

    COMMENT_RE.replace_all(html, "").into_owned()
}

/// Remove `id`, `style`, inline event handlers, `aria-*` and `data-*` attributes.
fn strip_noise_attributes(html: &str) -> String {
    static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"(?i)\s(?:id|style|on[a-z]+|aria-[a-z-]+|data-[a-z0-9_.:-]+)\s*=\s*(?:"[^"]*"|'[^']*')"#,
        )
        .expect("valid regex")
    });

    ATTR_RE.replace_all(html, "").into_owned()
}

/// Drop `class` attributes, keeping only `language-*` tokens (code fence hints).
fn reduce_class_attributes(html: &str) -> String {
    static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)\sclass\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
    });

    CLASS_RE
        .replace_all(html, |caps: &Captures| {
            let value = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());

            let kept: Vec<&str> = value
                .split_whitespace()
                .filter(|token| token.starts_with("language-"))
                .collect();

            if kept.is_empty() {
                String::new()
            } else {
                format!(r#" class="{}""#, kept.join(" "))
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_comments() {
        let html = "<p>a<!-- hidden -->b</p><!--\nmulti\nline\n--><p>c</p>";
        assert_eq!(strip_comments(html), "<p>ab</p><p>c</p>");
    }

    #[test]
    fn removes_noise_attributes() {
        let html = r#"<div class="card shadow" id="main" style="color:red" onclick="go()" aria-label="card" data-track-id="7">Hi</div>"#;
        assert_eq!(preprocess(html), "<div>Hi</div>");
    }

    #[test]
    fn keeps_structural_attributes() {
        let html = r#"<a href="/docs" title="Docs" data-x='1'>Docs</a><img src="a.png" alt="A" ID="logo">"#;
        assert_eq!(
            preprocess(html),
            r#"<a href="/docs" title="Docs">Docs</a><img src="a.png" alt="A">"#
        );
    }

    #[test]
    fn keeps_language_class_tokens() {
        let html = r#"<pre class="hljs language-rust line-numbers"><code class='language-rust'>fn main() {}</code></pre>"#;
        assert_eq!(
            preprocess(html),
            r#"<pre class="language-rust"><code class="language-rust">fn main() {}</code></pre>"#
        );
    }
}
