//! Rule table and the `htmd` converter built from it.
//!
//! [`RULES`] is evaluated top to bottom for every element and the first rule
//! whose tag list contains the element claims it. Elements no rule claims fall
//! through to `htmd`'s built-in handlers (headings, lists, emphasis, tables...).
//!
//! Conversion happens in two steps:
//! 1. [`prepare`] walks the parsed DOM with an explicit stack, removes dropped
//!    subtrees, snapshots every `pre` as a finished fence, and flattens
//!    anything nested deeper than [`MAX_DEPTH`] to plain text.
//! 2. The prepared HTML goes through `htmd` with one handler per remaining rule.

use htmd::element_handler::{ElementHandler, HandlerResult, Handlers};
use htmd::options::{BulletListMarker, Options};
use htmd::{Element, HtmlToMarkdown};
use scraper::{ElementRef, Html, Node};
use tracing::warn;
use url::Url;

/// What a rule does with the elements it claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Remove the element and its subtree.
    Drop,
    /// Fenced code block with the `language-*` hint as info string.
    CodeBlock,
    /// Inline link with the target resolved against the page URL.
    Link,
    /// Image with the source resolved against the page URL.
    Image,
    /// `---`.
    HorizontalRule,
}

/// One entry of the rule table.
pub(crate) struct Rule {
    pub(crate) name: &'static str,
    pub(crate) tags: &'static [&'static str],
    pub(crate) action: Action,
}

/// Ordered, first match wins.
pub(crate) static RULES: &[Rule] = &[
    Rule { name: "script-style", tags: &["script", "style"], action: Action::Drop },
    Rule {
        name: "page-chrome",
        tags: &["nav", "footer", "aside", "meta", "iframe"],
        action: Action::Drop,
    },
    Rule {
        name: "non-content",
        tags: &["head", "noscript", "template", "svg"],
        action: Action::Drop,
    },
    Rule { name: "code-block", tags: &["pre"], action: Action::CodeBlock },
    Rule { name: "link", tags: &["a"], action: Action::Link },
    Rule { name: "image", tags: &["img"], action: Action::Image },
    Rule { name: "horizontal-rule", tags: &["hr"], action: Action::HorizontalRule },
];

/// Elements nested deeper than this are reduced to their text.
pub(crate) const MAX_DEPTH: usize = 128;

/// Attribute carrying the index of a prepared fence on its placeholder `pre`.
const FENCE_ATTR: &str = "data-sitescribe-fence";

/// Elements serialized without children or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// First rule that claims `tag`.
pub(crate) fn rule_for(tag: &str) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.tags.contains(&tag))
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Converts a whole document through [`prepare`] and `htmd`.
pub(crate) struct Renderer<'a> {
    base_url: Option<&'a Url>,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(base_url: Option<&'a Url>) -> Self {
        Self { base_url }
    }

    /// Parse `html` and render it to raw Markdown.
    pub(crate) fn render(&self, html: &str) -> String {
        let doc = Html::parse_document(html);
        let prepared = prepare(&doc);
        let converter = self.converter(prepared.fences);

        match converter.convert(&prepared.html) {
            Ok(markdown) => markdown,
            Err(e) => {
                warn!(error = %e, "htmd conversion failed, falling back to plain text");
                Html::parse_document(&prepared.html)
                    .root_element()
                    .text()
                    .collect::<Vec<_>>()
                    .join("")
            }
        }
    }

    fn converter(&self, fences: Vec<String>) -> HtmlToMarkdown {
        let options = Options {
            bullet_list_marker: BulletListMarker::Dash,
            ul_bullet_spacing: 1,
            ..Options::default()
        };

        let mut builder = HtmlToMarkdown::builder().options(options);
        let mut fences = Some(fences);

        for rule in RULES {
            let tags = rule.tags.to_vec();
            let base_url = self.base_url.cloned();
            builder = match rule.action {
                // Already removed by `prepare`.
                Action::Drop => builder,
                Action::CodeBlock => builder.add_handler(
                    tags,
                    CodeBlockHandler {
                        fences: fences.take().unwrap_or_default(),
                    },
                ),
                Action::Link => builder.add_handler(tags, LinkHandler { base_url }),
                Action::Image => builder.add_handler(tags, ImageHandler { base_url }),
                Action::HorizontalRule => builder.add_handler(tags, HorizontalRuleHandler),
            };
        }

        builder.build()
    }
}

// ---------------------------------------------------------------------------
// Preparation pass
// ---------------------------------------------------------------------------

/// HTML ready for `htmd`, plus the code fences its placeholders refer to.
pub(crate) struct Prepared {
    pub(crate) html: String,
    pub(crate) fences: Vec<String>,
}

enum Step<'a> {
    Open(ElementRef<'a>, usize),
    Text(&'a str),
    Close(&'a str),
}

/// Re-serialize `doc` with the table's structural rules applied.
///
/// Iterative, so arbitrarily deep documents cannot exhaust the stack.
pub(crate) fn prepare(doc: &Html) -> Prepared {
    let mut html = String::new();
    let mut fences = Vec::new();
    let mut stack = vec![Step::Open(doc.root_element(), 0)];

    while let Some(step) = stack.pop() {
        let (el, depth) = match step {
            Step::Text(text) => {
                push_escaped(&mut html, text, false);
                continue;
            }
            Step::Close(name) => {
                html.push_str("</");
                html.push_str(name);
                html.push('>');
                continue;
            }
            Step::Open(el, depth) => (el, depth),
        };

        let name = el.value().name();
        match rule_for(name).map(|rule| rule.action) {
            Some(Action::Drop) => continue,
            Some(Action::CodeBlock) => {
                html.push_str(&format!(r#"<pre {FENCE_ATTR}="{}"></pre>"#, fences.len()));
                fences.push(code_fence(el));
                continue;
            }
            _ => {}
        }

        if depth >= MAX_DEPTH {
            for text in el.text() {
                push_escaped(&mut html, text, false);
            }
            continue;
        }

        html.push('<');
        html.push_str(name);
        for (attr, value) in el.value().attrs() {
            html.push(' ');
            html.push_str(attr);
            html.push_str("=\"");
            push_escaped(&mut html, value, true);
            html.push('"');
        }
        html.push('>');

        if VOID_TAGS.contains(&name) {
            continue;
        }

        stack.push(Step::Close(name));
        let children: Vec<_> = el.children().collect();
        for child in children.into_iter().rev() {
            match child.value() {
                Node::Text(text) => stack.push(Step::Text(&text.text)),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        stack.push(Step::Open(child_el, depth + 1));
                    }
                }
                _ => {}
            }
        }
    }

    Prepared { html, fences }
}

fn push_escaped(out: &mut String, text: &str, in_attr: bool) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attr => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Finished fence for a `pre`, or empty when it holds no text.
fn code_fence(pre: ElementRef<'_>) -> String {
    let code: String = pre.text().collect();
    let code = code.trim();
    if code.is_empty() {
        return String::new();
    }

    let lang = code_language(pre).unwrap_or_default();
    format!("```{lang}\n{code}\n```")
}

/// `language-xxx` token on the `pre` itself or its direct `code` child.
fn code_language(pre: ElementRef<'_>) -> Option<String> {
    language_token(pre.value().attr("class")).or_else(|| {
        pre.children()
            .filter_map(ElementRef::wrap)
            .find(|child| child.value().name() == "code")
            .and_then(|code| language_token(code.value().attr("class")))
    })
}

fn language_token(class: Option<&str>) -> Option<String> {
    class?
        .split_whitespace()
        .filter_map(|token| token.strip_prefix("language-"))
        .find(|lang| !lang.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// htmd handlers
// ---------------------------------------------------------------------------

struct CodeBlockHandler {
    fences: Vec<String>,
}

impl ElementHandler for CodeBlockHandler {
    fn handle(&self, handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
        let fence = get_attr(&element, FENCE_ATTR)
            .and_then(|index| index.parse::<usize>().ok())
            .and_then(|index| self.fences.get(index));

        let content = match fence {
            Some(fence) if fence.is_empty() => String::new(),
            Some(fence) => format!("\n\n{fence}\n\n"),
            None => handlers.walk_children(element.node).content,
        };
        Some(HandlerResult::from(content))
    }
}

struct LinkHandler {
    base_url: Option<Url>,
}

impl ElementHandler for LinkHandler {
    fn handle(&self, handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
        let text = handlers.walk_children(element.node).content;
        let target =
            get_attr(&element, "href").and_then(|href| resolve(self.base_url.as_ref(), &href));

        let content = match target {
            Some(url) if text.trim().is_empty() => format!("[]({url})"),
            Some(url) => surround(&text, "[", &format!("]({url})")),
            None => text,
        };
        Some(HandlerResult::from(content))
    }
}

struct ImageHandler {
    base_url: Option<Url>,
}

impl ElementHandler for ImageHandler {
    fn handle(&self, _handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
        let src = get_attr(&element, "src").unwrap_or_default();
        let src = src.trim();
        if src.is_empty() {
            return Some(HandlerResult::from(String::new()));
        }

        let target = self
            .base_url
            .as_ref()
            .and_then(|base| base.join(src).ok())
            .map_or_else(|| src.to_string(), String::from);
        let alt = get_attr(&element, "alt").unwrap_or_default();
        let alt = alt.split_whitespace().collect::<Vec<_>>().join(" ");

        Some(HandlerResult::from(format!("![{alt}]({target})")))
    }
}

struct HorizontalRuleHandler;

impl ElementHandler for HorizontalRuleHandler {
    fn handle(&self, _handlers: &dyn Handlers, _element: Element) -> Option<HandlerResult> {
        Some(HandlerResult::from("\n\n---\n\n"))
    }
}

fn get_attr(element: &Element, name: &str) -> Option<String> {
    element
        .attrs
        .iter()
        .find(|a| &*a.name.local == name)
        .map(|a| a.value.to_string())
}

/// Resolve a link target to an absolute URL. `javascript:` and empty targets
/// are not links.
fn resolve(base_url: Option<&Url>, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let url = match base_url {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };

    (url.scheme() != "javascript").then_some(url)
}

/// Wrap `content` in delimiters, keeping its outer whitespace outside them.
fn surround(content: &str, open: &str, close: &str) -> String {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return content.to_string();
    }

    let lead = if content.starts_with(char::is_whitespace) { " " } else { "" };
    let trail = if content.ends_with(char::is_whitespace) { " " } else { "" };
    format!("{lead}{open}{trimmed}{close}{trail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_matching_rule_claims_the_tag() {
        assert_eq!(rule_for("nav").unwrap().name, "page-chrome");
        assert_eq!(rule_for("script").unwrap().name, "script-style");
        assert_eq!(rule_for("svg").unwrap().name, "non-content");
        assert_eq!(rule_for("pre").unwrap().name, "code-block");
        assert_eq!(rule_for("a").unwrap().action, Action::Link);
        assert!(rule_for("div").is_none());
        assert!(rule_for("h2").is_none());
    }

    #[test]
    fn prepare_removes_dropped_subtrees() {
        let doc = Html::parse_document(
            "<nav><a href='https://a.com/'>Home</a></nav><script>var x = 1;</script>\
             <p>kept <b>bold</b></p><footer>bye</footer>",
        );
        let prepared = prepare(&doc);

        assert!(prepared.html.contains("<p>kept <b>bold</b></p>"));
        assert!(!prepared.html.contains("Home"));
        assert!(!prepared.html.contains("var x"));
        assert!(!prepared.html.contains("bye"));
        assert!(!prepared.html.contains("<head>"));
    }

    #[test]
    fn prepare_snapshots_code_blocks() {
        let doc = Html::parse_document(
            "<pre class=\"language-python\">\n\ndef f():\n    return 1 &lt; 2\n\n</pre><pre>  </pre>",
        );
        let prepared = prepare(&doc);

        assert_eq!(
            prepared.fences,
            vec!["```python\ndef f():\n    return 1 < 2\n```".to_string(), String::new()]
        );
        assert!(prepared.html.contains(r#"<pre data-sitescribe-fence="0"></pre>"#));
        assert!(prepared.html.contains(r#"<pre data-sitescribe-fence="1"></pre>"#));
    }

    #[test]
    fn prepare_escapes_text_and_attributes() {
        let doc = Html::parse_document(r#"<p title="a &quot;b&quot;">x &lt;y&gt; &amp; z</p>"#);
        let prepared = prepare(&doc);
        assert!(prepared.html.contains(r#"<p title="a &quot;b&quot;">x &lt;y&gt; &amp; z</p>"#));
    }

    #[test]
    fn prepare_flattens_past_the_depth_cap() {
        let depth = MAX_DEPTH + 50;
        let html = format!("{}<em>deep</em> text{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let prepared = prepare(&Html::parse_document(&html));

        assert!(prepared.html.contains("deep text"));
        assert!(!prepared.html.contains("<em>"));
        assert!(prepared.html.matches("<div>").count() < MAX_DEPTH);
    }

    #[test]
    fn deeply_nested_document_renders_on_a_small_stack() {
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(|| {
                let html = format!(
                    "<p>top</p>{}bottom{}",
                    "<div>".repeat(3000),
                    "</div>".repeat(3000)
                );
                Renderer::new(None).render(&html)
            })
            .unwrap();

        let md = handle.join().unwrap();
        assert!(md.contains("top"));
        assert!(md.contains("bottom"));
    }

    #[test]
    fn pre_keeps_inner_formatting() {
        let md = Renderer::new(None)
            .render("<pre class=\"language-python\">\n\ndef f():\n    return 1\n\n</pre>");
        assert!(md.contains("```python\ndef f():\n    return 1\n```"));
    }

    #[test]
    fn link_without_resolvable_href_is_plain_text() {
        let r = Renderer::new(None);
        assert_eq!(r.render("<p><a href=\"/relative\">rel</a></p>").trim(), "rel");
        assert_eq!(r.render("<p><a>none</a></p>").trim(), "none");
        assert_eq!(r.render("<p><a href=\"javascript:void(0)\">js</a></p>").trim(), "js");
        assert_eq!(
            r.render("<p><a href=\"https://a.com/x\">abs</a></p>").trim(),
            "[abs](https://a.com/x)"
        );
    }

    #[test]
    fn relative_links_and_images_resolve_against_base() {
        let base = Url::parse("https://a.com/docs/intro").unwrap();
        let md = Renderer::new(Some(&base))
            .render("<p>See <a href=\"setup#top\">setup</a></p><p><img src=\"../logo.png\" alt=\"Logo\"></p>");

        assert!(md.contains("[setup](https://a.com/docs/setup#top)"));
        assert!(md.contains("![Logo](https://a.com/logo.png)"));
    }

    #[test]
    fn empty_anchor_keeps_target() {
        let md = Renderer::new(None).render("<p><a href=\"https://a.com/x\"></a></p>");
        assert_eq!(md.trim(), "[](https://a.com/x)");
    }

    #[test]
    fn surround_moves_whitespace_outside() {
        assert_eq!(surround(" the intro ", "[", "](u)"), " [the intro](u) ");
        assert_eq!(surround("x", "[", "](u)"), "[x](u)");
        assert_eq!(surround("  ", "[", "](u)"), "  ");
    }

    #[test]
    fn resolve_rejects_script_and_empty_targets() {
        let base = Url::parse("https://a.com/").unwrap();
        assert!(resolve(Some(&base), "  ").is_none());
        assert!(resolve(Some(&base), "javascript:alert(1)").is_none());
        assert_eq!(resolve(Some(&base), "x").unwrap().as_str(), "https://a.com/x");
        assert!(resolve(None, "x").is_none());
    }
}
