//! Post-conversion cleanup pipeline for Markdown output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! Line filters see every line of the document, fenced code included.

use std::sync::LazyLock;

use regex::Regex;

/// Lines starting with these (after trimming) are leftover CSS/script/JSON noise.
const SKIP_PREFIXES: &[&str] = &[":root", "try {", "{\"props\":"];

/// Run the full cleanup pipeline on raw Markdown text.
pub(crate) fn run_pipeline(md: &str) -> String {
    let mut result = drop_noise_lines(md);

    result = strip_trailing_whitespace(&result);
    result = collapse_blank_lines(&result);
    result = unindent_list_markers(&result);
    result = tighten_code_fences(&result);

    result.trim().to_string()
}

/// Whether `line` opens or closes a fenced code block.
fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with("```")
}

// ---------------------------------------------------------------------------
// Pass 1: Drop noise lines
// ---------------------------------------------------------------------------

/// Remove stray CSS/script/JSON lines. Blank lines are always kept.
fn drop_noise_lines(md: &str) -> String {
    md.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !SKIP_PREFIXES.iter().any(|p| trimmed.starts_with(p))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 2: Strip trailing whitespace
// ---------------------------------------------------------------------------

fn strip_trailing_whitespace(md: &str) -> String {
    md.lines()
        .map(|line| line.trim_end_matches([' ', '\t']))
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Pass 3: Collapse blank lines
// ---------------------------------------------------------------------------

/// Collapse runs of 3+ newlines into exactly one blank line.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Unindent list markers
// ---------------------------------------------------------------------------

/// Move list items (`-`, `*`, `+`, `N.`) to column 0.
fn unindent_list_markers(md: &str) -> String {
    static INDENTED_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?m)^[ \t]+([-*+]|\d+\.) ").expect("valid regex")
    });

    INDENTED_MARKER_RE.replace_all(md, "$1 ").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: Tighten code fences
// ---------------------------------------------------------------------------

/// No blank line directly after an opening fence or before a closing fence.
fn tighten_code_fences(md: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_fence = false;
    let mut after_open = false;

    for line in md.lines() {
        if !in_fence {
            if is_fence(line) {
                in_fence = true;
                after_open = true;
            }
            out.push(line);
            continue;
        }

        if is_fence(line) {
            while out.last().is_some_and(|l| l.trim().is_empty()) {
                out.pop();
            }
            out.push(line);
            in_fence = false;
        } else if after_open && line.trim().is_empty() {
            continue;
        } else {
            after_open = false;
            out.push(line);
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_skip_prefixed_lines_in_order() {
        let input = "keep one\n:root{color:red}\n  try { init() } catch {}\nkeep two\n{\"props\":{\"page\":1}}\nkeep three";
        assert_eq!(drop_noise_lines(input), "keep one\nkeep two\nkeep three");
    }

    #[test]
    fn drop_noise_keeps_blank_lines_and_applies_inside_code() {
        let input = "a\n\n:root{}\n\n```js\ntry {\n  run()\n} catch {}\n:root{color:red}\n```";
        assert_eq!(
            drop_noise_lines(input),
            "a\n\n\n```js\n  run()\n} catch {}\n```"
        );
    }

    #[test]
    fn four_newlines_collapse_to_two() {
        assert_eq!(collapse_blank_lines("Line 1\n\n\n\nLine 2"), "Line 1\n\nLine 2");
        assert_eq!(collapse_blank_lines("Line 1\n\nLine 2"), "Line 1\n\nLine 2");
    }

    #[test]
    fn strips_trailing_whitespace() {
        assert_eq!(strip_trailing_whitespace("Line 1   \nLine 2\t\nLine 3"), "Line 1\nLine 2\nLine 3");
    }

    #[test]
    fn unindents_list_markers_everywhere() {
        let input = "  - item\n\t* star\n   12. twelve\n  not a list\n```\n    3. three\n```";
        assert_eq!(
            unindent_list_markers(input),
            "- item\n* star\n12. twelve\n  not a list\n```\n3. three\n```"
        );
    }

    #[test]
    fn tightens_fence_padding() {
        let input = "```go\n\nfmt.Println()\n\n```\n\nafter";
        assert_eq!(tighten_code_fences(input), "```go\nfmt.Println()\n```\n\nafter");
    }

    #[test]
    fn tighten_keeps_inner_blank_lines() {
        let input = "```\na\n\nb\n```";
        assert_eq!(tighten_code_fences(input), input);
    }

    #[test]
    fn full_pipeline_cleans_markdown() {
        let input = "\n\n# Title   \n\n\n\n\n:root{--x:1}\n\n  - one\n  - two\n\n```python\n\nprint('hi')\n\n```\n\n\nEnd  \n\n";
        assert_eq!(
            run_pipeline(input),
            "# Title\n\n- one\n- two\n\n```python\nprint('hi')\n```\n\nEnd"
        );
    }
}
