//! Completion Parsing
//!
//! Turns a raw text completion into a [`GenerationResult`]:
//! - import-like lines are pulled out (in order) as suggested imports
//! - comment spans become the explanation; block comments are also dropped
//!   from the code body
//! - a wrapping markdown fence is dropped from the code body
//! - a marker count gives a rough coverage estimate
//!
//! Comments are found by a scan that tracks string literals, so `'src/**/*.ts'`
//! or `'http://host'` inside a quote never opens a comment.
//!
//! The coverage figure is a heuristic proxy (marker count × weight, clamped),
//! never a measured value.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::constants::parser as parser_constants;
use crate::types::{CoverageEstimate, GenerationResult};

/// Stateless completion parser; patterns are compiled once per instance
#[derive(Debug, Clone)]
pub struct ResponseParser {
    import_line: Regex,
    fence: Regex,
    coverage_marker: Regex,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

static SHARED: LazyLock<ResponseParser> = LazyLock::new(ResponseParser::new);

impl ResponseParser {
    /// Process-wide instance
    pub fn shared() -> &'static ResponseParser {
        &SHARED
    }

    pub fn new() -> Self {
        Self {
            // ES/TS imports, Python-style from-imports, CommonJS requires
            import_line: Regex::new(
                r"^(?:import\s.*|from\s+\S+\s+import\s.*|(?:const|let|var)\s+[^=]+=\s*require\(.*\).*)$",
            )
            .unwrap(),
            fence: Regex::new(r"(?s)\A```[\w+-]*[ \t]*\r?\n(.*?)\r?\n?```\z").unwrap(),
            coverage_marker: Regex::new(r"\b(?:describe|it|test|expect)\(|\b(?:assert|should)\.")
                .unwrap(),
        }
    }

    /// Parse a completion. Never fails; missing parts come back empty.
    pub fn parse(&self, completion: &str) -> GenerationResult {
        let (body, suggested_imports) = self.split_imports(completion);
        let body = strip_block_comments(&body);
        let test_code = self.strip_fence(body.trim()).trim().to_string();

        GenerationResult {
            test_code,
            explanation: Some(self.extract_comments(completion)),
            suggested_imports,
            coverage: Some(CoverageEstimate {
                estimated_coverage: self.estimate_coverage(completion),
                uncovered_paths: Vec::new(),
            }),
        }
    }

    /// Import lines in original order, trimmed, and the text without them
    pub fn split_imports(&self, text: &str) -> (String, Vec<String>) {
        let mut imports = Vec::new();
        let mut kept = Vec::new();

        for line in text.lines() {
            let trimmed = line.trim();
            if self.import_line.is_match(trimmed) {
                imports.push(trimmed.to_string());
            } else {
                kept.push(line);
            }
        }

        (kept.join("\n"), imports)
    }

    /// Comment spans without delimiters, trimmed and newline-joined
    pub fn extract_comments(&self, text: &str) -> String {
        comment_spans(text)
            .into_iter()
            .map(|span| span.inner)
            .filter(|inner| !inner.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Approximate coverage in 0..=100
    pub fn estimate_coverage(&self, text: &str) -> u8 {
        let markers = self.coverage_marker.find_iter(text).count() as u64;
        let weighted = markers.saturating_mul(u64::from(parser_constants::COVERAGE_WEIGHT));
        weighted.min(u64::from(parser_constants::MAX_COVERAGE)) as u8
    }

    fn strip_fence<'a>(&self, text: &'a str) -> &'a str {
        match self.fence.captures(text).and_then(|caps| caps.get(1)) {
            Some(inner) => inner.as_str(),
            None => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommentStyle {
    Block,
    Line,
}

#[derive(Debug)]
struct CommentSpan<'a> {
    range: Range<usize>,
    style: CommentStyle,
    /// Text without delimiters or decorative `*`, trimmed
    inner: &'a str,
}

/// A comment may open at line start, after whitespace or after `;{}`
fn opens_comment(bytes: &[u8], at: usize) -> bool {
    at == 0
        || matches!(
            bytes[at - 1],
            b' ' | b'\t' | b'\n' | b'\r' | b';' | b'{' | b'}'
        )
}

/// Comment spans outside string literals, in source order.
///
/// `'` and `"` strings end at a newline; template literals may span lines.
/// An unterminated block comment is not a comment.
fn comment_spans(text: &str) -> Vec<CommentSpan<'_>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if let Some(q) = quote {
            if b == b'\\' {
                i += 2;
                continue;
            }
            if b == q || (b == b'\n' && q != b'`') {
                quote = None;
            }
            i += 1;
            continue;
        }

        match b {
            b'\'' | b'"' | b'`' => quote = Some(b),
            b'/' if bytes.get(i + 1) == Some(&b'*') && opens_comment(bytes, i) => {
                let body_start = i + 2;
                if let Some(offset) = text[body_start..].find("*/") {
                    let end = body_start + offset + 2;
                    spans.push(CommentSpan {
                        range: i..end,
                        style: CommentStyle::Block,
                        inner: text[body_start..body_start + offset]
                            .trim()
                            .trim_matches('*')
                            .trim(),
                    });
                    i = end;
                    continue;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') && opens_comment(bytes, i) => {
                let end = text[i..].find('\n').map_or(text.len(), |o| i + o);
                spans.push(CommentSpan {
                    range: i..end,
                    style: CommentStyle::Line,
                    inner: text[i + 2..end].trim(),
                });
                i = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    spans
}

/// `text` with block comments removed; line comments and strings untouched
fn strip_block_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in comment_spans(text)
        .into_iter()
        .filter(|s| s.style == CommentStyle::Block)
    {
        out.push_str(&text[cursor..span.range.start]);
        cursor = span.range.end;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_and_block_comment() {
        let parser = ResponseParser::new();
        let raw = "import { add } from './math';\n\
                   import assert from 'assert';\n\
                   /* Covers the happy path */\n\
                   describe('add', () => {\n  it('sums', () => { expect(add(1, 2)).toBe(3); });\n});";

        let result = parser.parse(raw);

        assert_eq!(
            result.suggested_imports,
            vec![
                "import { add } from './math';".to_string(),
                "import assert from 'assert';".to_string(),
            ]
        );
        assert!(!result.test_code.contains("import { add }"));
        assert!(!result.test_code.contains("import assert"));
        assert!(!result.test_code.contains("Covers the happy path"));
        assert!(result.test_code.starts_with("describe('add'"));
        assert_eq!(result.explanation.as_deref(), Some("Covers the happy path"));
    }

    #[test]
    fn test_no_comments_gives_empty_explanation() {
        let parser = ResponseParser::new();
        let result = parser.parse("test('x', () => {});");
        assert_eq!(result.explanation.as_deref(), Some(""));
    }

    #[test]
    fn test_line_and_jsdoc_comments_joined_in_order() {
        let parser = ResponseParser::new();
        let raw = "/** Suite for add */\n// first case\ntest('a', () => {});";
        assert_eq!(parser.extract_comments(raw), "Suite for add\nfirst case");
    }

    #[test]
    fn test_require_and_from_imports() {
        let parser = ResponseParser::new();
        let raw = "const sinon = require('sinon');\nfrom unittest import mock\nlet x = 1;";
        let (body, imports) = parser.split_imports(raw);
        assert_eq!(
            imports,
            vec!["const sinon = require('sinon');", "from unittest import mock"]
        );
        assert_eq!(body, "let x = 1;");
    }

    #[test]
    fn test_strips_wrapping_fence() {
        let parser = ResponseParser::new();
        let raw = "```typescript\nimport { a } from './a';\ntest('a', () => {});\n```";
        let result = parser.parse(raw);
        assert_eq!(result.test_code, "test('a', () => {});");
        assert_eq!(result.suggested_imports.len(), 1);
    }

    #[test]
    fn test_coverage_counts_markers() {
        let parser = ResponseParser::new();
        assert_eq!(parser.estimate_coverage("test('a', () => {});"), 5);
        assert_eq!(
            parser.estimate_coverage("describe('s', () => { it('a', () => { expect(1); }); });"),
            15
        );
        assert_eq!(parser.estimate_coverage("assert.equal(1, 1); x.should.eql(1)"), 10);
        // Word boundary: submit( and latest( are not markers
        assert_eq!(parser.estimate_coverage("submit(); latest();"), 0);
    }

    #[test]
    fn test_coverage_clamped() {
        let parser = ResponseParser::new();
        let raw = "expect(1);".repeat(40);
        assert_eq!(parser.estimate_coverage(&raw), 100);
    }

    #[test]
    fn test_glob_and_url_strings_are_not_comments() {
        let parser = ResponseParser::new();
        let raw = "import { load } from './load';\n\
                   test('finds specs', () => {\n  \
                   expect(load('src/**/*.test.ts')).toHaveLength(2);\n  \
                   expect(fetchUrl(\"http://localhost:3000/api\")).toBeDefined();\n\
                   });\n\
                   /* covers glob loading */";

        let result = parser.parse(raw);

        assert!(result.test_code.contains("'src/**/*.test.ts'"));
        assert!(result.test_code.contains("\"http://localhost:3000/api\""));
        assert!(result.test_code.ends_with("});"));
        assert!(!result.test_code.contains("covers glob loading"));
        assert_eq!(result.explanation.as_deref(), Some("covers glob loading"));
    }

    #[test]
    fn test_template_literal_spans_lines() {
        let parser = ResponseParser::new();
        let raw = "const pattern = `\n/* not a comment */\n`;\n// real note";
        assert_eq!(parser.extract_comments(raw), "real note");
        assert!(parser.parse(raw).test_code.contains("/* not a comment */"));
    }

    #[test]
    fn test_escaped_quote_keeps_string_open() {
        let parser = ResponseParser::new();
        let raw = "it('isn\\'t /* a comment */', () => {}); /* trailing */";
        let result = parser.parse(raw);
        assert!(result.test_code.contains("/* a comment */"));
        assert_eq!(result.explanation.as_deref(), Some("trailing"));
    }

    #[test]
    fn test_empty_completion() {
        let parser = ResponseParser::new();
        let result = parser.parse("");
        assert!(result.test_code.is_empty());
        assert!(result.suggested_imports.is_empty());
        assert_eq!(result.estimated_coverage(), Some(0));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn coverage_bounded_and_weighted(text in ".{0,400}") {
                let coverage = ResponseParser::shared().estimate_coverage(&text);
                prop_assert!(coverage <= 100);
                prop_assert_eq!(coverage % 5, 0);
            }

            #[test]
            fn imports_never_left_in_body(modules in prop::collection::vec("[a-z]{1,8}", 0..6)) {
                let mut raw: String = modules
                    .iter()
                    .map(|m| format!("import {m} from './{m}';\n"))
                    .collect();
                raw.push_str("test('works', () => {});");

                let result = ResponseParser::shared().parse(&raw);
                prop_assert_eq!(result.suggested_imports.len(), modules.len());
                prop_assert_eq!(result.test_code, "test('works', () => {});");
            }
        }
    }
}
