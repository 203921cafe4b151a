//! Deterministic fallback summarizer.
//!
//! Produces a structured summary from lexical heuristics alone — no model
//! calls, no I/O, no failure modes. This is the terminal strategy of the
//! summarization chain: when every model candidate is exhausted, ingestion
//! still ships a usable (if plain) summary instead of blocking.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::extract::file_extension;

static CODE_DECL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)def\s+(\w+)",
        r"(?i)class\s+(\w+)",
        r"(?i)function\s+(\w+)",
        r"(?i)const\s+(\w+)",
        r"(?i)import\s+.*?(\w+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("code declaration pattern should compile"))
    .collect()
});

static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)*\b").expect("numeric token pattern should compile"));

const CODE_EXTENSIONS: &[&str] = &["py", "js", "ts"];
const DOC_EXTENSIONS: &[&str] = &["md", "txt"];

const KEYWORD_SCAN_LINES: usize = 50;
const NUMBER_SCAN_CHARS: usize = 2000;
const SENTENCE_SCAN_CHARS: usize = 1000;
const MAX_NUMBERS: usize = 5;
const MAX_KEYWORDS: usize = 12;
const MAX_KEY_FACTS: usize = 6;

/// Build a structured summary for `text` without any model dependency.
///
/// Output grammar: `SUMMARY:`, `KEYWORDS:`, `USE_FOR:`, `AVOID_FOR:`,
/// `KEY_FACTS:` — one labeled line each, in that order.
pub fn fallback_summary(text: &str, filename: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let extension = file_extension(filename);
    let keywords = extract_keywords(text, &lines, extension.as_deref());
    let key_facts = extract_key_facts(text, &lines, extension.as_deref());

    let sentence = first_meaningful_sentence(text).unwrap_or_else(|| match extension.as_deref() {
        Some(ext) => format!("A .{} file containing structured data and code", ext),
        None => "A file containing structured data and code".to_string(),
    });

    let keyword_line = if keywords.is_empty() {
        "file, content, data, structure".to_string()
    } else {
        keywords
            .iter()
            .take(MAX_KEYWORDS)
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let fact_line = key_facts
        .iter()
        .take(MAX_KEY_FACTS)
        .cloned()
        .collect::<Vec<_>>()
        .join("; ");

    format!(
        "SUMMARY: {}. This file contains {} lines of content.\n\
         KEYWORDS: {}\n\
         USE_FOR: {} queries, file content search, structure analysis\n\
         AVOID_FOR: unrelated files, different file types, external content\n\
         KEY_FACTS: {}",
        sentence,
        lines.len(),
        keyword_line,
        filename,
        fact_line
    )
}

/// Extension-specific lexical keywords: declaration identifiers for code,
/// heading lines for documentation. Insertion-ordered and deduplicated so
/// output is stable across runs.
fn extract_keywords(text: &str, lines: &[&str], extension: Option<&str>) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let push = |kw: String, keywords: &mut Vec<String>| {
        if !kw.is_empty() && !keywords.contains(&kw) {
            keywords.push(kw);
        }
    };

    match extension {
        Some(ext) if CODE_EXTENSIONS.contains(&ext) => {
            for pattern in CODE_DECL_PATTERNS.iter() {
                for caps in pattern.captures_iter(text) {
                    if let Some(m) = caps.get(1) {
                        push(m.as_str().to_string(), &mut keywords);
                    }
                }
            }
        }
        Some(ext) if DOC_EXTENSIONS.contains(&ext) => {
            for line in lines.iter().take(KEYWORD_SCAN_LINES) {
                let is_heading = line.starts_with('#');
                let is_shouting = line.chars().count() < 80
                    && line.chars().any(|c| c.is_alphabetic())
                    && !line.chars().any(|c| c.is_lowercase());
                if is_heading || is_shouting {
                    push(
                        line.trim_start_matches('#').trim().to_string(),
                        &mut keywords,
                    );
                }
            }
        }
        _ => {}
    }

    keywords
}

fn extract_key_facts(text: &str, lines: &[&str], extension: Option<&str>) -> Vec<String> {
    let mut facts = Vec::new();

    let head: String = text.chars().take(NUMBER_SCAN_CHARS).collect();
    let numbers: Vec<&str> = NUMERIC_TOKEN
        .find_iter(&head)
        .map(|m| m.as_str())
        .take(MAX_NUMBERS)
        .collect();
    if !numbers.is_empty() {
        facts.push(format!("Contains numeric values: {}", numbers.join(", ")));
    }

    facts.push(format!(
        "File size: {} characters",
        group_thousands(text.chars().count())
    ));
    facts.push(format!("Lines: {}", group_thousands(lines.len())));
    facts.push(format!(
        "File type: {}",
        extension
            .map(|e| format!(".{}", e))
            .unwrap_or_else(|| "unknown".to_string())
    ));

    facts
}

/// First sentence from the head of the text that is long enough to be
/// meaningful and is not an import or comment line.
fn first_meaningful_sentence(text: &str) -> Option<String> {
    let head: String = text.chars().take(SENTENCE_SCAN_CHARS).collect();
    head.split(['.', '!', '?'])
        .map(str::trim)
        .find(|s| {
            s.chars().count() > 20
                && !s.starts_with("import")
                && !s.starts_with("from")
                && !s.starts_with('#')
                && !s.starts_with("//")
        })
        .map(str::to_string)
}

fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_follows_fixed_grammar() {
        let summary = fallback_summary("Some document content with enough length here.", "a.txt");
        for label in ["SUMMARY:", "KEYWORDS:", "USE_FOR:", "AVOID_FOR:", "KEY_FACTS:"] {
            assert!(summary.contains(label), "missing {}", label);
        }
    }

    #[test]
    fn code_file_yields_declaration_keywords() {
        let source = "import os\n\ndef compute_total(x):\n    return x\n\nclass ReportBuilder:\n    pass\n";
        let summary = fallback_summary(source, "report.py");
        assert!(summary.contains("compute_total"));
        assert!(summary.contains("ReportBuilder"));
    }

    #[test]
    fn markdown_headings_become_keywords() {
        let doc = "# Billing Overview\n\nRegular prose goes here.\n\n## Invoice States\n\nMore prose.\n";
        let summary = fallback_summary(doc, "billing.md");
        assert!(summary.contains("Billing Overview"));
        assert!(summary.contains("Invoice States"));
    }

    #[test]
    fn numeric_tokens_reported_as_fact() {
        let doc = "Version 2.4.1 shipped on port 8080 with 3 retries configured.";
        let summary = fallback_summary(doc, "notes.txt");
        assert!(summary.contains("Contains numeric values: 2.4.1, 8080, 3"));
    }

    #[test]
    fn skips_import_lines_when_picking_the_summary_sentence() {
        let source = "from collections import deque.\nThe billing service reconciles usage nightly.\n";
        let summary = fallback_summary(source, "svc.py");
        assert!(summary.contains("The billing service reconciles usage nightly"));
    }

    #[test]
    fn synthesizes_sentence_when_nothing_qualifies() {
        let summary = fallback_summary("short. tiny. no", "data.bin");
        assert!(summary.contains("A .bin file containing structured data and code"));
    }

    #[test]
    fn empty_keywords_fall_back_to_generic_list() {
        let summary = fallback_summary("No headings here, just plain prose lines.", "blob.dat");
        assert!(summary.contains("KEYWORDS: file, content, data, structure"));
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(5), "5");
        assert_eq!(group_thousands(1234), "1,234");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn deterministic_output() {
        let doc = "# Title\n\ndef alpha():\n    pass\n";
        assert_eq!(
            fallback_summary(doc, "mod.py"),
            fallback_summary(doc, "mod.py")
        );
    }
}
