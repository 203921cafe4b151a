//! Structural truncation for oversized document text.
//!
//! Reduces text to a token-derived character budget while preserving whole
//! sections instead of cutting at an arbitrary offset. Sections are detected
//! by header heuristics; the first section (assumed introduction) is always
//! kept and the remainder are added shortest-first, on the theory that
//! several short, dense sections carry more signal for a downstream
//! summarizer than one long contiguous excerpt.

/// Approximate chars-per-token ratio used to convert a token budget into a
/// character budget. Independent of the orchestrator's token estimator.
const CHARS_PER_TOKEN: f64 = 1.3;

/// Margin left per kept section for the blank-line join separators.
const SECTION_JOIN_MARGIN: usize = 50;

const TRUNCATION_MARKER: &str = "\n\n[Content truncated]";

/// Fit `text` into a budget of `max_tokens`. Returns the text unchanged
/// when it already fits.
pub fn fit(text: &str, max_tokens: usize) -> String {
    let max_chars = (max_tokens as f64 * CHARS_PER_TOKEN) as usize;

    if char_len(text) <= max_chars {
        return text.to_string();
    }

    let sections = split_sections(text);

    if sections.is_empty() {
        // No structure to work with: take the first 80% of the budget.
        return take_chars(text, max_chars * 8 / 10);
    }

    // Always keep the first section, then fill with the shortest remaining.
    let mut selected: Vec<&str> = vec![&sections[0]];
    let mut current_len = char_len(&sections[0]);

    let mut remaining: Vec<&String> = sections[1..].iter().collect();
    remaining.sort_by_key(|s| char_len(s));

    for section in remaining {
        if current_len + char_len(section) + SECTION_JOIN_MARGIN < max_chars {
            selected.push(section);
            current_len += char_len(section);
        } else {
            break;
        }
    }

    let result = selected.join("\n\n");

    // Pathological case: a single kept section larger than the budget.
    if char_len(&result) > max_chars {
        let mut truncated = take_chars(&result, max_chars.saturating_sub(SECTION_JOIN_MARGIN));
        truncated.push_str(TRUNCATION_MARKER);
        return truncated;
    }

    result
}

/// Group consecutive lines into sections, starting a new section whenever a
/// line looks like a header.
fn split_sections(text: &str) -> Vec<String> {
    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            if !current.is_empty() {
                current.push(line);
            }
            continue;
        }

        if looks_like_header(stripped) && !current.is_empty() {
            sections.push(current.join("\n"));
            current = vec![line];
        } else {
            current.push(line);
        }
    }

    if !current.is_empty() {
        sections.push(current.join("\n"));
    }

    sections
}

/// Header heuristics: short ALL-CAPS line, markdown heading, short line with
/// a digit among its first 5 characters, or a short line ending in a colon.
fn looks_like_header(stripped: &str) -> bool {
    let len = stripped.chars().count();
    let all_caps = len < 80
        && stripped.chars().any(|c| c.is_alphabetic())
        && !stripped.chars().any(|c| c.is_lowercase());

    all_caps
        || stripped.starts_with('#')
        || (len < 60 && stripped.chars().take(5).any(|c| c.is_ascii_digit()))
        || (stripped.ends_with(':') && len < 50)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `n` characters of `s`, always splitting on a char boundary.
fn take_chars(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}
