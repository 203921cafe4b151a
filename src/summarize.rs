//! Summary orchestration.
//!
//! Tries an ordered list of model candidates, validates each response, and
//! returns the first valid structured summary. Candidates are tried strictly
//! in sequence — each attempt spends real output-token budget, so the policy
//! is try-cheapest-first rather than fan-out. When the whole ladder fails,
//! the deterministic fallback produces the summary instead; this function
//! always returns usable text and never fails.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::chunk;
use crate::config::SummarizeConfig;
use crate::fallback::fallback_summary;
use crate::transport::{ChatRequest, ChatTransport};

/// Approximate tokens-per-character estimate for English-leaning text.
/// Deliberately independent of the chunker's chars-per-token ratio.
const TOKENS_PER_CHAR: f64 = 0.75;

/// Produce a structured summary for `text`.
///
/// `transport` is `None` when no summarization provider is configured; the
/// deterministic fallback is used directly in that case.
pub async fn summarize(
    transport: Option<&dyn ChatTransport>,
    config: &SummarizeConfig,
    text: &str,
    filename: &str,
) -> String {
    if let Some(transport) = transport {
        if let Some(summary) = try_candidates(transport, config, text, filename).await {
            return summary;
        }
        error!(
            file = %filename,
            "all model candidates failed, using deterministic fallback"
        );
    } else {
        info!(file = %filename, "summarization provider disabled, using deterministic fallback");
    }

    fallback_summary(text, filename)
}

/// Walk the candidate ladder; `None` when every candidate fails.
async fn try_candidates(
    transport: &dyn ChatTransport,
    config: &SummarizeConfig,
    text: &str,
    filename: &str,
) -> Option<String> {
    let estimated_tokens = (text.chars().count() as f64 * TOKENS_PER_CHAR) as usize;

    for candidate in &config.models {
        let usable_context = candidate.context_tokens.saturating_sub(config.reserved_tokens);
        if usable_context == 0 {
            warn!(
                model = %candidate.name,
                context_tokens = candidate.context_tokens,
                "candidate context smaller than reserved budget, skipping"
            );
            continue;
        }

        let content: Cow<'_, str> = if estimated_tokens <= usable_context {
            Cow::Borrowed(text)
        } else {
            Cow::Owned(chunk::fit(text, usable_context))
        };

        let prompt = build_prompt(filename, &content);

        let response = match transport
            .complete(ChatRequest {
                model: &candidate.name,
                prompt: &prompt,
                temperature: config.temperature,
                max_tokens: config.max_output_tokens,
            })
            .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(model = %candidate.name, error = %e, "model call failed, trying next candidate");
                continue;
            }
        };

        let summary = match parse_response(&response) {
            Some(summary) => summary,
            None => {
                warn!(model = %candidate.name, "unexpected response shape, trying next candidate");
                continue;
            }
        };

        if is_valid_summary(&summary) {
            info!(
                model = %candidate.name,
                chars = summary.chars().count(),
                "summary generated"
            );
            return Some(summary);
        }

        warn!(model = %candidate.name, "response failed structural validation, trying next candidate");
    }

    None
}

/// Pull the summary text out of a response payload.
///
/// Accepts the choice-list shape (`choices[0].message.content`) and the flat
/// shape (top-level `content`); anything else is a contract violation.
fn parse_response(response: &Value) -> Option<String> {
    if let Some(content) = response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        return Some(content.trim().to_string());
    }
    response
        .get("content")
        .and_then(Value::as_str)
        .map(|content| content.trim().to_string())
}

/// Structural validation: the response must be non-empty and carry the card
/// grammar the prompt asks for — a `Title:` card line and the `Cards:`
/// trailer.
fn is_valid_summary(summary: &str) -> bool {
    !summary.is_empty() && summary.contains("Title:") && summary.contains("Cards:")
}

/// The card-grammar prompt. The label set, ordering, and separators are a
/// wire format consumed by downstream routing parsers; reproduce exactly.
fn build_prompt(filename: &str, content: &str) -> String {
    format!(
        r#"Create an ACTIONABLE brief that serves two purposes: (1) high-signal context to inject into an AI agent; (2) clear routing rules so the agent knows WHEN to query this file via semantic search. Do NOT infer beyond the file. If something isn’t present, write "None".
File: {filename}
Content:
{content}

OUTPUT — PLAIN TEXT ONLY (no JSON/Markdown).
- Emit 1–5 CARDS if the file covers distinct topics/modules/features.
- Separate cards with a single line: ---
- Each card MUST follow the label order below, one line per label.
- For multi-item labels, separate items with "; " (semicolon + space).
- Keep identifiers exact (case/punctuation). Normalize dates to YYYY-MM-DD. Include units for numbers.
- Max ~180 words per card. No extra lines before the first label or after the last label.

Card: <1-based index>
Title: <5–9 words capturing this card’s scope>
Context: <2–4 sentences to inject verbatim: what this is; key capability; constraints>
Use If: <3–6 precise triggers (query intents, entities, conditions) that SHOULD route here>
Avoid If: <2–4 cases where this card SHOULD NOT be used>
Signals (Strict): <4–8 exact tokens/APIs/paths/IDs/error codes/config keys/tables>
Signals (Fuzzy): <6–12 synonyms/aliases/near-terms that often imply this topic>
Key Facts: <4–8 atomic facts with exact names/IDs/dates/versions/limits>
Inputs Needed: <required params/resources: IDs; roles/scopes; time ranges; files; env vars>
Actions: <concrete ops enabled: compute; look up; call API X; query table Y; transform; route>
Caveats: <constraints; edge conditions; rate limits; privacy/security notes; staleness>
Related: <adjacent tools/files/modules to check; exact names or paths>
Confidence: <High/Medium/Low — 1-line reason>

FINAL LINES (after all cards):
Cards: <number of cards emitted>
Index: <Card 1 Title>; <Card 2 Title>; <…>
GlobalUseIf: <3–6 cross-card triggers that most strongly indicate this file>
GlobalAvoidIf: <2–4 cross-card no-go cases (e.g., different product/version/domain)>
Validity: <date range or “Unknown”> ; Owner: <team/author if present>

QUALITY BAR:
- Prefer facts over prose; ignore boilerplate (ToC, headers, legal).
- Extract canonical terminology (functions/classes/APIs), config keys, file paths, schemas, error codes.
- Represent decision logic (preconditions/branches) as “Use If”/“Avoid If” signals.
- If many sections, choose the top 3–5 by impact (usage frequency, dependency weight, criticality).
- If homogeneous content, emit a single high-signal card."#
    )
}
