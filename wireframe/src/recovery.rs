//! Text recovery layer.
//!
//! Model output carries no structural guarantee: payloads arrive wrapped in
//! markdown fences, surrounded by prose, or with JSON-escape artifacts from a
//! round trip through a chat API. This module recovers the candidate payload
//! on a best-effort basis. Extraction never fails - it degrades to returning
//! the raw input - and the only hard failure point is JSON parsing after the
//! trailing-comma repair.
//!
//! The extractors are deliberately heuristic (`text -> candidate string`) and
//! kept behind this narrow interface so a stricter balanced-bracket scanner
//! could replace them without touching stage logic.

use crate::errors::RecoveryError;
use regex::Regex;

/// Extract JSON content from text that may contain markdown or other
/// formatting. A correctly fenced ```json block always wins over brace-span
/// guessing; the brace span is a permissive first-`{` / last-`}` match and
/// can overshoot when multiple independent objects appear.
pub fn extract_json(text: &str) -> &str {
    if let Some(captures) = Regex::new(r"```json\s*([\s\S]*?)\s*```")
        .unwrap()
        .captures(text)
    {
        if let Some(json_block) = captures.get(1) {
            return json_block.as_str();
        }
    }

    // Fallback to the span between the first '{' and the last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            return &text[start..=end];
        }
    }

    text.trim()
}

/// Strict parse of an extracted JSON candidate, with exactly one repair
/// attempt: trailing commas before `}` or `]` are removed and the parse is
/// retried once. Any other defect fails with the original parse error.
pub fn parse_json_with_repair(json_str: &str) -> Result<serde_json::Value, RecoveryError> {
    match serde_json::from_str(json_str) {
        Ok(value) => Ok(value),
        Err(original_err) => {
            let cleaned = json_str.trim();
            let cleaned = Regex::new(r",\s*\}").unwrap().replace_all(cleaned, "}");
            let cleaned = Regex::new(r",\s*\]").unwrap().replace_all(&cleaned, "]");

            serde_json::from_str(&cleaned)
                .map_err(|_| RecoveryError::MalformedPayload(original_err.to_string()))
        }
    }
}

/// Extract SVG code from model text. Tries a fenced code block first (tag
/// optional), then a direct scan from a doctype-or-`<svg` open token through
/// the closing `</svg>`, then falls back to the trimmed input. Only the outer
/// boundary is recovered; well-formedness is never checked here.
pub fn extract_svg(text: &str) -> &str {
    if let Some(captures) = Regex::new(r"```(?:svg|xml|html)?\s+([\s\S]*?)```")
        .unwrap()
        .captures(text)
    {
        if let Some(block) = captures.get(1) {
            return block.as_str().trim();
        }
    }

    if let Some(m) = Regex::new(r"(?s)<\s*(?:!DOCTYPE|svg).*?</svg\s*>")
        .unwrap()
        .find(text)
    {
        return m.as_str().trim();
    }

    text.trim()
}

/// Cosmetic normalization applied after extraction: reverse JSON string
/// escaping artifacts picked up when SVG text round-trips through an API,
/// then strip stray boundary characters models sometimes prepend or append.
/// Idempotent on already-clean input; not a markup-correctness check.
pub fn clean_svg(svg_code: &str) -> String {
    if svg_code.is_empty() {
        return String::new();
    }

    let unescaped = svg_code
        .replace("\\\"", "\"")
        .replace("\\n", "\n")
        .replace("\\t", "\t");

    unescaped
        .trim_matches(|c| c == ' ' || c == '.' || c == '"' || c == '\'')
        .to_string()
}

/// Whether cleaned markup contains a recognizable root element. Absence is a
/// generation failure, not a silent pass-through.
pub fn has_svg_root(svg_code: &str) -> bool {
    !svg_code.is_empty() && (svg_code.contains("<svg") || svg_code.contains("<!DOCTYPE"))
}
