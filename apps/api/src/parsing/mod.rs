//! Response Parser: turns raw LLM text into structured data.
//!
//! Two modes, chosen by the call site and never auto-detected:
//! - JSON-array mode: first greedy `[...]` span, parsed as JSON.
//! - Heading-section mode: `### Heading` chunks into an ordered heading → body map.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Ordered heading → body mapping. Order is first occurrence in the raw text.
pub type Sections = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON array found in LLM output")]
    NoJsonArray,

    #[error("JSON array in LLM output is invalid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("array element {0} is not a JSON object")]
    NotAnObject(usize),
}

fn json_array_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Greedy and DOTALL: from the first '[' to the last ']'.
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("static regex"))
}

fn line_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*###\s+").expect("static regex"))
}

fn inline_heading_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t]+###\s+").expect("static regex"))
}

/// Byte ranges of every heading marker in `raw`.
///
/// A marker opens a line. Before the first such marker, an inline one
/// ("preamble ### A") also counts; after it, a mid-line `###` is body text.
fn heading_markers(raw: &str) -> Vec<(usize, usize)> {
    let line_markers: Vec<_> = line_heading_regex()
        .find_iter(raw)
        .map(|m| (m.start(), m.end()))
        .collect();
    let preamble_end = line_markers.first().map_or(raw.len(), |&(start, _)| start);

    inline_heading_regex()
        .find_iter(&raw[..preamble_end])
        .map(|m| (m.start(), m.end()))
        .chain(line_markers)
        .collect()
}

/// Extracts and parses the first greedy `[...]` span of `raw`.
pub fn extract_json_array(raw: &str) -> Result<Vec<Value>, ExtractError> {
    let span = json_array_regex()
        .find(raw)
        .ok_or(ExtractError::NoJsonArray)?;
    match serde_json::from_str::<Value>(span.as_str())? {
        Value::Array(items) => Ok(items),
        // Unreachable for a span that starts with '[' and parses, kept for totality.
        _ => Err(ExtractError::NoJsonArray),
    }
}

/// Splits `raw` into `### ` sections.
///
/// Content before the first heading is discarded. Each chunk's first line is
/// the key, the rest is the body, both trimmed. A repeated heading overwrites
/// the earlier body and keeps the earlier position.
pub fn split_heading_sections(raw: &str) -> Sections {
    let mut sections = Sections::new();
    let markers = heading_markers(raw);

    for (i, &(_, body_start)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(raw.len(), |&(start, _)| start);
        let chunk = raw[body_start..end].trim();
        if chunk.is_empty() {
            continue;
        }
        let mut lines = chunk.lines();
        let heading = lines.next().unwrap_or_default().trim().to_string();
        let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
        sections.insert(heading, Value::String(body));
    }

    sections
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_array_surrounded_by_noise() {
        let items = extract_json_array(r#"noise [{"a":1}] trailing"#).unwrap();
        assert_eq!(Value::Array(items), json!([{"a": 1}]));
    }

    #[test]
    fn test_json_array_spans_lines_inside_fences() {
        let raw = "```json\n[\n  {\"vendor\": \"Cisco\", \"score\": 8},\n  {\"vendor\": \"HPE\", \"score\": 6}\n]\n```";
        let items = extract_json_array(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["vendor"], "HPE");
    }

    #[test]
    fn test_json_array_missing() {
        let err = extract_json_array("Desculpe, não consegui avaliar.").unwrap_err();
        assert!(matches!(err, ExtractError::NoJsonArray));
    }

    #[test]
    fn test_json_array_greedy_span_across_two_arrays_is_invalid() {
        let err = extract_json_array("[1] e depois [2]").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[test]
    fn test_json_array_python_style_quotes_invalid() {
        let err = extract_json_array("[{'vendor': 'Cisco'}]").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidJson(_)));
    }

    #[test]
    fn test_sections_discard_preamble() {
        let sections = split_heading_sections("preamble ### A\nbody1\n### B\nbody2");
        assert_eq!(Value::Object(sections), json!({"A": "body1", "B": "body2"}));
    }

    #[test]
    fn test_sections_repeated_heading_overwrites() {
        let sections = split_heading_sections("### A\nfirst\n### A\nsecond");
        assert_eq!(Value::Object(sections), json!({"A": "second"}));
    }

    #[test]
    fn test_sections_keep_first_occurrence_order() {
        let raw = "Intro\n### CLIENTE\nACME\n### ESCOPO DE SERVIÇOS\nv1\n### BOM\n| a |\n### ESCOPO DE SERVIÇOS\nv2\n";
        let sections = split_heading_sections(raw);
        let keys: Vec<_> = sections.keys().cloned().collect();
        assert_eq!(keys, vec!["CLIENTE", "ESCOPO DE SERVIÇOS", "BOM"]);
        assert_eq!(sections["ESCOPO DE SERVIÇOS"], "v2");
    }

    #[test]
    fn test_sections_multiline_body_trimmed() {
        let raw = "### O PROJETO  \n\n- linha 1\n- linha 2\n\n";
        let sections = split_heading_sections(raw);
        assert_eq!(sections["O PROJETO"], "- linha 1\n- linha 2");
    }

    #[test]
    fn test_sections_heading_without_body() {
        let sections = split_heading_sections("### VAZIO\n### CHEIO\ntexto");
        assert_eq!(sections["VAZIO"], "");
        assert_eq!(sections["CHEIO"], "texto");
    }

    #[test]
    fn test_sections_deeper_headings_stay_in_body() {
        let sections = split_heading_sections("### A\n#### sub\ntexto");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections["A"], "#### sub\ntexto");
    }

    #[test]
    fn test_sections_mid_line_marker_after_first_heading_is_body() {
        let raw = "### BOM\nUse o marcador ### para títulos\n### PREMISSAS\nx";
        let sections = split_heading_sections(raw);
        let keys: Vec<_> = sections.keys().cloned().collect();
        assert_eq!(keys, vec!["BOM", "PREMISSAS"]);
        assert_eq!(sections["BOM"], "Use o marcador ### para títulos");
    }

    #[test]
    fn test_sections_indented_heading_counts() {
        let sections = split_heading_sections("### A\nx\n  ### B\ny");
        assert_eq!(Value::Object(sections), json!({"A": "x", "B": "y"}));
    }

    #[test]
    fn test_sections_none_without_headings() {
        assert!(split_heading_sections("## Só nível dois\ntexto").is_empty());
    }
}
