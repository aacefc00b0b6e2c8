//! LLM response parsing into a structured [`AnalysisArtifact`].
//!
//! The analysis prompt asks for four tagged blocks: `<ANALIZ>` (narrative),
//! `<DEMOGRAFI>` (a JSON object), `<KAYNAKLAR>` (a bullet list) and
//! `<DEVLET>` (the ruling polity). Models drift from that format in
//! predictable ways, so every step here degrades instead of failing:
//!
//! - a missing block is `None`, and a missing narrative block falls back
//!   to the whole response;
//! - the demographics block goes through an ordered ladder of pure
//!   recovery stages (see [`parse_demographics`]);
//! - source lines that are not bullets are dropped as formatting noise.
//!
//! Nothing in this module returns an error or panics.

use std::collections::BTreeMap;

use chronoatlas_types::{AnalysisArtifact, Demographics};
use serde_json::Value;
use tracing::debug;

/// Tag around the narrative block.
pub const ANALYSIS_TAG: &str = "ANALIZ";
/// Tag around the demographics JSON block.
pub const DEMOGRAPHICS_TAG: &str = "DEMOGRAFI";
/// Tag around the source list block.
pub const SOURCES_TAG: &str = "KAYNAKLAR";
/// Tag around the ruling polity block.
pub const POLITY_TAG: &str = "DEVLET";

/// Polity answers meaning "no identifiable state".
const UNKNOWN_POLITY: [&str; 2] = ["bilinmiyor", "unknown"];

/// The raw text of each tagged block, before sub-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSections<'a> {
    /// The narrative block, or the whole response when absent.
    pub narrative: &'a str,
    /// The demographics block.
    pub demographics: Option<&'a str>,
    /// The sources block.
    pub sources: Option<&'a str>,
    /// The polity block.
    pub polity: Option<&'a str>,
}

/// Parse a complete response into an artifact.
pub fn parse_artifact(raw: &str) -> AnalysisArtifact {
    let sections = parse_sections(raw);
    AnalysisArtifact {
        narrative: sections.narrative.to_owned(),
        demographics: parse_demographics(sections.demographics),
        sources: parse_sources(sections.sources),
        polity_name: parse_polity(sections.polity),
        error: None,
    }
}

/// Split a response into its tagged blocks.
///
/// Without an analysis block the whole response, untrimmed, becomes the
/// narrative.
pub fn parse_sections(raw: &str) -> RawSections<'_> {
    let narrative = extract_section(raw, ANALYSIS_TAG).unwrap_or_else(|| {
        debug!("analysis block missing, using whole response as narrative");
        raw
    });
    RawSections {
        narrative,
        demographics: extract_section(raw, DEMOGRAPHICS_TAG),
        sources: extract_section(raw, SOURCES_TAG),
        polity: extract_section(raw, POLITY_TAG),
    }
}

/// Return the trimmed text between the first `<TAG>` and the first
/// `</TAG>` after it.
///
/// Later occurrences of the same pair are ignored. An opening tag without
/// a closing tag counts as absent.
pub fn extract_section<'a>(raw: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");

    let start = raw.find(&open)?.checked_add(open.len())?;
    let rest = raw.get(start..)?;
    let end = rest.find(&close)?;
    rest.get(..end).map(str::trim)
}

// ---------------------------------------------------------------------------
// Demographics ladder
// ---------------------------------------------------------------------------

/// Recover a demographics object from a block of model output.
///
/// Stages, in order:
/// 1. strip markdown code fences;
/// 2. decode a double-encoded JSON string literal;
/// 3. collapse literal `\n`/`\t` escapes and drop stray backslashes;
/// 4. parse the whole cleaned text;
/// 5. parse from the first `{` to the last `}`.
///
/// Returns `None` when nothing parses. Numeric leaves that are not numbers
/// are coerced, defaulting to `0`.
pub fn parse_demographics(text: Option<&str>) -> Option<Demographics> {
    let text = text?;
    let unfenced = strip_code_fences(text);
    let decoded = decode_quoted(&unfenced).unwrap_or(unfenced);
    let cleaned = collapse_escapes(&decoded);

    let value = parse_non_null(&cleaned).or_else(|| {
        let inner = braced_span(&cleaned)?;
        debug!("demographics recovered from embedded object");
        parse_non_null(inner)
    });

    if value.is_none() {
        debug!(len = text.len(), "demographics block unparsable");
    }
    value.map(|v| coerce_demographics(&v))
}

/// Stage 1: remove ```` ```json ```` and ```` ``` ```` markers.
fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_owned()
}

/// Stage 2: decode text that is entirely one JSON string literal.
fn decode_quoted(text: &str) -> Option<String> {
    if text.len() < 2 || !text.starts_with('"') || !text.ends_with('"') {
        return None;
    }
    let decoded = serde_json::from_str::<String>(text).ok()?;
    debug!("demographics block was a JSON-encoded string");
    Some(decoded.trim().to_owned())
}

/// Stage 3: turn literal `\n` and `\t` into spaces and drop backslashes.
fn collapse_escapes(text: &str) -> String {
    text.replace("\\n", " ")
        .replace("\\t", " ")
        .replace('\\', "")
}

/// Stages 4 and 5: parse JSON, rejecting `null`.
fn parse_non_null(text: &str) -> Option<Value> {
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|v| !v.is_null())
}

/// The slice from the first `{` to the last `}`, inclusive.
fn braced_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Build typed demographics from a parsed JSON value.
///
/// Anything that is not an object contributes no breakdowns.
fn coerce_demographics(value: &Value) -> Demographics {
    let breakdown = |key: &str| value.get(key).and_then(Value::as_object).map(coerce_map);
    Demographics {
        population: breakdown("population"),
        ethnicity: breakdown("ethnicity"),
        religion: breakdown("religion"),
    }
}

fn coerce_map(map: &serde_json::Map<String, Value>) -> BTreeMap<String, f64> {
    map.iter()
        .map(|(k, v)| (k.clone(), coerce_number(v)))
        .collect()
}

/// Coerce a JSON leaf to a number, defaulting to `0`.
///
/// Strings such as `"45%"`, `"12,500"` or `" 3.5 "` are accepted.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .trim_end_matches('%')
                .chars()
                .filter(|c| *c != ',' && *c != '_')
                .collect();
            digits
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .unwrap_or(0.0)
        }
        Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Sources and polity
// ---------------------------------------------------------------------------

/// Extract the bullet items of a sources block.
///
/// Only lines starting with `-` (after trimming) are kept; the marker is
/// removed. Empty bullets are dropped.
pub fn parse_sources(text: Option<&str>) -> Vec<String> {
    text.map(|t| {
        t.lines()
            .filter_map(|line| line.trim().strip_prefix('-'))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(ToOwned::to_owned)
            .collect()
    })
    .unwrap_or_default()
}

/// Extract the ruling polity's name.
///
/// Takes the first non-empty line, strips markdown bold and surrounding
/// quotes, and maps "unknown" answers to `None`.
pub fn parse_polity(text: Option<&str>) -> Option<String> {
    let line = text?.lines().map(str::trim).find(|l| !l.is_empty())?;
    let name = line
        .replace("**", "")
        .trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
        .to_owned();

    if name.is_empty() || UNKNOWN_POLITY.iter().any(|u| name.to_lowercase() == *u) {
        return None;
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn population(d: &Demographics, year: &str) -> Option<f64> {
        d.population.as_ref().and_then(|p| p.get(year).copied())
    }

    #[test]
    fn tagged_response_parses_all_sections() {
        let raw = "<ANALIZ>\n**Tarihsel İsim:** Kostantiniyye\n\nMetin.\n</ANALIZ>\n\
            <DEMOGRAFI>\n{\"population\": {\"1500\": 200000}, \"religion\": {\"İslam\": 58, \"Hristiyanlık\": 32}}\n</DEMOGRAFI>\n\
            <KAYNAKLAR>\n- Tahrir Defteri 1477\n- Halil İnalcık\n</KAYNAKLAR>\n\
            <DEVLET>\nOsmanlı İmparatorluğu\n</DEVLET>";
        let artifact = parse_artifact(raw);

        assert!(artifact.narrative.starts_with("**Tarihsel İsim:**"));
        assert!(artifact.narrative.ends_with("Metin."));
        let demographics = artifact.demographics.unwrap_or_default();
        assert_eq!(population(&demographics, "1500"), Some(200_000.0));
        assert_eq!(demographics.religion.map(|r| r.len()), Some(2));
        assert!(demographics.ethnicity.is_none());
        assert_eq!(artifact.sources, vec!["Tahrir Defteri 1477", "Halil İnalcık"]);
        assert_eq!(artifact.polity_name.as_deref(), Some("Osmanlı İmparatorluğu"));
        assert!(artifact.error.is_none());
    }

    #[test]
    fn compact_response_without_sources() {
        let raw = r#"<ANALIZ>Hello</ANALIZ><DEMOGRAFI>{"population":{"1500":50000}}</DEMOGRAFI>"#;
        let artifact = parse_artifact(raw);
        assert_eq!(artifact.narrative, "Hello");
        let demographics = artifact.demographics.unwrap_or_default();
        assert_eq!(population(&demographics, "1500"), Some(50_000.0));
        assert_eq!(demographics.population.map(|p| p.len()), Some(1));
        assert!(artifact.sources.is_empty());
        assert!(artifact.polity_name.is_none());
    }

    #[test]
    fn untagged_response_becomes_narrative() {
        let raw = "  The model ignored the format entirely.  ";
        let sections = parse_sections(raw);
        assert_eq!(sections.narrative, raw);
        assert!(sections.demographics.is_none());
        assert!(sections.sources.is_none());
        assert!(sections.polity.is_none());
        assert_eq!(parse_artifact(raw).narrative, raw);
    }

    #[test]
    fn only_first_section_occurrence_counts() {
        let raw = "<ANALIZ>first</ANALIZ> noise <ANALIZ>second</ANALIZ>";
        assert_eq!(extract_section(raw, ANALYSIS_TAG), Some("first"));
    }

    #[test]
    fn unclosed_section_is_absent() {
        let raw = "<ANALIZ>cut off mid-sentence";
        assert_eq!(extract_section(raw, ANALYSIS_TAG), None);
        assert_eq!(parse_sections(raw).narrative, raw);
    }

    #[test]
    fn demographics_inside_code_fence() {
        let text = "```json\n{\"ethnicity\": {\"Türk\": 70, \"Ermeni\": 30}}\n```";
        let demographics = parse_demographics(Some(text)).unwrap_or_default();
        assert_eq!(
            demographics.ethnicity.and_then(|e| e.get("Türk").copied()),
            Some(70.0)
        );
    }

    #[test]
    fn demographics_double_encoded() {
        let text = r#""{\"population\": {\"1900\": 1200}}""#;
        let demographics = parse_demographics(Some(text)).unwrap_or_default();
        assert_eq!(population(&demographics, "1900"), Some(1200.0));
    }

    #[test]
    fn demographics_with_literal_escape_sequences() {
        let text = r#"{\n\t\"population\": {\n\t\t\"1530\": 4500\n\t}\n}"#;
        let demographics = parse_demographics(Some(text)).unwrap_or_default();
        assert_eq!(population(&demographics, "1530"), Some(4500.0));
    }

    #[test]
    fn demographics_embedded_in_prose() {
        let text = "Here is the data you asked for: {\"religion\": {\"İslam\": \"95%\"}} Hope it helps!";
        let demographics = parse_demographics(Some(text)).unwrap_or_default();
        assert_eq!(
            demographics.religion.and_then(|r| r.get("İslam").copied()),
            Some(95.0)
        );
    }

    #[test]
    fn non_numeric_leaves_default_to_zero() {
        let text = r#"{"population": {"1500": "unknown", "1600": "12,500", "1700": null, "1800": true}}"#;
        let demographics = parse_demographics(Some(text)).unwrap_or_default();
        assert_eq!(population(&demographics, "1500"), Some(0.0));
        assert_eq!(population(&demographics, "1600"), Some(12_500.0));
        assert_eq!(population(&demographics, "1700"), Some(0.0));
        assert_eq!(population(&demographics, "1800"), Some(1.0));
    }

    #[test]
    fn unparsable_demographics_is_none() {
        for text in [
            "",
            "   ",
            "No reliable records exist for this period.",
            r#"{"population": {"1500": 5"#,
            "} backwards {",
            "null",
            "```json\n```",
        ] {
            assert!(parse_demographics(Some(text)).is_none(), "input: {text:?}");
        }
        assert!(parse_demographics(None).is_none());
    }

    #[test]
    fn non_object_json_yields_empty_demographics() {
        let demographics = parse_demographics(Some("42"));
        assert_eq!(demographics.map(|d| d.is_empty()), Some(true));
    }

    #[test]
    fn serialized_demographics_round_trip() {
        let original = Demographics {
            population: Some(BTreeMap::from([
                ("1500".to_owned(), 50_000.0),
                ("1900".to_owned(), 120_000.0),
            ])),
            ethnicity: Some(BTreeMap::from([("Türk".to_owned(), 82.5)])),
            religion: None,
        };
        let json = serde_json::to_string(&original).unwrap_or_default();
        assert_eq!(parse_demographics(Some(&json)), Some(original));
    }

    #[test]
    fn sources_keep_only_bullets() {
        assert_eq!(
            parse_sources(Some("- A\n- B\nnot a bullet\n- C")),
            vec!["A", "B", "C"]
        );
        assert_eq!(parse_sources(Some("  -   Indented  \n-\n*  star")), vec!["Indented"]);
        assert!(parse_sources(None).is_empty());
    }

    #[test]
    fn polity_unknown_and_decorated() {
        assert_eq!(parse_polity(Some("**\"Roma İmparatorluğu\"**")).as_deref(), Some("Roma İmparatorluğu"));
        assert_eq!(parse_polity(Some("\n\nBüyük Selçuklu Devleti\nextra")).as_deref(), Some("Büyük Selçuklu Devleti"));
        assert!(parse_polity(Some("Bilinmiyor")).is_none());
        assert!(parse_polity(Some("  UNKNOWN ")).is_none());
        assert!(parse_polity(Some("\"\"")).is_none());
        assert!(parse_polity(None).is_none());
    }

    #[test]
    fn coerce_number_variants() {
        assert!((coerce_number(&serde_json::json!(12.5)) - 12.5).abs() < f64::EPSILON);
        assert!((coerce_number(&serde_json::json!(" 7 ")) - 7.0).abs() < f64::EPSILON);
        assert!(coerce_number(&serde_json::json!([1])).abs() < f64::EPSILON);
        assert!(coerce_number(&serde_json::json!("NaN")).abs() < f64::EPSILON);
    }
}
