//! Analysis request, prompt context and the structured artifact.
//!
//! The UI submits an [`AnalysisRequest`]; the orchestrator enriches it into
//! an [`AnalysisContext`] for the text generator and parses the generated
//! text into an [`AnalysisArtifact`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::geo::Coordinates;

/// Demographic breakdowns extracted from the generated text.
///
/// Population maps a year label to a head count; ethnicity and religion
/// map a group name to a percentage weight. Absent maps were not supplied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Demographics {
    /// Population count by year label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<BTreeMap<String, f64>>,
    /// Ethnic composition by group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ethnicity: Option<BTreeMap<String, f64>>,
    /// Religious composition by group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub religion: Option<BTreeMap<String, f64>>,
}

impl Demographics {
    /// True when none of the breakdowns were supplied.
    pub const fn is_empty(&self) -> bool {
        self.population.is_none() && self.ethnicity.is_none() && self.religion.is_none()
    }
}

/// The structured result of one analysis request.
///
/// Every field may be absent; absence is a valid terminal state. `error`
/// is set only when generation failed, in which case the narrative is
/// empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AnalysisArtifact {
    /// Free-text narrative for the main tab.
    pub narrative: String,
    /// Demographic breakdowns, when the text carried a parsable object.
    pub demographics: Option<Demographics>,
    /// Source citations.
    pub sources: Vec<String>,
    /// The polity ruling the place at the requested year.
    pub polity_name: Option<String>,
    /// User-visible failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisArtifact {
    /// Build the artifact shown when generation failed.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Whether this artifact reports a generation failure.
    pub const fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// What the UI asks to have analysed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AnalysisRequest {
    /// The place or state name as shown in the UI.
    pub subject_name: String,
    /// The selected timeline year.
    pub year: i32,
    /// The clicked point, when the request came from the map.
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    /// Canonical key of a searched historical entity.
    #[serde(default)]
    pub entity_key: Option<String>,
    /// Extra framing for map markers that are not plain places.
    #[serde(default)]
    pub extra_metadata: Option<SubjectMetadata>,
    /// Identifies the client whose pending request this one supersedes.
    ///
    /// Requests without one never supersede, nor get superseded by,
    /// another request.
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Marker metadata that reframes an analysis around a tribe or a person.
///
/// `kind` is `turkic_tribe` or `historical_figure`; any other value adds
/// no framing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SubjectMetadata {
    /// The marker kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Tribe name, for `turkic_tribe` markers.
    #[serde(default)]
    pub tribe: Option<String>,
    /// The tribe's branch, for `turkic_tribe` markers.
    #[serde(default)]
    pub branch: Option<String>,
    /// Title of a `historical_figure`.
    #[serde(default)]
    pub title: Option<String>,
}

impl SubjectMetadata {
    /// Kind value for a settlement of a Turkic tribe.
    pub const TURKIC_TRIBE: &'static str = "turkic_tribe";
    /// Kind value for a historical person.
    pub const HISTORICAL_FIGURE: &'static str = "historical_figure";

    /// Metadata for a tribe settlement.
    pub fn turkic_tribe(tribe: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            kind: Self::TURKIC_TRIBE.to_owned(),
            tribe: Some(tribe.into()),
            branch: Some(branch.into()),
            title: None,
        }
    }

    /// Metadata for a historical person.
    pub fn historical_figure(title: Option<String>) -> Self {
        Self {
            kind: Self::HISTORICAL_FIGURE.to_owned(),
            title,
            ..Self::default()
        }
    }
}

/// The enriched context handed to the text generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AnalysisContext {
    /// The place or state name.
    pub subject_name: String,
    /// The year the analysis focuses on.
    pub year: i32,
    /// The clicked point.
    pub coordinates: Option<Coordinates>,
    /// The administrative district enclosing the point.
    pub district: Option<String>,
    /// The name the place carried in `year`, when known.
    pub known_historical_name: Option<String>,
    /// True when the known name came from the nearest epoch rather than
    /// one covering `year`.
    #[serde(default)]
    pub known_name_approximate: bool,
    /// Tribe or person framing carried over from the request.
    #[serde(default)]
    pub extra_metadata: Option<SubjectMetadata>,
}

impl AnalysisContext {
    /// A bare context with only a subject and a year.
    pub fn new(subject_name: impl Into<String>, year: i32) -> Self {
        Self {
            subject_name: subject_name.into(),
            year,
            coordinates: None,
            district: None,
            known_historical_name: None,
            known_name_approximate: false,
            extra_metadata: None,
        }
    }
}

/// What the UI asks to know about a ruling house.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct DynastyRequest {
    /// The state or dynasty name, usually an artifact's polity name.
    pub polity_name: String,
    /// The year whose ruler is asked for.
    pub year: i32,
}

/// A battle, siege or treaty to analyse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EventAnalysisRequest {
    /// The event's name.
    pub event_name: String,
    /// The year it took place.
    pub year: i32,
    /// The opposing parties.
    #[serde(default)]
    pub parties: Option<Vec<String>>,
    /// How it ended.
    #[serde(default)]
    pub result: Option<String>,
}

/// One record of a place's name history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PlaceNameEntry {
    /// The historical name.
    pub name: String,
    /// First year the name is attested.
    pub start_year: i32,
    /// Last year the name was in use.
    pub end_year: i32,
    /// Language of origin.
    #[serde(default)]
    pub language: String,
    /// Meaning of the name.
    #[serde(default)]
    pub meaning: String,
    /// Etymological notes.
    #[serde(default)]
    pub notes: String,
    /// Earliest attesting source.
    #[serde(default)]
    pub source: Option<String>,
    /// Longer description.
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_artifact_has_empty_narrative() {
        let artifact = AnalysisArtifact::failure("busy");
        assert!(artifact.narrative.is_empty());
        assert!(artifact.is_failure());
        assert!(artifact.sources.is_empty());
    }

    #[test]
    fn artifact_serializes_camel_case_without_error() {
        let artifact = AnalysisArtifact {
            narrative: "text".to_owned(),
            polity_name: Some("Osmanlı İmparatorluğu".to_owned()),
            ..AnalysisArtifact::default()
        };
        let json = serde_json::to_value(&artifact).unwrap_or_default();
        assert_eq!(json["polityName"], "Osmanlı İmparatorluğu");
        assert!(json.get("error").is_none());
        assert!(json["demographics"].is_null());
    }

    #[test]
    fn request_optional_fields_default() {
        let json = r#"{"subjectName":"Sivas","year":1500}"#;
        let request: Result<AnalysisRequest, _> = serde_json::from_str(json);
        assert!(request.is_ok());
        let Ok(request) = request else { return };
        assert!(request.coordinates.is_none());
        assert!(request.entity_key.is_none());
        assert!(request.extra_metadata.is_none());
        assert!(request.session_id.is_none());
    }

    #[test]
    fn request_reads_marker_metadata() {
        let json = r#"{
            "subjectName": "Kınık", "year": 1100, "sessionId": "tab-1",
            "extraMetadata": {"type": "turkic_tribe", "tribe": "Kınık", "branch": "Üçoklar"}
        }"#;
        let request: Result<AnalysisRequest, _> = serde_json::from_str(json);
        assert!(request.is_ok());
        let Ok(request) = request else { return };
        assert_eq!(request.session_id.as_deref(), Some("tab-1"));
        assert_eq!(
            request.extra_metadata,
            Some(SubjectMetadata::turkic_tribe("Kınık", "Üçoklar"))
        );
    }

    #[test]
    fn event_request_optional_fields_default() {
        let json = r#"{"eventName":"Malazgirt Meydan Muharebesi","year":1071}"#;
        let request: Result<EventAnalysisRequest, _> = serde_json::from_str(json);
        assert!(request.is_ok());
        let Ok(request) = request else { return };
        assert!(request.parties.is_none());
        assert!(request.result.is_none());
    }

    #[test]
    fn empty_demographics() {
        assert!(Demographics::default().is_empty());
    }
}
