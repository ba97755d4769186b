use crate::prelude::{VarError, VarResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rule-relevant event categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentType {
    Offside,
    Foul,
    Penalty,
}

impl fmt::Display for IncidentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IncidentType::Offside => "offside",
            IncidentType::Foul => "foul",
            IncidentType::Penalty => "penalty",
        };
        f.write_str(label)
    }
}

/// Terminal ruling attached to an incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "DeclarationFields")]
pub struct Declaration {
    decision: String,
    confidence: f64,
    #[serde(rename = "summary")]
    short_summary: String,
    recommendation: String,
}

impl Declaration {
    pub fn new(
        decision: impl Into<String>,
        confidence: f64,
        short_summary: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            decision: decision.into(),
            confidence: unit_interval(confidence),
            short_summary: short_summary.into(),
            recommendation: recommendation.into(),
        }
    }

    pub fn decision(&self) -> &str {
        &self.decision
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn short_summary(&self) -> &str {
        &self.short_summary
    }

    pub fn recommendation(&self) -> &str {
        &self.recommendation
    }
}

/// A timestamped detection with an optional ruling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IncidentFields")]
pub struct Incident {
    #[serde(rename = "type")]
    kind: IncidentType,
    #[serde(rename = "timestamp")]
    timestamp_seconds: f64,
    confidence: f64,
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    declaration: Option<Declaration>,
}

impl Incident {
    pub fn new(
        kind: IncidentType,
        timestamp_seconds: f64,
        confidence: f64,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            timestamp_seconds: timestamp_seconds.max(0.0),
            confidence: unit_interval(confidence),
            description: description.into(),
            declaration: None,
        }
    }

    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declaration = Some(declaration);
        self
    }

    /// Attaches the ruling. A declared incident keeps its first ruling.
    pub fn declare(&mut self, declaration: Declaration) -> VarResult<()> {
        if self.declaration.is_some() {
            return Err(VarError::InvalidState(format!(
                "{} incident at {:.2}s already carries a declaration",
                self.kind, self.timestamp_seconds
            )));
        }
        self.declaration = Some(declaration);
        Ok(())
    }

    pub fn kind(&self) -> IncidentType {
        self.kind
    }

    pub fn timestamp_seconds(&self) -> f64 {
        self.timestamp_seconds
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn declaration(&self) -> Option<&Declaration> {
        self.declaration.as_ref()
    }
}

/// Aggregate produced once per completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub processed_frame_count: u64,
}

// Wire shapes; parsed values go through the same bounds as the constructors.
#[derive(Deserialize)]
struct DeclarationFields {
    decision: String,
    confidence: f64,
    summary: String,
    recommendation: String,
}

impl From<DeclarationFields> for Declaration {
    fn from(fields: DeclarationFields) -> Self {
        Declaration::new(
            fields.decision,
            fields.confidence,
            fields.summary,
            fields.recommendation,
        )
    }
}

#[derive(Deserialize)]
struct IncidentFields {
    #[serde(rename = "type")]
    kind: IncidentType,
    timestamp: f64,
    confidence: f64,
    description: String,
    #[serde(default)]
    declaration: Option<Declaration>,
}

impl From<IncidentFields> for Incident {
    fn from(fields: IncidentFields) -> Self {
        let incident = Incident::new(
            fields.kind,
            fields.timestamp,
            fields.confidence,
            fields.description,
        );
        match fields.declaration {
            Some(declaration) => incident.with_declaration(declaration),
            None => incident,
        }
    }
}

fn unit_interval(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_to_unit_interval() {
        assert_eq!(Incident::new(IncidentType::Foul, 1.0, 1.4, "").confidence(), 1.0);
        assert_eq!(Incident::new(IncidentType::Foul, 1.0, -0.2, "").confidence(), 0.0);
        assert_eq!(Declaration::new("", f64::NAN, "", "").confidence(), 0.0);
    }

    #[test]
    fn declaration_cannot_be_replaced() {
        let mut incident = Incident::new(IncidentType::Penalty, 12.0, 0.9, "contact in the box");
        incident
            .declare(Declaration::new("Penalty Kick Awarded", 0.9, "clear contact", "award"))
            .unwrap();

        let second = incident.declare(Declaration::new("No Penalty", 0.4, "dive", "book"));
        assert!(matches!(second, Err(VarError::InvalidState(_))));
        assert_eq!(
            incident.declaration().unwrap().decision(),
            "Penalty Kick Awarded"
        );
    }

    #[test]
    fn incident_serializes_with_field_names() {
        let incident = Incident::new(IncidentType::Offside, 7.5, 0.91, "beyond the line")
            .with_declaration(Declaration::new("Offside", 0.91, "34cm", "disallow"));
        let value = serde_json::to_value(&incident).unwrap();
        assert_eq!(value["type"], "offside");
        assert_eq!(value["timestamp"], 7.5);
        assert_eq!(value["declaration"]["summary"], "34cm");
        assert_eq!(value["declaration"]["recommendation"], "disallow");

        let bare = serde_json::to_value(Incident::new(IncidentType::Foul, 1.0, 0.5, "")).unwrap();
        assert!(bare.get("declaration").is_none());
    }

    #[test]
    fn parsed_incidents_respect_constructor_bounds() {
        let incident: Incident = serde_json::from_str(
            r#"{
                "type": "penalty",
                "timestamp": -3.0,
                "confidence": 1.7,
                "description": "edited by hand",
                "declaration": {
                    "decision": "Penalty Kick Awarded",
                    "confidence": -0.4,
                    "summary": "contact",
                    "recommendation": "award"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(incident.timestamp_seconds(), 0.0);
        assert_eq!(incident.confidence(), 1.0);
        assert_eq!(incident.declaration().unwrap().confidence(), 0.0);
        assert_eq!(incident.declaration().unwrap().short_summary(), "contact");
    }
}
