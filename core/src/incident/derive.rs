use crate::incident::model::{Declaration, Incident, IncidentType};
use crate::prelude::IncidentDeriver;
use crate::video::VideoInfo;

struct ScriptedIncident {
    kind: IncidentType,
    offset: f64,
    confidence: f64,
    description: &'static str,
    decision: &'static str,
    summary: &'static str,
    recommendation: &'static str,
}

const SCRIPT: [ScriptedIncident; 3] = [
    ScriptedIncident {
        kind: IncidentType::Offside,
        offset: 0.15,
        confidence: 0.91,
        description: "Attacking player beyond defensive line at moment of pass",
        decision: "Offside - Goal Disallowed",
        summary: "Player positioned 34cm beyond the last defender when pass was made.",
        recommendation: "Disallow the goal and restart with an indirect free kick to the defending side.",
    },
    ScriptedIncident {
        kind: IncidentType::Foul,
        offset: 0.42,
        confidence: 0.78,
        description: "Contact detected between players in midfield",
        decision: "Foul Confirmed",
        summary: "Illegal contact from behind, player brought down.",
        recommendation: "Award a direct free kick and review for a caution.",
    },
    ScriptedIncident {
        kind: IncidentType::Penalty,
        offset: 0.71,
        confidence: 0.94,
        description: "Foul committed inside penalty area",
        decision: "Penalty Kick Awarded",
        summary: "Clear contact in box, attacker denied goal-scoring opportunity.",
        recommendation: "Award a penalty kick to the attacking side.",
    },
];

/// Places the scripted incidents at fixed fractions of the clip duration.
///
/// Stands in for a real detection collaborator: output depends only on the
/// video metadata, never on frame content.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOffsetDeriver;

impl IncidentDeriver for FixedOffsetDeriver {
    fn derive(&self, video: &VideoInfo) -> Vec<Incident> {
        SCRIPT
            .iter()
            .map(|entry| {
                Incident::new(
                    entry.kind,
                    video.duration_seconds * entry.offset,
                    entry.confidence,
                    entry.description,
                )
                .with_declaration(Declaration::new(
                    entry.decision,
                    entry.confidence,
                    entry.summary,
                    entry.recommendation,
                ))
            })
            .collect()
    }
}
