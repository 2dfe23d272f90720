// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Structured urban analysis returned by the reasoning service

use serde::{Deserialize, Serialize};

use crate::{CityPulseError, Result};

/// Number of key insights the service must return
pub const KEY_INSIGHT_COUNT: usize = 3;
/// Number of risks the service must return
pub const RISK_COUNT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub key_insights: Vec<String>,
    pub risks: Vec<String>,
    pub primary_recommendation: String,
    pub problems: Vec<Problem>,
    pub root_causes: Vec<RootCause>,
    pub strategies: Vec<Strategy>,
    pub prototype: Prototype,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub title: String,
    pub description: String,
    pub affected_zones: Vec<String>,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::High => "High",
            Severity::Medium => "Medium",
            Severity::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCause {
    pub description: String,
    pub data_evidence: String,
    pub research_basis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub title: String,
    pub details: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prototype {
    pub logic: String,
    pub pseudocode: String,
    pub implementation_notes: String,
}

impl AnalysisResult {
    /// Check the cardinality contract; a reply that breaks it is rejected
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if self.key_insights.len() != KEY_INSIGHT_COUNT {
            violations.push(format!(
                "expected {} key insights, got {}",
                KEY_INSIGHT_COUNT,
                self.key_insights.len()
            ));
        }
        if self.risks.len() != RISK_COUNT {
            violations.push(format!("expected {} risks, got {}", RISK_COUNT, self.risks.len()));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(CityPulseError::Analysis(format!(
                "malformed response: {}",
                violations.join("; ")
            )))
        }
    }

    /// Parse the reply text of the reasoning service
    ///
    /// Tolerates a surrounding markdown code fence, nothing else.
    pub fn from_reply(reply: &str) -> Result<Self> {
        let body = strip_code_fence(reply);
        let result: Self = serde_json::from_str(body)
            .map_err(|e| CityPulseError::Analysis(format!("unparseable response: {}", e)))?;
        result.validate()?;
        Ok(result)
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().trim_end_matches("```").trim()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_result() -> AnalysisResult {
        AnalysisResult {
            key_insights: vec![
                "Peak congestion clusters around the downtown ring".to_string(),
                "Residential zoning blocks mixed-use growth".to_string(),
                "Transit stops are sparse east of the river".to_string(),
            ],
            risks: vec![
                "Emergency response times degrade at rush hour".to_string(),
                "Retail vacancies rise as access worsens".to_string(),
            ],
            primary_recommendation: "Convert two downtown arterials to bus priority corridors".to_string(),
            problems: vec![
                Problem {
                    title: "Arterial gridlock".to_string(),
                    description: "Average speeds fall below 8 km/h".to_string(),
                    affected_zones: vec!["CBD".to_string(), "Zone 4".to_string()],
                    severity: Severity::High,
                },
                Problem {
                    title: "Parking spillover".to_string(),
                    description: "Kerb parking saturates side streets".to_string(),
                    affected_zones: vec!["Zone 2".to_string()],
                    severity: Severity::Medium,
                },
            ],
            root_causes: vec![RootCause {
                description: "Single-use zoning forces long commutes".to_string(),
                data_evidence: "zoning.csv shows 78% residential-only parcels".to_string(),
                research_basis: "Induced demand literature".to_string(),
            }],
            strategies: vec![
                Strategy {
                    title: "Bus priority".to_string(),
                    details: "Dedicated lanes with signal priority".to_string(),
                    source: "NACTO Transit Street Design Guide".to_string(),
                },
                Strategy {
                    title: "Upzoning".to_string(),
                    details: "Allow mixed use near stations".to_string(),
                    source: "TOD best practice".to_string(),
                },
            ],
            prototype: Prototype {
                logic: "Score corridors by delay per rider".to_string(),
                pseudocode: "for corridor in corridors: score(corridor)".to_string(),
                implementation_notes: "Needs GTFS and loop detector feeds".to_string(),
            },
        }
    }

    #[test]
    fn test_wire_names_are_camel_case() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert!(json.get("keyInsights").is_some());
        assert!(json.get("primaryRecommendation").is_some());
        assert_eq!(json["problems"][0]["affectedZones"][0], "CBD");
        assert_eq!(json["problems"][0]["severity"], "High");
        assert!(json["rootCauses"][0].get("dataEvidence").is_some());
        assert!(json["prototype"].get("implementationNotes").is_some());
    }

    #[test]
    fn test_from_reply_accepts_fenced_json() {
        let body = serde_json::to_string(&sample_result()).unwrap();
        let reply = format!("```json\n{}\n```", body);
        assert_eq!(AnalysisResult::from_reply(&reply).unwrap(), sample_result());
    }

    #[test]
    fn test_wrong_cardinality_rejected() {
        let mut result = sample_result();
        result.key_insights.push("a fourth insight".to_string());
        result.risks.pop();

        let err = result.validate().unwrap_err().to_string();
        assert!(err.contains("expected 3 key insights, got 4"));
        assert!(err.contains("expected 2 risks, got 1"));
    }

    #[test]
    fn test_malformed_reply_not_padded() {
        let mut value = serde_json::to_value(sample_result()).unwrap();
        value["risks"] = serde_json::json!(["only one"]);
        let err = AnalysisResult::from_reply(&value.to_string()).unwrap_err();
        assert!(matches!(err, CityPulseError::Analysis(_)));
    }

    #[test]
    fn test_missing_field_rejected() {
        let mut value = serde_json::to_value(sample_result()).unwrap();
        value.as_object_mut().unwrap().remove("prototype");
        assert!(AnalysisResult::from_reply(&value.to_string()).is_err());
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let mut value = serde_json::to_value(sample_result()).unwrap();
        value["problems"][0]["severity"] = serde_json::json!("Critical");
        assert!(AnalysisResult::from_reply(&value.to_string()).is_err());
    }
}
