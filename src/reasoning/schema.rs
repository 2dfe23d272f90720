// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Response schema sent with every analysis request

use serde_json::{json, Value};

use crate::analysis::{KEY_INSIGHT_COUNT, RISK_COUNT};

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn string_list() -> Value {
    json!({ "type": "ARRAY", "items": string() })
}

fn exact_string_list(count: usize) -> Value {
    json!({
        "type": "ARRAY",
        "items": string(),
        "minItems": count,
        "maxItems": count,
    })
}

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "OBJECT",
        "properties": properties,
        "required": required,
    })
}

/// Schema of `AnalysisResult` in the service's OpenAPI subset
pub fn analysis_schema() -> Value {
    let problem = object(
        json!({
            "title": string(),
            "description": string(),
            "affectedZones": string_list(),
            "severity": { "type": "STRING", "enum": ["High", "Medium", "Low"] },
        }),
        &["title", "description", "affectedZones", "severity"],
    );

    let root_cause = object(
        json!({
            "description": string(),
            "dataEvidence": string(),
            "researchBasis": string(),
        }),
        &["description", "dataEvidence", "researchBasis"],
    );

    let strategy = object(
        json!({
            "title": string(),
            "details": string(),
            "source": string(),
        }),
        &["title", "details", "source"],
    );

    let prototype = object(
        json!({
            "logic": string(),
            "pseudocode": string(),
            "implementationNotes": string(),
        }),
        &["logic", "pseudocode", "implementationNotes"],
    );

    object(
        json!({
            "keyInsights": exact_string_list(KEY_INSIGHT_COUNT),
            "risks": exact_string_list(RISK_COUNT),
            "primaryRecommendation": string(),
            "problems": { "type": "ARRAY", "items": problem },
            "rootCauses": { "type": "ARRAY", "items": root_cause },
            "strategies": { "type": "ARRAY", "items": strategy },
            "prototype": prototype,
        }),
        &[
            "keyInsights",
            "risks",
            "primaryRecommendation",
            "problems",
            "rootCauses",
            "strategies",
            "prototype",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_pins_cardinalities() {
        let schema = analysis_schema();
        assert_eq!(schema["properties"]["keyInsights"]["minItems"], 3);
        assert_eq!(schema["properties"]["keyInsights"]["maxItems"], 3);
        assert_eq!(schema["properties"]["risks"]["maxItems"], 2);
    }

    #[test]
    fn test_schema_matches_wire_names() {
        let schema = analysis_schema();
        let sample = serde_json::to_value(crate::analysis::tests::sample_result()).unwrap();

        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        for field in required {
            assert!(sample.get(field).is_some(), "missing {}", field);
        }
    }
}
