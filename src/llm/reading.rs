use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fortune {
    pub career: String,
    pub wealth: String,
    pub love: String,
    pub health: String,
}

/// Structured face reading returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub age_estimate: u32,
    pub score: u32,
    pub quote: String,
    pub archetype: String,
    pub fortune: Fortune,
}

impl Reading {
    pub fn clamp_score(mut self) -> Self {
        self.score = self.score.min(100);
        self
    }
}

/// OpenAPI-subset schema passed as `generationConfig.responseSchema`.
pub fn response_schema() -> Value {
    let text = json!({ "type": "STRING" });
    json!({
        "type": "OBJECT",
        "properties": {
            "ageEstimate": { "type": "INTEGER", "description": "Apparent age in years" },
            "score": { "type": "INTEGER", "description": "Fortune aura score from 0 to 100" },
            "quote": { "type": "STRING", "description": "One-line saying from the master" },
            "archetype": { "type": "STRING", "description": "Short archetype title" },
            "fortune": {
                "type": "OBJECT",
                "properties": {
                    "career": text,
                    "wealth": text,
                    "love": text,
                    "health": text
                },
                "required": ["career", "wealth", "love", "health"],
                "propertyOrdering": ["career", "wealth", "love", "health"]
            }
        },
        "required": ["ageEstimate", "score", "quote", "archetype", "fortune"],
        "propertyOrdering": ["ageEstimate", "score", "quote", "archetype", "fortune"]
    })
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_reading(text: &str) -> Result<Reading, serde_json::Error> {
    serde_json::from_str::<Reading>(strip_code_fence(text)).map(Reading::clamp_score)
}
