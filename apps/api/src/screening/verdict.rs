//! Verdict parsing — strict, schema-validated decoding of the model's answer.
//!
//! Only `selected` and `feedback` are load-bearing. Skill lists and experience
//! level fall back to defaults when absent. Markdown fences are NOT stripped:
//! a fenced answer is reported as malformed.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Seniority the model attributes to the candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
    #[default]
    Unspecified,
}

impl ExperienceLevel {
    fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "junior" => ExperienceLevel::Junior,
            "mid" | "mid-level" | "mid_level" => ExperienceLevel::Mid,
            "senior" => ExperienceLevel::Senior,
            _ => ExperienceLevel::Unspecified,
        }
    }
}

impl<'de> Deserialize<'de> for ExperienceLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label
            .as_deref()
            .map(ExperienceLevel::from_label)
            .unwrap_or_default())
    }
}

/// Structured outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub selected: bool,
    pub feedback: String,
    pub matching_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_level: ExperienceLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed verdict: {reason}")]
pub struct MalformedVerdictError {
    pub reason: String,
    /// The untouched backend output, kept for diagnosis.
    pub raw: String,
}

/// Wire shape of the model answer.
#[derive(Debug, Deserialize)]
struct VerdictSchema {
    selected: bool,
    feedback: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    matching_skills: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    missing_skills: Vec<String>,
    #[serde(default)]
    experience_level: ExperienceLevel,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parses raw backend output into a `Verdict`.
pub fn parse_verdict(raw: &str) -> Result<Verdict, MalformedVerdictError> {
    let malformed = |reason: String| MalformedVerdictError {
        reason,
        raw: raw.to_string(),
    };

    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| malformed(format!("not a single JSON document: {e}")))?;

    if !value.is_object() {
        return Err(malformed("top-level JSON value is not an object".to_string()));
    }

    let schema: VerdictSchema =
        serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;

    if schema.feedback.trim().is_empty() {
        return Err(malformed("`feedback` is empty".to_string()));
    }

    Ok(Verdict {
        selected: schema.selected,
        feedback: schema.feedback,
        matching_skills: schema.matching_skills,
        missing_skills: schema.missing_skills,
        experience_level: schema.experience_level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_verdict_defaults_optional_fields() {
        let verdict = parse_verdict(r#"{"selected": true, "feedback": "Strong match"}"#).unwrap();
        assert_eq!(
            verdict,
            Verdict {
                selected: true,
                feedback: "Strong match".to_string(),
                matching_skills: vec![],
                missing_skills: vec![],
                experience_level: ExperienceLevel::Unspecified,
            }
        );
    }

    #[test]
    fn test_full_verdict_with_surrounding_whitespace() {
        let raw = r#"

            {
                "selected": false,
                "feedback": "Missing core frontend skills",
                "matching_skills": ["Python"],
                "missing_skills": ["React", "CSS3"],
                "experience_level": "Mid"
            }
        "#;
        let verdict = parse_verdict(raw).unwrap();
        assert!(!verdict.selected);
        assert_eq!(verdict.matching_skills, vec!["Python"]);
        assert_eq!(verdict.missing_skills, vec!["React", "CSS3"]);
        assert_eq!(verdict.experience_level, ExperienceLevel::Mid);
    }

    #[test]
    fn test_fenced_json_is_malformed() {
        let raw = "```json\n{\"selected\": false, \"feedback\": \"x\"}\n```";
        let err = parse_verdict(raw).unwrap_err();
        assert_eq!(err.raw, raw);
    }

    #[test]
    fn test_missing_selected_is_malformed() {
        let err = parse_verdict(r#"{"feedback": "no decision field"}"#).unwrap_err();
        assert!(err.reason.contains("selected"), "reason: {}", err.reason);
    }

    #[test]
    fn test_missing_feedback_is_malformed() {
        let err = parse_verdict(r#"{"selected": true}"#).unwrap_err();
        assert!(err.reason.contains("feedback"), "reason: {}", err.reason);
    }

    #[test]
    fn test_blank_feedback_is_malformed() {
        assert!(parse_verdict(r#"{"selected": true, "feedback": "   "}"#).is_err());
    }

    #[test]
    fn test_prose_around_object_is_malformed() {
        assert!(parse_verdict(r#"Here you go: {"selected": true, "feedback": "ok"}"#).is_err());
        assert!(parse_verdict(r#"{"selected": true, "feedback": "ok"} Hope this helps!"#).is_err());
    }

    #[test]
    fn test_truncated_json_is_malformed() {
        assert!(parse_verdict(r#"{"selected": true, "feedback": "Strong"#).is_err());
    }

    #[test]
    fn test_non_object_json_is_malformed() {
        assert!(parse_verdict(r#"[true, "Strong match"]"#).is_err());
        assert!(parse_verdict("true").is_err());
    }

    #[test]
    fn test_string_selected_is_malformed() {
        assert!(parse_verdict(r#"{"selected": "true", "feedback": "ok"}"#).is_err());
    }

    #[test]
    fn test_wrongly_typed_skill_list_is_malformed() {
        let raw = r#"{"selected": true, "feedback": "ok", "matching_skills": "React"}"#;
        assert!(parse_verdict(raw).is_err());
    }

    #[test]
    fn test_null_optional_fields_use_defaults() {
        let raw = r#"{"selected": true, "feedback": "ok",
            "matching_skills": null, "missing_skills": null, "experience_level": null}"#;
        let verdict = parse_verdict(raw).unwrap();
        assert!(verdict.matching_skills.is_empty());
        assert!(verdict.missing_skills.is_empty());
        assert_eq!(verdict.experience_level, ExperienceLevel::Unspecified);
    }

    #[test]
    fn test_unrecognised_experience_level_is_unspecified() {
        let raw = r#"{"selected": true, "feedback": "ok", "experience_level": "junior/mid/senior"}"#;
        assert_eq!(
            parse_verdict(raw).unwrap().experience_level,
            ExperienceLevel::Unspecified
        );
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let raw = r#"{"selected": true, "feedback": "ok", "confidence": 0.9}"#;
        assert!(parse_verdict(raw).unwrap().selected);
    }

    #[test]
    fn test_experience_level_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ExperienceLevel::Senior).unwrap(),
            r#""senior""#
        );
    }
}
