// Evaluation prompt for the screening pipeline.
// The system persona lives in llm_client::prompts.

/// Name of the output schema the model is told to follow.
pub const VERDICT_SCHEMA_NAME: &str = "ScreeningVerdict";

/// Evaluation prompt template. Replace `{role_requirements}`, `{resume_text}`,
/// `{schema_name}` before sending. Built only through `build_prompt`.
const EVALUATION_PROMPT_TEMPLATE: &str = r#"Please analyze this resume against the following requirements and provide your response in valid JSON format.

Role Requirements:
{role_requirements}

Resume Text:
{resume_text}

Your response must be a valid JSON object matching the {schema_name} schema:
{
    "selected": true or false,
    "feedback": "Detailed feedback explaining the decision",
    "matching_skills": ["skill1", "skill2"],
    "missing_skills": ["skill3", "skill4"],
    "experience_level": "junior" or "mid" or "senior"
}

Evaluation criteria:
1. Match at least 70% of required skills
2. Consider both theoretical knowledge and practical experience, weighting practical experience higher
3. Value project experience and real-world applications
4. Consider transferable skills from similar technologies
5. Look for evidence of continuous learning and adaptability

Important: Return ONLY the JSON object without any markdown formatting or backticks."#;

/// Builds the evaluation prompt. Pure: the same inputs always yield the same bytes.
///
/// The requirements block and resume text are embedded verbatim. No validation
/// is done on the resume content.
pub fn build_prompt(resume_text: &str, role_requirements: &str) -> String {
    // Substitute the caller-controlled slots in one left-to-right pass so that
    // placeholder-looking text inside a resume is never expanded.
    let mut prompt = String::with_capacity(
        EVALUATION_PROMPT_TEMPLATE.len() + resume_text.len() + role_requirements.len(),
    );
    let mut rest = EVALUATION_PROMPT_TEMPLATE;
    while let Some(start) = rest.find('{') {
        let (head, tail) = rest.split_at(start);
        prompt.push_str(head);
        let slot = [
            ("{role_requirements}", role_requirements),
            ("{resume_text}", resume_text),
            ("{schema_name}", VERDICT_SCHEMA_NAME),
        ]
        .into_iter()
        .find(|(placeholder, _)| tail.starts_with(placeholder));
        match slot {
            Some((placeholder, value)) => {
                prompt.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                prompt.push('{');
                rest = &tail[1..];
            }
        }
    }
    prompt.push_str(rest);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screening::catalog::RoleId;

    const RESUME: &str = "Jane Doe\nSkills: React, TypeScript, Jest\nBuilt a design system.";

    #[test]
    fn test_build_is_deterministic() {
        let reqs = RoleId::FrontendEngineer.requirements();
        assert_eq!(build_prompt(RESUME, reqs), build_prompt(RESUME, reqs));
    }

    #[test]
    fn test_prompt_embeds_inputs_verbatim() {
        let reqs = RoleId::BackendEngineer.requirements();
        let prompt = build_prompt(RESUME, reqs);
        assert!(prompt.contains(RESUME));
        assert!(prompt.contains(reqs));
    }

    #[test]
    fn test_prompt_names_schema_and_all_keys() {
        let prompt = build_prompt(RESUME, "Required Skills:\n- Rust");
        assert!(prompt.contains(VERDICT_SCHEMA_NAME));
        for key in [
            "\"selected\"",
            "\"feedback\"",
            "\"matching_skills\"",
            "\"missing_skills\"",
            "\"experience_level\"",
        ] {
            assert!(prompt.contains(key), "prompt is missing {key}");
        }
    }

    #[test]
    fn test_prompt_carries_rubric_and_no_markdown_instruction() {
        let prompt = build_prompt(RESUME, "x");
        assert!(prompt.contains("at least 70% of required skills"));
        assert!(prompt.contains("transferable skills"));
        assert!(prompt.contains("continuous learning"));
        assert!(prompt.contains("without any markdown formatting"));
    }

    #[test]
    fn test_placeholder_text_in_resume_is_not_expanded() {
        let resume = "I wrote {role_requirements} and {resume_text} literally";
        let prompt = build_prompt(resume, "REQS");
        assert!(prompt.contains(resume));
        assert_eq!(prompt.matches("REQS").count(), 1);
    }

    #[test]
    fn test_requirements_precede_resume() {
        let prompt = build_prompt("RESUME-BODY", "REQ-BODY");
        let reqs_at = prompt.find("REQ-BODY").unwrap();
        let resume_at = prompt.find("RESUME-BODY").unwrap();
        assert!(reqs_at < resume_at);
    }

    #[test]
    fn test_schema_braces_survive_substitution() {
        let prompt = build_prompt("r", "q");
        assert!(prompt.contains("{\n    \"selected\""));
        assert!(!prompt.contains("{schema_name}"));
    }
}
