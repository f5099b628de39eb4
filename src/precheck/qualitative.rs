use serde_json::Value;
use tracing::{debug, warn};

use crate::capability::LanguageModel;
use crate::error::PrecheckError;
use crate::model::{DEFAULT_REQUIREMENTS, QualitativeResult};

pub const VAGUE_INDICATORS: [&str; 5] = ["vague", "generic", "optimize", "maximize", "estimated"];
pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "Clarify vague language.",
    "Provide concrete metrics.",
    "Add missing strategic sections if any.",
];

#[derive(Debug, Clone, PartialEq)]
pub enum ModelVerdict {
    Structured(QualitativeResult),
    Unusable(String),
}

pub fn analyze(
    model: &dyn LanguageModel,
    content: &str,
    custom_requirements: Option<&[String]>,
) -> Result<QualitativeResult, PrecheckError> {
    if content.trim().is_empty() {
        return Ok(QualitativeResult::default());
    }

    let prompt = build_prompt(content, custom_requirements);
    let raw = model
        .complete(&prompt)
        .map_err(|err| PrecheckError::capability("language model", err))?;

    match parse_model_output(&raw) {
        ModelVerdict::Structured(result) => {
            debug!(
                missing = result.missing_sections.len(),
                flagged = result.flagged_phrases.len(),
                suggestions = result.suggestions.len(),
                "model analysis parsed"
            );
            Ok(result)
        }
        ModelVerdict::Unusable(reason) => {
            warn!(reason = %reason, "model output unusable, using heuristic analysis");
            Ok(heuristic_analysis(content))
        }
    }
}

pub fn build_prompt(content: &str, custom_requirements: Option<&[String]>) -> String {
    match custom_requirements.filter(|requirements| !requirements.is_empty()) {
        None => format!(
            "You are an assistant helping improve marketing and documentation tasks.\n\
             Given the content delimited by <content> tags, list:\n\
             1. Missing required high-level sections from: {}.\n\
             2. Flag vague or generic phrases.\n\
             3. Provide 3 concise actionable improvement suggestions.\n\
             Return JSON with keys: missingSections (list), flaggedPhrases (list), suggestions (list). No extra text.\n\
             <content>\n{content}\n</content>\n",
            DEFAULT_REQUIREMENTS.join(", ")
        ),
        Some(requirements) => format!(
            "You are an assistant helping improve task documents. Given the content, \
             list which of the following required sections appear to be missing (exact or close heading):\n\
             Required sections: {}\n\
             Also flag vague/generic phrases and give 3 concise improvement suggestions. \
             Return JSON with keys: missingSections (list), flaggedPhrases (list), suggestions (list).\n\
             <content>\n{content}\n</content>",
            requirements.join(", ")
        ),
    }
}

pub fn parse_model_output(raw: &str) -> ModelVerdict {
    let (Some(first), Some(last)) = (raw.find('{'), raw.rfind('}')) else {
        return ModelVerdict::Unusable("no JSON object in model output".to_string());
    };
    if last < first {
        return ModelVerdict::Unusable("no JSON object in model output".to_string());
    }

    let value = match serde_json::from_str::<Value>(&raw[first..=last]) {
        Ok(value) => value,
        Err(err) => return ModelVerdict::Unusable(format!("malformed JSON: {err}")),
    };
    let Value::Object(object) = value else {
        return ModelVerdict::Unusable("model output is not a JSON object".to_string());
    };

    let field = |key: &str| {
        string_list(object.get(key)).ok_or_else(|| format!("key '{key}' is not a list of strings"))
    };
    match (
        field("missingSections"),
        field("flaggedPhrases"),
        field("suggestions"),
    ) {
        (Ok(missing_sections), Ok(flagged_phrases), Ok(suggestions)) => {
            ModelVerdict::Structured(QualitativeResult {
                missing_sections,
                flagged_phrases,
                suggestions,
            })
        }
        (Err(reason), _, _) | (_, Err(reason), _) | (_, _, Err(reason)) => {
            ModelVerdict::Unusable(reason)
        }
    }
}

// Absent and null keys default to empty lists.
fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    match value {
        None | Some(Value::Null) => Some(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect(),
        Some(_) => None,
    }
}

pub fn heuristic_analysis(content: &str) -> QualitativeResult {
    let lowered = content.to_lowercase();
    let flagged_phrases = VAGUE_INDICATORS
        .iter()
        .filter(|indicator| lowered.contains(*indicator))
        .map(|indicator| (*indicator).to_string())
        .collect();

    QualitativeResult {
        missing_sections: Vec::new(),
        flagged_phrases,
        suggestions: FALLBACK_SUGGESTIONS
            .iter()
            .map(|suggestion| (*suggestion).to_string())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::{Result, bail};

    use super::*;

    struct CannedModel {
        reply: String,
        prompts: RefCell<Vec<String>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl LanguageModel for CannedModel {
        fn complete(&self, prompt: &str) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.reply.clone())
        }
    }

    struct UnreachableModel;

    impl LanguageModel for UnreachableModel {
        fn complete(&self, _prompt: &str) -> Result<String> {
            bail!("connection refused")
        }
    }

    #[test]
    fn parses_json_embedded_in_prose() {
        let raw = "Sure! Here you go:\n{\"missingSections\": [\"Success metrics\"], \"flaggedPhrases\": [\"best-in-class\"], \"suggestions\": [\"Add KPIs\"]}\nHope it helps.";
        let verdict = parse_model_output(raw);
        assert_eq!(
            verdict,
            ModelVerdict::Structured(QualitativeResult {
                missing_sections: vec!["Success metrics".to_string()],
                flagged_phrases: vec!["best-in-class".to_string()],
                suggestions: vec!["Add KPIs".to_string()],
            })
        );
    }

    #[test]
    fn missing_and_null_keys_default_to_empty_lists() {
        let verdict = parse_model_output("{\"suggestions\": [\"One\"], \"flaggedPhrases\": null}");
        let ModelVerdict::Structured(result) = verdict else {
            panic!("expected structured verdict");
        };
        assert!(result.missing_sections.is_empty());
        assert!(result.flagged_phrases.is_empty());
        assert_eq!(result.suggestions, vec!["One".to_string()]);
    }

    #[test]
    fn unexpected_shapes_are_unusable() {
        for raw in [
            "no braces at all",
            "} reversed {",
            "{\"missingSections\": [\"a\",}",
            "{\"missingSections\": \"Budget\"}",
            "{\"suggestions\": [1, 2]}",
        ] {
            assert!(
                matches!(parse_model_output(raw), ModelVerdict::Unusable(_)),
                "expected unusable verdict for {raw:?}"
            );
        }
    }

    #[test]
    fn empty_content_skips_model_call() {
        let model = CannedModel::new("{}");
        let result = analyze(&model, "   ", None).expect("analysis should succeed");
        assert_eq!(result, QualitativeResult::default());
        assert!(model.prompts.borrow().is_empty());
    }

    #[test]
    fn prose_reply_falls_back_to_heuristic() {
        let model = CannedModel::new("The document looks fine overall.");
        let result = analyze(
            &model,
            "We will optimize reach with an estimated budget.",
            None,
        )
        .expect("analysis should succeed");
        assert!(result.missing_sections.is_empty());
        assert_eq!(
            result.flagged_phrases,
            vec!["optimize".to_string(), "estimated".to_string()]
        );
        assert_eq!(result.suggestions.len(), 3);
    }

    #[test]
    fn raw_gateway_body_falls_back_to_heuristic() {
        let model = CannedModel::new("<html><body>502 Bad Gateway</body></html>");
        let result = analyze(&model, "A generic plan to maximize reach.", None)
            .expect("analysis should succeed");
        assert_eq!(
            result.flagged_phrases,
            vec!["generic".to_string(), "maximize".to_string()]
        );
        assert_eq!(result.suggestions, FALLBACK_SUGGESTIONS.map(str::to_string).to_vec());
    }

    #[test]
    fn custom_requirements_drive_the_prompt() {
        let model = CannedModel::new("{}");
        let requirements = vec!["Risk Assessment".to_string(), "Rollout plan".to_string()];
        analyze(&model, "Some content", Some(requirements.as_slice()))
            .expect("analysis should succeed");

        let prompts = model.prompts.borrow();
        assert!(prompts[0].contains("Required sections: Risk Assessment, Rollout plan"));
        assert!(!prompts[0].contains("Executive summary"));
        assert!(prompts[0].contains("<content>\nSome content\n</content>"));
    }

    #[test]
    fn default_prompt_lists_canonical_sections() {
        let prompt = build_prompt("Body", None);
        assert!(prompt.contains(&DEFAULT_REQUIREMENTS.join(", ")));
        assert!(prompt.contains("missingSections (list)"));
    }

    #[test]
    fn unreachable_model_is_a_capability_error() {
        let err = analyze(&UnreachableModel, "Some content", None)
            .expect_err("unreachable model should fail");
        assert!(matches!(
            err,
            PrecheckError::Capability {
                capability: "language model",
                ..
            }
        ));
        assert!(err.to_string().contains("connection refused"));
    }
}
