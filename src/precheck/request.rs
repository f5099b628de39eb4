use serde_json::Value;

use crate::error::PrecheckError;
use crate::model::Document;

pub fn document_from_request(body: &Value) -> Result<Document, PrecheckError> {
    let Value::Object(fields) = body else {
        return Err(PrecheckError::Validation(
            "request body must be a JSON object".to_string(),
        ));
    };

    let task_id = fields
        .get("taskId")
        .or_else(|| fields.get("task_id"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let content = fields
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let requirements = match fields.get("requirements") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| item.as_str().map(ToOwned::to_owned))
                .collect::<Option<Vec<String>>>()
                .ok_or_else(|| {
                    PrecheckError::Validation(
                        "requirements must be a list of strings".to_string(),
                    )
                })?,
        ),
        Some(_) => {
            return Err(PrecheckError::Validation(
                "requirements must be a list of strings".to_string(),
            ));
        }
    };

    build_document(task_id, content, requirements)
}

pub fn build_document(
    task_id: &str,
    content: &str,
    requirements: Option<Vec<String>>,
) -> Result<Document, PrecheckError> {
    if task_id.trim().is_empty() || content.is_empty() {
        return Err(PrecheckError::Validation(
            "task_id and content are required".to_string(),
        ));
    }

    if let Some(requirements) = &requirements {
        if requirements.iter().any(|label| label.trim().is_empty()) {
            return Err(PrecheckError::Validation(
                "requirement labels must not be blank".to_string(),
            ));
        }
    }

    Ok(Document {
        task_id: task_id.to_string(),
        content: content.to_string(),
        requirements,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn accepts_camel_and_snake_case_task_id() {
        let camel = document_from_request(&json!({"taskId": "T-1", "content": "Body"}))
            .expect("camelCase request should validate");
        assert_eq!(camel.task_id, "T-1");
        assert!(camel.requirements.is_none());

        let snake = document_from_request(&json!({"task_id": "T-2", "content": "Body"}))
            .expect("snake_case request should validate");
        assert_eq!(snake.task_id, "T-2");
    }

    #[test]
    fn rejects_missing_identifier_or_content() {
        for body in [
            json!({"content": "Body"}),
            json!({"taskId": "T-1"}),
            json!({"taskId": "", "content": "Body"}),
            json!({"taskId": "T-1", "content": ""}),
            json!({"taskId": 7, "content": "Body"}),
            json!(["T-1", "Body"]),
        ] {
            let err = document_from_request(&body).expect_err("request should be rejected");
            assert!(matches!(err, PrecheckError::Validation(_)), "body {body}");
        }
    }

    #[test]
    fn rejects_requirements_that_are_not_string_lists() {
        for requirements in [json!("Risk Assessment"), json!(["Risk", 3]), json!({"a": 1})] {
            let body = json!({"taskId": "T-1", "content": "Body", "requirements": requirements});
            let err = document_from_request(&body).expect_err("request should be rejected");
            assert!(err.to_string().contains("requirements must be a list of strings"));
        }
    }

    #[test]
    fn rejects_blank_requirement_labels() {
        for label in ["", "   "] {
            let body = json!({
                "taskId": "T-1",
                "content": "Body",
                "requirements": ["Risk Assessment", label],
            });
            let err = document_from_request(&body).expect_err("blank label should be rejected");
            assert!(matches!(err, PrecheckError::Validation(_)));
            assert!(err.to_string().contains("must not be blank"));
        }
    }

    #[test]
    fn empty_requirement_list_means_default_set() {
        let document = document_from_request(
            &json!({"taskId": "T-1", "content": "Body", "requirements": []}),
        )
        .expect("empty list should validate");
        assert!(document.custom_requirements().is_none());
        assert_eq!(document.active_requirements().len(), 5);
    }
}
