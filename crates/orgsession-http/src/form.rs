//! Multipart form encoding of JSON payloads.

use reqwest::multipart::Form;
use serde_json::Value;

use orgsession_core::error::AppError;
use orgsession_core::result::AppResult;

use crate::request::{FormField, PipelineRequest, RequestBody};

/// Flatten a JSON object into form fields.
///
/// Strings are sent verbatim, numbers and booleans as their JSON text,
/// arrays as one field per element, nested objects as JSON text. Nulls
/// are omitted.
pub fn form_fields(payload: &Value) -> AppResult<Vec<FormField>> {
    let Value::Object(map) = payload else {
        return Err(AppError::validation(
            "Form encoding requires a JSON object payload",
        ));
    };

    let mut fields = Vec::with_capacity(map.len());
    for (name, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = field_text(item) {
                        fields.push(FormField::new(name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = field_text(other) {
                    fields.push(FormField::new(name.clone(), text));
                }
            }
        }
    }
    Ok(fields)
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) | Value::Object(_) => {
            Some(value.to_string())
        }
    }
}

/// Replace a flagged request's JSON payload with multipart fields.
pub fn encode_request(request: &mut PipelineRequest) -> AppResult<()> {
    if !request.form_encode {
        return Ok(());
    }

    let fields = match &request.body {
        RequestBody::Multipart(_) => return Ok(()),
        RequestBody::Empty => Vec::new(),
        RequestBody::Json(payload) => form_fields(payload)?,
        RequestBody::Text(_) => {
            return Err(AppError::validation(
                "A text payload cannot be form encoded",
            ));
        }
    };

    request.body = RequestBody::Multipart(fields);
    Ok(())
}

/// Build the reqwest multipart form for dispatch.
pub fn to_multipart(fields: &[FormField]) -> Form {
    fields.iter().fold(Form::new(), |form, field| {
        form.text(field.name.clone(), field.value.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_fields() {
        let fields = form_fields(&json!({
            "name": "Acme",
            "seats": 12,
            "active": true,
            "tags": ["a", "b"],
            "meta": {"k": "v"},
            "missing": null
        }))
        .unwrap();

        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|f| (f.name.as_str(), f.value.as_str()))
            .collect();
        assert!(pairs.contains(&("name", "Acme")));
        assert!(pairs.contains(&("seats", "12")));
        assert!(pairs.contains(&("active", "true")));
        assert!(pairs.contains(&("tags", "a")));
        assert!(pairs.contains(&("tags", "b")));
        assert!(pairs.contains(&("meta", r#"{"k":"v"}"#)));
        assert!(!pairs.iter().any(|(name, _)| *name == "missing"));
        assert_eq!(fields.len(), 6);
    }

    #[test]
    fn test_non_object_is_rejected() {
        let err = form_fields(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind, orgsession_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_encode_request_only_when_flagged() {
        let mut plain = PipelineRequest::post("/x").json(json!({"a": "b"}));
        encode_request(&mut plain).unwrap();
        assert!(matches!(plain.body, RequestBody::Json(_)));

        let mut flagged = PipelineRequest::post("/x").json(json!({"a": "b"})).form_encoded();
        encode_request(&mut flagged).unwrap();
        assert_eq!(
            flagged.body,
            RequestBody::Multipart(vec![FormField::new("a", "b")])
        );
    }

    #[test]
    fn test_text_payload_cannot_be_form_encoded() {
        let mut request = PipelineRequest::post("/x").text("raw").form_encoded();
        assert!(encode_request(&mut request).is_err());
    }
}
