use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::errors::ApiError;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(data)).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Validates request input, mapping field errors into the structured
/// `details` object of the error envelope.
pub fn validate_input<T: Validate>(input: &T) -> Result<(), ApiError> {
    input.validate().map_err(|errors| {
        let fields: serde_json::Map<String, serde_json::Value> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let messages: Vec<String> = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .collect();
                (field.to_string(), json!(messages))
            })
            .collect();
        ApiError::FieldValidation(json!({ "fields": fields }))
    })
}

/// File download response: the payload plus a Content-Disposition
/// attachment header, used by the spreadsheet report endpoints.
pub fn attachment_response(bytes: Vec<u8>, content_type: &str, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 3))]
        name: String,
        #[validate(range(min = 1))]
        quantity: i32,
    }

    #[test]
    fn invalid_input_produces_per_field_details() {
        let err = validate_input(&Probe {
            name: "ab".into(),
            quantity: 0,
        })
        .unwrap_err();
        let ApiError::FieldValidation(details) = err else {
            panic!("expected field validation error");
        };
        let fields = details.get("fields").unwrap().as_object().unwrap();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("quantity"));
    }

    #[test]
    fn valid_input_passes() {
        assert!(validate_input(&Probe {
            name: "abc".into(),
            quantity: 2,
        })
        .is_ok());
    }

    #[test]
    fn attachment_sets_disposition_header() {
        let response = attachment_response(vec![1, 2, 3], "application/octet-stream", "x.bin");
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert_eq!(disposition, "attachment; filename=\"x.bin\"");
    }
}
