use serde_json::json;

use judstat_terminal::envelope::{
    DEFAULT_SUCCESS_MESSAGE, Envelope, error_message, normalize, normalize_body,
};
use judstat_terminal::error::{ApiError, CONNECTION_ERROR};

#[test]
fn bare_array_is_wrapped_with_default_message() {
    let env = normalize(json!([{ "id": 1 }, { "id": 2 }])).unwrap();
    assert_eq!(env.data, json!([{ "id": 1 }, { "id": 2 }]));
    assert_eq!(env.message.as_deref(), Some(DEFAULT_SUCCESS_MESSAGE));
}

#[test]
fn enveloped_success_unwraps_data_and_keeps_message() {
    let env = normalize(json!({
        "success": true,
        "data": { "total": 3 },
        "message": "Estadísticas obtenidas"
    }))
    .unwrap();
    assert_eq!(
        env,
        Envelope {
            data: json!({ "total": 3 }),
            message: Some("Estadísticas obtenidas".to_string()),
        }
    );
}

#[test]
fn enveloped_failure_becomes_rejection_with_backend_message() {
    let err = normalize(json!({ "success": false, "data": null, "message": "Sin permisos" }))
        .unwrap_err();
    assert_eq!(
        err,
        ApiError::Rejected {
            status: 200,
            message: "Sin permisos".to_string(),
        }
    );
}

#[test]
fn enveloped_failure_without_message_uses_connection_error() {
    let err = normalize(json!({ "success": false, "data": null })).unwrap_err();
    assert_eq!(err.user_message(), CONNECTION_ERROR);
}

#[test]
fn raw_object_is_wrapped_whole() {
    let body = json!({ "access_token": "abc" });
    let env = normalize(body.clone()).unwrap();
    assert_eq!(env.data, body);
    assert_eq!(env.message.as_deref(), Some(DEFAULT_SUCCESS_MESSAGE));
}

#[test]
fn success_flag_without_data_is_not_an_envelope() {
    let body = json!({ "success": true, "solicitudId": 4 });
    let env = normalize(body.clone()).unwrap();
    assert_eq!(env.data, body);
}

#[test]
fn empty_body_normalizes_to_null() {
    let env = normalize_body(204, "  ").unwrap();
    assert!(env.data.is_null());
}

#[test]
fn malformed_body_is_a_decode_error() {
    let err = normalize_body(200, "<html>").unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)));
}

#[test]
fn validation_messages_are_joined() {
    let raw = r#"{"statusCode":400,"message":["email must be an email","name should not be empty"]}"#;
    assert_eq!(
        error_message(raw).as_deref(),
        Some("email must be an email; name should not be empty")
    );
    assert_eq!(error_message("not json"), None);
    assert_eq!(error_message(r#"{"message":""}"#), None);
}

#[test]
fn decode_maps_data_into_typed_envelope() {
    let env = normalize(json!({ "success": true, "data": [1, 2, 3], "message": "ok" }))
        .unwrap()
        .decode::<Vec<i64>>()
        .unwrap();
    assert_eq!(env.data, vec![1, 2, 3]);
    assert_eq!(env.message.as_deref(), Some("ok"));
}
