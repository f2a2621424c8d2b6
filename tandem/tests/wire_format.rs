//! Marshal/unmarshal coverage for the four wire shapes.

use proptest::prelude::*;
use serde_json::{json, Value};
use tandem::{
    RequestId, RpcError, WireMessage, WireObject, WireRequest, WireResponse, ERROR_INTERNAL,
};

fn marshal(value: &impl serde::Serialize) -> Value {
    serde_json::to_value(value).expect("marshal failed")
}

#[test]
fn test_marshal_request_rpc() {
    // A call whose id was never assigned still carries an explicit null id.
    let req = WireRequest::call(RequestId::Undefined, "hello", Some(json!([0, 1, 2])));
    assert_eq!(
        marshal(&req),
        json!({"jsonrpc": "2.0", "method": "hello", "params": [0, 1, 2], "id": null})
    );
}

#[test]
fn test_marshal_request_with_id() {
    let req = WireRequest::call(RequestId::String("12345".into()), "hello", Some(json!({})));
    assert_eq!(
        marshal(&req),
        json!({"jsonrpc": "2.0", "method": "hello", "params": {}, "id": "12345"})
    );
}

#[test]
fn test_marshal_request_notification_omits_id() {
    let req = WireRequest::notification("hello", Some(json!({})));
    let v = marshal(&req);
    assert_eq!(v, json!({"jsonrpc": "2.0", "method": "hello", "params": {}}));
    assert!(v.get("id").is_none());
}

#[test]
fn test_marshal_request_without_params_omits_params() {
    let req = WireRequest::call(RequestId::Number(1), "hello", None);
    assert_eq!(marshal(&req), json!({"jsonrpc": "2.0", "method": "hello", "id": 1}));
}

#[test]
fn test_marshal_success_response_null_id() {
    let resp = WireResponse::result(RequestId::Null, json!({}));
    assert_eq!(
        marshal(&resp),
        json!({"jsonrpc": "2.0", "id": null, "result": {}})
    );
}

#[test]
fn test_marshal_error_response() {
    let resp = WireResponse::error(
        RequestId::String("12345".into()),
        RpcError::new(ERROR_INTERNAL, "some error"),
    );
    assert_eq!(
        marshal(&resp),
        json!({
            "jsonrpc": "2.0",
            "id": "12345",
            "error": {"code": -32603, "message": "some error"}
        })
    );
}

#[test]
fn test_marshal_response_undefined_id_omits_id() {
    let resp = WireResponse::result(RequestId::Undefined, json!([]));
    assert_eq!(marshal(&resp), json!({"jsonrpc": "2.0", "result": []}));
}

#[test]
fn test_marshal_response_requires_exactly_one_arm() {
    let both = WireResponse {
        id: RequestId::Number(1),
        result: Some(json!(1)),
        error: Some(RpcError::new(1, "x")),
    };
    assert!(serde_json::to_value(&both).is_err());

    let neither = WireResponse {
        id: RequestId::Number(1),
        result: None,
        error: None,
    };
    assert!(serde_json::to_value(&neither).is_err());
}

#[test]
fn test_marshal_object() {
    let obj = WireObject::Request(WireRequest::notification("test", Some(json!([]))));
    assert_eq!(
        marshal(&obj),
        json!({"jsonrpc": "2.0", "method": "test", "params": []})
    );

    let obj = WireObject::Response(WireResponse::result(RequestId::Null, json!([])));
    assert_eq!(marshal(&obj), json!({"jsonrpc": "2.0", "result": [], "id": null}));
}

#[test]
fn test_marshal_message_non_batched() {
    let msg = WireMessage::single(WireObject::Request(WireRequest::call(
        RequestId::String("1".into()),
        "hello",
        Some(json!([])),
    )));
    assert_eq!(
        marshal(&msg),
        json!({"jsonrpc": "2.0", "id": "1", "method": "hello", "params": []})
    );
}

#[test]
fn test_marshal_message_batched() {
    let msg = WireMessage::batch(vec![WireObject::Request(WireRequest::call(
        RequestId::String("1".into()),
        "hello",
        Some(json!([])),
    ))]);
    assert_eq!(
        marshal(&msg),
        json!([{"jsonrpc": "2.0", "id": "1", "method": "hello", "params": []}])
    );
}

#[test]
fn test_marshal_message_non_batched_requires_one_object() {
    let msg = WireMessage {
        batched: false,
        objects: vec![
            WireObject::Request(WireRequest::notification("a", None)),
            WireObject::Request(WireRequest::notification("b", None)),
        ],
    };
    assert!(serde_json::to_value(&msg).is_err());
}

#[test]
fn test_empty_batch_marshals_but_does_not_parse_back() {
    let msg = WireMessage {
        batched: true,
        objects: Vec::new(),
    };
    let bytes = serde_json::to_string(&msg).unwrap();
    assert_eq!(bytes, "[]");
    assert!(serde_json::from_str::<WireMessage>(&bytes).is_err());
}

#[test]
fn test_unmarshal_request_rpc() {
    let req: WireRequest = serde_json::from_str(
        r#"{"jsonrpc": "2.0", "method": "hello", "params": [0,1,2], "id": null}"#,
    )
    .unwrap();
    assert_eq!(
        req,
        WireRequest {
            notification: false,
            id: RequestId::Null,
            method: "hello".into(),
            params: Some(json!([0, 1, 2])),
        }
    );
}

#[test]
fn test_unmarshal_request_with_id() {
    let req: WireRequest = serde_json::from_str(
        r#"{"jsonrpc": "2.0", "method": "hello", "params": {}, "id": "12345"}"#,
    )
    .unwrap();
    assert!(!req.notification);
    assert_eq!(req.id, RequestId::String("12345".into()));
}

#[test]
fn test_unmarshal_request_notification() {
    let req: WireRequest =
        serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "hello", "params": {}}"#).unwrap();
    assert_eq!(
        req,
        WireRequest {
            notification: true,
            id: RequestId::Undefined,
            method: "hello".into(),
            params: Some(json!({})),
        }
    );
}

#[test]
fn test_unmarshal_request_rejects_wrong_version() {
    assert!(
        serde_json::from_str::<WireRequest>(r#"{"jsonrpc": "1.0", "method": "hello"}"#).is_err()
    );
    assert!(serde_json::from_str::<WireRequest>(r#"{"method": "hello"}"#).is_err());
}

#[test]
fn test_unmarshal_request_rejects_unknown_fields() {
    assert!(serde_json::from_str::<WireRequest>(
        r#"{"jsonrpc": "2.0", "method": "hello", "extra": 1}"#
    )
    .is_err());
}

#[test]
fn test_unmarshal_success_response() {
    let resp: WireResponse =
        serde_json::from_str(r#"{"jsonrpc": "2.0", "id": null, "result": {}}"#).unwrap();
    assert_eq!(resp, WireResponse::result(RequestId::Null, json!({})));
}

#[test]
fn test_unmarshal_error_response() {
    let resp: WireResponse = serde_json::from_str(
        r#"{"jsonrpc": "2.0", "id": "12345", "error": {"code": -32603, "message": "some error"}}"#,
    )
    .unwrap();
    assert_eq!(
        resp,
        WireResponse::error(
            RequestId::String("12345".into()),
            RpcError::new(ERROR_INTERNAL, "some error")
        )
    );
}

#[test]
fn test_unmarshal_response_null_result_counts_as_set() {
    let resp: WireResponse =
        serde_json::from_str(r#"{"jsonrpc": "2.0", "id": 1, "result": null}"#).unwrap();
    assert_eq!(resp.result, Some(Value::Null));
    assert!(resp.error.is_none());
}

#[test]
fn test_unmarshal_response_requires_exactly_one_arm() {
    assert!(serde_json::from_str::<WireResponse>(
        r#"{"jsonrpc": "2.0", "id": 1, "result": 1, "error": {"code": 1, "message": "x"}}"#
    )
    .is_err());
    assert!(serde_json::from_str::<WireResponse>(r#"{"jsonrpc": "2.0", "id": 1}"#).is_err());
}

#[test]
fn test_unmarshal_object_request_arm() {
    let obj: WireObject =
        serde_json::from_str(r#"{"jsonrpc": "2.0", "method": "test", "params": []}"#).unwrap();
    assert_eq!(
        obj,
        WireObject::Request(WireRequest::notification("test", Some(json!([]))))
    );
}

#[test]
fn test_unmarshal_object_response_arm() {
    let obj: WireObject = serde_json::from_str(r#"{"jsonrpc": "2.0", "result": []}"#).unwrap();
    assert_eq!(
        obj,
        WireObject::Response(WireResponse::result(RequestId::Undefined, json!([])))
    );

    let obj: WireObject =
        serde_json::from_str(r#"{"jsonrpc": "2.0", "result": [], "id": null}"#).unwrap();
    assert_eq!(
        obj,
        WireObject::Response(WireResponse::result(RequestId::Null, json!([])))
    );
}

#[test]
fn test_unmarshal_object_rejects_fields_unknown_to_both_shapes() {
    let err = serde_json::from_str::<WireObject>(
        r#"{"jsonrpc": "2.0", "method": "m", "result": 1, "id": 1}"#,
    )
    .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("for request"), "got: {text}");
    assert!(text.contains("for response"), "got: {text}");
}

#[test]
fn test_unmarshal_message_shapes() {
    let msg: WireMessage = serde_json::from_str(
        r#"{"jsonrpc": "2.0", "id": "1", "method": "hello", "params": []}"#,
    )
    .unwrap();
    assert!(!msg.batched);
    assert_eq!(msg.objects.len(), 1);

    let msg: WireMessage = serde_json::from_str(
        r#"[{"jsonrpc": "2.0", "id": "1", "method": "hello", "params": []}]"#,
    )
    .unwrap();
    assert!(msg.batched);
    assert_eq!(msg.objects.len(), 1);
}

fn id_strategy() -> impl Strategy<Value = RequestId> {
    prop_oneof![
        Just(RequestId::Null),
        any::<i64>().prop_map(RequestId::Number),
        "[a-z0-9]{0,12}".prop_map(RequestId::String),
    ]
}

fn params_strategy() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        Just(Some(json!([]))),
        proptest::collection::vec(any::<i32>(), 0..4)
            .prop_map(|v| Some(json!(v))),
        "[a-z]{1,8}".prop_map(|s| Some(json!({ "key": s }))),
    ]
}

proptest! {
    #[test]
    fn prop_request_round_trip(
        id in id_strategy(),
        method in "[a-z_/]{1,16}",
        params in params_strategy(),
    ) {
        let req = WireRequest::call(id, method, params);
        let bytes = serde_json::to_vec(&req).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        prop_assert!(text.contains(r#""jsonrpc":"2.0""#));
        prop_assert!(text.contains(r#""id""#));
        let back: WireRequest = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(back, req);
    }

    #[test]
    fn prop_notification_round_trip(
        method in "[a-z_/]{1,16}",
        params in params_strategy(),
    ) {
        let req = WireRequest::notification(method, params);
        let text = serde_json::to_string(&req).unwrap();
        prop_assert!(!text.contains(r#""id""#));
        let back: WireRequest = serde_json::from_str(&text).unwrap();
        prop_assert!(back.notification);
        prop_assert_eq!(back, req);
    }

    #[test]
    fn prop_response_round_trip(
        id in id_strategy(),
        result in prop_oneof![
            Just(Value::Null),
            any::<i64>().prop_map(|n| json!(n)),
            "[a-z]{0,8}".prop_map(|s| json!(s)),
        ],
    ) {
        let resp = WireResponse::result(id, result);
        let bytes = serde_json::to_vec(&resp).unwrap();
        let back: WireResponse = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(back, resp);
    }

    #[test]
    fn prop_error_response_round_trip(
        id in id_strategy(),
        code in -32768i32..0,
        message in "[ -~]{0,32}",
    ) {
        let resp = WireResponse::error(id, RpcError::new(code, message));
        let bytes = serde_json::to_vec(&resp).unwrap();
        let back: WireResponse = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(back, resp);
    }
}
