use super::*;

#[test]
fn test_cdp_request_serialize() {
    let req = CdpRequest {
        id: 1,
        method: "Page.navigate".to_string(),
        params: Some(serde_json::json!({"url": "https://start.exactonline.nl"})),
        session_id: Some("S1".to_string()),
    };
    let json = serde_json::to_string(&req).unwrap();
    assert!(json.contains("Page.navigate"));
    assert!(json.contains("\"sessionId\":\"S1\""));
}

#[test]
fn test_cdp_response_deserialize() {
    let json = r#"{"id": 1, "result": {"frameId": "abc"}}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, Some(1));
    assert!(resp.result.is_some());
    assert!(resp.error.is_none());
}

#[test]
fn test_cdp_event_deserialize() {
    let json = r#"{"method": "Page.loadEventFired", "params": {"timestamp": 1.0}, "sessionId": "S1"}"#;
    let resp: CdpResponse = serde_json::from_str(json).unwrap();
    assert_eq!(resp.id, None);
    assert_eq!(resp.method.as_deref(), Some("Page.loadEventFired"));
    assert_eq!(resp.session_id.as_deref(), Some("S1"));
}

#[test]
fn test_page_info_deserialize() {
    let json = r#"{
        "id": "page123",
        "type": "page",
        "title": "",
        "url": "about:blank",
        "webSocketDebuggerUrl": "ws://localhost:9222/devtools/page/page123"
    }"#;
    let info: PageInfo = serde_json::from_str(json).unwrap();
    assert_eq!(info.id, "page123");
    assert_eq!(info.page_type, "page");
}

#[test]
fn test_box_model_center() {
    let model = BoxModel {
        content: vec![10.0, 20.0, 30.0, 20.0, 30.0, 40.0, 10.0, 40.0],
        width: 20,
        height: 20,
    };
    assert_eq!(model.center(), Some((20.0, 30.0)));

    let empty = BoxModel {
        content: vec![],
        width: 0,
        height: 0,
    };
    assert_eq!(empty.center(), None);
}

#[test]
fn test_exception_message_prefers_description() {
    let details: ExceptionDetails = serde_json::from_value(serde_json::json!({
        "text": "Uncaught",
        "exception": {"type": "object", "description": "Error: HTTP 404"}
    }))
    .unwrap();
    assert_eq!(details.message(), "Error: HTTP 404");

    let bare: ExceptionDetails = serde_json::from_value(serde_json::json!({"text": "Uncaught"})).unwrap();
    assert_eq!(bare.message(), "Uncaught");
}

#[test]
fn test_session_cookie_drops_expiry() {
    let cookie: Cookie = serde_json::from_value(serde_json::json!({
        "name": "ASP.NET_SessionId",
        "value": "abc",
        "domain": "start.exactonline.nl",
        "path": "/",
        "expires": -1,
        "httpOnly": true,
        "secure": true,
        "session": true,
        "sameSite": "Lax"
    }))
    .unwrap();

    let param = CookieParam::from(&cookie);
    assert_eq!(param.expires, None);
    assert!(param.http_only);
    assert_eq!(param.same_site.as_deref(), Some("Lax"));

    let json = serde_json::to_value(&param).unwrap();
    assert!(json.get("expires").is_none());
    assert_eq!(json["httpOnly"], true);
}

#[test]
fn test_persistent_cookie_keeps_expiry() {
    let cookie = Cookie {
        name: "DeviceId".to_string(),
        value: "d1".to_string(),
        domain: ".exactonline.nl".to_string(),
        path: "/".to_string(),
        expires: 1_900_000_000.0,
        http_only: false,
        secure: true,
        session: false,
        same_site: None,
    };
    let param = CookieParam::from(&cookie);
    assert_eq!(param.expires, Some(1_900_000_000.0));

    let json = serde_json::to_value(&param).unwrap();
    assert!(json.get("sameSite").is_none());
}

#[test]
fn test_screenshot_format_serialize() {
    let json = serde_json::to_string(&ScreenshotFormat::Png).unwrap();
    assert_eq!(json, "\"png\"");
}
