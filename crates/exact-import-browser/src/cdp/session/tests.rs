use super::core::decode_screenshot;
use super::input::KeyDefinition;
use super::js::fetch_text_script;
use super::navigation::{NAVIGATION_MARKER, arm_marker_script, navigated_script};

#[test]
fn test_enter_produces_carriage_return() {
    let enter = KeyDefinition::lookup("Enter").unwrap();
    assert_eq!(enter.code, "Enter");
    assert_eq!(enter.key_code, 13);
    assert_eq!(enter.text, Some("\r"));
}

#[test]
fn test_unknown_key_has_no_definition() {
    assert!(KeyDefinition::lookup("F13").is_none());
    assert!(KeyDefinition::lookup("Tab").is_none());
}

#[test]
fn test_fetch_script_quotes_url() {
    let script = fetch_text_script("https://start.exactonline.nl/docs/SysAttachmentView.aspx?ID=\"x\"");
    assert!(script.starts_with("fetch(\"https://start.exactonline.nl/docs/SysAttachmentView.aspx?ID=\\\"x\\\"\""));
    assert!(script.contains("credentials: 'include'"));
    assert!(script.contains("throw new Error('HTTP ' + r.status)"));
}

#[test]
fn test_navigation_scripts_share_marker() {
    assert!(arm_marker_script().contains(NAVIGATION_MARKER));
    let check = navigated_script();
    assert!(check.contains(&format!("window.{} === undefined", NAVIGATION_MARKER)));
    assert!(check.contains("readyState === 'complete'"));
}

#[test]
fn test_decode_screenshot() {
    assert_eq!(decode_screenshot("iVBORw==").unwrap(), vec![0x89, b'P', b'N', b'G']);
    assert!(decode_screenshot("not base64!").is_err());
}
