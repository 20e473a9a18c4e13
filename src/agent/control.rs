//! Host → document control signal.

use super::policy::REFRESH_SENTINEL;
use serde::Deserialize;

#[derive(Deserialize)]
struct ControlEnvelope {
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// Whether an inbound message payload asks for a re-measurement.
///
/// Accepts the bare sentinel or a JSON object whose `type` is the sentinel.
pub fn is_refresh_request(payload: &str) -> bool {
    if payload == REFRESH_SENTINEL {
        return true;
    }
    let trimmed = payload.trim_start();
    if !trimmed.starts_with('{') {
        return false;
    }
    serde_json::from_str::<ControlEnvelope>(trimmed)
        .ok()
        .and_then(|envelope| envelope.kind)
        .is_some_and(|kind| kind == REFRESH_SENTINEL)
}

/// Script the host evaluates to deliver the refresh request as a message event.
///
/// Delivered once, on `window`; the document listener serves pages that
/// dispatch control messages on `document` themselves.
pub fn refresh_request_script() -> String {
    let sentinel = serde_json::to_string(REFRESH_SENTINEL).unwrap_or_default();
    format!(
        r#"(function() {{
    try {{ window.postMessage({0}, '*'); }} catch (e) {{}}
}})();"#,
        sentinel
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_sentinel_is_recognized() {
        assert!(is_refresh_request(REFRESH_SENTINEL));
    }

    #[test]
    fn json_envelope_with_marker_is_recognized() {
        let payload = format!(r#"{{"type":"{}","extra":1}}"#, REFRESH_SENTINEL);
        assert!(is_refresh_request(&payload));
    }

    #[test]
    fn other_payloads_are_ignored() {
        assert!(!is_refresh_request(""));
        assert!(!is_refresh_request("240"));
        assert!(!is_refresh_request(r#"{"type":"something-else"}"#));
        assert!(!is_refresh_request(r#"{"type":"#));
        assert!(!is_refresh_request(&format!(" {} ", REFRESH_SENTINEL)));
    }

    #[test]
    fn refresh_script_delivers_sentinel_once() {
        let script = refresh_request_script();
        assert!(script.contains(&format!("\"{}\"", REFRESH_SENTINEL)));
        assert_eq!(script.matches("window.postMessage").count(), 1);
        assert!(!script.contains("dispatchEvent"));
    }
}
