use serde_json::Value;

use crate::AppState;

/// Upper bound on an accepted feed payload. The USGS weekly summary is
/// well under 2 MB; anything near this limit is a misconfigured URL.
const MAX_FEED_BYTES: usize = 8 * 1024 * 1024;

/// Fetch the configured live feed and parse it as JSON.
///
/// The feed is untrusted input: the URL scheme is restricted, the payload
/// size capped, and a non-success upstream status is an error. Callers
/// treat any error here as "abort before touching the archive".
pub async fn fetch_feed_json(state: &AppState) -> Result<Value, String> {
    let url = state.feed_url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err("only http(s) feed URLs are allowed".to_string());
    }

    let resp = state
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| format!("feed fetch failed: {e}"))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(format!("feed upstream HTTP {}", status.as_u16()));
    }

    let bytes = resp
        .bytes()
        .await
        .map_err(|e| format!("feed read failed: {e}"))?;

    if bytes.len() > MAX_FEED_BYTES {
        return Err(format!(
            "feed payload too large (max {MAX_FEED_BYTES} bytes)"
        ));
    }

    serde_json::from_slice(&bytes).map_err(|e| format!("feed JSON parse failed: {e}"))
}
