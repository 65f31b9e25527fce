//! Minimal W3C WebDriver client
//!
//! Just the handful of endpoints this bot needs: session lifecycle,
//! navigation, script execution, element lookup/rect/click and pointer
//! actions. JSON over a blocking HTTP client; the session is created once
//! at startup and deleted on drop.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{BotError, BotResult};

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Position and size of an element in CSS pixels.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A live WebDriver session.
pub struct WebDriver {
    http: reqwest::blocking::Client,
    base: String,
    session_id: String,
}

impl WebDriver {
    /// Open a session against a running WebDriver server (chromedriver,
    /// geckodriver, …).
    pub fn connect(server_url: &str) -> BotResult<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| BotError::Page(format!("http client: {e}")))?;

        let base = server_url.trim_end_matches('/').to_string();
        let body = json!({
            "capabilities": {
                "alwaysMatch": {}
            }
        });
        let value = send(&http, reqwest::Method::POST, &format!("{base}/session"), Some(body))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BotError::Page("session response carried no sessionId".into()))?
            .to_string();
        info!("[PAGE] WebDriver session {session_id} on {base}");
        Ok(WebDriver {
            http,
            base,
            session_id,
        })
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/session/{}{}", self.base, self.session_id, tail)
    }

    pub fn goto(&self, page_url: &str) -> BotResult<()> {
        send(
            &self.http,
            reqwest::Method::POST,
            &self.url("/url"),
            Some(json!({ "url": page_url })),
        )?;
        Ok(())
    }

    /// Run a script synchronously in the page and return its value.
    pub fn execute(&self, script: &str, args: Vec<Value>) -> BotResult<Value> {
        send(
            &self.http,
            reqwest::Method::POST,
            &self.url("/execute/sync"),
            Some(json!({ "script": script, "args": args })),
        )
    }

    /// Find one element by CSS selector; `Ok(None)` when it is not present.
    pub fn find(&self, css: &str) -> BotResult<Option<String>> {
        let result = send(
            &self.http,
            reqwest::Method::POST,
            &self.url("/element"),
            Some(json!({ "using": "css selector", "value": css })),
        );
        match result {
            Ok(value) => {
                let id = value
                    .get(ELEMENT_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Ok(id)
            }
            Err(BotError::Page(msg)) if msg.contains("no such element") => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn rect(&self, element_id: &str) -> BotResult<Rect> {
        let value = send(
            &self.http,
            reqwest::Method::GET,
            &self.url(&format!("/element/{element_id}/rect")),
            None,
        )?;
        serde_json::from_value(value).map_err(|e| BotError::Page(format!("bad rect payload: {e}")))
    }

    pub fn click(&self, element_id: &str) -> BotResult<()> {
        send(
            &self.http,
            reqwest::Method::POST,
            &self.url(&format!("/element/{element_id}/click")),
            Some(json!({})),
        )?;
        Ok(())
    }

    /// Dispatch a W3C pointer-action sequence.
    pub fn perform_actions(&self, actions: Value) -> BotResult<()> {
        send(
            &self.http,
            reqwest::Method::POST,
            &self.url("/actions"),
            Some(json!({ "actions": actions })),
        )?;
        Ok(())
    }

    pub fn release_actions(&self) -> BotResult<()> {
        send(
            &self.http,
            reqwest::Method::DELETE,
            &self.url("/actions"),
            None,
        )?;
        Ok(())
    }

    fn quit(&self) -> BotResult<()> {
        send(
            &self.http,
            reqwest::Method::DELETE,
            &format!("{}/session/{}", self.base, self.session_id),
            None,
        )?;
        Ok(())
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        debug!("[PAGE] Closing WebDriver session {}", self.session_id);
        let _ = self.quit();
    }
}

/// One WebDriver request; unwraps the `value` envelope and turns protocol
/// errors into `BotError::Page`.
fn send(
    http: &reqwest::blocking::Client,
    method: reqwest::Method,
    url: &str,
    body: Option<Value>,
) -> BotResult<Value> {
    let mut request = http.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request
        .send()
        .map_err(|e| BotError::Page(format!("webdriver request failed: {e}")))?;
    let status = response.status();
    let payload: Value = response
        .json()
        .map_err(|e| BotError::Page(format!("webdriver response not json: {e}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(BotError::Page(format!("{error}: {message}")));
    }
    Ok(value)
}
