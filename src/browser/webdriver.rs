use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Method, Response};
use serde_json::{Value, json};

use super::{BrowserError, BrowserSession, Cookie, ElementHandle, Selector};

/// Key under which W3C WebDriver returns element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/117 Safari/537.36";

/// Browser launch settings passed as Chrome capabilities.
#[derive(Debug, Clone)]
pub struct WebDriverOptions {
    /// Dedicated profile directory, so the default profile is never shared.
    pub user_data_dir: Option<String>,
    pub user_agent: String,
    pub start_maximized: bool,
}

impl Default for WebDriverOptions {
    fn default() -> Self {
        Self {
            user_data_dir: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            start_maximized: true,
        }
    }
}

impl WebDriverOptions {
    fn capabilities(&self) -> Value {
        let mut args = Vec::new();
        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={dir}"));
        }
        if self.start_maximized {
            args.push("--start-maximized".to_string());
        }
        args.push(format!("--user-agent={}", self.user_agent));
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        })
    }
}

/// A live W3C WebDriver session (chromedriver, geckodriver, Selenium grid).
pub struct WebDriverClient {
    client: Client,
    base_url: String,
    session_id: String,
    // Window handles to return to, innermost last.
    origins: Mutex<Vec<String>>,
}

impl WebDriverClient {
    /// Creates a new session on the WebDriver listening at `base_url`.
    pub async fn start(base_url: &str, options: &WebDriverOptions) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(120))
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        let response = client
            .post(format!("{base_url}/session"))
            .json(&options.capabilities())
            .send()
            .await?;
        let value = into_value(response).await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::UnexpectedResponse(format!("no sessionId in {value}")))?
            .to_string();

        tracing::info!(%session_id, "webdriver session created");
        Ok(Self {
            client,
            base_url,
            session_id,
            origins: Mutex::new(Vec::new()),
        })
    }

    #[cfg(test)]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Ends the session and closes the browser.
    pub async fn quit(self) -> Result<(), BrowserError> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base_url, self.session_id))
            .send()
            .await?;
        into_value(response).await?;
        tracing::info!(session_id = %self.session_id, "webdriver session closed");
        Ok(())
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}{}", self.base_url, self.session_id, path);
        let mut request = self.client.request(method.clone(), &url);
        request = match body {
            Some(body) => request.json(&body),
            None if method == Method::POST => request.json(&json!({})),
            None => request,
        };
        into_value(request.send().await?).await
    }

    async fn execute(&self, script: &str) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    async fn element_bool(&self, element: &ElementHandle, property: &str) -> Result<bool, BrowserError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/{property}", element.0), None)
            .await?;
        value
            .as_bool()
            .ok_or_else(|| BrowserError::UnexpectedResponse(format!("{property}: {value}")))
    }

    async fn switch_to(&self, handle: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "/window", Some(json!({ "handle": handle })))
            .await
            .map(drop)
    }

    /// Best-effort close of a tab that never became a context.
    async fn discard_tab(&self, handle: &str, origin: &str) {
        let result = async {
            self.switch_to(handle).await?;
            self.command(Method::DELETE, "/window", None).await?;
            self.switch_to(origin).await
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(tab = handle, error = %err, "could not close tab after failed switch");
            if let Err(err) = self.switch_to(origin).await {
                tracing::warn!(error = %err, "could not return to the original tab");
            }
        }
    }

    fn lock_origins(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.origins.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Unwraps the `value` member of a WebDriver response, mapping error payloads.
async fn into_value(response: Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let body = response.text().await?;
    let payload: Value = serde_json::from_str(&body)
        .map_err(|_| BrowserError::UnexpectedResponse(format!("status {status}: {body}")))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);

    if !status.is_success() {
        let field = |name: &str| {
            value
                .get(name)
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string()
        };
        return Err(BrowserError::Protocol {
            status: status.as_u16(),
            error: field("error"),
            message: field("message"),
        });
    }
    Ok(value)
}

fn parse_elements(value: Value) -> Result<Vec<ElementHandle>, BrowserError> {
    let Value::Array(items) = value else {
        return Err(BrowserError::UnexpectedResponse(format!(
            "expected element list, got {value}"
        )));
    };
    items
        .iter()
        .map(|item| {
            item.get(ELEMENT_KEY)
                .and_then(Value::as_str)
                .map(|id| ElementHandle(id.to_string()))
                .ok_or_else(|| BrowserError::UnexpectedResponse(format!("bad element {item}")))
        })
        .collect()
}

fn locator(selector: &Selector) -> Value {
    json!({ "using": selector.strategy(), "value": selector.value() })
}

impl BrowserSession for WebDriverClient {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await
            .map(drop)
    }

    async fn refresh(&self) -> Result<(), BrowserError> {
        self.command(Method::POST, "/refresh", None).await.map(drop)
    }

    async fn find_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>, BrowserError> {
        let value = self
            .command(Method::POST, "/elements", Some(locator(selector)))
            .await?;
        parse_elements(value)
    }

    async fn find_within(
        &self,
        parent: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let value = self
            .command(
                Method::POST,
                &format!("/element/{}/elements", parent.0),
                Some(locator(selector)),
            )
            .await?;
        parse_elements(value)
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, BrowserError> {
        let value = self
            .command(Method::GET, &format!("/element/{}/text", element.0), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let value = self
            .command(
                Method::GET,
                &format!("/element/{}/attribute/{name}", element.0),
                None,
            )
            .await?;
        Ok(match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        })
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_bool(element, "displayed").await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_bool(element, "enabled").await
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, BrowserError> {
        self.element_bool(element, "selected").await
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.command(Method::POST, &format!("/element/{}/click", element.0), None)
            .await
            .map(drop)
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.command(Method::POST, &format!("/element/{}/clear", element.0), None)
            .await
            .map(drop)
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), BrowserError> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element.0),
            Some(json!({ "text": text })),
        )
        .await
        .map(drop)
    }

    async fn page_text(&self) -> Result<String, BrowserError> {
        let value = self
            .execute("return document.body ? document.body.innerText : '';")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn open_context(&self, url: &str) -> Result<(), BrowserError> {
        let current = self.command(Method::GET, "/window", None).await?;
        let origin = current
            .as_str()
            .ok_or_else(|| BrowserError::UnexpectedResponse(format!("window handle: {current}")))?
            .to_string();

        let created = self
            .command(Method::POST, "/window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = created
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::UnexpectedResponse(format!("new window: {created}")))?
            .to_string();

        if let Err(err) = self.switch_to(&handle).await {
            self.discard_tab(&handle, &origin).await;
            return Err(err);
        }
        self.lock_origins().push(origin);
        if let Err(err) = self.navigate(url).await {
            if let Err(cleanup) = self.close_context().await {
                tracing::warn!(error = %cleanup, "could not close tab after failed navigation");
            }
            return Err(err);
        }
        Ok(())
    }

    /// Switches back to the origin even when closing the tab fails; the
    /// close error is reported after the switch.
    async fn close_context(&self) -> Result<(), BrowserError> {
        let closed = self.command(Method::DELETE, "/window", None).await;
        let fallback = closed.as_ref().ok().and_then(|remaining| {
            remaining
                .as_array()
                .and_then(|handles| handles.first())
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        let popped = self.lock_origins().pop();
        let Some(origin) = popped.or(fallback) else {
            return closed.and_then(|_| Err(BrowserError::UnexpectedResponse("no window left".into())));
        };
        self.switch_to(&origin).await?;
        closed.map(drop)
    }

    async fn scroll_to_bottom(&self) -> Result<(), BrowserError> {
        self.execute("window.scrollTo(0, document.body.scrollHeight);")
            .await
            .map(drop)
    }

    async fn cookies(&self) -> Result<Vec<Cookie>, BrowserError> {
        let value = self.command(Method::GET, "/cookie", None).await?;
        serde_json::from_value(value)
            .map_err(|err| BrowserError::UnexpectedResponse(format!("cookies: {err}")))
    }

    async fn add_cookie(&self, cookie: &Cookie) -> Result<(), BrowserError> {
        self.command(Method::POST, "/cookie", Some(json!({ "cookie": cookie })))
            .await
            .map(drop)
    }
}
