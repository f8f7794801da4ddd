use std::time::Duration;

use dialoguer::Input;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How long the schedule table gets to show up once the user is ready
pub const TABLE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Every WebDriver answer is wrapped in a `value`
#[derive(Debug, Deserialize)]
struct Reply<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
struct NewSession {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Browser driven through a W3C WebDriver server
pub struct Session {
    client: reqwest::Client,
    base: String,
    id: String,
}

impl Session {
    /// Launch a visible browser
    pub async fn start(webdriver_url: &str, user_agent: &str) -> Result<Self> {
        // Use custom User-Agent
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .no_proxy()
            .build()?;
        let base = webdriver_url.trim_end_matches('/').to_owned();

        let capabilities = json!({ "capabilities": { "alwaysMatch": {} } });
        let response = client
            .post(format!("{base}/session"))
            .json(&capabilities)
            .send()
            .await?;
        let session: Reply<NewSession> = read(response).await?;
        debug!(id = session.value.session_id, "webdriver session started");

        Ok(Self {
            client,
            base,
            id: session.value.session_id,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/session/{}/{endpoint}", self.base, self.id)
    }

    /// Navigate to `url`
    pub async fn goto(&self, url: &str) -> Result<()> {
        let response = self
            .client
            .post(self.url("url"))
            .json(&json!({ "url": url }))
            .send()
            .await?;
        read::<Value>(response).await.map(drop)
    }

    /// Whether an element matching the CSS `selector` is in the page
    pub async fn has_element(&self, selector: &str) -> Result<bool> {
        let response = self
            .client
            .post(self.url("element"))
            .json(&json!({ "using": "css selector", "value": selector }))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        read::<Value>(response).await.map(|_| true)
    }

    /// Poll until `selector` matches or `timeout` elapses, `false` on timeout
    pub async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let poll = async {
            loop {
                if self.has_element(selector).await? {
                    return Ok::<(), Error>(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(found) => found.map(|()| true),
            Err(_) => Ok(false),
        }
    }

    /// Rendered HTML of the current page
    pub async fn source(&self) -> Result<String> {
        let response = self.client.get(self.url("source")).send().await?;
        let source: Reply<String> = read(response).await?;

        Ok(source.value)
    }

    /// Close the browser
    pub async fn close(self) -> Result<()> {
        let response = self
            .client
            .delete(format!("{}/session/{}", self.base, self.id))
            .send()
            .await?;
        read::<Value>(response).await.map(drop)
    }
}

/// Decode a WebDriver reply, turning its error payload into an [`Error`]
async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body
            .pointer("/value/message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(Error::WebDriver(format!("{status}: {message}")));
    }

    serde_json::from_value(body).map_err(|e| Error::WebDriver(e.to_string()))
}

/// Open `url`, let the user log in and reach the schedule, then grab the page
pub async fn fetch(webdriver_url: &str, url: &str, table_id: &str, user_agent: &str) -> Result<String> {
    capture(webdriver_url, url, table_id, user_agent, wait_for_user).await
}

/// Block until the user says the schedule is on screen
fn wait_for_user() -> Result<()> {
    Input::<String>::new()
        .with_prompt("Press ENTER when your schedule is fully loaded")
        .allow_empty(true)
        .interact_text()?;

    Ok(())
}

/// Drive one browser session, `ready` returns once the page can be read.
/// The session is closed whatever happens after it started.
async fn capture<F>(webdriver_url: &str, url: &str, table_id: &str, user_agent: &str, ready: F) -> Result<String>
where
    F: FnOnce() -> Result<()>,
{
    let session = Session::start(webdriver_url, user_agent).await?;

    let html = async {
        session.goto(url).await?;
        ready()?;

        // Wait for table to stabilize
        match session.wait_for(&format!("#{table_id}"), TABLE_TIMEOUT).await {
            Ok(true) => (),
            Ok(false) => println!("Table not found, proceeding anyway..."),
            Err(e) => {
                warn!(%e, "waiting for the table failed");
                println!("Table not found, proceeding anyway...");
            }
        }

        session.source().await
    }
    .await;

    if let Err(e) = session.close().await {
        warn!(%e, "browser not closed cleanly");
    }

    html
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use axum::{
        http::StatusCode,
        routing::{delete, get, post},
        Json, Router,
    };

    use super::*;

    const PAGE: &str = "<html><body><table id=\"tableStudentSchedMatrix\"></table></body></html>";

    /// Answers of a fake WebDriver server, per endpoint
    #[derive(Clone, Copy)]
    struct Driver {
        url: StatusCode,
        element: StatusCode,
        source: StatusCode,
    }

    impl Default for Driver {
        fn default() -> Self {
            Self {
                url: StatusCode::OK,
                element: StatusCode::OK,
                source: StatusCode::OK,
            }
        }
    }

    fn reply(status: StatusCode, value: Value) -> (StatusCode, Json<Value>) {
        if status.is_success() {
            (status, Json(json!({ "value": value })))
        } else {
            let error = json!({ "error": "unknown error", "message": "boom", "stacktrace": "" });
            (status, Json(json!({ "value": error })))
        }
    }

    /// Serve `driver` on a random port, returns its URL and the count of closed sessions
    async fn serve(driver: Driver) -> (String, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&closed);

        let app = Router::new()
            .route(
                "/session",
                post(|| async { reply(StatusCode::OK, json!({ "sessionId": "s1", "capabilities": {} })) }),
            )
            .route(
                "/session/:id/url",
                post(move || async move { reply(driver.url, Value::Null) }),
            )
            .route(
                "/session/:id/element",
                post(move || async move {
                    reply(driver.element, json!({ "element-6066-11e4-a52e-4f735466cecf": "e1" }))
                }),
            )
            .route(
                "/session/:id/source",
                get(move || async move { reply(driver.source, json!(PAGE)) }),
            )
            .route(
                "/session/:id",
                delete(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    reply(StatusCode::OK, Value::Null)
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        (format!("http://{addr}"), closed)
    }

    async fn run(driver: Driver, ready: impl FnOnce() -> Result<()>) -> (Result<String>, usize) {
        let (base, closed) = serve(driver).await;
        let html = capture(&base, "https://example.org/schedule", "tableStudentSchedMatrix", "ps2ics/test", ready).await;
        (html, closed.load(Ordering::SeqCst))
    }

    #[test]
    fn session_reply() {
        let raw = r#"{"value":{"sessionId":"4f2a","capabilities":{"browserName":"chrome"}}}"#;
        let reply: Reply<NewSession> = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.value.session_id, "4f2a");
    }

    #[test]
    fn source_reply() {
        let raw = r#"{"value":"<html><body></body></html>"}"#;
        let reply: Reply<String> = serde_json::from_str(raw).unwrap();
        assert_eq!(reply.value, "<html><body></body></html>");
    }

    #[tokio::test]
    async fn page_is_read_and_session_closed() {
        let (html, closed) = run(Driver::default(), || Ok(())).await;
        assert_eq!(html.unwrap(), PAGE);
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn failing_table_wait_still_reads_the_page() {
        let driver = Driver {
            element: StatusCode::INTERNAL_SERVER_ERROR,
            ..Driver::default()
        };

        let (html, closed) = run(driver, || Ok(())).await;
        assert_eq!(html.unwrap(), PAGE);
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn missing_table_times_out_quietly() {
        let (base, _) = serve(Driver {
            element: StatusCode::NOT_FOUND,
            ..Driver::default()
        })
        .await;

        let session = Session::start(&base, "ps2ics/test").await.unwrap();
        let found = session
            .wait_for("#tableStudentSchedMatrix", Duration::from_millis(100))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn session_closed_when_navigation_fails() {
        let driver = Driver {
            url: StatusCode::INTERNAL_SERVER_ERROR,
            ..Driver::default()
        };

        let (html, closed) = run(driver, || Ok(())).await;
        assert!(matches!(html, Err(Error::WebDriver(_))));
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn session_closed_when_the_user_aborts() {
        let ready = || Err(Error::Io(std::io::Error::other("stdin closed")));

        let (html, closed) = run(Driver::default(), ready).await;
        assert!(matches!(html, Err(Error::Io(_))));
        assert_eq!(closed, 1);
    }

    #[tokio::test]
    async fn session_closed_when_the_source_is_unreadable() {
        let driver = Driver {
            source: StatusCode::INTERNAL_SERVER_ERROR,
            ..Driver::default()
        };

        let (html, closed) = run(driver, || Ok(())).await;
        assert!(matches!(html, Err(Error::WebDriver(_))));
        assert_eq!(closed, 1);
    }
}
