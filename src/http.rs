use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub(crate) struct HttpSettings {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) retry_delay: Duration,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(30),
            attempts: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum HttpError {
    #[error("{}", describe_status(*status, body, *attempts))]
    Status {
        status: u16,
        body: String,
        attempts: usize,
    },
    #[error("request failed after {attempts} attempt(s): transport error: {detail}")]
    Transport { detail: String, attempts: usize },
    #[error("request failed: response decode failed: {0}")]
    Decode(String),
}

impl HttpError {
    pub(crate) fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

fn describe_status(status: u16, body: &str, attempts: usize) -> String {
    let status_error = if body.is_empty() {
        format!("HTTP status {status}")
    } else {
        format!("HTTP status {status} ({body})")
    };
    if attempts > 1 {
        format!("request failed after {attempts} attempt(s): {status_error}")
    } else {
        format!("request failed: {status_error}")
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

fn truncated_body(response: ureq::Response) -> String {
    let response_body = response.into_string().ok().unwrap_or_default();
    response_body.trim().chars().take(240).collect::<String>()
}

fn build_agent(settings: &HttpSettings) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(settings.connect_timeout)
        .timeout_read(settings.read_timeout)
        .timeout_write(settings.read_timeout)
        .build()
}

pub(crate) fn get_text_with_retries(
    url: &str,
    headers: &[(String, String)],
    query: &[(String, String)],
    settings: &HttpSettings,
) -> Result<String, HttpError> {
    let attempts = settings.attempts.max(1);

    for attempt in 1..=attempts {
        let agent = build_agent(settings);
        let mut request = agent.get(url);
        for (key, value) in headers {
            request = request.set(key, value);
        }
        for (key, value) in query {
            request = request.query(key, value);
        }

        debug!(url, attempt, "GET");
        match request.call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| HttpError::Decode(err.to_string()));
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = truncated_body(response);
                if should_retry_http_status(status) && attempt < attempts {
                    warn!(url, status, attempt, "retryable HTTP status, retrying");
                    thread::sleep(settings.retry_delay);
                    continue;
                }

                let attempts = if should_retry_http_status(status) {
                    attempts
                } else {
                    1
                };
                return Err(HttpError::Status {
                    status,
                    body,
                    attempts,
                });
            }
            Err(ureq::Error::Transport(err)) => {
                if attempt < attempts {
                    warn!(url, attempt, error = %err, "transport error, retrying");
                    thread::sleep(settings.retry_delay);
                    continue;
                }
                return Err(HttpError::Transport {
                    detail: err.to_string(),
                    attempts,
                });
            }
        }
    }

    Err(HttpError::Transport {
        detail: "exhausted attempts without a concrete error".to_string(),
        attempts,
    })
}

/// Sends a single POST. Never retried: the remote may already have applied it.
pub(crate) fn post_json(
    url: &str,
    headers: &[(String, String)],
    body: &str,
    settings: &HttpSettings,
) -> Result<(u16, String), HttpError> {
    let agent = build_agent(settings);
    let mut request = agent.post(url).set("Content-Type", "application/json");
    for (key, value) in headers {
        request = request.set(key, value);
    }

    debug!(url, bytes = body.len(), "POST");
    match request.send_string(body) {
        Ok(response) => {
            let status = response.status();
            let text = response
                .into_string()
                .map_err(|err| HttpError::Decode(err.to_string()))?;
            Ok((status, text))
        }
        Err(ureq::Error::Status(status, response)) => Err(HttpError::Status {
            status,
            body: truncated_body(response),
            attempts: 1,
        }),
        Err(ureq::Error::Transport(err)) => Err(HttpError::Transport {
            detail: err.to_string(),
            attempts: 1,
        }),
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    use std::collections::VecDeque;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone)]
    pub(crate) enum Behavior {
        Respond(u16, String),
        DelayRespond(Duration, u16, String),
    }

    #[derive(Debug)]
    pub(crate) struct TestServer {
        pub(crate) base_url: String,
        requests: Arc<AtomicUsize>,
        request_lines: Arc<Mutex<Vec<String>>>,
        shutdown_tx: mpsc::Sender<()>,
        join_handle: Option<std::thread::JoinHandle<()>>,
    }

    impl TestServer {
        pub(crate) fn spawn(behaviors: Vec<Behavior>) -> Self {
            let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind test server");
            listener.set_nonblocking(true).expect("set nonblocking");
            let addr = listener.local_addr().expect("local addr");

            let requests = Arc::new(AtomicUsize::new(0));
            let requests_clone = Arc::clone(&requests);
            let request_lines = Arc::new(Mutex::new(Vec::new()));
            let request_lines_clone = Arc::clone(&request_lines);
            let shared_behaviors = Arc::new(Mutex::new(VecDeque::from(behaviors)));
            let behaviors_clone = Arc::clone(&shared_behaviors);
            let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

            let join_handle = std::thread::spawn(move || {
                loop {
                    if shutdown_rx.try_recv().is_ok() {
                        break;
                    }

                    match listener.accept() {
                        Ok((mut stream, _)) => {
                            requests_clone.fetch_add(1, Ordering::SeqCst);
                            let behavior = {
                                let mut queue = behaviors_clone.lock().expect("lock behaviors");
                                queue.pop_front().unwrap_or_else(|| {
                                    Behavior::Respond(200, "default-ok".to_string())
                                })
                            };
                            let lines = Arc::clone(&request_lines_clone);
                            std::thread::spawn(move || {
                                if let Ok(head) = consume_request(&mut stream) {
                                    lines.lock().expect("lock request lines").push(head);
                                }
                                serve_behavior(&mut stream, behavior);
                            });
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            std::thread::sleep(Duration::from_millis(5));
                        }
                        Err(_) => break,
                    }
                }
            });

            Self {
                base_url: format!("http://{addr}"),
                requests,
                request_lines,
                shutdown_tx,
                join_handle: Some(join_handle),
            }
        }

        pub(crate) fn request_count(&self) -> usize {
            self.requests.load(Ordering::SeqCst)
        }

        /// First line of every request received so far, e.g. `GET /path?x=1 HTTP/1.1`.
        pub(crate) fn request_lines(&self) -> Vec<String> {
            self.request_lines
                .lock()
                .expect("lock request lines")
                .clone()
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            let _ = self.shutdown_tx.send(());
            if let Some(handle) = self.join_handle.take() {
                let _ = handle.join();
            }
        }
    }

    fn consume_request(stream: &mut TcpStream) -> std::io::Result<String> {
        stream.set_read_timeout(Some(Duration::from_millis(200)))?;
        let mut buf = [0_u8; 1024];
        let mut data = Vec::new();
        let mut expected_len = None;
        loop {
            if let Some(total) = expected_len
                && data.len() >= total
            {
                break;
            }
            match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(read) => {
                    data.extend_from_slice(&buf[..read]);
                    if expected_len.is_none()
                        && let Some(end) = data.windows(4).position(|window| window == b"\r\n\r\n")
                    {
                        expected_len = Some(end + 4 + content_length(&data[..end]));
                    }
                }
                Err(err)
                    if err.kind() == std::io::ErrorKind::WouldBlock
                        || err.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        let text = String::from_utf8_lossy(&data);
        Ok(text.lines().next().unwrap_or_default().to_string())
    }

    fn content_length(head: &[u8]) -> usize {
        String::from_utf8_lossy(head)
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse().ok())
            .unwrap_or(0)
    }

    fn reason_phrase(status: u16) -> &'static str {
        match status {
            200 => "OK",
            201 => "Created",
            400 => "Bad Request",
            401 => "Unauthorized",
            404 => "Not Found",
            408 => "Request Timeout",
            429 => "Too Many Requests",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Status",
        }
    }

    fn serve_behavior(stream: &mut TcpStream, behavior: Behavior) {
        match behavior {
            Behavior::Respond(status, body) => {
                let _ = write_response(stream, status, &body);
            }
            Behavior::DelayRespond(delay, status, body) => {
                std::thread::sleep(delay);
                let _ = write_response(stream, status, &body);
            }
        }
    }

    fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
        let reason = reason_phrase(status);
        let payload = body.as_bytes();
        write!(
            stream,
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            payload.len()
        )?;
        stream.write_all(payload)?;
        stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::test_server::{Behavior, TestServer};
    use super::*;

    fn fast_settings(attempts: usize) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(200),
            attempts,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[test]
    fn retries_retryable_statuses_until_success() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(500, "server-error".to_string()),
            Behavior::Respond(429, "throttled".to_string()),
            Behavior::Respond(200, "ok".to_string()),
        ]);
        let query = vec![("limit".to_string(), "10".to_string())];

        let result = get_text_with_retries(&server.base_url, &[], &query, &fast_settings(3));

        assert_eq!(result.expect("should eventually succeed"), "ok");
        assert_eq!(server.request_count(), 3);
    }

    #[test]
    fn does_not_retry_hard_client_errors() {
        let server = TestServer::spawn(vec![Behavior::Respond(404, "not-found".to_string())]);

        let result = get_text_with_retries(&server.base_url, &[], &[], &fast_settings(5));

        let err = result.expect_err("404 should not be retried");
        let message = err.to_string();
        assert!(
            message.contains("HTTP status 404"),
            "unexpected error message: {message}"
        );
        assert!(!err.is_unauthorized());
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn unauthorized_status_is_flagged() {
        let server = TestServer::spawn(vec![Behavior::Respond(401, String::new())]);

        let err = get_text_with_retries(&server.base_url, &[], &[], &fast_settings(3))
            .expect_err("401 should fail");

        assert!(err.is_unauthorized());
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn retries_transport_timeout_and_recovers() {
        let server = TestServer::spawn(vec![
            Behavior::DelayRespond(Duration::from_millis(120), 200, "slow".to_string()),
            Behavior::Respond(200, "ok".to_string()),
        ]);
        let settings = HttpSettings {
            connect_timeout: Duration::from_millis(250),
            read_timeout: Duration::from_millis(20),
            attempts: 2,
            retry_delay: Duration::from_millis(1),
        };

        let result = get_text_with_retries(&server.base_url, &[], &[], &settings);

        assert_eq!(result.expect("timeout should be retried"), "ok");
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn returns_retry_exhausted_error_for_retryable_status() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(503, "down".to_string()),
            Behavior::Respond(503, "still-down".to_string()),
        ]);

        let result = get_text_with_retries(&server.base_url, &[], &[], &fast_settings(2));

        let message = result
            .expect_err("retryable failures should eventually error")
            .to_string();
        assert!(
            message.contains("after 2 attempt(s)") && message.contains("HTTP status 503"),
            "unexpected error message: {message}"
        );
        assert_eq!(server.request_count(), 2);
    }

    #[test]
    fn post_is_sent_exactly_once_even_on_server_error() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(503, "down".to_string()),
            Behavior::Respond(201, "{}".to_string()),
        ]);

        let result = post_json(&server.base_url, &[], "{}", &fast_settings(3));

        let message = result.expect_err("503 should surface").to_string();
        assert!(message.contains("HTTP status 503"), "{message}");
        assert_eq!(server.request_count(), 1);
    }

    #[test]
    fn post_returns_status_and_body() {
        let server = TestServer::spawn(vec![Behavior::Respond(201, "{\"added\":{}}".to_string())]);

        let (status, body) =
            post_json(&server.base_url, &[], "{}", &fast_settings(1)).expect("post succeeds");

        assert_eq!(status, 201);
        assert_eq!(body, "{\"added\":{}}");
    }
}
