//! End-to-end checks against a local HTTP responder.
//!
//! Drives `HealthCheck` through the real `HttpTransport` so candidate
//! fallback, extraction, and diffing are exercised over actual sockets.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use deploywatch_core::{ChangeKind, ChangeRecord, DeploymentStatus, MonitorConfig, Severity};
use deploywatch_health::alert::render;
use deploywatch_health::{
    HealthCheck, HealthIssue, HttpTransport, LogSink, Notifier, WebhookNotifier,
};

/// Serve whatever `page` currently holds to every request.
async fn serve(page: Arc<Mutex<String>>) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let body = page.lock().unwrap().clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 200 OK\r\ncontent-type: text/html\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/"), handle)
}

/// Accept webhook POSTs, record each request body, and answer with `status`.
async fn capture_hook(status: u16) -> (String, Arc<Mutex<Vec<String>>>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let received = bodies.clone();

    let handle = tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                break;
            };
            let received = received.clone();
            tokio::spawn(async move {
                let body = read_request_body(&mut stream).await;
                received.lock().unwrap().push(body);
                let response = format!(
                    "HTTP/1.1 {status} Hook\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (format!("http://{addr}/hook"), bodies, handle)
}

/// Read one request and return its body, sized by `content-length`.
async fn read_request_body(stream: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = stream.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&raw);
        let Some(split) = text.find("\r\n\r\n") else {
            continue;
        };
        let length = text[..split]
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, value)| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if raw.len() >= split + 4 + length {
            return String::from_utf8_lossy(&raw[split + 4..split + 4 + length]).into_owned();
        }
    }
    String::new()
}

fn monitor(candidates: Vec<String>, dir: &std::path::Path) -> HealthCheck {
    let mut config = MonitorConfig::new("local-site");
    config.candidates = candidates;
    config.log_file = Some(dir.join("monitor.log"));
    config.request_timeout = Duration::from_secs(2);

    let transport = HttpTransport::new(config.request_timeout).unwrap();
    let sink = LogSink::open(config.log_file.as_deref())
        .unwrap()
        .without_echo();
    HealthCheck::with_parts(config, Arc::new(transport), Arc::new(sink)).unwrap()
}

fn log_lines(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("monitor.log"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn falls_back_to_live_candidate_and_passes_one_shot() {
    let page = Arc::new(Mutex::new(
        "<html><title>The Real Mermaids</title><h1>Chapter 1</h1></html>".to_string(),
    ));
    let (url, server) = serve(page).await;
    let dir = tempfile::tempdir().unwrap();

    let mut check = monitor(vec!["http://127.0.0.1:1/".to_string(), url.clone()], dir.path());
    let verdict = check.run_once().await;

    assert!(verdict.is_healthy(), "issues: {:?}", verdict.issues);
    let snapshot = check.last_known().unwrap();
    assert_eq!(snapshot.status, DeploymentStatus::Ready);
    assert_eq!(snapshot.url.as_deref(), Some(url.as_str()));

    let lines = log_lines(dir.path());
    assert!(lines.iter().any(|l| l.contains("[WARN] Failed to check http://127.0.0.1:1/")));
    assert!(lines.iter().any(|l| l.contains("Deployment is healthy")));

    server.abort();
}

#[tokio::test]
async fn legacy_page_fails_one_shot() {
    let page = Arc::new(Mutex::new(
        "<html><title>Home</title><h1>Create Amazing Stories</h1></html>".to_string(),
    ));
    let (url, server) = serve(page).await;
    let dir = tempfile::tempdir().unwrap();

    let mut check = monitor(vec![url], dir.path());
    let verdict = check.run_once().await;

    assert_eq!(
        verdict.issues,
        vec![HealthIssue::MissingContent, HealthIssue::LegacyDesign]
    );
    assert_eq!(verdict.exit_code(), 1);

    server.abort();
}

#[tokio::test]
async fn detects_rollback_then_outage() {
    let page = Arc::new(Mutex::new(
        "<h1>Meet Raquel</h1><p>Interactive Book</p>".to_string(),
    ));
    let (url, server) = serve(page.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut check = monitor(vec![url], dir.path());

    let baseline = check.run_cycle().await;
    assert!(baseline.changes.is_empty());

    *page.lock().unwrap() = "<h1>Create Amazing Stories</h1>".to_string();
    let rollback = check.run_cycle().await;
    let design = rollback
        .changes
        .iter()
        .find(|c| c.kind == ChangeKind::DesignChange)
        .expect("design change");
    assert_eq!(design.severity, Severity::High);
    assert_eq!(design.to, "old");

    server.abort();
    let _ = server.await;

    let outage = check.run_cycle().await;
    assert_eq!(outage.snapshot.status, DeploymentStatus::Error);
    assert_eq!(outage.changes.len(), 1);
    assert_eq!(outage.changes[0].kind, ChangeKind::StatusChange);
    assert_eq!(outage.changes[0].severity, Severity::High);

    let lines = log_lines(dir.path());
    assert!(lines.iter().any(|l| l.contains("OLD DESIGN DETECTED!")));
    assert!(
        lines
            .iter()
            .any(|l| l.contains("[WARN] DEPLOYMENT STATUS CHANGED: ready -> error"))
    );
}

#[tokio::test]
async fn webhook_posts_rendered_text_and_record() {
    let (hook_url, bodies, hook) = capture_hook(200).await;
    let notifier = WebhookNotifier::new(hook_url, Duration::from_secs(2)).unwrap();
    let record = ChangeRecord::design(true, false);

    notifier.notify(&record).await.unwrap();

    let bodies = bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(payload["text"], render(&record));
    assert_eq!(payload["text"], "DESIGN CHANGED: modern -> old OLD DESIGN DETECTED!");
    assert_eq!(payload["change"]["kind"], "design_change");
    assert_eq!(payload["change"]["severity"], "high");

    hook.abort();
}

#[tokio::test]
async fn rejected_webhook_is_logged_and_cycle_continues() {
    let page = Arc::new(Mutex::new(
        "<h1>Meet Raquel</h1><p>Interactive Book</p>".to_string(),
    ));
    let (site_url, server) = serve(page.clone()).await;
    let (hook_url, bodies, hook) = capture_hook(500).await;
    let dir = tempfile::tempdir().unwrap();

    let mut config = MonitorConfig::new("local-site");
    config.candidates = vec![site_url];
    config.log_file = Some(dir.path().join("monitor.log"));
    config.request_timeout = Duration::from_secs(2);
    config.notify.webhook_url = Some(hook_url);
    let mut check = HealthCheck::new(config).unwrap();

    let baseline = check.run_cycle().await;
    assert!(baseline.changes.is_empty());
    assert!(bodies.lock().unwrap().is_empty());

    *page.lock().unwrap() = "<h1>Create Amazing Stories</h1>".to_string();
    let rollback = check.run_cycle().await;
    assert_eq!(rollback.changes.len(), 2);
    assert_eq!(bodies.lock().unwrap().len(), 2);

    let lines = log_lines(dir.path());
    let failures: Vec<_> = lines
        .iter()
        .filter(|l| l.contains("[ERROR] Notifier webhook failed: rejected with status 500"))
        .collect();
    assert_eq!(failures.len(), 2);
    assert!(lines.iter().any(|l| l.contains("OLD DESIGN DETECTED!")));

    server.abort();
    hook.abort();
}
