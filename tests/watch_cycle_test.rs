use chrono::{DateTime, Local, TimeZone};
use httpmock::prelude::*;
use menu_watch::core::scheduler::{FetchFailurePolicy, SchedulerOptions};
use menu_watch::core::{Availability, Clock, Delivery, Sleeper};
use menu_watch::utils::validation::Validate;
use menu_watch::{
    GmailMailer, MenuPageSource, Notifier, Scheduler, SchedulerState, Settings,
    StoredTokenProvider, TokenStore, WatchEngine, WatchError,
};
use reqwest::Client;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{NamedTempFile, TempDir};
use tokio_test::{assert_err, assert_ok};

const MENU_PATH: &str = "/takeaway/online-menu/";
const SEND_PATH: &str = "/gmail/v1/users/me/messages/send";

fn menu_page(menu_json: &str) -> String {
    format!(
        r#"<html><body><script id="__NEXT_DATA__" type="application/json">{{"props":{{"app":{{"menu":{}}}}}}}</script></body></html>"#,
        menu_json
    )
}

const MENU: &str = r#"[
    {"name": "Pierogi ruskie", "attributes": []},
    {"name": "Pierogi z mięsem", "attributes": ["SOLD_OUT"]},
    {"name": "Barszcz czerwony", "attributes": ["VEGE"]}
]"#;

fn write_settings(menu_url: &str, checklist: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let settings = serde_json::json!({
        "checklist": checklist,
        "recipient": "jan@example.com",
        "menu_url": menu_url
    });
    write!(file, "{}", settings).unwrap();
    file
}

fn write_token(dir: &TempDir) -> TokenStore {
    let path = dir.path().join("token.json");
    let token = serde_json::json!({
        "token": "ya29.stored",
        "refresh_token": "1//refresh",
        "client_id": "123.apps.googleusercontent.com",
        "client_secret": "GOCSPX-secret",
        "expiry": "2999-01-01T00:00:00Z"
    });
    std::fs::write(&path, token.to_string()).unwrap();
    TokenStore::new(path)
}

type Engine = WatchEngine<MenuPageSource, GmailMailer<StoredTokenProvider>>;

/// Wire the engine the same way the binary does, against mock servers.
fn build_engine(server: &MockServer, settings_file: &NamedTempFile, dir: &TempDir) -> Engine {
    let settings = Settings::from_file(settings_file.path()).unwrap();
    settings.validate().unwrap();

    let client = Client::new();
    let source = MenuPageSource::new(client.clone(), settings.menu_url.clone());
    let credentials = StoredTokenProvider::new(write_token(dir), client.clone());
    let mailer = GmailMailer::with_api_base(client, credentials, server.base_url());
    let notifier = Notifier::new(mailer, settings.recipient().unwrap().to_string());
    WatchEngine::new(source, settings.checklist_terms(), notifier).unwrap()
}

#[tokio::test]
async fn test_available_item_sends_report() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(MENU_PATH);
            then.status(200).body(menu_page(MENU));
        })
        .await;
    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(SEND_PATH)
                .header("authorization", "Bearer ya29.stored");
            then.status(200).json_body(serde_json::json!({"id": "msg-1"}));
        })
        .await;

    let settings = write_settings(&server.url(MENU_PATH), &["pierogi ruskie", "z mięsem"]);
    let engine = build_engine(&server, &settings, &dir);

    let outcome = assert_ok!(engine.run_cycle(false).await);

    send_mock.assert_async().await;
    assert!(outcome.result.notify);
    assert_eq!(
        outcome.result.report.get("Pierogi ruskie"),
        Some(Availability::Available)
    );
    assert_eq!(
        outcome.result.report.get("Pierogi z mięsem"),
        Some(Availability::SoldOut)
    );
    assert_eq!(
        outcome.delivery,
        Delivery::Sent {
            message_id: "msg-1".to_string()
        }
    );
}

#[tokio::test]
async fn test_only_sold_out_items_skip_mail() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(MENU_PATH);
            then.status(200).body(menu_page(MENU));
        })
        .await;
    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(200).json_body(serde_json::json!({"id": "never"}));
        })
        .await;

    let settings = write_settings(&server.url(MENU_PATH), &["MIĘSEM"]);
    let engine = build_engine(&server, &settings, &dir);

    let outcome = engine.run_cycle(false).await.unwrap();

    send_mock.assert_hits_async(0).await;
    assert!(!outcome.result.notify);
    assert_eq!(outcome.delivery, Delivery::Skipped);
}

#[tokio::test]
async fn test_force_sends_not_found_report() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(MENU_PATH);
            then.status(200).body(menu_page(MENU));
        })
        .await;
    let send_mock = server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH).body_contains("\"raw\"");
            then.status(200).json_body(serde_json::json!({"id": "msg-forced"}));
        })
        .await;

    let settings = write_settings(&server.url(MENU_PATH), &["vareniki"]);
    let engine = build_engine(&server, &settings, &dir);

    let outcome = engine.run_cycle(true).await.unwrap();

    send_mock.assert_async().await;
    assert_eq!(
        outcome.result.report.get("vareniki"),
        Some(Availability::NotFound)
    );
    assert_eq!(
        outcome.delivery,
        Delivery::Sent {
            message_id: "msg-forced".to_string()
        }
    );
}

#[tokio::test]
async fn test_mail_failure_does_not_fail_cycle() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(MENU_PATH);
            then.status(200).body(menu_page(MENU));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path(SEND_PATH);
            then.status(500).body("backend error");
        })
        .await;

    let settings = write_settings(&server.url(MENU_PATH), &["barszcz"]);
    let engine = build_engine(&server, &settings, &dir);

    let outcome = engine.run_cycle(false).await.unwrap();
    assert!(matches!(outcome.delivery, Delivery::Failed { .. }));
}

#[test]
fn test_empty_checklist_is_rejected_at_load() {
    let settings = write_settings("https://example.com/menu", &[]);
    let loaded = Settings::from_file(settings.path()).unwrap();

    let err = assert_err!(loaded.validate());
    assert!(err.to_string().contains("checklist cannot be empty!"));
}

#[derive(Clone)]
struct FakeClock(Arc<Mutex<DateTime<Local>>>);

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        *self.0.lock().unwrap()
    }
}

impl Sleeper for FakeClock {
    async fn sleep(&self, duration: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += chrono::Duration::from_std(duration).unwrap();
    }
}

#[tokio::test]
async fn test_scheduler_skips_closed_hours_and_stops_on_fetch_failure() {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start_async().await;
    let page_mock = server
        .mock_async(|when, then| {
            when.method(GET).path(MENU_PATH);
            then.status(502);
        })
        .await;

    let settings = write_settings(&server.url(MENU_PATH), &["ruskie"]);
    let engine = build_engine(&server, &settings, &dir);

    // 2024-06-03 (星期一) 09:00, 尚未營業
    let start = Local.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).single().unwrap();
    let clock = FakeClock(Arc::new(Mutex::new(start)));
    let mut scheduler = Scheduler::new(
        engine,
        clock.clone(),
        clock.clone(),
        Default::default(),
        SchedulerOptions::from_hours(1, false, FetchFailurePolicy::Stop),
    );

    assert_eq!(scheduler.step().await, SchedulerState::ClosedSkip);
    page_mock.assert_hits_async(0).await;

    assert_eq!(scheduler.step().await, SchedulerState::Sleeping);
    assert_eq!(scheduler.step().await, SchedulerState::Checking);
    // 10:00, still closed
    assert_eq!(scheduler.step().await, SchedulerState::ClosedSkip);
    assert_eq!(scheduler.step().await, SchedulerState::Sleeping);
    assert_eq!(scheduler.step().await, SchedulerState::Checking);

    // 11:00, open: the failing fetch stops the loop
    assert_eq!(scheduler.step().await, SchedulerState::FatalStopped);
    page_mock.assert_hits_async(1).await;
    assert!(matches!(
        scheduler.fatal_error(),
        Some(WatchError::FetchStatusError { status: 502, .. })
    ));
}
