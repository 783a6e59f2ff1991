use chrono::{NaiveDate, NaiveDateTime};
use cotiza::core::IndicatorCode;
use cotiza::core::SnapshotOrigin;
use cotiza::core::clock::FixedClock;
use cotiza::core::config::AppConfig;
use cotiza::core::convert::Field;
use cotiza::core::refresh::REFRESH_ADVISORY;
use cotiza::store::disk::DiskStore;
use std::fs;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const MINDICADOR_RESPONSE: &str = r#"{
        "fecha": "2025-05-22T20:00:00.000Z",
        "uf": {"fecha": "2025-05-22T04:00:00.000Z", "valor": 39123.45},
        "dolar": {"fecha": "2025-05-22T04:00:00.000Z", "valor": 915.0},
        "euro": {"fecha": "2025-05-22T04:00:00.000Z", "valor": 1040.25},
        "utm": {"fecha": "2025-05-01T04:00:00.000Z", "valor": 68306},
        "ipc": {"fecha": "2025-04-01T04:00:00.000Z", "valor": 0.2},
        "imacec": {"fecha": "2025-03-01T03:00:00.000Z", "valor": 3.8},
        "libra_cobre": {"fecha": "2025-05-21T04:00:00.000Z", "valor": 4.62},
        "bitcoin": {"fecha": "2025-05-21T04:00:00.000Z", "valor": 65000},
        "oro": {"fecha": "2025-05-22T04:00:00.000Z", "valor": 71000.5}
    }"#;

    pub async fn create_mock_server(status: u16, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(status).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    /// Config that allows fetching at any hour of the day.
    pub fn config_yaml(base_url: &str, data_path: &str) -> String {
        format!(
            r#"
        providers:
          mindicador:
            base_url: {base_url}
        quota:
          max_per_day: 4
          window_start: 0
          window_end: 24
        retries: 0
        data_path: "{data_path}"
    "#
        )
    }
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 22)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn config_for(base_url: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.providers.mindicador.base_url = base_url.to_string();
    config.retries = 0;
    config
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server =
        test_utils::create_mock_server(200, test_utils::MINDICADOR_RESPONSE).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_path = config_file.path();
    let config_content = test_utils::config_yaml(
        &mock_server.uri(),
        data_dir.path().to_str().unwrap(),
    );
    fs::write(config_path, &config_content).expect("Failed to write config file");

    for command in [
        cotiza::AppCommand::Show,
        cotiza::AppCommand::Convert {
            field: Field::Uf,
            amount: 2.0,
        },
        cotiza::AppCommand::Quota,
    ] {
        info!(?command, "Running command against mock server");
        let result = cotiza::run_command(command, Some(config_path.to_str().unwrap())).await;
        assert!(
            result.is_ok(),
            "Command {command:?} failed with: {:?}",
            result.err()
        );
    }
}

#[test_log::test(tokio::test)]
async fn test_convert_fails_without_any_data() {
    let mock_server = test_utils::create_mock_server(503, "").await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    let config_content = test_utils::config_yaml(
        &mock_server.uri(),
        data_dir.path().to_str().unwrap(),
    );
    fs::write(config_file.path(), &config_content).expect("Failed to write config file");

    let result = cotiza::run_command(
        cotiza::AppCommand::Convert {
            field: Field::Usd,
            amount: 10.0,
        },
        Some(config_file.path().to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_disk_cache_shared_across_orchestrators() {
    let mock_server =
        test_utils::create_mock_server(200, test_utils::MINDICADOR_RESPONSE).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(DiskStore::open(data_dir.path()).expect("Failed to open store"));
    let clock = Arc::new(FixedClock::new(at(9, 30)));

    let first = cotiza::build_orchestrator(&config_for(&mock_server.uri()), store.clone(), clock.clone());
    let fetched = first.refresh().await;
    assert_eq!(fetched.origin, SnapshotOrigin::Fetched);
    assert_eq!(fetched.snapshot.value(IndicatorCode::Uf), Some(39123.45));
    assert_eq!(fetched.snapshot.value(IndicatorCode::Btc), Some(59_475_000.0));
    assert_eq!(fetched.snapshot.value(IndicatorCode::Oro), Some(71000.5));

    // Same store, primary source now down.
    let offline = test_utils::create_mock_server(500, "").await;
    let second = cotiza::build_orchestrator(&config_for(&offline.uri()), store.clone(), clock.clone());
    let fallback = second.refresh().await;
    assert_eq!(fallback.origin, SnapshotOrigin::Cached);
    assert_eq!(fallback.advisory, REFRESH_ADVISORY);
    assert_eq!(fallback.snapshot, fetched.snapshot);

    let quota = second.cache().load_quota(at(9, 30).date()).await;
    assert_eq!(quota.count, 1);
    assert_eq!(quota.last_fetch_timestamp.as_deref(), Some("2025-05-22T09:30:00"));
}

#[test_log::test(tokio::test)]
async fn test_quota_exhaustion_across_orchestrators() {
    let mock_server =
        test_utils::create_mock_server(200, test_utils::MINDICADOR_RESPONSE).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(DiskStore::open(data_dir.path()).expect("Failed to open store"));
    let clock = Arc::new(FixedClock::new(at(8, 0)));
    let config = config_for(&mock_server.uri());

    for hour in [8, 11, 14, 20] {
        clock.set(at(hour, 0));
        let orchestrator = cotiza::build_orchestrator(&config, store.clone(), clock.clone());
        assert_eq!(orchestrator.refresh().await.origin, SnapshotOrigin::Fetched);
    }

    clock.set(at(23, 59));
    let orchestrator = cotiza::build_orchestrator(&config, store.clone(), clock.clone());
    let outcome = orchestrator.refresh().await;
    assert_eq!(outcome.origin, SnapshotOrigin::Cached);
    assert!(outcome.advisory.is_empty());

    // Gold is read from the same primary responses, so one request per cycle.
    let requests = mock_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 4);
    assert_eq!(
        outcome.snapshot.value(IndicatorCode::Oro),
        Some(71000.5)
    );

    // Next day starts with a fresh counter.
    clock.set(at(8, 0) + chrono::Duration::days(1));
    let next_day = cotiza::build_orchestrator(&config, store, clock.clone());
    assert_eq!(next_day.refresh().await.origin, SnapshotOrigin::Fetched);
}

#[test_log::test(tokio::test)]
async fn test_missing_afternoon_gold_keeps_morning_quote() {
    let morning_server =
        test_utils::create_mock_server(200, test_utils::MINDICADOR_RESPONSE).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = Arc::new(DiskStore::open(data_dir.path()).expect("Failed to open store"));
    let clock = Arc::new(FixedClock::new(at(9, 0)));

    let morning =
        cotiza::build_orchestrator(&config_for(&morning_server.uri()), store.clone(), clock.clone());
    assert_eq!(
        morning.refresh().await.snapshot.value(IndicatorCode::Oro),
        Some(71000.5)
    );

    // Afternoon response without gold.
    let afternoon_server = test_utils::create_mock_server(
        200,
        r#"{"fecha": "2025-05-22T20:00:00.000Z", "dolar": {"valor": 920.0}}"#,
    )
    .await;
    clock.set(at(17, 0));
    let afternoon =
        cotiza::build_orchestrator(&config_for(&afternoon_server.uri()), store, clock.clone());
    let outcome = afternoon.refresh().await;
    assert_eq!(outcome.origin, SnapshotOrigin::Fetched);
    assert_eq!(outcome.snapshot.value(IndicatorCode::Usd), Some(920.0));
    assert_eq!(outcome.snapshot.value(IndicatorCode::Oro), Some(71000.5));

    let requests = afternoon_server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 1);
}
