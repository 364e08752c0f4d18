use std::fs;
use std::sync::Arc;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_rate_mock_server(rate: f64) -> MockServer {
        let mock_server = MockServer::start().await;
        mount_rate(&mock_server, rate).await;
        mock_server
    }

    pub async fn mount_rate(mock_server: &MockServer, rate: f64) {
        let mock_response = format!(r#"{{"bpi": {{"USD": {{"rate_float": {rate}}}}}}}"#);

        Mock::given(method("GET"))
            .and(path("/v1/bpi/currentprice.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(mock_server)
            .await;
    }

    /// Writes a config pointing the app at the mock server and a temp ledger.
    pub fn write_config(
        config_file: &tempfile::NamedTempFile,
        base_url: &str,
        data_dir: &std::path::Path,
    ) {
        let config_content = format!(
            r#"
rate:
  base_url: "{}"
  update_interval_secs: 300
wallet:
  page_size: 5
data_dir: "{}"
"#,
            base_url,
            data_dir.display()
        );
        std::fs::write(config_file.path(), config_content).expect("Failed to write config file");
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_rate_mock_server(50000.0).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri(), data_dir.path());
    let config_path = config_file.path().to_str().unwrap();

    // Record a spend and a top up, then render the dashboard.
    let result = btcbook::run_command(
        btcbook::AppCommand::Add {
            amount: "-0.1".parse().unwrap(),
            category: "Taxi".to_string(),
            date: None,
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "Add failed with: {:?}", result.err());

    let result = btcbook::run_command(
        btcbook::AppCommand::TopUp {
            amount: "0.5".parse().unwrap(),
        },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "TopUp failed with: {:?}", result.err());

    let result = btcbook::run_command(
        btcbook::AppCommand::Dashboard { pages: 2 },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "Dashboard failed with: {:?}", result.err());

    // The ledger on disk reflects both operations: 1.0 - 0.1 + 0.5.
    use btcbook::store::{RateCache, RecordStore, disk::DiskStore};
    let store = DiskStore::open(data_dir.path()).unwrap();
    info!("Reopened ledger for verification");
    assert_eq!(
        store.balance().await.unwrap(),
        "1.4".parse::<rust_decimal::Decimal>().unwrap()
    );
    let transactions = store.transactions(10, 0).await.unwrap();
    assert_eq!(transactions.len(), 2);

    // The dashboard's successful fetch persisted the rate for offline mode.
    assert_eq!(store.load().await, Some(50000.0));
}

#[test_log::test(tokio::test)]
async fn test_seed_then_paginate() {
    let mock_server = test_utils::create_rate_mock_server(42000.0).await;
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    test_utils::write_config(&config_file, &mock_server.uri(), data_dir.path());
    let config_path = config_file.path().to_str().unwrap();

    let result = btcbook::run_command(btcbook::AppCommand::Seed, Some(config_path)).await;
    assert!(result.is_ok(), "Seed failed with: {:?}", result.err());

    // Seeding twice is refused.
    let result = btcbook::run_command(btcbook::AppCommand::Seed, Some(config_path)).await;
    assert!(result.is_err());

    let result = btcbook::run_command(
        btcbook::AppCommand::Dashboard { pages: 3 },
        Some(config_path),
    )
    .await;
    assert!(result.is_ok(), "Dashboard failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_rate_poller_against_mock_with_outage() {
    use btcbook::analytics::{Analytics, MemoryAnalytics};
    use btcbook::providers::coindesk::CoindeskProvider;
    use btcbook::rate::RateService;
    use btcbook::store::memory::MemoryStore;
    use std::time::Duration;

    let mock_server = test_utils::create_rate_mock_server(50000.0).await;

    let provider = Arc::new(CoindeskProvider::new(
        &mock_server.uri(),
        Duration::from_secs(5),
    ));
    let store = Arc::new(MemoryStore::new());
    let analytics = Arc::new(MemoryAnalytics::new());
    let service = Arc::new(
        RateService::new(
            provider,
            Arc::clone(&store) as _,
            Arc::clone(&analytics) as _,
            Duration::from_secs(300),
        )
        .await,
    );

    let mut updates = service.subscribe();
    service.fetch().await;
    assert_eq!(updates.recv().await.unwrap(), 50000.0);

    // Take the endpoint down; the cached value keeps flowing.
    mock_server.reset().await;
    wiremock::Mock::given(wiremock::matchers::method("GET"))
        .respond_with(wiremock::ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    service.fetch().await;
    assert_eq!(updates.recv().await.unwrap(), 50000.0);

    let success = analytics.events(Some("rate_update"), None, None);
    let errors = analytics.events(Some("rate_update_error"), None, None);
    assert_eq!(success.len(), 1);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].parameters.get("fallback"),
        Some(&"cached".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn test_setup_writes_loadable_config() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.yaml");

    btcbook::cli::setup::setup_at_path(&config_path).unwrap();

    let config = btcbook::config::AppConfig::load_from_path(&config_path).unwrap();
    assert_eq!(config.wallet.page_size, 20);

    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("update_interval_secs"));
}
