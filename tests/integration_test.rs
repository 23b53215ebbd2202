#![cfg(feature = "http")]

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Mock, ServerGuard};
use parking_lot::Mutex;

use disconf_client::config::RemoteConfig;
use disconf_client::data_providers::http::HttpDataProvider;
use disconf_client::listener::{ChangeEvent, ChangeType, SharedListener};
use disconf_client::settings::ClientSettings;
use disconf_client::watch::memory::MemoryWatchService;

const CONFIG_FILE: &str = "\
# seata client settings
db.url=jdbc:mysql://10.0.0.5:3306/seata
db.user = seata
service.vgroupMapping.default_tx_group=default
";

type Client = RemoteConfig<HttpDataProvider>;

fn settings_for(server: &ServerGuard) -> ClientSettings {
    ClientSettings {
        server_addr: server.host_with_port(),
        app: "seata-server".to_string(),
        env: "test".to_string(),
        ..ClientSettings::default()
    }
}

fn file_mock(server: &mut ServerGuard, status: usize, body: &str, hits: usize) -> Mock {
    server
        .mock("GET", "/api/config/file")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("app".into(), "seata-server".into()),
            Matcher::UrlEncoded("env".into(), "test".into()),
            Matcher::UrlEncoded("version".into(), "1_0_0".into()),
            Matcher::UrlEncoded("key".into(), "config.txt".into()),
        ]))
        .with_status(status)
        .with_header("Content-Type", "text/plain")
        .with_body(body)
        .expect(hits)
        .create()
}

fn connect(settings: ClientSettings) -> (Arc<MemoryWatchService>, Client) {
    let watch = Arc::new(MemoryWatchService::new());
    let config = RemoteConfig::connect(settings, &watch).unwrap();
    (watch, config)
}

fn recording() -> (Arc<Mutex<Vec<ChangeEvent>>>, SharedListener) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let listener: SharedListener = Arc::new(move |event: ChangeEvent| sink.lock().push(event));
    (events, listener)
}

#[test]
fn reads_value_from_remote_file() {
    let mut server = mockito::Server::new();
    let mock = file_mock(&mut server, 200, CONFIG_FILE, 3);
    let (_, config) = connect(settings_for(&server));

    let timeout = Duration::from_secs(10);
    assert_eq!(
        config.get_latest_config("db.url", "none", timeout),
        "jdbc:mysql://10.0.0.5:3306/seata"
    );
    assert_eq!(config.get_latest_config("db.user", "none", timeout), "seata");
    assert_eq!(config.get_latest_config("db.password", "fallback", timeout), "fallback");

    mock.assert();
}

#[test]
fn server_errors_degrade_to_default() {
    let mut server = mockito::Server::new();
    let mock = file_mock(&mut server, 500, "db.url=should-not-be-used", 1);
    let (_, config) = connect(settings_for(&server));

    assert_eq!(
        config.get_latest_config("db.url", "default-url", Duration::from_secs(10)),
        "default-url"
    );
    mock.assert();
}

#[test]
fn unreachable_server_degrades_to_default() {
    let settings = ClientSettings {
        // Nothing listens on the discard port.
        server_addr: "127.0.0.1:9".to_string(),
        http_connect_timeout: 500,
        ..ClientSettings::default()
    };
    let (_, config) = connect(settings);
    assert_eq!(config.get_latest_config("db.url", "offline", Duration::from_secs(5)), "offline");
}

#[test]
fn environment_override_skips_remote_fetch() {
    let mut server = mockito::Server::new();
    let mock = file_mock(&mut server, 200, CONFIG_FILE, 0);
    let (_, config) = connect(settings_for(&server));

    temp_env::with_var("it.override.db.url", Some("jdbc:h2:mem:local"), || {
        assert_eq!(
            config.get_latest_config("it.override.db.url", "none", Duration::from_secs(10)),
            "jdbc:h2:mem:local"
        );
    });
    mock.assert();
}

#[test]
fn typed_reads_use_default_timeout() {
    let mut server = mockito::Server::new();
    let mock = file_mock(&mut server, 200, "server.port=8091\nclient.async=true\n", 3);
    let (_, config) = connect(settings_for(&server));

    assert_eq!(config.get_config_parsed("server.port", 0u16), 8091);
    assert!(config.get_config_parsed("client.async", false));
    assert_eq!(config.get_config("missing", "dflt"), "dflt");
    mock.assert();
}

#[test]
fn watch_change_reaches_listener_once() {
    let settings = ClientSettings::default();
    let path = settings.watch_path();
    let (watch, config) = connect(settings);
    let (events, listener) = recording();

    config.add_config_listener("db.url", listener).unwrap();
    watch
        .write_data(&path, r#""db.url=jdbc:mysql://localhost\n""#)
        .unwrap();

    assert_eq!(
        *events.lock(),
        vec![ChangeEvent {
            key: "db.url".to_string(),
            new_value: Some("jdbc:mysql://localhost".to_string()),
            change_type: ChangeType::Modify,
        }]
    );
}

#[test]
fn watch_delete_reaches_listener() {
    let settings = ClientSettings::default();
    let path = settings.watch_path();
    let (watch, config) = connect(settings);
    let (events, listener) = recording();

    config.add_config_listener("db.url", listener).unwrap();
    watch.delete(&path).unwrap();

    assert_eq!(
        *events.lock(),
        vec![ChangeEvent {
            key: "db.url".to_string(),
            new_value: None,
            change_type: ChangeType::Delete,
        }]
    );
}

#[test]
fn escaped_multi_key_payload_is_decoded() {
    let settings = ClientSettings::default();
    let path = settings.watch_path();
    let (watch, config) = connect(settings);
    let (events, listener) = recording();

    config.add_config_listener("greeting", listener.clone()).unwrap();
    config.add_config_listener("db.user", listener).unwrap();
    watch
        .write_data(&path, r#""db.user=seata\ngreeting=\u4f60\u597d\nport=8091""#)
        .unwrap();

    let mut values: Vec<(String, Option<String>)> = events
        .lock()
        .iter()
        .map(|event| (event.key.clone(), event.new_value.clone()))
        .collect();
    values.sort();
    assert_eq!(
        values,
        vec![
            ("db.user".to_string(), Some("seata".to_string())),
            ("greeting".to_string(), Some("你好".to_string())),
        ]
    );
}

#[test]
fn duplicate_registration_and_removal() {
    let settings = ClientSettings::default();
    let path = settings.watch_path();
    let (watch, config) = connect(settings);
    let (events, listener) = recording();

    assert!(config.get_config_listeners("db.url").is_none());

    config.add_config_listener("db.url", listener.clone()).unwrap();
    config.add_config_listener("db.url", listener.clone()).unwrap();
    let registered = config.get_config_listeners("db.url").unwrap();
    assert_eq!(registered.len(), 1);
    assert!(Arc::ptr_eq(&registered[0], &listener));
    assert_eq!(watch.subscriber_count(&path), 1);

    config.remove_config_listener("db.url", &listener).unwrap();
    config.remove_config_listener("db.url", &listener).unwrap();
    assert_eq!(watch.subscriber_count(&path), 0);
    assert_eq!(config.get_config_listeners("db.url").map(|l| l.len()), Some(0));

    watch.write_data(&path, "db.url=ignored").unwrap();
    assert!(events.lock().is_empty());
}

#[test]
fn settings_file_drives_the_client() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("registry.toml");
    std::fs::write(
        &file,
        r#"
        [config.disconf]
        app = "order-service"
        env = "prod"
        version = "2_1_0"
        configFile = "order.properties"
        zkHost = "zk1:2181,zk2:2181"
        zkUsername = "seata"
        zkPassword = "s3cret"
        serializer = "json"
        "#,
    )
    .unwrap();

    let settings = ClientSettings::from_file(&file).unwrap();
    let watch = Arc::new(MemoryWatchService::with_digest("seata", "s3cret"));
    let config = RemoteConfig::connect(settings, &watch).unwrap();

    assert_eq!(watch.connections()[0].host, "zk1:2181,zk2:2181");
    assert_eq!(watch.auth_info(), vec![("digest".to_string(), b"seata:s3cret".to_vec())]);

    let (events, listener) = recording();
    config.add_config_listener("order.timeout", listener).unwrap();
    let path = "/disconf/order-service_2_1_0_prod/file/order.properties";
    watch
        .write_data(path, r#""order.timeout=30s\norder.retry=3""#)
        .unwrap();
    assert_eq!(events.lock()[0].new_value.as_deref(), Some("30s"));
}
