use crate::config::{Config, ExporterPreset};
use crate::domain::sample::{CommodityKind, EntityType};
use std::env;
use std::sync::Mutex;
use std::sync::OnceLock;

// Global lock to prevent race conditions when modifying environment variables in tests
static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn get_env_lock() -> &'static Mutex<()> {
    ENV_LOCK.get_or_init(|| Mutex::new(()))
}

const VARS: &[&str] = &[
    "PROMETHEUS_ADDRESSES",
    "PROMETHEUS_TIMEOUT_SECS",
    "PROMETHEUS_MAX_RETRIES",
    "PROMETHEUS_EXPORTERS",
    "QUERY_CONFIG_PATH",
    "TARGET_SCOPE",
    "TRANSACTION_CAPACITY",
    "RESPONSE_TIME_CAPACITY",
    "RECOGNIZED_ENTITY_TYPES",
    "KEEP_STANDALONE",
    "CREATE_PROXY_VM",
    "GATEWAY_NAMESPACES",
    "OBSERVABILITY_ENABLED",
    "DISCOVERY_INTERVAL_SECS",
];

fn clear_env() {
    for var in VARS {
        // SAFETY: callers hold ENV_LOCK.
        unsafe { env::remove_var(var) };
    }
}

fn set(key: &str, value: &str) {
    // SAFETY: callers hold ENV_LOCK.
    unsafe { env::set_var(key, value) };
}

#[test]
fn test_config_defaults() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    let config = Config::from_env().unwrap();

    assert_eq!(config.prometheus.addresses, vec!["http://localhost:9090"]);
    assert_eq!(config.prometheus.timeout_secs, 30);
    assert_eq!(config.prometheus.max_retries, 3);
    assert_eq!(config.prometheus.exporters, vec![ExporterPreset::Istio]);
    assert!(config.prometheus.query_config_path.is_none());

    let settings = config.topology_settings();
    assert_eq!(settings.scope, "prometheus");
    assert_eq!(settings.caps.get(CommodityKind::Transaction), Some(20.0));
    assert_eq!(settings.caps.get(CommodityKind::ResponseTime), Some(500.0));
    assert!(settings.recognizes(EntityType::Application));
    assert!(settings.recognizes(EntityType::VirtualApplication));
    assert!(settings.keep_standalone);
    assert!(!settings.create_proxy_vm);
    assert_eq!(config.topology.gateway_namespaces, vec!["openfaas"]);

    assert!(config.observability.enabled);
    assert_eq!(config.observability.discovery_interval_secs, 600);
}

#[test]
fn test_config_overrides() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();
    set("PROMETHEUS_ADDRESSES", "http://prom-a:9090, http://prom-b:9090");
    set("PROMETHEUS_EXPORTERS", "istio,gateway");
    set("TARGET_SCOPE", "cluster-1");
    set("TRANSACTION_CAPACITY", "100");
    set("RECOGNIZED_ENTITY_TYPES", "Application");
    set("CREATE_PROXY_VM", "true");
    set("GATEWAY_NAMESPACES", "openfaas,openfaas-fn");

    let config = Config::from_env().unwrap();

    assert_eq!(config.prometheus.addresses.len(), 2);
    assert_eq!(
        config.prometheus.exporters,
        vec![ExporterPreset::Istio, ExporterPreset::Gateway]
    );
    let settings = config.topology_settings();
    assert_eq!(settings.scope, "cluster-1");
    assert_eq!(settings.caps.get(CommodityKind::Transaction), Some(100.0));
    assert!(!settings.recognizes(EntityType::VirtualApplication));
    assert!(settings.create_proxy_vm);
    assert!(config.topology.gateway_policy().allowed().contains("openfaas-fn"));

    clear_env();
}

#[test]
fn test_invalid_capacity_is_an_error() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    set("TRANSACTION_CAPACITY", "lots");
    assert!(Config::from_env().is_err());

    set("TRANSACTION_CAPACITY", "-5");
    let err = Config::from_env().unwrap_err();
    assert!(format!("{err:#}").contains("TRANSACTION_CAPACITY"));

    clear_env();
}

#[test]
fn test_invalid_address_and_preset_are_errors() {
    let _guard = get_env_lock().lock().unwrap();
    clear_env();

    set("PROMETHEUS_ADDRESSES", "not a url");
    assert!(Config::from_env().is_err());

    clear_env();
    set("PROMETHEUS_EXPORTERS", "istio,jmx");
    assert!(Config::from_env().is_err());

    clear_env();
    set("RECOGNIZED_ENTITY_TYPES", "Container");
    assert!(Config::from_env().is_err());

    clear_env();
}
