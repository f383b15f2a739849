// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("CHALLD_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn defaults() {
    clear_env();
    let config = Config::load().unwrap();
    assert_eq!(config.directory, PathBuf::from("./data"));
    assert_eq!(config.cache, PathBuf::from("./data/cache"));
    assert_eq!(config.addr.port(), 8080);
    assert_eq!(config.log_level, "info");
    assert_eq!(config.pulumi_timeout, Some(Duration::from_secs(120)));
    assert!(matches!(config.janitor, JanitorSchedule::Ticker(d) if d == Duration::from_secs(60)));
    assert!(config.etcd.is_none());
    assert!(!config.oci.insecure);
}

#[test]
#[serial]
fn zero_timeout_disables_deadline() {
    clear_env();
    std::env::set_var("CHALLD_PULUMI_TIMEOUT", "0");
    let config = Config::load().unwrap();
    assert_eq!(config.pulumi_timeout, None);
    clear_env();
}

#[test]
#[serial]
fn cron_expression_selects_cron_mode() {
    clear_env();
    std::env::set_var("CHALLD_JANITOR_CRON", "*/30 * * * * *");
    let config = Config::load().unwrap();
    assert!(matches!(config.janitor, JanitorSchedule::Cron(expr) if expr == "*/30 * * * * *"));
    clear_env();
}

#[test]
#[serial]
fn etcd_backend_from_endpoint() {
    clear_env();
    std::env::set_var("CHALLD_ETCD_ENDPOINT", "http://etcd:2379");
    std::env::set_var("CHALLD_ETCD_USERNAME", "root");
    std::env::set_var("CHALLD_ETCD_PASSWORD", "hunter2");
    let config = Config::load().unwrap();
    let etcd = config.etcd.unwrap();
    assert_eq!(etcd.endpoint, "http://etcd:2379");
    assert_eq!(etcd.username.as_deref(), Some("root"));
    assert_eq!(etcd.password.as_deref(), Some("hunter2"));
    clear_env();
}

#[test]
#[serial]
fn invalid_addr_is_an_error() {
    clear_env();
    std::env::set_var("CHALLD_ADDR", "not-an-address");
    assert!(matches!(Config::load(), Err(ConfigError::Invalid { var: "CHALLD_ADDR", .. })));
    clear_env();
}

#[test]
#[serial]
fn cache_follows_directory() {
    clear_env();
    std::env::set_var("CHALLD_DIRECTORY", "/var/lib/challd");
    let config = Config::load().unwrap();
    assert_eq!(config.cache, PathBuf::from("/var/lib/challd/cache"));
    clear_env();
}
