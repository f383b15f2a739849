// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn pairs_encode_contract_keys() {
    let mut config = StackConfig {
        identity: "abcd1234".into(),
        challenge_id: "c1".into(),
        image_pull_secrets: vec!["reg-creds".into(), "backup".into()],
        additional: BTreeMap::new(),
    };
    config.additional.insert("difficulty".into(), "hard".into());

    let pairs = config.pairs().unwrap();
    let get = |k: &str| {
        pairs
            .iter()
            .find(|(key, _)| key == k)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| panic!("missing key {k}"))
    };

    assert_eq!(get("identity"), "abcd1234");
    assert_eq!(get("challenge_id"), "c1");
    // JSON-encoded, order preserved.
    assert_eq!(get("image_pull_secrets"), r#"["reg-creds","backup"]"#);
    assert_eq!(get("additional"), r#"{"difficulty":"hard"}"#);
}

#[test]
fn pairs_with_empty_config() {
    let pairs = StackConfig::default().pairs().unwrap();
    assert_eq!(pairs.len(), 4);
    assert!(pairs.iter().any(|(k, v)| k == "image_pull_secrets" && v == "[]"));
    assert!(pairs.iter().any(|(k, v)| k == "additional" && v == "{}"));
}
