// tests/config_env.rs
use job_aggregator::config::{AggregatorConfig, ENV_CONFIG_PATH};
use job_aggregator::rotation::KeyPolicy;
use std::{env, fs};

const TOUCHED: [&str; 9] = [
    ENV_CONFIG_PATH,
    "PORT",
    "KEY_POLICY",
    "JOB_SOURCES",
    "REQUEST_TIMEOUT_SECS",
    "KEY1",
    "KEY2",
    "KEY3",
    "RAPIDAPI_KEYS",
];

fn clear_env() {
    for k in TOUCHED {
        env::remove_var(k);
    }
}

#[serial_test::serial]
#[test]
fn load_uses_env_path_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not picked up.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing anywhere → defaults
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg.port, 3000);
    assert!(cfg.api_keys.is_empty());

    // 2) Fallback config/aggregator.toml
    fs::create_dir_all(tmp.path().join("config")).unwrap();
    fs::write(
        tmp.path().join("config/aggregator.toml"),
        r#"
port = 4100
sources = ["JSearchJobs"]
api_keys = ["file-key"]
"#,
    )
    .unwrap();
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg.port, 4100);
    assert_eq!(cfg.sources, ["JSearchJobs"]);
    assert_eq!(cfg.api_keys, ["file-key"]);

    // 3) Env path wins over the fallback file; env keys win over file keys
    let p = tmp.path().join("custom.toml");
    fs::write(&p, r#"key_policy = "per-source""#).unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());
    env::set_var("KEY1", "env-1");
    env::set_var("KEY2", "env-2");
    let cfg = AggregatorConfig::load().unwrap();
    assert_eq!(cfg.port, 3000);
    assert_eq!(cfg.key_policy, KeyPolicy::PerSource);
    assert_eq!(cfg.api_keys, ["env-1", "env-2"]);

    // 4) Env path pointing nowhere is an error
    env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
    assert!(AggregatorConfig::load().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn malformed_toml_is_reported() {
    clear_env();
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("bad.toml");
    fs::write(&p, "port = \"not a number\"").unwrap();
    env::set_var(ENV_CONFIG_PATH, p.display().to_string());

    let err = AggregatorConfig::load().unwrap_err();
    assert!(format!("{err:#}").contains("parsing config"));

    clear_env();
}
