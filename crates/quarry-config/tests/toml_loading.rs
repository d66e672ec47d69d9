//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for sandboxed files and env vars.

use std::path::Path;

use figment::{
    Figment, Jail,
    providers::{Format, Serialized, Toml},
};
use pretty_assertions::assert_eq;
use quarry_config::{ConfigError, NotificationRule, QuarryConfig, StoreBackend};

#[test]
fn loads_store_config_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[store]
backend = "s3"
bucket = "quarry-bucket"
region = "eu-west-1"
endpoint = "http://localhost:9000"
access_key_id = "key"
secret_access_key = "secret"
allow_http = true
"#,
        )?;

        let config: QuarryConfig = Figment::from(Serialized::defaults(QuarryConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.store.backend, StoreBackend::S3);
        assert_eq!(config.store.bucket, "quarry-bucket");
        assert_eq!(config.store.region, "eu-west-1");
        assert_eq!(config.store.endpoint, "http://localhost:9000");
        assert!(config.store.allow_http);
        assert!(config.store.has_static_credentials());
        Ok(())
    });
}

#[test]
fn loads_dataset_and_notification_overrides() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "pipeline.toml",
            r#"
[datasets.website]
prefix = "mirror/bls"
primary_file = "pr.data.1.AllData"

[datasets.api.params]
measures = "Population"
drilldowns = "Year,State"

[[notifications.rules]]
prefix = "mirror/bls/"

[[notifications.rules]]
prefix = "api-data/"
suffix = ".json"
"#,
        )?;

        let config = QuarryConfig::load_from(Some(Path::new("pipeline.toml")))
            .expect("config loads");

        assert_eq!(config.datasets.website.prefix, "mirror/bls");
        assert_eq!(
            config.datasets.api.params.get("drilldowns").map(String::as_str),
            Some("Year,State")
        );
        assert_eq!(
            config.notifications.rules,
            vec![
                NotificationRule {
                    prefix: "mirror/bls/".into(),
                    suffix: None,
                },
                NotificationRule {
                    prefix: "api-data/".into(),
                    suffix: Some(".json".into()),
                },
            ]
        );

        let layout = config.layout().expect("layout");
        assert_eq!(
            layout.latest_key(quarry_core::SourceDataset::WebsiteFileSet),
            "mirror/bls/pr.data.1.AllData"
        );
        Ok(())
    });
}

#[test]
fn explicit_file_beats_project_file() {
    Jail::expect_with(|jail| {
        std::fs::create_dir_all(jail.directory().join(".quarry")).expect("create .quarry");
        jail.create_file(".quarry/config.toml", "[schedule]\nhour = 3\nminute = 15\n")?;
        jail.create_file("override.toml", "[schedule]\nhour = 4\n")?;

        let config = QuarryConfig::load_from(Some(Path::new("override.toml")))
            .expect("config loads");
        assert_eq!(config.schedule.hour, 4);
        assert_eq!(config.schedule.minute, 15);
        Ok(())
    });
}

#[test]
fn missing_explicit_file_is_an_error() {
    Jail::expect_with(|_jail| {
        let result = QuarryConfig::load_from(Some(Path::new("nope.toml")));
        assert!(matches!(result, Err(ConfigError::NotConfigured { .. })));
        Ok(())
    });
}

#[test]
fn malformed_toml_is_reported() {
    Jail::expect_with(|jail| {
        jail.create_file("bad.toml", "[queue]\nmax_receive_count = \"many\"\n")?;
        let result = QuarryConfig::load_from(Some(Path::new("bad.toml")));
        assert!(matches!(result, Err(ConfigError::Figment(_))));
        Ok(())
    });
}
