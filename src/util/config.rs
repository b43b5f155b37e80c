use anyhow::{bail, Context, Result};
use config::{Config, FileFormat};
use std::path::PathBuf;
use std::time::Duration;

use crate::decoder::PayloadLayout;

#[derive(Clone, Debug)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub keep_alive: Duration,
    pub tls: bool,
    pub auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: String,
    pub topic: String,
}

/// Immutable process configuration, built once in `main` and threaded through
/// every constructor that needs it.
#[derive(Clone, Debug)]
pub struct Settings {
    pub mqtt: MqttSettings,
    pub environment: String,
    pub endpoints: Vec<String>,
    pub api_key: String,
    pub data_dir: PathBuf,
    pub layout: PayloadLayout,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::from_config(&build_config()?)
    }

    fn from_config(config: &Config) -> Result<Self> {
        let environment = config.get_string("environment")?;
        let endpoints: Vec<String> = config
            .get(&format!("endpoints.{}", environment))
            .with_context(|| {
                format!("no endpoint list configured for environment {:?}", environment)
            })?;
        if endpoints.is_empty() {
            bail!("endpoint list for environment {:?} is empty", environment);
        }

        let layout_path = config.get_string("layout_path")?;
        let layout = PayloadLayout::from_file(&layout_path)
            .with_context(|| format!("failed to load payload layout from {:?}", layout_path))?;

        let auth = config.get_bool("mqtt_auth")?;
        let mqtt = MqttSettings {
            host: config.get_string("mqtt_host")?,
            port: config.get_int("mqtt_port")?.try_into()?,
            keep_alive: Duration::from_secs(config.get_int("mqtt_keep_alive")?.try_into()?),
            tls: config.get_bool("mqtt_tls")?,
            auth,
            username: if auth {
                Some(config.get_string("mqtt_username")?)
            } else {
                None
            },
            password: if auth {
                Some(config.get_string("mqtt_password")?)
            } else {
                None
            },
            client_id: config.get_string("mqtt_client_id")?,
            topic: config.get_string("mqtt_topic")?,
        };

        Ok(Settings {
            mqtt,
            endpoints,
            api_key: config.get_string("api_key")?,
            data_dir: PathBuf::from(config.get_string("data_dir")?),
            layout,
            request_timeout: Duration::from_secs(
                config.get_int("request_timeout_secs")?.try_into()?,
            ),
            environment,
        })
    }
}

fn build_config() -> Result<Config> {
    Ok(Config::builder()
        .set_default("environment", "production")?
        .set_default("mqtt_port", 8883)?
        .set_default("mqtt_keep_alive", 15)?
        .set_default("mqtt_tls", true)?
        .set_default("mqtt_auth", true)?
        .set_default("mqtt_client_id", "climatebridge")?
        .set_default("mqtt_topic", "v3/+/devices/+/up")?
        .set_default("data_dir", "data")?
        .set_default("layout_path", "layout.json")?
        .set_default("request_timeout_secs", 10)?
        .add_source(config::Environment::with_prefix("CLIMATEBRIDGE"))
        .add_source(config::File::new("climatebridge.toml", FileFormat::Toml).required(false))
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::temp_dir;

    fn layout_file() -> (PathBuf, String) {
        let dir = temp_dir("settings");
        let path = dir.join("layout.json");
        std::fs::write(
            &path,
            r#"{"version": 1, "temperature": [1, 2], "humidity": [3, 4]}"#,
        )
        .unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    fn base_config(layout_path: &str) -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder()
            .set_default("environment", "production")
            .unwrap()
            .set_default("mqtt_port", 8883)
            .unwrap()
            .set_default("mqtt_keep_alive", 15)
            .unwrap()
            .set_default("mqtt_client_id", "climatebridge")
            .unwrap()
            .set_default("mqtt_topic", "v3/+/devices/+/up")
            .unwrap()
            .set_default("data_dir", "data")
            .unwrap()
            .set_default("request_timeout_secs", 10)
            .unwrap()
            .set_override("mqtt_host", "broker.example.com")
            .unwrap()
            .set_override("mqtt_tls", false)
            .unwrap()
            .set_override("mqtt_auth", false)
            .unwrap()
            .set_override("api_key", "secret")
            .unwrap()
            .set_override("layout_path", layout_path)
            .unwrap()
    }

    #[test]
    fn selects_endpoint_list_by_environment() {
        let (dir, layout_path) = layout_file();
        let config = base_config(&layout_path)
            .set_override("environment", "staging")
            .unwrap()
            .set_override(
                "endpoints.staging",
                vec!["http://staging.example.com/sensormetrics".to_string()],
            )
            .unwrap()
            .set_override(
                "endpoints.production",
                vec!["http://prod.example.com/sensormetrics".to_string()],
            )
            .unwrap()
            .build()
            .unwrap();

        let settings = Settings::from_config(&config).unwrap();
        assert_eq!(settings.environment, "staging");
        assert_eq!(
            settings.endpoints,
            vec!["http://staging.example.com/sensormetrics".to_string()]
        );
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
        assert_eq!(settings.layout.version, 1);
        assert!(settings.mqtt.username.is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_endpoint_list_refuses_to_start() {
        let (dir, layout_path) = layout_file();
        let config = base_config(&layout_path)
            .set_override("endpoints.production", Vec::<String>::new())
            .unwrap()
            .build()
            .unwrap();

        assert!(Settings::from_config(&config).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_endpoint_list_refuses_to_start() {
        let (dir, layout_path) = layout_file();
        let config = base_config(&layout_path).build().unwrap();

        assert!(Settings::from_config(&config).is_err());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
