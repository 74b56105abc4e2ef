use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Load environment variables from a .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Split at the first '='
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = &value[1..value.len() - 1];
            }

            // Real environment variables take precedence over the file
            if std::env::var(key).is_err() {
                // SAFETY: called from main before the async runtime starts,
                // while the process is still single-threaded
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub topics: TopicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    /// Must be unique per connected client; the broker drops the older
    /// session when two clients share an id.
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub reconnect: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Topic whose messages signal a detected fire. Payload content is
    /// ignored; the message itself is the trigger.
    pub fire: String,
    /// Topic carrying periodic temperature/humidity readings as JSON.
    pub sensor: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mqtt: MqttConfig {
                broker_host: "mqtt.eclipseprojects.io".to_string(),
                broker_port: 1883,
                client_id: format!("fire-watch-{}", std::process::id()),
                username: None,
                password: None,
                use_tls: false,
                reconnect: true,
            },
            topics: TopicConfig {
                fire: "casa/incendio".to_string(),
                sensor: "casa/sensores".to_string(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Ok(tls) = std::env::var("MQTT_USE_TLS") {
            config.mqtt.use_tls = parse_flag(&tls);
        }
        if let Ok(reconnect) = std::env::var("MQTT_RECONNECT") {
            config.mqtt.reconnect = parse_flag(&reconnect);
        }
        if let Ok(fire) = std::env::var("FIRE_TOPIC") {
            config.topics.fire = fire;
        }
        if let Ok(sensor) = std::env::var("SENSOR_TOPIC") {
            config.topics.sensor = sensor;
        }

        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "yes" | "on")
}
