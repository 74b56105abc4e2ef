//! Test publisher for exercising the monitor against a live broker.
//!
//! Usage:
//!   cargo run --bin simulate -- fire
//!   cargo run --bin simulate -- sensor --temperature 28.5 --humidity 40

use clap::{Parser, Subcommand};
use fire_watch::broker::{BrokerEvent, MqttClient};
use fire_watch::config::{self, Config};
use log::{info, warn};
use rumqttc::QoS;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Parser)]
#[command(name = "simulate", about = "Publish test messages to the fire-watch topics")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Publish one fire trigger on the fire topic
    Fire,
    /// Publish a temperature/humidity reading on the sensor topic
    Sensor {
        #[arg(long, default_value_t = 23.0)]
        temperature: f64,
        #[arg(long, default_value_t = 55.0)]
        humidity: f64,
    },
}

#[tokio::main]
async fn main() {
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = Config::from_env();
    // Distinct client id so the simulator never evicts the monitor's session
    config.mqtt.client_id = format!("{}-sim", config.mqtt.client_id);

    info!(
        "Connecting to {}:{}",
        config.mqtt.broker_host, config.mqtt.broker_port
    );

    let client = MqttClient::new(&config.mqtt);
    let publisher = client.handle();

    let (event_tx, mut event_rx) = mpsc::channel(16);
    let loop_task = tokio::spawn(client.run(event_tx));

    // Wait for the CONNACK before publishing
    let connected = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = event_rx.recv().await {
            if matches!(event, BrokerEvent::Connected) {
                return true;
            }
        }
        false
    })
    .await;

    match connected {
        Ok(true) => info!("Connected"),
        Ok(false) => {
            warn!("Client task ended before connecting");
            return;
        }
        Err(_) => {
            warn!("Connection timeout after 10 seconds");
            loop_task.abort();
            return;
        }
    }

    let (topic, payload) = match args.command {
        Command::Fire => (config.topics.fire, "1".to_string()),
        Command::Sensor {
            temperature,
            humidity,
        } => (
            config.topics.sensor,
            serde_json::json!({ "temperatura": temperature, "umidade": humidity }).to_string(),
        ),
    };

    info!("Publishing to {}: {}", topic, payload);
    if let Err(e) = publisher
        .publish(&topic, QoS::AtLeastOnce, false, payload.as_bytes())
        .await
    {
        warn!("Publish failed: {}", e);
    }

    // Give the event loop a moment to flush the publish
    tokio::time::sleep(Duration::from_millis(500)).await;
    loop_task.abort();
}
