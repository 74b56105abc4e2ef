use fire_watch::alert::{AlertMachine, LogNotifier, LogSoundPlayer};
use fire_watch::broker::BrokerLink;
use fire_watch::config::{self, Config};
use fire_watch::instance_lock::InstanceLock;
use log::{error, info, warn};
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio::signal;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    config::load_dotenv();
    init_logger();
    info!("Starting fire-watch");

    // Hold for the whole run; a second instance would register a duplicate
    // client id and double the alarm side effects
    let _lock = match InstanceLock::acquire() {
        Ok(lock) => lock,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let Config { mqtt, topics } = Config::from_env();
    info!("Configuration loaded:");
    info!(
        "  Broker: {}:{} (tls: {}, reconnect: {})",
        mqtt.broker_host, mqtt.broker_port, mqtt.use_tls, mqtt.reconnect
    );
    info!("  Client id: {}", mqtt.client_id);
    info!("  Fire topic: {}", topics.fire);
    info!("  Sensor topic: {}", topics.sensor);

    let mut machine = AlertMachine::new(
        topics.clone(),
        Arc::new(LogNotifier),
        Arc::new(LogSoundPlayer),
    );

    let link = BrokerLink::new(mqtt, [topics.fire, topics.sensor]);
    let (mut messages, link_handle) = link.start();

    info!("Monitoring; type 'reset' to silence an alarm, 'status' for the current state");

    // Single select loop: broker messages, operator commands and shutdown
    // are serialized here, so a reset never races a fire transition.
    let mut commands = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            message = messages.recv() => match message {
                Some(message) => machine.handle(&message),
                None => {
                    warn!("Broker link closed the message channel");
                    break;
                }
            },
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(command)) => dispatch_command(command.trim(), &mut machine),
                Ok(None) | Err(_) => stdin_open = false,
            },
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    link_handle.disconnect().await;
    info!("fire-watch stopped");
}

fn dispatch_command(command: &str, machine: &mut AlertMachine) {
    match command {
        "reset" => machine.reset(),
        "status" => {
            let state = machine.snapshot();
            info!(
                "State: {:?}, temperature: {:?}, humidity: {:?}",
                machine.phase(),
                state.temperature,
                state.humidity
            );
        }
        "" => {}
        other => warn!("Unknown command '{}' (expected 'reset' or 'status')", other),
    }
}
