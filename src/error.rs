use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum AlertError {
    #[error("failed to connect to MQTT broker: {0}")]
    ConnectionFailed(String),

    #[error("connection to MQTT broker lost: {0}")]
    TransportLost(String),
}

pub type Result<T> = std::result::Result<T, AlertError>;
