use super::road_network::{EdgeId, NodeId};


/// Conditions that abort a run.  Sparse or missing data (no path, no route, no endpoint) is
/// never reported through this type; those cases degrade to `None` or dropped trips.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read or write CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("failed to encode or decode the route store: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("failed to parse a number: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("failed to parse an integer: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("invalid configuration value for {key}: {reason}")]
    Config {
        key: String,
        reason: String,
    },
    #[error("unknown intervention type: {0}")]
    UnknownIntervention(String),
    #[error("invalid intervention {name}: {reason}")]
    InvalidIntervention {
        name: String,
        reason: String,
    },
    #[error("node {0} does not exist in the road network")]
    MissingNode(NodeId),
    #[error("edge {0} does not exist in the road network")]
    MissingEdge(EdgeId),
}

pub type Result<T> = std::result::Result<T, TransportError>;

impl TransportError {
    pub fn config(key: &str, reason: impl Into<String>) -> TransportError {
        TransportError::Config {
            key: String::from(key),
            reason: reason.into(),
        }
    }
}
