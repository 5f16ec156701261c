use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid build target '{0}': expected //<directory>:<rule>")]
    InvalidTarget(String),

    #[error("Unknown library kind: {0}")]
    UnknownKind(String),

    #[error("Dependency cycle needs at least one target")]
    EmptyCycle,
}
