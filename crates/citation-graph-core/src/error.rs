/// Flat error taxonomy for the citation graph engine (spec §7).
///
/// `Transport`/`Decode`/`Timeout` are recovered locally by the Metadata Client
/// and Graph Builder — they never bubble up to a caller as `Err`. Only
/// `InvalidArgument` is meant to surface past the crate boundary.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("timeout: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, Error>;
