use thiserror::Error;

/// Error taxonomy for the whole crate. Variants map onto the kinds from
/// the coordinator's error handling design, not onto individual call sites.
#[derive(Error, Debug)]
pub enum SwapError {
    #[error("system RNG unavailable")]
    RngUnavailable,

    #[error("bad public key: {0}")]
    BadPublicKey(String),

    #[error("bad timelock: {0}")]
    BadTimelock(String),

    #[error("bad hash: expected 32 bytes, got {0}")]
    BadHash(usize),

    #[error("bad key: {0}")]
    BadKey(String),

    #[error("bad amount: {0}")]
    BadAmount(String),

    #[error("underfunded: {0}")]
    Underfunded(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("malformed transaction: {0}")]
    MalformedTransaction(String),

    #[error("chain unavailable: {0}")]
    ChainUnavailable(String),

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("invalid state transition: {0}")]
    StateError(String),

    #[error("operation aborted")]
    Aborted,
}

pub type Result<T> = std::result::Result<T, SwapError>;
