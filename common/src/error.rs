//! Error taxonomy shared by the codec, builder, signer and collaborators

use crate::asset::Lovelace;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    /// Structural violation found while decoding
    #[error("Malformed encoding: {0}")]
    MalformedEncoding(String),

    /// Writer failure while encoding
    #[error("Encoding failed: {0}")]
    Encoding(String),

    /// `asset` is `lovelace` or `policy.name` in hex
    #[error("Insufficient funds: {asset} required {required}, available {available}")]
    InsufficientFunds {
        asset: String,
        required: u64,
        available: u64,
    },

    #[error("Output {index} carries {actual} lovelace, below the minimum {required}")]
    OutputBelowMinimum {
        index: usize,
        required: Lovelace,
        actual: Lovelace,
    },

    /// Builder defect, not a user error
    #[error("Fee did not converge after {iterations} iterations")]
    FeeDidNotConverge { iterations: usize },

    #[error("Empty transaction: nothing to pay and no certificates or withdrawals")]
    EmptyTransaction,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Signing failed for {path}: {reason}")]
    SigningFailure { path: String, reason: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Rejected by network: {0}")]
    RejectedByNetwork(String),
}

impl WalletError {
    pub fn malformed(message: impl Into<String>) -> Self {
        WalletError::MalformedEncoding(message.into())
    }

    pub fn insufficient_lovelace(required: Lovelace, available: Lovelace) -> Self {
        WalletError::InsufficientFunds {
            asset: "lovelace".to_string(),
            required,
            available,
        }
    }
}

impl From<minicbor::decode::Error> for WalletError {
    fn from(error: minicbor::decode::Error) -> Self {
        WalletError::MalformedEncoding(error.to_string())
    }
}

impl<E: std::fmt::Display> From<minicbor::encode::Error<E>> for WalletError {
    fn from(error: minicbor::encode::Error<E>) -> Self {
        WalletError::Encoding(error.to_string())
    }
}
