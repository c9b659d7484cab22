//! Test doubles for the engine's collaborators, plus the reference legacy transaction

pub mod fixtures;
mod key_provider;
mod submitter;
mod utxo_source;

pub use key_provider::SoftwareKeyProvider;
pub use submitter::RecordingSubmitter;
pub use utxo_source::InMemoryUtxoSource;
