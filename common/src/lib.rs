// Sendada common library - main library exports

pub mod address;
pub mod asset;
pub mod certificate;
pub mod configuration;
pub mod crypto;
pub mod error;
pub mod hash;
pub mod protocol_params;
pub mod providers;
pub mod rational_number;
pub mod tx;

// Flattened re-exports
pub use self::address::*;
pub use self::asset::*;
pub use self::certificate::*;
pub use self::configuration::{BuilderConfig, DiscoveryConfig, InputSelection};
pub use self::error::WalletError;
pub use self::hash::*;
pub use self::protocol_params::*;
pub use self::tx::*;
