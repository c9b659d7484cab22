//! Transaction construction engine: fee model, input selection, builder, witness
//! assembly and the wallet facade that ties them to their collaborators

pub mod builder;
pub mod discovery;
pub mod fees;
pub mod selection;
pub mod signer;
pub mod wallet;

pub use builder::{TxBuilder, TxIntent, TxRequest};
pub use discovery::{AddressBook, AddressDiscovery, ChainAddress};
pub use wallet::{Wallet, WalletConfig};
