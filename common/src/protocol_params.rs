//! Protocol parameters the engine needs: fee constants, minimum UTXO value, network identity

use crate::address::AddressNetwork;
use crate::asset::Lovelace;
use crate::rational_number::RationalNumber;
use crate::tx::Era;

/// Mainnet protocol magic, signed into legacy witnesses
pub const MAINNET_PROTOCOL_MAGIC: u32 = 764824073;

/// `fee = constant + coefficient * size`, rounded up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFee {
    pub constant: Lovelace,
    /// Lovelace per byte
    pub coefficient: RationalNumber,
}

impl Default for LinearFee {
    fn default() -> Self {
        Self {
            constant: 155_381,
            coefficient: RationalNumber::new(43_946, 1_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxParams {
    pub era: Era,
    pub network: AddressNetwork,
    pub protocol_magic: u32,
    pub fee: LinearFee,
    /// Floor for any output, and the base of the token min-ada scale
    pub min_utxo_value: Lovelace,
}

impl Default for TxParams {
    fn default() -> Self {
        Self {
            era: Era::Shelley,
            network: AddressNetwork::Main,
            protocol_magic: MAINNET_PROTOCOL_MAGIC,
            fee: LinearFee::default(),
            min_utxo_value: 1_000_000,
        }
    }
}

impl TxParams {
    pub fn byron() -> Self {
        Self {
            era: Era::Byron,
            ..Self::default()
        }
    }
}
