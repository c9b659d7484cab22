//! Certificate type definitions

use crate::address::{StakeAddress, StakeCredential};
use crate::asset::Lovelace;
use crate::hash::{KeyHash, MetadataHash, PoolId, VrfKeyHash};
use crate::rational_number::RationalNumber;

/// Pool relay information
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relay {
    SingleHostAddr {
        port: Option<u16>,
        ipv4: Option<[u8; 4]>,
        ipv6: Option<[u8; 16]>,
    },
    SingleHostName {
        port: Option<u16>,
        dns_name: String,
    },
    MultiHostName {
        dns_name: String,
    },
}

/// Off-chain pool metadata anchor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMetadata {
    pub url: String,
    pub hash: MetadataHash,
}

/// Pool registration data, passed through to the wire unchanged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRegistration {
    /// Operator pool key hash - used as ID
    pub operator: PoolId,

    pub vrf_key_hash: VrfKeyHash,

    /// Pledged Ada
    pub pledge: Lovelace,

    /// Fixed cost
    pub cost: Lovelace,

    /// Marginal cost (fraction)
    pub margin: RationalNumber,

    pub reward_account: StakeAddress,

    /// Pool owners by their stake key hash
    pub pool_owners: Vec<KeyHash>,

    pub relays: Vec<Relay>,

    pub pool_metadata: Option<PoolMetadata>,
}

/// Certificates a wallet transaction can carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxCertificate {
    StakeRegistration(StakeCredential),
    StakeDeregistration(StakeCredential),
    StakeDelegation {
        credential: StakeCredential,
        pool: PoolId,
    },
    PoolRegistration(Box<PoolRegistration>),
}

impl TxCertificate {
    /// Key hashes whose holders may have to witness this certificate
    pub fn witness_key_hashes(&self) -> Vec<KeyHash> {
        match self {
            TxCertificate::StakeRegistration(credential)
            | TxCertificate::StakeDeregistration(credential)
            | TxCertificate::StakeDelegation { credential, .. } => match credential {
                StakeCredential::AddrKeyHash(hash) => vec![*hash],
                StakeCredential::ScriptHash(_) => Vec::new(),
            },
            TxCertificate::PoolRegistration(registration) => registration.pool_owners.clone(),
        }
    }
}
