//! Gap-limited address discovery and the resulting address book

use sendada_common::{
    AddressScheme, DiscoveryConfig, KeyHash, KeyPath, WalletError,
    address::Address,
    providers::{KeyProvider, UtxoSource},
};
use std::collections::HashMap;
use tracing::debug;

/// One derived address and whether the chain has seen it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAddress {
    pub address: Address,
    pub path: KeyPath,
    pub used: bool,
}

/// Addresses a wallet owns, as found by one discovery pass
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    account: u32,
    addresses: Vec<ChainAddress>,
    paths: HashMap<Address, KeyPath>,
    staking_key_hash: Option<KeyHash>,
}

impl AddressBook {
    pub fn new(account: u32, addresses: Vec<ChainAddress>, staking_key_hash: Option<KeyHash>) -> Self {
        let paths = addresses
            .iter()
            .map(|entry| (entry.address.clone(), entry.path))
            .collect();
        Self {
            account,
            addresses,
            paths,
            staking_key_hash,
        }
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.addresses.iter().map(|entry| &entry.address)
    }

    pub fn entries(&self) -> &[ChainAddress] {
        &self.addresses
    }

    pub fn is_own_address(&self, address: &Address) -> bool {
        self.paths.contains_key(address)
    }

    pub fn key_path_for(&self, address: &Address) -> Option<KeyPath> {
        self.paths.get(address).copied()
    }

    /// First unused internal address, current scheme before legacy
    pub fn change_address(&self) -> Option<&Address> {
        [AddressScheme::Current, AddressScheme::Legacy]
            .into_iter()
            .find_map(|scheme| {
                self.addresses.iter().find(|entry| {
                    !entry.used && entry.path.scheme == scheme && entry.path.chain == KeyPath::INTERNAL
                })
            })
            .map(|entry| &entry.address)
    }

    pub fn staking_key_hash(&self) -> Option<&KeyHash> {
        self.staking_key_hash.as_ref()
    }

    pub fn staking_path(&self) -> KeyPath {
        KeyPath::staking(self.account)
    }
}

/// Walks derivation chains until `gap_limit` consecutive addresses have no history
pub struct AddressDiscovery<'a> {
    keys: &'a dyn KeyProvider,
    utxos: &'a dyn UtxoSource,
    config: DiscoveryConfig,
}

impl<'a> AddressDiscovery<'a> {
    pub fn new(keys: &'a dyn KeyProvider, utxos: &'a dyn UtxoSource, config: DiscoveryConfig) -> Self {
        Self {
            keys,
            utxos,
            config,
        }
    }

    /// Every address derived on one chain, ending with the unused gap window
    pub async fn enumerate(
        &self,
        scheme: AddressScheme,
        chain: u32,
    ) -> Result<Vec<ChainAddress>, WalletError> {
        let gap_limit = self.config.gap_limit;
        let mut found = Vec::new();
        let mut gap = 0;
        let mut next_index = 0u32;

        while gap < gap_limit {
            let mut batch = Vec::with_capacity(gap_limit as usize);
            for index in next_index..next_index.saturating_add(gap_limit) {
                let path = KeyPath::new(scheme, self.config.account, chain, index);
                batch.push((self.keys.derive_address(&path).await?, path));
            }
            next_index = next_index.saturating_add(gap_limit);

            let candidates: Vec<Address> = batch.iter().map(|(address, _)| address.clone()).collect();
            let used = self.utxos.filter_used(&candidates).await?;

            for (address, path) in batch {
                let is_used = used.contains(&address);
                gap = if is_used { 0 } else { gap + 1 };
                found.push(ChainAddress {
                    address,
                    path,
                    used: is_used,
                });
                if gap == gap_limit {
                    break;
                }
            }
        }

        debug!(
            %scheme,
            chain,
            scanned = found.len(),
            used = found.iter().filter(|entry| entry.used).count(),
            "Enumerated addresses"
        );
        Ok(found)
    }

    /// External and internal chains of each scheme, plus the staking key
    pub async fn discover(&self, schemes: &[AddressScheme]) -> Result<AddressBook, WalletError> {
        let mut addresses = Vec::new();
        for scheme in schemes {
            for chain in [KeyPath::EXTERNAL, KeyPath::INTERNAL] {
                addresses.extend(self.enumerate(*scheme, chain).await?);
            }
        }

        let staking_key_hash = if schemes.contains(&AddressScheme::Current) {
            let key = self.keys.public_key(&KeyPath::staking(self.config.account)).await?;
            Some(key.key.hash())
        } else {
            None
        };

        Ok(AddressBook::new(self.config.account, addresses, staking_key_hash))
    }
}
