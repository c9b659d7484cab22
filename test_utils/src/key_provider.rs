use async_trait::async_trait;
use cryptoxide::ed25519;
use sendada_common::{
    crypto::{blake2b_256, keyhash_224, ChainCode, ExtendedPublicKey, PublicKey, Signature},
    providers::KeyProvider,
    Address, AddressNetwork, AddressScheme, ByronAddress, KeyPath, ShelleyAddress,
    ShelleyAddressDelegationPart, ShelleyAddressPaymentPart, StakeAddress, StakeCredential,
    WalletError,
};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Empty attributes map carried by mainnet legacy addresses
const LEGACY_ATTRIBUTES: [u8; 1] = [0xa0];

/// Deterministic key holder: every path's secret is a hash of the seed and the path
///
/// Not a real BIP32-Ed25519 derivation. Good enough to exercise the signer end to end.
pub struct SoftwareKeyProvider {
    seed: [u8; 32],
    network: AddressNetwork,
    revoked: RwLock<HashSet<KeyPath>>,
}

impl SoftwareKeyProvider {
    pub fn new(seed: [u8; 32]) -> Self {
        Self {
            seed,
            network: AddressNetwork::Main,
            revoked: RwLock::new(HashSet::new()),
        }
    }

    /// Make later signatures with `path` fail
    pub async fn revoke(&self, path: KeyPath) {
        self.revoked.write().await.insert(path);
    }

    fn secret(&self, path: &KeyPath) -> [u8; 32] {
        let mut material = self.seed.to_vec();
        material.extend_from_slice(path.to_string().as_bytes());
        blake2b_256(&material).into_inner()
    }

    fn keypair(&self, path: &KeyPath) -> ([u8; 64], ExtendedPublicKey) {
        let secret = self.secret(path);
        let (keypair, public) = ed25519::keypair(&secret);
        let chain_code = blake2b_256(&secret).into_inner();
        (
            keypair,
            ExtendedPublicKey::new(PublicKey::from(public), ChainCode::from(chain_code)),
        )
    }

    fn payment_address(&self, path: &KeyPath) -> Result<Address, WalletError> {
        let (_, public) = self.keypair(path);
        match path.scheme {
            AddressScheme::Legacy => {
                let mut spending = public.to_bytes().to_vec();
                spending.extend_from_slice(&LEGACY_ATTRIBUTES);
                ByronAddress::new(&keyhash_224(&spending), &LEGACY_ATTRIBUTES, 0)
                    .map(Address::Byron)
                    .map_err(|e| WalletError::InvalidRequest(e.to_string()))
            }
            AddressScheme::Current => {
                let (_, staking) = self.keypair(&KeyPath::staking(path.account));
                Ok(Address::Shelley(ShelleyAddress {
                    network: self.network,
                    payment: ShelleyAddressPaymentPart::PaymentKeyHash(public.key.hash()),
                    delegation: ShelleyAddressDelegationPart::StakeKeyHash(staking.key.hash()),
                }))
            }
        }
    }
}

#[async_trait]
impl KeyProvider for SoftwareKeyProvider {
    async fn derive_address(&self, path: &KeyPath) -> Result<Address, WalletError> {
        if path.chain == KeyPath::STAKING {
            let (_, public) = self.keypair(path);
            return Ok(Address::Stake(StakeAddress::new(
                StakeCredential::AddrKeyHash(public.key.hash()),
                self.network,
            )));
        }
        self.payment_address(path)
    }

    async fn public_key(&self, path: &KeyPath) -> Result<ExtendedPublicKey, WalletError> {
        Ok(self.keypair(path).1)
    }

    async fn sign(&self, path: &KeyPath, message: &[u8]) -> Result<Signature, WalletError> {
        if self.revoked.read().await.contains(path) {
            return Err(WalletError::SigningFailure {
                path: path.to_string(),
                reason: "key revoked".to_string(),
            });
        }
        let (keypair, _) = self.keypair(path);
        Ok(Signature::from(ed25519::signature(message, &keypair)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(scheme: AddressScheme, index: u32) -> KeyPath {
        KeyPath::new(scheme, 0, KeyPath::EXTERNAL, index)
    }

    #[tokio::test]
    async fn signatures_verify_against_the_public_key() {
        let keys = SoftwareKeyProvider::new([7; 32]);
        let path = path(AddressScheme::Current, 3);
        let signature = keys.sign(&path, b"message").await.unwrap();
        let public = keys.public_key(&path).await.unwrap();
        assert!(public.key.verify(b"message", &signature));
        assert!(!public.key.verify(b"other", &signature));
    }

    #[tokio::test]
    async fn addresses_follow_the_scheme() {
        let keys = SoftwareKeyProvider::new([7; 32]);
        let current = keys.derive_address(&path(AddressScheme::Current, 0)).await.unwrap();
        let legacy = keys.derive_address(&path(AddressScheme::Legacy, 0)).await.unwrap();
        let staking = keys.derive_address(&KeyPath::staking(0)).await.unwrap();

        assert_eq!(current.scheme(), AddressScheme::Current);
        assert!(matches!(legacy, Address::Byron(ref byron) if byron.attributes() == [0xa0]));
        assert!(matches!(staking, Address::Stake(_)));
        assert_ne!(
            current,
            keys.derive_address(&path(AddressScheme::Current, 1)).await.unwrap()
        );
    }

    #[tokio::test]
    async fn revoked_path_cannot_sign() {
        let keys = SoftwareKeyProvider::new([7; 32]);
        let path = path(AddressScheme::Legacy, 0);
        keys.revoke(path).await;
        assert!(matches!(
            keys.sign(&path, b"message").await,
            Err(WalletError::SigningFailure { .. })
        ));
    }
}
