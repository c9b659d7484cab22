//! A mainnet legacy transaction spending two outputs of one parent, with its signed bytes
//!
//! Paying 47 lovelace out of 2_968_819 leaves 2_789_879 change after the 178_893 fee.

use async_trait::async_trait;
use sendada_common::{
    crypto::{keyhash_224, ExtendedPublicKey, Signature},
    providers::KeyProvider,
    Address, AddressScheme, ByronAddress, KeyPath, Lovelace, TxHash, TxInput, UnspentOutput,
    Value, WalletError,
};

pub const PARENT_TX: &str = "6ca5fde47f4ff7f256a7464dbf0cb9b4fb6bce9049eee1067eed65cf5d6e2765";
pub const TX_ID: &str = "1ca536020cb1a7a028ab27d5a2173335b039418bd03013c70641a09b14440fd9";

pub const DESTINATION: &str = "82d818584283581c13f3997560a5b81f5ac680b3322a2339433424e4e589ab3d752afdb6a101581e581c2eab4601bfe583febc23a04fb0abc21557adb47cea49c68d7b2f40a5001ac63884bf";
pub const CHANGE: &str = "82d818584283581cab41e66f954dd7f1c16081755eb02ee61dc720bd9e05790f9de649b7a101581e581c140539c64edded60a7f2d169cb4da86a47bccc6a92e4130754fd0f36001a306ccb8f";

/// Aux part of the transaction; its blake2b-256 is `TX_ID`
pub const AUX: &str = "839f8200d81858248258206ca5fde47f4ff7f256a7464dbf0cb9b4fb6bce9049eee1067eed65cf5d6e2765008200d81858248258206ca5fde47f4ff7f256a7464dbf0cb9b4fb6bce9049eee1067eed65cf5d6e276501ff9f8282d818584283581c13f3997560a5b81f5ac680b3322a2339433424e4e589ab3d752afdb6a101581e581c2eab4601bfe583febc23a04fb0abc21557adb47cea49c68d7b2f40a5001ac63884bf182f8282d818584283581cab41e66f954dd7f1c16081755eb02ee61dc720bd9e05790f9de649b7a101581e581c140539c64edded60a7f2d169cb4da86a47bccc6a92e4130754fd0f36001a306ccb8f1a002a8df7ffa0";
pub const WITNESSES: &str = "828200d81858858258406830165e81b0666850f36a4583f7a8a29b09e120f99852c56d37ded39bed1bb0464a98c35cf0f6458be6351d8f8527fb8b17fe6be0523e901d9562c2b7a52a9e58400558d0ce068d794a2fa64dfa9f3f3e378d585915d7e407d06f9e8c92fb1a2774c97129f2d8a2cd6c125c04d5d5b9a9aedbd680cfd15c312033f2afd07909f00b8200d81858858258400093f68540416f4deea889da21af1f1760edc3478bcac204a3013a046327c29c1748af9d186a7e463caa63ef2c660e5f2a051ad014a050d1b27e636128e1947e584032611014983bebd3018bf17810d6d6a4d363a6933947b83a0c5b0528db001167701137f8a0924d06b256f8ff3c220b958832c7b98706d8b03635541c077c7c0a";

pub const PAYMENT: Lovelace = 47;
pub const FEE: Lovelace = 178_893;
pub const CHANGE_AMOUNT: Lovelace = 2_789_879;

/// Split of the 2_968_819 input total across the two spent outputs
pub const INPUT_AMOUNTS: [Lovelace; 2] = [1_000_000, 1_968_819];

/// Key material of the witnesses, in input order
const XPUBS: [&str; 2] = [
    "6830165e81b0666850f36a4583f7a8a29b09e120f99852c56d37ded39bed1bb0464a98c35cf0f6458be6351d8f8527fb8b17fe6be0523e901d9562c2b7a52a9e",
    "0093f68540416f4deea889da21af1f1760edc3478bcac204a3013a046327c29c1748af9d186a7e463caa63ef2c660e5f2a051ad014a050d1b27e636128e1947e",
];
const SIGNATURES: [&str; 2] = [
    "0558d0ce068d794a2fa64dfa9f3f3e378d585915d7e407d06f9e8c92fb1a2774c97129f2d8a2cd6c125c04d5d5b9a9aedbd680cfd15c312033f2afd07909f00b",
    "32611014983bebd3018bf17810d6d6a4d363a6933947b83a0c5b0528db001167701137f8a0924d06b256f8ff3c220b958832c7b98706d8b03635541c077c7c0a",
];

/// Full signed transaction: `[aux, witnesses]`
pub fn signed_hex() -> String {
    format!("82{AUX}{WITNESSES}")
}

fn address_from_hex(raw: &str) -> Address {
    let bytes = hex::decode(raw).expect("fixture address is hex");
    Address::from_bytes(&bytes).expect("fixture address decodes")
}

pub fn destination() -> Address {
    address_from_hex(DESTINATION)
}

pub fn change() -> Address {
    address_from_hex(CHANGE)
}

pub fn parent_tx() -> TxHash {
    PARENT_TX.parse().expect("fixture hash is hex")
}

fn xpub(index: usize) -> ExtendedPublicKey {
    let bytes = hex::decode(XPUBS[index]).expect("fixture key is hex");
    ExtendedPublicKey::from_bytes(&bytes).expect("fixture key is 64 bytes")
}

fn signature(index: usize) -> Signature {
    let bytes = hex::decode(SIGNATURES[index]).expect("fixture signature is hex");
    Signature::try_from(bytes.as_slice()).expect("fixture signature is 64 bytes")
}

/// Path of the key that signs for input `index`
pub fn key_path(index: usize) -> KeyPath {
    KeyPath::new(AddressScheme::Legacy, 0, KeyPath::EXTERNAL, index as u32)
}

/// Legacy address holding input `index`
pub fn input_address(index: usize) -> Address {
    let address = ByronAddress::new(&keyhash_224(&xpub(index).to_bytes()), &[0xa0], 0)
        .expect("fixture address encodes");
    Address::Byron(address)
}

/// The two outputs the fixture spends
pub fn unspent() -> Vec<UnspentOutput> {
    INPUT_AMOUNTS
        .iter()
        .enumerate()
        .map(|(index, amount)| UnspentOutput {
            input: TxInput::new(parent_tx(), index as u64),
            address: input_address(index),
            value: Value::lovelace(*amount),
        })
        .collect()
}

/// Key provider holding the fixture's public keys and their recorded signatures
///
/// The private keys are unknown, so `sign` hands back the recorded signature and only
/// if it verifies over the requested message.
#[derive(Default)]
pub struct FixtureKeyProvider;

impl FixtureKeyProvider {
    fn index_of(path: &KeyPath) -> Result<usize, WalletError> {
        (0..XPUBS.len())
            .find(|index| key_path(*index) == *path)
            .ok_or_else(|| WalletError::SigningFailure {
                path: path.to_string(),
                reason: "no fixture key at this path".to_string(),
            })
    }
}

#[async_trait]
impl KeyProvider for FixtureKeyProvider {
    async fn derive_address(&self, path: &KeyPath) -> Result<Address, WalletError> {
        Ok(input_address(Self::index_of(path)?))
    }

    async fn public_key(&self, path: &KeyPath) -> Result<ExtendedPublicKey, WalletError> {
        Ok(xpub(Self::index_of(path)?))
    }

    async fn sign(&self, path: &KeyPath, message: &[u8]) -> Result<Signature, WalletError> {
        let index = Self::index_of(path)?;
        let signature = signature(index);
        if !xpub(index).key.verify(message, &signature) {
            return Err(WalletError::SigningFailure {
                path: path.to_string(),
                reason: "message differs from the fixture's".to_string(),
            });
        }
        Ok(signature)
    }
}
