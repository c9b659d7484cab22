//! Hashing helpers and Ed25519 key material as handed over by a key provider

use crate::hash::{KeyHash, TxHash};
use blake2::{
    digest::consts::{U28, U32},
    Blake2b, Digest,
};
use cryptoxide::ed25519::{self, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use std::fmt;
use thiserror::Error;

/// Blake2b-256 of arbitrary bytes
pub fn blake2b_256(data: &[u8]) -> TxHash {
    let mut hasher = Blake2b::<U32>::new();
    hasher.update(data);
    TxHash::new(hasher.finalize().into())
}

/// Blake2b-224 hash of a verification key, as used in addresses and credentials
pub fn keyhash_224(key: &[u8]) -> KeyHash {
    let mut hasher = Blake2b::<U28>::new();
    hasher.update(key);
    KeyHash::new(hasher.finalize().into())
}

#[derive(Debug, Error)]
pub enum KeyMaterialError {
    #[error("Invalid size {actual}, expecting {expected}")]
    InvalidSize { expected: usize, actual: usize },
}

/// Ed25519 verification key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_LENGTH]);

/// Ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LENGTH]);

/// Chain code half of a BIP32-Ed25519 extended public key
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainCode([u8; 32]);

/// Verification key plus chain code. Legacy witnesses carry both halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtendedPublicKey {
    pub key: PublicKey,
    pub chain_code: ChainCode,
}

macro_rules! impl_key_bytes {
    ($Type:ident, $Size:expr, $Label:expr) => {
        impl $Type {
            pub const SIZE: usize = $Size;

            /// All-zero value; sizes placeholder witnesses, never verifies
            #[inline]
            pub const fn zero() -> Self {
                Self([0; $Size])
            }
        }

        impl From<[u8; $Size]> for $Type {
            fn from(bytes: [u8; $Size]) -> Self {
                Self(bytes)
            }
        }

        impl TryFrom<&[u8]> for $Type {
            type Error = KeyMaterialError;

            fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
                let bytes: [u8; $Size] =
                    value.try_into().map_err(|_| KeyMaterialError::InvalidSize {
                        expected: $Size,
                        actual: value.len(),
                    })?;
                Ok(Self(bytes))
            }
        }

        impl AsRef<[u8]> for $Type {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl fmt::Display for $Type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode(self.0))
            }
        }

        impl fmt::Debug for $Type {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple($Label).field(&hex::encode(self.0)).finish()
            }
        }
    };
}

impl_key_bytes!(PublicKey, PUBLIC_KEY_LENGTH, "PublicKey<Ed25519>");
impl_key_bytes!(Signature, SIGNATURE_LENGTH, "Signature<Ed25519>");
impl_key_bytes!(ChainCode, 32, "ChainCode");

impl PublicKey {
    /// Check `signature` over `message` against this key
    #[inline]
    pub fn verify<T>(&self, message: T, signature: &Signature) -> bool
    where
        T: AsRef<[u8]>,
    {
        ed25519::verify(message.as_ref(), &self.0, &signature.0)
    }

    pub fn hash(&self) -> KeyHash {
        keyhash_224(&self.0)
    }
}

impl ExtendedPublicKey {
    pub const SIZE: usize = PublicKey::SIZE + 32;

    pub fn new(key: PublicKey, chain_code: ChainCode) -> Self {
        Self { key, chain_code }
    }

    /// Legacy 64-byte form: key followed by chain code
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[..PublicKey::SIZE].copy_from_slice(self.key.as_ref());
        out[PublicKey::SIZE..].copy_from_slice(self.chain_code.as_ref());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyMaterialError> {
        if bytes.len() != Self::SIZE {
            return Err(KeyMaterialError::InvalidSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            key: PublicKey::try_from(&bytes[..PublicKey::SIZE])?,
            chain_code: ChainCode::try_from(&bytes[PublicKey::SIZE..])?,
        })
    }
}
