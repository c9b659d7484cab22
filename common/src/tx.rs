//! Transaction data model: UTXOs, bodies, witnesses and the builder/signer hand-over aggregates

use crate::address::{Address, AddressScheme, StakeAddress};
use crate::asset::{Lovelace, Value};
use crate::certificate::TxCertificate;
use crate::crypto::{blake2b_256, ChainCode, PublicKey, Signature};
use crate::error::WalletError;
use crate::hash::{MetadataHash, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Reference to a previous transaction's output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TxInput {
    pub tx_hash: TxHash,
    pub index: u64,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u64) -> Self {
        Self { tx_hash, index }
    }
}

impl Display for TxInput {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub value: Value,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self { address, value }
    }
}

/// A spendable output as reported by the UTXO source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    #[serde(flatten)]
    pub input: TxInput,
    pub address: Address,
    pub value: Value,
}

/// Reward withdrawal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    pub reward_account: StakeAddress,
    pub amount: Lovelace,
}

/// Transaction metadata: exactly one opaque CBOR data item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxMetadata(Vec<u8>);

impl TxMetadata {
    pub fn new(raw: Vec<u8>) -> Result<Self, WalletError> {
        let mut d = minicbor::Decoder::new(&raw);
        d.skip()?;
        if d.position() != raw.len() {
            return Err(WalletError::malformed("metadata is not a single CBOR item"));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn hash(&self) -> MetadataHash {
        blake2b_256(&self.0)
    }
}

/// Selects the wire format, signing message and sizing rules
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Era {
    Byron,
    #[default]
    Shelley,
}

/// The part of a transaction covered by its id
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnsignedTxBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: Lovelace,
    pub ttl: Option<u64>,
    pub certificates: Vec<TxCertificate>,
    pub withdrawals: Vec<Withdrawal>,
    pub metadata_hash: Option<MetadataHash>,
}

impl UnsignedTxBody {
    pub fn output_total(&self) -> Option<Value> {
        Value::sum(self.outputs.iter().map(|output| &output.value))
    }
}

/// Derivation path of a wallet key
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyPath {
    pub scheme: AddressScheme,
    pub account: u32,
    /// 0 external, 1 internal (change), 2 staking
    pub chain: u32,
    pub index: u32,
}

impl KeyPath {
    pub const EXTERNAL: u32 = 0;
    pub const INTERNAL: u32 = 1;
    pub const STAKING: u32 = 2;

    pub fn new(scheme: AddressScheme, account: u32, chain: u32, index: u32) -> Self {
        Self {
            scheme,
            account,
            chain,
            index,
        }
    }

    pub fn staking(account: u32) -> Self {
        Self::new(AddressScheme::Current, account, Self::STAKING, 0)
    }
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let purpose = match self.scheme {
            AddressScheme::Legacy => 44,
            AddressScheme::Current => 1852,
        };
        write!(
            f,
            "m/{purpose}'/1815'/{}'/{}/{}",
            self.account, self.chain, self.index
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Witness {
    /// Bootstrap witness for legacy addresses
    Legacy {
        public_key: PublicKey,
        signature: Signature,
        chain_code: ChainCode,
        /// Raw CBOR of the spending address attributes
        attributes: Vec<u8>,
    },
    Current {
        public_key: PublicKey,
        signature: Signature,
    },
}

impl Witness {
    pub fn scheme(&self) -> AddressScheme {
        match self {
            Witness::Legacy { .. } => AddressScheme::Legacy,
            Witness::Current { .. } => AddressScheme::Current,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        match self {
            Witness::Legacy { public_key, .. } | Witness::Current { public_key, .. } => public_key,
        }
    }

    pub fn signature(&self) -> &Signature {
        match self {
            Witness::Legacy { signature, .. } | Witness::Current { signature, .. } => signature,
        }
    }
}

/// Witnesses grouped by scheme, each group in signing order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WitnessSet {
    pub current: Vec<Witness>,
    pub legacy: Vec<Witness>,
}

impl WitnessSet {
    pub fn push(&mut self, witness: Witness) {
        match witness.scheme() {
            AddressScheme::Current => self.current.push(witness),
            AddressScheme::Legacy => self.legacy.push(witness),
        }
    }

    pub fn len(&self) -> usize {
        self.current.len() + self.legacy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Witness> {
        self.current.iter().chain(self.legacy.iter())
    }
}

/// Builder output: a balanced body plus what the signer needs to authorise it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTx {
    pub era: Era,
    pub body: UnsignedTxBody,
    pub metadata: Option<TxMetadata>,
    /// UTXOs consumed, in body input order
    pub spent: Vec<UnspentOutput>,
    /// Position of the change output in `body.outputs`, if one was added
    pub change_index: Option<usize>,
}

impl UnsignedTx {
    pub fn input_total(&self) -> Option<Value> {
        Value::sum(self.spent.iter().map(|utxo| &utxo.value))
    }

    /// Fee the ledger will collect: inputs minus outputs
    pub fn implied_fee(&self) -> Option<Lovelace> {
        let remainder = self.input_total()?.checked_sub(&self.body.output_total()?)?;
        remainder.assets.is_empty().then_some(remainder.coin)
    }
}

/// Fully witnessed transaction, ready to encode and submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTx {
    pub era: Era,
    pub body: UnsignedTxBody,
    pub witnesses: WitnessSet,
    pub metadata: Option<TxMetadata>,
}
