//! Cardano address definitions: legacy (Byron) and current (Shelley) schemes plus reward addresses

use crate::hash::KeyHash;
use anyhow::{anyhow, bail, Result};
use minicbor::data::{Tag, Type};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const CRC32: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC);

/// Tag wrapping CBOR-in-CBOR payloads
const CBOR_IN_CBOR: u64 = 24;

/// Which derivation/witness family an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressScheme {
    /// Byron-era addresses, bootstrap witnesses
    Legacy,

    /// Shelley-era addresses, plain vkey witnesses
    Current,
}

impl Display for AddressScheme {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressScheme::Legacy => write!(f, "legacy"),
            AddressScheme::Current => write!(f, "current"),
        }
    }
}

/// Address network identifier
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressNetwork {
    /// Mainnet
    #[default]
    #[serde(alias = "mainnet")]
    Main,

    /// Testnet
    #[serde(alias = "testnet")]
    Test,
}

impl AddressNetwork {
    fn header_bits(&self) -> u8 {
        match self {
            AddressNetwork::Main => 0b1,
            AddressNetwork::Test => 0b0,
        }
    }

    fn from_header(header: u8) -> Self {
        match header & 0x0F {
            0b1 => AddressNetwork::Main,
            _ => AddressNetwork::Test,
        }
    }
}

/// A Byron-era address, kept as its exact CBOR bytes
///
/// Shape is `[#6.24(bytes(inner)), crc32]` with `inner = [root, attributes, type]`.
/// The attributes are carried separately because bootstrap witnesses repeat them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ByronAddress {
    raw: Vec<u8>,
    attributes: Vec<u8>,
}

impl ByronAddress {
    /// Build from its parts; `attributes` must be one CBOR map
    pub fn new(root: &KeyHash, attributes: &[u8], address_type: u64) -> Result<Self> {
        let mut inner = minicbor::Encoder::new(Vec::new());
        inner
            .array(3)
            .and_then(|e| e.bytes(root.as_ref()))
            .map_err(|e| anyhow!("Cannot encode address root: {e}"))?;
        inner.writer_mut().extend_from_slice(attributes);
        inner.u64(address_type).map_err(|e| anyhow!("Cannot encode address type: {e}"))?;
        let payload = inner.into_writer();

        let mut outer = minicbor::Encoder::new(Vec::new());
        outer
            .array(2)
            .and_then(|e| e.tag(Tag::new(CBOR_IN_CBOR)))
            .and_then(|e| e.bytes(&payload))
            .and_then(|e| e.u32(CRC32.checksum(&payload)))
            .map_err(|e| anyhow!("Cannot encode Byron address: {e}"))?;

        Self::from_bytes(&outer.into_writer())
    }

    /// Parse and checksum raw address bytes
    pub fn from_bytes(raw: &[u8]) -> Result<Self> {
        let mut d = minicbor::Decoder::new(raw);
        if d.array()? != Some(2) {
            bail!("Byron address is not a 2-element array");
        }
        let tag = d.tag()?;
        if tag.as_u64() != CBOR_IN_CBOR {
            bail!("Byron address payload has tag {}, expected 24", tag.as_u64());
        }
        let payload = d.bytes()?;
        let crc = d.u32()?;
        if d.position() != raw.len() {
            bail!("Trailing bytes after Byron address");
        }
        if CRC32.checksum(payload) != crc {
            bail!("Byron address checksum mismatch");
        }

        let mut inner = minicbor::Decoder::new(payload);
        if inner.array()? != Some(3) {
            bail!("Byron address payload is not a 3-element array");
        }
        let root = inner.bytes()?;
        if root.len() != 28 {
            bail!("Byron address root has {} bytes", root.len());
        }
        if inner.datatype()? != Type::Map {
            bail!("Byron address attributes are not a definite map");
        }
        let start = inner.position();
        inner.skip()?;
        let attributes = payload[start..inner.position()].to_vec();
        inner.u64()?;
        if inner.position() != payload.len() {
            bail!("Trailing bytes in Byron address payload");
        }

        Ok(Self {
            raw: raw.to_vec(),
            attributes,
        })
    }

    pub fn to_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Raw CBOR of the attributes map
    pub fn attributes(&self) -> &[u8] {
        &self.attributes
    }
}

/// A Shelley-era address - payment part
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShelleyAddressPaymentPart {
    /// Payment to a key
    PaymentKeyHash(KeyHash),

    /// Payment to a script
    ScriptHash(KeyHash),
}

/// Delegation pointer
#[derive(Debug, Default, Clone, Hash, PartialEq, Eq)]
pub struct ShelleyAddressPointer {
    pub slot: u64,
    pub tx_index: u64,
    pub cert_index: u64,
}

impl ShelleyAddressPointer {
    // Each field is a big-endian base-128 varint, high bit set on all but the last byte
    fn push_varint(out: &mut Vec<u8>, num: u64) {
        let mut len = 7;
        while len < 70 && (num >> len) != 0 {
            len += 7;
        }
        while len > 7 {
            len -= 7;
            out.push((num >> len) as u8 | 0x80);
        }
        out.push((num & 0x7f) as u8);
    }

    fn read_varint(data: &[u8], position: &mut usize) -> Result<u64> {
        let mut value: u64 = 0;
        while let Some(byte) = data.get(*position) {
            *position += 1;
            value = (value << 7) | (byte & 0x7F) as u64;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(anyhow!("Pointer varint ran out of data"))
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        Self::push_varint(&mut out, self.slot);
        Self::push_varint(&mut out, self.tx_index);
        Self::push_varint(&mut out, self.cert_index);
        out
    }

    fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut position = 0;
        let pointer = Self {
            slot: Self::read_varint(data, &mut position)?,
            tx_index: Self::read_varint(data, &mut position)?,
            cert_index: Self::read_varint(data, &mut position)?,
        };
        if position != data.len() {
            bail!("Trailing bytes after pointer");
        }
        Ok(pointer)
    }
}

/// A Shelley-era address - delegation part
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum ShelleyAddressDelegationPart {
    /// No delegation (enterprise addresses)
    #[default]
    None,

    /// Delegation to stake key
    StakeKeyHash(KeyHash),

    /// Delegation to script key
    ScriptHash(KeyHash),

    /// Delegation to pointer
    Pointer(ShelleyAddressPointer),
}

/// A Shelley-era address
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShelleyAddress {
    pub network: AddressNetwork,
    pub payment: ShelleyAddressPaymentPart,
    pub delegation: ShelleyAddressDelegationPart,
}

fn key_hash_at(data: &[u8], start: usize) -> Result<KeyHash> {
    data.get(start..start + 28)
        .and_then(|slice| KeyHash::try_from(slice).ok())
        .ok_or_else(|| anyhow!("Address too short for key hash at offset {start}"))
}

impl ShelleyAddress {
    /// Header byte followed by payment and delegation parts
    pub fn to_bytes(&self) -> Vec<u8> {
        let (payment_hash, payment_bits) = match &self.payment {
            ShelleyAddressPaymentPart::PaymentKeyHash(hash) => (hash, 0u8),
            ShelleyAddressPaymentPart::ScriptHash(hash) => (hash, 1u8),
        };

        let (delegation, delegation_bits) = match &self.delegation {
            ShelleyAddressDelegationPart::None => (Vec::new(), 3u8),
            ShelleyAddressDelegationPart::StakeKeyHash(hash) => (hash.to_vec(), 0),
            ShelleyAddressDelegationPart::ScriptHash(hash) => (hash.to_vec(), 1),
            ShelleyAddressDelegationPart::Pointer(pointer) => (pointer.to_bytes(), 2),
        };

        let mut data =
            vec![self.network.header_bits() | (payment_bits << 4) | (delegation_bits << 5)];
        data.extend_from_slice(payment_hash.as_ref());
        data.extend(delegation);
        data
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = *data.first().ok_or_else(|| anyhow!("Empty address data"))?;
        if header >> 4 > 7 {
            bail!("Header {header:#04x} is not a Shelley payment address");
        }

        let payment = match (header >> 4) & 0x01 {
            0 => ShelleyAddressPaymentPart::PaymentKeyHash(key_hash_at(data, 1)?),
            _ => ShelleyAddressPaymentPart::ScriptHash(key_hash_at(data, 1)?),
        };

        let (delegation, expected_len) = match (header >> 5) & 0x03 {
            0 => (ShelleyAddressDelegationPart::StakeKeyHash(key_hash_at(data, 29)?), 57),
            1 => (ShelleyAddressDelegationPart::ScriptHash(key_hash_at(data, 29)?), 57),
            2 => (
                ShelleyAddressDelegationPart::Pointer(ShelleyAddressPointer::from_bytes(
                    &data[29.min(data.len())..],
                )?),
                data.len(),
            ),
            _ => (ShelleyAddressDelegationPart::None, 29),
        };
        if data.len() != expected_len {
            bail!("Bad Shelley address length {}", data.len());
        }

        Ok(ShelleyAddress {
            network: AddressNetwork::from_header(header),
            payment,
            delegation,
        })
    }

    /// Read from string format ("addr1...")
    pub fn from_string(text: &str) -> Result<Self> {
        let (_, data) = bech32::decode(text)?;
        Self::from_bytes(&data)
    }

    /// Convert to addr1xxx form
    pub fn to_string(&self) -> Result<String> {
        let hrp = match self.network {
            AddressNetwork::Main => bech32::Hrp::parse("addr")?,
            AddressNetwork::Test => bech32::Hrp::parse("addr_test")?,
        };
        Ok(bech32::encode::<bech32::Bech32>(hrp, &self.to_bytes())?)
    }

    /// Key hash that has to witness spending from this address, if any
    pub fn payment_key_hash(&self) -> Option<&KeyHash> {
        match &self.payment {
            ShelleyAddressPaymentPart::PaymentKeyHash(hash) => Some(hash),
            ShelleyAddressPaymentPart::ScriptHash(_) => None,
        }
    }
}

/// Reference to a staking-rights holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StakeCredential {
    AddrKeyHash(KeyHash),
    ScriptHash(KeyHash),
}

impl StakeCredential {
    pub fn hash(&self) -> &KeyHash {
        match self {
            StakeCredential::AddrKeyHash(hash) | StakeCredential::ScriptHash(hash) => hash,
        }
    }
}

/// A reward (stake) address
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct StakeAddress {
    pub network: AddressNetwork,
    pub credential: StakeCredential,
}

impl StakeAddress {
    pub fn new(credential: StakeCredential, network: AddressNetwork) -> Self {
        StakeAddress {
            network,
            credential,
        }
    }

    /// Convert to binary format (29 bytes)
    pub fn to_binary(&self) -> Vec<u8> {
        let (stake_bits, hash) = match &self.credential {
            StakeCredential::AddrKeyHash(hash) => (0b1110u8, hash),
            StakeCredential::ScriptHash(hash) => (0b1111u8, hash),
        };

        let mut data = vec![self.network.header_bits() | (stake_bits << 4)];
        data.extend_from_slice(hash.as_ref());
        data
    }

    /// Read from binary format (29 bytes)
    pub fn from_binary(data: &[u8]) -> Result<Self> {
        if data.len() != 29 {
            bail!("Bad stake address length: {}", data.len());
        }

        let hash = key_hash_at(data, 1)?;
        let credential = match (data[0] >> 4) & 0x0F {
            0b1110 => StakeCredential::AddrKeyHash(hash),
            0b1111 => StakeCredential::ScriptHash(hash),
            _ => bail!("Unknown header byte {:x} in stake address", data[0]),
        };

        Ok(StakeAddress {
            network: AddressNetwork::from_header(data[0]),
            credential,
        })
    }

    /// Convert to string stake1xxx format
    pub fn to_string(&self) -> Result<String> {
        let hrp = match self.network {
            AddressNetwork::Main => bech32::Hrp::parse("stake")?,
            AddressNetwork::Test => bech32::Hrp::parse("stake_test")?,
        };
        Ok(bech32::encode::<bech32::Bech32>(hrp, &self.to_binary())?)
    }

    /// Read from a string format ("stake1xxx...")
    pub fn from_string(text: &str) -> Result<Self> {
        let (_, data) = bech32::decode(text)?;
        Self::from_binary(&data)
    }
}

/// A Cardano address, dispatched on its shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Address {
    Byron(ByronAddress),
    Shelley(ShelleyAddress),
    Stake(StakeAddress),
}

impl Address {
    /// Wire form as carried in transaction outputs
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Address::Byron(byron) => byron.to_bytes().to_vec(),
            Address::Shelley(shelley) => shelley.to_bytes(),
            Address::Stake(stake) => stake.to_binary(),
        }
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let header = *data.first().ok_or_else(|| anyhow!("Empty address data"))?;
        match header >> 4 {
            0..=7 => Ok(Address::Shelley(ShelleyAddress::from_bytes(data)?)),
            8 => Ok(Address::Byron(ByronAddress::from_bytes(data)?)),
            14 | 15 => Ok(Address::Stake(StakeAddress::from_binary(data)?)),
            _ => bail!("Unknown address header {header:#04x}"),
        }
    }

    /// Witness family; reward addresses are keyed like current addresses
    pub fn scheme(&self) -> AddressScheme {
        match self {
            Address::Byron(_) => AddressScheme::Legacy,
            Address::Shelley(_) | Address::Stake(_) => AddressScheme::Current,
        }
    }

    /// Network named in the header; legacy addresses carry none
    pub fn network(&self) -> Option<AddressNetwork> {
        match self {
            Address::Byron(_) => None,
            Address::Shelley(shelley) => Some(shelley.network),
            Address::Stake(stake) => Some(stake.network),
        }
    }

    /// Read from string format ("addr1...", "stake1...", or base58 for Byron)
    pub fn from_string(text: &str) -> Result<Self> {
        if text.starts_with("addr1") || text.starts_with("addr_test1") {
            Ok(Self::Shelley(ShelleyAddress::from_string(text)?))
        } else if text.starts_with("stake1") || text.starts_with("stake_test1") {
            Ok(Self::Stake(StakeAddress::from_string(text)?))
        } else {
            let bytes = bs58::decode(text).into_vec()?;
            Ok(Self::Byron(ByronAddress::from_bytes(&bytes)?))
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Address::Byron(byron) => Ok(bs58::encode(byron.to_bytes()).into_string()),
            Address::Shelley(shelley) => shelley.to_string(),
            Address::Stake(stake) => stake.to_string(),
        };
        f.write_str(&text.map_err(|_| std::fmt::Error)?)
    }
}

impl FromStr for Address {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}
