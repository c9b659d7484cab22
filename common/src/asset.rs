//! Amounts: lovelace plus an optional bundle of native tokens

use crate::hash::PolicyId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

pub type Lovelace = u64;

/// Native token name, at most 32 bytes
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct AssetName {
    len: u8,
    bytes: [u8; 32],
}

impl AssetName {
    pub const MAX_LEN: usize = 32;

    pub fn new(data: &[u8]) -> Option<Self> {
        if data.len() > Self::MAX_LEN {
            return None;
        }
        let mut bytes = [0u8; 32];
        bytes[..data.len()].copy_from_slice(data);
        Some(Self {
            len: data.len() as u8,
            bytes,
        })
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

// Canonical CBOR key order: shorter keys first, then bytewise
impl Ord for AssetName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.len.cmp(&other.len).then_with(|| self.as_slice().cmp(other.as_slice()))
    }
}

impl PartialOrd for AssetName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AssetName").field(&hex::encode(self.as_slice())).finish()
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.as_slice()))
    }
}

impl Serialize for AssetName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(self.as_slice()))
    }
}

impl<'de> Deserialize<'de> for AssetName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text: String = Deserialize::deserialize(deserializer)?;
        let bytes = hex::decode(&text).map_err(serde::de::Error::custom)?;
        AssetName::new(&bytes)
            .ok_or_else(|| serde::de::Error::custom(format!("asset name too long: {text}")))
    }
}

/// Policy -> asset name -> quantity. Never holds zero quantities or empty policies.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenBundle(BTreeMap<PolicyId, BTreeMap<AssetName, u64>>);

/// Structural summary of a bundle, all the min-ada rule looks at
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BundleShape {
    pub policies: usize,
    pub assets: usize,
    pub name_bytes: usize,
}

impl BundleShape {
    pub fn is_empty(&self) -> bool {
        self.assets == 0
    }
}

impl TokenBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn quantity(&self, policy: &PolicyId, name: &AssetName) -> u64 {
        self.0.get(policy).and_then(|assets| assets.get(name)).copied().unwrap_or(0)
    }

    /// Add `quantity` of one asset; `None` on overflow
    pub fn insert(&mut self, policy: PolicyId, name: AssetName, quantity: u64) -> Option<()> {
        if quantity == 0 {
            return Some(());
        }
        let entry = self.0.entry(policy).or_default().entry(name).or_insert(0);
        *entry = entry.checked_add(quantity)?;
        Some(())
    }

    /// Iterate `(policy, name, quantity)` in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (&PolicyId, &AssetName, u64)> + '_ {
        self.0
            .iter()
            .flat_map(|(policy, assets)| assets.iter().map(move |(name, qty)| (policy, name, *qty)))
    }

    pub fn policies(&self) -> impl Iterator<Item = (&PolicyId, &BTreeMap<AssetName, u64>)> + '_ {
        self.0.iter()
    }

    pub fn shape(&self) -> BundleShape {
        BundleShape {
            policies: self.0.len(),
            assets: self.0.values().map(BTreeMap::len).sum(),
            name_bytes: self.0.values().flat_map(BTreeMap::keys).map(AssetName::len).sum(),
        }
    }

    pub fn checked_add(&self, other: &TokenBundle) -> Option<TokenBundle> {
        let mut sum = self.clone();
        for (policy, name, quantity) in other.iter() {
            sum.insert(*policy, *name, quantity)?;
        }
        Some(sum)
    }

    /// `None` if any asset would go negative
    pub fn checked_sub(&self, other: &TokenBundle) -> Option<TokenBundle> {
        let mut difference = self.clone();
        for (policy, name, quantity) in other.iter() {
            let assets = difference.0.get_mut(policy)?;
            let held = assets.get_mut(name)?;
            *held = held.checked_sub(quantity)?;
            if *held == 0 {
                assets.remove(name);
            }
            if assets.is_empty() {
                difference.0.remove(policy);
            }
        }
        Some(difference)
    }

    /// First asset in `other` this bundle holds less of, with both quantities
    pub fn first_shortfall(&self, other: &TokenBundle) -> Option<(PolicyId, AssetName, u64, u64)> {
        other.iter().find_map(|(policy, name, wanted)| {
            let held = self.quantity(policy, name);
            (held < wanted).then_some((*policy, *name, wanted, held))
        })
    }

    /// Whether this bundle holds any of the assets named in `other`
    pub fn intersects(&self, other: &TokenBundle) -> bool {
        other.iter().any(|(policy, name, _)| self.quantity(policy, name) > 0)
    }
}

impl FromIterator<(PolicyId, AssetName, u64)> for TokenBundle {
    fn from_iter<I: IntoIterator<Item = (PolicyId, AssetName, u64)>>(iter: I) -> Self {
        let mut bundle = TokenBundle::new();
        for (policy, name, quantity) in iter {
            let entry = bundle.0.entry(policy).or_default().entry(name).or_insert(0);
            *entry = entry.saturating_add(quantity);
        }
        bundle.0.retain(|_, assets| {
            assets.retain(|_, quantity| *quantity > 0);
            !assets.is_empty()
        });
        bundle
    }
}

/// An amount of lovelace plus native tokens
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub coin: Lovelace,
    #[serde(default, skip_serializing_if = "TokenBundle::is_empty")]
    pub assets: TokenBundle,
}

impl Value {
    pub fn new(coin: Lovelace, assets: TokenBundle) -> Self {
        Self { coin, assets }
    }

    pub fn lovelace(coin: Lovelace) -> Self {
        Self {
            coin,
            assets: TokenBundle::new(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coin == 0 && self.assets.is_empty()
    }

    pub fn checked_add(&self, other: &Value) -> Option<Value> {
        Some(Value {
            coin: self.coin.checked_add(other.coin)?,
            assets: self.assets.checked_add(&other.assets)?,
        })
    }

    pub fn checked_sub(&self, other: &Value) -> Option<Value> {
        Some(Value {
            coin: self.coin.checked_sub(other.coin)?,
            assets: self.assets.checked_sub(&other.assets)?,
        })
    }

    /// Sum of many values; `None` on overflow
    pub fn sum<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Value> {
        values.into_iter().try_fold(Value::default(), |acc, v| acc.checked_add(v))
    }
}
