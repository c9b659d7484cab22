//! Witness set: key 0 plain vkey witnesses, key 2 bootstrap (legacy) witnesses

use crate::utils::*;
use minicbor::Decoder;
use sendada_common::{
    crypto::{ChainCode, PublicKey, Signature},
    *,
};

const WITNESS_KEY_CURRENT: u64 = 0;
const WITNESS_KEY_LEGACY: u64 = 2;

fn wrong_group(expected: &str) -> WalletError {
    WalletError::Encoding(format!("non-{expected} witness in the {expected} group"))
}

pub fn write_witness_set(witnesses: &WitnessSet, e: &mut CborEncoder) -> Result<(), WalletError> {
    let groups = [!witnesses.current.is_empty(), !witnesses.legacy.is_empty()];
    e.map(groups.iter().filter(|present| **present).count() as u64)?;

    if !witnesses.current.is_empty() {
        e.u64(WITNESS_KEY_CURRENT)?.array(witnesses.current.len() as u64)?;
        for witness in &witnesses.current {
            let Witness::Current {
                public_key,
                signature,
            } = witness
            else {
                return Err(wrong_group("current"));
            };
            e.array(2)?.bytes(public_key.as_ref())?.bytes(signature.as_ref())?;
        }
    }

    if !witnesses.legacy.is_empty() {
        e.u64(WITNESS_KEY_LEGACY)?.array(witnesses.legacy.len() as u64)?;
        for witness in &witnesses.legacy {
            let Witness::Legacy {
                public_key,
                signature,
                chain_code,
                attributes,
            } = witness
            else {
                return Err(wrong_group("legacy"));
            };
            e.array(4)?
                .bytes(public_key.as_ref())?
                .bytes(signature.as_ref())?
                .bytes(chain_code.as_ref())?
                .bytes(attributes)?;
        }
    }
    Ok(())
}

fn key_material<T>(d: &mut Decoder, what: &str) -> Result<T, WalletError>
where
    T: for<'a> TryFrom<&'a [u8]>,
{
    let bytes = d.bytes()?;
    T::try_from(bytes).map_err(|_| {
        WalletError::malformed(format!("{what}: unexpected length {}", bytes.len()))
    })
}

fn decode_current_witness(d: &mut Decoder) -> Result<Witness, WalletError> {
    expect_array(d, 2, "vkey witness")?;
    Ok(Witness::Current {
        public_key: key_material::<PublicKey>(d, "vkey witness key")?,
        signature: key_material::<Signature>(d, "vkey witness signature")?,
    })
}

fn decode_legacy_witness(d: &mut Decoder) -> Result<Witness, WalletError> {
    expect_array(d, 4, "bootstrap witness")?;
    Ok(Witness::Legacy {
        public_key: key_material::<PublicKey>(d, "bootstrap witness key")?,
        signature: key_material::<Signature>(d, "bootstrap witness signature")?,
        chain_code: key_material::<ChainCode>(d, "bootstrap witness chain code")?,
        attributes: d.bytes()?.to_vec(),
    })
}

pub fn decode_witness_set(d: &mut Decoder) -> Result<WitnessSet, WalletError> {
    let mut witnesses = WitnessSet::default();
    let mut seen = Vec::new();
    decode_map(d, "witness set", |d| {
        let key = d.u64()?;
        if seen.contains(&key) {
            return Err(WalletError::malformed(format!("witness set: duplicate key {key}")));
        }
        seen.push(key);
        match key {
            WITNESS_KEY_CURRENT => {
                witnesses.current = decode_array(d, "vkey witnesses", decode_current_witness)?
            }
            WITNESS_KEY_LEGACY => {
                witnesses.legacy = decode_array(d, "bootstrap witnesses", decode_legacy_witness)?
            }
            other => {
                return Err(WalletError::malformed(format!(
                    "witness set: unsupported key {other}"
                )));
            }
        }
        Ok(())
    })?;
    Ok(witnesses)
}
