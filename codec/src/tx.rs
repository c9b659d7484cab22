//! Transaction body, signed envelope and transaction id

use crate::byron::{
    decode_legacy_signed, legacy_signing_message, legacy_transaction_id, write_legacy_signed,
};
use crate::certs::{decode_certificate, write_certificate};
use crate::utils::*;
use crate::utxo::{decode_input, decode_output, write_input, write_output};
use crate::witness::{decode_witness_set, write_witness_set};
use minicbor::{Decoder, data::Type};
use sendada_common::{crypto::blake2b_256, *};

const BODY_INPUTS: u64 = 0;
const BODY_OUTPUTS: u64 = 1;
const BODY_FEE: u64 = 2;
const BODY_TTL: u64 = 3;
const BODY_CERTIFICATES: u64 = 4;
const BODY_WITHDRAWALS: u64 = 5;
const BODY_METADATA_HASH: u64 = 7;

pub fn write_body(body: &UnsignedTxBody, e: &mut CborEncoder) -> Result<(), WalletError> {
    let fields = 3
        + body.ttl.is_some() as u64
        + !body.certificates.is_empty() as u64
        + !body.withdrawals.is_empty() as u64
        + body.metadata_hash.is_some() as u64;
    e.map(fields)?;

    // Inputs and outputs keep the indefinite-length form of the legacy wire convention
    e.u64(BODY_INPUTS)?.begin_array()?;
    for input in &body.inputs {
        write_input(input, e)?;
    }
    e.end()?;

    e.u64(BODY_OUTPUTS)?.begin_array()?;
    for output in &body.outputs {
        write_output(output, e)?;
    }
    e.end()?;

    e.u64(BODY_FEE)?.u64(body.fee)?;

    if let Some(ttl) = body.ttl {
        e.u64(BODY_TTL)?.u64(ttl)?;
    }

    if !body.certificates.is_empty() {
        e.u64(BODY_CERTIFICATES)?.array(body.certificates.len() as u64)?;
        for cert in &body.certificates {
            write_certificate(cert, e)?;
        }
    }

    if !body.withdrawals.is_empty() {
        e.u64(BODY_WITHDRAWALS)?.map(body.withdrawals.len() as u64)?;
        for withdrawal in &body.withdrawals {
            e.bytes(&withdrawal.reward_account.to_binary())?.u64(withdrawal.amount)?;
        }
    }

    if let Some(hash) = &body.metadata_hash {
        e.u64(BODY_METADATA_HASH)?.bytes(hash.as_ref())?;
    }
    Ok(())
}

fn decode_withdrawal(d: &mut Decoder) -> Result<Withdrawal, WalletError> {
    let reward_account = StakeAddress::from_binary(d.bytes()?)
        .map_err(|e| WalletError::malformed(format!("withdrawal account: {e}")))?;
    Ok(Withdrawal {
        reward_account,
        amount: d.u64()?,
    })
}

pub fn decode_body_from(d: &mut Decoder) -> Result<UnsignedTxBody, WalletError> {
    let mut body = UnsignedTxBody::default();
    let mut last_key = None;
    let mut required = 0;
    decode_map(d, "transaction body", |d| {
        let key = d.u64()?;
        if last_key.is_some_and(|last| key <= last) {
            return Err(WalletError::malformed(format!(
                "transaction body: key {key} out of order or repeated"
            )));
        }
        last_key = Some(key);
        if key <= BODY_FEE {
            required += 1;
        }

        match key {
            BODY_INPUTS => body.inputs = decode_array(d, "inputs", decode_input)?,
            BODY_OUTPUTS => body.outputs = decode_array(d, "outputs", decode_output)?,
            BODY_FEE => body.fee = d.u64()?,
            BODY_TTL => body.ttl = Some(d.u64()?),
            BODY_CERTIFICATES => {
                body.certificates = decode_array(d, "certificates", decode_certificate)?
            }
            BODY_WITHDRAWALS => {
                let withdrawals = decode_map(d, "withdrawals", decode_withdrawal)?;
                for (i, withdrawal) in withdrawals.iter().enumerate() {
                    if withdrawals[..i]
                        .iter()
                        .any(|w| w.reward_account == withdrawal.reward_account)
                    {
                        return Err(WalletError::malformed("withdrawals: duplicate account"));
                    }
                }
                body.withdrawals = withdrawals;
            }
            BODY_METADATA_HASH => body.metadata_hash = Some(decode_hash(d, "metadata hash")?),
            other => {
                return Err(WalletError::malformed(format!(
                    "transaction body: unsupported key {other}"
                )));
            }
        }
        Ok(())
    })?;

    if required != 3 {
        return Err(WalletError::malformed(
            "transaction body: missing inputs, outputs or fee",
        ));
    }
    Ok(body)
}

/// Canonical body bytes, as hashed into the transaction id
pub fn encode_body(body: &UnsignedTxBody) -> Result<Vec<u8>, WalletError> {
    to_vec(|e| write_body(body, e))
}

pub fn decode_body(bytes: &[u8]) -> Result<UnsignedTxBody, WalletError> {
    let mut d = Decoder::new(bytes);
    let body = decode_body_from(&mut d)?;
    expect_end(&d, "transaction body")?;
    Ok(body)
}

/// Blake2b-256 of the body-only encoding
pub fn transaction_id(body: &UnsignedTxBody) -> Result<TxHash, WalletError> {
    Ok(blake2b_256(&encode_body(body)?))
}

/// Transaction id under the era's wire format
pub fn era_transaction_id(era: Era, body: &UnsignedTxBody) -> Result<TxHash, WalletError> {
    match era {
        Era::Byron => legacy_transaction_id(body),
        Era::Shelley => transaction_id(body),
    }
}

/// Bytes a witness key signs for this body
pub fn signing_message(
    era: Era,
    body: &UnsignedTxBody,
    protocol_magic: u32,
) -> Result<Vec<u8>, WalletError> {
    let id = era_transaction_id(era, body)?;
    match era {
        Era::Byron => legacy_signing_message(&id, protocol_magic),
        Era::Shelley => Ok(id.to_vec()),
    }
}

/// Auxiliary metadata: a single CBOR map, kept as its exact bytes
pub fn decode_metadata(bytes: &[u8]) -> Result<TxMetadata, WalletError> {
    let mut d = Decoder::new(bytes);
    if !matches!(d.datatype()?, Type::Map | Type::MapIndef) {
        return Err(WalletError::malformed("metadata: expected a map"));
    }
    TxMetadata::new(bytes.to_vec())
}

fn write_signed(signed: &SignedTx, e: &mut CborEncoder) -> Result<(), WalletError> {
    e.array(3)?;
    write_body(&signed.body, e)?;
    write_witness_set(&signed.witnesses, e)?;
    match &signed.metadata {
        Some(metadata) => write_raw(e, metadata.as_bytes()),
        None => {
            e.null()?;
        }
    }
    Ok(())
}

/// Wire form of a signed transaction, in the format of its era
pub fn encode_signed(signed: &SignedTx) -> Result<Vec<u8>, WalletError> {
    match signed.era {
        Era::Byron => to_vec(|e| write_legacy_signed(signed, e)),
        Era::Shelley => to_vec(|e| write_signed(signed, e)),
    }
}

pub fn decode_signed(era: Era, bytes: &[u8]) -> Result<SignedTx, WalletError> {
    if era == Era::Byron {
        return decode_legacy_signed(bytes);
    }

    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 3, "signed transaction")?;
    let body = decode_body_from(&mut d)?;
    let witnesses = decode_witness_set(&mut d)?;
    let metadata = decode_nullable(&mut d, |d| decode_metadata(raw_item(d)?))?;
    expect_end(&d, "signed transaction")?;

    if body.metadata_hash != metadata.as_ref().map(TxMetadata::hash) {
        return Err(WalletError::malformed(
            "signed transaction: metadata does not match the body's metadata hash",
        ));
    }

    Ok(SignedTx {
        era: Era::Shelley,
        body,
        witnesses,
        metadata,
    })
}
