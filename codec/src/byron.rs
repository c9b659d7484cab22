//! Legacy (Byron) transaction format
//!
//! The body travels as `[inputs, outputs, attributes]` with indefinite input and output
//! arrays, each input wrapped as CBOR-in-CBOR. The fee is implicit: whatever the inputs
//! hold beyond the outputs.

use crate::utils::*;
use minicbor::{Decoder, data::Tag};
use sendada_common::{
    crypto::{ExtendedPublicKey, Signature, blake2b_256},
    *,
};

const CBOR_IN_CBOR: u64 = 24;
const INPUT_KIND_UTXO: u64 = 0;
const WITNESS_KIND_PUBLIC_KEY: u64 = 0;

fn unsupported(what: &str) -> WalletError {
    WalletError::InvalidRequest(format!("{what} cannot be carried by a legacy transaction"))
}

fn check_legacy_body(body: &UnsignedTxBody) -> Result<(), WalletError> {
    if body.ttl.is_some() {
        return Err(unsupported("a time-to-live"));
    }
    if !body.certificates.is_empty() {
        return Err(unsupported("certificates"));
    }
    if !body.withdrawals.is_empty() {
        return Err(unsupported("withdrawals"));
    }
    if body.metadata_hash.is_some() {
        return Err(unsupported("metadata"));
    }
    for output in &body.outputs {
        if !output.value.assets.is_empty() {
            return Err(unsupported("native tokens"));
        }
        if !matches!(output.address, Address::Byron(_)) {
            return Err(unsupported(&format!("output address {}", output.address)));
        }
    }
    Ok(())
}

fn write_legacy_aux(body: &UnsignedTxBody, e: &mut CborEncoder) -> Result<(), WalletError> {
    check_legacy_body(body)?;
    e.array(3)?;

    e.begin_array()?;
    for input in &body.inputs {
        let payload = to_vec(|e| crate::utxo::write_input(input, e))?;
        e.array(2)?
            .u64(INPUT_KIND_UTXO)?
            .tag(Tag::new(CBOR_IN_CBOR))?
            .bytes(&payload)?;
    }
    e.end()?;

    e.begin_array()?;
    for output in &body.outputs {
        e.array(2)?;
        // Byron addresses are inline CBOR, not a byte string
        write_raw(e, &output.address.to_bytes());
        e.u64(output.value.coin)?;
    }
    e.end()?;

    e.map(0)?;
    Ok(())
}

/// Legacy body bytes; the transaction id is their Blake2b-256
pub fn encode_legacy_aux(body: &UnsignedTxBody) -> Result<Vec<u8>, WalletError> {
    to_vec(|e| write_legacy_aux(body, e))
}

pub fn legacy_transaction_id(body: &UnsignedTxBody) -> Result<TxHash, WalletError> {
    Ok(blake2b_256(&encode_legacy_aux(body)?))
}

/// `0x01 || cbor(protocol_magic) || cbor(bytes(tx_id))`
pub fn legacy_signing_message(tx_id: &TxHash, protocol_magic: u32) -> Result<Vec<u8>, WalletError> {
    let mut message = vec![0x01];
    message.extend(to_vec(|e| {
        e.u32(protocol_magic)?.bytes(tx_id.as_ref())?;
        Ok(())
    })?);
    Ok(message)
}

fn expect_cbor_in_cbor<'b>(d: &mut Decoder<'b>, what: &str) -> Result<&'b [u8], WalletError> {
    let tag = d.tag()?;
    if tag.as_u64() != CBOR_IN_CBOR {
        return Err(WalletError::malformed(format!(
            "{what}: expected tag 24, found {}",
            tag.as_u64()
        )));
    }
    Ok(d.bytes()?)
}

fn decode_legacy_input(d: &mut Decoder) -> Result<TxInput, WalletError> {
    expect_array(d, 2, "legacy input")?;
    let kind = d.u64()?;
    if kind != INPUT_KIND_UTXO {
        return Err(WalletError::malformed(format!("legacy input: unknown kind {kind}")));
    }
    let payload = expect_cbor_in_cbor(d, "legacy input")?;
    let mut inner = Decoder::new(payload);
    let input = crate::utxo::decode_input(&mut inner)?;
    expect_end(&inner, "legacy input payload")?;
    Ok(input)
}

fn decode_legacy_output(d: &mut Decoder) -> Result<TxOutput, WalletError> {
    expect_array(d, 2, "legacy output")?;
    let raw = raw_item(d)?;
    let address = ByronAddress::from_bytes(raw)
        .map_err(|e| WalletError::malformed(format!("legacy output address: {e}")))?;
    Ok(TxOutput::new(Address::Byron(address), Value::lovelace(d.u64()?)))
}

fn decode_legacy_aux_from(d: &mut Decoder) -> Result<UnsignedTxBody, WalletError> {
    expect_array(d, 3, "legacy transaction")?;
    let inputs = decode_array(d, "legacy inputs", decode_legacy_input)?;
    let outputs = decode_array(d, "legacy outputs", decode_legacy_output)?;
    let attributes = decode_map(d, "legacy attributes", |d| {
        d.skip()?;
        d.skip()?;
        Ok(())
    })?;
    if !attributes.is_empty() {
        return Err(WalletError::malformed("legacy transaction: unexpected attributes"));
    }

    // Fee is implicit in this format
    Ok(UnsignedTxBody {
        inputs,
        outputs,
        ..Default::default()
    })
}

pub fn decode_legacy_aux(bytes: &[u8]) -> Result<UnsignedTxBody, WalletError> {
    let mut d = Decoder::new(bytes);
    let body = decode_legacy_aux_from(&mut d)?;
    expect_end(&d, "legacy transaction")?;
    Ok(body)
}

fn write_legacy_witness(witness: &Witness, e: &mut CborEncoder) -> Result<(), WalletError> {
    let Witness::Legacy {
        public_key,
        signature,
        chain_code,
        ..
    } = witness
    else {
        return Err(WalletError::Encoding(
            "legacy transactions carry only bootstrap witnesses".to_string(),
        ));
    };
    let xpub = ExtendedPublicKey::new(*public_key, *chain_code).to_bytes();
    let payload = to_vec(|e| {
        e.array(2)?.bytes(&xpub)?.bytes(signature.as_ref())?;
        Ok(())
    })?;
    e.array(2)?
        .u64(WITNESS_KIND_PUBLIC_KEY)?
        .tag(Tag::new(CBOR_IN_CBOR))?
        .bytes(&payload)?;
    Ok(())
}

/// Attributes are not carried by legacy witnesses, so they decode empty
fn decode_legacy_witness(d: &mut Decoder) -> Result<Witness, WalletError> {
    expect_array(d, 2, "legacy witness")?;
    let kind = d.u64()?;
    if kind != WITNESS_KIND_PUBLIC_KEY {
        return Err(WalletError::malformed(format!(
            "legacy witness: unsupported kind {kind}"
        )));
    }
    let payload = expect_cbor_in_cbor(d, "legacy witness")?;
    let mut inner = Decoder::new(payload);
    expect_array(&mut inner, 2, "legacy witness payload")?;
    let xpub = ExtendedPublicKey::from_bytes(inner.bytes()?)
        .map_err(|e| WalletError::malformed(format!("legacy witness key: {e}")))?;
    let signature = Signature::try_from(inner.bytes()?)
        .map_err(|e| WalletError::malformed(format!("legacy witness signature: {e}")))?;
    expect_end(&inner, "legacy witness payload")?;

    Ok(Witness::Legacy {
        public_key: xpub.key,
        signature,
        chain_code: xpub.chain_code,
        attributes: Vec::new(),
    })
}

pub fn write_legacy_signed(signed: &SignedTx, e: &mut CborEncoder) -> Result<(), WalletError> {
    if signed.metadata.is_some() {
        return Err(unsupported("metadata"));
    }
    e.array(2)?;
    write_legacy_aux(&signed.body, e)?;
    e.array(signed.witnesses.len() as u64)?;
    for witness in signed.witnesses.iter() {
        write_legacy_witness(witness, e)?;
    }
    Ok(())
}

pub fn encode_legacy_signed(signed: &SignedTx) -> Result<Vec<u8>, WalletError> {
    to_vec(|e| write_legacy_signed(signed, e))
}

pub fn decode_legacy_signed(bytes: &[u8]) -> Result<SignedTx, WalletError> {
    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 2, "legacy signed transaction")?;
    let body = decode_legacy_aux_from(&mut d)?;
    let legacy = decode_array(&mut d, "legacy witnesses", decode_legacy_witness)?;
    expect_end(&d, "legacy signed transaction")?;
    Ok(SignedTx {
        era: Era::Byron,
        body,
        witnesses: WitnessSet {
            current: Vec::new(),
            legacy,
        },
        metadata: None,
    })
}
