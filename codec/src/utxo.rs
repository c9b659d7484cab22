//! Inputs, outputs and amounts

use crate::utils::*;
use minicbor::{Decoder, data::Type};
use sendada_common::*;

pub fn write_input(input: &TxInput, e: &mut CborEncoder) -> Result<(), WalletError> {
    e.array(2)?.bytes(input.tx_hash.as_ref())?.u64(input.index)?;
    Ok(())
}

pub fn decode_input(d: &mut Decoder) -> Result<TxInput, WalletError> {
    expect_array(d, 2, "input")?;
    let tx_hash = decode_hash(d, "input transaction id")?;
    let index = d.u64()?;
    Ok(TxInput::new(tx_hash, index))
}

pub fn write_bundle(bundle: &TokenBundle, e: &mut CborEncoder) -> Result<(), WalletError> {
    e.map(bundle.policies().count() as u64)?;
    for (policy, assets) in bundle.policies() {
        e.bytes(policy.as_ref())?.map(assets.len() as u64)?;
        for (name, quantity) in assets {
            e.bytes(name.as_slice())?.u64(*quantity)?;
        }
    }
    Ok(())
}

pub fn decode_bundle(d: &mut Decoder) -> Result<TokenBundle, WalletError> {
    let mut bundle = TokenBundle::new();
    let entries = decode_map(d, "token bundle", |d| {
        let policy: PolicyId = decode_hash(d, "policy id")?;
        let assets = decode_map(d, "policy assets", |d| {
            let name = AssetName::new(d.bytes()?)
                .ok_or_else(|| WalletError::malformed("asset name longer than 32 bytes"))?;
            let quantity = d.u64()?;
            Ok((name, quantity))
        })?;
        Ok((policy, assets))
    })?;

    for (policy, assets) in entries {
        if assets.is_empty() {
            return Err(WalletError::malformed(format!("policy {policy} has no assets")));
        }
        for (name, quantity) in assets {
            if quantity == 0 {
                return Err(WalletError::malformed(format!("zero quantity of {policy}.{name}")));
            }
            if bundle.quantity(&policy, &name) != 0 {
                return Err(WalletError::malformed(format!("duplicate asset {policy}.{name}")));
            }
            bundle
                .insert(policy, name, quantity)
                .ok_or_else(|| WalletError::malformed("asset quantity overflow"))?;
        }
    }
    Ok(bundle)
}

/// Bare coin when there are no tokens, `[coin, bundle]` otherwise
pub fn write_value(value: &Value, e: &mut CborEncoder) -> Result<(), WalletError> {
    if value.assets.is_empty() {
        e.u64(value.coin)?;
    } else {
        e.array(2)?.u64(value.coin)?;
        write_bundle(&value.assets, e)?;
    }
    Ok(())
}

pub fn decode_value(d: &mut Decoder) -> Result<Value, WalletError> {
    match d.datatype()? {
        Type::U8 | Type::U16 | Type::U32 | Type::U64 => Ok(Value::lovelace(d.u64()?)),
        Type::Array => {
            expect_array(d, 2, "amount")?;
            let coin = d.u64()?;
            let assets = decode_bundle(d)?;
            if assets.is_empty() {
                return Err(WalletError::malformed("amount tuple with an empty token bundle"));
            }
            Ok(Value::new(coin, assets))
        }
        other => Err(WalletError::malformed(format!("amount: unexpected {other}"))),
    }
}

pub fn write_output(output: &TxOutput, e: &mut CborEncoder) -> Result<(), WalletError> {
    e.array(2)?.bytes(&output.address.to_bytes())?;
    write_value(&output.value, e)
}

pub fn decode_output(d: &mut Decoder) -> Result<TxOutput, WalletError> {
    expect_array(d, 2, "output")?;
    let address = Address::from_bytes(d.bytes()?)
        .map_err(|e| WalletError::malformed(format!("output address: {e}")))?;
    let value = decode_value(d)?;
    Ok(TxOutput::new(address, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn bundle() -> TokenBundle {
        [
            (PolicyId::new([1; 28]), AssetName::new(b"bb").unwrap(), 2),
            (PolicyId::new([1; 28]), AssetName::new(b"a").unwrap(), 1),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn plain_coin_is_a_bare_integer() {
        let bytes = to_vec(|e| write_value(&Value::lovelace(47), e)).unwrap();
        assert_eq!(hex::encode(&bytes), "182f");
    }

    #[test]
    fn bundle_names_are_written_in_canonical_order() {
        let bytes = to_vec(|e| write_value(&Value::new(1_000_000, bundle()), e)).unwrap();
        let expected = format!(
            "821a000f4240a1581c{}a2416101426262{}",
            "01".repeat(28),
            "02"
        );
        assert_eq!(hex::encode(&bytes), expected);

        let decoded = decode_value(&mut Decoder::new(&bytes)).unwrap();
        assert_eq!(decoded, Value::new(1_000_000, bundle()));
    }

    #[test_case("8201a0" ; "empty bundle in tuple")]
    #[test_case("8301a000" ; "three element amount")]
    #[test_case("40" ; "byte string amount")]
    fn malformed_amounts_are_rejected(hex_bytes: &str) {
        let bytes = hex::decode(hex_bytes).unwrap();
        assert!(matches!(
            decode_value(&mut Decoder::new(&bytes)),
            Err(WalletError::MalformedEncoding(_))
        ));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let bytes = hex::decode(format!("8201a1581c{}a14000", "01".repeat(28))).unwrap();
        assert!(decode_value(&mut Decoder::new(&bytes)).is_err());
    }

    #[test]
    fn input_round_trip() {
        let input = TxInput::new(TxHash::new([9; 32]), 3);
        let bytes = to_vec(|e| write_input(&input, e)).unwrap();
        assert_eq!(&bytes[..3], &[0x82, 0x58, 0x20]);
        assert_eq!(decode_input(&mut Decoder::new(&bytes)).unwrap(), input);
    }
}
