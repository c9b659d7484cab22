use minicbor::{Decoder, Encoder, data::Type};
use sendada_common::{WalletError, hash::Hash};

/// Every encoder in this crate writes into memory
pub type CborEncoder = Encoder<Vec<u8>>;

/// Run `write` against a fresh in-memory encoder
pub fn to_vec<F>(write: F) -> Result<Vec<u8>, WalletError>
where
    F: FnOnce(&mut CborEncoder) -> Result<(), WalletError>,
{
    let mut e = Encoder::new(Vec::new());
    write(&mut e)?;
    Ok(e.into_writer())
}

/// Splice already-encoded CBOR into the output
pub fn write_raw(e: &mut CborEncoder, raw: &[u8]) {
    e.writer_mut().extend_from_slice(raw);
}

/// Consume an array header of exactly `len` elements
pub fn expect_array(d: &mut Decoder, len: u64, what: &str) -> Result<(), WalletError> {
    match d.array()? {
        Some(n) if n == len => Ok(()),
        Some(n) => Err(WalletError::malformed(format!(
            "{what}: expected {len} elements, found {n}"
        ))),
        None => Err(WalletError::malformed(format!(
            "{what}: expected {len} elements, found indefinite array"
        ))),
    }
}

/// Consume a break marker closing an indefinite container
fn consume_break(d: &mut Decoder) {
    d.set_position(d.position() + 1);
}

/// Decode each element of an array, definite or indefinite
pub fn decode_array<T, F>(d: &mut Decoder, what: &str, mut item: F) -> Result<Vec<T>, WalletError>
where
    F: FnMut(&mut Decoder) -> Result<T, WalletError>,
{
    if !matches!(d.datatype()?, Type::Array | Type::ArrayIndef) {
        return Err(WalletError::malformed(format!("{what}: expected an array")));
    }
    let mut items = Vec::new();
    match d.array()? {
        Some(n) => {
            for _ in 0..n {
                items.push(item(d)?);
            }
        }
        None => {
            while d.datatype()? != Type::Break {
                items.push(item(d)?);
            }
            consume_break(d);
        }
    }
    Ok(items)
}

/// Decode each key/value pair of a map, definite or indefinite
pub fn decode_map<T, F>(d: &mut Decoder, what: &str, mut entry: F) -> Result<Vec<T>, WalletError>
where
    F: FnMut(&mut Decoder) -> Result<T, WalletError>,
{
    if !matches!(d.datatype()?, Type::Map | Type::MapIndef) {
        return Err(WalletError::malformed(format!("{what}: expected a map")));
    }
    let mut entries = Vec::new();
    match d.map()? {
        Some(n) => {
            for _ in 0..n {
                entries.push(entry(d)?);
            }
        }
        None => {
            while d.datatype()? != Type::Break {
                entries.push(entry(d)?);
            }
            consume_break(d);
        }
    }
    Ok(entries)
}

pub fn decode_hash<const N: usize>(d: &mut Decoder, what: &str) -> Result<Hash<N>, WalletError> {
    let bytes = d.bytes()?;
    Hash::try_from(bytes).map_err(|_| {
        WalletError::malformed(format!("{what}: expected {N} bytes, found {}", bytes.len()))
    })
}

/// Byte span of the next data item, without interpreting it
pub fn raw_item<'b>(d: &mut Decoder<'b>) -> Result<&'b [u8], WalletError> {
    let start = d.position();
    d.skip()?;
    Ok(&d.input()[start..d.position()])
}

/// `None` if the next item is CBOR null, otherwise decode it
pub fn decode_nullable<T, F>(d: &mut Decoder, item: F) -> Result<Option<T>, WalletError>
where
    F: FnOnce(&mut Decoder) -> Result<T, WalletError>,
{
    if d.datatype()? == Type::Null {
        d.null()?;
        Ok(None)
    } else {
        item(d).map(Some)
    }
}

pub fn expect_end(d: &Decoder, what: &str) -> Result<(), WalletError> {
    let trailing = d.input().len() - d.position();
    if trailing != 0 {
        return Err(WalletError::malformed(format!(
            "{what}: {trailing} trailing bytes"
        )));
    }
    Ok(())
}
