//! Canonical CBOR wire formats for transactions
//!
//! Two formats are supported: the current map-keyed body with its witness set, and the
//! legacy (Byron) array body with bootstrap-only witnesses.

mod byron;
mod certs;
mod tx;
mod utils;
mod utxo;
mod witness;

pub use byron::{
    decode_legacy_aux, decode_legacy_signed, encode_legacy_aux, encode_legacy_signed,
    legacy_signing_message, legacy_transaction_id,
};
pub use certs::{decode_certificate, write_certificate};
pub use tx::{
    decode_body, decode_metadata, decode_signed, encode_body, encode_signed, era_transaction_id,
    signing_message, transaction_id,
};
pub use utils::to_vec;
pub use utxo::{decode_output, decode_value, write_output, write_value};
pub use witness::{decode_witness_set, write_witness_set};

/// Witness set bytes, as appended to a body on the wire
pub fn encode_witness_set(
    witnesses: &sendada_common::WitnessSet,
) -> Result<Vec<u8>, sendada_common::WalletError> {
    to_vec(|e| write_witness_set(witnesses, e))
}
