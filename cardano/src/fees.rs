//! Linear fee and minimum-ada rules

use sendada_common::{BundleShape, LinearFee, Lovelace, WalletError};

/// Fixed per-UTXO overhead in words, used by the token min-ada scale
const UTXO_ENTRY_WORDS: u64 = 27;
const BUNDLE_BASE_WORDS: u64 = 6;
const ASSET_ENTRY_BYTES: u64 = 12;
const POLICY_ID_BYTES: u64 = 28;

fn overflow(what: &str) -> WalletError {
    WalletError::InvalidRequest(format!("{what} overflows a lovelace amount"))
}

/// `constant + ceil(coefficient * size)`, exact
pub fn estimate_fee(fee: &LinearFee, size: usize) -> Result<Lovelace, WalletError> {
    let numer = u128::from(*fee.coefficient.numer());
    let denom = u128::from(*fee.coefficient.denom());
    let scaled = (numer * size as u128).div_ceil(denom);
    let total = u128::from(fee.constant) + scaled;
    Lovelace::try_from(total).map_err(|_| overflow("fee"))
}

/// Smallest coin an output carrying a bundle of `shape` may hold
pub fn min_ada_for_output(shape: &BundleShape, min_utxo_value: Lovelace) -> Result<Lovelace, WalletError> {
    if shape.is_empty() {
        return Ok(min_utxo_value);
    }

    let coins_per_word = u128::from(min_utxo_value / UTXO_ENTRY_WORDS);
    let bundle_bytes = shape.assets as u128 * u128::from(ASSET_ENTRY_BYTES)
        + shape.name_bytes as u128
        + shape.policies as u128 * u128::from(POLICY_ID_BYTES);
    let bundle_words = u128::from(BUNDLE_BASE_WORDS) + bundle_bytes.div_ceil(8);
    let scaled = coins_per_word * (u128::from(UTXO_ENTRY_WORDS) + bundle_words);

    let required = Lovelace::try_from(scaled).map_err(|_| overflow("minimum ada"))?;
    Ok(required.max(min_utxo_value))
}
