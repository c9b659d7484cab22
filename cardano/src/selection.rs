//! Order in which the builder draws on a UTXO pool

use sendada_common::{InputSelection, TokenBundle, UnspentOutput, WalletError};
use std::cmp::Reverse;

/// Candidates in the order they will be spent
///
/// The builder takes a growing prefix of this list until the payment and fee are
/// covered, so the ordering alone decides which inputs a transaction uses.
pub fn order_candidates(
    pool: &[UnspentOutput],
    wanted: &TokenBundle,
    strategy: InputSelection,
) -> Result<Vec<UnspentOutput>, WalletError> {
    match strategy {
        InputSelection::All => Ok(pool.to_vec()),
        InputSelection::LargestFirst => largest_first(pool, wanted),
    }
}

fn largest_first(
    pool: &[UnspentOutput],
    wanted: &TokenBundle,
) -> Result<Vec<UnspentOutput>, WalletError> {
    let mut remaining: Vec<&UnspentOutput> = pool.iter().collect();
    remaining.sort_by_key(|utxo| (Reverse(utxo.value.coin), utxo.input));

    let mut ordered = Vec::with_capacity(remaining.len());
    let mut held = TokenBundle::new();
    while !remaining.is_empty() {
        // Pick the largest UTXO holding the first asset still missing, if any does
        let position = held
            .first_shortfall(wanted)
            .and_then(|(policy, name, _, _)| {
                remaining
                    .iter()
                    .position(|utxo| utxo.value.assets.quantity(&policy, &name) > 0)
            })
            .unwrap_or(0);

        let utxo = remaining.remove(position);
        held = held.checked_add(&utxo.value.assets).ok_or_else(|| {
            WalletError::InvalidRequest(format!("token quantities overflow at input {}", utxo.input))
        })?;
        ordered.push(utxo.clone());
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendada_common::*;

    fn utxo(index: u64, coin: Lovelace, assets: TokenBundle) -> UnspentOutput {
        UnspentOutput {
            input: TxInput::new(TxHash::new([index as u8; 32]), index),
            address: Address::from_string(
                "addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8",
            )
            .unwrap(),
            value: Value::new(coin, assets),
        }
    }

    fn token(quantity: u64) -> TokenBundle {
        [(PolicyId::new([7; 28]), AssetName::new(b"tok").unwrap(), quantity)]
            .into_iter()
            .collect()
    }

    fn indexes(ordered: &[UnspentOutput]) -> Vec<u64> {
        ordered.iter().map(|utxo| utxo.input.index).collect()
    }

    #[test]
    fn largest_coin_first_with_ties_by_input() {
        let pool = vec![
            utxo(1, 5, TokenBundle::new()),
            utxo(2, 9, TokenBundle::new()),
            utxo(0, 5, TokenBundle::new()),
        ];
        let ordered =
            order_candidates(&pool, &TokenBundle::new(), InputSelection::LargestFirst).unwrap();
        assert_eq!(indexes(&ordered), vec![2, 0, 1]);
    }

    #[test]
    fn token_holders_come_first_until_covered() {
        let pool = vec![
            utxo(0, 100, TokenBundle::new()),
            utxo(1, 2, token(3)),
            utxo(2, 1, token(3)),
            utxo(3, 50, TokenBundle::new()),
        ];
        let ordered = order_candidates(&pool, &token(5), InputSelection::LargestFirst).unwrap();
        assert_eq!(indexes(&ordered), vec![1, 2, 0, 3]);
    }

    #[test]
    fn all_keeps_pool_order() {
        let pool = vec![utxo(3, 1, TokenBundle::new()), utxo(1, 9, TokenBundle::new())];
        let ordered = order_candidates(&pool, &TokenBundle::new(), InputSelection::All).unwrap();
        assert_eq!(indexes(&ordered), vec![3, 1]);
    }

    #[test]
    fn overflowing_token_holdings_are_an_error() {
        let pool = vec![utxo(0, 5, token(u64::MAX)), utxo(1, 4, token(1))];
        assert!(matches!(
            order_candidates(&pool, &TokenBundle::new(), InputSelection::LargestFirst),
            Err(WalletError::InvalidRequest(_))
        ));
        assert_eq!(
            order_candidates(&pool, &TokenBundle::new(), InputSelection::All).unwrap().len(),
            2
        );
    }
}
