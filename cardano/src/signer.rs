//! Witness assembly for built transactions

use crate::discovery::AddressBook;
use sendada_codec::signing_message;
use sendada_common::{providers::KeyProvider, *};
use std::collections::HashSet;
use tracing::debug;

/// Key paths whose signatures `tx` needs, in input order, staking key last
pub fn required_key_paths(tx: &UnsignedTx, book: &AddressBook) -> Result<Vec<KeyPath>, WalletError> {
    let mut paths = tx
        .spent
        .iter()
        .map(|utxo| {
            book.key_path_for(&utxo.address)
                .ok_or_else(|| WalletError::SigningFailure {
                    path: utxo.address.to_string(),
                    reason: format!("input {} is not held by this wallet", utxo.input),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let staking = book.staking_key_hash().copied();
    let mut staking_needed = false;
    for (index, certificate) in tx.body.certificates.iter().enumerate() {
        let must_sign = matches!(
            certificate,
            TxCertificate::StakeDeregistration(_) | TxCertificate::StakeDelegation { .. }
        );
        for hash in certificate.witness_key_hashes() {
            if Some(hash) == staking {
                staking_needed = true;
            } else if must_sign {
                return Err(unheld_stake_key(hash, format!("certificate {index}")));
            }
        }
    }
    for withdrawal in &tx.body.withdrawals {
        if let StakeCredential::AddrKeyHash(hash) = withdrawal.reward_account.credential {
            if Some(hash) != staking {
                return Err(unheld_stake_key(hash, "withdrawal".to_string()));
            }
            staking_needed = true;
        }
    }
    if staking_needed {
        paths.push(book.staking_path());
    }
    Ok(paths)
}

fn unheld_stake_key(hash: KeyHash, what: String) -> WalletError {
    WalletError::SigningFailure {
        path: hash.to_string(),
        reason: format!("{what} needs a stake key this wallet does not hold"),
    }
}

/// Sign `tx` with every path in `paths`, once each
pub async fn sign(
    tx: &UnsignedTx,
    paths: &[KeyPath],
    keys: &dyn KeyProvider,
    params: &TxParams,
) -> Result<SignedTx, WalletError> {
    let message = signing_message(tx.era, &tx.body, params.protocol_magic)?;
    let mut seen = HashSet::new();
    let mut witnesses = WitnessSet::default();

    for path in paths {
        if !seen.insert(*path) {
            continue;
        }
        debug!(%path, "Requesting signature");
        let signature = keys.sign(path, &message).await?;
        let public = keys.public_key(path).await?;

        let witness = match path.scheme {
            AddressScheme::Legacy => {
                let Address::Byron(address) = keys.derive_address(path).await? else {
                    return Err(WalletError::SigningFailure {
                        path: path.to_string(),
                        reason: "legacy path did not derive a legacy address".to_string(),
                    });
                };
                Witness::Legacy {
                    public_key: public.key,
                    signature,
                    chain_code: public.chain_code,
                    attributes: address.attributes().to_vec(),
                }
            }
            AddressScheme::Current => Witness::Current {
                public_key: public.key,
                signature,
            },
        };
        witnesses.push(witness);
    }

    Ok(SignedTx {
        era: tx.era,
        body: tx.body.clone(),
        witnesses,
        metadata: tx.metadata.clone(),
    })
}
