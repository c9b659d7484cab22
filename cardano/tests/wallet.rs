//! Wallet facade against in-memory collaborators

use sendada_cardano::{TxIntent, TxRequest, Wallet, WalletConfig};
use sendada_codec::{decode_signed, encode_signed, signing_message, transaction_id};
use sendada_common::{
    providers::KeyProvider, Address, AddressNetwork, AddressScheme, Era, KeyHash, KeyPath,
    Lovelace, PoolId, StakeAddress, StakeCredential, TxCertificate, TxHash, TxInput, TxOutput,
    UnspentOutput, Value, WalletError, Witness, Withdrawal,
};
use sendada_test_utils::{InMemoryUtxoSource, RecordingSubmitter, SoftwareKeyProvider};
use std::sync::Arc;

struct Harness {
    keys: Arc<SoftwareKeyProvider>,
    utxos: Arc<InMemoryUtxoSource>,
    submitter: Arc<RecordingSubmitter>,
    wallet: Wallet,
}

fn external(index: u32) -> KeyPath {
    KeyPath::new(AddressScheme::Current, 0, KeyPath::EXTERNAL, index)
}

fn foreign() -> Address {
    Address::from_string(
        "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x",
    )
    .unwrap()
}

fn pay(coin: Lovelace) -> TxIntent {
    TxIntent::Pay(vec![TxOutput::new(foreign(), Value::lovelace(coin))])
}

impl Harness {
    fn new() -> Self {
        let keys = Arc::new(SoftwareKeyProvider::new([42; 32]));
        let utxos = Arc::new(InMemoryUtxoSource::new());
        let submitter = Arc::new(RecordingSubmitter::new());
        let wallet = Wallet::new(
            keys.clone(),
            utxos.clone(),
            submitter.clone(),
            WalletConfig::default(),
        );
        Self {
            keys,
            utxos,
            submitter,
            wallet,
        }
    }

    async fn address(&self, path: KeyPath) -> Address {
        self.keys.derive_address(&path).await.unwrap()
    }

    async fn fund(&self, path: KeyPath, index: u64, coin: Lovelace) {
        let address = self.address(path).await;
        self.utxos
            .add(UnspentOutput {
                input: TxInput::new(TxHash::new([0xcd; 32]), index),
                address,
                value: Value::lovelace(coin),
            })
            .await;
    }
}

#[tokio::test]
async fn balance_covers_every_discovered_address() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 3_000_000).await;
    harness.fund(external(5), 1, 2_000_000).await;
    assert_eq!(harness.wallet.balance().await.unwrap(), Value::lovelace(5_000_000));
}

#[tokio::test]
async fn ownership_follows_derivation() {
    let harness = Harness::new();
    let own = harness.address(external(3)).await;
    let legacy = harness
        .address(KeyPath::new(AddressScheme::Legacy, 0, KeyPath::INTERNAL, 0))
        .await;

    assert!(harness.wallet.is_own_address(&own).await.unwrap());
    assert!(harness.wallet.is_own_address(&legacy).await.unwrap());
    assert!(!harness.wallet.is_own_address(&foreign()).await.unwrap());
}

#[tokio::test]
async fn gap_window_moves_past_used_addresses() {
    let harness = Harness::new();
    let far = harness.address(external(30)).await;
    assert!(!harness.wallet.is_own_address(&far).await.unwrap());

    harness.fund(external(15), 0, 1_500_000).await;
    assert!(harness.wallet.is_own_address(&far).await.unwrap());
}

#[tokio::test]
async fn change_goes_to_the_first_unused_internal_address() {
    let harness = Harness::new();
    let internal = |index| KeyPath::new(AddressScheme::Current, 0, KeyPath::INTERNAL, index);
    harness.utxos.mark_used(&harness.address(internal(0)).await).await;

    assert_eq!(
        harness.wallet.change_address().await.unwrap(),
        harness.address(internal(1)).await
    );
}

#[tokio::test]
async fn prepare_sign_and_submit() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;

    let tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();
    assert_eq!(tx.change_index, Some(1));
    assert_eq!(
        tx.input_total().unwrap().coin,
        tx.body.output_total().unwrap().coin + tx.body.fee
    );
    assert_eq!(harness.wallet.fee_quote(pay(2_000_000)).await.unwrap(), tx.body.fee);

    let signed = harness.wallet.sign_tx(&tx).await.unwrap();
    assert_eq!(signed.witnesses.current.len(), 1);
    let message = signing_message(signed.era, &signed.body, 0).unwrap();
    let witness = &signed.witnesses.current[0];
    assert!(witness.public_key().verify(&message, witness.signature()));

    let id = harness.wallet.submit_tx(&signed).await.unwrap();
    assert_eq!(id, transaction_id(&tx.body).unwrap());
    assert_eq!(harness.submitter.submitted().await.len(), 1);
}

#[tokio::test]
async fn small_change_is_folded_into_the_fee() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 2_500_000).await;

    let tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();
    assert_eq!(tx.change_index, None);
    assert_eq!(tx.body.outputs.len(), 1);
    assert_eq!(tx.body.fee, 500_000);
}

#[tokio::test]
async fn max_sendable_is_spendable() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 4_000_000).await;
    harness.fund(external(1), 1, 3_000_000).await;

    let max = harness.wallet.max_sendable(&foreign()).await.unwrap();
    assert!(max < 7_000_000);

    let sweep = harness.wallet.prepare_tx(TxIntent::Sweep(foreign())).await.unwrap();
    assert_eq!(sweep.body.outputs[0].value.coin, max);
    assert_eq!(sweep.body.fee, 7_000_000 - max);
}

#[tokio::test]
async fn insufficient_funds_are_reported() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 1_500_000).await;
    assert!(matches!(
        harness.wallet.prepare_tx(pay(5_000_000)).await,
        Err(WalletError::InsufficientFunds { .. })
    ));
}

#[tokio::test]
async fn withdrawal_brings_in_the_staking_witness() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let Address::Stake(reward_account) = harness.address(KeyPath::staking(0)).await else {
        panic!("staking path must derive a reward address");
    };

    let change = harness.wallet.change_address().await.unwrap();
    let request = TxRequest::pay(vec![TxOutput::new(foreign(), Value::lovelace(2_000_000))], change)
        .with_withdrawals(vec![Withdrawal {
            reward_account,
            amount: 5_000,
        }]);
    let tx = harness.wallet.prepare_request(&request).await.unwrap();
    let signed = harness.wallet.sign_tx(&tx).await.unwrap();
    assert_eq!(signed.witnesses.current.len(), 2);
}

#[tokio::test]
async fn legacy_and_current_inputs_are_witnessed_together() {
    let harness = Harness::new();
    let legacy_path = KeyPath::new(AddressScheme::Legacy, 0, KeyPath::EXTERNAL, 0);
    harness.fund(legacy_path, 0, 1_600_000).await;
    harness.fund(external(0), 1, 1_500_000).await;

    let tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();
    assert_eq!(tx.spent.len(), 2);
    let signed = harness.wallet.sign_tx(&tx).await.unwrap();
    assert_eq!(signed.witnesses.current.len(), 1);
    assert_eq!(signed.witnesses.legacy.len(), 1);

    let message = signing_message(signed.era, &signed.body, 0).unwrap();
    for witness in signed.witnesses.current.iter().chain(&signed.witnesses.legacy) {
        assert!(witness.public_key().verify(&message, witness.signature()));
    }

    let Address::Byron(byron) = harness.address(legacy_path).await else {
        panic!("legacy path must derive a legacy address");
    };
    let Witness::Legacy { attributes, .. } = &signed.witnesses.legacy[0] else {
        panic!("legacy input must get a legacy witness");
    };
    assert_eq!(attributes.as_slice(), byron.attributes());

    let decoded = decode_signed(Era::Shelley, &encode_signed(&signed).unwrap()).unwrap();
    assert_eq!(decoded.body, signed.body);
    assert_eq!(decoded.witnesses, signed.witnesses);
}

#[tokio::test]
async fn own_delegation_is_signed_by_the_staking_key() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let Address::Stake(StakeAddress { credential, .. }) = harness.address(KeyPath::staking(0)).await
    else {
        panic!("staking path must derive a reward address");
    };

    let change = harness.wallet.change_address().await.unwrap();
    let request = TxRequest::pay(Vec::new(), change).with_certificates(vec![
        TxCertificate::StakeDelegation {
            credential,
            pool: PoolId::new([4; 28]),
        },
    ]);
    let tx = harness.wallet.prepare_request(&request).await.unwrap();
    let signed = harness.wallet.sign_tx(&tx).await.unwrap();
    assert_eq!(signed.witnesses.current.len(), 2);
}

#[tokio::test]
async fn stake_keys_the_wallet_lacks_fail_signing() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let stranger = StakeCredential::AddrKeyHash(KeyHash::new([0x99; 28]));
    let change = harness.wallet.change_address().await.unwrap();

    let delegation = TxRequest::pay(Vec::new(), change.clone()).with_certificates(vec![
        TxCertificate::StakeDelegation {
            credential: stranger,
            pool: PoolId::new([4; 28]),
        },
    ]);
    let deregistration = TxRequest::pay(Vec::new(), change.clone())
        .with_certificates(vec![TxCertificate::StakeDeregistration(stranger)]);
    let withdrawal = TxRequest::pay(Vec::new(), change).with_withdrawals(vec![Withdrawal {
        reward_account: StakeAddress::new(stranger, AddressNetwork::Main),
        amount: 5_000,
    }]);

    for request in [delegation, deregistration, withdrawal] {
        let tx = harness.wallet.prepare_request(&request).await.unwrap();
        assert!(matches!(
            harness.wallet.sign_tx(&tx).await,
            Err(WalletError::SigningFailure { .. })
        ));
    }
}

#[tokio::test]
async fn revoked_key_fails_signing() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();

    harness.keys.revoke(external(0)).await;
    assert!(matches!(
        harness.wallet.sign_tx(&tx).await,
        Err(WalletError::SigningFailure { .. })
    ));
}

#[tokio::test]
async fn foreign_input_fails_signing() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let mut tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();
    tx.spent[0].address = foreign();

    assert!(matches!(
        harness.wallet.sign_tx(&tx).await,
        Err(WalletError::SigningFailure { .. })
    ));
}

#[tokio::test]
async fn collaborator_errors_pass_through() {
    let harness = Harness::new();
    harness.fund(external(0), 0, 10_000_000).await;
    let tx = harness.wallet.prepare_tx(pay(2_000_000)).await.unwrap();
    let signed = harness.wallet.sign_tx(&tx).await.unwrap();

    harness.submitter.reject_with("bad inputs").await;
    assert_eq!(
        harness.wallet.submit_tx(&signed).await,
        Err(WalletError::RejectedByNetwork("bad inputs".to_string()))
    );

    harness
        .utxos
        .fail_with(WalletError::NetworkError("timeout".to_string()))
        .await;
    assert_eq!(
        harness.wallet.balance().await,
        Err(WalletError::NetworkError("timeout".to_string()))
    );
}
