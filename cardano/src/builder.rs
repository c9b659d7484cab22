//! Transaction builder: input selection, fee fixed point and change
//!
//! Each build attempt owns its draft body outright and hands back either a balanced
//! [`UnsignedTx`] or an error; nothing partial escapes.

use crate::fees::{estimate_fee, min_ada_for_output};
use crate::selection::order_candidates;
use sendada_codec::encode_signed;
use sendada_common::{
    crypto::{ChainCode, PublicKey, Signature},
    *,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// What the caller wants the transaction to do with the wallet's funds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxIntent {
    /// Pay these outputs; anything left over returns to the change address
    Pay(Vec<TxOutput>),
    /// Send every supplied UTXO to one address, less the fee
    Sweep(Address),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub intent: TxIntent,
    pub change_address: Address,
    pub certificates: Vec<TxCertificate>,
    pub withdrawals: Vec<Withdrawal>,
    pub metadata: Option<TxMetadata>,
    pub ttl: Option<u64>,
}

impl TxRequest {
    pub fn pay(outputs: Vec<TxOutput>, change_address: Address) -> Self {
        Self {
            intent: TxIntent::Pay(outputs),
            change_address,
            certificates: Vec::new(),
            withdrawals: Vec::new(),
            metadata: None,
            ttl: None,
        }
    }

    /// A sweep never produces change, so the destination doubles as change address
    pub fn sweep(destination: Address) -> Self {
        Self {
            intent: TxIntent::Sweep(destination.clone()),
            ..Self::pay(Vec::new(), destination)
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_certificates(mut self, certificates: Vec<TxCertificate>) -> Self {
        self.certificates = certificates;
        self
    }

    pub fn with_withdrawals(mut self, withdrawals: Vec<Withdrawal>) -> Self {
        self.withdrawals = withdrawals;
        self
    }

    pub fn with_metadata(mut self, metadata: TxMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Zero-filled witnesses standing in for the real ones while sizing
///
/// One current witness per distinct payment key of current-scheme inputs, certificate
/// credential, pool owner and withdrawal account; one legacy witness per distinct
/// legacy input address, carrying that address's attributes.
pub fn placeholder_witnesses(
    spent: &[UnspentOutput],
    certificates: &[TxCertificate],
    withdrawals: &[Withdrawal],
) -> WitnessSet {
    let mut key_hashes = BTreeSet::new();
    let mut legacy_addresses: Vec<&ByronAddress> = Vec::new();

    for utxo in spent {
        match &utxo.address {
            Address::Shelley(address) => {
                if let Some(hash) = address.payment_key_hash() {
                    key_hashes.insert(*hash);
                }
            }
            Address::Byron(address) => {
                if !legacy_addresses.contains(&address) {
                    legacy_addresses.push(address);
                }
            }
            Address::Stake(_) => {}
        }
    }
    for cert in certificates {
        key_hashes.extend(cert.witness_key_hashes());
    }
    for withdrawal in withdrawals {
        if let StakeCredential::AddrKeyHash(hash) = withdrawal.reward_account.credential {
            key_hashes.insert(hash);
        }
    }

    let mut witnesses = WitnessSet::default();
    for _ in &key_hashes {
        witnesses.push(Witness::Current {
            public_key: PublicKey::zero(),
            signature: Signature::zero(),
        });
    }
    for address in legacy_addresses {
        witnesses.push(Witness::Legacy {
            public_key: PublicKey::zero(),
            signature: Signature::zero(),
            chain_code: ChainCode::zero(),
            attributes: address.attributes().to_vec(),
        });
    }
    witnesses
}

/// Fee for a trial envelope
///
/// Legacy sizing writes the change coin at its widest integer encoding, so the fee
/// covers whatever change the loop settles on.
fn sized_fee(
    params: &TxParams,
    trial: &mut SignedTx,
    change_index: Option<usize>,
) -> Result<Lovelace, WalletError> {
    if trial.era == Era::Byron {
        if let Some(change) = change_index.and_then(|index| trial.body.outputs.get_mut(index)) {
            change.value.coin = Lovelace::MAX;
        }
    }
    let size = encode_signed(trial)?.len();
    estimate_fee(&params.fee, size)
}

/// Working state of one build attempt over one input selection
struct Draft<'a> {
    params: &'a TxParams,
    change_address: &'a Address,
    spent: &'a [UnspentOutput],
    trial: SignedTx,
}

impl<'a> Draft<'a> {
    fn new(params: &'a TxParams, request: &'a TxRequest, spent: &'a [UnspentOutput]) -> Self {
        let body = UnsignedTxBody {
            inputs: spent.iter().map(|utxo| utxo.input).collect(),
            outputs: Vec::new(),
            fee: 0,
            ttl: request.ttl,
            certificates: request.certificates.clone(),
            withdrawals: request.withdrawals.clone(),
            metadata_hash: request.metadata.as_ref().map(TxMetadata::hash),
        };
        let witnesses =
            placeholder_witnesses(spent, &request.certificates, &request.withdrawals);
        Self {
            params,
            change_address: &request.change_address,
            spent,
            trial: SignedTx {
                era: params.era,
                body,
                witnesses,
                metadata: request.metadata.clone(),
            },
        }
    }

    fn set_outputs(&mut self, outputs: &[TxOutput], change: Option<Value>) -> Option<usize> {
        self.trial.body.outputs.clear();
        self.trial.body.outputs.extend_from_slice(outputs);
        change.map(|value| {
            let output = TxOutput::new(self.change_address.clone(), value);
            self.trial.body.outputs.push(output);
            self.trial.body.outputs.len() - 1
        })
    }

    /// Fee the draft needs with these outputs while carrying `fee`
    fn required_fee(
        &mut self,
        outputs: &[TxOutput],
        change: Option<Value>,
        fee: Lovelace,
    ) -> Result<Lovelace, WalletError> {
        let change_index = self.set_outputs(outputs, change);
        self.trial.body.fee = fee;
        sized_fee(self.params, &mut self.trial, change_index)
    }

    fn finish(mut self, outputs: &[TxOutput], change: Option<Value>, fee: Lovelace) -> UnsignedTx {
        let change_index = self.set_outputs(outputs, change);
        self.trial.body.fee = fee;
        let tx = UnsignedTx {
            era: self.trial.era,
            body: self.trial.body,
            metadata: self.trial.metadata,
            spent: self.spent.to_vec(),
            change_index,
        };
        debug_assert_eq!(tx.implied_fee(), Some(fee));
        tx
    }
}

/// Outcome of balancing one input selection
enum Attempt {
    Built(UnsignedTx),
    /// These inputs cannot cover the request; the error describes by how much
    Short(WalletError),
}

pub struct TxBuilder {
    config: BuilderConfig,
}

impl TxBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Select inputs from `pool` and balance a transaction for `request`
    pub fn build(
        &self,
        request: &TxRequest,
        pool: &[UnspentOutput],
    ) -> Result<UnsignedTx, WalletError> {
        self.validate(request)?;
        let tx = match &request.intent {
            TxIntent::Pay(outputs) => self.build_payment(request, outputs, pool)?,
            TxIntent::Sweep(destination) => self.build_sweep(request, destination, pool)?,
        };
        info!(
            fee = tx.body.fee,
            inputs = tx.body.inputs.len(),
            outputs = tx.body.outputs.len(),
            "Built {} transaction",
            if tx.era == Era::Byron { "legacy" } else { "current" },
        );
        Ok(tx)
    }

    /// Coin a sweep of `pool` to `destination` would deliver
    pub fn max_sendable(
        &self,
        pool: &[UnspentOutput],
        destination: &Address,
    ) -> Result<Lovelace, WalletError> {
        let tx = self.build(&TxRequest::sweep(destination.clone()), pool)?;
        Ok(tx.body.outputs.iter().map(|output| output.value.coin).sum())
    }

    /// Fee a built transaction needs, sized exactly as the builder sizes it
    pub fn required_fee(&self, tx: &UnsignedTx) -> Result<Lovelace, WalletError> {
        let mut trial = SignedTx {
            era: tx.era,
            body: tx.body.clone(),
            witnesses: placeholder_witnesses(
                &tx.spent,
                &tx.body.certificates,
                &tx.body.withdrawals,
            ),
            metadata: tx.metadata.clone(),
        };
        sized_fee(&self.config.params, &mut trial, tx.change_index)
    }

    fn validate(&self, request: &TxRequest) -> Result<(), WalletError> {
        let outputs: &[TxOutput] = match &request.intent {
            TxIntent::Pay(outputs) => outputs,
            TxIntent::Sweep(destination) => {
                if matches!(destination, Address::Stake(_)) {
                    return Err(WalletError::InvalidRequest(
                        "cannot sweep to a reward address".to_string(),
                    ));
                }
                &[]
            }
        };

        for (index, output) in outputs.iter().enumerate() {
            if matches!(output.address, Address::Stake(_)) {
                return Err(WalletError::InvalidRequest(format!(
                    "output {index} pays a reward address"
                )));
            }
        }
        if matches!(request.change_address, Address::Stake(_)) {
            return Err(WalletError::InvalidRequest(
                "change address is a reward address".to_string(),
            ));
        }

        let network = self.config.params.network;
        let foreign = |address: &Address| address.network().is_some_and(|own| own != network);
        if let TxIntent::Sweep(destination) = &request.intent {
            if foreign(destination) {
                return Err(WalletError::InvalidRequest(format!(
                    "destination is not on the {network:?} network"
                )));
            }
        }
        if let Some(index) = outputs.iter().position(|output| foreign(&output.address)) {
            return Err(WalletError::InvalidRequest(format!(
                "output {index} is not on the {network:?} network"
            )));
        }
        if foreign(&request.change_address) {
            return Err(WalletError::InvalidRequest(format!(
                "change address is not on the {network:?} network"
            )));
        }
        if let Some(withdrawal) = request
            .withdrawals
            .iter()
            .find(|withdrawal| withdrawal.reward_account.network != network)
        {
            return Err(WalletError::InvalidRequest(format!(
                "withdrawal from {} is not on the {network:?} network",
                withdrawal.reward_account.to_string().unwrap_or_default()
            )));
        }

        for (i, withdrawal) in request.withdrawals.iter().enumerate() {
            if request.withdrawals[..i]
                .iter()
                .any(|earlier| earlier.reward_account == withdrawal.reward_account)
            {
                return Err(WalletError::InvalidRequest(format!(
                    "more than one withdrawal from {}",
                    withdrawal.reward_account.to_string().unwrap_or_default()
                )));
            }
        }

        if let TxIntent::Pay(outputs) = &request.intent {
            let payment = payment_total(outputs)?;
            if payment.is_zero()
                && request.certificates.is_empty()
                && request.withdrawals.is_empty()
            {
                return Err(WalletError::EmptyTransaction);
            }
        }

        // Only token-bearing outputs are held to the minimum
        for (index, output) in outputs.iter().enumerate() {
            if output.value.assets.is_empty() {
                continue;
            }
            let required =
                min_ada_for_output(&output.value.assets.shape(), self.config.params.min_utxo_value)?;
            if output.value.coin < required {
                return Err(WalletError::OutputBelowMinimum {
                    index,
                    required,
                    actual: output.value.coin,
                });
            }
        }
        Ok(())
    }

    /// Raise the fee until it covers the trial it is carried in
    ///
    /// Candidates only ever grow, so an oscillation between two sizes settles on the
    /// higher fee.
    fn converge<F>(&self, mut required_fee: F) -> Result<Lovelace, WalletError>
    where
        F: FnMut(Lovelace) -> Result<Lovelace, WalletError>,
    {
        let mut fee = 0;
        for iteration in 1..=self.config.max_fee_iterations {
            let required = required_fee(fee)?;
            debug!(iteration, fee, required, "Fee iteration");
            if required <= fee {
                return Ok(fee);
            }
            fee = fee.max(required);
        }
        Err(WalletError::FeeDidNotConverge {
            iterations: self.config.max_fee_iterations,
        })
    }

    fn build_payment(
        &self,
        request: &TxRequest,
        outputs: &[TxOutput],
        pool: &[UnspentOutput],
    ) -> Result<UnsignedTx, WalletError> {
        let target = payment_total(outputs)?;
        let candidates = order_candidates(pool, &target.assets, self.config.selection)?;
        let first = match self.config.selection {
            InputSelection::All => candidates.len(),
            InputSelection::LargestFirst => candidates.len().min(1),
        };

        let mut shortfall = WalletError::insufficient_lovelace(target.coin, 0);
        for count in first..=candidates.len() {
            match self.balance_payment(request, outputs, &target, &candidates[..count])? {
                Attempt::Built(tx) => return Ok(tx),
                Attempt::Short(error) => {
                    debug!(inputs = count, "Selection too small: {error}");
                    shortfall = error;
                }
            }
        }
        Err(shortfall)
    }

    fn balance_payment(
        &self,
        request: &TxRequest,
        outputs: &[TxOutput],
        target: &Value,
        selected: &[UnspentOutput],
    ) -> Result<Attempt, WalletError> {
        let params = &self.config.params;
        let input_total = value_total(selected)?;

        if let Some((policy, name, required, available)) =
            input_total.assets.first_shortfall(&target.assets)
        {
            return Ok(Attempt::Short(WalletError::InsufficientFunds {
                asset: format!("{policy}.{name}"),
                required,
                available,
            }));
        }
        let (Some(spare), Some(leftover)) = (
            input_total.coin.checked_sub(target.coin),
            input_total.assets.checked_sub(&target.assets),
        ) else {
            return Ok(Attempt::Short(WalletError::insufficient_lovelace(
                target.coin,
                input_total.coin,
            )));
        };
        let short_by = |fee: Lovelace, change: Lovelace| {
            Attempt::Short(WalletError::insufficient_lovelace(
                target.coin.saturating_add(fee).saturating_add(change),
                input_total.coin,
            ))
        };

        let mut draft = Draft::new(params, request, selected);

        // Leftover tokens must go somewhere, so change is mandatory
        if !leftover.is_empty() {
            let change_min = min_ada_for_output(&leftover.shape(), params.min_utxo_value)?;
            let fee = self.converge(|fee| match spare.checked_sub(fee) {
                Some(coin) => draft.required_fee(outputs, Some(Value::new(coin, leftover.clone())), fee),
                // Unaffordable; reported below
                None => Ok(fee),
            })?;
            return Ok(match spare.checked_sub(fee) {
                Some(change) if change >= change_min => Attempt::Built(draft.finish(
                    outputs,
                    Some(Value::new(change, leftover)),
                    fee,
                )),
                _ => short_by(fee, change_min),
            });
        }

        let fee = self.converge(|fee| {
            if fee > spare {
                return Ok(fee);
            }
            draft.required_fee(outputs, None, fee)
        })?;
        let Some(change) = spare.checked_sub(fee) else {
            return Ok(short_by(fee, 0));
        };
        if change == 0 {
            return Ok(Attempt::Built(draft.finish(outputs, None, fee)));
        }

        if change >= params.min_utxo_value {
            // The change output costs fee of its own; settle both together
            let fee_with_change = self.converge(|fee| match spare.checked_sub(fee) {
                Some(coin) => draft.required_fee(outputs, Some(Value::lovelace(coin)), fee),
                None => Ok(fee),
            })?;
            if let Some(change) = spare
                .checked_sub(fee_with_change)
                .filter(|change| *change >= params.min_utxo_value)
            {
                return Ok(Attempt::Built(draft.finish(
                    outputs,
                    Some(Value::lovelace(change)),
                    fee_with_change,
                )));
            }
        }

        debug!(dust = change, fee, "Folding change below the minimum into the fee");
        let required = draft.required_fee(outputs, None, spare)?;
        if required > spare {
            return Ok(short_by(required, 0));
        }
        Ok(Attempt::Built(draft.finish(outputs, None, spare)))
    }

    fn build_sweep(
        &self,
        request: &TxRequest,
        destination: &Address,
        pool: &[UnspentOutput],
    ) -> Result<UnsignedTx, WalletError> {
        let params = &self.config.params;
        let total = value_total(pool)?;
        let minimum = if total.assets.is_empty() {
            1
        } else {
            min_ada_for_output(&total.assets.shape(), params.min_utxo_value)?
        };
        let sweep_output =
            |coin: Lovelace| TxOutput::new(destination.clone(), Value::new(coin, total.assets.clone()));

        let mut draft = Draft::new(params, request, pool);
        let fee = self.converge(|fee| match total.coin.checked_sub(fee) {
            Some(coin) => draft.required_fee(&[sweep_output(coin)], None, fee),
            None => Ok(fee),
        })?;

        match total.coin.checked_sub(fee) {
            Some(coin) if coin >= minimum => Ok(draft.finish(&[sweep_output(coin)], None, fee)),
            _ => Err(WalletError::insufficient_lovelace(
                fee.saturating_add(minimum),
                total.coin,
            )),
        }
    }
}

fn payment_total(outputs: &[TxOutput]) -> Result<Value, WalletError> {
    Value::sum(outputs.iter().map(|output| &output.value))
        .ok_or_else(|| WalletError::InvalidRequest("payment total overflows".to_string()))
}

fn value_total(utxos: &[UnspentOutput]) -> Result<Value, WalletError> {
    Value::sum(utxos.iter().map(|utxo| &utxo.value))
        .ok_or_else(|| WalletError::InvalidRequest("input total overflows".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn address(text: &str) -> Address {
        Address::from_string(text).unwrap()
    }

    fn ours() -> Address {
        address("addr1vx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzers66hrl8")
    }

    fn theirs() -> Address {
        address(
            "addr1qx2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzer3n0d3vllmyqwsx5wktcd8cc3sq835lu7drv2xwl2wywfgse35a3x",
        )
    }

    fn utxo(index: u64, coin: Lovelace) -> UnspentOutput {
        UnspentOutput {
            input: TxInput::new(TxHash::new([0xab; 32]), index),
            address: ours(),
            value: Value::lovelace(coin),
        }
    }

    fn token_bundle(quantity: u64) -> TokenBundle {
        [(PolicyId::new([9; 28]), AssetName::new(b"nft").unwrap(), quantity)]
            .into_iter()
            .collect()
    }

    fn builder() -> TxBuilder {
        TxBuilder::new(BuilderConfig::default())
    }

    fn pay(coin: Lovelace) -> TxRequest {
        TxRequest::pay(vec![TxOutput::new(theirs(), Value::lovelace(coin))], ours())
    }

    fn assert_balanced(tx: &UnsignedTx) {
        let inputs = tx.input_total().unwrap();
        let outputs = tx.body.output_total().unwrap();
        assert_eq!(inputs.assets, outputs.assets);
        assert_eq!(inputs.coin, outputs.coin + tx.body.fee);
    }

    #[test]
    fn change_returns_to_the_change_address() {
        let tx = builder().build(&pay(2_000_000), &[utxo(0, 10_000_000)]).unwrap();
        assert_balanced(&tx);
        assert_eq!(tx.change_index, Some(1));
        assert_eq!(tx.body.outputs[1].address, ours());
        assert_eq!(builder().required_fee(&tx).unwrap(), tx.body.fee);
    }

    #[test]
    fn fee_is_a_fixed_point() {
        let tx = builder().build(&pay(2_000_000), &[utxo(0, 10_000_000)]).unwrap();
        let size = encode_signed(&SignedTx {
            era: tx.era,
            body: tx.body.clone(),
            witnesses: placeholder_witnesses(&tx.spent, &[], &[]),
            metadata: None,
        })
        .unwrap()
        .len();
        assert_eq!(estimate_fee(&LinearFee::default(), size).unwrap(), tx.body.fee);
    }

    #[test]
    fn dust_change_is_folded_into_the_fee() {
        let tx = builder().build(&pay(2_000_000), &[utxo(0, 2_500_000)]).unwrap();
        assert_balanced(&tx);
        assert_eq!(tx.change_index, None);
        assert_eq!(tx.body.outputs.len(), 1);
        assert_eq!(tx.body.fee, 500_000);
    }

    #[test]
    fn largest_first_stops_once_covered() {
        let pool = [utxo(0, 1_000_000), utxo(1, 5_000_000), utxo(2, 3_000_000)];
        let tx = builder().build(&pay(4_000_000), &pool).unwrap();
        assert_eq!(tx.body.inputs, vec![pool[1].input]);
        assert_balanced(&tx);
    }

    #[test]
    fn all_selection_spends_the_whole_pool() {
        let config = BuilderConfig {
            selection: InputSelection::All,
            ..BuilderConfig::default()
        };
        let pool = [utxo(0, 1_000_000), utxo(1, 5_000_000), utxo(2, 3_000_000)];
        let tx = TxBuilder::new(config).build(&pay(4_000_000), &pool).unwrap();
        assert_eq!(tx.body.inputs.len(), 3);
        assert_balanced(&tx);
    }

    #[test]
    fn insufficient_funds_reports_lovelace() {
        let err = builder().build(&pay(5_000_000), &[utxo(0, 5_100_000)]).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { ref asset, available: 5_100_000, .. } if asset == "lovelace"
        ));
    }

    #[test]
    fn empty_pool_is_insufficient() {
        assert!(matches!(
            builder().build(&pay(1_000_000), &[]),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn missing_tokens_are_reported_by_asset() {
        let request = TxRequest::pay(
            vec![TxOutput::new(theirs(), Value::new(2_000_000, token_bundle(1)))],
            ours(),
        );
        let err = builder().build(&request, &[utxo(0, 50_000_000)]).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { required: 1, available: 0, ref asset } if asset.ends_with(".6e6674")
        ));
    }

    #[test]
    fn leftover_tokens_force_change() {
        let mut holder = utxo(1, 2_000_000);
        holder.value.assets = token_bundle(10);
        let pool = [utxo(0, 8_000_000), holder];
        let request = TxRequest::pay(
            vec![TxOutput::new(theirs(), Value::new(1_500_000, token_bundle(4)))],
            ours(),
        );

        let tx = builder().build(&request, &pool).unwrap();
        assert_balanced(&tx);
        let change = &tx.body.outputs[tx.change_index.unwrap()];
        assert_eq!(change.value.assets, token_bundle(6));
        assert!(
            change.value.coin
                >= min_ada_for_output(&token_bundle(6).shape(), 1_000_000).unwrap()
        );
    }

    #[test]
    fn token_output_below_minimum_is_reported() {
        let request = TxRequest::pay(
            vec![
                TxOutput::new(theirs(), Value::lovelace(5)),
                TxOutput::new(theirs(), Value::new(1_000_000, token_bundle(1))),
            ],
            ours(),
        );
        assert_eq!(
            builder().build(&request, &[utxo(0, 50_000_000)]).unwrap_err(),
            WalletError::OutputBelowMinimum {
                index: 1,
                required: 1_444_443,
                actual: 1_000_000,
            }
        );
    }

    #[test]
    fn small_ada_only_outputs_are_allowed() {
        let tx = builder().build(&pay(47), &[utxo(0, 5_000_000)]).unwrap();
        assert_eq!(tx.body.outputs[0].value.coin, 47);
        assert_balanced(&tx);
    }

    #[test_case(TxRequest::pay(Vec::new(), ours()) ; "no outputs")]
    #[test_case(pay(0) ; "zero coin")]
    fn nothing_to_do_is_an_empty_transaction(request: TxRequest) {
        assert_eq!(
            builder().build(&request, &[utxo(0, 5_000_000)]).unwrap_err(),
            WalletError::EmptyTransaction
        );
    }

    #[test]
    fn certificate_only_transaction_is_not_empty() {
        let credential = StakeCredential::AddrKeyHash(KeyHash::new([3; 28]));
        let request = TxRequest::pay(Vec::new(), ours())
            .with_certificates(vec![TxCertificate::StakeRegistration(credential)]);
        let tx = builder().build(&request, &[utxo(0, 5_000_000)]).unwrap();
        assert_balanced(&tx);
        assert_eq!(tx.body.certificates.len(), 1);
    }

    #[test]
    fn certificates_and_withdrawals_raise_the_fee() {
        let pool = [utxo(0, 10_000_000)];
        let plain = builder().build(&pay(2_000_000), &pool).unwrap();

        let account = StakeAddress::new(
            StakeCredential::AddrKeyHash(KeyHash::new([3; 28])),
            AddressNetwork::Main,
        );
        let request = pay(2_000_000)
            .with_certificates(vec![TxCertificate::StakeDelegation {
                credential: account.credential,
                pool: PoolId::new([4; 28]),
            }])
            .with_withdrawals(vec![Withdrawal {
                reward_account: account,
                amount: 1_000,
            }]);
        let staked = builder().build(&request, &pool).unwrap();

        assert!(staked.body.fee > plain.body.fee);
        assert_balanced(&staked);
    }

    #[test]
    fn duplicate_withdrawals_are_invalid() {
        let withdrawal = Withdrawal {
            reward_account: StakeAddress::new(
                StakeCredential::AddrKeyHash(KeyHash::new([3; 28])),
                AddressNetwork::Main,
            ),
            amount: 1,
        };
        let request = pay(2_000_000).with_withdrawals(vec![withdrawal.clone(), withdrawal]);
        assert!(matches!(
            builder().build(&request, &[utxo(0, 10_000_000)]),
            Err(WalletError::InvalidRequest(_))
        ));
    }

    #[test]
    fn other_network_addresses_are_invalid() {
        let testnet = address("addr_test1vz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzerspjrlsz");
        let pool = [utxo(0, 10_000_000)];
        let payment = TxRequest::pay(vec![TxOutput::new(testnet.clone(), Value::lovelace(2_000_000))], ours());
        let change = TxRequest::pay(vec![TxOutput::new(theirs(), Value::lovelace(2_000_000))], testnet.clone());
        let withdrawal = pay(2_000_000).with_withdrawals(vec![Withdrawal {
            reward_account: StakeAddress::new(
                StakeCredential::AddrKeyHash(KeyHash::new([3; 28])),
                AddressNetwork::Test,
            ),
            amount: 1,
        }]);

        for request in [payment, change, withdrawal, TxRequest::sweep(testnet.clone())] {
            assert!(matches!(
                builder().build(&request, &pool),
                Err(WalletError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn testnet_config_accepts_testnet_addresses() {
        let testnet = address("addr_test1vz2fxv2umyhttkxyxp8x0dlpdt3k6cwng5pxj3jhsydzerspjrlsz");
        let config = BuilderConfig {
            params: TxParams {
                network: AddressNetwork::Test,
                ..TxParams::default()
            },
            ..BuilderConfig::default()
        };
        let request = TxRequest::pay(vec![TxOutput::new(testnet.clone(), Value::lovelace(2_000_000))], testnet);
        let utxo = UnspentOutput {
            address: request.change_address.clone(),
            ..utxo(0, 10_000_000)
        };
        let tx = TxBuilder::new(config).build(&request, &[utxo]).unwrap();
        assert_balanced(&tx);
    }

    #[test]
    fn reward_address_outputs_are_invalid() {
        let stake = address("stake1uyehkck0lajq8gr28t9uxnuvgcqrc6070x3k9r8048z8y5gh6ffgw");
        let request = TxRequest::pay(vec![TxOutput::new(stake, Value::lovelace(2_000_000))], ours());
        assert!(matches!(
            builder().build(&request, &[utxo(0, 10_000_000)]),
            Err(WalletError::InvalidRequest(_))
        ));
    }

    #[test]
    fn sweep_sends_everything_but_the_fee() {
        let pool = [utxo(0, 3_000_000), utxo(1, 4_000_000)];
        let tx = builder().build(&TxRequest::sweep(theirs()), &pool).unwrap();
        assert_balanced(&tx);
        assert_eq!(tx.body.outputs.len(), 1);
        assert_eq!(tx.change_index, None);
        assert_eq!(
            builder().max_sendable(&pool, &theirs()).unwrap(),
            7_000_000 - tx.body.fee
        );
    }

    #[test]
    fn sweep_of_dust_is_insufficient() {
        assert!(matches!(
            builder().max_sendable(&[utxo(0, 100_000)], &theirs()),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn iteration_cap_is_enforced() {
        let config = BuilderConfig {
            max_fee_iterations: 1,
            ..BuilderConfig::default()
        };
        assert_eq!(
            TxBuilder::new(config)
                .build(&pay(2_000_000), &[utxo(0, 10_000_000)])
                .unwrap_err(),
            WalletError::FeeDidNotConverge { iterations: 1 }
        );
    }

    #[test]
    fn metadata_hash_is_committed_to() {
        let metadata = TxMetadata::new(hex::decode("a1016568656c6c6f").unwrap()).unwrap();
        let tx = builder()
            .build(&pay(2_000_000).with_metadata(metadata.clone()), &[utxo(0, 10_000_000)])
            .unwrap();
        assert_eq!(tx.body.metadata_hash, Some(metadata.hash()));
        assert_eq!(tx.metadata, Some(metadata));
        assert_balanced(&tx);
    }

    #[test]
    fn legacy_era_refuses_current_features() {
        let builder = TxBuilder::new(BuilderConfig {
            params: TxParams::byron(),
            ..BuilderConfig::default()
        });
        assert!(matches!(
            builder.build(&pay(2_000_000).with_ttl(100), &[utxo(0, 10_000_000)]),
            Err(WalletError::InvalidRequest(_))
        ));
    }
}
