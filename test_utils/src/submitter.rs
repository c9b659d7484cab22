use async_trait::async_trait;
use sendada_codec::{decode_signed, era_transaction_id};
use sendada_common::{providers::Submitter, Era, TxHash, WalletError};
use tokio::sync::Mutex;

/// Submitter that keeps what it is sent and acknowledges with the decoded id
#[derive(Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<Vec<u8>>>,
    rejection: Mutex<Option<String>>,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every later submission with `reason`
    pub async fn reject_with(&self, reason: &str) {
        *self.rejection.lock().await = Some(reason.to_string());
    }

    pub async fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl Submitter for RecordingSubmitter {
    async fn submit(&self, signed: &[u8]) -> Result<TxHash, WalletError> {
        if let Some(reason) = self.rejection.lock().await.as_ref() {
            return Err(WalletError::RejectedByNetwork(reason.clone()));
        }
        let tx = decode_signed(Era::Shelley, signed).or_else(|_| decode_signed(Era::Byron, signed))?;
        let id = era_transaction_id(tx.era, &tx.body)?;
        self.submitted.lock().await.push(signed.to_vec());
        Ok(id)
    }
}
