//! Transfer repository

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rust_decimal::Decimal;

use super::record::TransferRecord;
use super::status::TransferStatus;
use crate::error::RepositoryError;

#[async_trait]
pub trait TransferRepository: Send + Sync {
    /// Insert the record. Returns `false` if the transaction id exists.
    async fn create(&self, record: &TransferRecord) -> Result<bool, RepositoryError>;

    async fn get(&self, transaction_id: &str) -> Result<Option<TransferRecord>, RepositoryError>;

    /// Move to `status`. Terminal records are never reopened.
    async fn update_status(
        &self,
        transaction_id: &str,
        status: TransferStatus,
    ) -> Result<(), RepositoryError>;

    async fn update_fee(&self, transaction_id: &str, fee: Decimal) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default)]
pub struct InMemoryTransferRepository {
    transfers: DashMap<String, TransferRecord>,
}

impl InMemoryTransferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TransferRepository for InMemoryTransferRepository {
    async fn create(&self, record: &TransferRecord) -> Result<bool, RepositoryError> {
        match self.transfers.entry(record.transaction_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(true)
            }
        }
    }

    async fn get(&self, transaction_id: &str) -> Result<Option<TransferRecord>, RepositoryError> {
        Ok(self.transfers.get(transaction_id).map(|r| r.value().clone()))
    }

    async fn update_status(
        &self,
        transaction_id: &str,
        status: TransferStatus,
    ) -> Result<(), RepositoryError> {
        let mut record = self
            .transfers
            .get_mut(transaction_id)
            .ok_or_else(|| RepositoryError::NotFound(transaction_id.to_string()))?;

        if record.status.is_terminal() {
            return Err(RepositoryError::InvalidTransition {
                id: transaction_id.to_string(),
                from: record.status.as_str(),
                to: status.as_str(),
            });
        }
        record.status = status;
        Ok(())
    }

    async fn update_fee(&self, transaction_id: &str, fee: Decimal) -> Result<(), RepositoryError> {
        let mut record = self
            .transfers
            .get_mut(transaction_id)
            .ok_or_else(|| RepositoryError::NotFound(transaction_id.to_string()))?;
        record.fee = Some(fee);
        Ok(())
    }
}
