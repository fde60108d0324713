//! In-process collaborators for tests and local runs
//!
//! Deterministic stand-ins for the consensus node, mirror node and an EVM
//! RPC. Behavior is steered through setters; every consensus call is
//! recorded for assertions.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ClientError, RepositoryError};
use crate::event::{BridgeEvent, EventKind, EventRecord, EventRepository, InMemoryEventRepository, Leg};
use crate::evm::{BridgeLog, EvmClient, EvmTransaction};
use crate::hedera::{
    AccountInfo, HederaNode, MirrorNode, MirrorTransaction, ScheduleOutcome, TokenInfo,
    TransactionResponse,
};
use crate::types::{
    AccountAmount, AccountId, EntityId, Receipt, ReceiptStatus, ScheduleId, TokenId, TransactionId,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A consensus-node call as the mock saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HederaCall {
    HbarTransfer {
        transfers: Vec<AccountAmount>,
        memo: String,
    },
    TokenTransfer {
        token: TokenId,
        transfers: Vec<AccountAmount>,
        memo: String,
    },
    Mint {
        token: TokenId,
        amount: i64,
        memo: String,
    },
    Burn {
        token: TokenId,
        amount: i64,
        memo: String,
    },
    ScheduleSign {
        schedule_id: ScheduleId,
    },
}

/// Consensus node double.
///
/// Schedule creates succeed unless a status was queued with
/// [`push_create_status`](Self::push_create_status). An
/// `IDENTICAL_SCHEDULE_ALREADY_CREATED` receipt points at
/// [`existing_schedule_id`](Self::existing_schedule_id).
pub struct MockHederaNode {
    calls: Mutex<Vec<HederaCall>>,
    receipts: Mutex<FxHashMap<TransactionId, Receipt>>,
    create_statuses: Mutex<VecDeque<ReceiptStatus>>,
    sign_status: Mutex<ReceiptStatus>,
    fail_submit: AtomicBool,
    fail_receipt: AtomicBool,
    seq: AtomicU64,
}

impl Default for MockHederaNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHederaNode {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            receipts: Mutex::new(FxHashMap::default()),
            create_statuses: Mutex::new(VecDeque::new()),
            sign_status: Mutex::new(ReceiptStatus::Success),
            fail_submit: AtomicBool::new(false),
            fail_receipt: AtomicBool::new(false),
            seq: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<HederaCall> {
        lock(&self.calls).clone()
    }

    /// Status for the next schedule create; later creates fall back to SUCCESS
    pub fn push_create_status(&self, status: ReceiptStatus) {
        lock(&self.create_statuses).push_back(status);
    }

    pub fn set_sign_status(&self, status: ReceiptStatus) {
        *lock(&self.sign_status) = status;
    }

    pub fn set_fail_submit(&self, fail: bool) {
        self.fail_submit.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_receipt(&self, fail: bool) {
        self.fail_receipt.store(fail, Ordering::SeqCst);
    }

    /// Schedule another validator is pretended to have created
    pub fn existing_schedule_id(&self) -> ScheduleId {
        ScheduleId("0.0.9999".to_string())
    }

    fn next_transaction_id(&self) -> TransactionId {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        TransactionId(format!("0.0.2@{seq}.0"))
    }

    fn schedule_create(&self, call: HederaCall) -> Result<TransactionResponse, ClientError> {
        lock(&self.calls).push(call);
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("submit refused".to_string()));
        }

        let transaction_id = self.next_transaction_id();
        let status = lock(&self.create_statuses)
            .pop_front()
            .unwrap_or(ReceiptStatus::Success);

        let receipt = match status {
            ReceiptStatus::Success => Receipt {
                status,
                schedule_id: Some(ScheduleId(format!(
                    "0.0.{}",
                    9000 + self.seq.load(Ordering::SeqCst)
                ))),
                scheduled_transaction_id: Some(TransactionId(format!(
                    "{transaction_id}?scheduled"
                ))),
            },
            ReceiptStatus::IdenticalScheduleAlreadyCreated => Receipt {
                status,
                schedule_id: Some(self.existing_schedule_id()),
                scheduled_transaction_id: None,
            },
            status => Receipt::with_status(status),
        };
        lock(&self.receipts).insert(transaction_id.clone(), receipt);

        Ok(TransactionResponse { transaction_id })
    }
}

#[async_trait]
impl HederaNode for MockHederaNode {
    async fn submit_scheduled_hbar_transfer(
        &self,
        transfers: &[AccountAmount],
        memo: &str,
    ) -> Result<TransactionResponse, ClientError> {
        self.schedule_create(HederaCall::HbarTransfer {
            transfers: transfers.to_vec(),
            memo: memo.to_string(),
        })
    }

    async fn submit_scheduled_token_transfer(
        &self,
        token: TokenId,
        transfers: &[AccountAmount],
        memo: &str,
    ) -> Result<TransactionResponse, ClientError> {
        self.schedule_create(HederaCall::TokenTransfer {
            token,
            transfers: transfers.to_vec(),
            memo: memo.to_string(),
        })
    }

    async fn submit_scheduled_token_mint(
        &self,
        token: TokenId,
        amount: i64,
        memo: &str,
    ) -> Result<TransactionResponse, ClientError> {
        self.schedule_create(HederaCall::Mint {
            token,
            amount,
            memo: memo.to_string(),
        })
    }

    async fn submit_scheduled_token_burn(
        &self,
        token: TokenId,
        amount: i64,
        memo: &str,
    ) -> Result<TransactionResponse, ClientError> {
        self.schedule_create(HederaCall::Burn {
            token,
            amount,
            memo: memo.to_string(),
        })
    }

    async fn submit_schedule_sign(
        &self,
        schedule_id: &ScheduleId,
    ) -> Result<TransactionResponse, ClientError> {
        lock(&self.calls).push(HederaCall::ScheduleSign {
            schedule_id: schedule_id.clone(),
        });
        if self.fail_submit.load(Ordering::SeqCst) {
            return Err(ClientError::Connection("submit refused".to_string()));
        }

        let transaction_id = self.next_transaction_id();
        let status = lock(&self.sign_status).clone();
        lock(&self.receipts).insert(transaction_id.clone(), Receipt::with_status(status));
        Ok(TransactionResponse { transaction_id })
    }

    async fn get_receipt(&self, transaction_id: &TransactionId) -> Result<Receipt, ClientError> {
        if self.fail_receipt.load(Ordering::SeqCst) {
            return Err(ClientError::Timeout);
        }
        lock(&self.receipts)
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(transaction_id.to_string()))
    }
}

/// Mirror node double. Every account and token exists unless marked missing;
/// scheduled transactions resolve to the configured outcome right away, or
/// never when `hang` is set.
pub struct MockMirrorNode {
    outcome: Mutex<ScheduleOutcome>,
    hang: AtomicBool,
    missing_accounts: Mutex<FxHashSet<AccountId>>,
    missing_tokens: Mutex<FxHashSet<TokenId>>,
    waited: Mutex<Vec<TransactionId>>,
}

impl Default for MockMirrorNode {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMirrorNode {
    pub fn new() -> Self {
        Self {
            outcome: Mutex::new(ScheduleOutcome::Mined),
            hang: AtomicBool::new(false),
            missing_accounts: Mutex::new(FxHashSet::default()),
            missing_tokens: Mutex::new(FxHashSet::default()),
            waited: Mutex::new(Vec::new()),
        }
    }

    pub fn set_outcome(&self, outcome: ScheduleOutcome) {
        *lock(&self.outcome) = outcome;
    }

    pub fn set_hang(&self, hang: bool) {
        self.hang.store(hang, Ordering::SeqCst);
    }

    pub fn set_missing_account(&self, account: AccountId) {
        lock(&self.missing_accounts).insert(account);
    }

    pub fn set_missing_token(&self, token: TokenId) {
        lock(&self.missing_tokens).insert(token);
    }

    /// Scheduled transactions a mined watch was started for
    pub fn waited(&self) -> Vec<TransactionId> {
        lock(&self.waited).clone()
    }
}

#[async_trait]
impl MirrorNode for MockMirrorNode {
    async fn get_account(&self, account: AccountId) -> Result<AccountInfo, ClientError> {
        if lock(&self.missing_accounts).contains(&account) {
            return Err(ClientError::NotFound(account.to_string()));
        }
        Ok(AccountInfo {
            account,
            balance: 0,
        })
    }

    async fn get_token(&self, token: TokenId) -> Result<TokenInfo, ClientError> {
        if lock(&self.missing_tokens).contains(&token) {
            return Err(ClientError::NotFound(token.to_string()));
        }
        Ok(TokenInfo {
            token,
            treasury: EntityId::new(0, 0, 2),
            decimals: 8,
        })
    }

    async fn get_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Vec<MirrorTransaction>, ClientError> {
        Err(ClientError::NotFound(transaction_id.to_string()))
    }

    async fn wait_for_scheduled_transaction(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<ScheduleOutcome, ClientError> {
        lock(&self.waited).push(transaction_id.clone());
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(*lock(&self.outcome))
    }
}

/// EVM RPC double serving a fixed head and a list of decoded logs
pub struct MockEvmClient {
    chain_id: u64,
    head: AtomicU64,
    logs: Mutex<Vec<BridgeLog>>,
    transactions: Mutex<FxHashMap<String, EvmTransaction>>,
    failures: Mutex<VecDeque<ClientError>>,
    queries: Mutex<Vec<(u64, u64)>>,
}

impl MockEvmClient {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            head: AtomicU64::new(0),
            logs: Mutex::new(Vec::new()),
            transactions: Mutex::new(FxHashMap::default()),
            failures: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn set_head(&self, block: u64) {
        self.head.store(block, Ordering::SeqCst);
    }

    /// Add a log; its transaction is reported mined in the log's block
    pub fn push_log(&self, log: BridgeLog) {
        let tx = EvmTransaction {
            hash: log.tx_hash.clone(),
            block_number: Some(log.block_number),
        };
        lock(&self.transactions).insert(tx.hash.clone(), tx);
        lock(&self.logs).push(log);
    }

    pub fn set_transaction(&self, tx: EvmTransaction) {
        lock(&self.transactions).insert(tx.hash.clone(), tx);
    }

    /// Fail the next call with `error`
    pub fn push_failure(&self, error: ClientError) {
        lock(&self.failures).push_back(error);
    }

    /// Block ranges passed to `filter_logs`
    pub fn queries(&self) -> Vec<(u64, u64)> {
        lock(&self.queries).clone()
    }

    fn next_failure(&self) -> Result<(), ClientError> {
        match lock(&self.failures).pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EvmClient for MockEvmClient {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn block_number(&self) -> Result<u64, ClientError> {
        self.next_failure()?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn filter_logs(&self, from: u64, to: u64) -> Result<Vec<BridgeLog>, ClientError> {
        self.next_failure()?;
        lock(&self.queries).push((from, to));
        Ok(lock(&self.logs)
            .iter()
            .filter(|l| (from..=to).contains(&l.block_number))
            .cloned()
            .collect())
    }

    async fn transaction_by_hash(&self, hash: &str) -> Result<Option<EvmTransaction>, ClientError> {
        self.next_failure()?;
        Ok(lock(&self.transactions).get(hash).cloned())
    }
}

/// Event repository whose writes can be made to fail
#[derive(Default)]
pub struct FlakyEventRepository {
    inner: InMemoryEventRepository,
    fail_create: AtomicBool,
    fail_updates: AtomicBool,
}

impl FlakyEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    fn check_updates(&self) -> Result<(), RepositoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("update refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl EventRepository for FlakyEventRepository {
    async fn create(&self, kind: EventKind, event: &BridgeEvent) -> Result<bool, RepositoryError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("insert refused".to_string()));
        }
        self.inner.create(kind, event).await
    }

    async fn get(&self, id: &str) -> Result<Option<EventRecord>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn update_status_scheduled_token_mint_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError> {
        self.check_updates()?;
        self.inner
            .update_status_scheduled_token_mint_submitted(id, schedule_id, transaction_id)
            .await
    }

    async fn update_status_scheduled_token_mint_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError> {
        self.check_updates()?;
        self.inner.update_status_scheduled_token_mint_completed(id).await
    }

    async fn update_status_scheduled_token_transfer_submitted(
        &self,
        id: &str,
        schedule_id: &ScheduleId,
        transaction_id: &TransactionId,
    ) -> Result<(), RepositoryError> {
        self.check_updates()?;
        self.inner
            .update_status_scheduled_token_transfer_submitted(id, schedule_id, transaction_id)
            .await
    }

    async fn update_status_scheduled_token_transfer_completed(
        &self,
        id: &str,
    ) -> Result<(), RepositoryError> {
        self.check_updates()?;
        self.inner
            .update_status_scheduled_token_transfer_completed(id)
            .await
    }

    async fn update_status_failed(&self, id: &str, leg: Leg) -> Result<(), RepositoryError> {
        self.check_updates()?;
        self.inner.update_status_failed(id, leg).await
    }
}
