//! `RocksDB` storage implementation.
//!
//! Rows are CBOR-encoded; every multi-row mutation goes through a single
//! `WriteBatch` so it commits atomically. Balance mutations additionally
//! take a per-account lock for the whole read-modify-write sequence, which
//! serialises concurrent credits and debits against the same account while
//! leaving unrelated accounts free to proceed.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use gofit_core::{
    Account, ChatMessage, Conversation, ConversationId, Transaction, TransactionId,
    TransactionStatus, UsageRecord, UserId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{
    BalanceReconciliation, StatusOutcome, Store, TransactionFilter, TransactionPage, UsageFilter,
    UsagePage, UsageStats,
};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Per-account write locks. Entries are created on first use and kept
    /// for the lifetime of the store; the registry itself is only held long
    /// enough to clone the account's lock handle.
    account_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            account_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Get (or create) the write lock for an account.
    fn account_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut registry = self
            .account_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        registry.entry(*user_id).or_default().clone()
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Collect all `(key, value)` pairs under `prefix` in a column family.
    fn prefix_scan(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            entries.push((key.to_vec(), value.to_vec()));
        }
        Ok(entries)
    }

    /// Read an account row regardless of its soft-delete state.
    fn read_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(user_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Read a live account or fail with `NotFound`.
    fn live_account(&self, user_id: &UserId) -> Result<Account> {
        self.get_account(user_id)?
            .ok_or_else(|| StoreError::not_found("account", user_id))
    }

    /// Read a transaction row regardless of its soft-delete state.
    fn read_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        self.db
            .get_cf(&cf, keys::transaction_key(transaction_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Read a live transaction or fail with `NotFound`.
    fn live_transaction(&self, transaction_id: &TransactionId) -> Result<Transaction> {
        self.get_transaction(transaction_id)?
            .ok_or_else(|| StoreError::not_found("transaction", transaction_id))
    }

    fn write_batch(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// All live transactions for one user, oldest first.
    fn user_transactions(&self, user_id: &UserId) -> Result<Vec<Transaction>> {
        let prefix = keys::user_transactions_prefix(user_id);
        let mut transactions = Vec::new();
        for (key, _) in self.prefix_scan(cf::TRANSACTIONS_BY_USER, &prefix)? {
            let Some(tx_id) = keys::transaction_id_from_user_key(&key) else {
                continue;
            };
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    /// All live usage records matching the filter's user scope, oldest first.
    fn usage_records(&self, user_id: Option<&UserId>) -> Result<Vec<UsageRecord>> {
        let mut records = Vec::new();

        if let Some(user_id) = user_id {
            let prefix = user_id.as_bytes().to_vec();
            for (key, _) in self.prefix_scan(cf::USAGE_BY_USER, &prefix)? {
                let Some(usage_id) = keys::usage_id_from_user_key(&key) else {
                    continue;
                };
                let cf = self.cf(cf::USAGE_RECORDS)?;
                let row = self
                    .db
                    .get_cf(&cf, keys::usage_key(&usage_id))
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                if let Some(data) = row {
                    let record: UsageRecord = Self::deserialize(&data)?;
                    if record.deleted_at.is_none() {
                        records.push(record);
                    }
                }
            }
        } else {
            // ULID keys iterate chronologically.
            let cf = self.cf(cf::USAGE_RECORDS)?;
            for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                let record: UsageRecord = Self::deserialize(&value)?;
                if record.deleted_at.is_none() {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Accounts
    // =========================================================================

    fn put_account(&self, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(account)?;
        self.db
            .put_cf(&cf, keys::account_key(&account.user_id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        Ok(self.read_account(user_id)?.filter(|a| !a.is_deleted()))
    }

    fn soft_delete_account(&self, user_id: &UserId) -> Result<()> {
        let mut account = self.live_account(user_id)?;

        let now = Utc::now();
        account.deleted_at = Some(now);
        account.updated_at = now;
        self.put_account(&account)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    fn insert_transaction(&self, transaction: &Transaction) -> Result<()> {
        // The webhook matches by code alone, so codes must not overlap among
        // live transactions.
        if self.find_transaction_by_code(&transaction.code)?.is_some() {
            return Err(StoreError::CodeCollision {
                code: transaction.code.clone(),
            });
        }

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let cf_by_code = self.cf(cf::TRANSACTIONS_BY_CODE)?;

        let value = Self::serialize(transaction)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_tx, keys::transaction_key(&transaction.id), &value);
        batch.put_cf(
            &cf_by_user,
            keys::user_transaction_key(
                &transaction.user_id,
                transaction.created_at,
                &transaction.id,
            ),
            [],
        );
        batch.put_cf(
            &cf_by_code,
            keys::code_key(&transaction.code),
            transaction.id.as_bytes(),
        );

        self.write_batch(batch)
    }

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>> {
        Ok(self
            .read_transaction(transaction_id)?
            .filter(|t| !t.is_deleted()))
    }

    fn find_transaction_by_code(&self, code: &str) -> Result<Option<Transaction>> {
        let cf = self.cf(cf::TRANSACTIONS_BY_CODE)?;
        let Some(raw) = self
            .db
            .get_cf(&cf, keys::code_key(code))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };

        let bytes: [u8; 16] = raw
            .as_slice()
            .try_into()
            .map_err(|_| StoreError::Serialization("malformed code index entry".into()))?;
        let transaction_id = TransactionId::from_uuid(uuid::Uuid::from_bytes(bytes));
        self.get_transaction(&transaction_id)
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
        limit: usize,
        offset: usize,
    ) -> Result<TransactionPage> {
        let mut matching = if let Some(user_id) = &filter.user_id {
            self.user_transactions(user_id)?
        } else {
            let cf = self.cf(cf::TRANSACTIONS)?;
            let mut all = Vec::new();
            for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
                let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
                let tx: Transaction = Self::deserialize(&value)?;
                if !tx.is_deleted() {
                    all.push(tx);
                }
            }
            all.sort_by_key(|t| t.created_at);
            all
        };

        matching.retain(|t| {
            filter.status.map_or(true, |s| t.status == s)
                && filter
                    .payment_method
                    .as_ref()
                    .map_or(true, |m| &t.payment_method == m)
        });

        // Newest first.
        matching.reverse();

        let total = matching.len();
        let results = matching.into_iter().skip(offset).take(limit).collect();

        Ok(TransactionPage { results, total })
    }

    fn soft_delete_transaction(&self, transaction_id: &TransactionId) -> Result<()> {
        let mut transaction = self.live_transaction(transaction_id)?;

        let now = Utc::now();
        transaction.deleted_at = Some(now);
        transaction.updated_at = now;

        let cf = self.cf(cf::TRANSACTIONS)?;
        let value = Self::serialize(&transaction)?;
        self.db
            .put_cf(&cf, keys::transaction_key(transaction_id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn update_transaction_status(
        &self,
        transaction_id: &TransactionId,
        status: TransactionStatus,
    ) -> Result<StatusOutcome> {
        // First read only resolves the owning account for the lock; the
        // authoritative read happens again under the lock.
        let owner = self.live_transaction(transaction_id)?.user_id;

        let lock = self.account_lock(&owner);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut transaction = self.live_transaction(transaction_id)?;

        if transaction.is_completed() {
            if status == TransactionStatus::Completed {
                // Idempotent replay: the credit already happened.
                return Ok(StatusOutcome {
                    transaction,
                    credited: None,
                    new_balance: None,
                    already_completed: true,
                });
            }
            return Err(StoreError::CompletedTransition {
                id: transaction_id.to_string(),
            });
        }

        let now = Utc::now();

        if status == TransactionStatus::Completed {
            let mut account = self.live_account(&owner)?;

            account.balance += transaction.amount;
            account.updated_at = now;
            transaction.status = TransactionStatus::Completed;
            transaction.updated_at = now;

            let cf_accounts = self.cf(cf::ACCOUNTS)?;
            let cf_tx = self.cf(cf::TRANSACTIONS)?;

            let mut batch = WriteBatch::default();
            batch.put_cf(
                &cf_accounts,
                keys::account_key(&owner),
                Self::serialize(&account)?,
            );
            batch.put_cf(
                &cf_tx,
                keys::transaction_key(transaction_id),
                Self::serialize(&transaction)?,
            );
            self.write_batch(batch)?;

            return Ok(StatusOutcome {
                credited: Some(transaction.amount),
                new_balance: Some(account.balance),
                transaction,
                already_completed: false,
            });
        }

        // Non-crediting transition: plain field update.
        transaction.status = status;
        transaction.updated_at = now;

        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        self.db
            .put_cf(
                &cf_tx,
                keys::transaction_key(transaction_id),
                Self::serialize(&transaction)?,
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(StatusOutcome {
            transaction,
            credited: None,
            new_balance: None,
            already_completed: false,
        })
    }

    // =========================================================================
    // Usage metering
    // =========================================================================

    fn debit_usage(&self, record: &UsageRecord) -> Result<i64> {
        let lock = self.account_lock(&record.user_id);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut account = self.live_account(&record.user_id)?;

        if account.balance < record.cost {
            return Err(StoreError::InsufficientFunds {
                balance: account.balance,
                required: record.cost,
            });
        }

        account.balance -= record.cost;
        account.updated_at = Utc::now();

        let cf_accounts = self.cf(cf::ACCOUNTS)?;
        let cf_usage = self.cf(cf::USAGE_RECORDS)?;
        let cf_by_user = self.cf(cf::USAGE_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_accounts,
            keys::account_key(&record.user_id),
            Self::serialize(&account)?,
        );
        batch.put_cf(&cf_usage, keys::usage_key(&record.id), Self::serialize(record)?);
        batch.put_cf(
            &cf_by_user,
            keys::user_usage_key(&record.user_id, &record.id),
            [],
        );
        self.write_batch(batch)?;

        Ok(account.balance)
    }

    fn list_usage(&self, filter: &UsageFilter, limit: usize, offset: usize) -> Result<UsagePage> {
        let mut matching = self.usage_records(filter.user_id.as_ref())?;

        matching.retain(|r| {
            filter.model.as_ref().map_or(true, |m| &r.model == m)
                && filter
                    .conversation_id
                    .map_or(true, |c| r.conversation_id == Some(c))
        });

        // Newest first.
        matching.reverse();

        let total = matching.len();
        let results = matching.into_iter().skip(offset).take(limit).collect();

        Ok(UsagePage { results, total })
    }

    fn usage_stats(&self, user_id: Option<&UserId>) -> Result<UsageStats> {
        let records = self.usage_records(user_id)?;

        let total_cost = records.iter().map(|r| r.cost).sum();
        let usage_count = records.len();

        if let Some(user_id) = user_id {
            let current_balance = self.get_account(user_id)?.map(|a| a.balance);
            Ok(UsageStats {
                total_cost,
                usage_count,
                distinct_users: None,
                current_balance,
            })
        } else {
            let distinct: HashSet<UserId> = records.iter().map(|r| r.user_id).collect();
            Ok(UsageStats {
                total_cost,
                usage_count,
                distinct_users: Some(distinct.len()),
                current_balance: None,
            })
        }
    }

    // =========================================================================
    // Conversations
    // =========================================================================

    fn put_conversation(&self, conversation: &Conversation) -> Result<()> {
        let cf_conv = self.cf(cf::CONVERSATIONS)?;
        let cf_by_user = self.cf(cf::CONVERSATIONS_BY_USER)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_conv,
            keys::conversation_key(&conversation.id),
            Self::serialize(conversation)?,
        );
        batch.put_cf(
            &cf_by_user,
            keys::user_conversation_key(&conversation.user_id, &conversation.id),
            [],
        );
        self.write_batch(batch)
    }

    fn get_conversation(&self, conversation_id: &ConversationId) -> Result<Option<Conversation>> {
        let cf = self.cf(cf::CONVERSATIONS)?;
        let conversation: Option<Conversation> = self
            .db
            .get_cf(&cf, keys::conversation_key(conversation_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()?;
        Ok(conversation.filter(|c| !c.is_deleted()))
    }

    fn list_conversations(&self, user_id: &UserId) -> Result<Vec<Conversation>> {
        let prefix = user_id.as_bytes().to_vec();
        let mut conversations = Vec::new();
        for (key, _) in self.prefix_scan(cf::CONVERSATIONS_BY_USER, &prefix)? {
            let Some(conversation_id) = keys::conversation_id_from_user_key(&key) else {
                continue;
            };
            if let Some(conversation) = self.get_conversation(&conversation_id)? {
                conversations.push(conversation);
            }
        }

        // Most recently active first.
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    fn append_message(&self, message: &ChatMessage) -> Result<()> {
        let mut conversation = self
            .get_conversation(&message.conversation_id)?
            .ok_or_else(|| StoreError::not_found("conversation", message.conversation_id))?;

        conversation.updated_at = Utc::now();

        let cf_messages = self.cf(cf::MESSAGES)?;
        let cf_conv = self.cf(cf::CONVERSATIONS)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(
            &cf_messages,
            keys::message_key(&message.conversation_id, &message.id),
            Self::serialize(message)?,
        );
        batch.put_cf(
            &cf_conv,
            keys::conversation_key(&conversation.id),
            Self::serialize(&conversation)?,
        );
        self.write_batch(batch)
    }

    fn list_messages(&self, conversation_id: &ConversationId) -> Result<Vec<ChatMessage>> {
        let prefix = keys::conversation_messages_prefix(conversation_id);
        let mut messages = Vec::new();
        for (_, value) in self.prefix_scan(cf::MESSAGES, &prefix)? {
            messages.push(Self::deserialize(&value)?);
        }
        Ok(messages)
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    fn reconcile_balance(&self, user_id: &UserId) -> Result<BalanceReconciliation> {
        let account = self.live_account(user_id)?;

        let computed_balance = self
            .user_transactions(user_id)?
            .iter()
            .filter(|t| t.is_completed())
            .map(|t| t.amount)
            .sum();

        Ok(BalanceReconciliation {
            user_id: *user_id,
            computed_balance,
            stored_balance: account.balance,
        })
    }
}
