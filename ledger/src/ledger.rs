use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{mpsc, Arc};

use aggregations::Progress;
use core_types::{
    error::{LedgerError, Result},
    types::{Account, AccountId, Favorite, Money, Payment, PaymentStatus},
    uid::{TokenUidSource, UidSource},
};
use log::debug;
use parking_lot::RwLock;

/// Records handled per part of the streaming sum.
const PROGRESS_PART_SIZE: usize = 100_000;

/// In-memory store of accounts, payments, and favorites.
///
/// All lookups are linear scans over the owning collection, first match
/// wins. That is the intentional trade-off at this ledger's scale; no
/// secondary index is kept. Collections live behind reader/writer locks so
/// aggregation passes can take a copy-on-read snapshot without callers
/// having to serialize their mutations.
pub struct Ledger {
    next_account_id: AtomicI64,
    accounts: RwLock<Vec<Account>>,
    payments: RwLock<Vec<Payment>>,
    favorites: RwLock<Vec<Favorite>>,
    uids: Arc<dyn UidSource>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_uid_source(Arc::new(TokenUidSource::new()))
    }

    /// Build a ledger with a caller-supplied token source. The ledger only
    /// assumes the tokens are globally unique.
    pub fn with_uid_source(uids: Arc<dyn UidSource>) -> Self {
        Self {
            next_account_id: AtomicI64::new(0),
            accounts: RwLock::new(Vec::new()),
            payments: RwLock::new(Vec::new()),
            favorites: RwLock::new(Vec::new()),
            uids,
        }
    }

    /// Register a new account with balance zero and the next sequential id.
    pub fn register_account(&self, phone: &str) -> Result<Account> {
        let mut accounts = self.accounts.write();
        if accounts.iter().any(|account| account.phone == phone) {
            return Err(LedgerError::PhoneAlreadyRegistered);
        }
        let id = self.next_account_id.fetch_add(1, Ordering::SeqCst) + 1;
        let account = Account {
            id,
            phone: phone.to_string(),
            balance: 0,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    pub fn deposit(&self, account_id: AccountId, amount: Money) -> Result<()> {
        if amount <= 0 {
            return Err(LedgerError::AmountMustBePositive);
        }
        let mut accounts = self.accounts.write();
        let account = find_account_mut(&mut accounts, account_id)?;
        account.balance =
            account
                .balance
                .checked_add(amount)
                .ok_or(LedgerError::BalanceOverflow {
                    balance: account.balance,
                    amount,
                })?;
        Ok(())
    }

    /// Debit `amount` from the account and append a new `InProgress`
    /// payment. The amount is debited exactly once, here.
    pub fn pay(&self, account_id: AccountId, amount: Money, category: &str) -> Result<Payment> {
        if amount <= 0 {
            return Err(LedgerError::AmountMustBePositive);
        }
        let payment = {
            let mut accounts = self.accounts.write();
            let account = find_account_mut(&mut accounts, account_id)?;
            if account.balance < amount {
                return Err(LedgerError::InsufficientBalance {
                    balance: account.balance,
                    amount,
                });
            }
            account.balance -= amount;
            Payment {
                id: self.uids.next_uid(),
                account_id,
                amount,
                category: category.to_string(),
                status: PaymentStatus::InProgress,
            }
        };
        self.payments.write().push(payment.clone());
        Ok(payment)
    }

    pub fn find_account(&self, account_id: AccountId) -> Result<Account> {
        self.accounts
            .read()
            .iter()
            .find(|account| account.id == account_id)
            .cloned()
            .ok_or(LedgerError::AccountNotFound { id: account_id })
    }

    pub fn find_payment(&self, payment_id: &str) -> Result<Payment> {
        self.payments
            .read()
            .iter()
            .find(|payment| payment.id == payment_id)
            .cloned()
            .ok_or_else(|| LedgerError::PaymentNotFound {
                id: payment_id.to_string(),
            })
    }

    /// Reject a payment: credit the account by the payment's current
    /// amount, zero the amount, and mark it `Fail`. The read-and-zero of
    /// the payment and the credit happen in one critical section, so the
    /// refund is applied exactly once even under concurrent rejection and
    /// no snapshot can observe the credit with the amount still pending.
    /// A rejected payment carries amount zero, so rejecting it again
    /// credits nothing; repeated rejection is permitted and is a no-op in
    /// effect.
    pub fn reject(&self, payment_id: &str) -> Result<()> {
        let mut payments = self.payments.write();
        let payment = payments
            .iter_mut()
            .find(|payment| payment.id == payment_id)
            .ok_or_else(|| LedgerError::PaymentNotFound {
                id: payment_id.to_string(),
            })?;
        let mut accounts = self.accounts.write();
        let account = find_account_mut(&mut accounts, payment.account_id)?;
        let refund = payment.amount;
        payment.amount = 0;
        payment.status = PaymentStatus::Fail;
        account.balance += refund;
        debug!("rejected payment {payment_id}, refunded {refund}");
        Ok(())
    }

    /// Issue a brand-new payment with the same account, amount, and
    /// category as an existing one.
    pub fn repeat(&self, payment_id: &str) -> Result<Payment> {
        let payment = self.find_payment(payment_id)?;
        self.pay(payment.account_id, payment.amount, &payment.category)
    }

    /// Capture a favorite template from an existing payment.
    pub fn favorite_payment(&self, payment_id: &str, name: &str) -> Result<Favorite> {
        let payment = self.find_payment(payment_id)?;
        let favorite = Favorite {
            id: self.uids.next_uid(),
            account_id: payment.account_id,
            name: name.to_string(),
            amount: payment.amount,
            category: payment.category,
        };
        self.favorites.write().push(favorite.clone());
        Ok(favorite)
    }

    /// Issue a new payment from a favorite's stored amount and category.
    pub fn pay_from_favorite(&self, favorite_id: &str) -> Result<Payment> {
        let favorite = self
            .favorites
            .read()
            .iter()
            .find(|favorite| favorite.id == favorite_id)
            .cloned()
            .ok_or_else(|| LedgerError::FavoriteNotFound {
                id: favorite_id.to_string(),
            })?;
        self.pay(favorite.account_id, favorite.amount, &favorite.category)
    }

    /// Copy-on-read snapshot of the account collection.
    pub fn accounts(&self) -> Vec<Account> {
        self.accounts.read().clone()
    }

    /// Copy-on-read snapshot of the payment collection. Aggregation passes
    /// scan the snapshot, so concurrent ledger mutations never race a scan.
    pub fn payments(&self) -> Vec<Payment> {
        self.payments.read().clone()
    }

    /// Copy-on-read snapshot of the favorite collection.
    pub fn favorites(&self) -> Vec<Favorite> {
        self.favorites.read().clone()
    }

    /// Point-in-time copy of all three collections. The locks are held
    /// together while cloning, in the same order `reject` takes them, so
    /// no mutation can land between the copies and the balance invariant
    /// holds across the snapshot as a whole.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let payments = self.payments.read();
        let accounts = self.accounts.read();
        let favorites = self.favorites.read();
        LedgerSnapshot {
            accounts: accounts.clone(),
            payments: payments.clone(),
            favorites: favorites.clone(),
        }
    }

    /// Merge imported accounts. A record whose id already exists is
    /// silently skipped (first-seen wins). The sequential id counter is
    /// advanced past the highest imported id so later registrations cannot
    /// collide. Returns the number of records applied.
    pub fn restore_accounts(&self, incoming: Vec<Account>) -> usize {
        let mut accounts = self.accounts.write();
        let mut applied = 0;
        for account in incoming {
            if accounts.iter().any(|existing| existing.id == account.id) {
                continue;
            }
            self.next_account_id.fetch_max(account.id, Ordering::SeqCst);
            accounts.push(account);
            applied += 1;
        }
        applied
    }

    /// Merge imported payments, skipping ids already present.
    pub fn restore_payments(&self, incoming: Vec<Payment>) -> usize {
        let mut payments = self.payments.write();
        let mut applied = 0;
        for payment in incoming {
            if payments.iter().any(|existing| existing.id == payment.id) {
                continue;
            }
            payments.push(payment);
            applied += 1;
        }
        applied
    }

    /// Merge imported favorites, skipping ids already present.
    pub fn restore_favorites(&self, incoming: Vec<Favorite>) -> usize {
        let mut favorites = self.favorites.write();
        let mut applied = 0;
        for favorite in incoming {
            if favorites.iter().any(|existing| existing.id == favorite.id) {
                continue;
            }
            favorites.push(favorite);
            applied += 1;
        }
        applied
    }

    /// Sum all payment amounts across `workers` parallel range scans.
    pub fn sum_payments(&self, workers: usize) -> Money {
        let snapshot = self.payments();
        aggregations::sum_amounts(&snapshot, workers)
    }

    /// All payments belonging to `account_id`, scanned in parallel. Account
    /// existence is checked before partitioning.
    pub fn filter_payments(&self, account_id: AccountId, workers: usize) -> Result<Vec<Payment>> {
        self.find_account(account_id)?;
        let snapshot = self.payments();
        Ok(aggregations::filter(
            &snapshot,
            |payment| payment.account_id == account_id,
            workers,
        ))
    }

    /// All payments matching an arbitrary predicate, scanned in parallel.
    pub fn filter_payments_by<F>(&self, predicate: F, workers: usize) -> Vec<Payment>
    where
        F: Fn(&Payment) -> bool + Sync,
    {
        let snapshot = self.payments();
        aggregations::filter(&snapshot, predicate, workers)
    }

    /// Streaming sum: partial results arrive in worker completion order and
    /// the sequence closes once every part has reported.
    pub fn sum_payments_with_progress(&self) -> mpsc::IntoIter<Progress> {
        let snapshot = Arc::new(self.payments());
        aggregations::sum_with_progress(snapshot, PROGRESS_PART_SIZE)
    }

    /// One account's payments in stable input order. Fails with
    /// `AccountNotFound` when the history is empty.
    pub fn export_account_history(&self, account_id: AccountId) -> Result<Vec<Payment>> {
        let history: Vec<Payment> = self
            .payments
            .read()
            .iter()
            .filter(|payment| payment.account_id == account_id)
            .cloned()
            .collect();
        if history.is_empty() {
            return Err(LedgerError::AccountNotFound { id: account_id });
        }
        Ok(history)
    }
}

/// Coherent copy of the ledger's collections, taken under all locks at
/// once by [`Ledger::snapshot`].
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub accounts: Vec<Account>,
    pub payments: Vec<Payment>,
    pub favorites: Vec<Favorite>,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}

fn find_account_mut(accounts: &mut [Account], account_id: AccountId) -> Result<&mut Account> {
    accounts
        .iter_mut()
        .find(|account| account.id == account_id)
        .ok_or(LedgerError::AccountNotFound { id: account_id })
}
