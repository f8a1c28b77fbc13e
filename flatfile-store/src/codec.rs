use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use core_types::{
    error::{LedgerError, Result},
    types::{Account, Favorite, Payment, PaymentStatus},
};
use ledger::Ledger;
use log::{debug, info};

use crate::config::StoreConfig;

const DELIMITER: char = ';';
const RECORD_TERMINATOR: char = '|';
/// Legacy streams are read in small fixed-size chunks to end-of-stream.
const LEGACY_READ_CHUNK: usize = 64;

/// Line codec over the three ledger collections. One dump file per
/// collection, `;`-delimited fields, newline-terminated records.
pub struct DumpStore {
    config: StoreConfig,
}

impl DumpStore {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Write one dump file per non-empty collection. Empty collections are
    /// skipped entirely; the directory is created recursively first. The
    /// collections are captured in one coherent snapshot, so a dump taken
    /// during concurrent mutation never records a refund applied to the
    /// account but missing from the payment, or vice versa.
    pub fn export(&self, ledger: &Ledger) -> Result<()> {
        self.config.ensure_dirs()?;
        let snapshot = ledger.snapshot();
        write_collection(&self.config.accounts_path(), &snapshot.accounts, account_line)?;
        write_collection(&self.config.payments_path(), &snapshot.payments, payment_line)?;
        write_collection(
            &self.config.favorites_path(),
            &snapshot.favorites,
            favorite_line,
        )?;
        info!("exported ledger state to {}", self.config.dir().display());
        Ok(())
    }

    /// Read each dump file if present (absence means nothing to import for
    /// that collection). Each file is staged in full before any record is
    /// applied, so a parse failure leaves the ledger untouched. Records
    /// whose id already exists are silently skipped.
    pub fn import(&self, ledger: &Ledger) -> Result<()> {
        if let Some(staged) = read_collection(&self.config.accounts_path(), parse_account)? {
            let applied = ledger.restore_accounts(staged);
            debug!("imported {applied} accounts");
        }
        if let Some(staged) = read_collection(&self.config.payments_path(), parse_payment)? {
            let applied = ledger.restore_payments(staged);
            debug!("imported {applied} payments");
        }
        if let Some(staged) = read_collection(&self.config.favorites_path(), parse_favorite)? {
            let applied = ledger.restore_favorites(staged);
            debug!("imported {applied} favorites");
        }
        Ok(())
    }
}

/// Legacy single-file accounts export: one unbroken byte stream with `;`
/// between fields and `|` after every record, no newlines. Accounts only.
pub fn export_to_file(ledger: &Ledger, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut content = String::new();
    for account in ledger.accounts() {
        let _ = write!(
            content,
            "{}{DELIMITER}{}{DELIMITER}{}{RECORD_TERMINATOR}",
            account.id, account.phone, account.balance
        );
    }
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Legacy single-file accounts import. The stream carries only the phone
/// worth keeping: ids are reissued by registration and balances are not
/// restored. Records that fail registration (duplicate phone) are skipped.
pub fn import_from_file(ledger: &Ledger, path: &Path) -> Result<()> {
    let mut file = File::open(path)?;
    let mut content = Vec::new();
    let mut buf = [0u8; LEGACY_READ_CHUNK];
    loop {
        let read = file.read(&mut buf)?;
        if read == 0 {
            break;
        }
        content.extend_from_slice(&buf[..read]);
    }
    let content = String::from_utf8_lossy(&content);
    for record in content.split(RECORD_TERMINATOR) {
        let fields: Vec<&str> = record.split(DELIMITER).collect();
        if fields.len() != 3 {
            continue;
        }
        if let Err(err) = ledger.register_account(fields[1]) {
            debug!("skipping legacy account {}: {err}", fields[1]);
        }
    }
    Ok(())
}

fn write_collection<T>(
    path: &Path,
    records: &[T],
    line: impl Fn(&T) -> String,
) -> Result<()> {
    if records.is_empty() {
        return Ok(());
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for record in records {
        writer.write_all(line(record).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    debug!("wrote {} records to {}", records.len(), path.display());
    Ok(())
}

fn read_collection<T>(
    path: &Path,
    parse: impl Fn(&LineFields<'_>) -> Result<T>,
) -> Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let file = path.display().to_string();
    let mut staged = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        staged.push(parse(&LineFields::split(&file, idx + 1, line))?);
    }
    Ok(Some(staged))
}

pub(crate) fn account_line(account: &Account) -> String {
    format!(
        "{}{DELIMITER}{}{DELIMITER}{}",
        account.id, account.phone, account.balance
    )
}

pub(crate) fn payment_line(payment: &Payment) -> String {
    format!(
        "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
        payment.id, payment.account_id, payment.amount, payment.category, payment.status
    )
}

pub(crate) fn favorite_line(favorite: &Favorite) -> String {
    format!(
        "{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
        favorite.id, favorite.account_id, favorite.name, favorite.amount, favorite.category
    )
}

fn parse_account(fields: &LineFields<'_>) -> Result<Account> {
    Ok(Account {
        id: fields.int(1)?,
        phone: fields.str(2)?.to_string(),
        balance: fields.int(3)?,
    })
}

fn parse_payment(fields: &LineFields<'_>) -> Result<Payment> {
    Ok(Payment {
        id: fields.str(1)?.to_string(),
        account_id: fields.int(2)?,
        amount: fields.int(3)?,
        category: fields.str(4)?.to_string(),
        status: fields.status(5)?,
    })
}

fn parse_favorite(fields: &LineFields<'_>) -> Result<Favorite> {
    Ok(Favorite {
        id: fields.str(1)?.to_string(),
        account_id: fields.int(2)?,
        name: fields.str(3)?.to_string(),
        amount: fields.int(4)?,
        category: fields.str(5)?.to_string(),
    })
}

/// One dump line split on the delimiter, with enough context to report a
/// malformed field by file, line, and 1-based column.
struct LineFields<'a> {
    file: &'a str,
    line: usize,
    fields: Vec<&'a str>,
}

impl<'a> LineFields<'a> {
    fn split(file: &'a str, line: usize, raw: &'a str) -> Self {
        Self {
            file,
            line,
            fields: raw.split(DELIMITER).collect(),
        }
    }

    fn str(&self, column: usize) -> Result<&'a str> {
        self.fields
            .get(column - 1)
            .copied()
            .ok_or_else(|| self.malformed(column, "missing field"))
    }

    fn int(&self, column: usize) -> Result<i64> {
        let raw = self.str(column)?;
        raw.parse()
            .map_err(|_| self.malformed(column, format!("invalid integer {raw:?}")))
    }

    fn status(&self, column: usize) -> Result<PaymentStatus> {
        let raw = self.str(column)?;
        PaymentStatus::parse(raw)
            .ok_or_else(|| self.malformed(column, format!("unknown status {raw:?}")))
    }

    fn malformed(&self, column: usize, reason: impl Into<String>) -> LedgerError {
        LedgerError::MalformedRecord {
            file: self.file.to_string(),
            line: self.line,
            column,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn populated_ledger() -> Ledger {
        let ledger = Ledger::new();
        let first = ledger.register_account("+992000000001").unwrap();
        let second = ledger.register_account("+992000000002").unwrap();
        ledger.deposit(first.id, 10_000).unwrap();
        ledger.deposit(second.id, 5_000).unwrap();
        let payment = ledger.pay(first.id, 1_200, "internet").unwrap();
        ledger.pay(second.id, 700, "phone").unwrap();
        let rejected = ledger.pay(first.id, 300, "phone").unwrap();
        ledger.reject(&rejected.id).unwrap();
        ledger.favorite_payment(&payment.id, "monthly").unwrap();
        ledger
    }

    #[test]
    fn export_then_import_round_trips_by_value() {
        let dir = tempdir().unwrap();
        let source = populated_ledger();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        store.export(&source).unwrap();

        let restored = Ledger::new();
        store.import(&restored).unwrap();
        assert_eq!(restored.accounts(), source.accounts());
        assert_eq!(restored.payments(), source.payments());
        assert_eq!(restored.favorites(), source.favorites());
    }

    #[test]
    fn reimport_does_not_duplicate_records() {
        let dir = tempdir().unwrap();
        let source = populated_ledger();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        store.export(&source).unwrap();

        let restored = Ledger::new();
        store.import(&restored).unwrap();
        store.import(&restored).unwrap();
        assert_eq!(restored.accounts().len(), source.accounts().len());
        assert_eq!(restored.payments().len(), source.payments().len());
        assert_eq!(restored.favorites().len(), source.favorites().len());
    }

    #[test]
    fn export_during_rejection_stays_internally_consistent() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new();
        let account = ledger.register_account("+992000000001").unwrap();
        ledger.deposit(account.id, 10_000).unwrap();
        let payments: Vec<Payment> = (0..100)
            .map(|_| ledger.pay(account.id, 3, "foo").unwrap())
            .collect();
        let store = DumpStore::new(StoreConfig::new(dir.path()));

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for payment in &payments {
                    ledger.reject(&payment.id).unwrap();
                }
            });
            // every dump captured mid-rejection must satisfy
            // balance == deposits - sum of in-progress amounts
            for _ in 0..20 {
                store.export(&ledger).unwrap();
                let restored = Ledger::new();
                store.import(&restored).unwrap();
                let active: i64 = restored
                    .payments()
                    .iter()
                    .filter(|p| p.status == PaymentStatus::InProgress)
                    .map(|p| p.amount)
                    .sum();
                assert_eq!(restored.accounts()[0].balance, 10_000 - active);
            }
        });
    }

    #[test]
    fn export_skips_empty_collections() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new();
        ledger.register_account("+992000000001").unwrap();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        store.export(&ledger).unwrap();

        assert!(store.config().accounts_path().exists());
        assert!(!store.config().payments_path().exists());
        assert!(!store.config().favorites_path().exists());
    }

    #[test]
    fn import_treats_missing_files_as_empty() {
        let dir = tempdir().unwrap();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        let ledger = Ledger::new();
        store.import(&ledger).unwrap();
        assert!(ledger.accounts().is_empty());
    }

    #[test]
    fn dump_lines_match_the_wire_schema() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new();
        let account = ledger.register_account("+992000000001").unwrap();
        ledger.deposit(account.id, 500).unwrap();
        let payment = ledger.pay(account.id, 200, "internet").unwrap();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        store.export(&ledger).unwrap();

        let accounts = fs::read_to_string(store.config().accounts_path()).unwrap();
        assert_eq!(accounts, format!("{};+992000000001;300\n", account.id));
        let payments = fs::read_to_string(store.config().payments_path()).unwrap();
        assert_eq!(
            payments,
            format!("{};{};200;internet;InProgress\n", payment.id, account.id)
        );
    }

    #[test]
    fn malformed_line_aborts_without_applying_anything() {
        let dir = tempdir().unwrap();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        fs::write(
            store.config().accounts_path(),
            "1;+992000000001;500\n2;+992000000002;not-a-number\n",
        )
        .unwrap();

        let ledger = Ledger::new();
        let err = store.import(&ledger).unwrap_err();
        match err {
            LedgerError::MalformedRecord { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("unexpected error {other:?}"),
        }
        // stage-then-commit: the valid first line must not have been applied
        assert!(ledger.accounts().is_empty());
    }

    #[test]
    fn unknown_status_is_a_malformed_record() {
        let dir = tempdir().unwrap();
        let store = DumpStore::new(StoreConfig::new(dir.path()));
        fs::write(
            store.config().payments_path(),
            "abc;1;200;internet;Succeeded\n",
        )
        .unwrap();

        let err = store.import(&Ledger::new()).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::MalformedRecord { column: 5, .. }
        ));
    }

    #[test]
    fn legacy_stream_uses_record_terminators_and_no_newlines() {
        let dir = tempdir().unwrap();
        let ledger = Ledger::new();
        let account = ledger.register_account("+992000000001").unwrap();
        ledger.deposit(account.id, 400).unwrap();
        let path = dir.path().join("accounts.legacy");
        export_to_file(&ledger, &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, format!("{};+992000000001;400|", account.id));
        assert!(!raw.contains('\n'));
    }

    #[test]
    fn legacy_import_registers_phones() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.legacy");
        fs::write(&path, "1;+992000000001;400|2;+992000000002;0|").unwrap();

        let ledger = Ledger::new();
        import_from_file(&ledger, &path).unwrap();
        let accounts = ledger.accounts();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].phone, "+992000000001");
        // ids are reissued and balances are not restored in the legacy path
        assert_eq!(accounts[0].balance, 0);
    }

    #[test]
    fn legacy_import_skips_duplicate_phones() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("accounts.legacy");
        fs::write(&path, "1;+992000000001;400|2;+992000000001;0|").unwrap();

        let ledger = Ledger::new();
        import_from_file(&ledger, &path).unwrap();
        assert_eq!(ledger.accounts().len(), 1);
    }
}
