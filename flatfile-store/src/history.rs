use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use core_types::{
    error::{LedgerError, Result},
    types::Payment,
};
use log::debug;

use crate::codec::payment_line;

const HISTORY_FILE_STEM: &str = "payments";
const HISTORY_FILE_EXT: &str = "dump";

/// Write an account's payment history into bounded-size dump files.
///
/// When everything fits within `records_per_file` a single unsuffixed file
/// is written; otherwise `ceil(len / records_per_file)` files with a
/// 1-based numeric suffix, each holding exactly `records_per_file` entries
/// except the last. Entries keep their input order and use the payments
/// dump line format. Empty input succeeds and writes nothing.
pub fn history_to_files(payments: &[Payment], dir: &Path, records_per_file: usize) -> Result<()> {
    if records_per_file == 0 {
        return Err(LedgerError::InvalidRecordCount {
            count: records_per_file,
        });
    }
    if payments.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    if payments.len() <= records_per_file {
        let path = dir.join(format!("{HISTORY_FILE_STEM}.{HISTORY_FILE_EXT}"));
        return write_chunk(&path, payments);
    }
    for (idx, chunk) in payments.chunks(records_per_file).enumerate() {
        let path = dir.join(format!("{HISTORY_FILE_STEM}{}.{HISTORY_FILE_EXT}", idx + 1));
        write_chunk(&path, chunk)?;
    }
    Ok(())
}

fn write_chunk(path: &Path, payments: &[Payment]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for payment in payments {
        writer.write_all(payment_line(payment).as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    debug!("wrote {} history records to {}", payments.len(), path.display());
    Ok(())
}
