//! # Snapshot Store
//!
//! Integrity-checked file snapshot of the name list.
//!
//! ## Layout
//!
//! ```text
//! [sha512:64][payload length:u32][record count:u32][entry]*
//!
//! entry = [height:u32] list(full name, full next name, raw value)
//!         [signature count:u8] ([identity:32][signature:64])*
//! ```
//!
//! The digest covers, per record, `"{len}:{name}{len}:{next}{len}:{value}"`,
//! the height and every identity/signature pair in insertion order. Any
//! disagreement on load fails the whole load.

use crate::domain::errors::{RecordError, StoreError};
use crate::domain::identity::SignerId;
use crate::domain::name_list::NameList;
use crate::domain::record::{NameRecord, SignatureSet};
use qn_01_wire_codec::{read_str_list, write_str_list, WireBuffer};
use shared_crypto::{Ed25519Signature, Sha512Digest, Sha512Hasher};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest payload a snapshot may declare (16 MiB).
pub const MAX_SNAPSHOT_PAYLOAD: usize = 1 << 24;

/// Hash, length and count.
const PREAMBLE_LEN: usize = 64 + 4 + 4;

/// Smallest possible entry: height, an empty padded list, zero signatures.
const MIN_ENTRY_LEN: usize = 4 + 8 + 1;

fn snapshot_hash(records: &[NameRecord]) -> Sha512Digest {
    let mut hasher = Sha512Hasher::new();
    for record in records {
        let header = format!(
            "{}:{}{}:{}{}:{}",
            record.full_name().len(),
            record.full_name(),
            record.next_full_name().len(),
            record.next_full_name(),
            record.raw_value().len(),
            record.raw_value(),
        );
        hasher.update(header.as_bytes());
        hasher.update(&record.height().to_be_bytes());
        for (id, sig) in record.signatures().iter() {
            hasher.update(id.as_bytes());
            hasher.update(sig.as_bytes());
        }
    }
    hasher.finalize()
}

/// Serialise records into snapshot bytes.
pub fn encode_snapshot(records: &[NameRecord]) -> Result<Vec<u8>, StoreError> {
    let mut buf = WireBuffer::new();

    // prepend entries back to front so the file reads in list order
    for record in records.iter().rev() {
        let sigs: Vec<_> = record.signatures().iter().collect();
        let count = u8::try_from(sigs.len()).map_err(|_| StoreError::TooManySignatures {
            name: record.full_name().to_string(),
            count: sigs.len(),
        })?;
        for (id, sig) in sigs.iter().rev() {
            buf.push(sig.as_bytes());
            buf.push(id.as_bytes());
        }
        buf.push8(count);
        write_str_list(
            &mut buf,
            &[
                record.full_name(),
                record.next_full_name(),
                record.raw_value(),
            ],
        )?;
        buf.push32(record.height());
    }

    let payload = buf.size();
    if payload > MAX_SNAPSHOT_PAYLOAD {
        return Err(StoreError::TooLarge(payload as u64));
    }
    let count = u32::try_from(records.len()).map_err(|_| StoreError::TooLarge(payload as u64))?;
    buf.push32(count);
    buf.push32(payload as u32);
    buf.push(&snapshot_hash(records));
    Ok(buf.into_vec())
}

fn decode_entry(buf: &mut WireBuffer) -> Result<NameRecord, StoreError> {
    let height = buf.pop32()?;
    let fields = read_str_list(buf)?;
    let [name, next, value]: [Vec<u8>; 3] = fields.try_into().map_err(|f: Vec<_>| {
        RecordError::MalformedContent(format!("expected 3 fields, got {}", f.len()))
    })?;
    let utf8 =
        |b: Vec<u8>| String::from_utf8(b).map_err(|e| RecordError::MalformedContent(e.to_string()));
    let (name, next, value) = (utf8(name)?, utf8(next)?, utf8(value)?);

    let sig_count = buf.pop8()?;
    let mut signatures = SignatureSet::new();
    for _ in 0..sig_count {
        let id = SignerId::new(buf.pop_array()?);
        let sig = Ed25519Signature::from_bytes(buf.pop_array()?);
        signatures.insert(id, sig);
    }

    Ok(NameRecord::restore(&name, &next, &value, height, signatures)?)
}

/// Parse and verify snapshot bytes.
pub fn decode_snapshot(bytes: Vec<u8>) -> Result<Vec<NameRecord>, StoreError> {
    let mut buf = WireBuffer::wrap(bytes);
    let stored_hash: Sha512Digest = buf.pop_array()?;
    let payload = buf.pop32()?;
    let count = buf.pop32()?;

    if payload as usize > MAX_SNAPSHOT_PAYLOAD {
        return Err(StoreError::TooLarge(u64::from(payload)));
    }
    if count as usize > payload as usize / MIN_ENTRY_LEN {
        return Err(StoreError::ImplausibleCount { count, payload });
    }
    if buf.size() != payload as usize {
        return Err(StoreError::LengthMismatch {
            declared: payload as usize,
            actual: buf.size(),
        });
    }

    let mut records = Vec::with_capacity(count as usize);
    for _ in 0..count {
        records.push(decode_entry(&mut buf)?);
    }
    if !buf.is_empty() {
        return Err(StoreError::TrailingData(buf.size()));
    }
    if snapshot_hash(&records) != stored_hash {
        return Err(StoreError::HashMismatch);
    }
    Ok(records)
}

/// File-backed snapshot of the name list.
///
/// Writes go to `<path>.tmp`, are synced, then renamed over `path`, so a
/// crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Snapshot file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Persist `list`.
    pub fn save(&self, list: &NameList) -> Result<(), StoreError> {
        let bytes = encode_snapshot(list.records())?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        info!(
            path = %self.path.display(),
            records = list.len(),
            bytes = bytes.len(),
            "Stored name snapshot"
        );
        Ok(())
    }

    /// Load and verify the snapshot.
    pub fn load(&self) -> Result<NameList, StoreError> {
        let size = fs::metadata(&self.path)?.len();
        if size > (MAX_SNAPSHOT_PAYLOAD + PREAMBLE_LEN) as u64 {
            return Err(StoreError::TooLarge(size));
        }
        debug!(path = %self.path.display(), size, "Reading name snapshot");

        let records = decode_snapshot(fs::read(&self.path)?)?;
        info!(
            path = %self.path.display(),
            records = records.len(),
            "Loaded name snapshot"
        );
        Ok(NameList::from_records(records))
    }
}
