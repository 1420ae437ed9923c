use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::{Deserialize, Serialize};

use politecrawl_core::CrawlError;

const RECORDS: TableDefinition<&str, UrlRecord> = TableDefinition::new("records");

/// One discovered URL. Keyed in the store by its scheme-free SHA-256 hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
    pub depth: u32,
    pub completed: bool,
}

impl redb::Value for UrlRecord {
    type SelfType<'a> = UrlRecord
    where
        Self: 'a;

    type AsBytes<'a> = Vec<u8>
    where
        Self: 'a;

    fn fixed_width() -> Option<usize> {
        None
    }

    fn from_bytes<'a>(data: &'a [u8]) -> Self::SelfType<'a>
    where
        Self: 'a,
    {
        serde_json::from_slice(data).unwrap()
    }

    fn as_bytes<'a, 'b: 'a>(value: &'a Self::SelfType<'b>) -> Self::AsBytes<'a>
    where
        Self: 'a,
        Self: 'b,
    {
        serde_json::to_vec(value).unwrap()
    }

    fn type_name() -> redb::TypeName {
        redb::TypeName::new("UrlRecord")
    }
}

fn store_err(e: impl Display) -> CrawlError {
    CrawlError::Store(e.to_string())
}

/// Persistent URL-hash -> record mapping. Every mutation runs in its own
/// committed write transaction, so a crash loses at most the record being
/// written.
pub struct DiscoveryIndex {
    db: Database,
}

impl DiscoveryIndex {
    pub fn open(path: &Path, restart: bool) -> Result<Self, CrawlError> {
        if restart && path.exists() {
            std::fs::remove_file(path).map_err(store_err)?;
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(store_err)?;
            }
        }

        let db = if path.exists() {
            Database::open(path).map_err(store_err)?
        } else {
            Database::create(path).map_err(store_err)?
        };

        // make sure the table exists
        let txn = db.begin_write().map_err(store_err)?;
        txn.open_table(RECORDS).map_err(store_err)?;
        txn.commit().map_err(store_err)?;

        Ok(Self { db })
    }

    pub fn has(&self, hash: &str) -> Result<bool, CrawlError> {
        Ok(self.get(hash)?.is_some())
    }

    pub fn get(&self, hash: &str) -> Result<Option<UrlRecord>, CrawlError> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(RECORDS).map_err(store_err)?;
        Ok(table.get(hash).map_err(store_err)?.map(|g| g.value()))
    }

    pub fn put(&self, hash: &str, record: &UrlRecord) -> Result<(), CrawlError> {
        let txn = self.db.begin_write().map_err(store_err)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(store_err)?;
            table.insert(hash, record).map_err(store_err)?;
        }
        txn.commit().map_err(store_err)
    }

    /// Flip `completed` to true. Returns false when the hash was unknown;
    /// the record is written either way so the completion survives a crash.
    pub fn set_completed(&self, hash: &str, url: &str, depth: u32) -> Result<bool, CrawlError> {
        let txn = self.db.begin_write().map_err(store_err)?;
        let known = {
            let mut table = txn.open_table(RECORDS).map_err(store_err)?;
            let existing = table.get(hash).map_err(store_err)?.map(|g| g.value());
            let known = existing.is_some();
            let record = match existing {
                Some(mut record) => {
                    record.completed = true;
                    record
                }
                None => UrlRecord {
                    url: url.to_string(),
                    depth,
                    completed: true,
                },
            };
            table.insert(hash, &record).map_err(store_err)?;
            known
        };
        txn.commit().map_err(store_err)?;
        Ok(known)
    }

    /// All records with `completed == false`, for resuming a crawl.
    pub fn iter_open(&self) -> Result<Vec<UrlRecord>, CrawlError> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(RECORDS).map_err(store_err)?;
        let mut open = Vec::new();
        for item in table.iter().map_err(store_err)? {
            let (_, value) = item.map_err(store_err)?;
            let record = value.value();
            if !record.completed {
                open.push(record);
            }
        }
        Ok(open)
    }

    pub fn len(&self) -> Result<u64, CrawlError> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(RECORDS).map_err(store_err)?;
        table.len().map_err(store_err)
    }

    pub fn is_empty(&self) -> Result<bool, CrawlError> {
        Ok(self.len()? == 0)
    }

    /// (total, completed) counts.
    pub fn counts(&self) -> Result<(u64, u64), CrawlError> {
        let txn = self.db.begin_read().map_err(store_err)?;
        let table = txn.open_table(RECORDS).map_err(store_err)?;
        let mut total = 0u64;
        let mut completed = 0u64;
        for item in table.iter().map_err(store_err)? {
            let (_, value) = item.map_err(store_err)?;
            total += 1;
            if value.value().completed {
                completed += 1;
            }
        }
        Ok((total, completed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_index(restart: bool, dir: &tempfile::TempDir) -> DiscoveryIndex {
        DiscoveryIndex::open(&dir.path().join("frontier.redb"), restart).unwrap()
    }

    fn record(url: &str, depth: u32) -> UrlRecord {
        UrlRecord {
            url: url.to_string(),
            depth,
            completed: false,
        }
    }

    #[test]
    fn put_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let index = temp_index(true, &dir);

        assert!(!index.has("h1").unwrap());
        index.put("h1", &record("http://www.ics.uci.edu/a", 2)).unwrap();
        assert!(index.has("h1").unwrap());
        assert_eq!(
            index.get("h1").unwrap(),
            Some(record("http://www.ics.uci.edu/a", 2))
        );
    }

    #[test]
    fn set_completed_flips_flag() {
        let dir = tempfile::tempdir().unwrap();
        let index = temp_index(true, &dir);

        index.put("h1", &record("http://www.ics.uci.edu/a", 0)).unwrap();
        assert!(index.set_completed("h1", "http://www.ics.uci.edu/a", 0).unwrap());
        assert!(index.get("h1").unwrap().unwrap().completed);
        assert!(index.iter_open().unwrap().is_empty());
    }

    #[test]
    fn set_completed_on_unknown_hash_reports_it() {
        let dir = tempfile::tempdir().unwrap();
        let index = temp_index(true, &dir);

        assert!(!index.set_completed("h9", "http://www.ics.uci.edu/x", 1).unwrap());
        // the completion is still recorded
        assert!(index.get("h9").unwrap().unwrap().completed);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = temp_index(true, &dir);
            index.put("h1", &record("http://www.ics.uci.edu/a", 0)).unwrap();
            index.put("h2", &record("http://www.ics.uci.edu/b", 1)).unwrap();
            index.set_completed("h1", "http://www.ics.uci.edu/a", 0).unwrap();
        }

        let index = temp_index(false, &dir);
        assert_eq!(index.len().unwrap(), 2);
        let open = index.iter_open().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].url, "http://www.ics.uci.edu/b");
    }

    #[test]
    fn restart_wipes_existing_state() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = temp_index(true, &dir);
            index.put("h1", &record("http://www.ics.uci.edu/a", 0)).unwrap();
        }

        let index = temp_index(true, &dir);
        assert!(index.is_empty().unwrap());
    }

    #[test]
    fn counts_totals_and_completed() {
        let dir = tempfile::tempdir().unwrap();
        let index = temp_index(true, &dir);
        index.put("h1", &record("http://www.ics.uci.edu/a", 0)).unwrap();
        index.put("h2", &record("http://www.ics.uci.edu/b", 0)).unwrap();
        index.set_completed("h2", "http://www.ics.uci.edu/b", 0).unwrap();
        assert_eq!(index.counts().unwrap(), (2, 1));
    }
}
