use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use politecrawl_core::CrawlError;

/// Write a JSON snapshot with atomic replace: the old file stays intact
/// until the new one is fully on disk.
pub fn save_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> Result<(), CrawlError> {
    std::fs::create_dir_all(dir).map_err(|e| CrawlError::Store(e.to_string()))?;
    let data = serde_json::to_vec(value).map_err(|e| CrawlError::Store(e.to_string()))?;

    let tmp = dir.join(format!("{name}.tmp"));
    let target = dir.join(name);
    std::fs::write(&tmp, data).map_err(|e| CrawlError::Store(e.to_string()))?;
    std::fs::rename(&tmp, &target).map_err(|e| CrawlError::Store(e.to_string()))
}

/// Best-effort read; a missing or unreadable snapshot is just absent.
pub fn load_json<T: DeserializeOwned>(dir: &Path, name: &str) -> Option<T> {
    let data = std::fs::read(dir.join(name)).ok()?;
    serde_json::from_slice(&data).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut value: HashMap<String, i64> = HashMap::new();
        value.insert("a.ics.uci.edu".to_string(), 1234);

        save_json(dir.path(), "last_request.json", &value).unwrap();
        let loaded: HashMap<String, i64> = load_json(dir.path(), "last_request.json").unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn replace_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        save_json(dir.path(), "x.json", &1u32).unwrap();
        save_json(dir.path(), "x.json", &2u32).unwrap();

        assert_eq!(load_json::<u32>(dir.path(), "x.json"), Some(2));
        assert!(!dir.path().join("x.json.tmp").exists());
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_json::<u32>(dir.path(), "absent.json"), None);
    }

    #[test]
    fn corrupt_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad.json"), b"{ not json").unwrap();
        assert_eq!(load_json::<u32>(dir.path(), "bad.json"), None);
    }
}
