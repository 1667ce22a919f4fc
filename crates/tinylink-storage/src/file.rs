use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tinylink_core::store::{LinkStore, ReadLinkStore, Result};
use tinylink_core::{Link, ShortCode, StorageError};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// On-disk shape of the journal: `{"links": {"<code>": <link>, ...}}`.
#[derive(Debug, Default, Deserialize)]
struct Journal {
    #[serde(default)]
    links: HashMap<String, Link>,
}

#[derive(Serialize)]
struct JournalRef<'a> {
    links: &'a HashMap<String, Link>,
}

/// A link store kept in memory and journaled to a single JSON file.
///
/// All links live in one map behind a reader/writer lock. `get` and `list`
/// take the shared lock; every write takes the exclusive lock and rewrites the
/// whole journal (write to `<file>.tmp`, fsync, rename over `<file>`) before
/// releasing it. If the journal cannot be written the in-memory change is
/// undone, so a reported success always means the change is on disk.
///
/// Waiting for the lock is the only suspension point of a write. Once the lock
/// is held, the mutation and the journal rewrite finish without yielding, so a
/// caller that stops waiting (a timeout, a dropped request) leaves the store
/// untouched.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    tmp_path: PathBuf,
    links: RwLock<HashMap<String, Link>>,
}

impl FileStore {
    /// Opens the journal at `path`, creating it (and its directory) if missing.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let inner = tokio::task::spawn_blocking(move || Inner::load(path))
            .await
            .map_err(|e| StorageError::Operation(format!("journal task failed: {e}")))??;

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Returns the path of the journal file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }
}

fn journal_error(path: &Path, err: io::Error) -> StorageError {
    StorageError::Journal(format!("{}: {err}", path.display()))
}

impl Inner {
    fn load(path: PathBuf) -> Result<Self> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| journal_error(dir, e))?;
        }

        let mut tmp_path = OsString::from(path.as_os_str());
        tmp_path.push(".tmp");

        let existing = match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => None,
            Ok(bytes) => Some(parse_journal(&path, &bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(journal_error(&path, e)),
        };

        let mut inner = Self {
            path,
            tmp_path: PathBuf::from(tmp_path),
            links: RwLock::new(HashMap::new()),
        };

        match existing {
            Some(links) => {
                debug!(path = %inner.path.display(), links = links.len(), "loaded link journal");
                *inner.links.get_mut() = links;
            }
            None => {
                debug!(path = %inner.path.display(), "creating empty link journal");
                inner.persist(&HashMap::new())?;
            }
        }

        Ok(inner)
    }

    /// Atomically replaces the journal with `links`.
    fn persist(&self, links: &HashMap<String, Link>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&JournalRef { links })
            .map_err(|e| StorageError::Journal(format!("serialize journal: {e}")))?;

        let result = write_synced(&self.tmp_path, &bytes)
            .and_then(|()| fs::rename(&self.tmp_path, &self.path));

        if let Err(e) = result {
            let _ = fs::remove_file(&self.tmp_path);
            return Err(journal_error(&self.path, e));
        }

        Ok(())
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn parse_journal(path: &Path, bytes: &[u8]) -> Result<HashMap<String, Link>> {
    let journal: Journal = serde_json::from_slice(bytes).map_err(|e| {
        StorageError::InvalidData(format!("malformed journal {}: {e}", path.display()))
    })?;

    if let Some((key, link)) = journal
        .links
        .iter()
        .find(|(key, link)| key.as_str() != link.code.as_str())
    {
        return Err(StorageError::InvalidData(format!(
            "journal key '{}' does not match link code '{}'",
            key, link.code
        )));
    }

    Ok(journal.links)
}

#[async_trait]
impl ReadLinkStore for FileStore {
    async fn get(&self, code: &ShortCode) -> Result<Option<Link>> {
        let links = self.inner.links.read().await;
        Ok(links.get(code.as_str()).cloned())
    }

    async fn list(&self) -> Result<Vec<Link>> {
        let links = self.inner.links.read().await;
        Ok(links.values().cloned().collect())
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn create(&self, link: Link) -> Result<()> {
        let mut links = self.inner.links.write().await;
        let key = link.code.as_str().to_owned();

        match links.entry(key.clone()) {
            Entry::Occupied(_) => return Err(StorageError::Conflict(key)),
            Entry::Vacant(vacant) => {
                vacant.insert(link);
            }
        }

        if let Err(err) = self.inner.persist(&links) {
            warn!(code = %key, error = %err, "journal write failed, rolling back create");
            links.remove(&key);
            return Err(err);
        }

        Ok(())
    }

    async fn increment_hit(&self, code: &ShortCode, at: Timestamp) -> Result<Link> {
        let mut links = self.inner.links.write().await;

        let Some(current) = links.get_mut(code.as_str()) else {
            return Err(StorageError::NotFound(code.to_string()));
        };
        let previous = current.clone();
        current.record_hit(at);
        let updated = current.clone();

        if let Err(err) = self.inner.persist(&links) {
            warn!(code = %code, error = %err, "journal write failed, rolling back hit");
            links.insert(code.to_string(), previous);
            return Err(err);
        }

        Ok(updated)
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let mut links = self.inner.links.write().await;

        let Some(removed) = links.remove(code.as_str()) else {
            return Err(StorageError::NotFound(code.to_string()));
        };

        if let Err(err) = self.inner.persist(&links) {
            warn!(code = %code, error = %err, "journal write failed, rolling back delete");
            links.insert(code.to_string(), removed);
            return Err(err);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link(c: &str, url: &str) -> Link {
        Link::new(code(c), url, Timestamp::from_second(1_700_000_000).unwrap())
    }

    async fn open_in(dir: &TempDir) -> FileStore {
        FileStore::open(dir.path().join("data").join("links.json"))
            .await
            .unwrap()
    }

    fn tmp_path(store: &FileStore) -> PathBuf {
        store.inner.tmp_path.clone()
    }

    #[tokio::test]
    async fn open_creates_directory_and_empty_journal() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        let contents = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value, serde_json::json!({ "links": {} }));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let at = Timestamp::from_second(1_700_000_500).unwrap();

        {
            let store = open_in(&dir).await;
            store
                .create(link("keep01", "https://example.com/a"))
                .await
                .unwrap();
            store
                .create(link("gone01", "https://example.com/b"))
                .await
                .unwrap();
            store.increment_hit(&code("keep01"), at).await.unwrap();
            store.delete(&code("gone01")).await.unwrap();
        }

        let store = open_in(&dir).await;
        let kept = store.get(&code("keep01")).await.unwrap().unwrap();
        assert_eq!(kept.long_url, "https://example.com/a");
        assert_eq!(kept.hit_count, 1);
        assert_eq!(kept.last_access_at, Some(at));
        assert!(store.get(&code("gone01")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn journal_is_keyed_by_code() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store.create(link("mycode", "https://a.com")).await.unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(value["links"]["mycode"]["long_url"], "https://a.com");
        assert_eq!(value["links"]["mycode"]["hit_count"], 0);
    }

    #[tokio::test]
    async fn temp_file_is_not_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;

        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();

        assert!(!tmp_path(&store).exists());
    }

    #[tokio::test]
    async fn empty_file_is_an_empty_journal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        fs::write(&path, "  \n").unwrap();

        let store = FileStore::open(&path).await.unwrap();

        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_journal_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        fs::write(&path, "{ not json").unwrap();

        let err = FileStore::open(&path).await.unwrap_err();

        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn mismatched_journal_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("links.json");
        let record = serde_json::to_value(link("abc123", "https://example.com")).unwrap();
        fs::write(
            &path,
            serde_json::json!({ "links": { "other1": record } }).to_string(),
        )
        .unwrap();

        let err = FileStore::open(&path).await.unwrap_err();

        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[tokio::test]
    async fn failed_journal_write_rolls_back_create() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        // a directory squatting on the temp path makes every journal write fail
        fs::create_dir(tmp_path(&store)).unwrap();

        let err = store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Journal(_)));
        assert!(store.get(&code("abc123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_journal_write_rolls_back_hit_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();
        fs::create_dir(tmp_path(&store)).unwrap();

        let at = Timestamp::from_second(1_700_000_900).unwrap();
        assert!(store.increment_hit(&code("abc123"), at).await.is_err());
        assert!(store.delete(&code("abc123")).await.is_err());

        let unchanged = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(unchanged, link("abc123", "https://example.com"));
    }

    #[tokio::test]
    async fn writes_abandoned_while_waiting_for_the_lock_change_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir).await;
        store
            .create(link("abc123", "https://example.com"))
            .await
            .unwrap();
        let before = fs::read(store.path()).unwrap();

        let reader = store.inner.links.read().await;
        let wait = Duration::from_millis(20);
        let at = Timestamp::from_second(1_700_000_900).unwrap();
        let target = code("abc123");
        let create = store.create(link("late01", "https://late.example"));
        assert!(tokio::time::timeout(wait, create).await.is_err());
        let hit = store.increment_hit(&target, at);
        assert!(tokio::time::timeout(wait, hit).await.is_err());
        let delete = store.delete(&target);
        assert!(tokio::time::timeout(wait, delete).await.is_err());
        drop(reader);

        assert!(store.get(&code("late01")).await.unwrap().is_none());
        let unchanged = store.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(unchanged, link("abc123", "https://example.com"));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    }
}
