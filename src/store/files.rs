//! File-backed thread storage

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt as _;
use tracing::{debug, trace};

use super::{check_title, Entry, Thread};
use crate::error::BoardError;

/// One directory of thread records and attachments.
///
/// | name | contents |
/// |---|---|
/// | `<title>` | thread record |
/// | `<title>-<filename>` | attachment |
/// | `.<title>-<filename>.part` | upload in progress |
/// | `.<title>.tmp` | thread rewrite in progress |
///
/// Callers are expected to have validated titles and filenames (see [`check_title`](super::check_title)).
#[derive(Debug, Clone)]
pub struct ThreadStore {
    root: PathBuf,
}

fn not_found(title: &str) -> impl FnOnce(std::io::Error) -> BoardError + '_ {
    move |e| match e.kind() {
        ErrorKind::NotFound => BoardError::ThreadNotFound(title.into()),
        _ => BoardError::Storage(e),
    }
}

impl ThreadStore {
    /// Opens a store rooted at `root`, creating the directory if need be
    pub async fn open<P: Into<PathBuf>>(root: P) -> std::io::Result<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The store directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, title: &str) -> PathBuf {
        self.root.join(title)
    }

    /// Where the attachment `filename` of thread `title` lives
    #[must_use]
    pub fn attachment_path(&self, title: &str, filename: &str) -> PathBuf {
        self.root.join(format!("{title}-{filename}"))
    }

    /// Where an upload is written before it is complete
    #[must_use]
    pub fn staging_path(&self, title: &str, filename: &str) -> PathBuf {
        self.root.join(format!(".{title}-{filename}.part"))
    }

    /// Does the thread exist?
    pub async fn exists(&self, title: &str) -> Result<bool, BoardError> {
        Ok(tokio::fs::try_exists(self.record_path(title)).await?)
    }

    /// Does the attachment exist?
    pub async fn attachment_exists(&self, title: &str, filename: &str) -> Result<bool, BoardError> {
        Ok(tokio::fs::try_exists(self.attachment_path(title, filename)).await?)
    }

    /// Creates a new thread record holding only the creator line
    pub async fn create(&self, title: &str, creator: &str) -> Result<Thread, BoardError> {
        let thread = Thread::new(title, creator);
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.record_path(title))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => BoardError::ThreadExists(title.into()),
                _ => BoardError::Storage(e),
            })?;
        file.write_all(thread.encode().as_bytes()).await?;
        file.flush().await?;
        debug!("created record for thread {title}");
        Ok(thread)
    }

    /// Reads and parses a thread record
    pub async fn load(&self, title: &str) -> Result<Thread, BoardError> {
        let record = tokio::fs::read_to_string(self.record_path(title))
            .await
            .map_err(not_found(title))?;
        Thread::parse(title, &record)
    }

    /// Rewrites a whole thread record.
    ///
    /// The new contents go to a temporary file which is then renamed over the record,
    /// so readers only ever see the old record or the new one.
    pub async fn save(&self, thread: &Thread) -> Result<(), BoardError> {
        let title = thread.title();
        let temp = self.root.join(format!(".{title}.tmp"));
        tokio::fs::write(&temp, thread.encode()).await?;
        if let Err(e) = tokio::fs::rename(&temp, self.record_path(title)).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }
        trace!("rewrote thread {title}");
        Ok(())
    }

    /// Appends one line to an existing record
    pub async fn append(&self, title: &str, entry: &Entry) -> Result<(), BoardError> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .open(self.record_path(title))
            .await
            .map_err(not_found(title))?;
        file.write_all(format!("{entry}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Titles of every thread in the store, sorted.
    ///
    /// Attachments, staging files and anything else whose name could not be a title are skipped.
    pub async fn list(&self) -> Result<Vec<String>, BoardError> {
        let mut titles = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if check_title(&name).is_ok() {
                titles.push(name);
            }
        }
        titles.sort();
        Ok(titles)
    }

    /// Deletes a thread record and every attachment (or staged upload) belonging to it.
    ///
    /// Returns the number of attachment files removed.
    pub async fn remove(&self, title: &str) -> Result<usize, BoardError> {
        tokio::fs::remove_file(self.record_path(title))
            .await
            .map_err(not_found(title))?;
        let attachment_prefix = format!("{title}-");
        let staging_prefix = format!(".{title}-");
        let mut removed = 0;
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&attachment_prefix) || name.starts_with(&staging_prefix) {
                tokio::fs::remove_file(entry.path()).await?;
                trace!("removed {name}");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod test {
    use super::ThreadStore;
    use crate::error::BoardError;
    use pretty_assertions::assert_eq;

    async fn scratch() -> (tempfile::TempDir, ThreadStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ThreadStore::open(dir.path()).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn create_then_load() {
        let (_dir, store) = scratch().await;
        let _ = store.create("general", "alice").await.unwrap();
        assert!(store.exists("general").await.unwrap());
        let t = store.load("general").await.unwrap();
        assert_eq!(t.creator(), "alice");
        assert_eq!(t.message_count(), 0);
    }

    #[tokio::test]
    async fn create_twice_keeps_first_record() {
        let (_dir, store) = scratch().await;
        let mut t = store.create("general", "alice").await.unwrap();
        let e = t.post("alice", "hello").clone();
        store.append("general", &e).await.unwrap();
        let before = std::fs::read(store.root().join("general")).unwrap();

        let err = store.create("general", "bob").await.unwrap_err();
        assert!(matches!(err, BoardError::ThreadExists(_)));
        assert_eq!(std::fs::read(store.root().join("general")).unwrap(), before);
    }

    #[tokio::test]
    async fn missing_thread() {
        let (_dir, store) = scratch().await;
        assert!(matches!(
            store.load("nope").await,
            Err(BoardError::ThreadNotFound(t)) if t == "nope"
        ));
        let mut t = crate::store::Thread::new("nope", "x");
        let e = t.post("x", "y").clone();
        assert!(matches!(
            store.append("nope", &e).await,
            Err(BoardError::ThreadNotFound(_))
        ));
        assert!(matches!(
            store.remove("nope").await,
            Err(BoardError::ThreadNotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_rewrites_atomically() {
        let (dir, store) = scratch().await;
        let mut t = store.create("general", "alice").await.unwrap();
        let _ = t.post("alice", "one");
        let _ = t.post("alice", "two");
        store.save(&t).await.unwrap();
        let _ = t.delete(1, "alice").unwrap();
        store.save(&t).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("general")).unwrap(),
            "alice\n1 alice: two\n"
        );
        assert!(!dir.path().join(".general.tmp").exists());
    }

    #[tokio::test]
    async fn list_skips_non_threads() {
        let (dir, store) = scratch().await;
        for title in ["zebra", "apple"] {
            let _ = store.create(title, "alice").await.unwrap();
        }
        std::fs::write(dir.path().join("apple-photo.jpg"), b"jpeg").unwrap();
        std::fs::write(dir.path().join(".apple-big.bin.part"), b"partial").unwrap();
        std::fs::write(dir.path().join("credentials.txt"), b"alice pw\n").unwrap();
        std::fs::create_dir(dir.path().join("subdir")).unwrap();
        assert_eq!(store.list().await.unwrap(), vec!["apple", "zebra"]);
    }

    #[tokio::test]
    async fn remove_takes_attachments() {
        let (dir, store) = scratch().await;
        let _ = store.create("apple", "alice").await.unwrap();
        let _ = store.create("applepie", "alice").await.unwrap();
        std::fs::write(store.attachment_path("apple", "a.txt"), b"a").unwrap();
        std::fs::write(store.attachment_path("apple", "b.txt"), b"b").unwrap();
        std::fs::write(store.staging_path("apple", "c.txt"), b"c").unwrap();
        std::fs::write(store.attachment_path("applepie", "d.txt"), b"d").unwrap();

        assert_eq!(store.remove("apple").await.unwrap(), 3);

        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(left, vec!["applepie", "applepie-d.txt"]);
    }
}
