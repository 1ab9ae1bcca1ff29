use crate::{StateSink, StateSource};
use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// MemoryJournal is an in-process journal. Clones share the same frames.
#[derive(Debug, Clone, Default)]
pub struct MemoryJournal {
    inner: Arc<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    frames: Mutex<Vec<Bytes>>,
    appended: tokio::sync::Notify,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a reader at the start of the journal.
    pub fn reader(&self) -> MemoryJournalReader {
        MemoryJournalReader {
            journal: self.clone(),
            offset: 0,
        }
    }

    /// Copy of all frames appended so far.
    pub fn frames(&self) -> Vec<Bytes> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Bytes>> {
        self.inner
            .frames
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StateSink for MemoryJournal {
    async fn append(&self, frame: Bytes) -> anyhow::Result<()> {
        self.lock().push(frame);
        self.inner.appended.notify_waiters();
        Ok(())
    }
}

/// Reader of a [`MemoryJournal`], which waits for frames appended after it
/// reaches the end.
#[derive(Debug)]
pub struct MemoryJournalReader {
    journal: MemoryJournal,
    offset: usize,
}

#[async_trait]
impl StateSource for MemoryJournalReader {
    async fn receive(&mut self, timeout: Duration) -> anyhow::Result<Option<Bytes>> {
        loop {
            // Register for wake-up before checking, so an append in between isn't missed.
            let appended = self.journal.inner.appended.notified();

            let frame = self.journal.lock().get(self.offset).cloned();
            if let Some(frame) = frame {
                self.offset += 1;
                return Ok(Some(frame));
            }
            if tokio::time::timeout(timeout, appended).await.is_err() {
                return Ok(None);
            }
        }
    }
}

/// FileJournal appends frames to a local file, each prefixed by its
/// big-endian u32 length.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl FileJournal {
    /// Open `path` for appending, creating it if it doesn't exist.
    pub async fn create(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open journal {}", path.display()))?;

        Ok(Self {
            path,
            file: tokio::sync::Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StateSink for FileJournal {
    async fn append(&self, frame: Bytes) -> anyhow::Result<()> {
        let len = u32::try_from(frame.len())
            .with_context(|| format!("frame of {} bytes is too large", frame.len()))?;

        // Write the length and frame as one buffer, so that a failed write
        // leaves at most a torn tail.
        let mut buf = Vec::with_capacity(4 + frame.len());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&frame);

        let mut file = self.file.lock().await;
        file.write_all(&buf)
            .await
            .with_context(|| format!("failed to append to journal {}", self.path.display()))?;
        file.flush().await?;

        Ok(())
    }
}

/// Reader of a file written by [`FileJournal`].
#[derive(Debug)]
pub struct FileJournalReader {
    path: PathBuf,
    reader: tokio::io::BufReader<tokio::fs::File>,
}

impl FileJournalReader {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open journal {}", path.display()))?;

        Ok(Self {
            path,
            reader: tokio::io::BufReader::new(file),
        })
    }

    async fn read_frame(&mut self) -> anyhow::Result<Option<Bytes>> {
        let len = match self.reader.read_u32().await {
            Ok(len) => len,
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read journal {}", self.path.display()))
            }
        };

        let mut frame = vec![0; len as usize];
        match self.reader.read_exact(&mut frame).await {
            Ok(_) => Ok(Some(frame.into())),
            Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::warn!(
                    path = %self.path.display(),
                    len,
                    "journal ends with a truncated frame (ignoring)"
                );
                Ok(None)
            }
            Err(err) => {
                Err(err).with_context(|| format!("failed to read journal {}", self.path.display()))
            }
        }
    }
}

#[async_trait]
impl StateSource for FileJournalReader {
    async fn receive(&mut self, timeout: Duration) -> anyhow::Result<Option<Bytes>> {
        match tokio::time::timeout(timeout, self.read_frame()).await {
            Ok(result) => result,
            Err(_elapsed) => Ok(None),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_memory_journal() {
        let journal = MemoryJournal::new();
        let mut reader = journal.reader();
        assert_eq!(reader.receive(TIMEOUT).await.unwrap(), None);

        journal.append(Bytes::from_static(b"one")).await.unwrap();
        journal.append(Bytes::from_static(b"two")).await.unwrap();

        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "one");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "two");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap(), None);

        // A fresh reader starts over.
        assert_eq!(journal.reader().receive(TIMEOUT).await.unwrap().unwrap(), "one");
        assert_eq!(journal.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_reader_waits_for_appends() {
        let journal = MemoryJournal::new();
        let mut reader = journal.reader();

        let writer = journal.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.append(Bytes::from_static(b"late")).await.unwrap();
        });

        let frame = reader.receive(Duration::from_secs(5)).await.unwrap();
        assert_eq!(frame.unwrap(), "late");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_file_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.journal");

        let journal = FileJournal::create(&path).await.unwrap();
        journal.append(Bytes::from_static(b"hello")).await.unwrap();
        journal.append(Bytes::new()).await.unwrap();
        drop(journal);

        // Reopening appends after existing frames.
        let journal = FileJournal::create(&path).await.unwrap();
        journal.append(Bytes::from_static(b"world")).await.unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..9], b"\0\0\0\x05hello");

        let mut reader = FileJournalReader::open(&path).await.unwrap();
        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "hello");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "world");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_journal_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn.journal");

        let mut raw = vec![0, 0, 0, 2, b'o', b'k'];
        raw.extend_from_slice(&[0, 0, 0, 9, b'x']);
        std::fs::write(&path, raw).unwrap();

        let mut reader = FileJournalReader::open(&path).await.unwrap();
        assert_eq!(reader.receive(TIMEOUT).await.unwrap().unwrap(), "ok");
        assert_eq!(reader.receive(TIMEOUT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileJournalReader::open(dir.path().join("nope")).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to open journal"));
    }
}
