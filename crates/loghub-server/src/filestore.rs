// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-client blob persistence.
//!
//! Each client gets its own directory under the base directory. The active
//! file is `current.logs.blob`; when it would exceed the size limit it is
//! renamed to `<first-entry-nanos>.logs.blob` and a fresh `current` file is
//! started. Reopening an existing `current` file recovers its first
//! record's timestamp so a later rotation keeps the naming scheme.

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use loghub::blob::{self, CURRENT_FILE_NAME, DEFAULT_FILE_SIZE_LIMIT, FILE_SUFFIX};
use loghub::proto::LogEntry;

use crate::store::{BatchWriter, LogStore, StoreError};

/// Persists logs in per-client blob files.
pub struct FileStore {
    base_dir: PathBuf,
    file_size_limit: u64,
    clients: Mutex<HashMap<String, Arc<ClientFile>>>,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileStore {
            base_dir: base_dir.into(),
            file_size_limit: DEFAULT_FILE_SIZE_LIMIT,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_size_limit(mut self, limit: u64) -> Self {
        self.file_size_limit = limit;
        self
    }

    fn client_file(&self, name: &str) -> Arc<ClientFile> {
        #[allow(clippy::expect_used)]
        let mut clients = self.clients.lock().expect("lock poisoned");
        Arc::clone(clients.entry(name.to_string()).or_insert_with(|| {
            Arc::new(ClientFile {
                dir: self.base_dir.join(name),
                size_limit: self.file_size_limit,
                state: Mutex::new(FileState::default()),
            })
        }))
    }
}

#[async_trait]
impl LogStore for FileStore {
    async fn write_batch(&self, client_name: &str) -> Result<Box<dyn BatchWriter>, StoreError> {
        Ok(Box::new(FileBatchWriter {
            file: self.client_file(client_name),
        }))
    }
}

struct FileBatchWriter {
    file: Arc<ClientFile>,
}

#[async_trait]
impl BatchWriter for FileBatchWriter {
    async fn write_entry(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        self.file.write_entry(entry)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Default)]
struct FileState {
    file: Option<fs::File>,
    start_time: i64,
    size: u64,
}

struct ClientFile {
    dir: PathBuf,
    size_limit: u64,
    state: Mutex<FileState>,
}

impl ClientFile {
    fn write_entry(&self, entry: &LogEntry) -> Result<(), StoreError> {
        let record = blob::encode_record(entry);
        #[allow(clippy::expect_used)]
        let mut state = self.state.lock().expect("lock poisoned");

        if state.file.is_none() {
            self.open_current(&mut state)?;
            if state.start_time == 0 {
                state.start_time = entry.nano_ts;
            }
        }
        if state.size + record.len() as u64 > self.size_limit {
            self.rotate(&mut state)?;
            state.start_time = entry.nano_ts;
        }

        #[allow(clippy::expect_used)]
        let file = state.file.as_mut().expect("file opened above");
        file.write_all(&record)?;
        file.sync_data()?;
        state.size += record.len() as u64;
        Ok(())
    }

    fn current_path(&self) -> PathBuf {
        self.dir.join(CURRENT_FILE_NAME)
    }

    /// Opens or creates the `current` file, recovering the start time from
    /// the first record of a pre-existing file.
    fn open_current(&self, state: &mut FileState) -> Result<(), StoreError> {
        let path = self.current_path();
        if !path.exists() {
            fs::create_dir_all(&self.dir)?;
            state.file = Some(fs::File::create(&path)?);
            state.size = 0;
            return Ok(());
        }
        let mut file = fs::OpenOptions::new().read(true).write(true).open(&path)?;
        if file.metadata()?.len() > 0 {
            let mut reader = blob::Reader::new(&mut file);
            if let Some(first) = reader.read_entry()? {
                state.start_time = first.nano_ts;
            }
        }
        let size = file.seek(SeekFrom::End(0))?;
        state.size = size;
        state.file = Some(file);
        Ok(())
    }

    fn rotate(&self, state: &mut FileState) -> Result<(), StoreError> {
        if state.file.take().is_some() {
            state.size = 0;
            let rotated = self
                .dir
                .join(format!("{}{}", state.start_time, FILE_SUFFIX));
            fs::rename(self.current_path(), rotated)?;
        }
        state.file = Some(fs::File::create(self.current_path())?);
        Ok(())
    }
}

/// Reads every entry of every blob file under a client directory, rotated
/// files first in rotation order, then the `current` file.
pub fn read_client_entries(dir: &Path) -> Result<Vec<LogEntry>, StoreError> {
    let mut rotated: Vec<PathBuf> = Vec::new();
    for dir_entry in fs::read_dir(dir)? {
        let path = dir_entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(FILE_SUFFIX) && name != CURRENT_FILE_NAME {
            rotated.push(path);
        }
    }
    rotated.sort();
    rotated.push(dir.join(CURRENT_FILE_NAME));

    let mut entries = Vec::new();
    for path in rotated {
        if !path.exists() {
            continue;
        }
        let file = fs::File::open(&path)?;
        read_blob_entries(file, &mut entries)?;
    }
    Ok(entries)
}

fn read_blob_entries(input: impl Read, entries: &mut Vec<LogEntry>) -> Result<(), StoreError> {
    let mut reader = blob::Reader::new(input);
    while let Some(entry) = reader.read_entry()? {
        entries.push(entry);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(nano_ts: i64) -> LogEntry {
        LogEntry {
            nano_ts,
            message: "persist me".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_writes_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let mut writer = store.write_batch("alice").await.unwrap();
        for ts in 1..=5 {
            writer.write_entry(&entry(ts)).await.unwrap();
        }
        writer.close().await.unwrap();

        let entries = read_client_entries(&dir.path().join("alice")).unwrap();
        assert_eq!(entries.iter().map(|e| e.nano_ts).collect::<Vec<_>>(), vec![
            1, 2, 3, 4, 5
        ]);
    }

    #[tokio::test]
    async fn test_rotation_renames_current() {
        let dir = tempfile::tempdir().unwrap();
        let record_size = blob::raw_record_size(&entry(1)) as u64;
        let store = FileStore::new(dir.path()).with_size_limit(2 * record_size);
        let mut writer = store.write_batch("bob").await.unwrap();
        for ts in 1..=5 {
            writer.write_entry(&entry(ts)).await.unwrap();
        }

        let client_dir = dir.path().join("bob");
        assert!(client_dir.join(CURRENT_FILE_NAME).exists());
        assert!(client_dir.join(format!("1{FILE_SUFFIX}")).exists());
        assert!(client_dir.join(format!("3{FILE_SUFFIX}")).exists());

        let entries = read_client_entries(&client_dir).unwrap();
        assert_eq!(
            entries.iter().map(|e| e.nano_ts).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[tokio::test]
    async fn test_reopen_recovers_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let record_size = blob::raw_record_size(&entry(1)) as u64;
        {
            let store = FileStore::new(dir.path()).with_size_limit(3 * record_size);
            let mut writer = store.write_batch("carol").await.unwrap();
            writer.write_entry(&entry(11)).await.unwrap();
        }
        // A fresh store reopens `current` and keeps the original start time
        // for the next rotation's file name.
        let store = FileStore::new(dir.path()).with_size_limit(3 * record_size);
        let mut writer = store.write_batch("carol").await.unwrap();
        for ts in [12, 13, 14] {
            writer.write_entry(&entry(ts)).await.unwrap();
        }
        let client_dir = dir.path().join("carol");
        assert!(client_dir.join(format!("11{FILE_SUFFIX}")).exists());
        let entries = read_client_entries(&client_dir).unwrap();
        assert_eq!(
            entries.iter().map(|e| e.nano_ts).collect::<Vec<_>>(),
            vec![11, 12, 13, 14]
        );
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .write_batch("a")
            .await
            .unwrap()
            .write_entry(&entry(1))
            .await
            .unwrap();
        store
            .write_batch("b")
            .await
            .unwrap()
            .write_entry(&entry(2))
            .await
            .unwrap();
        assert_eq!(read_client_entries(&dir.path().join("a")).unwrap().len(), 1);
        assert_eq!(read_client_entries(&dir.path().join("b")).unwrap().len(), 1);
    }
}
