use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use contact_server_domain::{
    ServiceError, ServiceResult,
    contact::{Contact, ContactRepository, WriteLease},
};
use fs4::fs_std::FileExt;
use log::{debug, info, warn};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use uuid::Uuid;

use crate::record::{encode, header, parse_file, render_file};

/// Stores contacts in a comma-separated record file with a header row.
pub struct CsvContactRepository {
    path: PathBuf,
}

fn io_error(path: &Path, e: std::io::Error) -> ServiceError {
    ServiceError::Internal(format!("{}: {}", path.display(), e))
}

impl CsvContactRepository {
    /// Opens the record file at `path`, creating it with only a header row
    /// if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> ServiceResult<Self> {
        let path = path.into();
        let exists = tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error(&path, e))?;
        if !exists {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| io_error(parent, e))?;
            }
            tokio::fs::write(&path, format!("{}\n", header()))
                .await
                .map_err(|e| io_error(&path, e))?;
            info!("Created record file {}", path.display());
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_text(&self) -> ServiceResult<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Record file {} is missing", self.path.display());
                Ok(String::new())
            }
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn sibling_path(&self, suffix: &str) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "contacts".to_string());
        self.path
            .with_file_name(format!(".{}.{}", file_name, suffix))
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling_path(&format!("{}.tmp", Uuid::new_v4()))
    }

    /// Advisory lock file shared by every process writing this record file.
    fn lock_path(&self) -> PathBuf {
        self.sibling_path("lock")
    }

    async fn write_temp(&self, temp_path: &Path, content: &str) -> ServiceResult<()> {
        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| io_error(temp_path, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| io_error(temp_path, e))?;
        file.sync_all().await.map_err(|e| io_error(temp_path, e))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContactRepository for CsvContactRepository {
    async fn lock_for_write(&self) -> ServiceResult<WriteLease> {
        let lock_path = self.lock_path();
        let file = tokio::task::spawn_blocking(move || {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .truncate(false)
                .write(true)
                .open(&lock_path)
                .map_err(|e| io_error(&lock_path, e))?;
            FileExt::lock_exclusive(&file).map_err(|e| io_error(&lock_path, e))?;
            Ok::<_, ServiceError>(file)
        })
        .await
        .map_err(|e| ServiceError::Internal(format!("lock task failed: {}", e)))??;

        // closing the file releases the lock
        Ok(WriteLease::new(file))
    }

    async fn load_all(&self) -> ServiceResult<Vec<Contact>> {
        let text = self.read_text().await?;
        parse_file(&text).map_err(|e| {
            ServiceError::Internal(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn append(&self, contact: &Contact) -> ServiceResult<()> {
        let text = self.read_text().await?;
        let mut chunk = String::new();
        if text.trim().is_empty() {
            chunk.push_str(&header());
            chunk.push('\n');
        } else if !text.ends_with('\n') {
            chunk.push('\n');
        }
        chunk.push_str(&encode(contact));
        chunk.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;
        file.write_all(chunk.as_bytes())
            .await
            .map_err(|e| io_error(&self.path, e))?;
        file.sync_data()
            .await
            .map_err(|e| io_error(&self.path, e))?;

        debug!("Appended contact {} to {}", contact.id, self.path.display());
        Ok(())
    }

    async fn replace_all(&self, contacts: &[Contact]) -> ServiceResult<()> {
        let temp_path = self.temp_path();
        let content = render_file(contacts);

        let written = match self.write_temp(&temp_path, &content).await {
            Ok(()) => tokio::fs::rename(&temp_path, &self.path)
                .await
                .map_err(|e| io_error(&self.path, e)),
            Err(e) => Err(e),
        };
        if written.is_err() {
            if let Err(e) = tokio::fs::remove_file(&temp_path).await {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Failed to remove {}: {}", temp_path.display(), e);
                }
            }
        }
        written?;

        debug!(
            "Rewrote {} with {} contacts",
            self.path.display(),
            contacts.len()
        );
        Ok(())
    }
}
