use std::path::{Path, PathBuf};

use tracing::debug;

use crate::email::Attachment;
use crate::error::StorageError;

/// Filename used when an attachment name has no usable final component.
const FALLBACK_NAME: &str = "attachment";

/// The part of an account identifier before its last `@`.
///
/// Identifiers without `@` are returned whole.
pub fn account_local_part(account: &str) -> &str {
    account
        .rsplit_once('@')
        .map_or(account, |(local, _domain)| local)
}

/// Writes attachments into `<root>/<local-part>/<category>/<name>`.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    root: PathBuf,
}

impl AttachmentStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one account's categories.
    pub fn account_dir(&self, account: &str) -> PathBuf {
        self.root.join(account_local_part(account))
    }

    /// Where an attachment called `name` of `category` would be written.
    pub fn path_for(&self, account: &str, category: &str, name: &str) -> PathBuf {
        self.account_dir(account)
            .join(category)
            .join(safe_file_name(name))
    }

    /// Creates the account directory up front. Existing directories are fine.
    pub async fn prepare_account(&self, account: &str) -> Result<PathBuf, StorageError> {
        let dir = self.account_dir(account);
        ensure_directory(&dir).await?;
        Ok(dir)
    }

    /// Writes the attachment, replacing any file of the same name, and
    /// returns the path written.
    pub async fn store(
        &self,
        attachment: &Attachment,
        account: &str,
        category: &str,
    ) -> Result<PathBuf, StorageError> {
        let path = self.path_for(account, category, &attachment.name);
        if let Some(dir) = path.parent() {
            ensure_directory(dir).await?;
        }

        debug!(path = %path.display(), bytes = attachment.content.len(), "Writing attachment");
        tokio::fs::write(&path, &attachment.content)
            .await
            .map_err(|e| StorageError::WriteFile {
                path: path.clone(),
                source: e,
            })?;

        Ok(path)
    }
}

async fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Keeps only the final component of `name` so it cannot leave its directory.
pub fn safe_file_name(name: &str) -> &str {
    // Treat backslashes as separators too; mail clients on Windows send them.
    let last = name.rsplit(&['/', '\\'][..]).next().unwrap_or(name);
    match last.trim() {
        "" | "." | ".." => FALLBACK_NAME,
        _ => last,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn attachment(name: &str, content: &[u8]) -> Attachment {
        Attachment {
            name: name.to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn test_account_local_part() {
        assert_eq!(account_local_part("02mok.tch@bpo.travel"), "02mok.tch");
        assert_eq!(account_local_part("odd@name@example.com"), "odd@name");
        assert_eq!(account_local_part("plain"), "plain");
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("report.PDF"), "report.PDF");
        assert_eq!(safe_file_name("../../etc/passwd"), "passwd");
        assert_eq!(safe_file_name("C:\\Users\\me\\scan.jpg"), "scan.jpg");
        assert_eq!(safe_file_name(".."), "attachment");
        assert_eq!(safe_file_name("dir/"), "attachment");
        assert_eq!(safe_file_name("x.pdf/"), "attachment");
        assert_eq!(safe_file_name(""), "attachment");
        assert_eq!(safe_file_name("Счёт №5.pdf"), "Счёт №5.pdf");
    }

    #[tokio::test]
    async fn test_store_then_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());
        let content: Vec<u8> = (0..=255u8).collect();

        let path = store
            .store(&attachment("blob.bin", &content), "02mok.tch@bpo.travel", "bins")
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("02mok.tch/bins/blob.bin"));
        assert_eq!(std::fs::read(&path).unwrap(), content);
    }

    #[tokio::test]
    async fn test_store_overwrites_same_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let first = store
            .store(&attachment("doc.pdf", b"first"), "a@x.org", "pdf")
            .await
            .unwrap();
        let second = store
            .store(&attachment("doc.pdf", b"second"), "a@x.org", "pdf")
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read(&second).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_accounts_are_partitioned() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let a = store
            .store(&attachment("same.xml", b"a"), "a@x.org", "xml")
            .await
            .unwrap();
        let b = store
            .store(&attachment("same.xml", b"b"), "b@x.org", "xml")
            .await
            .unwrap();

        assert_ne!(a, b);
        assert_eq!(std::fs::read(&a).unwrap(), b"a");
        assert_eq!(std::fs::read(&b).unwrap(), b"b");
    }

    #[tokio::test]
    async fn test_traversal_name_stays_in_category_dir() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let path = store
            .store(&attachment("../../escape.pdf", b"x"), "a@x.org", "pdf")
            .await
            .unwrap();

        assert_eq!(path, temp_dir.path().join("a/pdf/escape.pdf"));
    }

    #[tokio::test]
    async fn test_prepare_account_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let dir = store.prepare_account("05msv.tch@bpo.travel").await.unwrap();
        store.prepare_account("05msv.tch@bpo.travel").await.unwrap();

        assert!(dir.is_dir());
        assert_eq!(dir, temp_dir.path().join("05msv.tch"));
    }

    #[tokio::test]
    async fn test_write_failure_is_storage_error() {
        let temp_dir = TempDir::new().unwrap();
        // A regular file where the account directory should be.
        std::fs::write(temp_dir.path().join("a"), b"not a dir").unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let result = store
            .store(&attachment("doc.pdf", b"x"), "a@x.org", "pdf")
            .await;

        assert!(matches!(result, Err(StorageError::CreateDirectory { .. })));
    }

    #[tokio::test]
    async fn test_empty_content() {
        let temp_dir = TempDir::new().unwrap();
        let store = AttachmentStore::new(temp_dir.path());

        let path = store
            .store(&attachment("empty.dbf", b""), "a@x.org", "dbf")
            .await
            .unwrap();

        assert!(std::fs::read(&path).unwrap().is_empty());
    }
}
