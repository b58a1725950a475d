//! Local storage for payment proof images, served under `/uploads`.

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{EcommerceError, Result};

pub const PUBLIC_PREFIX: &str = "/uploads";
const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self { Self { root: root.into(), max_bytes } }

    pub fn root(&self) -> &Path { &self.root }
    pub fn max_bytes(&self) -> usize { self.max_bytes }

    /// Lower-cased extension of an allowed image file name.
    pub fn check(&self, file_name: &str, len: usize) -> Result<&'static str> {
        if len == 0 { return Err(EcommerceError::Validation("file is empty".into())); }
        if len > self.max_bytes {
            return Err(EcommerceError::Validation(format!("file exceeds {} bytes", self.max_bytes)));
        }
        let ext = Path::new(file_name).extension().and_then(|e| e.to_str()).map(str::to_lowercase).unwrap_or_default();
        ALLOWED_EXTENSIONS
            .iter()
            .find(|allowed| **allowed == ext)
            .copied()
            .ok_or_else(|| EcommerceError::Validation("only jpg, jpeg and png files are accepted".into()))
    }

    /// Writes the file under a generated name and returns its public URL path.
    pub async fn save_payment_proof(&self, order_id: Uuid, file_name: &str, bytes: &[u8]) -> Result<String> {
        let ext = self.check(file_name, bytes.len())?;
        let dir = self.root.join("payment-proofs");
        tokio::fs::create_dir_all(&dir).await?;
        let name = format!("{order_id}-{}.{ext}", Uuid::new_v4().simple());
        tokio::fs::write(dir.join(&name), bytes).await?;
        Ok(format!("{PUBLIC_PREFIX}/payment-proofs/{name}"))
    }

    /// Deletes a file previously returned by [`save_payment_proof`](Self::save_payment_proof).
    pub async fn remove(&self, url: &str) -> Result<()> {
        let relative = url
            .strip_prefix(PUBLIC_PREFIX)
            .map(|r| r.trim_start_matches('/'))
            .filter(|r| !r.is_empty() && Path::new(r).components().all(|c| matches!(c, std::path::Component::Normal(_))))
            .ok_or_else(|| EcommerceError::Validation(format!("{url} is not an upload")))?;
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_rules() {
        let store = UploadStore::new("/tmp/unused", 10);
        assert_eq!(store.check("proof.PNG", 5).unwrap(), "png");
        assert!(store.check("proof.gif", 5).is_err());
        assert!(store.check("proof.jpg", 11).is_err());
        assert!(store.check("proof.jpg", 0).is_err());
        assert!(store.check("noext", 5).is_err());
    }

    #[tokio::test]
    async fn test_save_writes_file() {
        let root = std::env::temp_dir().join(format!("freshcart-test-{}", Uuid::new_v4()));
        let store = UploadStore::new(&root, 1024);
        let url = store.save_payment_proof(Uuid::nil(), "a.jpg", b"jpeg-bytes").await.unwrap();
        assert!(url.starts_with("/uploads/payment-proofs/"));
        let on_disk = root.join(url.trim_start_matches("/uploads/"));
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"jpeg-bytes");
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_deletes_saved_file() {
        let root = std::env::temp_dir().join(format!("freshcart-test-{}", Uuid::new_v4()));
        let store = UploadStore::new(&root, 1024);
        let url = store.save_payment_proof(Uuid::nil(), "a.png", b"png-bytes").await.unwrap();
        store.remove(&url).await.unwrap();
        assert!(!root.join(url.trim_start_matches("/uploads/")).exists());
        // Already gone is fine; paths outside the upload root are refused.
        store.remove(&url).await.unwrap();
        assert!(store.remove("/uploads/../secret").await.is_err());
        assert!(store.remove("/etc/passwd").await.is_err());
        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
