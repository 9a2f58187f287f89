//! Scoped object URLs and the download action.
//!
//! An [`ObjectUrl`] is a temporary `blob:` handle to an in-memory resource.
//! It is revoked when dropped, so a download releases its handle on every
//! path out of [`download`], including a failing sink.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use uuid::Uuid;

use super::BinaryResource;

#[derive(Default)]
pub struct ObjectUrlRegistry {
    urls: Mutex<HashMap<String, Arc<BinaryResource>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, resource: Arc<BinaryResource>) -> ObjectUrl<'_> {
        let href = format!("blob:softcon/{}", Uuid::new_v4());
        if let Ok(mut urls) = self.urls.lock() {
            urls.insert(href.clone(), resource);
        }
        ObjectUrl {
            registry: self,
            href,
        }
    }

    pub fn resolve(&self, href: &str) -> Option<Arc<BinaryResource>> {
        self.urls.lock().ok()?.get(href).cloned()
    }

    /// Handles not yet revoked.
    pub fn live(&self) -> usize {
        self.urls.lock().map(|u| u.len()).unwrap_or(0)
    }

    fn revoke(&self, href: &str) {
        if let Ok(mut urls) = self.urls.lock() {
            urls.remove(href);
        }
    }
}

pub struct ObjectUrl<'a> {
    registry: &'a ObjectUrlRegistry,
    href: String,
}

impl ObjectUrl<'_> {
    pub fn href(&self) -> &str {
        &self.href
    }
}

impl Drop for ObjectUrl<'_> {
    fn drop(&mut self) {
        self.registry.revoke(&self.href);
    }
}

/// The "save" half of a download: given a live handle, persist its bytes.
pub trait SaveSink {
    fn save(&self, href: &str, filename: &str, registry: &ObjectUrlRegistry) -> Result<()>;
}

/// Writes downloads into a directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Where `filename` lands. Directory components are stripped.
    pub fn target_path(&self, filename: &str) -> PathBuf {
        let name = Path::new(filename)
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "download".into());
        self.dir.join(name)
    }
}

impl SaveSink for DirectorySink {
    fn save(&self, href: &str, filename: &str, registry: &ObjectUrlRegistry) -> Result<()> {
        let resource = registry
            .resolve(href)
            .ok_or_else(|| anyhow!("object URL already revoked: {}", href))?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let target = self.target_path(filename);
        std::fs::write(&target, &resource.bytes)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        Ok(())
    }
}

/// Acquire a handle, trigger the save, release the handle.
pub fn download(
    file: &Arc<BinaryResource>,
    registry: &ObjectUrlRegistry,
    sink: &dyn SaveSink,
) -> Result<()> {
    let url = registry.create(file.clone());
    sink.save(url.href(), &file.name, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct FailingSink;

    impl SaveSink for FailingSink {
        fn save(&self, _href: &str, _filename: &str, _registry: &ObjectUrlRegistry) -> Result<()> {
            bail!("disk full")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        seen: RefCell<Vec<(String, usize)>>,
    }

    impl SaveSink for RecordingSink {
        fn save(&self, href: &str, filename: &str, registry: &ObjectUrlRegistry) -> Result<()> {
            assert!(registry.resolve(href).is_some(), "handle live during save");
            self.seen
                .borrow_mut()
                .push((filename.to_string(), registry.live()));
            Ok(())
        }
    }

    fn file() -> Arc<BinaryResource> {
        Arc::new(BinaryResource::new("poster.png", "image/png", vec![7; 16]))
    }

    #[test]
    fn handle_released_after_successful_download() {
        let registry = ObjectUrlRegistry::new();
        let sink = RecordingSink::default();

        download(&file(), &registry, &sink).unwrap();

        assert_eq!(sink.seen.borrow().as_slice(), &[("poster.png".to_string(), 1)]);
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn handle_released_when_sink_fails() {
        let registry = ObjectUrlRegistry::new();
        assert!(download(&file(), &registry, &FailingSink).is_err());
        assert_eq!(registry.live(), 0);
    }

    #[test]
    fn directory_sink_writes_bytes() {
        let tmp = TempDir::new().unwrap();
        let registry = ObjectUrlRegistry::new();
        let sink = DirectorySink::new(tmp.path().join("out"));

        download(&file(), &registry, &sink).unwrap();

        let written = std::fs::read(tmp.path().join("out").join("poster.png")).unwrap();
        assert_eq!(written, vec![7; 16]);
    }

    #[test]
    fn target_path_strips_directories() {
        let sink = DirectorySink::new("/tmp/x");
        assert_eq!(
            sink.target_path("../../etc/passwd"),
            PathBuf::from("/tmp/x/passwd")
        );
    }

    #[test]
    fn revoked_handle_no_longer_resolves() {
        let registry = ObjectUrlRegistry::new();
        let href = {
            let url = registry.create(file());
            url.href().to_string()
        };
        assert!(registry.resolve(&href).is_none());
    }
}
