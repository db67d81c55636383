use common::{Result, TrackError};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-device persistence for private keys, keyed by principal id.
/// Concurrent saves for one principal are last-write-wins.
pub trait CredentialStore: Send + Sync {
    fn load(&self, principal_id: &str) -> Result<Option<String>>;
    fn save(&self, principal_id: &str, private_key_pem: &str) -> Result<()>;
    /// Stores the key only if the principal has none. Returns `false`
    /// and leaves the existing key untouched otherwise.
    fn save_new(&self, principal_id: &str, private_key_pem: &str) -> Result<bool>;
    fn remove(&self, principal_id: &str) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    keys: RwLock<HashMap<String, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self, principal_id: &str) -> Result<Option<String>> {
        Ok(self.keys.read().get(principal_id).cloned())
    }

    fn save(&self, principal_id: &str, private_key_pem: &str) -> Result<()> {
        self.keys
            .write()
            .insert(principal_id.to_string(), private_key_pem.to_string());
        Ok(())
    }

    fn save_new(&self, principal_id: &str, private_key_pem: &str) -> Result<bool> {
        match self.keys.write().entry(principal_id.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(private_key_pem.to_string());
                Ok(true)
            }
        }
    }

    fn remove(&self, principal_id: &str) -> Result<()> {
        self.keys.write().remove(principal_id);
        Ok(())
    }
}

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One `{principal}.pem` file per principal inside a device-scoped
/// directory. Files are replaced atomically and readable by the owner only.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        restrict_permissions(&dir, 0o700)?;
        Ok(Self { dir })
    }

    fn path_for(&self, principal_id: &str) -> Result<PathBuf> {
        if principal_id.is_empty() {
            return Err(TrackError::StorageError("principal id must not be empty".to_string()));
        }
        Ok(self.dir.join(format!("{}.pem", file_stem(principal_id))))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, principal_id: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(principal_id)?) {
            Ok(pem) => Ok(Some(pem)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, principal_id: &str, private_key_pem: &str) -> Result<()> {
        let path = self.path_for(principal_id)?;
        let temp = temp_path(&path);

        write_private(&temp, private_key_pem.as_bytes())?;
        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }

    fn save_new(&self, principal_id: &str, private_key_pem: &str) -> Result<bool> {
        let path = self.path_for(principal_id)?;
        let temp = temp_path(&path);

        write_private(&temp, private_key_pem.as_bytes())?;
        // hard_link never replaces an existing target
        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);
        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn remove(&self, principal_id: &str) -> Result<()> {
        match fs::remove_file(self.path_for(principal_id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "pem.tmp-{}-{}",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ))
}

/// Writes `contents` to a new file with owner-only permissions.
pub(crate) fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    restrict_permissions(path, 0o600)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Percent-encodes everything outside `[a-z0-9-_@]` so principal ids
/// cannot escape the directory or collide with temp files. Upper-case
/// letters are escaped too, keeping ids that differ only in case apart on
/// case-insensitive filesystems.
fn file_stem(principal_id: &str) -> String {
    let mut stem = String::with_capacity(principal_id.len());
    for byte in principal_id.bytes() {
        match byte {
            b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'@' => stem.push(byte as char),
            other => stem.push_str(&format!("%{:02X}", other)),
        }
    }
    stem
}
