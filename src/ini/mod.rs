//! ini
//!
//! Transactional dotted-key INI store.
//!
//! # Design
//!
//! Backs the Azure Repos sign-in cache. The file holds a single implicit
//! section of `key=value` lines with dotted keys; lines beginning with `#`
//! or `;` are comments. Every mutation cycle is `reload -> mutate ->
//! commit`, and `commit` serializes the working copy to a sibling temp file,
//! fsyncs it, then renames over the target. A failed rename leaves the
//! on-disk state unchanged.
//!
//! # Concurrency
//!
//! Two overlapping processes both see one write win the rename race; the
//! loser's in-memory state is discarded. Lost updates are possible, a
//! corrupt file is not. The worst case downstream is a redundant network
//! probe or a re-prompt.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use thiserror::Error;

/// Errors from the INI store.
#[derive(Debug, Error)]
pub enum IniError {
    /// The file exists but cannot be parsed.
    #[error("unparseable line {line} in {path}")]
    Corrupt {
        /// Path of the offending file.
        path: String,
        /// 1-based line number.
        line: usize,
    },

    /// An I/O failure while reading or committing.
    #[error("{0}")]
    Io(String),
}

/// A dotted-key INI file with atomic commits.
#[derive(Debug)]
pub struct IniStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl IniStore {
    /// Open a store for `path` with an empty working copy.
    ///
    /// No I/O happens until [`reload`](Self::reload) or
    /// [`commit`](Self::commit).
    pub fn open(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the working copy with the file's current contents.
    ///
    /// A missing file yields an empty working copy. An unparseable file
    /// yields [`IniError::Corrupt`]; callers typically log and treat the
    /// store as empty.
    pub fn reload(&mut self) -> Result<(), IniError> {
        self.entries.clear();
        if !self.path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| IniError::Io(format!("cannot read {}: {}", self.path.display(), e)))?;

        // Parse into a fresh map so a corrupt file never leaves a partial
        // working copy behind.
        let mut parsed = BTreeMap::new();
        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() => {
                    parsed.insert(key.trim().to_string(), value.to_string());
                }
                _ => {
                    return Err(IniError::Corrupt {
                        path: self.path.display().to_string(),
                        line: idx + 1,
                    })
                }
            }
        }
        self.entries = parsed;
        Ok(())
    }

    /// Get a value from the working copy.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set a value in the working copy.
    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// Remove a key from the working copy. Returns true if it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Iterate over `(key, value)` pairs with the given key prefix.
    pub fn iter_prefixed<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The set of scopes `x` for which any key `<prefix>.<x>.*` exists.
    ///
    /// Scopes themselves may contain dots (remote URLs do), so the property
    /// is taken to be the segment after the *last* dot.
    pub fn section_scopes(&self, prefix: &str) -> BTreeSet<String> {
        let lead = format!("{}.", prefix);
        self.entries
            .keys()
            .filter_map(|key| {
                let rest = key.strip_prefix(&lead)?;
                let (scope, _property) = rest.rsplit_once('.')?;
                Some(scope.to_string())
            })
            .collect()
    }

    /// Serialize the working copy and atomically replace the backing file.
    ///
    /// Writes to a sibling temp file, fsyncs it, then renames over the
    /// target. On rename failure the on-disk state is unchanged.
    pub fn commit(&self) -> Result<(), IniError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| IniError::Io(format!("cannot create {}: {}", parent.display(), e)))?;
        }

        let mut content = String::new();
        for (key, value) in &self.entries {
            content.push_str(key);
            content.push('=');
            content.push_str(value);
            content.push('\n');
        }

        let temp_path = self.path.with_extension("tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| IniError::Io(format!("cannot create temp file: {}", e)))?;

            #[cfg(unix)]
            {
                let permissions = fs::Permissions::from_mode(0o600);
                file.set_permissions(permissions)
                    .map_err(|e| IniError::Io(format!("cannot set permissions: {}", e)))?;
            }

            file.write_all(content.as_bytes())
                .map_err(|e| IniError::Io(format!("cannot write temp file: {}", e)))?;
            file.sync_all()
                .map_err(|e| IniError::Io(format!("cannot sync temp file: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| IniError::Io(format!("cannot rename temp file: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> IniStore {
        IniStore::open(dir.path().join("azrepos.ini"))
    }

    #[test]
    fn reload_missing_file_is_empty() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.reload().expect("reload");
        assert!(store.get("anything").is_none());
    }

    #[test]
    fn set_commit_reload_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.reload().expect("reload");
        store.set("org.contoso.authority", "https://login.microsoftonline.com/T1");
        store.set("org.contoso.user", "alice@contoso.com");
        store.commit().expect("commit");

        let mut other = store_in(&dir);
        other.reload().expect("reload");
        assert_eq!(
            other.get("org.contoso.authority"),
            Some("https://login.microsoftonline.com/T1")
        );
        assert_eq!(other.get("org.contoso.user"), Some("alice@contoso.com"));
    }

    #[test]
    fn empty_values_survive_round_trip() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("remote.https://dev.azure.com/contoso/_git/widgets.user", "");
        store.commit().expect("commit");

        let mut other = store_in(&dir);
        other.reload().expect("reload");
        assert_eq!(
            other.get("remote.https://dev.azure.com/contoso/_git/widgets.user"),
            Some("")
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("azrepos.ini");
        fs::write(&path, "# heading\n; also a comment\n\norg.a.user=u\n").expect("seed");

        let mut store = IniStore::open(path);
        store.reload().expect("reload");
        assert_eq!(store.get("org.a.user"), Some("u"));
    }

    #[test]
    fn unparseable_line_is_corrupt() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("azrepos.ini");
        fs::write(&path, "org.a.user=u\nthis is not a pair\n").expect("seed");

        let mut store = IniStore::open(path);
        let err = store.reload().expect_err("should be corrupt");
        match err {
            IniError::Corrupt { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn remove_returns_presence() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("k", "v");
        assert!(store.remove("k"));
        assert!(!store.remove("k"));
    }

    #[test]
    fn section_scopes_extracts_middle_segment() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("org.contoso.authority", "a");
        store.set("org.contoso.user", "u");
        store.set("org.fabrikam.user", "v");
        store.set("remote.https://dev.azure.com/contoso/_git/widgets.user", "w");

        let orgs = store.section_scopes("org");
        assert_eq!(
            orgs.into_iter().collect::<Vec<_>>(),
            vec!["contoso".to_string(), "fabrikam".to_string()]
        );

        let remotes = store.section_scopes("remote");
        assert_eq!(
            remotes.into_iter().collect::<Vec<_>>(),
            vec!["https://dev.azure.com/contoso/_git/widgets".to_string()]
        );
    }

    #[test]
    fn commit_removes_temp_file() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("k", "v");
        store.commit().expect("commit");
        assert!(!store.path().with_extension("tmp").exists());
        assert!(store.path().exists());
    }

    #[test]
    fn commit_overwrites_stale_temp_file() {
        // Simulates recovery after a crash between fsync and rename: the
        // previous contents are intact and a stale temp file is left behind.
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("azrepos.ini");
        fs::write(&path, "org.a.user=old\n").expect("seed");
        fs::write(path.with_extension("tmp"), "org.a.user=halfway\n").expect("stale temp");

        let mut store = IniStore::open(path.clone());
        store.reload().expect("reload");
        assert_eq!(store.get("org.a.user"), Some("old"));

        store.set("org.a.user", "new");
        store.commit().expect("commit");

        let content = fs::read_to_string(&path).expect("read");
        assert_eq!(content, "org.a.user=new\n");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn reload_discards_uncommitted_mutations() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("k", "v");
        store.reload().expect("reload");
        assert!(store.get("k").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn committed_file_has_0600_permissions() {
        let dir = TempDir::new().expect("temp dir");
        let mut store = store_in(&dir);
        store.set("k", "v");
        store.commit().expect("commit");

        let mode = fs::metadata(store.path())
            .expect("metadata")
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }
}
