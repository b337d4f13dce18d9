//! azure::cache
//!
//! Durable, crash-safe cache of per-organization OAuth authorities and
//! per-remote/per-organization signed-in users.
//!
//! # Key convention
//!
//! ```text
//! org.<orgName>.authority = <url>
//! org.<orgName>.user      = <userPrincipalName>
//! remote.<remoteUrl>.user = <userPrincipalName>   ("" = explicitly signed out)
//! ```
//!
//! # Precedence
//!
//! For a remote `r` under organization `o`, the effective user is the
//! non-empty value of `remote.r.user` if present; an empty string there
//! means "explicitly signed out" and suppresses inheritance; otherwise the
//! value of `org.o.user`; otherwise none.
//!
//! # Transactions
//!
//! Every operation reloads the backing file, applies its mutation, and
//! commits atomically. Concurrent helper invocations may lose an update to
//! the rename race but can never corrupt the file; the worst case is a
//! redundant discovery probe or a re-prompt.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::ini::{IniError, IniStore};
use crate::ui::trace;
use crate::uri::RemoteUri;

/// File name of the cache under the user-data directory.
const CACHE_FILE: &str = "azrepos.ini";

/// The authority/user cache for Azure Repos.
#[derive(Debug)]
pub struct AzureReposCache {
    store: IniStore,
}

impl AzureReposCache {
    /// Open the cache at an explicit path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            store: IniStore::open(path),
        }
    }

    /// Open the cache at its default location under the user-data
    /// directory.
    pub fn open_default() -> Result<Self> {
        let dir = dirs::data_dir()
            .ok_or_else(|| Error::Internal("cannot determine user data directory".into()))?;
        Ok(Self::new(dir.join("quay").join(CACHE_FILE)))
    }

    /// Reload, treating a corrupt file as empty (logged) so the cache can
    /// heal itself on the next commit.
    fn reload_tolerant(&mut self) -> Result<()> {
        match self.store.reload() {
            Ok(()) => Ok(()),
            Err(err @ IniError::Corrupt { .. }) => {
                trace::trace(format!("sign-in cache unreadable, treating as empty: {}", err));
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn authority_key(org: &str) -> String {
        format!("org.{}.authority", org)
    }

    fn org_user_key(org: &str) -> String {
        format!("org.{}.user", org)
    }

    fn remote_user_key(remote: &RemoteUri) -> String {
        format!("remote.{}.user", remote.canonical(true))
    }

    // ------------------------------------------------------------------
    // Authorities
    // ------------------------------------------------------------------

    /// The cached authority for an organization.
    ///
    /// I/O failures degrade to a miss: the caller re-discovers.
    pub fn get_authority(&mut self, org: &str) -> Option<String> {
        if let Err(err) = self.reload_tolerant() {
            trace::trace(format!("cannot read sign-in cache: {}", err));
            return None;
        }
        self.store.get(&Self::authority_key(org)).map(str::to_string)
    }

    /// Record the authority for an organization, replacing any prior value.
    pub fn update_authority(&mut self, org: &str, authority: &str) -> Result<()> {
        self.reload_tolerant()?;
        self.store.set(&Self::authority_key(org), authority);
        self.store.commit().map_err(Error::from)
    }

    /// Forget the authority for an organization.
    pub fn erase_authority(&mut self, org: &str) -> Result<()> {
        self.reload_tolerant()?;
        if self.store.remove(&Self::authority_key(org)) {
            self.store.commit()?;
        }
        Ok(())
    }

    /// Forget every cached authority.
    pub fn clear_authorities(&mut self) -> Result<()> {
        self.reload_tolerant()?;
        let keys: Vec<String> = self
            .store
            .section_scopes("org")
            .into_iter()
            .map(|org| Self::authority_key(&org))
            .collect();
        let mut changed = false;
        for key in keys {
            changed |= self.store.remove(&key);
        }
        if changed {
            self.store.commit()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// The organization-level signed-in user.
    pub fn get_org_user(&mut self, org: &str) -> Option<String> {
        if self.reload_tolerant().is_err() {
            return None;
        }
        self.store.get(&Self::org_user_key(org)).map(str::to_string)
    }

    /// The remote-level signed-in user. An empty string means the remote
    /// is explicitly signed out.
    pub fn get_remote_user(&mut self, remote: &RemoteUri) -> Option<String> {
        if self.reload_tolerant().is_err() {
            return None;
        }
        self.store
            .get(&Self::remote_user_key(remote))
            .map(str::to_string)
    }

    /// Sign a user in at organization scope.
    pub fn sign_in_org(&mut self, org: &str, user: &str) -> Result<()> {
        self.reload_tolerant()?;
        self.store.set(&Self::org_user_key(org), user);
        self.store.commit().map_err(Error::from)
    }

    /// Sign a user in at remote scope (clears any explicit sign-out
    /// marker for the remote).
    pub fn sign_in_remote(&mut self, remote: &RemoteUri, user: &str) -> Result<()> {
        self.reload_tolerant()?;
        self.store.set(&Self::remote_user_key(remote), user);
        self.store.commit().map_err(Error::from)
    }

    /// Sign out at organization scope.
    pub fn sign_out_org(&mut self, org: &str) -> Result<()> {
        self.reload_tolerant()?;
        if self.store.remove(&Self::org_user_key(org)) {
            self.store.commit()?;
        }
        Ok(())
    }

    /// Sign out at remote scope.
    ///
    /// With `explicit = true` the remote is marked signed-out (empty
    /// string), which suppresses inheritance of the organization user
    /// until an explicit sign-in at the same scope. Otherwise the
    /// remote-level entry is simply removed.
    pub fn sign_out_remote(&mut self, remote: &RemoteUri, explicit: bool) -> Result<()> {
        self.reload_tolerant()?;
        let key = Self::remote_user_key(remote);
        if explicit {
            self.store.set(&key, "");
            self.store.commit()?;
        } else if self.store.remove(&key) {
            self.store.commit()?;
        }
        Ok(())
    }

    /// All organization-level users.
    pub fn get_org_users(&mut self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if self.reload_tolerant().is_err() {
            return out;
        }
        for org in self.store.section_scopes("org") {
            if let Some(user) = self.store.get(&Self::org_user_key(&org)) {
                out.insert(org, user.to_string());
            }
        }
        out
    }

    /// All remote-level users, keyed by canonical remote URL.
    ///
    /// Entries whose key does not parse as a remote URL are skipped.
    pub fn get_remote_users(&mut self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        if self.reload_tolerant().is_err() {
            return out;
        }
        for scope in self.store.section_scopes("remote") {
            let Some(uri) = RemoteUri::parse(&scope) else {
                continue;
            };
            let key = format!("remote.{}.user", scope);
            if let Some(user) = self.store.get(&key) {
                out.insert(uri.canonical(true), user.to_string());
            }
        }
        out
    }

    /// Resolve the effective signed-in user for a remote.
    pub fn effective_user(&mut self, org: &str, remote: &RemoteUri) -> Option<String> {
        match self.get_remote_user(remote) {
            Some(user) if !user.is_empty() => Some(user),
            // Explicit sign-out suppresses the organization user.
            Some(_) => None,
            None => self.get_org_user(org).filter(|u| !u.is_empty()),
        }
    }

    // ------------------------------------------------------------------
    // Store/erase bookkeeping
    // ------------------------------------------------------------------

    /// Update sign-in state after Git confirmed a credential works.
    ///
    /// When no organization user exists the user signs in at organization
    /// scope and any remote-level entry is dropped. A user differing from
    /// the organization user is recorded at remote scope; a matching user
    /// drops the remote-level entry to prefer inheritance.
    pub fn handle_credential_stored(
        &mut self,
        org: &str,
        remote: &RemoteUri,
        username: &str,
    ) -> Result<()> {
        match self.get_org_user(org) {
            None => {
                self.sign_in_org(org, username)?;
                self.sign_out_remote(remote, false)
            }
            Some(org_user) if org_user != username => self.sign_in_remote(remote, username),
            Some(_) => self.sign_out_remote(remote, false),
        }
    }

    /// Update sign-in state after Git rejected a credential.
    ///
    /// With an organization user present the remote is marked explicitly
    /// signed out so the next attempt re-prompts; otherwise any
    /// remote-level entry is dropped. The authority is always forgotten,
    /// since a failed credential may indicate a stale authority.
    pub fn handle_credential_erased(&mut self, org: &str, remote: &RemoteUri) -> Result<()> {
        if self.get_org_user(org).is_some() {
            self.sign_out_remote(remote, true)?;
        } else {
            self.sign_out_remote(remote, false)?;
        }
        self.erase_authority(org)
    }
}
