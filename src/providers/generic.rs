//! providers::generic
//!
//! The terminal fallback provider: basic prompts, plus Windows integrated
//! authentication when the server offers it.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::protocol::Request;
use crate::settings::Settings;
use crate::ui::Prompter;
use crate::uri::RemoteUri;
use crate::vault::{Credential, CredentialVault};

use super::ProviderContext;

/// Generic basic-auth provider.
pub struct GenericProvider {
    settings: Arc<Settings>,
    vault: Arc<CredentialVault>,
    prompter: Arc<dyn Prompter>,
}

impl GenericProvider {
    /// Create the provider from shared collaborators.
    pub fn new(ctx: &ProviderContext) -> Self {
        Self {
            settings: ctx.settings.clone(),
            vault: ctx.vault.clone(),
            prompter: ctx.prompter.clone(),
        }
    }

    fn remote_and_service(&self, request: &Request) -> Result<(RemoteUri, String)> {
        let uri = request
            .remote_uri()
            .ok_or_else(|| Error::MalformedInput("request does not form a remote URL".into()))?;
        let service = self
            .vault
            .service_for(&uri, self.settings.use_http_path(Some(&uri)));
        Ok((uri, service))
    }

    /// Serve a `get`.
    pub async fn get(&self, request: &Request) -> Result<Option<Credential>> {
        let (uri, service) = self.remote_and_service(request)?;

        if let Some(credential) = self.vault.get(&service, request.username())? {
            return Ok(Some(credential));
        }

        // On Windows, a Negotiate/NTLM challenge means the OS transport can
        // authenticate natively; an empty credential tells Git to let it.
        if cfg!(windows)
            && self.settings.allow_windows_auth(Some(&uri))
            && offers_integrated_auth(request)
        {
            return Ok(Some(Credential::new("", "")));
        }

        if !self.settings.interactive_allowed(Some(&uri)) {
            return Err(Error::InteractionDisabled);
        }

        let answer = self
            .prompter
            .ask_basic(&uri.canonical(false), request.username())?;
        Ok(Some(Credential::new(answer.username, answer.password)))
    }

    /// Persist a validated credential.
    pub fn store(&self, request: &Request) -> Result<()> {
        let (_, service) = self.remote_and_service(request)?;
        let (Some(username), Some(password)) = (request.username(), request.password()) else {
            // Git always sends both on store; anything else is not ours.
            return Ok(());
        };
        self.vault
            .add_or_update(&service, &Credential::new(username, password))
    }

    /// Drop a rejected credential.
    pub fn erase(&self, request: &Request) -> Result<()> {
        let (_, service) = self.remote_and_service(request)?;
        self.vault.remove(&service, request.username())
    }
}

/// Whether the server's challenges include Negotiate or NTLM.
pub(crate) fn offers_integrated_auth(request: &Request) -> bool {
    request.www_authenticate().iter().any(|challenge| {
        let scheme = challenge.split_whitespace().next().unwrap_or("");
        scheme.eq_ignore_ascii_case("negotiate") || scheme.eq_ignore_ascii_case("ntlm")
    })
}
