//! Email-verification dispatch.
//!
//! Mail transport lives outside this process: the link is written to the log
//! at `info`, where a relay (or a developer) picks it up.

use std::sync::Arc;

use muster_core::{Error, Result, identity::Identity, registration::Notifier, store::MemberStore};

use crate::auth::{hash_token, new_token};

pub struct VerificationMailer<S> {
  store:    Arc<S>,
  base_url: String,
}

impl<S: MemberStore> VerificationMailer<S> {
  pub fn new(store: Arc<S>, base_url: &str) -> Self {
    Self { store, base_url: base_url.trim_end_matches('/').to_string() }
  }

  pub fn link(&self, token: &str) -> String { format!("{}/verify/{token}/", self.base_url) }
}

impl<S: MemberStore> Notifier for VerificationMailer<S> {
  async fn email_verification(&self, identity: &Identity) -> Result<()> {
    let token = new_token();
    self
      .store
      .store_verification(identity.identity_id, hash_token(&token))
      .await
      .map_err(|e| Error::Notify(e.to_string()))?;
    tracing::info!(
      to = %identity.email,
      link = %self.link(&token),
      "email verification dispatched"
    );
    Ok(())
  }
}
