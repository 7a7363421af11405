//! Public, unauthenticated reads.

use uuid::Uuid;

use crate::{
  Error, Result,
  identity::PublicProfile,
  store::{IdentityFilter, MemberStore},
};

/// Resolve the public identifier from a QR code to a read-only profile.
///
/// Anything that does not parse as an identifier is simply not found.
pub async fn lookup<S: MemberStore>(store: &S, public_id: &str) -> Result<PublicProfile> {
  let public_id = Uuid::parse_str(public_id).map_err(|_| Error::NotFound)?;
  let identity = store
    .find_by_public_id(public_id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::NotFound)?;
  Ok(PublicProfile::from(&identity))
}

/// Approved, active members for the public landing page.
pub async fn directory<S: MemberStore>(store: &S) -> Result<Vec<PublicProfile>> {
  let members = store
    .list_identities(IdentityFilter { approved: Some(true), active_only: true })
    .await
    .map_err(Error::store)?;
  Ok(members.iter().map(PublicProfile::from).collect())
}
