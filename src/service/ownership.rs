//! Ownership checks for nested resources
//!
//! Existence is checked before ownership, so a caller can tell a missing
//! resource (404) from someone else's (403).

use std::future::Future;

use crate::auth::Identity;
use crate::error::AppError;

/// Load a resource and make sure `identity` owns it.
///
/// # Arguments
/// * `resource` - Name used in the 404 message (e.g. "Project")
/// * `lookup` - Fetches the resource, `None` if it does not exist
/// * `owner_of` - Extracts the owning user ID
/// * `identity` - The authenticated caller
///
/// # Errors
/// - `NotFound(resource)` if the lookup returns `None`
/// - `Forbidden` if the owner is someone else
pub async fn authorize_owned<R, L, O>(
    resource: &'static str,
    lookup: L,
    owner_of: O,
    identity: &Identity,
) -> Result<R, AppError>
where
    L: Future<Output = Result<Option<R>, AppError>>,
    O: FnOnce(&R) -> &str,
{
    let found = lookup.await?.ok_or(AppError::NotFound(resource))?;

    if owner_of(&found) != identity.user_id {
        tracing::debug!(
            resource,
            user_id = %identity.user_id,
            "Denied access to resource owned by another user"
        );
        return Err(AppError::Forbidden);
    }

    Ok(found)
}
