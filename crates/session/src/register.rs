use crate::{CommentStore, SessionError};
use domain::{Registration, User};
use tracing::{info, warn};

/// Validates the form and creates the user. A form that fails validation
/// reports the offending field and never reaches the store.
pub async fn register<S: CommentStore + ?Sized>(
    store: &S,
    email: &str,
    username: &str,
) -> Result<User, SessionError> {
    let form = Registration::new(email, username)?;

    let id = store
        .insert_user(form.email(), form.username())
        .await
        .map_err(|e| {
            warn!("Failed to add user: {:#}", e);
            SessionError::Store(e)
        })?;
    info!(%id, username = form.username(), "user registered");

    Ok(User {
        id,
        email: form.email().to_string(),
        username: form.username().to_string(),
    })
}
