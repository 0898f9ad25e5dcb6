//! Anonymous identity bootstrap.

use tracing::debug;

use crate::{Connection, StoreError, StoreResult, User};

impl Connection {
    /// Sign in anonymously and return the resulting user.
    ///
    /// A credential without a user fails with `StoreError::MissingIdentity`;
    /// transport failures pass through unchanged. No retries.
    pub async fn sign_in_anonymously(&self) -> StoreResult<User> {
        let credential = self.auth().sign_in_anonymously().await?;
        let user = credential.user.ok_or(StoreError::MissingIdentity)?;
        debug!(uid = %user.uid, "signed in anonymously");
        Ok(user)
    }
}
