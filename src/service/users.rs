use crate::{domain::User, error::Result, service::Context};
use tracing::{debug, instrument, warn};

/// Mirrors identities from the auth service into local user records
pub struct UserDirectory {
    ctx: Context,
}

impl UserDirectory {
    pub(crate) fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Returns the local record of the signed-in user, creating it on first sight
    ///
    /// `None` when nobody is signed in or the identity carries no email address.
    #[instrument(skip(self))]
    pub async fn sync_current_user(&self) -> Result<Option<User>> {
        let Some(profile) = self.ctx.auth.current_user().await? else {
            debug!("no signed-in user");
            return Ok(None);
        };

        if let Some(existing) = self.ctx.storage.find_user_by_external_id(&profile.id).await? {
            return Ok(Some(existing));
        }

        let Some(email) = profile.primary_email() else {
            warn!(external_id = %profile.id, "identity has no email address");
            return Ok(None);
        };

        let user = User::new(profile.id.clone(), profile.display_name(), email.to_string())
            .with_image(profile.image_url.clone());
        self.ctx.storage.save_user(&user).await?;
        debug!(user_id = %user.id, "user created");
        Ok(Some(user))
    }
}
