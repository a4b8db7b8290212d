//! Authentication lifecycle: register, login, restore, logout and profile
//! maintenance.
//!
//! # Design
//! `SessionStore` is constructed explicitly and owns its `ApiClient`. Every
//! operation takes `&mut self`, so two calls can never interleave on the
//! same store. User and token are written only after the server answered
//! successfully, and always together, in memory and in storage.

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::forms::{
    AvatarUpload, ChangePasswordForm, ForgotPasswordForm, LoginForm, PasswordResetForm,
    ProfileUpdate, RegisterForm,
};
use crate::storage::{Storage, StorageError, TOKEN_KEY, USER_KEY};
use crate::transport::Transport;
use crate::types::{AuthResponse, AvatarResponse, User};

/// Snapshot of the authentication state views render from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    /// True while a call is in flight.
    pub loading: bool,
    /// Display text of the last failed operation.
    pub error: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }
}

pub struct SessionStore<T> {
    api: ApiClient<T>,
    state: Session,
    revalidate: bool,
}

impl<T: Transport> SessionStore<T> {
    /// Empty session. Call `restore` to pick up a persisted login.
    pub fn new(api: ApiClient<T>) -> Self {
        let revalidate = api.client().config().revalidate_session;
        Self {
            api,
            state: Session::default(),
            revalidate,
        }
    }

    pub fn api(&self) -> &ApiClient<T> {
        &self.api
    }

    pub fn session(&self) -> &Session {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        self.state.user.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.state.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// Run one request/response round trip with `loading` raised, recording
    /// the error text on failure.
    fn track<R, F>(&mut self, op: &'static str, call: F) -> Result<R, ApiError>
    where
        F: FnOnce(&ApiClient<T>) -> Result<R, ApiError>,
    {
        self.state.loading = true;
        self.state.error = None;
        let result = call(&self.api);
        self.state.loading = false;
        if let Err(err) = &result {
            tracing::warn!(op, error = %err, "session operation failed");
            self.state.error = Some(err.to_string());
        }
        result
    }

    fn install(&mut self, auth: AuthResponse) -> User {
        self.state.token = Some(auth.token);
        self.state.user = Some(auth.user.clone());
        auth.user
    }

    fn storage(&self) -> &dyn Storage {
        self.api.storage().as_ref()
    }

    // -----------------------------------------------------------------------
    // Sign-in
    // -----------------------------------------------------------------------

    pub fn register(&mut self, form: &RegisterForm) -> Result<User, ApiError> {
        let auth = self.track("register", |api| {
            let auth: AuthResponse = api.send_json(api.client().build_register(form)?)?;
            persist(api.storage().as_ref(), &auth.token, &auth.user)?;
            Ok(auth)
        })?;
        tracing::info!(user_id = auth.user.id, "registered");
        Ok(self.install(auth))
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<User, ApiError> {
        let form = LoginForm {
            email: email.to_string(),
            password: password.to_string(),
        };
        let auth = self.track("login", |api| {
            let auth: AuthResponse = api.send_json(api.client().build_login(&form)?)?;
            persist(api.storage().as_ref(), &auth.token, &auth.user)?;
            Ok(auth)
        })?;
        tracing::info!(user_id = auth.user.id, "logged in");
        Ok(self.install(auth))
    }

    /// Forget the user and token, in memory and in storage. Safe to call
    /// when already logged out. Memory is cleared even if storage fails.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        let was_authenticated = self.state.is_authenticated();
        self.state.user = None;
        self.state.token = None;
        self.state.loading = false;
        self.state.error = None;
        clear_persisted(self.storage())?;
        if was_authenticated {
            tracing::info!("logged out");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Restore
    // -----------------------------------------------------------------------

    /// Restore a persisted session using the configured policy.
    pub fn restore(&mut self) -> Result<bool, ApiError> {
        if self.revalidate {
            self.check_auth()
        } else {
            self.try_auto_login()
        }
    }

    /// Trust the persisted pair without asking the server.
    pub fn try_auto_login(&mut self) -> Result<bool, ApiError> {
        let Some((token, user)) = read_persisted(self.storage())? else {
            return Ok(false);
        };
        tracing::info!(user_id = user.id, "restored cached session");
        self.install(AuthResponse { token, user });
        Ok(true)
    }

    /// Re-validate the persisted token with exactly one current-user request.
    /// Any failure clears the session and its storage.
    pub fn check_auth(&mut self) -> Result<bool, ApiError> {
        let Some((token, _cached)) = read_persisted(self.storage())? else {
            return Ok(false);
        };
        let result = self.track("check_auth", |api| {
            let user: User = api.send_json(api.client().build_current_user())?;
            Ok(user)
        });
        match result {
            Ok(user) => {
                persist(self.storage(), &token, &user)?;
                tracing::info!(user_id = user.id, "session re-validated");
                self.install(AuthResponse { token, user });
                Ok(true)
            }
            Err(err) => {
                tracing::info!(error = %err, "persisted session rejected, clearing");
                self.state.user = None;
                self.state.token = None;
                clear_persisted(self.storage())?;
                Ok(false)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Account maintenance
    // -----------------------------------------------------------------------

    /// Ask the server to email a password reset link.
    pub fn reset_password(&mut self, email: &str) -> Result<(), ApiError> {
        let form = ForgotPasswordForm {
            email: email.to_string(),
        };
        self.track("reset_password", |api| {
            api.send_empty(api.client().build_forgot_password(&form)?)
        })
    }

    pub fn confirm_password_reset(&mut self, form: &PasswordResetForm) -> Result<(), ApiError> {
        self.track("confirm_password_reset", |api| {
            api.send_empty(api.client().build_reset_password(form)?)
        })
    }

    pub fn change_password(&mut self, form: &ChangePasswordForm) -> Result<(), ApiError> {
        self.track("change_password", |api| {
            api.send_empty(api.client().build_change_password(form)?)
        })
    }

    pub fn update_profile(&mut self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let user = self.track("update_profile", |api| {
            let user: User = api.send_json(api.client().build_update_profile(update)?)?;
            api.storage().set(USER_KEY, &user_json(&user)?)?;
            Ok(user)
        })?;
        // A store that has not restored its session keeps holding nothing.
        if self.state.token.is_some() {
            self.state.user = Some(user.clone());
        }
        Ok(user)
    }

    /// Upload a new avatar and return its URL.
    pub fn upload_avatar(&mut self, upload: &AvatarUpload) -> Result<String, ApiError> {
        let current = self.state.user.clone();
        let (url, updated) = self.track("upload_avatar", |api| {
            let response: AvatarResponse = api.send_json(api.client().build_upload_avatar(upload)?)?;
            let updated = current.map(|mut user| {
                user.avatar_url = Some(response.avatar_url.clone());
                user
            });
            if let Some(user) = &updated {
                api.storage().set(USER_KEY, &user_json(user)?)?;
            }
            Ok((response.avatar_url, updated))
        })?;
        if updated.is_some() && self.state.token.is_some() {
            self.state.user = updated;
        }
        Ok(url)
    }

    /// Delete the account on the server, then log out locally.
    pub fn delete_account(&mut self) -> Result<(), ApiError> {
        self.track("delete_account", |api| {
            api.send_empty(api.client().build_delete_account())
        })?;
        tracing::info!("account deleted");
        self.logout()
    }
}

fn user_json(user: &User) -> Result<String, ApiError> {
    serde_json::to_string(user).map_err(|e| ApiError::Serialization(e.to_string()))
}

/// Write both halves of the pair, or neither.
fn persist(storage: &dyn Storage, token: &str, user: &User) -> Result<(), ApiError> {
    let user = user_json(user)?;
    let written = storage
        .set(TOKEN_KEY, token)
        .and_then(|()| storage.set(USER_KEY, &user));
    if let Err(err) = written {
        if let Err(cleanup) = clear_persisted(storage) {
            tracing::warn!(error = %cleanup, "could not roll back partial session write");
        }
        return Err(err.into());
    }
    Ok(())
}

/// Remove both keys, attempting the second even if the first fails.
fn clear_persisted(storage: &dyn Storage) -> Result<(), StorageError> {
    let token = storage.remove(TOKEN_KEY);
    let user = storage.remove(USER_KEY);
    token.and(user)
}

/// The persisted pair, if both halves are present and readable. A lone
/// token, a lone user, or an unreadable user is cleared and reported as
/// absent.
fn read_persisted(storage: &dyn Storage) -> Result<Option<(String, User)>, ApiError> {
    let token = storage.get(TOKEN_KEY)?.filter(|t| !t.is_empty());
    let user = storage.get(USER_KEY)?;
    match (token, user) {
        (None, None) => Ok(None),
        (Some(token), Some(raw)) => match serde_json::from_str::<User>(&raw) {
            Ok(user) => Ok(Some((token, user))),
            Err(err) => {
                tracing::warn!(error = %err, "discarding unreadable persisted user");
                clear_persisted(storage)?;
                Ok(None)
            }
        },
        _ => {
            tracing::warn!("discarding half-persisted session");
            clear_persisted(storage)?;
            Ok(None)
        }
    }
}
