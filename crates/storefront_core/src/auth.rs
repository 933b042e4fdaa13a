//! crates/storefront_core/src/auth.rs
//!
//! The authenticator: registration, login, bearer token resolution and
//! password changes. Hashing and token signing are delegated to ports.

use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::{NewUser, Registration, User, UserId};
use crate::ports::{
    IssuedToken, PasswordHasher, PortError, TokenRejection, TokenService, UserStore,
};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Username and password are required")]
    MissingLogin,

    #[error("Current and new password are required")]
    MissingPasswords,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing authorization token.")]
    TokenMissing,

    #[error("Token has expired. Please log in again.")]
    TokenExpired,

    #[error("Invalid token. Please log in again.")]
    TokenInvalid,

    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("User not found")]
    UserNotFound,

    #[error("Current password is incorrect")]
    WrongCurrentPassword,

    #[error("New password must be different from current password")]
    SameAsCurrentPassword,

    #[error("Administrator rights required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(PortError),
}

impl From<PortError> for AuthError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound(_) => AuthError::UserNotFound,
            PortError::Conflict(constraint) => conflict_error(&constraint),
            other => AuthError::Storage(other),
        }
    }
}

/// Maps a violated uniqueness constraint on `users` to the field it guards.
pub(crate) fn conflict_error(constraint: &str) -> AuthError {
    if constraint.contains("email") {
        AuthError::EmailTaken
    } else {
        AuthError::UsernameTaken
    }
}

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginSession {
    pub token: IssuedToken,
    pub user: User,
}

/// Outcome of provisioning the administrator account.
#[derive(Debug, Clone)]
pub enum AdminSetup {
    Created(User),
    AlreadyAdmin(User),
    /// The username or email belongs to an account without administrator rights.
    NotAdmin(User),
}

/// Account creation. Needs no token service, so the seed tool can use it on
/// its own.
pub struct Registrar {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
}

impl Registrar {
    pub fn new(users: Arc<dyn UserStore>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { users, hasher }
    }

    /// Creates a regular (non-admin) account.
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_account(registration, false).await
    }

    /// Creates an account with administrator rights.
    pub async fn register_admin(&self, registration: Registration) -> Result<User, AuthError> {
        self.create_account(registration, true).await
    }

    /// Creates the administrator unless its username or email is taken, in
    /// which case the account holding it is reported instead.
    pub async fn ensure_admin(&self, registration: Registration) -> Result<AdminSetup, AuthError> {
        let username = registration.username.clone();
        let email = registration.email.clone();

        match self.create_account(registration, true).await {
            Ok(user) => Ok(AdminSetup::Created(user)),
            Err(AuthError::UsernameTaken | AuthError::EmailTaken) => {
                let existing = match self.users.find_credentials_by_login(&username).await? {
                    Some(credentials) => Some(credentials),
                    None => self.users.find_credentials_by_login(&email).await?,
                };
                let user = existing.ok_or(AuthError::UserNotFound)?.user;
                if user.is_admin {
                    Ok(AdminSetup::AlreadyAdmin(user))
                } else {
                    Ok(AdminSetup::NotAdmin(user))
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn create_account(
        &self,
        registration: Registration,
        is_admin: bool,
    ) -> Result<User, AuthError> {
        let full_name = required("full_name", registration.full_name)?;
        let username = required("username", registration.username)?;
        let email = required("email", registration.email)?;
        let password = required("password", registration.password)?;

        if self.users.username_taken(&username, None).await? {
            return Err(AuthError::UsernameTaken);
        }
        if self.users.email_taken(&email, None).await? {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&password).map_err(AuthError::Storage)?;

        // The unique constraints still catch a concurrent registration
        // that slipped between the checks above and this insert.
        let user = self
            .users
            .create_user(&NewUser {
                full_name,
                username,
                email,
                password_hash,
                is_admin,
            })
            .await?;

        info!(user_id = user.id.0, username = %user.username, "Registered user");
        Ok(user)
    }
}

pub struct Authenticator {
    registrar: Registrar,
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHasher>,
    tokens: Arc<dyn TokenService>,
}

impl Authenticator {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenService>,
    ) -> Self {
        Self {
            registrar: Registrar::new(users.clone(), hasher.clone()),
            users,
            hasher,
            tokens,
        }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        self.registrar.register(registration).await
    }

    pub async fn register_admin(&self, registration: Registration) -> Result<User, AuthError> {
        self.registrar.register_admin(registration).await
    }

    /// Verifies a username-or-email and password pair and issues a bearer token.
    ///
    /// Unknown users and wrong passwords fail identically.
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginSession, AuthError> {
        if login.trim().is_empty() || password.is_empty() {
            return Err(AuthError::MissingLogin);
        }

        let Some(credentials) = self
            .users
            .find_credentials_by_login(login)
            .await
            .map_err(AuthError::Storage)?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let valid = self
            .hasher
            .verify(password, &credentials.password_hash)
            .map_err(AuthError::Storage)?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(credentials.user.id)
            .map_err(AuthError::Storage)?;

        Ok(LoginSession {
            token,
            user: credentials.user,
        })
    }

    /// Resolves the bearer token of a request to the user it was issued for.
    pub fn authenticate(&self, token: Option<&str>) -> Result<UserId, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::TokenMissing)?;

        self.tokens.verify(token).map_err(|rejection| match rejection {
            TokenRejection::Expired => AuthError::TokenExpired,
            TokenRejection::Invalid(reason) => {
                warn!("Rejected bearer token: {}", reason);
                AuthError::TokenInvalid
            }
        })
    }

    pub async fn change_password(
        &self,
        user_id: UserId,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if current_password.is_empty() || new_password.is_empty() {
            return Err(AuthError::MissingPasswords);
        }

        let credentials = self.users.get_credentials(user_id).await?;

        if !self
            .hasher
            .verify(current_password, &credentials.password_hash)
            .map_err(AuthError::Storage)?
        {
            return Err(AuthError::WrongCurrentPassword);
        }
        if self
            .hasher
            .verify(new_password, &credentials.password_hash)
            .map_err(AuthError::Storage)?
        {
            return Err(AuthError::SameAsCurrentPassword);
        }

        let password_hash = self.hasher.hash(new_password).map_err(AuthError::Storage)?;
        self.users
            .update_password_hash(user_id, &password_hash)
            .await?;

        info!(user_id = user_id.0, "Password changed");
        Ok(())
    }

    /// Loads the user and refuses anyone without administrator rights.
    pub async fn require_admin(&self, user_id: UserId) -> Result<User, AuthError> {
        let user = self.users.get_user(user_id).await?;
        if user.is_admin {
            Ok(user)
        } else {
            Err(AuthError::Forbidden)
        }
    }
}

fn required(name: &'static str, value: String) -> Result<String, AuthError> {
    if value.trim().is_empty() {
        Err(AuthError::MissingField(name))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{Duration, Utc};
    use testresult::TestResult;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::ports::PortResult;

    /// Reversible stand-in for a real password hash.
    pub(crate) struct PlainHasher;

    impl PasswordHasher for PlainHasher {
        fn hash(&self, password: &str) -> PortResult<String> {
            Ok(format!("plain${password}"))
        }

        fn verify(&self, password: &str, password_hash: &str) -> PortResult<bool> {
            Ok(password_hash == format!("plain${password}"))
        }
    }

    /// Tokens of the form `user:<id>`; `expired` and anything else are refused.
    pub(crate) struct FakeTokens;

    impl TokenService for FakeTokens {
        fn issue(&self, user_id: UserId) -> PortResult<IssuedToken> {
            Ok(IssuedToken {
                token: format!("user:{user_id}"),
                expires_at: Utc::now() + Duration::hours(1),
            })
        }

        fn verify(&self, token: &str) -> Result<UserId, TokenRejection> {
            if token == "expired" {
                return Err(TokenRejection::Expired);
            }
            token
                .strip_prefix("user:")
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| TokenRejection::Invalid("malformed".to_string()))
        }
    }

    pub(crate) fn authenticator(store: &MemoryStore) -> Authenticator {
        Authenticator::new(
            Arc::new(store.clone()),
            Arc::new(PlainHasher),
            Arc::new(FakeTokens),
        )
    }

    pub(crate) fn registration(username: &str, email: &str) -> Registration {
        Registration {
            full_name: "Maria Clara".into(),
            username: username.into(),
            email: email.into(),
            password: "s3cret!".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_by_username_or_email() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);

        let user = auth.register(registration("maria", "maria@example.com")).await?;
        assert!(!user.is_admin);

        let by_name = auth.login("maria", "s3cret!").await?;
        assert_eq!(by_name.user.id, user.id);
        assert_eq!(auth.authenticate(Some(&by_name.token.token))?, user.id);

        let by_email = auth.login("maria@example.com", "s3cret!").await?;
        assert_eq!(by_email.user.id, user.id);

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);
        auth.register(registration("maria", "maria@example.com")).await?;

        let same_name = auth.register(registration("maria", "other@example.com")).await;
        assert!(matches!(same_name, Err(AuthError::UsernameTaken)));

        let same_email = auth.register(registration("clara", "maria@example.com")).await;
        assert!(matches!(same_email, Err(AuthError::EmailTaken)));

        Ok(())
    }

    #[test]
    fn storage_conflicts_map_to_the_guarded_field() {
        assert!(matches!(
            AuthError::from(PortError::Conflict("users_email_key".into())),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            AuthError::from(PortError::Conflict("users_username_key".into())),
            AuthError::UsernameTaken
        ));
    }

    #[tokio::test]
    async fn blank_registration_field_is_reported_by_name() {
        let store = MemoryStore::new();
        let mut reg = registration("maria", "maria@example.com");
        reg.email = " ".into();

        let result = authenticator(&store).register(reg).await;

        assert!(matches!(result, Err(AuthError::MissingField("email"))));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_fail_the_same_way() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);
        auth.register(registration("maria", "maria@example.com")).await?;

        let wrong = auth.login("maria", "nope").await;
        let unknown = auth.login("nobody", "s3cret!").await;

        assert!(matches!(wrong, Err(AuthError::InvalidCredentials)));
        assert!(matches!(unknown, Err(AuthError::InvalidCredentials)));

        Ok(())
    }

    #[test]
    fn token_failures_keep_distinct_kinds() {
        let store = MemoryStore::new();
        let auth = authenticator(&store);

        assert!(matches!(auth.authenticate(None), Err(AuthError::TokenMissing)));
        assert!(matches!(auth.authenticate(Some("  ")), Err(AuthError::TokenMissing)));
        assert!(matches!(auth.authenticate(Some("expired")), Err(AuthError::TokenExpired)));
        assert!(matches!(auth.authenticate(Some("garbage")), Err(AuthError::TokenInvalid)));
    }

    #[tokio::test]
    async fn change_password_requires_the_current_one_and_a_new_value() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);
        let user = auth.register(registration("maria", "maria@example.com")).await?;

        let wrong = auth.change_password(user.id, "guess", "n3w").await;
        assert!(matches!(wrong, Err(AuthError::WrongCurrentPassword)));

        let same = auth.change_password(user.id, "s3cret!", "s3cret!").await;
        assert!(matches!(same, Err(AuthError::SameAsCurrentPassword)));

        auth.change_password(user.id, "s3cret!", "n3w").await?;
        assert!(matches!(
            auth.login("maria", "s3cret!").await,
            Err(AuthError::InvalidCredentials)
        ));
        auth.login("maria", "n3w").await?;

        Ok(())
    }

    #[tokio::test]
    async fn change_password_for_unknown_user_is_not_found() {
        let store = MemoryStore::new();

        let result = authenticator(&store)
            .change_password(UserId(404), "a", "b")
            .await;

        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn only_admins_pass_the_admin_check() -> TestResult {
        let store = MemoryStore::new();
        let auth = authenticator(&store);
        let admin = auth
            .register_admin(registration("admin", "admin@example.com"))
            .await?;
        let shopper = auth.register(registration("maria", "maria@example.com")).await?;

        assert_eq!(auth.require_admin(admin.id).await?.id, admin.id);
        assert!(matches!(
            auth.require_admin(shopper.id).await,
            Err(AuthError::Forbidden)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn ensure_admin_reports_what_it_found() -> TestResult {
        let store = MemoryStore::new();
        let registrar = Registrar::new(Arc::new(store.clone()), Arc::new(PlainHasher));

        let created = registrar
            .ensure_admin(registration("admin", "admin@example.com"))
            .await?;
        assert!(matches!(created, AdminSetup::Created(ref u) if u.is_admin));

        let again = registrar
            .ensure_admin(registration("admin", "admin@example.com"))
            .await?;
        assert!(matches!(again, AdminSetup::AlreadyAdmin(ref u) if u.username == "admin"));

        registrar
            .register(registration("maria", "maria@example.com"))
            .await?;
        let taken = registrar
            .ensure_admin(registration("maria", "other@example.com"))
            .await?;
        assert!(matches!(taken, AdminSetup::NotAdmin(ref u) if !u.is_admin));

        let by_email = registrar
            .ensure_admin(registration("root", "maria@example.com"))
            .await?;
        assert!(matches!(by_email, AdminSetup::NotAdmin(ref u) if u.username == "maria"));

        Ok(())
    }
}
