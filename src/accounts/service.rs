//! Account lifecycle: register → activate → login, plus bearer authentication.
//!
//! Accounts move `Unregistered → Registered (disabled) → Activated (enabled)`
//! and never back.

use anyhow::anyhow;
use chrono::{Duration, Utc};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{
    error::{AccountError, ActivationFailure},
    model::Account,
    notify::{activation_message, EmailMessage, NotificationSender},
    password::{self, MIN_PASSWORD_LENGTH},
    store::{CredentialStore, StoreError},
    token::{Claims, TokenCodec, TokenError, TokenKind},
};

const DEFAULT_ACTIVATION_TTL_DAYS: i64 = 3;
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
const DEFAULT_MAIL_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.+_-]+@[A-Za-z0-9._-]+\.[a-zA-Z]*$";
/// Longest address SMTP accepts; also fits the `users.email` column.
pub const MAX_EMAIL_LENGTH: usize = 254;

#[must_use]
pub fn valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    if email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    EMAIL
        .get_or_init(|| Regex::new(EMAIL_PATTERN).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

#[must_use]
pub fn valid_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

#[derive(Clone, Debug)]
pub struct AccountConfig {
    activation_ttl: Duration,
    session_ttl: Duration,
    base_url: Url,
    mail_timeout: std::time::Duration,
}

impl AccountConfig {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            activation_ttl: Duration::days(DEFAULT_ACTIVATION_TTL_DAYS),
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
            base_url,
            mail_timeout: std::time::Duration::from_secs(DEFAULT_MAIL_TIMEOUT_SECONDS),
        }
    }

    /// Values beyond what `chrono` can represent saturate.
    #[must_use]
    pub fn with_activation_ttl_days(mut self, days: i64) -> Self {
        self.activation_ttl = Duration::try_days(days).unwrap_or(Duration::MAX);
        self
    }

    /// Values beyond what `chrono` can represent saturate.
    #[must_use]
    pub fn with_session_ttl_hours(mut self, hours: i64) -> Self {
        self.session_ttl = Duration::try_hours(hours).unwrap_or(Duration::MAX);
        self
    }

    #[must_use]
    pub fn with_mail_timeout(mut self, mail_timeout: std::time::Duration) -> Self {
        self.mail_timeout = mail_timeout;
        self
    }

    #[must_use]
    pub fn activation_ttl(&self) -> Duration {
        self.activation_ttl
    }

    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn mail_timeout(&self) -> std::time::Duration {
        self.mail_timeout
    }
}

/// Successful login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginOutcome {
    pub email: String,
    pub token: String,
    pub is_enabled: bool,
}

/// Orchestrates the store, hasher, token codec and notification sender.
///
/// Built once at startup and shared by every request.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn CredentialStore>,
    sender: Arc<dyn NotificationSender>,
    codec: TokenCodec,
    config: AccountConfig,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("codec", &self.codec)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    #[must_use]
    pub fn new(
        store: Arc<dyn CredentialStore>,
        sender: Arc<dyn NotificationSender>,
        codec: TokenCodec,
        config: AccountConfig,
    ) -> Self {
        Self {
            store,
            sender,
            codec,
            config,
        }
    }

    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    #[must_use]
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Create (or refresh) a pending account and send its activation link.
    ///
    /// A pending account with the same email is reused: its password is
    /// replaced and a new link is sent. Links issued before the replacement
    /// stop working.
    ///
    /// # Errors
    /// `InvalidIdentifier`, `WeakPassword`, `AlreadyRegistered`, `StoreFailure`.
    #[instrument(skip(self, plaintext))]
    pub async fn register(&self, email: &str, plaintext: &str) -> Result<String, AccountError> {
        if !valid_email(email) {
            return Err(AccountError::InvalidIdentifier);
        }
        if !valid_password(plaintext) {
            return Err(AccountError::WeakPassword);
        }

        let password_hash = hash_password(plaintext).await?;

        let account = match self.store.find_by_email(email).await? {
            Some(account) if account.is_enabled => {
                debug!("email already activated");
                return Err(AccountError::AlreadyRegistered);
            }
            Some(mut account) => {
                account.password_hash = password_hash;
                self.store.update(&account).await?;
                info!("pending account refreshed");
                account
            }
            None => {
                let account = Account::pending(email.to_string(), password_hash);
                match self.store.insert(&account).await {
                    Ok(()) => {}
                    Err(StoreError::Duplicate) => return Err(AccountError::AlreadyRegistered),
                    Err(err) => return Err(err.into()),
                }
                info!("account registered");
                account
            }
        };

        let claims = Claims::new(
            account.email.as_str(),
            TokenKind::Activation,
            self.config.activation_ttl,
        )
        .with_stamp(password::stamp(&account.password_hash));
        let token = self
            .codec
            .encode(&claims)
            .map_err(|err| AccountError::Internal(anyhow!(err)))?;

        let message = activation_message(&self.config.base_url, &account.email, &token)
            .map_err(AccountError::Internal)?;
        self.deliver(&message).await;

        Ok(account.email)
    }

    /// Enable the account named by an activation token.
    ///
    /// Activating an already enabled account succeeds and changes nothing.
    ///
    /// # Errors
    /// `ActivationTokenInvalid`, `AccountNotFound`, `StoreFailure`.
    #[instrument(skip_all)]
    pub async fn activate(&self, token: &str) -> Result<Account, AccountError> {
        let claims = self.codec.decode(token).map_err(|err| {
            debug!("activation token rejected: {err}");
            match err {
                TokenError::Expired => AccountError::ActivationTokenInvalid(ActivationFailure::Expired),
                _ => AccountError::ActivationTokenInvalid(ActivationFailure::Invalid),
            }
        })?;

        if claims.kind != TokenKind::Activation {
            return Err(AccountError::ActivationTokenInvalid(
                ActivationFailure::Invalid,
            ));
        }

        let mut account = self
            .store
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AccountError::AccountNotFound)?;

        if claims.stamp.as_deref() != Some(password::stamp(&account.password_hash).as_str()) {
            debug!("activation token superseded");
            return Err(AccountError::ActivationTokenInvalid(
                ActivationFailure::Invalid,
            ));
        }

        if account.is_enabled {
            return Ok(account);
        }

        account.activate(Utc::now());
        self.store.update(&account).await?;
        info!(email = %account.email, "account activated");

        Ok(account)
    }

    /// Verify credentials and issue a session token.
    ///
    /// Unknown email and wrong password produce the same error.
    ///
    /// # Errors
    /// `InvalidIdentifier`, `InvalidCredentials`, `StoreFailure`.
    #[instrument(skip(self, plaintext))]
    pub async fn login(&self, email: &str, plaintext: &str) -> Result<LoginOutcome, AccountError> {
        if !valid_email(email) {
            return Err(AccountError::InvalidIdentifier);
        }

        let Some(account) = self.store.find_by_email(email).await? else {
            verify_password(plaintext, None).await?;
            debug!("login for unknown email");
            return Err(AccountError::InvalidCredentials);
        };

        if !verify_password(plaintext, Some(account.password_hash.clone())).await? {
            debug!("login with wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        let token = self
            .codec
            .issue(&account.email, TokenKind::Session, self.config.session_ttl)
            .map_err(|err| AccountError::Internal(anyhow!(err)))?;

        Ok(LoginOutcome {
            email: account.email,
            token,
            is_enabled: account.is_enabled,
        })
    }

    /// Resolve a session token to its account.
    ///
    /// # Errors
    /// `Unauthorized` for any bad, expired or foreign token, or a missing account;
    /// `StoreFailure` if the lookup fails.
    pub async fn authenticate(&self, token: &str) -> Result<Account, AccountError> {
        let claims = self.codec.decode(token).map_err(|err| {
            debug!("session token rejected: {err}");
            AccountError::Unauthorized
        })?;

        if claims.kind != TokenKind::Session {
            return Err(AccountError::Unauthorized);
        }

        self.store
            .find_by_email(&claims.sub)
            .await?
            .ok_or(AccountError::Unauthorized)
    }

    /// Deliver within the configured bound; failures are logged, never returned.
    async fn deliver(&self, message: &EmailMessage) {
        match timeout(self.config.mail_timeout, self.sender.send(message)).await {
            Ok(Ok(())) => debug!(to_email = %message.to, "activation mail sent"),
            Ok(Err(err)) => warn!(to_email = %message.to, "activation mail failed: {err:#}"),
            Err(_) => warn!(
                to_email = %message.to,
                "activation mail timed out after {:?}",
                self.config.mail_timeout
            ),
        }
    }
}

async fn hash_password(plaintext: &str) -> Result<String, AccountError> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || password::hash(&plaintext))
        .await
        .map_err(|err| AccountError::Internal(anyhow!(err)))?
        .map_err(|err| AccountError::Internal(anyhow!("failed to hash password: {err}")))
}

/// `None` runs the dummy comparison and reports a mismatch.
async fn verify_password(plaintext: &str, stored: Option<String>) -> Result<bool, AccountError> {
    let plaintext = plaintext.to_string();
    tokio::task::spawn_blocking(move || match stored {
        Some(stored) => password::verify(&plaintext, &stored),
        None => {
            password::verify_dummy(&plaintext);
            false
        }
    })
    .await
    .map_err(|err| AccountError::Internal(anyhow!(err)))
}
