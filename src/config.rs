use std::env;

use thiserror::Error;

const LOCAL_JWT_SECRET: &str = "library-local-dev-secret";
const LOCAL_USERS: &str = "user1:pass1";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// AppConfig
///
/// The process-wide configuration, loaded once at startup and immutable
/// afterwards. Handlers and the auth gate pull it out of the shared state via
/// `FromRef`; nothing reads the signing secret or the user list from a global.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` in local mode selects the in-memory store.
    pub db_url: Option<String>,
    // Runtime environment marker. Controls which settings are mandatory.
    pub env: Env,
    // HMAC secret used both to sign login tokens and to verify bearer tokens.
    pub jwt_secret: String,
    // Accepted login credentials.
    pub users: Vec<Credential>,
    // Address the HTTP listener binds to.
    pub bind_addr: String,
}

/// Env
///
/// Local runs get fallbacks for every secret; production refuses to start
/// without them.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Credential
///
/// One username/password pair accepted by `POST /login`. Stored and compared in
/// plaintext; this stands in for a real credential store.
#[derive(Clone, PartialEq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keeps passwords out of `{:?}` output, which ends up in startup logs.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("LIBRARY_USERS entry {0:?} is not of the form username:password")]
    MalformedUser(String),
    #[error("LIBRARY_USERS does not contain any credentials")]
    NoUsers,
}

impl Default for AppConfig {
    /// Test-friendly values: local mode, in-memory store, a single `user1` login.
    fn default() -> Self {
        Self {
            db_url: None,
            env: Env::Local,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            users: vec![Credential::new("user1", "pass1")],
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables (`APP_ENV`,
    /// `DATABASE_URL`, `JWT_SECRET`, `LIBRARY_USERS`, `BIND_ADDR`).
    ///
    /// # Errors
    /// In production every secret is mandatory and a missing one is returned as
    /// `ConfigError::Missing`. A malformed user list fails in every environment.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let jwt_secret = env::var("JWT_SECRET").ok();
        let users = env::var("LIBRARY_USERS").ok();
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let (db_url, jwt_secret, users) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                jwt_secret.ok_or(ConfigError::Missing("JWT_SECRET"))?,
                users.ok_or(ConfigError::Missing("LIBRARY_USERS"))?,
            ),
            Env::Local => (
                db_url,
                jwt_secret.unwrap_or_else(|| LOCAL_JWT_SECRET.to_string()),
                users.unwrap_or_else(|| LOCAL_USERS.to_string()),
            ),
        };

        Ok(Self {
            db_url,
            env,
            jwt_secret,
            users: parse_users(&users)?,
            bind_addr,
        })
    }

    /// Returns the configured credential matching both username and password.
    pub fn find_user(&self, username: &str, password: &str) -> Option<&Credential> {
        self.users
            .iter()
            .find(|u| u.username == username && u.password == password)
    }
}

/// Parses `user1:pass1,user2:pass2`. Whitespace around entries is ignored and
/// passwords may themselves contain `:`.
pub fn parse_users(raw: &str) -> Result<Vec<Credential>, ConfigError> {
    let users = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((username, password)) if !username.is_empty() => {
                Ok(Credential::new(username, password))
            }
            _ => Err(ConfigError::MalformedUser(entry.to_string())),
        })
        .collect::<Result<Vec<_>, _>>()?;

    if users.is_empty() {
        return Err(ConfigError::NoUsers);
    }
    Ok(users)
}
