use std::env;

/// Fallback signing secret for local development only.
const LOCAL_JWT_SECRET: &str = "local-development-secret-change-me";

/// Upper bound for token lifetime: one year.
const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 365;

/// AppConfig
///
/// Holds the application's entire configuration state. It is loaded once at startup,
/// never mutated afterwards, and pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and fail-fast checks.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory repository (local only).
    pub db_url: Option<String>,
    // HS256 secret used to sign and verify bearer tokens.
    pub jwt_secret: String,
    // Lifetime of an issued access token.
    pub token_ttl_minutes: i64,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Allowed CORS origins. Empty means any origin.
    pub cors_origins: Vec<String>,
    // Upper bound for request bodies, which carries avatar and image uploads.
    pub max_upload_bytes: usize,
}

/// Env
///
/// The runtime context: local development or hardened production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe, non-panicking configuration for tests. Uses the in-memory repository.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            token_ttl_minutes: 600,
            bind_addr: "127.0.0.1:3000".to_string(),
            cors_origins: Vec::new(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics when a variable required by the current environment is missing or a numeric
    /// variable does not parse, or when the token lifetime is outside one minute to one
    /// year. Production refuses to start without `DATABASE_URL` and
    /// `JWT_SECRET`.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let (db_url, jwt_secret) = match env {
            Env::Production => (
                Some(env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod")),
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production."),
            ),
            Env::Local => (
                env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
                env::var("JWT_SECRET").unwrap_or_else(|_| LOCAL_JWT_SECRET.to_string()),
            ),
        };

        let token_ttl_minutes = env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
            .map(|raw| {
                raw.parse()
                    .expect("FATAL: ACCESS_TOKEN_EXPIRE_MINUTES must be an integer")
            })
            .unwrap_or(600);
        assert!(
            (1..=MAX_TOKEN_TTL_MINUTES).contains(&token_ttl_minutes),
            "FATAL: ACCESS_TOKEN_EXPIRE_MINUTES must be between 1 and {}",
            MAX_TOKEN_TTL_MINUTES
        );

        let max_upload_bytes = env::var("MAX_UPLOAD_BYTES")
            .map(|raw| {
                raw.parse()
                    .expect("FATAL: MAX_UPLOAD_BYTES must be an integer")
            })
            .unwrap_or(5 * 1024 * 1024);

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_default();

        Self {
            env,
            db_url,
            jwt_secret,
            token_ttl_minutes,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            cors_origins,
            max_upload_bytes,
        }
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
