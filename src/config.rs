use std::{env, time::Duration};

/// Default deadline for a single store call.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5000;

/// AppConfig
///
/// Holds the application's entire configuration state. Immutable once loaded and
/// pulled into handlers and extractors via FromRef.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string. `None` in local mode selects the in-memory store.
    pub db_url: Option<String>,
    // S3-compatible storage endpoint URL (MinIO in local, Supabase in prod).
    pub s3_endpoint: String,
    pub s3_region: String,
    pub s3_key: String,
    pub s3_secret: String,
    // The bucket holding uploaded videos and thumbnails.
    pub s3_bucket: String,
    // Runtime environment marker. Controls the local `x-user-id` bypass.
    pub env: Env,
    // Secret used to validate incoming HS256 JWTs.
    pub jwt_secret: String,
    // Identity provider signup endpoint base and API key, used by registration.
    pub identity_url: Option<String>,
    pub identity_key: Option<String>,
    // Deadline applied to every store call.
    pub store_timeout: Duration,
    pub bind_addr: String,
}

/// Env
///
/// The runtime context: local development utilities (MinIO, header bypass,
/// in-memory store) versus production infrastructure.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// default
    ///
    /// Non-panicking configuration for tests; needs no environment variables.
    fn default() -> Self {
        Self {
            db_url: None,
            s3_endpoint: "http://localhost:9000".to_string(),
            s3_region: "us-east-1".to_string(),
            s3_key: "admin".to_string(),
            s3_secret: "password".to_string(),
            s3_bucket: "videotube-test".to_string(),
            env: Env::Local,
            jwt_secret: "super-secure-test-secret-value-local".to_string(),
            identity_url: None,
            identity_key: None,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

fn store_timeout_from_env() -> Duration {
    let millis = env::var("STORE_TIMEOUT_MS")
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .unwrap_or(DEFAULT_STORE_TIMEOUT_MS);
    Duration::from_millis(millis)
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables at startup.
    ///
    /// # Panics
    /// Panics in production when a required secret (`SUPABASE_JWT_SECRET`,
    /// `DATABASE_URL`, `SUPABASE_URL`, S3 keys) is missing, so the service never
    /// starts half-configured.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let jwt_secret = match env {
            Env::Production => env::var("SUPABASE_JWT_SECRET")
                .expect("FATAL: SUPABASE_JWT_SECRET must be set in production."),
            _ => env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| "super-secure-test-secret-value-local".to_string()),
        };

        let identity_url = env::var("IDENTITY_URL").ok();
        let identity_key = env::var("IDENTITY_KEY").ok();
        let store_timeout = store_timeout_from_env();
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        match env {
            Env::Local => Self {
                env: Env::Local,
                // Without a database the in-memory store is used.
                db_url: env::var("DATABASE_URL").ok(),
                s3_endpoint: "http://localhost:9000".to_string(),
                s3_region: "us-east-1".to_string(),
                s3_key: "admin".to_string(),
                s3_secret: "password".to_string(),
                s3_bucket: "videotube-uploads".to_string(),
                jwt_secret,
                identity_url,
                identity_key,
                store_timeout,
                bind_addr,
            },
            Env::Production => {
                let project_url =
                    env::var("SUPABASE_URL").expect("FATAL: SUPABASE_URL required in prod");
                // Supabase exposes its S3-compatible API under the storage gateway.
                let s3_endpoint = format!("{}/storage/v1/s3", project_url);

                Self {
                    env: Env::Production,
                    db_url: Some(
                        env::var("DATABASE_URL").expect("FATAL: DATABASE_URL required in prod"),
                    ),
                    s3_endpoint,
                    s3_region: "stub".to_string(),
                    s3_key: env::var("S3_ACCESS_KEY")
                        .expect("FATAL: S3_ACCESS_KEY required in prod"),
                    s3_secret: env::var("S3_SECRET_KEY")
                        .expect("FATAL: S3_SECRET_KEY required in prod"),
                    s3_bucket: env::var("S3_BUCKET_NAME")
                        .unwrap_or_else(|_| "videotube-uploads".to_string()),
                    jwt_secret,
                    // Signup goes through the same Supabase project unless overridden.
                    identity_url: identity_url.or(Some(project_url)),
                    identity_key,
                    store_timeout,
                    bind_addr,
                }
            }
        }
    }
}
