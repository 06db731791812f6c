use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub jwt_leeway: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"***")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("jwt_leeway", &self.jwt_leeway)
            .finish()
    }
}

/// Tuning for the dispatch core's background work and channels
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How often REQUESTED bookings are re-matched
    pub retry_interval: Duration,
    /// Max REQUESTED bookings re-matched per tick
    pub retry_batch_size: usize,
    pub notification_queue_capacity: usize,
    /// Per-booking broadcast buffer for live tracking
    pub tracking_channel_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            auth: AuthConfig::from_env()?,
            dispatch: DispatchConfig::from_env()?,
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl DatabaseConfig {
    const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    const DEFAULT_MIN_CONNECTIONS: u32 = 1;
    const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
    const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600; // 10 minutes
    const DEFAULT_MAX_LIFETIME_SECS: u64 = 1800; // 30 minutes

    /// Returns `None` when DATABASE_URL is unset; the service then runs on in-memory stores
    pub fn from_env() -> Result<Option<Self>, String> {
        let url = match env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()) {
            Some(url) => url,
            None => return Ok(None),
        };

        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MAX_CONNECTIONS must be a valid number".to_string())?;

        let min_connections = env::var("DB_MIN_CONNECTIONS")
            .unwrap_or_else(|_| Self::DEFAULT_MIN_CONNECTIONS.to_string())
            .parse::<u32>()
            .map_err(|_| "DB_MIN_CONNECTIONS must be a valid number".to_string())?;

        let acquire_timeout_secs = env::var("DB_ACQUIRE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_ACQUIRE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_ACQUIRE_TIMEOUT_SECS must be a valid number".to_string())?;

        let idle_timeout_secs = env::var("DB_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_IDLE_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_IDLE_TIMEOUT_SECS must be a valid number".to_string())?;

        let max_lifetime_secs = env::var("DB_MAX_LIFETIME_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_LIFETIME_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DB_MAX_LIFETIME_SECS must be a valid number".to_string())?;

        Ok(Some(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout_secs,
            idle_timeout_secs,
            max_lifetime_secs,
        }))
    }
}

impl AuthConfig {
    const DEFAULT_JWT_LEEWAY_SECS: u64 = 60;

    pub fn from_env() -> Result<Self, String> {
        let secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable is required".to_string())?;

        let issuer = env::var("JWT_ISSUER")
            .map_err(|_| "JWT_ISSUER environment variable is required".to_string())?;

        let audience = env::var("JWT_AUDIENCE")
            .map_err(|_| "JWT_AUDIENCE environment variable is required".to_string())?;

        let jwt_leeway_secs = env::var("JWT_LEEWAY")
            .unwrap_or_else(|_| Self::DEFAULT_JWT_LEEWAY_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "JWT_LEEWAY must be a valid number".to_string())?;

        Ok(Self {
            secret,
            issuer,
            audience,
            jwt_leeway: Duration::from_secs(jwt_leeway_secs),
        })
    }
}

impl DispatchConfig {
    const DEFAULT_RETRY_INTERVAL_SECS: u64 = 15;
    const DEFAULT_RETRY_BATCH_SIZE: usize = 20;
    const DEFAULT_NOTIFICATION_QUEUE_CAPACITY: usize = 1024;
    const DEFAULT_TRACKING_CHANNEL_CAPACITY: usize = 64;

    pub fn from_env() -> Result<Self, String> {
        let retry_interval_secs = env::var("DISPATCH_RETRY_INTERVAL_SECS")
            .unwrap_or_else(|_| Self::DEFAULT_RETRY_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| "DISPATCH_RETRY_INTERVAL_SECS must be a valid number".to_string())?;

        if retry_interval_secs == 0 {
            return Err("DISPATCH_RETRY_INTERVAL_SECS must be greater than zero".to_string());
        }

        let retry_batch_size = env::var("DISPATCH_RETRY_BATCH_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_RETRY_BATCH_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "DISPATCH_RETRY_BATCH_SIZE must be a valid number".to_string())?;

        let notification_queue_capacity = env::var("NOTIFICATION_QUEUE_CAPACITY")
            .unwrap_or_else(|_| Self::DEFAULT_NOTIFICATION_QUEUE_CAPACITY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| "NOTIFICATION_QUEUE_CAPACITY must be a positive number".to_string())?;

        let tracking_channel_capacity = env::var("TRACKING_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| Self::DEFAULT_TRACKING_CHANNEL_CAPACITY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| "TRACKING_CHANNEL_CAPACITY must be a positive number".to_string())?;

        Ok(Self {
            retry_interval: Duration::from_secs(retry_interval_secs),
            retry_batch_size,
            notification_queue_capacity,
            tracking_channel_capacity,
        })
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(Self::DEFAULT_RETRY_INTERVAL_SECS),
            retry_batch_size: Self::DEFAULT_RETRY_BATCH_SIZE,
            notification_queue_capacity: Self::DEFAULT_NOTIFICATION_QUEUE_CAPACITY,
            tracking_channel_capacity: Self::DEFAULT_TRACKING_CHANNEL_CAPACITY,
        }
    }
}
