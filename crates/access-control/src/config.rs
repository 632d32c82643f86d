use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default bcrypt cost factor for password hashing.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Minimum allowed bcrypt cost.
pub const MIN_BCRYPT_COST: u32 = 10;

/// Maximum allowed bcrypt cost. Higher values make login noticeably slow.
pub const MAX_BCRYPT_COST: u32 = 14;

/// Default access token lifetime in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u32 = 1;

/// Maximum access token lifetime in hours (30 days).
pub const MAX_JWT_EXPIRATION_HOURS: u32 = 720;

pub const DEFAULT_JWT_ISSUER: &str = "access-control";

pub const DEFAULT_JWT_AUDIENCE: &str = "access-control-clients";

/// Default number of deferred-task workers.
pub const DEFAULT_TASK_WORKER_COUNT: usize = 1;

pub const MAX_TASK_WORKER_COUNT: usize = 16;

pub const DEFAULT_SMTP_PORT: u16 = 587;

pub const DEFAULT_NOTIFICATION_SUBJECT: &str = "Login Notification";

/// `[USER_EMAIL]` and `[LOGIN_TIMESTAMP]` are substituted at enqueue time.
pub const DEFAULT_NOTIFICATION_BODY_TEMPLATE: &str =
    "Hello, [USER_EMAIL] logged in at [LOGIN_TIMESTAMP].";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub jwt: JwtSettings,
    pub bcrypt_cost: u32,
    pub task_worker_count: usize,
    /// `None` disables outbound mail; notifications are only logged.
    pub smtp: Option<SmtpSettings>,
    pub login_notification: LoginNotificationSettings,
    pub cors_allowed_origins: Vec<String>,
    pub log_format: LogFormat,
}

/// Token signing settings. Read-only after startup.
#[derive(Debug, Clone)]
pub struct JwtSettings {
    /// HS256 key. May be empty; login then fails with a configuration error.
    pub signing_key: SecretString,
    pub issuer: String,
    pub audience: String,
    pub expiration_hours: u32,
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginNotificationSettings {
    /// When set, every login notification goes here instead of to the user.
    pub recipient_override: Option<String>,
    pub subject: String,
    pub body_template: String,
}

impl Default for LoginNotificationSettings {
    fn default() -> Self {
        Self {
            recipient_override: None,
            subject: DEFAULT_NOTIFICATION_SUBJECT.to_string(),
            body_template: DEFAULT_NOTIFICATION_BODY_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON output; anything else is text.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    ///
    /// `${NAME}` placeholders in any value are resolved against the same map.
    pub fn from_vars(raw: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = raw
            .iter()
            .map(|(k, v)| (k.clone(), expand_placeholders(v, |name| raw.get(name).cloned())))
            .collect();

        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let signing_key =
            SecretString::from(vars.get("JWT_SIGNING_KEY").cloned().unwrap_or_default());

        let issuer = non_empty(&vars, "JWT_ISSUER").unwrap_or_else(|| DEFAULT_JWT_ISSUER.into());
        let audience =
            non_empty(&vars, "JWT_AUDIENCE").unwrap_or_else(|| DEFAULT_JWT_AUDIENCE.into());

        let expiration_hours = parse_in_range(
            &vars,
            "JWT_EXPIRATION_HOURS",
            DEFAULT_JWT_EXPIRATION_HOURS,
            1,
            MAX_JWT_EXPIRATION_HOURS,
        )?;

        let bcrypt_cost = parse_in_range(
            &vars,
            "BCRYPT_COST",
            DEFAULT_BCRYPT_COST,
            MIN_BCRYPT_COST,
            MAX_BCRYPT_COST,
        )?;

        let task_worker_count = parse_in_range(
            &vars,
            "TASK_WORKER_COUNT",
            DEFAULT_TASK_WORKER_COUNT,
            1,
            MAX_TASK_WORKER_COUNT,
        )?;

        let smtp = match non_empty(&vars, "SMTP_HOST") {
            Some(host) => {
                let from_address = non_empty(&vars, "SMTP_FROM")
                    .ok_or_else(|| ConfigError::MissingEnvVar("SMTP_FROM".to_string()))?;
                Some(SmtpSettings {
                    host,
                    port: parse_in_range(&vars, "SMTP_PORT", DEFAULT_SMTP_PORT, 1, u16::MAX)?,
                    username: non_empty(&vars, "SMTP_USERNAME"),
                    password: non_empty(&vars, "SMTP_PASSWORD").map(SecretString::from),
                    from_address,
                })
            }
            None => None,
        };

        let login_notification = LoginNotificationSettings {
            recipient_override: non_empty(&vars, "LOGIN_NOTIFICATION_RECIPIENT"),
            subject: non_empty(&vars, "LOGIN_NOTIFICATION_SUBJECT")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_SUBJECT.to_string()),
            body_template: non_empty(&vars, "LOGIN_NOTIFICATION_BODY_TEMPLATE")
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY_TEMPLATE.to_string()),
        };

        let cors_allowed_origins = vars
            .get("CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let log_format = LogFormat::parse(vars.get("LOG_FORMAT").map(String::as_str));

        Ok(Config {
            database_url,
            bind_address,
            jwt: JwtSettings {
                signing_key,
                issuer,
                audience,
                expiration_hours,
            },
            bcrypt_cost,
            task_worker_count,
            smtp,
            login_notification,
            cors_allowed_origins,
            log_format,
        })
    }
}

/// Replace `${NAME}` placeholders with the value `lookup` returns for `NAME`.
///
/// Placeholders whose lookup is missing or empty are left untouched, as is an
/// unterminated `${`.
pub fn expand_placeholders<F>(value: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let (before, after_start) = rest.split_at(start);
        out.push_str(before);

        let Some(end) = after_start.find('}') else {
            out.push_str(after_start);
            return out;
        };

        let (placeholder, tail) = after_start.split_at(end + 1);
        let name = placeholder
            .strip_prefix("${")
            .and_then(|p| p.strip_suffix('}'))
            .unwrap_or_default();

        match lookup(name).filter(|v| !v.is_empty()) {
            Some(resolved) => out.push_str(&resolved),
            None => out.push_str(placeholder),
        }
        rest = tail;
    }

    out.push_str(rest);
    out
}

fn non_empty(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_in_range<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Some(raw) = non_empty(vars, name) else {
        return Ok(default);
    };

    let value: T = raw.parse().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("'{}' is not a valid number", raw),
    })?;

    if value < min || value > max {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be between {} and {}, got {}", min, max, value),
        });
    }

    Ok(value)
}
