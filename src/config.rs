//! Configuration types, built from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default rasterization resolution.
pub const DEFAULT_DPI: u32 = 300;

/// Per-call bound on the vision oracle.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Vision oracle connection settings.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Response budget for the extracted name.
    pub max_tokens: u32,
    pub temperature: f32,
}

impl OracleConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-flash-lite-preview-06-17".to_string(),
            timeout: DEFAULT_ORACLE_TIMEOUT,
            max_tokens: 80,
            temperature: 0.1,
        }
    }

    /// Build from `OPENROUTER_*` / `VISION_MODEL`. The API key is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".into()))?;

        let mut config = Self::new(SecretString::from(api_key));
        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = std::env::var("VISION_MODEL") {
            config.model = model;
        }
        if let Some(secs) = parse_env::<u64>("VISION_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// Sender identity shared by every mail backend.
#[derive(Debug, Clone)]
pub struct SenderIdentity {
    pub name: String,
    pub email: String,
}

/// Outbound mail backend selection.
#[derive(Debug, Clone)]
pub enum MailConfig {
    Mailgun {
        api_key: SecretString,
        domain: String,
        sender: SenderIdentity,
    },
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: SecretString,
        sender: SenderIdentity,
    },
}

impl MailConfig {
    /// Build from environment. `MAIL_BACKEND` picks `mailgun` (default) or `smtp`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = std::env::var("MAIL_BACKEND").unwrap_or_else(|_| "mailgun".to_string());
        match backend.as_str() {
            "mailgun" => Ok(Self::Mailgun {
                api_key: SecretString::from(required("MAILGUN_API_KEY")?),
                domain: required("MAILGUN_DOMAIN")?,
                sender: SenderIdentity {
                    name: required("MAILGUN_FROM_NAME")?,
                    email: required("MAILGUN_FROM_EMAIL")?,
                },
            }),
            "smtp" => Ok(Self::Smtp {
                host: required("SMTP_HOST")?,
                port: parse_env("SMTP_PORT")?.unwrap_or(587),
                username: std::env::var("SMTP_USERNAME").unwrap_or_default(),
                password: SecretString::from(std::env::var("SMTP_PASSWORD").unwrap_or_default()),
                sender: SenderIdentity {
                    name: required("MAIL_FROM_NAME")?,
                    email: required("MAIL_FROM_EMAIL")?,
                },
            }),
            other => Err(ConfigError::InvalidValue {
                key: "MAIL_BACKEND".into(),
                message: format!("unknown backend '{other}' (expected mailgun or smtp)"),
            }),
        }
    }
}

/// Where process records live between phase 1 and phase 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    LibSql(PathBuf),
}

/// Service-level settings.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub template_path: PathBuf,
    pub bind_addr: String,
    pub dpi: u32,
    /// Page workers during extraction.
    pub workers: usize,
    /// Records older than this are treated as expired.
    pub process_ttl: Duration,
    pub store: StoreBackend,
    pub max_upload_bytes: usize,
    /// Directory for debug crop captures; `None` disables them.
    pub debug_crops_dir: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            template_path: PathBuf::from("company_configs/config.json"),
            bind_addr: "0.0.0.0:8000".to_string(),
            dpi: DEFAULT_DPI,
            workers: default_workers(),
            process_ttl: Duration::from_secs(3600), // 1 hour
            store: StoreBackend::Memory,
            max_upload_bytes: 10 * 1024 * 1024,
            debug_crops_dir: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store = match std::env::var("PAYSLIP_STORE") {
            Ok(value) if value != "memory" && !value.is_empty() => {
                StoreBackend::LibSql(PathBuf::from(value))
            }
            _ => StoreBackend::Memory,
        };

        let workers = parse_env::<usize>("PAYSLIP_WORKERS")?.unwrap_or(defaults.workers);
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAYSLIP_WORKERS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            template_path: std::env::var("PAYSLIP_TEMPLATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.template_path),
            bind_addr: std::env::var("PAYSLIP_BIND").unwrap_or(defaults.bind_addr),
            dpi: parse_env("PAYSLIP_DPI")?.unwrap_or(defaults.dpi),
            workers,
            process_ttl: parse_env::<u64>("PAYSLIP_PROCESS_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.process_ttl),
            store,
            max_upload_bytes: match parse_env::<usize>("MAX_FILE_SIZE_MB")? {
                Some(mb) => megabytes("MAX_FILE_SIZE_MB", mb)?,
                None => defaults.max_upload_bytes,
            },
            debug_crops_dir: std::env::var("PAYSLIP_DEBUG_CROPS").ok().map(PathBuf::from),
        })
    }
}

/// One worker per available processing unit.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn required(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn megabytes(key: &str, mb: usize) -> Result<usize, ConfigError> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{mb} MB does not fit in memory"),
        })
}

fn parse_env<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{e}"),
            }),
        Err(_) => Ok(None),
    }
}
