use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_postgres_url, validate_range, Validate,
};
use std::fmt;
use url::Url;

pub const DEFAULT_PG_PORT: u16 = 5432;
const APPLICATION_NAME: &str = "area-etl";

/// 連線參數。所有值都來自環境變數，沒有任何內建帳密。
#[derive(Clone, PartialEq, Eq)]
pub enum DbConfig {
    /// `DATABASE_URL`，優先於個別參數
    Url(String),
    Params(DbParams),
}

#[derive(Clone, PartialEq, Eq)]
pub struct DbParams {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub dbname: String,
}

impl DbConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 以任意查詢函式讀取設定，測試時不必動到行程環境
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            return Ok(DbConfig::Url(url));
        }

        let required = |name: &str| {
            get(name).ok_or_else(|| EtlError::MissingConfigError {
                field: name.to_string(),
            })
        };

        let port = match get("PGPORT") {
            Some(raw) => parse_port(&raw)?,
            None => DEFAULT_PG_PORT,
        };

        Ok(DbConfig::Params(DbParams {
            host: required("PGHOST")?,
            port,
            user: required("PGUSER")?,
            password: get("PGPASSWORD"),
            dbname: required("PGDATABASE")?,
        }))
    }

    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config> {
        let mut config = match self {
            DbConfig::Url(url) => url.parse::<tokio_postgres::Config>().map_err(|e| {
                EtlError::ConfigValidationError {
                    field: "DATABASE_URL".to_string(),
                    message: e.to_string(),
                }
            })?,
            DbConfig::Params(p) => {
                let mut config = tokio_postgres::Config::new();
                config
                    .host(&p.host)
                    .port(p.port)
                    .user(&p.user)
                    .dbname(&p.dbname);
                if let Some(password) = &p.password {
                    config.password(password);
                }
                config
            }
        };
        config.application_name(APPLICATION_NAME);
        Ok(config)
    }

    /// 可以寫進日誌的描述，不含密碼
    pub fn describe(&self) -> String {
        match self {
            DbConfig::Url(raw) => match Url::parse(raw) {
                Ok(url) => format!(
                    "{}@{}:{}{}",
                    url.username(),
                    url.host_str().unwrap_or("?"),
                    url.port().unwrap_or(DEFAULT_PG_PORT),
                    url.path()
                ),
                Err(_) => "<unparseable DATABASE_URL>".to_string(),
            },
            DbConfig::Params(p) => format!("{}@{}:{}/{}", p.user, p.host, p.port, p.dbname),
        }
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    let port = raw
        .trim()
        .parse::<u32>()
        .map_err(|_| EtlError::InvalidConfigValueError {
            field: "PGPORT".to_string(),
            value: raw.to_string(),
            reason: "Port must be an integer".to_string(),
        })?;
    validate_range("PGPORT", port, 1, u16::MAX as u32)?;
    Ok(port as u16)
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbConfig::Url(_) => f
                .debug_tuple("Url")
                .field(&self.describe())
                .finish(),
            DbConfig::Params(p) => f
                .debug_struct("Params")
                .field("host", &p.host)
                .field("port", &p.port)
                .field("user", &p.user)
                .field("password", &p.password.as_ref().map(|_| "<redacted>"))
                .field("dbname", &p.dbname)
                .finish(),
        }
    }
}

impl Validate for DbConfig {
    fn validate(&self) -> Result<()> {
        match self {
            DbConfig::Url(url) => validate_postgres_url("DATABASE_URL", url),
            DbConfig::Params(p) => {
                validate_non_empty_string("PGHOST", &p.host)?;
                validate_non_empty_string("PGUSER", &p.user)?;
                validate_non_empty_string("PGDATABASE", &p.dbname)?;
                Ok(())
            }
        }
    }
}
