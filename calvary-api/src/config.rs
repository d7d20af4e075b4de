use anyhow::{bail, Context};
use calvary_core::{
    AuthConfig, PgStoreConfig, DEFAULT_ACCESS_TTL_SECS, DEFAULT_ISSUER, DEFAULT_REFRESH_TTL_SECS,
    DEFAULT_RESET_TTL_SECS,
};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: SocketAddr,
    pub auth: AuthConfig,
    pub database: PgStoreConfig,
    /// CORS 允许的来源列表（空则允许所有）
    pub cors_origins: Vec<String>,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 从任意键值来源读取配置；JWT_SECRET 缺失时启动失败
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind = match get("CALVARY_BIND") {
            Some(addr) => addr
                .parse()
                .with_context(|| format!("invalid CALVARY_BIND: {addr}"))?,
            None => {
                let port = parse_or("SERVER_PORT", get("SERVER_PORT"), 8080u16)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let Some(jwt_secret) = get("JWT_SECRET") else {
            bail!("JWT_SECRET must be set");
        };
        let issuer = get("JWT_ISSUER").unwrap_or_else(|| DEFAULT_ISSUER.to_string());
        let access_ttl = parse_or(
            "ACCESS_TOKEN_TTL_SECS",
            get("ACCESS_TOKEN_TTL_SECS"),
            DEFAULT_ACCESS_TTL_SECS,
        )?;
        let refresh_ttl = parse_or(
            "REFRESH_TOKEN_TTL_SECS",
            get("REFRESH_TOKEN_TTL_SECS"),
            DEFAULT_REFRESH_TTL_SECS,
        )?;
        let reset_ttl = parse_or(
            "RESET_TOKEN_TTL_SECS",
            get("RESET_TOKEN_TTL_SECS"),
            DEFAULT_RESET_TTL_SECS,
        )?;
        let db_timeout = parse_or("DB_TIMEOUT_SECS", get("DB_TIMEOUT_SECS"), 5u64)?;

        let auth = AuthConfig::new(jwt_secret)?
            .with_issuer(issuer)
            .with_ttl(access_ttl, refresh_ttl)
            .with_reset_ttl(reset_ttl)
            .with_store_timeout(Duration::from_secs(db_timeout));
        auth.validate()?;

        let url = match get("DATABASE_URL") {
            Some(url) => url,
            None => postgres_url(&get)?,
        };
        let database = PgStoreConfig {
            url,
            max_connections: parse_or("DB_MAX_CONNECTIONS", get("DB_MAX_CONNECTIONS"), 5u32)?,
            acquire_timeout: Duration::from_secs(db_timeout),
        };

        // 逗号分隔；空或 "*" 表示允许所有
        let cors_origins = match get("CORS_ORIGINS") {
            Some(s) if s != "*" => s
                .split(',')
                .map(|t| t.trim())
                .filter(|t| !t.is_empty())
                .map(String::from)
                .collect(),
            _ => vec![],
        };

        Ok(Self {
            bind,
            auth,
            database,
            cors_origins,
        })
    }
}

/// 由 POSTGRES_* 分项拼出连接串
fn postgres_url(get: &dyn Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    let host = get("POSTGRES_HOST").unwrap_or_else(|| "localhost".into());
    let port = get("POSTGRES_PORT").unwrap_or_else(|| "5432".into());
    let Some(user) = get("POSTGRES_USER") else {
        bail!("DATABASE_URL or POSTGRES_USER must be set");
    };
    let password = get("POSTGRES_PASSWORD").unwrap_or_default();
    let Some(db_name) = get("POSTGRES_DB_NAME") else {
        bail!("DATABASE_URL or POSTGRES_DB_NAME must be set");
    };
    Ok(format!(
        "postgres://{user}:{password}@{host}:{port}/{db_name}?sslmode=disable"
    ))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v.parse().with_context(|| format!("invalid {key}: {v}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<ApiConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_secret_fails() {
        let err = load(&[("DATABASE_URL", "postgres://x/y")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));

        let err = load(&[("JWT_SECRET", "   "), ("DATABASE_URL", "postgres://x/y")]).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("DATABASE_URL", "postgres://x/y")]).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.auth.issuer(), DEFAULT_ISSUER);
        assert_eq!(config.auth.access_token_ttl().num_seconds(), 1800);
        assert_eq!(config.database.url, "postgres://x/y");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn postgres_parts_build_url() {
        let config = load(&[
            ("JWT_SECRET", "s3cret"),
            ("SERVER_PORT", "9000"),
            ("POSTGRES_HOST", "db"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_USER", "calvary"),
            ("POSTGRES_PASSWORD", "pw"),
            ("POSTGRES_DB_NAME", "admin"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(
            config.database.url,
            "postgres://calvary:pw@db:6543/admin?sslmode=disable"
        );
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn bad_ttl_pair_is_rejected() {
        let err = load(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://x/y"),
            ("ACCESS_TOKEN_TTL_SECS", "3600"),
            ("REFRESH_TOKEN_TTL_SECS", "60"),
        ]);
        assert!(err.is_err());

        let err = load(&[
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://x/y"),
            ("ACCESS_TOKEN_TTL_SECS", "soon"),
        ]);
        assert!(err.is_err());

        let max = i64::MAX.to_string();
        for key in ["REFRESH_TOKEN_TTL_SECS", "RESET_TOKEN_TTL_SECS"] {
            let err = load(&[
                ("JWT_SECRET", "s3cret"),
                ("DATABASE_URL", "postgres://x/y"),
                (key, max.as_str()),
            ]);
            assert!(err.is_err(), "{key} should be rejected");
        }
    }
}
