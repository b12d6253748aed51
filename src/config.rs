use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use regex::Regex;
use tokio_postgres::NoTls;

/// Where posts, blobs and sessions live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Supabase auth + storage + PostgREST.
    Supabase,
    /// Supabase auth + storage, posts straight in Postgres.
    Postgres,
    /// Everything in process; for local development.
    Memory,
}

impl Backend {
    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "supabase" => Ok(Self::Supabase),
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => bail!("unknown BOARD_BACKEND '{}'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    pub anon_key: String,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub backend: Backend,
    pub supabase: Option<SupabaseConfig>,
    pub bucket: String,
    pub posts_table: String,
    pub http_timeout: Duration,
    pub public_base_url: String,
    /// Interface to listen on. Loopback unless `BIND_ADDR` says otherwise.
    pub bind_host: String,
    pub port: String,
    pub allowed_origins: Vec<String>,
}

impl BoardConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let backend = Backend::parse(&var("BOARD_BACKEND").unwrap_or_default())?;

        let supabase = match backend {
            Backend::Memory => None,
            Backend::Supabase | Backend::Postgres => Some(SupabaseConfig {
                url: var("SUPABASE_URL")
                    .context("SUPABASE_URL not set")?
                    .trim()
                    .trim_end_matches('/')
                    .to_string(),
                anon_key: var("SUPABASE_ANON_KEY")
                    .context("SUPABASE_ANON_KEY not set")?
                    .trim()
                    .to_string(),
                jwt_secret: var("SUPABASE_JWT_SECRET")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty()),
            }),
        };

        let posts_table = var("BOARD_POSTS_TABLE").unwrap_or_else(|| "posts".into());
        if !is_plain_identifier(&posts_table) {
            bail!("BOARD_POSTS_TABLE '{}' is not a plain identifier", posts_table);
        }

        let http_timeout = match var("BOARD_HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.trim()
                    .parse()
                    .with_context(|| format!("BOARD_HTTP_TIMEOUT_SECS '{}' is not a number", raw))?,
            ),
            None => Duration::from_secs(30),
        };

        let bind_host = var("BIND_ADDR")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = var("PORT").unwrap_or_else(|| "8080".to_string());
        let public_base_url = var("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = var("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000,http://127.0.0.1:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            backend,
            supabase,
            bucket: var("BOARD_BUCKET").unwrap_or_else(|| "board".into()),
            posts_table,
            http_timeout,
            public_base_url,
            bind_host,
            port,
            allowed_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_host, self.port)
    }
}

/// Table names are spliced into SQL, so only bare identifiers pass.
pub fn is_plain_identifier(name: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex");
    re.is_match(name)
}

pub fn mask_key(k: &str) -> String {
    let chars: Vec<char> = k.chars().collect();
    if chars.len() <= 8 {
        "[REDACTED]".to_string()
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

pub fn get_pg_pool() -> Result<Pool> {
    let mut cfg = Config::new();
    cfg.host = Some(env::var("PG_HOST").context("PG_HOST not set")?);
    cfg.user = Some(env::var("PG_USER").context("PG_USER not set")?);
    cfg.password = env::var("PG_PASS").ok();
    cfg.dbname = Some(env::var("PG_DB").context("PG_DB not set")?);

    let mut pool: PoolConfig = cfg.pool.take().unwrap_or_default();
    pool.max_size = 16;
    cfg.pool = Some(pool);

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("failed to create postgres pool")
}
