use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub max_upload_mb: usize,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Lecture resource manager API")]
pub struct Args {
    /// Host to bind to (overrides LECTURE_STORE_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides LECTURE_STORE_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory backing `/uploads/` (overrides LECTURE_STORE_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides LECTURE_STORE_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Maximum request body size in MiB (overrides LECTURE_STORE_MAX_UPLOAD_MB)
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let cfg = Self::merge(&args, |key| env::var(key))?;
        Ok((cfg, args.migrate))
    }

    /// Merge CLI args over environment values over defaults.
    fn merge<F>(args: &Args, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, env::VarError>,
    {
        let env_host = var("LECTURE_STORE_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = parse_var(&var, "LECTURE_STORE_PORT", 3000u16)?;
        let env_storage =
            var("LECTURE_STORE_STORAGE_DIR").unwrap_or_else(|_| "./data/uploads".into());
        let env_db = var("LECTURE_STORE_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/lectures.db".into());
        let env_max_upload = parse_var(&var, "LECTURE_STORE_MAX_UPLOAD_MB", 512usize)?;

        Ok(Self {
            host: args.host.clone().unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            storage_dir: args.storage_dir.clone().unwrap_or(env_storage),
            database_url: args.database_url.clone().unwrap_or(env_db),
            max_upload_mb: args.max_upload_mb.unwrap_or(env_max_upload),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

fn parse_var<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Result<String, env::VarError>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Ok(value) => value
            .parse::<T>()
            .with_context(|| format!("parsing {} value `{}`", key, value)),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(err) => Err(err).with_context(|| format!("reading {}", key)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, env::VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(env::VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_without_env_or_args() {
        let args = Args::parse_from(["lecture-store"]);

        let cfg = AppConfig::merge(&args, lookup(&[])).unwrap();

        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.storage_dir, "./data/uploads");
        assert_eq!(cfg.max_body_bytes(), 512 * 1024 * 1024);
    }

    #[test]
    fn args_override_env() {
        let args = Args::parse_from(["lecture-store", "--port", "8080"]);

        let cfg = AppConfig::merge(
            &args,
            lookup(&[
                ("LECTURE_STORE_PORT", "9000"),
                ("LECTURE_STORE_STORAGE_DIR", "/srv/uploads"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.storage_dir, "/srv/uploads");
    }

    #[test]
    fn bad_port_is_reported() {
        let args = Args::parse_from(["lecture-store"]);

        let err = AppConfig::merge(&args, lookup(&[("LECTURE_STORE_PORT", "http")])).unwrap_err();

        assert!(err.to_string().contains("LECTURE_STORE_PORT"));
    }
}
