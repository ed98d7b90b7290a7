use anyhow::{Context, Result};
use simplelog::LevelFilter;
use url::Url;

pub const DEFAULT_PORTAL_URL: &str = "https://ta.yrdsb.ca";
pub const DEFAULT_PORT: u16 = 3002;
pub const DEFAULT_MAX_AMBIGUOUS_MARKS: usize = 20;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub portal_url: String,
    pub log_level: LevelFilter,
    pub max_ambiguous_marks: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            portal_url: DEFAULT_PORTAL_URL.to_string(),
            log_level: LevelFilter::Info,
            max_ambiguous_marks: DEFAULT_MAX_AMBIGUOUS_MARKS,
        }
    }
}

impl Config {
    // Reads the process environment. Call `dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("PORT is not a valid port number: {port}"))?;
        }
        if let Some(portal_url) = lookup("PORTAL_URL") {
            Url::parse(&portal_url)
                .with_context(|| format!("PORTAL_URL is not a valid URL: {portal_url}"))?;
            config.portal_url = portal_url.trim_end_matches('/').to_string();
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level
                .trim()
                .parse()
                .with_context(|| format!("LOG_LEVEL is not a valid level: {level}"))?;
        }
        if let Some(max) = lookup("MAX_AMBIGUOUS_MARKS") {
            config.max_ambiguous_marks = max
                .trim()
                .parse()
                .with_context(|| format!("MAX_AMBIGUOUS_MARKS is not a number: {max}"))?;
        }

        Ok(config)
    }
}
