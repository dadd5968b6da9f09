use clap::Parser;
use std::path::Path;
use std::time::Duration;

// Fills unset environment variables from an env file; a missing file is fine
pub fn load_env_file(path: &Path) -> Result<(), dotenvy::Error> {
    match dotenvy::from_path(path) {
        Err(e) if e.not_found() => Ok(()),
        other => other,
    }
}

// CLI argument structure, every option can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "inspiration-gateway")]
#[command(about = "Rate limited relay in front of the Anthropic Messages API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    // Anthropic API key, startup fails without it
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    pub api_key: String,

    // Base url of the Anthropic API
    #[arg(long, env = "ANTHROPIC_API_URL", default_value = "https://api.anthropic.com")]
    pub api_url: String,

    // Model used for every generation
    #[arg(long, env = "ANTHROPIC_MODEL", default_value = "claude-sonnet-4-20250514")]
    pub model: String,

    // Max output tokens per generation
    #[arg(long, default_value_t = 1000)]
    pub max_tokens: u32,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 3600, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_window: u64,

    // Upstream call timeout in seconds
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    pub upstream_timeout: u64,

    // Stale quota sweep interval in seconds (0 = never sweep)
    #[arg(long, default_value_t = 300)]
    pub sweep_interval: u64,

    // Use the first X-Forwarded-For entry as client identity
    #[arg(long, default_value_t = false)]
    pub trust_proxy: bool,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }

    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval > 0).then(|| Duration::from_secs(self.sweep_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["inspiration-gateway", "--api-key", "sk-test", "--port", "4000"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    #[test]
    fn explicit_flags_win() {
        let args = parse(&["--rate-limit", "5", "--rate-window", "60"]).unwrap();
        assert_eq!(args.port, 4000);
        assert_eq!(args.api_key, "sk-test");
        assert_eq!(args.rate_limit, 5);
        assert_eq!(args.rate_window(), Duration::from_secs(60));
    }

    #[test]
    fn quota_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.max_tokens, 1000);
        assert_eq!(args.rate_limit, 20);
        assert_eq!(args.rate_window(), Duration::from_secs(3600));
        assert_eq!(args.upstream_timeout(), Duration::from_secs(60));
        assert!(!args.trust_proxy);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(parse(&["--rate-limit", "0"]).is_err());
        assert!(parse(&["--rate-window", "0"]).is_err());
    }

    #[test]
    fn env_file_feeds_env_backed_flags() {
        let path = std::env::temp_dir().join(format!("gateway-{}.env", std::process::id()));
        std::fs::write(&path, "ANTHROPIC_API_URL=http://from-env-file.test\n").unwrap();

        load_env_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let args = parse(&[]).unwrap();
        assert_eq!(args.api_url, "http://from-env-file.test");
    }

    #[test]
    fn missing_env_file_is_not_an_error() {
        let path = std::env::temp_dir().join("gateway-does-not-exist.env");
        assert!(load_env_file(&path).is_ok());
    }

    #[test]
    fn zero_sweep_interval_disables_sweeping() {
        let args = parse(&["--sweep-interval", "0"]).unwrap();
        assert_eq!(args.sweep_interval(), None);
        let args = parse(&["--sweep-interval", "10"]).unwrap();
        assert_eq!(args.sweep_interval(), Some(Duration::from_secs(10)));
    }
}
