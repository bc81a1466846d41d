use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_SCRATCH_DIR: &str = "./tmp";

#[derive(Deserialize, Debug, Clone)]
pub struct FetchConfig {
    /// Directory receiving downloaded price lists while they are parsed.
    pub scratch_dir: PathBuf,
    #[serde(default = "default_http_timeout")]
    pub http_timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("pfetcher/{}", env!("CARGO_PKG_VERSION"))
}

impl FetchConfig {
    pub fn new(scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            http_timeout: default_http_timeout(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SCRATCH_DIR)
    }
}
