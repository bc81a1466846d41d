use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{PriceListError, Result};
use crate::scratch::ScratchFile;
use crate::sniff;

/// Retrieves remote content into a local scratch file.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Downloads `url`, checks that the body is plain text and writes it to a
    /// scratch file owned by the caller.
    async fn fetch(&self, url: &str) -> Result<ScratchFile>;
}

/// `ContentFetcher` over HTTP(S) using reqwest.
pub struct HttpContentFetcher {
    http: reqwest::Client,
    scratch_dir: PathBuf,
}

impl HttpContentFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            scratch_dir: config.scratch_dir.clone(),
        })
    }

    async fn download(&self, url: Url) -> Result<Vec<u8>> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PriceListError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

pub fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|err| PriceListError::InvalidUrl {
        url: raw.to_string(),
        reason: err.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(PriceListError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}

#[async_trait]
impl ContentFetcher for HttpContentFetcher {
    async fn fetch(&self, url: &str) -> Result<ScratchFile> {
        let url = parse_url(url)?;
        let body = self.download(url.clone()).await?;

        let detected = sniff::detect_media_type(&body);
        log::info!("Downloaded {} bytes from {} ({})", body.len(), url, detected);
        if detected != sniff::TEXT_PLAIN {
            return Err(PriceListError::UnsupportedType { detected });
        }

        let scratch_dir = self.scratch_dir.clone();
        let scratch = tokio::task::spawn_blocking(move || ScratchFile::create(&scratch_dir, &body))
            .await
            .map_err(|err| PriceListError::Io(io::Error::other(err)))??;
        Ok(scratch)
    }
}
