use std::process::Stdio;
use std::time::Duration;

use miniscrape_core::error::AppError;
use miniscrape_core::models::{CommandConfig, PageSpec};
use miniscrape_core::traits::Fetcher;
use rand::seq::SliceRandom;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tokio::process::Command;

use crate::encoding::{charset_from_content_type, decode_html};

/// Browser User-Agent strings; one is picked at random per request.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

/// HTTP fetcher using reqwest.
///
/// One GET per page with a rotating browser User-Agent. Page definitions
/// are operator-configured, so no destination filtering is applied.
#[derive(Clone)]
pub struct ReqwestFetcher {
    client: Client,
    timeout_secs: u64,
}

impl ReqwestFetcher {
    pub fn new() -> Result<Self, AppError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::HttpError(e.to_string()))?;

        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    /// Raw body bytes plus the charset announced in `Content-Type`, if any.
    pub async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), AppError> {
        if url.trim().is_empty() {
            return Err(AppError::HttpError("page has no url".into()));
        }

        let user_agent = random_user_agent();
        tracing::trace!(%url, user_agent, "Sending request");

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, user_agent)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Timeout(self.timeout_secs)
                } else if e.is_connect() {
                    AppError::NetworkError(format!("Connection failed: {e}"))
                } else {
                    AppError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::HttpError(format!(
                "HTTP {} for {}",
                status.as_u16(),
                url
            )));
        }

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(charset_from_content_type)
            .map(str::to_string);

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout(self.timeout_secs)
            } else {
                AppError::HttpError(format!("Failed to read response body: {e}"))
            }
        })?;

        Ok((body.to_vec(), charset))
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, page: &PageSpec) -> Result<String, AppError> {
        let (body, charset) = self.fetch_bytes(&page.url).await.inspect_err(|e| {
            tracing::warn!(page = %page.namespace(), url = %page.url, error = %e, "Request failed");
        })?;
        Ok(decode_html(&body, charset.as_deref()))
    }
}

// ---------------------------------------------------------------------------
// External command
// ---------------------------------------------------------------------------

/// Runs an external process and uses its stdout as the page content.
///
/// A non-zero exit that still printed something is accepted with a warning.
#[derive(Debug, Clone, Default)]
pub struct CommandFetcher;

impl CommandFetcher {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, command: &CommandConfig) -> Result<Vec<u8>, AppError> {
        tracing::debug!(command = %command, "Resolve using command");

        let output = Command::new(&command.name)
            .args(&command.args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AppError::CommandError {
                command: command.to_string(),
                message: format!("unable to start: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if output.stdout.is_empty() {
                return Err(AppError::CommandError {
                    command: command.to_string(),
                    message: format!("{} with no output: {}", output.status, stderr.trim()),
                });
            }
            tracing::warn!(
                command = %command,
                status = %output.status,
                stderr = %stderr.trim(),
                "Command failed but produced output, using it"
            );
        }

        Ok(output.stdout)
    }
}

impl Fetcher for CommandFetcher {
    async fn fetch(&self, page: &PageSpec) -> Result<String, AppError> {
        let command = page.content_command().ok_or_else(|| AppError::CommandError {
            command: String::new(),
            message: format!("page {} has no command", page.namespace()),
        })?;
        let stdout = self.run(command).await?;
        Ok(decode_html(&stdout, None))
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Uses the page's command when one is configured, HTTP otherwise.
#[derive(Clone)]
pub struct SourceFetcher {
    http: ReqwestFetcher,
    command: CommandFetcher,
}

impl SourceFetcher {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self::with_http(ReqwestFetcher::new()?))
    }

    pub fn with_http(http: ReqwestFetcher) -> Self {
        Self {
            http,
            command: CommandFetcher::new(),
        }
    }
}

impl Fetcher for SourceFetcher {
    async fn fetch(&self, page: &PageSpec) -> Result<String, AppError> {
        if page.content_command().is_some() {
            self.command.fetch(page).await
        } else {
            self.http.fetch(page).await
        }
    }
}
