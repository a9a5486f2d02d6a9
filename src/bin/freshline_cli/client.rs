#![deny(clippy::all, clippy::pedantic)]

use std::fs;

use freshline_api_types::{
    ErrorBody, REVALIDATE_PATH, RevalidateRequest, RevalidateResponse, SECRET_HEADER,
};
use reqwest::{Client, Url};
use thiserror::Error;

use crate::args::Cli;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or FRESHLINE_SITE_URL)")]
    MissingSite,
    #[error("secret is required (use --secret-file or FRESHLINE_SECRET)")]
    MissingSecret,
    #[error("failed to read secret file: {0}")]
    SecretFile(std::io::Error),
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server error: status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("failed to parse response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Clone, Debug)]
pub struct Ctx {
    pub client: Client,
    pub base: Url,
    pub secret: String,
}

impl Ctx {
    pub fn new(site: &str, secret: String) -> Result<Self, CliError> {
        let base = Url::parse(site)?.join("/")?;
        let client = Client::builder().user_agent(Self::user_agent()).build()?;
        Ok(Self {
            client,
            base,
            secret,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("freshline-cli/", env!("CARGO_PKG_VERSION"))
    }

    pub fn url(&self, path: &str) -> Result<Url, CliError> {
        self.base.join(path).map_err(CliError::Url)
    }

    pub async fn revalidate(&self, tags: Vec<String>) -> Result<RevalidateResponse, CliError> {
        let resp = self
            .client
            .post(self.url(REVALIDATE_PATH)?)
            .header(SECRET_HEADER, &self.secret)
            .json(&RevalidateRequest { tags })
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(CliError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

pub fn build_ctx_from_cli(cli: &Cli) -> Result<Ctx, CliError> {
    let site = cli.site.clone().ok_or(CliError::MissingSite)?;
    let secret = if let Some(path) = &cli.secret_file {
        fs::read_to_string(path)
            .map_err(CliError::SecretFile)?
            .trim()
            .to_string()
    } else {
        cli.secret_env.clone().ok_or(CliError::MissingSecret)?
    };

    Ctx::new(&site, secret)
}
