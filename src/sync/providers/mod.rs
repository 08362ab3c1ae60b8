mod aws;
mod azure;
mod cloudflare;
mod google;
mod tor;

use thiserror::Error;

use crate::ip::RangeError;
use crate::sync::downloader::DownloadError;

pub use aws::{apply_aws, update_aws, AWS_NAME};
pub use azure::{apply_azure, update_azure, AZURE_NAME};
pub use cloudflare::{apply_cloudflare, update_cloudflare, CLOUDFLARE_NAME};
pub use google::{apply_google, update_google, GOOGLE_NAME};
pub use tor::{apply_tor, update_tor, TOR_NAME};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),
    #[error("Range error: {0}")]
    Range(#[from] RangeError),
}
