use tracing::info;

use super::ProviderError;
use crate::ip::TableBuilder;
use crate::sync::downloader::fetch_text;

pub const CLOUDFLARE_NAME: &str = "Cloudflare Inc";
pub const CLOUDFLARE_URL: &str = "https://www.cloudflare.com/";

const LIST_URLS: [&str; 2] = [
    "https://www.cloudflare.com/ips-v4",
    "https://www.cloudflare.com/ips-v6",
];

pub async fn update_cloudflare(builder: &mut TableBuilder) -> Result<usize, ProviderError> {
    let mut body = String::new();
    for url in LIST_URLS {
        body.push_str(&fetch_text(url).await?);
        body.push('\n');
    }
    apply_cloudflare(builder, &body)
}

/// The feed is one CIDR per line for each family; anything that is not a
/// valid CIDR fails the update rather than silently shrinking coverage.
pub fn apply_cloudflare(builder: &mut TableBuilder, body: &str) -> Result<usize, ProviderError> {
    builder.delete_by_name(CLOUDFLARE_NAME);

    let mut added = 0;
    for line in body.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        builder.add_cidr(line, CLOUDFLARE_NAME, CLOUDFLARE_URL)?;
        added += 1;
    }

    info!("Cloudflare: {} ranges", added);
    Ok(added)
}
