use serde::Deserialize;
use tracing::info;

use super::ProviderError;
use crate::ip::TableBuilder;
use crate::sync::downloader::fetch_text;

pub const GOOGLE_NAME: &str = "Google Cloud";
pub const GOOGLE_URL: &str = "https://cloud.google.com/";

const RANGES_URL: &str = "https://www.gstatic.com/ipranges/cloud.json";

#[derive(Debug, Deserialize)]
struct GooglePrefix {
    #[serde(rename = "ipv4Prefix")]
    ipv4_prefix: Option<String>,
    #[serde(rename = "ipv6Prefix")]
    ipv6_prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleRanges {
    prefixes: Vec<GooglePrefix>,
}

pub async fn update_google(builder: &mut TableBuilder) -> Result<usize, ProviderError> {
    let body = fetch_text(RANGES_URL).await?;
    apply_google(builder, &body)
}

pub fn apply_google(builder: &mut TableBuilder, body: &str) -> Result<usize, ProviderError> {
    let ranges: GoogleRanges = serde_json::from_str(body)?;

    builder.delete_by_name(GOOGLE_NAME);

    let mut added = 0;
    for prefix in &ranges.prefixes {
        let cidr = prefix.ipv4_prefix.as_deref().or(prefix.ipv6_prefix.as_deref());
        if let Some(cidr) = cidr {
            builder.add_cidr(cidr, GOOGLE_NAME, GOOGLE_URL)?;
            added += 1;
        }
    }

    info!("Google Cloud: {} ranges", added);
    Ok(added)
}
