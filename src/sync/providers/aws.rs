use serde::Deserialize;
use tracing::info;

use super::ProviderError;
use crate::ip::TableBuilder;
use crate::sync::downloader::fetch_text;

pub const AWS_NAME: &str = "Amazon AWS";
pub const AWS_URL: &str = "http://www.amazon.com/aws/";

const RANGES_URL: &str = "https://ip-ranges.amazonaws.com/ip-ranges.json";

#[derive(Debug, Deserialize)]
struct AwsPrefix {
    ip_prefix: String,
    service: String,
}

#[derive(Debug, Deserialize)]
struct AwsRanges {
    prefixes: Vec<AwsPrefix>,
}

pub async fn update_aws(builder: &mut TableBuilder) -> Result<usize, ProviderError> {
    let body = fetch_text(RANGES_URL).await?;
    apply_aws(builder, &body)
}

/// Replaces all AWS records with the EC2 prefixes from the published feed.
/// Non-EC2 services share address space with their fronting infrastructure
/// and are left out, as the upstream data always has been.
pub fn apply_aws(builder: &mut TableBuilder, body: &str) -> Result<usize, ProviderError> {
    let ranges: AwsRanges = serde_json::from_str(body)?;

    builder.delete_by_name(AWS_NAME);

    let mut added = 0;
    for prefix in &ranges.prefixes {
        if prefix.service == "EC2" {
            builder.add_cidr(&prefix.ip_prefix, AWS_NAME, AWS_URL)?;
            added += 1;
        }
    }

    info!("AWS: {} EC2 ranges", added);
    Ok(added)
}
