use serde::Deserialize;
use tracing::info;

use super::ProviderError;
use crate::ip::TableBuilder;
use crate::sync::downloader::fetch_text;

pub const AZURE_NAME: &str = "Microsoft Azure";
pub const AZURE_URL: &str = "http://www.windowsazure.com/en-us/";

// Microsoft publishes Service Tags behind a dated download URL; the
// confirmation page is the stable entry point to discover it.
const DOWNLOAD_PAGE: &str =
    "https://www.microsoft.com/en-us/download/confirmation.aspx?id=56519";

#[derive(Debug, Deserialize)]
struct AzureProperties {
    #[serde(rename = "addressPrefixes")]
    address_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct AzureValue {
    name: String,
    properties: AzureProperties,
}

#[derive(Debug, Deserialize)]
struct AzureServiceTags {
    values: Vec<AzureValue>,
}

fn extract_service_tags_url(page: &str) -> Option<String> {
    let marker = page.find("ServiceTags_Public_")?;
    let start = page[..marker].rfind("https://download.microsoft.com/")?;
    let tail = &page[start..];
    let end = tail.find(".json")? + ".json".len();
    Some(tail[..end].to_owned())
}

async fn find_service_tags_url() -> Result<String, ProviderError> {
    let page = fetch_text(DOWNLOAD_PAGE).await?;
    extract_service_tags_url(&page).ok_or_else(|| {
        ProviderError::MalformedFeed("no ServiceTags_Public url on download page".to_owned())
    })
}

pub async fn update_azure(builder: &mut TableBuilder) -> Result<usize, ProviderError> {
    let url = find_service_tags_url().await?;
    info!("Azure service tags at {}", url);
    let body = fetch_text(&url).await?;
    apply_azure(builder, &body)
}

/// Replaces all Azure records with the `AzureCloud` aggregate tag, which
/// covers every public Azure range across regions.
pub fn apply_azure(builder: &mut TableBuilder, body: &str) -> Result<usize, ProviderError> {
    let tags: AzureServiceTags = serde_json::from_str(body)?;

    let cloud = tags
        .values
        .iter()
        .find(|value| value.name == "AzureCloud")
        .ok_or_else(|| ProviderError::MalformedFeed("no AzureCloud service tag".to_owned()))?;

    builder.delete_by_name(AZURE_NAME);

    let mut added = 0;
    for prefix in &cloud.properties.address_prefixes {
        builder.add_cidr(prefix, AZURE_NAME, AZURE_URL)?;
        added += 1;
    }

    info!("Azure: {} ranges", added);
    Ok(added)
}
