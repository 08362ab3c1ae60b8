use std::net::Ipv4Addr;

use tracing::info;

use super::ProviderError;
use crate::ip::TableBuilder;
use crate::sync::downloader::fetch_text;

pub const TOR_NAME: &str = "Tor Project";
pub const TOR_URL: &str = "https://www.torproject.org/";

const EXIT_LIST_URL: &str = "https://panwdbl.appspot.com/lists/ettor.txt";

pub async fn update_tor(builder: &mut TableBuilder) -> Result<usize, ProviderError> {
    let body = fetch_text(EXIT_LIST_URL).await?;
    apply_tor(builder, &body)
}

/// Exit-node lists carry `#` comments and the occasional stray token.
/// Lines are a single IPv4 address or an `a-b` pair; anything else is
/// skipped rather than failing the whole refresh.
pub fn apply_tor(builder: &mut TableBuilder, body: &str) -> Result<usize, ProviderError> {
    builder.delete_by_name(TOR_NAME);

    let mut added = 0;
    for line in body.lines() {
        let line = match line.find('#') {
            Some(at) => &line[..at],
            None => line,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (start, end) = match line.split_once('-') {
            Some((start, end)) => (start.trim(), end.trim()),
            None => (line, line),
        };
        if start.parse::<Ipv4Addr>().is_err() || end.parse::<Ipv4Addr>().is_err() {
            continue;
        }

        builder.add_range(start, end, TOR_NAME, TOR_URL)?;
        added += 1;
    }

    info!("Tor: {} ranges", added);
    Ok(added)
}
