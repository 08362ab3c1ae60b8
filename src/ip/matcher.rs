use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use crate::db::Catalog;
use crate::ip::table::{parse_ip, IpValue, RangeEntry, RangeError};

#[derive(Debug, Clone, Serialize)]
pub struct MatchedRange {
    pub start: String,
    pub end: String,
    pub name: String,
    pub url: String,
}

impl MatchedRange {
    fn from_entry(entry: &RangeEntry) -> Self {
        Self {
            start: entry.start_ip().to_string(),
            end: entry.end_ip().to_string(),
            name: entry.name.clone(),
            url: entry.url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResult {
    pub found: bool,
    pub query: String,
    pub range: Option<MatchedRange>,
}

pub fn lookup_ip(catalog: &Arc<Catalog>, ip_str: &str) -> Result<LookupResult, RangeError> {
    let ip = parse_ip(ip_str)?;
    let table = catalog.table();
    let range = table.find_value(ip).map(MatchedRange::from_entry);

    Ok(LookupResult {
        found: range.is_some(),
        query: ip_str.to_owned(),
        range,
    })
}

pub fn lookup_ips_batch(
    catalog: &Arc<Catalog>,
    ip_strs: &[&str],
) -> Result<Vec<LookupResult>, RangeError> {
    let ips: Vec<IpValue> = ip_strs
        .iter()
        .map(|s| parse_ip(s))
        .collect::<Result<Vec<_>, _>>()?;

    // one snapshot for the whole batch
    let table = catalog.table();

    let results: Vec<LookupResult> = ips
        .par_iter()
        .zip(ip_strs.par_iter())
        .map(|(ip, query)| {
            let range = table.find_value(*ip).map(MatchedRange::from_entry);
            LookupResult {
                found: range.is_some(),
                query: (*query).to_owned(),
                range,
            }
        })
        .collect();

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Metadata;
    use crate::ip::table::TableBuilder;

    fn test_catalog() -> Arc<Catalog> {
        let mut builder = TableBuilder::new();
        builder
            .add_range("10.0.0.0", "10.0.0.255", "Example DC", "http://example.com/")
            .unwrap();
        let table = builder.build().unwrap();
        let catalog = Catalog::new();
        let meta = Metadata {
            record_count: table.len() as u64,
            ..Default::default()
        };
        catalog.install(table, meta);
        catalog
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let catalog = test_catalog();

        let result = lookup_ip(&catalog, "10.0.0.42").unwrap();
        assert!(result.found);
        assert_eq!(result.query, "10.0.0.42");
        let range = result.range.unwrap();
        assert_eq!(range.name, "Example DC");
        assert_eq!(range.start, "10.0.0.0");
        assert_eq!(range.end, "10.0.0.255");

        let result = lookup_ip(&catalog, "10.0.1.1").unwrap();
        assert!(!result.found);
        assert!(result.range.is_none());
    }

    #[test]
    fn test_lookup_malformed_is_an_error() {
        let catalog = test_catalog();
        assert!(lookup_ip(&catalog, "not-an-ip").is_err());
        assert!(lookup_ip(&catalog, "999.999.999.999").is_err());
    }

    #[test]
    fn test_batch_fails_fast_on_malformed() {
        let catalog = test_catalog();
        let result = lookup_ips_batch(&catalog, &["10.0.0.1", "bogus", "10.0.0.2"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_batch_preserves_order() {
        let catalog = test_catalog();
        let results =
            lookup_ips_batch(&catalog, &["10.0.0.1", "192.168.1.1", "10.0.0.200"]).unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].found);
        assert!(!results[1].found);
        assert!(results[2].found);
        assert_eq!(results[1].query, "192.168.1.1");
    }
}
