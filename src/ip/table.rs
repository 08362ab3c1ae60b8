use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnetwork::IpNetwork;
use serde::{Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RangeError {
    #[error("Invalid IP address: {0}")]
    MalformedAddress(String),
    #[error("Invalid CIDR notation: {0}")]
    MalformedCidr(String),
    #[error("Range start {0} is above its end {1}")]
    ReversedRange(String, String),
    #[error("Overlapping ranges: {0} and {1}")]
    OverlappingRanges(String, String),
}

/// Canonical numeric form of an address. IPv4 maps through its
/// IPv6-mapped form so both families share one total order.
pub type IpValue = u128;

pub fn ip_to_value(addr: IpAddr) -> IpValue {
    match addr {
        IpAddr::V4(v4) => u128::from(v4.to_ipv6_mapped()),
        IpAddr::V6(v6) => u128::from(v6),
    }
}

pub fn value_to_ip(value: IpValue) -> IpAddr {
    let v6 = Ipv6Addr::from(value);
    match v6.to_ipv4_mapped() {
        Some(v4) => IpAddr::V4(v4),
        None => IpAddr::V6(v6),
    }
}

pub fn parse_ip(text: &str) -> Result<IpValue, RangeError> {
    let addr: IpAddr = text
        .trim()
        .parse()
        .map_err(|_| RangeError::MalformedAddress(text.to_owned()))?;
    Ok(ip_to_value(addr))
}

/// One textual record as read from the data source. `url` may be empty.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub start: String,
    pub end: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeEntry {
    pub start: IpValue,
    pub end: IpValue,
    pub name: String,
    pub url: String,
}

impl RangeEntry {
    pub fn contains(&self, ip: IpValue) -> bool {
        self.start <= ip && ip <= self.end
    }

    /// Number of addresses in the closed interval.
    pub fn size(&self) -> u128 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn start_ip(&self) -> IpAddr {
        value_to_ip(self.start)
    }

    pub fn end_ip(&self) -> IpAddr {
        value_to_ip(self.end)
    }

    fn display_interval(&self) -> String {
        format!("{}-{}", self.start_ip(), self.end_ip())
    }
}

fn record_to_entry(record: &RawRecord) -> Result<RangeEntry, RangeError> {
    let start = parse_ip(&record.start)?;
    let end = parse_ip(&record.end)?;
    if start > end {
        return Err(RangeError::ReversedRange(
            record.start.clone(),
            record.end.clone(),
        ));
    }
    Ok(RangeEntry {
        start,
        end,
        name: record.name.clone(),
        url: record.url.clone(),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct ProviderSize {
    pub name: String,
    #[serde(serialize_with = "serialize_count")]
    pub total_ips: u128,
}

// wide IPv6 blocks put address counts past JSON's integer range
fn serialize_count<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Immutable table of non-overlapping ranges sorted ascending by start.
#[derive(Debug, Default)]
pub struct RangeTable {
    entries: Vec<RangeEntry>,
}

impl RangeTable {
    /// Builds directly from records assumed to be pre-sorted by start
    /// address and non-overlapping. No sorting or overlap validation is
    /// performed; a caller with an untrusted source must go through
    /// `TableBuilder` instead. A record that fails to parse aborts the
    /// whole build.
    pub fn from_sorted_records<I>(records: I) -> Result<Self, RangeError>
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let records = records.into_iter();
        let mut entries = Vec::with_capacity(records.size_hint().0);
        for record in records {
            entries.push(record_to_entry(&record)?);
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RangeEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    /// Parses the query and looks it up. A malformed address is an error,
    /// never a miss; an address outside every range is `Ok(None)`.
    pub fn find(&self, ip_text: &str) -> Result<Option<&RangeEntry>, RangeError> {
        let ip = parse_ip(ip_text)?;
        Ok(self.find_value(ip))
    }

    /// Binary search over the range intervals: at most ceil(log2(len)) + 1
    /// interval tests. Each probe either contains the query or rules out
    /// the half of the table on the wrong side of it.
    pub fn find_value(&self, ip: IpValue) -> Option<&RangeEntry> {
        let mut low = 0usize;
        let mut high = self.entries.len().checked_sub(1)?;
        while low <= high {
            let probe = (low + high) / 2;
            let entry = &self.entries[probe];
            if entry.start > ip {
                if probe == 0 {
                    // query precedes the whole table
                    break;
                }
                high = probe - 1;
            } else if entry.end < ip {
                low = probe + 1;
            } else {
                return Some(entry);
            }
        }
        None
    }

    /// Providers ordered by the size of their address space, largest
    /// first, ties broken by case-insensitive name.
    pub fn rank_by_size(&self) -> Vec<ProviderSize> {
        let mut counts: HashMap<&str, u128> = HashMap::with_capacity(self.entries.len());
        for entry in &self.entries {
            let count = counts.entry(entry.name.as_str()).or_insert(0);
            *count = count.saturating_add(entry.size());
        }
        let mut rank: Vec<ProviderSize> = counts
            .into_iter()
            .map(|(name, total_ips)| ProviderSize {
                name: name.to_owned(),
                total_ips,
            })
            .collect();
        rank.sort_by(|a, b| {
            b.total_ips
                .cmp(&a.total_ips)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        rank
    }
}

/// Accumulates range records from untrusted sources, then finalizes into a
/// `RangeTable`: sorts by (start, end), rejects overlaps, and coalesces
/// adjacent ranges that share a label.
#[derive(Debug, Default)]
pub struct TableBuilder {
    records: Vec<RangeEntry>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn add_record(&mut self, record: &RawRecord) -> Result<(), RangeError> {
        self.records.push(record_to_entry(record)?);
        Ok(())
    }

    pub fn add_range(
        &mut self,
        start: &str,
        end: &str,
        name: &str,
        url: &str,
    ) -> Result<(), RangeError> {
        self.add_record(&RawRecord {
            start: start.to_owned(),
            end: end.to_owned(),
            name: name.to_owned(),
            url: url.to_owned(),
        })
    }

    pub fn add_cidr(&mut self, cidr: &str, name: &str, url: &str) -> Result<(), RangeError> {
        let network: IpNetwork = cidr
            .trim()
            .parse()
            .map_err(|_| RangeError::MalformedCidr(cidr.to_owned()))?;
        let (start, end) = match network {
            IpNetwork::V4(n) => {
                let base = u32::from(n.network());
                let last = base | !u32::from(n.mask());
                (
                    ip_to_value(IpAddr::V4(Ipv4Addr::from(base))),
                    ip_to_value(IpAddr::V4(Ipv4Addr::from(last))),
                )
            }
            IpNetwork::V6(n) => {
                let base = u128::from(n.network());
                let last = base | !u128::from(n.mask());
                (base, last)
            }
        };
        self.records.push(RangeEntry {
            start,
            end,
            name: name.to_owned(),
            url: url.to_owned(),
        });
        Ok(())
    }

    /// Drops every accumulated record carrying the given label. Provider
    /// updaters use this for replace-by-provider semantics.
    pub fn delete_by_name(&mut self, name: &str) {
        self.records.retain(|record| record.name != name);
    }

    pub fn build(mut self) -> Result<RangeTable, RangeError> {
        self.records.sort_by_key(|record| (record.start, record.end));

        for pair in self.records.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(RangeError::OverlappingRanges(
                    pair[0].display_interval(),
                    pair[1].display_interval(),
                ));
            }
        }

        let mut entries: Vec<RangeEntry> = Vec::with_capacity(self.records.len());
        for record in self.records {
            if let Some(last) = entries.last_mut() {
                if last.name == record.name && last.end.checked_add(1) == Some(record.start) {
                    last.end = record.end;
                    continue;
                }
            }
            entries.push(record);
        }

        Ok(RangeTable { entries })
    }
}
