mod matcher;
mod table;

pub use matcher::{lookup_ip, lookup_ips_batch, LookupResult, MatchedRange};
pub use table::{
    ip_to_value, parse_ip, value_to_ip, IpValue, ProviderSize, RangeEntry, RangeError, RangeTable,
    RawRecord, TableBuilder,
};
