use std::io;
use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::db::{Catalog, Metadata};
use crate::ip::{RangeError, RangeTable, RawRecord, TableBuilder};
use crate::sync::downloader::{compute_hash, load_csv, load_hash, save_csv, save_hash};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV parse error: {0}")]
    CsvParse(String),
    #[error("line {line}: expected 4 fields but got {got}")]
    FieldCount { line: u64, got: usize },
    #[error("Range error: {0}")]
    Range(#[from] RangeError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Download error: {0}")]
    Download(#[from] crate::sync::downloader::DownloadError),
}

/// Strict parse of the datacenter CSV: no header row, exactly 4 fields per
/// record (start, end, name, url). A short or long record aborts the whole
/// import with its line number; skipping bad lines is the loader's call to
/// make before the data gets here.
pub fn parse_csv(content: &str) -> Result<Vec<RawRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| ImportError::CsvParse(e.to_string()))?;
        let line = record.position().map_or(0, csv::Position::line);
        if record.len() != 4 {
            return Err(ImportError::FieldCount {
                line,
                got: record.len(),
            });
        }
        records.push(RawRecord {
            start: record[0].to_owned(),
            end: record[1].to_owned(),
            name: record[2].to_owned(),
            url: record[3].to_owned(),
        });
    }

    Ok(records)
}

pub fn build_table(records: &[RawRecord]) -> Result<RangeTable, RangeError> {
    let mut builder = TableBuilder::with_capacity(records.len());
    for record in records {
        builder.add_record(record)?;
    }
    builder.build()
}

fn do_full_import(
    catalog: &Arc<Catalog>,
    records: &[RawRecord],
    hash: &str,
) -> Result<u64, ImportError> {
    let table = build_table(records)?;
    let count = table.len() as u64;

    let metadata = Metadata {
        last_sync: Some(Utc::now().timestamp()),
        csv_hash: Some(hash.to_owned()),
        record_count: count,
    };
    catalog.install(table, metadata);

    Ok(count)
}

pub async fn full_import(
    catalog: &Arc<Catalog>,
    content: &str,
    hash: &str,
    config: &Config,
) -> Result<u64, ImportError> {
    info!("Starting full import");

    let records = parse_csv(content)?;
    let count = do_full_import(catalog, &records, hash)?;

    save_csv(&config.csv_path(), content).await?;
    save_hash(&config.csv_hash_path(), hash).await?;

    info!("Full import complete: {} records", count);
    Ok(count)
}

pub async fn rebuild_from_csv(catalog: &Arc<Catalog>, config: &Config) -> Result<u64, ImportError> {
    info!("Rebuilding catalog from local CSV");

    let csv_path = config.csv_path();
    if !csv_path.exists() {
        return Err(ImportError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Local CSV not found",
        )));
    }

    let content = load_csv(&csv_path).await?;
    let hash = load_hash(&config.csv_hash_path())
        .await
        .unwrap_or_else(|| compute_hash(&content));

    let records = parse_csv(&content)?;
    let count = do_full_import(catalog, &records, &hash)?;

    info!("Catalog rebuilt: {} records", count);
    Ok(count)
}

/// Writes the table back out in the 4-field source format, in table order
/// (sorted, coalesced), with canonical textual addresses.
pub fn export_csv<W: io::Write>(table: &RangeTable, out: W) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_writer(out);
    for entry in table.entries() {
        writer
            .write_record([
                entry.start_ip().to_string(),
                entry.end_ip().to_string(),
                entry.name.clone(),
                entry.url.clone(),
            ])
            .map_err(|e| ImportError::CsvParse(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_stats<W: io::Write>(table: &RangeTable, out: W) -> Result<(), ImportError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["Datacenter Name", "Total IPs"])
        .map_err(|e| ImportError::CsvParse(e.to_string()))?;
    for provider in table.rank_by_size() {
        writer
            .write_record([provider.name, provider.total_ips.to_string()])
            .map_err(|e| ImportError::CsvParse(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}
