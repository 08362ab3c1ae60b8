use std::fs::File;
use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ipcatd::ip::TableBuilder;
use ipcatd::sync::importer::{export_csv, export_stats, parse_csv};
use ipcatd::sync::providers::{
    update_aws, update_azure, update_cloudflare, update_google, update_tor,
};

/// Offline maintenance for the datacenter CSV: lookups, provider range
/// refreshes, and manual additions.
#[derive(Parser, Debug)]
#[command(name = "ipcat", version, about)]
struct Cli {
    /// Look up an IP address and exit
    #[arg(short = 'l', long, value_name = "IP")]
    lookup: Option<String>,

    /// Refresh Amazon AWS (EC2) records
    #[arg(long)]
    aws: bool,

    /// Refresh Microsoft Azure records
    #[arg(long)]
    azure: bool,

    /// Refresh Cloudflare records
    #[arg(long)]
    cloudflare: bool,

    /// Refresh Google Cloud records
    #[arg(long)]
    google: bool,

    /// Refresh Tor exit node records
    #[arg(long)]
    tor: bool,

    /// Add one range to the data file
    #[arg(long = "add-cidr", value_name = "CIDR,NAME,URL")]
    add_cidr: Option<String>,

    /// Read/write this data file
    #[arg(long, default_value = "datacenters.csv")]
    csvfile: PathBuf,

    /// Write per-provider statistics to this file
    #[arg(long)]
    statsfile: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ipcatd=info".parse()?))
        .init();

    let cli = Cli::parse();

    let content = std::fs::read_to_string(&cli.csvfile)
        .map_err(|e| format!("Unable to read {}: {}", cli.csvfile.display(), e))?;
    let records = parse_csv(&content)?;

    let mut builder = TableBuilder::with_capacity(records.len());
    for record in &records {
        builder.add_record(record)?;
    }
    info!("Loaded {} entries", builder.len());

    if let Some(ip) = cli.lookup.as_deref() {
        let table = builder.build()?;
        match table.find(ip)? {
            Some(entry) => {
                println!(
                    "[{}:{}] {} {}",
                    entry.start_ip(),
                    entry.end_ip(),
                    entry.name,
                    entry.url
                );
                return Ok(());
            }
            None => {
                eprintln!("Not found: {ip}");
                std::process::exit(1);
            }
        }
    }

    if cli.aws {
        let added = update_aws(&mut builder).await?;
        info!("AWS records refreshed: {}", added);
    }

    if cli.azure {
        let added = update_azure(&mut builder).await?;
        info!("Azure records refreshed: {}", added);
    }

    if cli.cloudflare {
        let added = update_cloudflare(&mut builder).await?;
        info!("Cloudflare records refreshed: {}", added);
    }

    if cli.google {
        let added = update_google(&mut builder).await?;
        info!("Google Cloud records refreshed: {}", added);
    }

    if cli.tor {
        let added = update_tor(&mut builder).await?;
        info!("Tor records refreshed: {}", added);
    }

    if let Some(entry) = cli.add_cidr.as_deref() {
        let parts: Vec<&str> = entry.split(',').collect();
        if parts.len() != 3 {
            return Err("range must be in format: CIDR,name,url".into());
        }
        builder.add_cidr(parts[0], parts[1], parts[2])?;
        info!("Range added successfully");
    }

    let table = builder.build()?;

    if let Some(statsfile) = &cli.statsfile {
        let out = File::create(statsfile)
            .map_err(|e| format!("Unable to write {}: {}", statsfile.display(), e))?;
        export_stats(&table, out)?;
        info!("Statistics written to {}", statsfile.display());
    }

    let out = File::create(&cli.csvfile)
        .map_err(|e| format!("Unable to write {}: {}", cli.csvfile.display(), e))?;
    export_csv(&table, out)?;
    info!("Wrote {} entries to {}", table.len(), cli.csvfile.display());

    Ok(())
}
