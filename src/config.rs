use std::path::PathBuf;

use tracing::warn;

pub const REST_PORT: u16 = 7893;
pub const SYNC_HOUR_UTC: u8 = 4;
pub const CSV_URL: &str =
    "https://raw.githubusercontent.com/client9/ipcat/master/datacenters.csv";

#[derive(Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub rest_port: u16,
    pub sync_hour_utc: u8,
    pub csv_url: String,
}

fn parse_port(var: &str, default: u16) -> u16 {
    std::env::var(var)
        .ok()
        .and_then(|s| {
            let port: u16 = s.parse().ok()?;
            if port == 0 {
                warn!("{} cannot be 0, using default {}", var, default);
                None
            } else {
                Some(port)
            }
        })
        .unwrap_or(default)
}

fn parse_sync_hour(default: u8) -> u8 {
    std::env::var("IPCATD_SYNC_HOUR_UTC")
        .ok()
        .and_then(|s| {
            let hour: u8 = s.parse().ok()?;
            if hour > 23 {
                warn!(
                    "IPCATD_SYNC_HOUR_UTC must be 0-23, got {}, using default {}",
                    hour, default
                );
                None
            } else {
                Some(hour)
            }
        })
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(
                std::env::var("IPCATD_DATA_DIR").unwrap_or_else(|_| "/data".to_string()),
            ),
            rest_port: parse_port("IPCATD_REST_PORT", REST_PORT),
            sync_hour_utc: parse_sync_hour(SYNC_HOUR_UTC),
            csv_url: std::env::var("IPCATD_CSV_URL").unwrap_or_else(|_| CSV_URL.to_string()),
        }
    }
}

impl Config {
    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join("datacenters.csv")
    }

    pub fn csv_hash_path(&self) -> PathBuf {
        self.data_dir.join("datacenters.csv.sha256")
    }
}
