//! Station list and link SNR configuration files.
//!
//! ```toml
//! [medium]
//! snr = 15.0
//!
//! [[stations]]
//! addr = "02:00:00:00:00:01"
//!
//! [[stations]]
//! addr = "02:00:00:00:00:02"
//!
//! [[links]]
//! from = "02:00:00:00:00:01"
//! to = "02:00:00:00:00:02"
//! snr = 20.0
//! ```
//!
//! The `[medium]` table and the `[[links]]` array are optional; the
//! station list is not. Link overrides are directed, so a degraded
//! uplink with a clean downlink is expressible.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{err::ConfigError, ieee80211::MacAddr, medium::DEFAULT_SNR_DB};

#[derive(Debug, Default, Serialize, Deserialize)]
struct MediumSection {
    snr: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StationSection {
    addr: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LinkSection {
    from: String,
    to: String,
    snr: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawConfig {
    medium: Option<MediumSection>,
    stations: Vec<StationSection>,
    links: Option<Vec<LinkSection>>,
}

/// A directed link SNR override.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkSnr {
    /// Transmitting station.
    pub from: MacAddr,
    /// Receiving station.
    pub to: MacAddr,
    /// SNR of the link in dB.
    pub snr_db: f64,
}

/// Validated medium configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SNR in dB assumed for links without an override.
    pub snr_db: f64,
    /// The stations on the medium.
    pub stations: Vec<MacAddr>,
    /// Per-link SNR overrides.
    pub links: Vec<LinkSnr>,
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load<P>(path: P) -> Result<Self, ConfigError>
    where
        P: AsRef<Path>,
    {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        if raw.stations.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one station is required".to_string(),
            ));
        }

        let mut stations = Vec::with_capacity(raw.stations.len());
        for section in &raw.stations {
            let addr = parse_addr(&section.addr)?;
            if stations.contains(&addr) {
                return Err(ConfigError::Invalid(format!(
                    "station {} listed twice",
                    addr
                )));
            }
            stations.push(addr);
        }

        let mut links = Vec::new();
        for section in raw.links.unwrap_or_default() {
            let link = LinkSnr {
                from: parse_addr(&section.from)?,
                to: parse_addr(&section.to)?,
                snr_db: section.snr,
            };
            if !stations.contains(&link.from) || !stations.contains(&link.to) {
                return Err(ConfigError::Invalid(format!(
                    "link {} -> {} names an unlisted station",
                    link.from, link.to
                )));
            }
            links.push(link);
        }

        Ok(Config {
            snr_db: raw
                .medium
                .unwrap_or_default()
                .snr
                .unwrap_or(DEFAULT_SNR_DB),
            stations,
            links,
        })
    }

    /// Write a skeleton configuration for `interfaces` stations with
    /// generated locally administered addresses.
    pub fn write_skeleton<P>(path: P, interfaces: usize) -> Result<(), ConfigError>
    where
        P: AsRef<Path>,
    {
        if interfaces < 2 {
            return Err(ConfigError::Invalid(
                "active interfaces must be at least 2".to_string(),
            ));
        }
        let raw = RawConfig {
            medium: Some(MediumSection {
                snr: Some(DEFAULT_SNR_DB),
            }),
            stations: (0..interfaces)
                .map(|i| StationSection {
                    addr: generated_addr(i).to_string(),
                })
                .collect(),
            links: None,
        };
        fs::write(path, toml::to_string_pretty(&raw)?)?;
        Ok(())
    }
}

/// The address `mac80211_hwsim` assigns to its `i`-th radio.
fn generated_addr(i: usize) -> MacAddr {
    MacAddr::new([0x02, 0x00, 0x00, 0x00, i as u8, 0x00])
}

fn parse_addr(s: &str) -> Result<MacAddr, ConfigError> {
    s.parse()
        .map_err(|e| ConfigError::Invalid(format!("{}", e)))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let cfg = Config::parse(
            r#"
            [medium]
            snr = 30.0

            [[stations]]
            addr = "02:00:00:00:00:01"

            [[stations]]
            addr = "02:00:00:00:00:02"

            [[links]]
            from = "02:00:00:00:00:01"
            to = "02:00:00:00:00:02"
            snr = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.snr_db, 30.0);
        assert_eq!(cfg.stations.len(), 2);
        assert_eq!(cfg.links.len(), 1);
        assert_eq!(cfg.links[0].snr_db, 5.0);
    }

    #[test]
    fn test_defaults_apply() {
        let cfg = Config::parse(
            r#"
            [[stations]]
            addr = "02:00:00:00:00:01"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.snr_db, DEFAULT_SNR_DB);
        assert!(cfg.links.is_empty());
    }

    #[test]
    fn test_empty_station_list_rejected() {
        assert!(Config::parse("stations = []").is_err());
    }

    #[test]
    fn test_duplicate_station_rejected() {
        let err = Config::parse(
            r#"
            [[stations]]
            addr = "02:00:00:00:00:01"

            [[stations]]
            addr = "02:00:00:00:00:01"
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_link_to_unknown_station_rejected() {
        let err = Config::parse(
            r#"
            [[stations]]
            addr = "02:00:00:00:00:01"

            [[links]]
            from = "02:00:00:00:00:01"
            to = "02:00:00:00:00:99"
            snr = 10.0
            "#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_bad_mac_rejected() {
        let err = Config::parse(
            r#"
            [[stations]]
            addr = "not-a-mac"
            "#,
        );
        assert!(err.is_err());
    }
}
