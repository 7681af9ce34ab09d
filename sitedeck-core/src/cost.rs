//! Fee estimation.
//!
//! A publish pays two tokens: WAL for storage (encoded size × epochs, plus a
//! one-off write fee) and SUI for the transactions that register every
//! resource on the site object. Figures are estimates; the detailed variant
//! reports a min/max band around the point estimate.

use std::fmt;

use serde::Serialize;

use crate::types::Network;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Erasure coding expands stored data roughly five-fold.
const ENCODING_FACTOR: f64 = 5.0;

/// Per-resource metadata stored alongside each file.
const PER_FILE_OVERHEAD_BYTES: u64 = 64 * 1024;

const RANGE_LOW: f64 = 0.8;
const RANGE_HIGH: f64 = 1.5;

/// Values below this render as `"< 0.0001"`.
pub const DISPLAY_THRESHOLD: f64 = 0.0001;

struct Pricing {
    /// WAL per encoded MiB per epoch.
    storage_per_mib_epoch: f64,
    /// WAL per encoded MiB, paid once per write.
    write_per_mib: f64,
    /// SUI for the site object transaction.
    base_gas: f64,
    /// SUI per registered resource.
    gas_per_file: f64,
    /// SUI for a metadata-only transaction (update without new data, destroy).
    metadata_tx: f64,
}

fn pricing(network: Network) -> Pricing {
    match network {
        Network::Mainnet => Pricing {
            storage_per_mib_epoch: 0.000_11,
            write_per_mib: 0.000_02,
            base_gas: 0.005,
            gas_per_file: 0.000_6,
            metadata_tx: 0.002,
        },
        Network::Testnet => Pricing {
            storage_per_mib_epoch: 0.000_01,
            write_per_mib: 0.000_002,
            base_gas: 0.003,
            gas_per_file: 0.000_4,
            metadata_tx: 0.001,
        },
    }
}

/// A min/max band around a point estimate, in whole tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TokenRange {
    pub estimate: f64,
    pub min: f64,
    pub max: f64,
}

impl TokenRange {
    fn around(estimate: f64) -> Self {
        Self {
            estimate,
            min: estimate * RANGE_LOW,
            max: estimate * RANGE_HIGH,
        }
    }

    pub fn zero() -> Self {
        Self::around(0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.max == 0.0
    }
}

impl fmt::Display for TokenRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", format_token(self.min), format_token(self.max))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub network: Network,
    pub epochs: u32,
    pub size_bytes: u64,
    pub file_count: u64,
    pub encoded_bytes: u64,
    pub wal: TokenRange,
    pub sui: TokenRange,
    /// No storage is purchased; only a metadata transaction is paid.
    pub metadata_only: bool,
}

impl CostBreakdown {
    /// One-line summary using the point estimates.
    pub fn summary(&self) -> String {
        if self.metadata_only {
            return format!("~{} SUI (metadata only)", format_token(self.sui.estimate));
        }
        format!(
            "~{} WAL + ~{} SUI ({} epochs on {})",
            format_token(self.wal.estimate),
            format_token(self.sui.estimate),
            self.epochs,
            self.network
        )
    }
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "network:   {}", self.network)?;
        writeln!(f, "epochs:    {}", self.epochs)?;
        writeln!(
            f,
            "size:      {} ({} files, ~{} encoded)",
            format_bytes(self.size_bytes),
            self.file_count,
            format_bytes(self.encoded_bytes)
        )?;
        if !self.metadata_only {
            writeln!(f, "storage:   {} WAL", self.wal)?;
        }
        write!(f, "gas:       {} SUI", self.sui)
    }
}

/// Render a token amount with four decimals, or `"< 0.0001"` for dust.
pub fn format_token(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if value < DISPLAY_THRESHOLD {
        return format!("< {DISPLAY_THRESHOLD}");
    }
    format!("{value:.4}")
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Short human string for a publish of `size_bytes`. `epochs < 1` counts as 1.
pub fn estimate_gas_fee_with_epochs(network: Network, size_bytes: u64, epochs: u32) -> String {
    estimate_detailed(network, size_bytes, 1, epochs).summary()
}

/// Full estimate for publishing `file_count` files totalling `size_bytes`.
pub fn estimate_detailed(
    network: Network,
    size_bytes: u64,
    file_count: u64,
    epochs: u32,
) -> CostBreakdown {
    let epochs = epochs.max(1);
    let p = pricing(network);
    let encoded_bytes = encoded_size(size_bytes, file_count);
    let encoded_mib = encoded_bytes as f64 / BYTES_PER_MIB;

    let wal = encoded_mib * p.storage_per_mib_epoch * f64::from(epochs) + encoded_mib * p.write_per_mib;
    let sui = p.base_gas + p.gas_per_file * file_count as f64;

    CostBreakdown {
        network,
        epochs,
        size_bytes,
        file_count,
        encoded_bytes,
        wal: TokenRange::around(wal),
        sui: TokenRange::around(sui),
        metadata_only: false,
    }
}

/// Estimate for updating an existing site where `changed_bytes` across
/// `new_files` resources must be written. Nothing changed means a
/// metadata-only transaction.
pub fn estimate_update_cost(
    network: Network,
    changed_bytes: u64,
    new_files: u64,
    epochs: u32,
) -> CostBreakdown {
    if changed_bytes == 0 && new_files == 0 {
        return metadata_only(network, epochs.max(1));
    }
    estimate_detailed(network, changed_bytes, new_files, epochs)
}

/// Destroying a site object only pays the transaction fee.
pub fn estimate_destroy_cost(network: Network) -> CostBreakdown {
    metadata_only(network, 0)
}

fn metadata_only(network: Network, epochs: u32) -> CostBreakdown {
    CostBreakdown {
        network,
        epochs,
        size_bytes: 0,
        file_count: 0,
        encoded_bytes: 0,
        wal: TokenRange::zero(),
        sui: TokenRange::around(pricing(network).metadata_tx),
        metadata_only: true,
    }
}

fn encoded_size(size_bytes: u64, file_count: u64) -> u64 {
    let data = (size_bytes as f64 * ENCODING_FACTOR) as u64;
    data.saturating_add(file_count.saturating_mul(PER_FILE_OVERHEAD_BYTES))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn summary_never_empty(
        #[values(Network::Testnet, Network::Mainnet)] network: Network,
        #[values(1, 2, 53, 1000)] epochs: u32,
        #[values(0, 1, 4096, 250 * 1024 * 1024)] size: u64,
    ) {
        let s = estimate_gas_fee_with_epochs(network, size, epochs);
        assert!(!s.is_empty());
        assert!(s.contains("SUI"));
    }

    #[test]
    fn epochs_below_one_clamp_to_one() {
        let zero = estimate_detailed(Network::Mainnet, 10_000_000, 3, 0);
        let one = estimate_detailed(Network::Mainnet, 10_000_000, 3, 1);
        assert_eq!(zero, one);
        assert_eq!(zero.epochs, 1);
    }

    #[test]
    fn more_epochs_cost_more_storage() {
        let short = estimate_detailed(Network::Mainnet, 50_000_000, 10, 1);
        let long = estimate_detailed(Network::Mainnet, 50_000_000, 10, 10);
        assert!(long.wal.estimate > short.wal.estimate);
        assert_eq!(long.sui, short.sui);
    }

    #[test]
    fn range_brackets_estimate() {
        let b = estimate_detailed(Network::Testnet, 1_000_000, 20, 5);
        assert!(b.wal.min <= b.wal.estimate && b.wal.estimate <= b.wal.max);
        assert!(b.sui.min <= b.sui.estimate && b.sui.estimate <= b.sui.max);
    }

    #[test]
    fn dust_renders_as_threshold() {
        assert_eq!(format_token(0.000_01), "< 0.0001");
        assert_eq!(format_token(0.0), "0");
        assert_eq!(format_token(0.123_456), "0.1235");
    }

    #[test]
    fn unchanged_update_is_metadata_only() {
        let b = estimate_update_cost(Network::Mainnet, 0, 0, 5);
        assert!(b.metadata_only);
        assert!(b.wal.is_zero());
        assert!(b.sui.estimate > 0.0);
        assert!(b.summary().contains("metadata only"));
        assert!(!b.to_string().contains("WAL"));
    }

    #[test]
    fn changed_update_buys_storage() {
        let b = estimate_update_cost(Network::Mainnet, 2_000_000, 2, 5);
        assert!(!b.metadata_only);
        assert!(b.wal.estimate > 0.0);
    }

    #[test]
    fn destroy_pays_only_gas() {
        let b = estimate_destroy_cost(Network::Testnet);
        assert!(b.metadata_only);
        assert!(b.wal.is_zero());
    }

    #[test]
    fn bytes_render_in_binary_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
