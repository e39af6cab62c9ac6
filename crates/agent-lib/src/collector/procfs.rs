//! Linux procfs sample source
//!
//! Reads:
//! - meminfo for memory, swap and kernel counters (kB values)
//! - vmstat for cumulative page-fault counters

use super::SampleSource;
use crate::error::CollectorError;
use crate::models::MemorySample;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

const MEMINFO: &str = "meminfo";
const VMSTAT: &str = "vmstat";

/// Sample source backed by `/proc/meminfo` and `/proc/vmstat`
pub struct ProcfsSource {
    proc_root: PathBuf,
}

impl ProcfsSource {
    /// Create a source reading from the given proc mount (normally `/proc`)
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    pub fn proc_root(&self) -> &Path {
        &self.proc_root
    }

    async fn read(&self, name: &str) -> Result<String, CollectorError> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path)
            .await
            .map_err(|source| CollectorError::Io { path, source })
    }
}

impl Default for ProcfsSource {
    fn default() -> Self {
        Self::new("/proc")
    }
}

#[async_trait]
impl SampleSource for ProcfsSource {
    async fn sample(&self) -> Result<MemorySample> {
        let meminfo = self.read(MEMINFO).await?;
        let vmstat = self.read(VMSTAT).await?;

        Ok(sample_from_procfs(
            &parse_kv_stats(&meminfo),
            &parse_kv_stats(&vmstat),
        )?)
    }
}

/// Parse `key value [unit]` lines (meminfo and vmstat formats).
///
/// A trailing colon on the key is stripped and values with a `kB` unit are
/// converted to bytes. Unparseable lines are skipped.
pub fn parse_kv_stats(content: &str) -> HashMap<String, u64> {
    let mut stats = HashMap::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let key = parts[0].trim_end_matches(':');
        let Ok(value) = parts[1].parse::<u64>() else {
            continue;
        };

        let value = match parts.get(2) {
            Some(unit) if unit.eq_ignore_ascii_case("kb") => value.saturating_mul(1024),
            _ => value,
        };

        stats.insert(key.to_string(), value);
    }

    stats
}

/// Build a sample from parsed meminfo and vmstat tables.
///
/// `MemTotal` is required. Without `MemAvailable` (kernels before 3.14) the
/// available figure is approximated as free + buffers + cached.
pub fn sample_from_procfs(
    meminfo: &HashMap<String, u64>,
    vmstat: &HashMap<String, u64>,
) -> Result<MemorySample, CollectorError> {
    let field = |name: &str| meminfo.get(name).copied().unwrap_or(0);

    let total_bytes = meminfo
        .get("MemTotal")
        .copied()
        .ok_or(CollectorError::MissingField {
            file: MEMINFO,
            field: "MemTotal",
        })?;

    let free_bytes = field("MemFree");
    let buffers_bytes = field("Buffers");
    let cached_bytes = field("Cached");

    let available_bytes = meminfo.get("MemAvailable").copied().unwrap_or_else(|| {
        free_bytes
            .saturating_add(buffers_bytes)
            .saturating_add(cached_bytes)
            .min(total_bytes)
    });

    let major_faults = vmstat.get("pgmajfault").copied().unwrap_or(0);
    let all_faults = vmstat.get("pgfault").copied().unwrap_or(0);

    Ok(MemorySample {
        total_bytes,
        free_bytes,
        available_bytes,
        buffers_bytes,
        cached_bytes,
        swap_total_bytes: field("SwapTotal"),
        swap_free_bytes: field("SwapFree"),
        swap_cached_bytes: field("SwapCached"),
        active_bytes: field("Active"),
        inactive_bytes: field("Inactive"),
        dirty_bytes: field("Dirty"),
        mapped_bytes: field("Mapped"),
        anon_pages_bytes: field("AnonPages"),
        active_anon_bytes: field("Active(anon)"),
        inactive_anon_bytes: field("Inactive(anon)"),
        active_file_bytes: field("Active(file)"),
        inactive_file_bytes: field("Inactive(file)"),
        slab_bytes: field("Slab"),
        kernel_stack_bytes: field("KernelStack"),
        page_tables_bytes: field("PageTables"),
        vmalloc_used_bytes: field("VmallocUsed"),
        committed_bytes: field("Committed_AS"),
        major_faults,
        // pgfault counts every fault, major ones included
        minor_faults: all_faults.saturating_sub(major_faults),
    })
}
