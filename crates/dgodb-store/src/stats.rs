//! Ingestion statistics

use std::fmt::Write as _;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MIB: f64 = (1u64 << 20) as f64;

/// Running counters kept by the store while archives are added
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    /// Archives committed to the store
    pub total_archives: u64,
    /// On-disk bytes of those archives, before decompression
    pub total_archive_bytes: u64,
    /// Object occurrences seen, duplicates included
    pub total_objects: u64,
    /// Distinct objects stored
    pub unique_objects: u64,
    /// Bytes held by distinct objects
    pub unique_bytes: u64,
}

impl IngestStats {
    /// Fraction of object occurrences that were duplicates
    pub fn duplicate_ratio(&self) -> f64 {
        if self.total_objects == 0 {
            return 0.0;
        }
        1.0 - self.unique_objects as f64 / self.total_objects as f64
    }

    /// Multi-line human-readable summary
    pub fn render(&self, elapsed: Option<Duration>) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "total archives: {}", self.total_archives);
        let _ = writeln!(out, "total data: {} bytes", self.total_archive_bytes);
        let _ = writeln!(out, "total objs: {}", self.total_objects);
        let _ = writeln!(out, "unique objs: {}", self.unique_objects);
        let _ = writeln!(out, "unique data: {} bytes", self.unique_bytes);
        if let Some(elapsed) = elapsed {
            let secs = elapsed.as_secs_f64().max(f64::EPSILON);
            let _ = writeln!(
                out,
                "total {:.1} ms ({:.3} MB/sec, {:.3} obj/sec)",
                elapsed.as_secs_f64() * 1000.0,
                self.total_archive_bytes as f64 / (MIB * secs),
                self.total_objects as f64 / secs
            );
        }
        out
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_without_timing() {
        let stats = IngestStats {
            total_archives: 2,
            total_archive_bytes: 300,
            total_objects: 4,
            unique_objects: 3,
            unique_bytes: 120,
        };
        assert_eq!(
            stats.render(None),
            "total archives: 2\ntotal data: 300 bytes\ntotal objs: 4\nunique objs: 3\nunique data: 120 bytes\n"
        );
        assert!((stats.duplicate_ratio() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_render_with_timing() {
        let stats = IngestStats::default();
        let text = stats.render(Some(Duration::from_millis(250)));
        assert!(text.ends_with("total 250.0 ms (0.000 MB/sec, 0.000 obj/sec)\n"));
        assert_eq!(stats.duplicate_ratio(), 0.0);
    }

    #[test]
    fn test_json_round_trip() {
        let stats = IngestStats {
            total_archives: 1,
            total_archive_bytes: 10,
            total_objects: 1,
            unique_objects: 1,
            unique_bytes: 2,
        };
        let json = stats.to_json().unwrap();
        assert!(json.contains("\"unique_bytes\": 2"));
        let back: IngestStats = serde_json::from_str(&json).unwrap();
        assert_eq!(back, stats);
    }
}
