//! Statistics formatting for execution results and storage sizes

use crate::executor::{ExecutionResult, ResultKind};

const BYTE_UNITS: [&str; 9] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Statistics formatter for query execution
pub struct StatsFormatter {
    /// Show execution time
    show_time: bool,
}

impl StatsFormatter {
    pub fn new(show_time: bool) -> Self {
        Self { show_time }
    }

    /// One-line summary such as `3 document(s) returned in 12ms`
    pub fn format(&self, result: &ExecutionResult) -> String {
        let returned = result.stats.documents_returned;
        let mut line = match result.kind {
            ResultKind::Count => format!("{} computed", result.operation),
            ResultKind::Values => format!("{} value(s) returned", returned),
            _ => format!("{} document(s) returned", returned),
        };

        if self.show_time {
            line.push_str(&format!(" in {}ms", result.stats.execution_time_ms));
        }
        line
    }
}

/// Human-readable size in 1024-based units with at most two decimals,
/// e.g. `1.5 KB`
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, BYTE_UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::BaseOperation;
    use mongodb::bson::Bson;

    #[test]
    fn test_stats_formatter() {
        let result = ExecutionResult::new(
            BaseOperation::Find,
            ResultKind::Documents,
            vec![Bson::Int32(1), Bson::Int32(2)],
            150,
        );
        assert_eq!(
            StatsFormatter::new(true).format(&result),
            "2 document(s) returned in 150ms"
        );
        assert_eq!(
            StatsFormatter::new(false).format(&result),
            "2 document(s) returned"
        );
    }

    #[test]
    fn test_stats_for_count() {
        let result = ExecutionResult::new(
            BaseOperation::CountDocuments,
            ResultKind::Count,
            vec![Bson::Int64(42)],
            3,
        );
        assert_eq!(
            StatsFormatter::new(true).format(&result),
            "countDocuments computed in 3ms"
        );
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(10 * 1024), "10 KB");
        assert_eq!(format_bytes(1_234_567), "1.18 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5 GB");
        assert_eq!(format_bytes(u64::MAX), "16 EB");
    }
}
