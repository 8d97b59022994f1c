use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed header row of the CSV log. Readers depend on this column order.
pub const HEADER: &str = "Agent,Time,Method,Resource,Version,Status";

/// Number of columns in every row.
pub const COLUMNS: usize = 6;

const FIELD_SEPARATOR: char = ',';

/// One logged request.
///
/// Serializes to the JSON shape served by `GET /logs`:
/// `{"Agent", "Time", "Method", "Resource", "Version", "Status"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    pub agent: String,
    pub time: String,
    pub method: String,
    pub resource: String,
    pub version: String,
    pub status: u16,
}

/// Why a stored row could not be turned back into a [`LogEntry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("expected 6 columns, found {0}")]
    ColumnCount(usize),

    #[error("invalid status code {0:?}")]
    Status(String),
}

impl LogEntry {
    pub fn new(
        agent: impl Into<String>,
        time: DateTime<Utc>,
        method: impl Into<String>,
        resource: impl Into<String>,
        version: impl Into<String>,
        status: u16,
    ) -> Self {
        Self {
            agent: agent.into(),
            time: format_time(time),
            method: method.into(),
            resource: resource.into(),
            version: version.into(),
            status,
        }
    }

    /// Serialize as one CSV row, without the trailing newline.
    ///
    /// Separator and line-break characters inside string fields are replaced
    /// with a space so the row always has exactly six columns.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            sanitize_field(&self.agent),
            sanitize_field(&self.time),
            sanitize_field(&self.method),
            sanitize_field(&self.resource),
            sanitize_field(&self.version),
            self.status,
        )
    }

    /// Parse one CSV row produced by [`LogEntry::to_row`].
    pub fn from_row(row: &str) -> Result<Self, RowError> {
        let cols: Vec<&str> = row.split(FIELD_SEPARATOR).collect();
        if cols.len() != COLUMNS {
            return Err(RowError::ColumnCount(cols.len()));
        }
        let status = cols[5]
            .trim()
            .parse::<u16>()
            .map_err(|_| RowError::Status(cols[5].to_string()))?;
        Ok(Self {
            agent: cols[0].to_string(),
            time: cols[1].to_string(),
            method: cols[2].to_string(),
            resource: cols[3].to_string(),
            version: cols[4].to_string(),
            status,
        })
    }
}

/// Replace `,`, `\r` and `\n` with a space. Lossy but deterministic.
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            FIELD_SEPARATOR | '\r' | '\n' => ' ',
            other => other,
        })
        .collect()
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
pub fn format_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> LogEntry {
        let t = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        LogEntry::new("curl/8.0", t, "GET", "/logs", "HTTP/1.1", 200)
    }

    #[test]
    fn header_has_six_columns() {
        assert_eq!(HEADER.split(',').count(), COLUMNS);
    }

    #[test]
    fn time_is_iso8601_millis_utc() {
        assert_eq!(sample().time, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn row_layout_matches_header() {
        assert_eq!(
            sample().to_row(),
            "curl/8.0,2024-05-01T12:00:00.000Z,GET,/logs,HTTP/1.1,200"
        );
    }

    #[test]
    fn separators_in_agent_become_spaces() {
        let mut e = sample();
        e.agent = "Mozilla/5.0 (X11, Linux)".into();
        let row = e.to_row();
        assert!(row.starts_with("Mozilla/5.0 (X11  Linux),"));
        let back = LogEntry::from_row(&row).unwrap();
        assert_eq!(back.agent, "Mozilla/5.0 (X11  Linux)");
        assert_eq!(back.status, 200);
    }

    #[test]
    fn newlines_in_resource_become_spaces() {
        let mut e = sample();
        e.resource = "/a\r\nb,c".into();
        assert_eq!(LogEntry::from_row(&e.to_row()).unwrap().resource, "/a  b c");
    }

    #[test]
    fn wrong_column_count_is_rejected() {
        assert_eq!(
            LogEntry::from_row("a,b,c"),
            Err(RowError::ColumnCount(3))
        );
    }

    #[test]
    fn non_numeric_status_is_rejected() {
        let err = LogEntry::from_row("a,t,GET,/,HTTP/1.1,abc").unwrap_err();
        assert_eq!(err, RowError::Status("abc".into()));
    }

    #[test]
    fn row_error_messages() {
        assert_eq!(
            RowError::ColumnCount(3).to_string(),
            "expected 6 columns, found 3"
        );
        assert_eq!(
            RowError::Status("abc".into()).to_string(),
            "invalid status code \"abc\""
        );
    }

    #[test]
    fn json_uses_pascal_case_keys() {
        let v = serde_json::to_value(sample()).unwrap();
        assert_eq!(v["Agent"], "curl/8.0");
        assert_eq!(v["Resource"], "/logs");
        assert_eq!(v["Status"], 200);
    }
}
