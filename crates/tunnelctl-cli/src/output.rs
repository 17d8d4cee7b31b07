//! Structured and tabular output

use std::io::{self, Write};
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use tunnelctl_proto::{summarize_connections, Tunnel, TIME_LAYOUT};

/// Cells are separated by at least this many spaces
const PADDING: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Unknown output format '{0}', use 'json' or 'yaml'")]
    UnknownFormat(String),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => Err(OutputError::UnknownFormat(other.to_string())),
        }
    }
}

/// Serialize `value` in `format` and write it in one piece.
///
/// Nothing is written if serialization fails.
pub fn render<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    out: &mut dyn Write,
) -> Result<(), OutputError> {
    let rendered = match format {
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(value)?;
            json.push('\n');
            json
        }
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    out.write_all(rendered.as_bytes())?;
    Ok(())
}

/// Human-readable tunnel table with an `ID NAME CREATED CONNECTIONS` header
pub fn write_tunnel_table(
    tunnels: &[Tunnel],
    show_recently_disconnected: bool,
    out: &mut dyn Write,
) -> io::Result<()> {
    let mut rows = vec![vec![
        "ID".to_string(),
        "NAME".to_string(),
        "CREATED".to_string(),
        "CONNECTIONS".to_string(),
    ]];
    rows.extend(tunnels.iter().map(|tunnel| {
        vec![
            tunnel.id.to_string(),
            tunnel.name.clone(),
            tunnel.created_at.to_rfc3339_opts(TIME_LAYOUT, true),
            summarize_connections(&tunnel.connections, show_recently_disconnected),
        ]
    }));
    write_aligned(&rows, out)
}

fn write_aligned(rows: &[Vec<String>], out: &mut dyn Write) -> io::Result<()> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|i| {
            rows.iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    for row in rows {
        let mut line = String::new();
        for (i, cell) in row.iter().enumerate() {
            line.push_str(cell);
            if i + 1 < row.len() {
                let fill = widths[i] - cell.chars().count() + PADDING;
                line.extend(std::iter::repeat(' ').take(fill));
            }
        }
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tunnelctl_proto::Connection;
    use uuid::Uuid;

    fn tunnel(name: &str, connections: Vec<Connection>) -> Tunnel {
        Tunnel {
            id: Uuid::parse_str("0b8c7e3a-5d4f-4a3b-9c2d-1e0f2a3b4c5d").unwrap(),
            name: name.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
            deleted_at: None,
            connections,
        }
    }

    #[test]
    fn test_parse_format() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);

        let err = "xml".parse::<OutputFormat>().unwrap_err();
        assert!(matches!(err, OutputError::UnknownFormat(ref f) if f == "xml"));
    }

    #[test]
    fn test_render_json() {
        let mut out = Vec::new();
        render(OutputFormat::Json, &tunnel("web", Vec::new()), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\n  \"name\": \"web\""));

        let parsed: Tunnel = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.name, "web");
    }

    #[test]
    fn test_render_json_value_round_trips() {
        let value = serde_json::json!({"a": 1});
        let mut out = Vec::new();
        render(OutputFormat::Json, &value, &mut out).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, value);
    }

    #[test]
    fn test_render_yaml() {
        let mut out = Vec::new();
        render(OutputFormat::Yaml, &vec![tunnel("web", Vec::new())], &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("name: web"));
    }

    #[test]
    fn test_table_layout() {
        let connections = vec![
            Connection::new("LAX"),
            Connection::new("LAX"),
            Connection::new("JFK"),
        ];
        let mut out = Vec::new();
        write_tunnel_table(&[tunnel("web", connections)], false, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        // The ID column is 36 characters wide plus padding
        assert!(lines[0].starts_with(&format!("{:<37}NAME", "ID")));
        assert_eq!(
            lines[1],
            "0b8c7e3a-5d4f-4a3b-9c2d-1e0f2a3b4c5d web  2024-03-01T12:30:00Z 1xJFK, 2xLAX"
        );
    }

    #[test]
    fn test_empty_table_is_header_only() {
        let mut out = Vec::new();
        write_tunnel_table(&[], false, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ID NAME CREATED CONNECTIONS\n");
    }
}
