use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use lineport_proto::TransferReport;
use lineport_transport::{PortSpec, SerialConfig};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Which side of the session produced a report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Send,
    Receive,
}

#[derive(Serialize)]
struct ReportOutput<'a> {
    role: Role,
    file_name: &'a str,
    total_lines: usize,
    total_bytes: usize,
    framing: String,
    port: String,
    line: String,
    elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<String>,
}

impl<'a> ReportOutput<'a> {
    fn new(role: Role, report: &'a TransferReport, port: &PortSpec, line: &SerialConfig) -> Self {
        Self {
            role,
            file_name: &report.file_name,
            total_lines: report.total_lines,
            total_bytes: report.total_bytes,
            framing: report.framing.to_string(),
            port: port.to_string(),
            line: line.to_string(),
            elapsed_ms: report.elapsed.as_millis() as u64,
            destination: report
                .destination
                .as_ref()
                .map(|path| path.display().to_string()),
        }
    }
}

pub fn print_report(
    role: Role,
    report: &TransferReport,
    port: &PortSpec,
    line: &SerialConfig,
    format: OutputFormat,
) {
    println!("{}", render_report(role, report, port, line, format));
}

fn render_report(
    role: Role,
    report: &TransferReport,
    port: &PortSpec,
    line: &SerialConfig,
    format: OutputFormat,
) -> String {
    let out = ReportOutput::new(role, report, port, line);
    match format {
        OutputFormat::Json => serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string()),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FILE", "LINES", "BYTES", "FRAMING", "PORT", "ELAPSED"])
                .add_row(vec![
                    out.file_name.to_string(),
                    out.total_lines.to_string(),
                    out.total_bytes.to_string(),
                    out.framing.clone(),
                    format!("{} ({})", out.port, out.line),
                    format!("{} ms", out.elapsed_ms),
                ]);
            if let Some(dest) = &out.destination {
                table.add_row(vec!["written to".to_string(), dest.clone()]);
            }
            table.to_string()
        }
        OutputFormat::Pretty => {
            let verb = match role {
                Role::Send => "sent",
                Role::Receive => "received",
            };
            let mut text = format!(
                "{verb} {} ({} lines, {} bytes) via {} [{}, {}] in {} ms",
                out.file_name,
                out.total_lines,
                out.total_bytes,
                out.port,
                out.line,
                out.framing,
                out.elapsed_ms
            );
            if let Some(dest) = &out.destination {
                text.push_str(&format!(" -> {dest}"));
            }
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use lineport_proto::Framing;

    use super::*;

    fn report() -> TransferReport {
        TransferReport {
            file_name: "santa.txt".to_string(),
            total_lines: 3,
            total_bytes: 13,
            framing: Framing::Raw,
            elapsed: Duration::from_millis(42),
            destination: Some(PathBuf::from("/tmp/out/santa.txt")),
        }
    }

    #[test]
    fn json_report_is_one_object() {
        let port: PortSpec = "/dev/ttyS1".parse().unwrap();
        let text = render_report(
            Role::Receive,
            &report(),
            &port,
            &SerialConfig::default(),
            OutputFormat::Json,
        );
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["role"], "receive");
        assert_eq!(value["total_lines"], 3);
        assert_eq!(value["total_bytes"], 13);
        assert_eq!(value["framing"], "raw");
        assert_eq!(value["line"], "9600 8N1");
        assert_eq!(value["destination"], "/tmp/out/santa.txt");
    }

    #[test]
    fn sender_json_omits_destination() {
        let mut report = report();
        report.destination = None;
        let port: PortSpec = "unix:/tmp/link.sock".parse().unwrap();
        let text = render_report(
            Role::Send,
            &report,
            &port,
            &SerialConfig::default(),
            OutputFormat::Json,
        );
        assert!(!text.contains("destination"));
        assert!(text.contains("\"port\":\"unix:/tmp/link.sock\""));
    }

    #[test]
    fn pretty_report_reads_as_sentence() {
        let port: PortSpec = "/dev/ttyS1".parse().unwrap();
        let text = render_report(
            Role::Send,
            &report(),
            &port,
            &SerialConfig::default(),
            OutputFormat::Pretty,
        );
        assert!(text.starts_with("sent santa.txt (3 lines, 13 bytes)"));
    }
}
