use clap::{Parser, ValueEnum};

use crate::server::ServerConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "auditzip")]
#[command(version)]
#[command(
    about = "Upload an audit log, download its CSV files as a ZIP archive",
    long_about = None
)]
#[command(after_help = "Examples:\n  \
  auditzip                          serve on localhost:8080\n  \
  PORT=9000 auditzip --host 0.0.0.0 serve on all interfaces, port 9000\n  \
  auditzip --mode placeholder       answer uploads with a fixed text file")]
pub struct Cli {
    /// Address to listen on
    #[arg(long, env = "HOST", default_value = "localhost")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Which upload endpoint to serve
    #[arg(long, env = "APP_MODE", value_enum, default_value_t = Mode::Archive)]
    pub mode: Mode,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Reject uploads larger than this (default: unlimited)
    #[arg(long, env = "MAX_UPLOAD_BYTES", value_name = "BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Cloud project used to correlate request logs with traces
    #[arg(long, env = "GOOGLE_CLOUD_PROJECT", value_name = "PROJECT")]
    pub project: Option<String>,
}

/// HTTP surface served by the process.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Parse uploads and return the CSV outputs as `files.zip`
    #[default]
    Archive,
    /// Accept uploads and return a fixed `file.txt`
    Placeholder,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line, for log collectors
    Json,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            mode: self.mode,
            max_upload_bytes: self.max_upload_bytes,
            project: self.project.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "auditzip",
            "--host",
            "0.0.0.0",
            "-p",
            "9000",
            "--mode",
            "placeholder",
            "--log-format",
            "json",
            "--max-upload-bytes",
            "1024",
            "--project",
            "audit-prod",
        ])
        .unwrap();

        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, 9000);
        assert_eq!(cli.log_format, LogFormat::Json);

        let config = cli.server_config();
        assert_eq!(config.mode, Mode::Placeholder);
        assert_eq!(config.max_upload_bytes, Some(1024));
        assert_eq!(config.project.as_deref(), Some("audit-prod"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(Cli::try_parse_from(["auditzip", "--mode", "tarball"]).is_err());
    }
}
