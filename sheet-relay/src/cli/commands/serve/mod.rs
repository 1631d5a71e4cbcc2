pub mod handler;

use clap::Args;
use std::path::PathBuf;

use crate::config::Config;
use crate::services::relay::DispatchMode;

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Spreadsheet to write into
    #[arg(long)]
    pub spreadsheet_id: Option<String>,

    /// HTML file to serve instead of the built-in form
    #[arg(long)]
    pub form_template: Option<PathBuf>,

    /// Send each submission as a single batch write
    #[arg(long)]
    pub batch: bool,
}

impl ServeArgs {
    /// Command-line flags win over file and environment settings
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(id) = &self.spreadsheet_id {
            config.sheets.spreadsheet_id = Some(id.clone());
        }
        if let Some(path) = &self.form_template {
            config.server.form_template = Some(path.clone());
        }
        if self.batch {
            config.sheets.dispatch = DispatchMode::Batch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let mut config = Config::default();
        config.sheets.spreadsheet_id = Some("from-file".to_string());

        let args = ServeArgs {
            port: Some(4000),
            host: None,
            spreadsheet_id: Some("from-flag".to_string()),
            form_template: None,
            batch: false,
        };
        args.apply(&mut config);

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.sheets.spreadsheet_id.as_deref(), Some("from-flag"));
        assert_eq!(config.sheets.dispatch, DispatchMode::Individual);
    }
}
