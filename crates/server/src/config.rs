//! Command-line and environment configuration.

use clap::Parser;
use ledgerline_store::{CredentialSource, SheetsConfig};
use std::path::PathBuf;
use std::time::Duration;

/// ledgerline-server - HTTP API over the metering ledger spreadsheet
#[derive(Parser, Debug, Clone)]
#[command(name = "ledgerline-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "LEDGERLINE_BIND", default_value = "0.0.0.0:8000")]
    pub bind: String,

    /// Title of the spreadsheet holding every ledger
    #[arg(long, env = "LEDGERLINE_SPREADSHEET", default_value = "Office Data System")]
    pub spreadsheet: String,

    /// Spreadsheet id; skips the lookup by title
    #[arg(long, env = "LEDGERLINE_SPREADSHEET_ID")]
    pub spreadsheet_id: Option<String>,

    /// Credentials file used when GOOGLE_CREDENTIALS_JSON is unset
    #[arg(long, env = "LEDGERLINE_CREDENTIALS_FILE", default_value = "credentials.json")]
    pub credentials_file: PathBuf,

    /// Worksheet holding one row per project
    #[arg(long, env = "LEDGERLINE_PROJECT_TABLE", default_value = "Project_Data")]
    pub project_table: String,

    /// Worksheet whose first column lists authorized employee ids
    #[arg(long, env = "LEDGERLINE_EMPLOYEE_TABLE", default_value = "Employees")]
    pub employee_table: String,

    /// Seconds a fetched project table stays fresh
    #[arg(long, env = "LEDGERLINE_CACHE_TTL_SECS", default_value_t = 300)]
    pub cache_ttl_secs: u64,
}

/// Names of the shared worksheets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub projects: String,
    pub employees: String,
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            projects: "Project_Data".to_string(),
            employees: "Employees".to_string(),
        }
    }
}

impl Config {
    pub fn sheets_config(&self) -> SheetsConfig {
        let config = SheetsConfig::new(self.spreadsheet.clone());
        match &self.spreadsheet_id {
            Some(id) => config.with_spreadsheet_id(id.clone()),
            None => config,
        }
    }

    pub fn credential_source(&self) -> CredentialSource {
        CredentialSource::from_env(self.credentials_file.clone())
    }

    pub fn table_names(&self) -> TableNames {
        TableNames {
            projects: self.project_table.clone(),
            employees: self.employee_table.clone(),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
