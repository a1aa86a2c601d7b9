//! Alias management commands
//!
//! Aliases are named references to S3-compatible storage endpoints,
//! including connection details and credentials.

use clap::Subcommand;
use comfy_table::{Table, presets::UTF8_FULL};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};
use mv_core::{Alias, AliasManager, Error, RetryConfig, TimeoutConfig};

/// Alias subcommands for managing storage service connections
#[derive(Subcommand, Debug)]
pub enum AliasCommands {
    /// Add or update an alias
    Set(SetArgs),

    /// List all configured aliases
    List(ListArgs),

    /// Remove an alias
    Remove(RemoveArgs),
}

/// Arguments for the `alias set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Alias name (e.g., "local", "prod")
    pub name: String,

    /// S3 endpoint URL (e.g., "http://localhost:9000", "https://s3.amazonaws.com")
    pub endpoint: String,

    /// Access key ID
    pub access_key: String,

    /// Secret access key
    pub secret_key: String,

    /// AWS region (default: us-east-1)
    #[arg(long, default_value = "us-east-1")]
    pub region: String,

    /// Bucket lookup style: auto, path, or dns (default: auto)
    #[arg(long, default_value = "auto")]
    pub bucket_lookup: String,

    /// Maximum attempts per request, retries included
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Read timeout per request in milliseconds
    #[arg(long, value_name = "MS")]
    pub read_timeout_ms: Option<u64>,
}

impl SetArgs {
    fn into_alias(self) -> Alias {
        let mut alias = Alias::new(self.name, self.endpoint, self.access_key, self.secret_key);
        alias.region = self.region;
        alias.bucket_lookup = self.bucket_lookup;
        alias.retry = self.max_attempts.map(|max_attempts| RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        });
        alias.timeout = self.read_timeout_ms.map(|read_ms| TimeoutConfig {
            read_ms,
            ..TimeoutConfig::default()
        });
        alias
    }
}

/// Arguments for the `alias list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show full details including region and lookup style
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `alias remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the alias to remove
    pub name: String,
}

/// JSON output for alias list
#[derive(Serialize)]
struct AliasListOutput {
    aliases: Vec<AliasInfo>,
}

/// Alias information for output (without sensitive data)
#[derive(Serialize)]
struct AliasInfo {
    name: String,
    endpoint: String,
    region: String,
    bucket_lookup: String,
}

impl From<&Alias> for AliasInfo {
    fn from(alias: &Alias) -> Self {
        Self {
            name: alias.name.clone(),
            endpoint: alias.endpoint.clone(),
            region: alias.region.clone(),
            bucket_lookup: alias.bucket_lookup.clone(),
        }
    }
}

/// JSON output for alias set/remove operations
#[derive(Serialize)]
struct AliasOperationOutput {
    success: bool,
    alias: String,
    message: String,
}

/// Execute an alias subcommand
pub fn execute(cmd: AliasCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let alias_manager = match AliasManager::new() {
        Ok(am) => am,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::GeneralError;
        }
    };

    match cmd {
        AliasCommands::Set(args) => execute_set(args, &alias_manager, &formatter),
        AliasCommands::List(args) => execute_list(args, &alias_manager, &formatter),
        AliasCommands::Remove(args) => execute_remove(args, &alias_manager, &formatter),
    }
}

fn execute_set(args: SetArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let name = args.name.clone();

    match manager.set(args.into_alias()) {
        Ok(()) => {
            report_operation(formatter, &name, format!("Alias '{name}' configured successfully"));
            ExitCode::Success
        }
        Err(e @ (Error::Config(_) | Error::InvalidUrl(_))) => {
            formatter.error(&format!("Invalid alias: {e}"));
            ExitCode::UsageError
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

fn execute_list(args: ListArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    let aliases = match manager.list() {
        Ok(aliases) => aliases,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::from_error(&e);
        }
    };

    if formatter.is_json() {
        formatter.json(&AliasListOutput {
            aliases: aliases.iter().map(AliasInfo::from).collect(),
        });
    } else if aliases.is_empty() {
        formatter.println("No aliases configured.");
    } else if !formatter.is_quiet() {
        println!("{}", alias_table(&aliases, args.long));
    }

    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &AliasManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Alias '{}' removed successfully", args.name);
            report_operation(formatter, &args.name, message);
            ExitCode::Success
        }
        Err(Error::AliasNotFound(_)) => {
            formatter.error(&format!("Alias '{}' not found", args.name));
            ExitCode::NotFound
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}

fn report_operation(formatter: &Formatter, alias: &str, message: String) {
    if formatter.is_json() {
        formatter.json(&AliasOperationOutput {
            success: true,
            alias: alias.to_string(),
            message,
        });
    } else {
        formatter.success(&message);
    }
}

fn alias_table(aliases: &[Alias], long: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);

    if long {
        table.set_header(vec!["Name", "Endpoint", "Region", "Lookup"]);
        for alias in aliases {
            table.add_row(vec![
                &alias.name,
                &alias.endpoint,
                &alias.region,
                &alias.bucket_lookup,
            ]);
        }
    } else {
        table.set_header(vec!["Name", "Endpoint"]);
        for alias in aliases {
            table.add_row(vec![&alias.name, &alias.endpoint]);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_args() -> SetArgs {
        SetArgs {
            name: "test".to_string(),
            endpoint: "http://localhost:9000".to_string(),
            access_key: "accesskey".to_string(),
            secret_key: "secretkey".to_string(),
            region: "us-east-1".to_string(),
            bucket_lookup: "auto".to_string(),
            max_attempts: None,
            read_timeout_ms: None,
        }
    }

    #[test]
    fn test_set_args_into_alias_defaults() {
        let alias = set_args().into_alias();
        assert_eq!(alias.name, "test");
        assert_eq!(alias.region, "us-east-1");
        assert!(alias.retry.is_none());
        assert!(alias.timeout.is_none());
    }

    #[test]
    fn test_set_args_into_alias_tuning() {
        let args = SetArgs {
            max_attempts: Some(5),
            read_timeout_ms: Some(60_000),
            ..set_args()
        };
        let alias = args.into_alias();
        assert_eq!(alias.retry_config().max_attempts, 5);
        assert_eq!(alias.retry_config().initial_backoff_ms, 100);
        assert_eq!(alias.timeout_config().read_ms, 60_000);
        assert_eq!(alias.timeout_config().connect_ms, 5000);
    }

    #[test]
    fn test_alias_info_omits_credentials() {
        let alias = Alias::new("test", "http://localhost:9000", "key", "secret");
        let json = serde_json::to_string(&AliasInfo::from(&alias)).unwrap();
        assert!(json.contains("http://localhost:9000"));
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_alias_table_columns() {
        let aliases = vec![Alias::new("prod", "https://s3.example.com", "k", "s")];
        let short = alias_table(&aliases, false).to_string();
        assert!(short.contains("prod"));
        assert!(!short.contains("us-east-1"));

        let long = alias_table(&aliases, true).to_string();
        assert!(long.contains("us-east-1"));
        assert!(long.contains("auto"));
    }
}
