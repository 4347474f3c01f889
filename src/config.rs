use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::Backoff;

pub const DEFAULT_TABLE: &str = "dynamic-items";

#[derive(Parser, Debug)]
#[command(name = "dynamic-crud")]
#[command(about = "Schema-less CRUD service over DynamoDB and its item editor", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the handler behind HTTP
    Serve(ServeArgs),
    /// Run the handler once against a gateway event read from a file
    Invoke(InvokeArgs),
    /// Interactive item editor
    Editor(EditorArgs),
}

/// Where the handler keeps its items.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    #[arg(long, env = "TABLE_NAME", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Keep items in process memory instead of DynamoDB
    #[arg(long, env = "IN_MEMORY_STORE")]
    pub in_memory: bool,

    /// Create the table on startup when it does not exist
    #[arg(long, env = "CREATE_TABLE")]
    pub create_table: bool,

    /// Include fault messages in 500 responses
    #[arg(long, env = "EXPOSE_ERROR_DETAILS")]
    pub expose_error_details: bool,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,
}

#[derive(Args, Debug)]
pub struct InvokeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// JSON file holding an API-Gateway-style proxy event
    #[arg(long)]
    pub event: PathBuf,
}

#[derive(Args, Debug)]
pub struct EditorArgs {
    /// Base URL of the deployed API
    #[arg(long, env = "API_ENDPOINT", default_value = "http://localhost:3000")]
    pub endpoint: String,

    #[arg(long, env = "COGNITO_USER_POOL_ID")]
    pub user_pool_id: String,

    #[arg(long, env = "COGNITO_CLIENT_ID")]
    pub client_id: String,

    /// Extra attempts for list reads; mutations are never retried
    #[arg(long, env = "LIST_RETRIES", default_value_t = 2)]
    pub list_retries: usize,
}

impl EditorArgs {
    pub fn list_backoff(&self) -> Backoff {
        Backoff::new(Duration::from_millis(200), self.list_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["dynamic-crud", "serve"]).unwrap();
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.bind, "0.0.0.0:3000".parse::<SocketAddr>().unwrap());
        assert!(!args.store.in_memory);
        assert!(!args.store.expose_error_details);
    }

    #[test]
    fn invoke_requires_event_file() {
        assert!(Cli::try_parse_from(["dynamic-crud", "invoke"]).is_err());

        let cli = Cli::try_parse_from([
            "dynamic-crud",
            "invoke",
            "--in-memory",
            "--table",
            "scratch",
            "--event",
            "event.json",
        ])
        .unwrap();
        let Command::Invoke(args) = cli.command else {
            panic!("expected invoke");
        };
        assert!(args.store.in_memory);
        assert_eq!(args.store.table, "scratch");
        assert_eq!(args.event, PathBuf::from("event.json"));
    }

    #[test]
    fn editor_flags() {
        let cli = Cli::try_parse_from([
            "dynamic-crud",
            "editor",
            "--endpoint",
            "https://api.example.com/prod",
            "--user-pool-id",
            "eu-west-1_AbC123",
            "--client-id",
            "client",
            "--list-retries",
            "0",
        ])
        .unwrap();
        let Command::Editor(args) = cli.command else {
            panic!("expected editor");
        };
        assert_eq!(args.endpoint, "https://api.example.com/prod");
        assert_eq!(args.list_backoff().max_retries, 0);
    }
}
