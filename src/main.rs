mod api;
mod auth;
mod command_line;
mod config;
mod dynamodb;
mod editor;
mod error;
mod handler;
mod logging;
mod server;
mod store;
mod utils;


use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use crate::api::HttpItemsApi;
use crate::auth::{region_from_pool_id, Auth, CognitoIdentity, SessionHandle};
use crate::config::{Cli, Command, EditorArgs, InvokeArgs, ServeArgs, StoreArgs};
use crate::dynamodb::{DynamoDb, Table};
use crate::editor::Editor;
use crate::handler::{Handler, ProxyRequest};
use crate::store::{DynamoStore, ItemStore, MemoryStore};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging()?;

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Invoke(args) => invoke(args).await,
        Command::Editor(args) => run_editor(args).await,
    }
}

async fn build_store(args: &StoreArgs) -> Result<Arc<dyn ItemStore>> {
    if args.in_memory {
        info!("Using in-memory item store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let sdk_config = aws_config::load_from_env().await;
    let ddb = DynamoDb::new(&sdk_config);
    ddb.check_auth().await?;

    let table = Table::new(args.table.as_str());
    if args.create_table {
        if let Some(output) = ddb.create_table_if_not_exists(&table).await? {
            match output.table_description() {
                Some(description) => info!("Table status: {:?}", description.table_status()),
                None => info!("Table created, but description is not available"),
            }
        }
    }
    info!(table = table.name(), "Using DynamoDB item store");
    Ok(Arc::new(DynamoStore::new(ddb, table)))
}

fn build_handler(store: Arc<dyn ItemStore>, args: &StoreArgs) -> Handler {
    Handler::new(store).with_error_details(args.expose_error_details)
}

async fn serve(args: ServeArgs) -> Result<()> {
    let store = build_store(&args.store).await?;
    let handler = Arc::new(build_handler(store, &args.store));
    server::serve(args.bind, handler).await
}

async fn invoke(args: InvokeArgs) -> Result<()> {
    let event = std::fs::read_to_string(&args.event)
        .with_context(|| format!("reading event file {}", args.event.display()))?;
    let request: ProxyRequest =
        serde_json::from_str(&event).context("event is not a proxy request")?;

    let store = build_store(&args.store).await?;
    let response = build_handler(store, &args.store).handle(request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

async fn run_editor(args: EditorArgs) -> Result<()> {
    let region = region_from_pool_id(&args.user_pool_id)
        .ok_or_else(|| anyhow!("cannot derive a region from user pool `{}`", args.user_pool_id))?
        .to_string();
    let sdk_config = aws_config::from_env()
        .region(aws_config::Region::new(region))
        .load()
        .await;

    let provider = CognitoIdentity::new(&sdk_config, &args.user_pool_id, &args.client_id);
    info!(user_pool = provider.user_pool_id(), "Using Cognito identity");
    let auth = Auth::new(Arc::new(provider), SessionHandle::new());

    let api = HttpItemsApi::new(&args.endpoint, auth.session().clone())?;
    let mut editor = Editor::new(api, args.list_backoff());
    command_line::run(&mut editor, &auth, &mut command_line::Console::stdio()).await
}
