use anyhow::Result;
use std::fmt::Display;
use std::io::{self, BufRead, StdinLock, Stdout, Write};
use tracing::info;

use crate::api::ItemsApi;
use crate::auth::{Auth, LoginForm, SignInOutcome};
use crate::editor::{cell, Editor};
use crate::error::{ApiError, EditorError};

const COMMANDS: &str = "login/logout/whoami/list/get/field/unfield/staged/create/edit/delete/exit";

/// Input ran out (Ctrl-D or the end of a piped script).
#[derive(Debug, thiserror::Error)]
#[error("end of input")]
struct EndOfInput;

fn is_end_of_input(error: &anyhow::Error) -> bool {
    error.is::<EndOfInput>()
}

/// Per-command failure: either the editor refused or the terminal broke.
#[derive(Debug, thiserror::Error)]
enum CommandError {
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error(transparent)]
    Input(#[from] anyhow::Error),
}

impl From<io::Error> for CommandError {
    fn from(err: io::Error) -> Self {
        CommandError::Input(err.into())
    }
}

type CommandResult = std::result::Result<(), CommandError>;

/// The terminal the editor reads commands from and prints tables to.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn say(&mut self, text: impl Display) -> io::Result<()> {
        writeln!(self.output, "{text}")
    }

    /// Fails with [`EndOfInput`] once the input is exhausted.
    fn prompt(&mut self, message: &str, example: Option<&str>) -> Result<String> {
        match example {
            Some(ex) => write!(self.output, "{message} (e.g., {ex}): ")?,
            None => write!(self.output, "{message}: ")?,
        }
        self.output.flush()?;
        let mut input = String::new();
        if self.input.read_line(&mut input)? == 0 {
            return Err(EndOfInput.into());
        }
        Ok(input.trim().to_string())
    }
}

/// Runs the interactive item editor.
///
/// The supported commands are:
/// - login / logout / whoami: manage the signed-in session
/// - list: reload and print every item
/// - get: fetch one item by id
/// - field / unfield / staged: build up the fields of a new item
/// - create: save the staged fields as a new item
/// - edit: change the fields of an existing item and save it
/// - delete: remove an item
/// - exit: leave the editor
///
/// The collection is loaded once up front. Failures of a single command are
/// printed and the loop carries on. A `401` from the API triggers a session
/// refresh, falling back to the login prompt. The loop ends on `exit` or when
/// the input runs out.
pub async fn run<A, R, W>(
    editor: &mut Editor<A>,
    auth: &Auth,
    console: &mut Console<R, W>,
) -> Result<()>
where
    A: ItemsApi,
    R: BufRead,
    W: Write,
{
    if auth.current_session().await.is_none() {
        console.say("Not signed in. Use `login` before working with items.")?;
    }

    let mut outcome = load_items(editor, console).await;
    loop {
        let handled = match outcome {
            Ok(()) => Ok(()),
            Err(e) => report(e, auth, console).await,
        };
        match handled {
            Ok(()) => {}
            Err(e) if is_end_of_input(&e) => break,
            Err(e) => return Err(e),
        }

        let command = match console.prompt(&format!("Enter command ({COMMANDS})"), None) {
            Ok(command) => command,
            Err(e) if is_end_of_input(&e) => break,
            Err(e) => return Err(e),
        };
        outcome = match command.as_str() {
            "login" => login(auth, console).await.map_err(CommandError::from),
            "logout" => {
                auth.sign_out().await;
                console.say("Signed out.").map_err(CommandError::from)
            }
            "whoami" => whoami(auth, console).await.map_err(CommandError::from),
            "list" => load_items(editor, console).await,
            "get" => get_item(editor, console).await,
            "field" => stage_field(editor, console),
            "unfield" => unstage_field(editor, console),
            "staged" => print_staged(editor, console).map_err(CommandError::from),
            "create" => create_item(editor, console).await,
            "edit" => edit_item(editor, console).await,
            "delete" => delete_item(editor, console).await,
            "exit" => break,
            "" => Ok(()),
            _ => console
                .say("Unknown command. Please try again.")
                .map_err(CommandError::from),
        };
    }
    Ok(())
}

/// Editor failures are printed; terminal failures end the loop.
async fn report<R: BufRead, W: Write>(
    error: CommandError,
    auth: &Auth,
    console: &mut Console<R, W>,
) -> Result<()> {
    match error {
        CommandError::Input(e) => Err(e),
        CommandError::Editor(EditorError::Api(ApiError::Unauthorized)) => {
            // The token may simply have expired.
            if auth.refresh().await.is_ok() {
                console.say("Session refreshed. Please try again.")?;
                return Ok(());
            }
            console.say("Please sign in.")?;
            login(auth, console).await
        }
        CommandError::Editor(e) => Ok(console.say(format!("Error: {e}"))?),
    }
}

async fn login<R: BufRead, W: Write>(auth: &Auth, console: &mut Console<R, W>) -> Result<()> {
    let username = console.prompt("Username", None)?;
    let password = console.prompt("Password", None)?;
    match auth.sign_in(&LoginForm::new(username, password)).await {
        Ok(SignInOutcome::SignedIn(session)) => {
            console.say(format!("Signed in as {}", session.username))?
        }
        Ok(SignInOutcome::Challenge { name }) => console.say(format!(
            "Sign-in needs an additional step ({name}); complete it with your identity provider first."
        ))?,
        Err(e) => console.say(format!("Login failed: {e}"))?,
    }
    Ok(())
}

async fn whoami<R: BufRead, W: Write>(auth: &Auth, console: &mut Console<R, W>) -> io::Result<()> {
    match auth.current_session().await {
        Some(session) => console.say(format!("Signed in as {}", session.username)),
        None => console.say("Not signed in."),
    }
}

/// Shows the loading line until the first load has finished, then the table.
async fn load_items<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    editor.begin_refresh();
    if !editor.list().has_loaded() {
        console.say(editor.render())?;
    }
    let outcome = editor.refresh().await;
    console.say(editor.render())?;
    outcome.map_err(Into::into)
}

async fn get_item<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    let id = console.prompt("Enter id", None)?;
    match editor.fetch(&id).await? {
        Some(item) => {
            console.say(format!("id: {id}"))?;
            for (name, _) in item.fields() {
                console.say(format!("{name}: {}", cell(&item, name)))?;
            }
        }
        None => console.say(format!("No item with id `{id}`."))?,
    }
    Ok(())
}

fn stage_field<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    let name = console.prompt("Field name", Some("color"))?;
    let value = console.prompt("Field value", Some("red"))?;
    editor.add_field(&name, value)?;
    print_staged(editor, console)?;
    Ok(())
}

fn unstage_field<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    let name = console.prompt("Field name", None)?;
    if editor.remove_field(&name).is_none() {
        console.say(format!("`{name}` is not staged."))?;
    }
    print_staged(editor, console)?;
    Ok(())
}

fn print_staged<A: ItemsApi, R: BufRead, W: Write>(
    editor: &Editor<A>,
    console: &mut Console<R, W>,
) -> io::Result<()> {
    let staging = editor.staging();
    if staging.is_empty() {
        return console.say("Nothing staged.");
    }
    console.say(format!("\n--- Staged fields ({}) ---", staging.len()))?;
    for (name, value) in staging.iter() {
        console.say(format!("{name}: {value}"))?;
    }
    console.say("-------------------------\n")
}

async fn create_item<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    if !editor.can_create() {
        let reason = if editor.is_busy() {
            "Another change is still being saved."
        } else {
            "Nothing to create. Stage fields with `field` first."
        };
        console.say(reason)?;
        return Ok(());
    }
    let outcome = editor.create().await;
    console.say(editor.render())?;
    let item = outcome?;
    info!(id = item.id(), "Item created");
    Ok(())
}

/// Opens the edit form for an item and applies `set`/`remove` changes until
/// the operator saves or cancels. Whatever ends the session other than a save
/// discards the form.
async fn edit_item<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    let id = console.prompt("Enter id", None)?;
    editor.begin_edit(&id)?;
    let outcome = edit_form(editor, console).await;
    if editor.form().is_some() {
        editor.cancel_edit();
    }
    outcome
}

async fn edit_form<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    loop {
        print_form(editor, console)?;
        let action = console.prompt("Edit (set/remove/save/cancel)", None)?;
        match action.as_str() {
            "set" => {
                let name = console.prompt("Field name", None)?;
                let current = editor
                    .form()
                    .and_then(|form| form.get(&name))
                    .map(str::to_owned);
                let value = console.prompt("Field value", current.as_deref())?;
                editor.form_mut()?.set(&name, value)?;
            }
            "remove" => {
                let name = console.prompt("Field name", None)?;
                editor.form_mut()?.remove(&name);
            }
            "save" => {
                let outcome = editor.update().await;
                console.say(editor.render())?;
                outcome?;
                return Ok(());
            }
            "cancel" => return Ok(()),
            _ => console.say("Unknown action.")?,
        }
    }
}

fn print_form<A: ItemsApi, R: BufRead, W: Write>(
    editor: &Editor<A>,
    console: &mut Console<R, W>,
) -> io::Result<()> {
    let Some(form) = editor.form() else {
        return Ok(());
    };
    console.say(format!("\n--- Editing {} ---", form.id()))?;
    for (name, value) in form.iter() {
        console.say(format!("{name}: {value}"))?;
    }
    console.say("------------------\n")
}

async fn delete_item<A: ItemsApi, R: BufRead, W: Write>(
    editor: &mut Editor<A>,
    console: &mut Console<R, W>,
) -> CommandResult {
    let id = console.prompt("Enter id", None)?;
    let outcome = editor.delete(&id).await;
    console.say(editor.render())?;
    outcome.map_err(Into::into)
}
