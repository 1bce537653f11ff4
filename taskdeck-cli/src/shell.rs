use std::io::{BufRead, Write};
use std::str::FromStr;

use taskdeck_core::{FormField, ParamsUpdate, Route, SortBy, SortDirection};

use crate::app::App;
use crate::error::AppError;

pub const PROMPT: &str = "taskdeck> ";

pub const HELP: &str = "\
Navigation:  open <path> | list | new | show <id> | edit <id> | back | forward
List:        status all|pending|completed | from <datetime|-> | to <datetime|->
             sort title|dueDate|createdAt | dir asc|desc | next | prev | page <n>
Actions:     toggle [id] | delete [id] | yes | no | retry
Form:        set title|description|dueDate|assignedTo <value> | submit
Other:       help | quit";

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Go(Route),
    Back,
    Forward,
    Params(ParamsUpdate),
    Next,
    Prev,
    Toggle(Option<i64>),
    Delete(Option<i64>),
    Yes,
    No,
    Set(FormField, String),
    Submit,
    Retry,
    Help,
    Quit,
}

fn parse_id(arg: &str) -> Result<i64, String> {
    arg.parse().map_err(|_| format!("not a task id: {arg}"))
}

fn optional_id(arg: &str) -> Result<Option<i64>, String> {
    if arg.is_empty() {
        Ok(None)
    } else {
        parse_id(arg).map(Some)
    }
}

fn required<'a>(arg: &'a str, usage: &str) -> Result<&'a str, String> {
    if arg.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(arg)
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "open" => Command::Open(required(rest, "open <path>")?.to_string()),
            "list" => Command::Go(Route::TaskList),
            "new" => Command::Go(Route::TaskCreate),
            "show" => Command::Go(Route::TaskDetail(parse_id(required(rest, "show <id>")?)?)),
            "edit" => Command::Go(Route::TaskEdit(parse_id(required(rest, "edit <id>")?)?)),
            "back" => Command::Back,
            "forward" => Command::Forward,
            "status" => Command::Params(ParamsUpdate::Status(rest.parse()?)),
            "from" => Command::Params(ParamsUpdate::DueDateFrom(Some(rest.to_string()))),
            "to" => Command::Params(ParamsUpdate::DueDateTo(Some(rest.to_string()))),
            "sort" => Command::Params(ParamsUpdate::SortBy(
                required(rest, "sort title|dueDate|createdAt")?.parse::<SortBy>()?,
            )),
            "dir" => Command::Params(ParamsUpdate::SortDirection(
                required(rest, "dir asc|desc")?.parse::<SortDirection>()?,
            )),
            "next" => Command::Next,
            "prev" => Command::Prev,
            "page" => {
                let n: u32 = required(rest, "page <n>")?
                    .parse()
                    .map_err(|_| format!("not a page number: {rest}"))?;
                if n == 0 {
                    return Err("pages are numbered from 1".to_string());
                }
                Command::Params(ParamsUpdate::Page(n - 1))
            }
            "toggle" => Command::Toggle(optional_id(rest)?),
            "delete" => Command::Delete(optional_id(rest)?),
            "yes" | "y" => Command::Yes,
            "no" | "n" => Command::No,
            "set" => {
                let usage = "set <field> <value>";
                let (field, value) = required(rest, usage)?
                    .split_once(char::is_whitespace)
                    .unwrap_or((rest, ""));
                Command::Set(field.parse()?, value.trim().to_string())
            }
            "submit" => Command::Submit,
            "retry" => Command::Retry,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(format!("unknown command: {other} (try help)")),
        };
        Ok(command)
    }
}

impl App {
    /// Run one command against the application.
    pub async fn execute(&mut self, command: Command) -> Result<(), AppError> {
        match command {
            Command::Open(path) => self.open(&path).await,
            Command::Go(route) => self.navigate(route).await,
            Command::Back => self.back().await,
            Command::Forward => self.forward().await,
            Command::Params(update) => self.update_params(update).await,
            Command::Next => self.next_page().await,
            Command::Prev => self.prev_page().await,
            Command::Toggle(id) => self.toggle(id).await,
            Command::Delete(id) => self.request_delete(id),
            Command::Yes => self.confirm_delete().await,
            Command::No => self.cancel_delete(),
            Command::Set(field, value) => self.set_field(field, value),
            Command::Submit => self.submit().await,
            Command::Retry => self.retry().await,
            Command::Help | Command::Quit => Ok(()),
        }
    }
}

/// Read commands from `input` until it ends or `quit`, writing the screen
/// after each one.
pub async fn run<R, W>(app: &mut App, input: R, out: &mut W) -> Result<(), AppError>
where
    R: BufRead,
    W: Write,
{
    writeln!(out, "{}", app.render())?;
    write!(out, "{PROMPT}")?;
    out.flush()?;

    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Help) => writeln!(out, "{HELP}")?,
            Ok(command) => {
                tracing::debug!(?command, "executing");
                if let Err(err) = app.execute(command).await {
                    writeln!(out, "error: {err}")?;
                }
                writeln!(out, "{}", app.render())?;
            }
            Err(message) => writeln!(out, "error: {message}")?,
        }
        write!(out, "{PROMPT}")?;
        out.flush()?;
    }
    Ok(())
}
