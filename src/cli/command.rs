use std::str::FromStr;

use mailflow::{
    action::{ActionId, ActionRequest},
    thread::{ConnectionId, Folder, LabelId, ThreadId},
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("{0} needs at least one thread id")]
    NoThreads(&'static str),
    #[error("{0} needs {1}")]
    Missing(&'static str, &'static str),
    #[error("{0:?} is not an action id")]
    ActionId(String),
    #[error("label needs +LABEL or -LABEL before the thread ids")]
    NoLabels,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action {
        request: ActionRequest,
        immediate: bool,
    },
    /// Source `None` means the folder currently shown.
    Move {
        thread_ids: Vec<ThreadId>,
        source: Option<Folder>,
        destination: Folder,
        immediate: bool,
    },
    Undo(Option<ActionId>),
    Dismiss(ActionId),
    List(Folder),
    Show(ThreadId),
    Status,
    Switch(ConnectionId),
    Quit,
}

fn thread_ids<'a>(
    command: &'static str,
    words: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<ThreadId>, CommandParseError> {
    let ids: Vec<ThreadId> = words
        .into_iter()
        .flat_map(|word| word.split(','))
        .filter(|id| !id.is_empty())
        .map(ThreadId::from)
        .collect();
    if ids.is_empty() {
        Err(CommandParseError::NoThreads(command))
    } else {
        Ok(ids)
    }
}

fn action_id(word: &str) -> Result<ActionId, CommandParseError> {
    word.parse()
        .map_err(|_| CommandParseError::ActionId(word.to_owned()))
}

fn flag(
    name: &'static str,
    args: &[&str],
    immediate: bool,
    request: fn(Vec<ThreadId>, bool) -> ActionRequest,
    value: bool,
) -> Result<Command, CommandParseError> {
    Ok(Command::Action {
        request: request(thread_ids(name, args.iter().copied())?, value),
        immediate,
    })
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words: Vec<&str> = line.split_whitespace().collect();
        let mut immediate = false;
        if words.last() == Some(&"!") {
            words.pop();
            immediate = true;
        }
        let Some((&verb, args)) = words.split_first() else {
            return Err(CommandParseError::Unknown(String::new()));
        };
        let verb = match verb.strip_suffix('!') {
            Some(verb) => {
                immediate = true;
                verb
            }
            None => verb,
        };

        match verb {
            "star" => flag("star", args, immediate, |ids, v| ActionRequest::star(ids, v), true),
            "unstar" => flag("unstar", args, immediate, |ids, v| ActionRequest::star(ids, v), false),
            "read" => flag("read", args, immediate, |ids, v| ActionRequest::read(ids, v), true),
            "unread" => flag("unread", args, immediate, |ids, v| ActionRequest::read(ids, v), false),
            "important" => flag(
                "important",
                args,
                immediate,
                |ids, v| ActionRequest::important(ids, v),
                true,
            ),
            "unimportant" => flag(
                "unimportant",
                args,
                immediate,
                |ids, v| ActionRequest::important(ids, v),
                false,
            ),
            "label" => {
                let mut added = Vec::new();
                let mut removed = Vec::new();
                let mut ids = Vec::new();
                for word in args {
                    if let Some(label) = word.strip_prefix('+') {
                        added.push(LabelId::from(label));
                    } else if let Some(label) = word.strip_prefix('-') {
                        removed.push(LabelId::from(label));
                    } else {
                        ids.push(*word);
                    }
                }
                if added.is_empty() && removed.is_empty() {
                    return Err(CommandParseError::NoLabels);
                }
                Ok(Command::Action {
                    request: ActionRequest::labels(thread_ids("label", ids)?, added, removed),
                    immediate,
                })
            }
            "move" => {
                let (&destination, rest) = args
                    .split_first()
                    .ok_or(CommandParseError::Missing("move", "a destination folder"))?;
                let (ids, source) = match rest.iter().position(|word| *word == "from") {
                    Some(index) => {
                        let source = rest
                            .get(index + 1)
                            .ok_or(CommandParseError::Missing("move", "a folder after from"))?;
                        (&rest[..index], Some(Folder::from(*source)))
                    }
                    None => (rest, None),
                };
                Ok(Command::Move {
                    thread_ids: thread_ids("move", ids.iter().copied())?,
                    source,
                    destination: Folder::from(destination),
                    immediate,
                })
            }
            "archive" | "delete" => Ok(Command::Move {
                thread_ids: thread_ids(if verb == "archive" { "archive" } else { "delete" }, args.iter().copied())?,
                source: None,
                destination: if verb == "archive" {
                    Folder::archive()
                } else {
                    Folder::bin()
                },
                immediate,
            }),
            "undo" => args
                .first()
                .map(|word| action_id(word))
                .transpose()
                .map(Command::Undo),
            "dismiss" => args
                .first()
                .ok_or(CommandParseError::Missing("dismiss", "an action id"))
                .and_then(|word| action_id(word))
                .map(Command::Dismiss),
            "list" => Ok(Command::List(
                args.first().map_or_else(Folder::inbox, |folder| Folder::from(*folder)),
            )),
            "show" => args
                .first()
                .ok_or(CommandParseError::Missing("show", "a thread id"))
                .map(|id| Command::Show(ThreadId::from(*id))),
            "status" => Ok(Command::Status),
            "switch" => args
                .first()
                .ok_or(CommandParseError::Missing("switch", "a connection id"))
                .map(|id| Command::Switch(ConnectionId::from(*id))),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandParseError::Unknown(other.to_owned())),
        }
    }
}
