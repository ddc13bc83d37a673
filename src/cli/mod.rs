mod command;

use anyhow::{Context as _, Result};
use log::{error, info, warn};
use mailflow::{
    Session, SessionEvent,
    action::{ActionRequest, CoordinatorEvent},
    config::Config,
    sync::ListRequest,
    thread::{ConnectionId, Folder, Thread, ThreadFlag},
};
use tokio::io::{AsyncBufReadExt as _, BufReader};

use crate::{cli::command::Command, logging};

pub fn run(config: &Config, connection: ConnectionId) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building the runtime failed")?;

    rt.block_on(async {
        let session = Session::new(config);
        logging::init(session.joined());
        repl(session, connection).await
    })
}

async fn repl(mut session: Session, connection: ConnectionId) -> Result<()> {
    if let Err(error) = session.connect(connection).await {
        error!("{:#}", anyhow::Error::from(error));
    }
    let mut current = Folder::inbox();
    let _ = session.request_list(&ListRequest::first_page(current.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin failed")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => execute(&mut session, &mut current, command).await,
                    Err(error) => warn!("{error}"),
                }
            }
            event = session.turn() => report(&session, &current, &event),
        }
    }
    info!("bye");
    Ok(())
}

async fn execute(session: &mut Session, current: &mut Folder, command: Command) {
    match command {
        Command::Action { request, immediate } => {
            let message = describe(&request);
            register(session, request, &message, immediate);
        }
        Command::Move {
            thread_ids,
            source,
            destination,
            immediate,
        } => {
            let source = source.unwrap_or_else(|| current.clone());
            let request = ActionRequest::move_to(thread_ids, Some(source), destination);
            let message = describe(&request);
            register(session, request, &message, immediate);
        }
        Command::Undo(None) => match session.undo_last() {
            Some(id) => println!("undid {id}"),
            None => println!("nothing to undo"),
        },
        Command::Undo(Some(id)) => {
            if session.undo(id) {
                println!("undid {id}");
            } else {
                println!("{id} can no longer be undone");
            }
        }
        Command::Dismiss(id) => {
            if !session.dismiss(id) {
                println!("{id} has no open undo window");
            }
        }
        Command::List(folder) => {
            print_list(session, &folder);
            let _ = session.request_list(&ListRequest::first_page(folder.clone()));
            *current = folder;
        }
        Command::Show(thread_id) => {
            match session.read_thread(&thread_id) {
                Some(thread) => println!("{}", line(&thread)),
                None => println!("{thread_id} is not cached yet"),
            }
            let _ = session.request_thread(thread_id);
        }
        Command::Status => {
            println!("{}", session.connection_state());
            println!(
                "{} action(s) pending, {} thread(s) hidden",
                session.coordinator().registry().len(),
                session.coordinator().suppression().len()
            );
        }
        Command::Switch(connection) => {
            if let Err(error) = session.switch_connection(connection).await {
                error!("{:#}", anyhow::Error::from(error));
            } else {
                let _ = session.request_list(&ListRequest::first_page(current.clone()));
            }
        }
        Command::Quit => {}
    }
}

fn register(session: &mut Session, request: ActionRequest, message: &str, immediate: bool) {
    let undo_message = (!immediate).then_some(message);
    match session.register_action(request, undo_message) {
        Ok(id) if immediate => println!("{message} ({id})"),
        Ok(_) => {}
        Err(error) => warn!("{error}"),
    }
}

fn describe(request: &ActionRequest) -> String {
    use mailflow::action::ActionParams;

    let count = request.thread_ids().len();
    let what = match request.params() {
        ActionParams::Move { destination, .. } => format!("Moved to {destination}"),
        ActionParams::Star(true) => "Starred".to_owned(),
        ActionParams::Star(false) => "Unstarred".to_owned(),
        ActionParams::Read(true) => "Marked read".to_owned(),
        ActionParams::Read(false) => "Marked unread".to_owned(),
        ActionParams::Important(true) => "Marked important".to_owned(),
        ActionParams::Important(false) => "Marked not important".to_owned(),
        ActionParams::Label { .. } => "Labels changed".to_owned(),
    };
    format!("{what}: {count} thread(s)")
}

fn report(session: &Session, current: &Folder, event: &SessionEvent) {
    match event {
        SessionEvent::Action(CoordinatorEvent::Failed { action, error }) => {
            println!("{action} failed and was reverted: {error}");
        }
        SessionEvent::Synced(_) => print_list(session, current),
        SessionEvent::Disconnected => println!("disconnected, use switch to reconnect"),
        SessionEvent::Action(_) | SessionEvent::Malformed(_) => {}
    }
}

fn print_list(session: &Session, folder: &Folder) {
    let threads = session.list_view(folder);
    if session.is_loading(folder) {
        println!("{folder} (loading)");
    } else {
        println!("{folder}");
    }
    for thread in &threads {
        println!("  {}", line(thread));
    }
}

fn line(thread: &Thread) -> String {
    let marker = if thread.has(ThreadFlag::Read) { ' ' } else { '*' };
    let mut line = format!(
        "{marker} {} [{}] {}",
        thread.id(),
        ThreadFlag::format(*thread.flags()),
        thread.subject()
    );
    if !thread.labels().is_empty() {
        let labels: Vec<&str> = thread.labels().iter().map(|label| label.as_str()).collect();
        line.push_str(&format!(" ({})", labels.join(", ")));
    }
    line
}
