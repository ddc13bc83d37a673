mod journal;

use std::{io::Write as _, time::SystemTime};

use anstyle::{AnsiColor, Effects, Style};
use env_logger::Env;
use journal::connected_to_journal;
use log::Level;
use mailflow::thread::ConnectionId;
use tokio::sync::watch;

/// Installs the global logger. Records carry the id of whichever connection
/// `joined` reports at the time they are written.
pub fn init(joined: watch::Receiver<Option<ConnectionId>>) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if connected_to_journal() {
        builder.format(move |buf, record| {
            writeln!(
                buf,
                "<{}>{}{}: {}",
                priority(record.level()),
                prefix(joined.borrow().as_ref()),
                record.target(),
                record.args()
            )
        });
    } else {
        let subtle = AnsiColor::BrightBlack.on_default();
        builder.format(move |buf, record| {
            let level = record.level();
            let style = level_style(level);
            let timestamp = jiff::Timestamp::try_from(SystemTime::now())
                .map_or_else(|_| "timestamp_error".to_owned(), |now| format!("{now:.3}"));
            write!(
                buf,
                "{subtle}[{subtle:#}{timestamp} {style}{level}{style:#} {}{}",
                prefix(joined.borrow().as_ref()),
                record.target(),
            )?;
            if let Some(line) = record.line() {
                write!(buf, ":{line}")?;
            }
            writeln!(buf, "{subtle}]{subtle:#} {}", record.args())
        });
    }
    builder.init();
}

/// syslog priority understood by the journal.
fn priority(level: Level) -> u8 {
    match level {
        Level::Error => 3,
        Level::Warn => 4,
        Level::Info => 6,
        Level::Debug | Level::Trace => 7,
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::Error => AnsiColor::Red.on_default().effects(Effects::BOLD),
        Level::Warn => AnsiColor::Yellow.on_default(),
        Level::Info => AnsiColor::Green.on_default(),
        Level::Debug => AnsiColor::Blue.on_default(),
        Level::Trace => AnsiColor::Cyan.on_default(),
    }
}

fn prefix(connection: Option<&ConnectionId>) -> String {
    connection.map_or_else(String::new, |connection| format!("{connection} "))
}
