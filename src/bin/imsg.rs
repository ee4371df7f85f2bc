//! imsg - terminal client for imsgd.
//!
//! Usage: `imsg <host:port>`, then type `help`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use imsg_proto::client::{Client, ClientHandler};
use imsg_proto::{MAX_BODY_LEN, MAX_NICKNAME_LEN, ProtocolError};
use imsgd::telemetry;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Instrument, debug};
use tracing_subscriber::EnvFilter;

/// How long `quit` waits for the server to acknowledge.
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);

const HELP_CMD: &str = "help";
const CONNECT_CMD: &str = "connect";
const MESSAGE_CMD: &str = "message";
const LIST_CMD: &str = "list";
const QUIT_CMD: &str = "quit";

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Connect(String),
    /// Select a destinatary, optionally sending a first message right away.
    Message { to: String, body: Option<String> },
    List,
    Quit,
    /// Plain text for the current destinatary.
    Text(String),
    Empty,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(Command::Empty);
    }

    let (word, rest) = match line.trim_start().split_once(' ') {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (line.trim(), ""),
    };

    match word {
        HELP_CMD => Ok(Command::Help),
        LIST_CMD => Ok(Command::List),
        QUIT_CMD => Ok(Command::Quit),
        CONNECT_CMD => {
            let nick = rest.trim();
            check_nickname(CONNECT_CMD, nick)?;
            if nick.contains(char::is_whitespace) {
                return Err(format!(
                    "The \"{CONNECT_CMD}\" command accepts only one argument: your nickname."
                ));
            }
            Ok(Command::Connect(nick.to_string()))
        }
        MESSAGE_CMD => {
            let (to, body) = match rest.split_once(' ') {
                Some((to, body)) => (to, Some(body.to_string())),
                None => (rest.trim(), None),
            };
            check_nickname(MESSAGE_CMD, to)?;
            if let Some(body) = &body {
                check_body(body)?;
            }
            Ok(Command::Message {
                to: to.to_string(),
                body,
            })
        }
        _ => {
            check_body(line)?;
            Ok(Command::Text(line.to_string()))
        }
    }
}

fn check_nickname(cmd: &str, nick: &str) -> Result<(), String> {
    if nick.is_empty() {
        return Err(format!(
            "The \"{cmd}\" command needs a nickname. Empty nicknames are not allowed."
        ));
    }
    if nick.len() > MAX_NICKNAME_LEN {
        return Err(format!(
            "The user nickname must not be bigger than {MAX_NICKNAME_LEN} bytes."
        ));
    }
    Ok(())
}

fn check_body(body: &str) -> Result<(), String> {
    if body.len() > MAX_BODY_LEN {
        return Err(format!(
            "Messages must not be bigger than {MAX_BODY_LEN} bytes."
        ));
    }
    Ok(())
}

/// Prints server traffic to the terminal.
struct Terminal;

impl ClientHandler for Terminal {
    fn on_server_message(&self, text: &str) {
        println!("[server] said: {text}");
    }

    fn on_roster(&self, nicknames: Vec<String>) {
        println!("[server] said: Available users list");
        for nick in nicknames {
            println!("-> {nick}");
        }
    }

    fn on_direct_message(&self, from: &str, body: &str) {
        println!("[{from}] said: {body}");
    }

    fn on_connection_lost(&self, error: &ProtocolError) {
        debug!(error = %error, "Connection lost");
        say("Connection with the server was lost. Use \"connect\" to log in again.");
    }
}

fn say(text: impl AsRef<str>) {
    println!("[client] said: {}", text.as_ref());
}

fn print_help() {
    println!("Available commands:");
    println!("  {HELP_CMD:<8} show this text");
    println!("  {CONNECT_CMD:<8} <nickname>: log in; refused if the nickname is taken");
    println!("  {MESSAGE_CMD:<8} <nickname> [text]: talk to <nickname>; lines typed");
    println!("           afterwards are sent to the same person");
    println!("  {LIST_CMD:<8} show who is logged in");
    println!("  {QUIT_CMD:<8} log out and exit");
}

/// The client, if it is still connected.
fn connected(client: &Option<Client>) -> Option<&Client> {
    match client {
        Some(c) if c.is_connected() => Some(c),
        _ => {
            say("Not connected. Use \"connect <nickname>\" first.");
            None
        }
    }
}

async fn send(client: &Option<Client>, to: &str, body: &str) {
    if let Some(c) = connected(client)
        && let Err(e) = c.send_direct_message(to, body).await
    {
        say(format!("Cannot send: {e}"));
    }
}

async fn run(addr: String) -> anyhow::Result<()> {
    print_help();

    let handler = Arc::new(Terminal);
    let mut client: Option<Client> = None;
    let mut destinatary: Option<String> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Empty) => {}
            Ok(Command::Help) => print_help(),
            Ok(Command::Connect(nick)) => {
                if client.as_ref().is_some_and(Client::is_connected) {
                    say("Already connected. Use \"quit\" first.");
                    continue;
                }
                match Client::connect(addr.as_str(), &nick, handler.clone()).await {
                    Ok(c) => client = Some(c),
                    Err(e) => say(format!("Cannot connect to {addr}: {e}")),
                }
            }
            Ok(Command::Message { to, body }) => {
                if let Some(body) = body {
                    send(&client, &to, &body).await;
                }
                destinatary = Some(to);
            }
            Ok(Command::Text(body)) => match &destinatary {
                Some(to) => send(&client, to, &body).await,
                None => say("Unrecognized command! Please, try again."),
            },
            Ok(Command::List) => {
                if let Some(c) = connected(&client)
                    && let Err(e) = c.request_list().await
                {
                    say(format!("Cannot list users: {e}"));
                }
            }
            Ok(Command::Quit) => break,
            Err(text) => say(text),
        }
    }

    if let Some(c) = client.as_ref().filter(|c| c.is_connected())
        && c.disconnect().await.is_ok()
    {
        let _ = tokio::time::timeout(QUIT_TIMEOUT, c.closed()).await;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let addr = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("Usage: imsg <host:port>"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let span = telemetry::spans::client(&addr);
    run(addr).instrument(span).await
}
