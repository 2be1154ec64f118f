use crate::dialogue::InboundEvent;
use crate::runtime::now_secs;
use crate::workflow::WorkflowEngine;
use std::io::{self, BufRead, Write};

const CHAT_EXIT_COMMANDS: &[&str] = &["/exit", "exit", "quit"];
const DEFAULT_LOCATION_REF: &str = "geo:local-checkin";

/// One line typed into the local chat, already mapped to transport shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    Empty,
    Exit,
    Text(String),
    Photo(String),
    Location(String),
    Usage(String),
}

pub fn parse_chat_line(line: &str) -> ChatLine {
    let message = line.trim();
    if message.is_empty() {
        return ChatLine::Empty;
    }
    if CHAT_EXIT_COMMANDS
        .iter()
        .any(|command| message.eq_ignore_ascii_case(command))
    {
        return ChatLine::Exit;
    }

    let (head, rest) = match message.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (message, ""),
    };
    match head {
        "/photo" if rest.is_empty() => ChatLine::Usage("usage: /photo <path-or-url>".to_string()),
        "/photo" => ChatLine::Photo(rest.to_string()),
        "/location" if rest.is_empty() => ChatLine::Location(DEFAULT_LOCATION_REF.to_string()),
        "/location" => ChatLine::Location(rest.to_string()),
        _ => ChatLine::Text(message.to_string()),
    }
}

pub fn run_chat_session_stdio(engine: &WorkflowEngine, agent: &str) -> Result<String, String> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let stdout = io::stdout();
    let mut output = stdout.lock();
    run_chat_session(engine, agent, &mut input, &mut output)
}

/// Plays the transport for one agent: every line becomes an inbound event
/// and the engine's reply is printed back.
pub fn run_chat_session<R: BufRead, W: Write>(
    engine: &WorkflowEngine,
    agent: &str,
    input: &mut R,
    output: &mut W,
) -> Result<String, String> {
    writeln!(output, "chat agent={agent}").map_err(write_error)?;
    writeln!(
        output,
        "type `/photo <path-or-url>` to send a photo, `/location [ref]` to check in, `/exit` to quit"
    )
    .map_err(write_error)?;

    let mut sent = 0usize;
    loop {
        write!(output, "you> ").map_err(write_error)?;
        output.flush().map_err(write_error)?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| format!("failed to read chat input: {e}"))?;
        if read == 0 {
            break;
        }

        let event = match parse_chat_line(&line) {
            ChatLine::Empty => continue,
            ChatLine::Exit => break,
            ChatLine::Usage(usage) => {
                writeln!(output, "{usage}").map_err(write_error)?;
                continue;
            }
            ChatLine::Text(text) => InboundEvent::text(agent, text),
            ChatLine::Photo(media_ref) => InboundEvent::photo(agent, media_ref),
            ChatLine::Location(media_ref) => InboundEvent::location(agent, media_ref),
        };
        let reply = engine.handle(&event, now_secs());
        sent += 1;
        writeln!(output, "bot> {}", reply.replace('\n', "\n     ")).map_err(write_error)?;
        output.flush().map_err(write_error)?;
    }

    Ok(format!("chat ended\nagent={agent}\nmessages={sent}"))
}

fn write_error(err: io::Error) -> String {
    format!("failed to write chat output: {err}")
}
