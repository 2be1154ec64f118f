use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::command_support::{load_settings, open_engine};
use crate::config::Settings;

pub mod admin;
pub mod chat;
pub mod rubric;
pub mod send;
pub mod sessions;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    match args.first() {
        None => Ok(help_text()),
        Some(verb) if parse_cli_verb(verb) == CliVerb::Help => Ok(help_text()),
        Some(_) => {
            let settings = load_settings()?;
            run_cli_with_settings(args, &settings)
        }
    }
}

pub fn run_cli_with_settings(args: Vec<String>, settings: &Settings) -> Result<String, String> {
    let Some(verb) = args.first() else {
        return Ok(help_text());
    };
    let rest = &args[1..];

    match parse_cli_verb(verb) {
        CliVerb::Chat => chat::cmd_chat(&open_engine(settings)?, rest),
        CliVerb::Send => send::cmd_send(&open_engine(settings)?, rest),
        CliVerb::Sessions => sessions::cmd_sessions(&open_engine(settings)?, rest),
        CliVerb::Export => sessions::cmd_export(&open_engine(settings)?, rest),
        CliVerb::Sweep => sessions::cmd_sweep(&open_engine(settings)?, rest),
        CliVerb::Admin => admin::cmd_admin(&open_engine(settings)?, rest),
        CliVerb::Rubric => rubric::cmd_rubric(settings, rest),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{verb}`")),
    }
}
