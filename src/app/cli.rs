#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Chat,
    Send,
    Sessions,
    Export,
    Sweep,
    Rubric,
    Admin,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "chat" => CliVerb::Chat,
        "send" => CliVerb::Send,
        "sessions" => CliVerb::Sessions,
        "export" => CliVerb::Export,
        "sweep" => CliVerb::Sweep,
        "rubric" => CliVerb::Rubric,
        "admin" => CliVerb::Admin,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  chat <address>                       Talk to the workflow as one agent over stdio"
            .to_string(),
        "  send <address> [text] [--photo <ref>|--location <ref>] [--id <message-id>]".to_string(),
        "                                       Deliver one inbound message and print the reply"
            .to_string(),
        "  sessions                             List stored agent sessions".to_string(),
        "  export [path]                        Write all sessions as one JSON document"
            .to_string(),
        "  sweep                                Mark idle sessions as abandoned".to_string(),
        "  rubric                               Print the evidence steps".to_string(),
        "  admin stats|sessions --as <address>  Admin queries (development only)".to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
