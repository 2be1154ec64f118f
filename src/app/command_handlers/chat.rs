use crate::channels::local::run_chat_session_stdio;
use crate::runtime::EngineParts;
use crate::shared::ids::AgentAddress;

pub fn cmd_chat(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    let [address] = args else {
        return Err("usage: chat <address>".to_string());
    };
    let address = AgentAddress::parse(address)?;
    if !parts.evaluator_has_api_key {
        eprintln!("warning: no evaluator API key configured; photo checks will fail");
    }
    run_chat_session_stdio(&parts.engine, address.as_str())
}
