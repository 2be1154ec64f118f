use crate::app::command_support::{flag_value, split_flags};
use crate::dialogue::InboundEvent;
use crate::runtime::{now_secs, EngineParts};

pub fn cmd_send(parts: &EngineParts, args: &[String]) -> Result<String, String> {
    let event = parse_send_args(args)?;
    Ok(parts.engine.handle(&event, now_secs()))
}

pub fn parse_send_args(args: &[String]) -> Result<InboundEvent, String> {
    let usage = "usage: send <address> [text] [--photo <ref>|--location <ref>] [--id <message-id>]";
    let (positional, flags) = split_flags(args, &["photo", "location", "id"])?;
    let Some((address, words)) = positional.split_first() else {
        return Err(usage.to_string());
    };
    let text = words.join(" ");

    let mut event = match (flag_value(&flags, "photo"), flag_value(&flags, "location")) {
        (Some(_), Some(_)) => return Err("use only one of --photo and --location".to_string()),
        (Some(media_ref), None) => InboundEvent::photo(address.as_str(), media_ref),
        (None, Some(media_ref)) => InboundEvent::location(address.as_str(), media_ref),
        (None, None) if text.trim().is_empty() => return Err(usage.to_string()),
        (None, None) => InboundEvent::text(address.as_str(), String::new()),
    };
    event.text = text;
    if let Some(message_id) = flag_value(&flags, "id") {
        event = event.with_message_id(message_id);
    }
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::MediaKind;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn send_args_build_text_and_media_events() {
        let event = parse_send_args(&args(&["+15550001", "DR0000001", "--id", "m-7"]))
            .expect("text event");
        assert_eq!(event.text, "DR0000001");
        assert_eq!(event.message_id.as_deref(), Some("m-7"));
        assert_eq!(event.media_kind, None);

        let event = parse_send_args(&args(&["+15550001", "--location", "geo:1,2"]))
            .expect("location event");
        assert_eq!(event.media_kind, Some(MediaKind::Location));
        assert_eq!(event.media_ref.as_deref(), Some("geo:1,2"));
    }

    #[test]
    fn send_args_require_content() {
        assert!(parse_send_args(&args(&["+15550001"])).is_err());
        assert!(parse_send_args(&[]).is_err());
        assert!(parse_send_args(&args(&[
            "+15550001",
            "--photo",
            "a.jpg",
            "--location",
            "geo:1,2"
        ]))
        .is_err());
    }
}
