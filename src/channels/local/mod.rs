mod chat;

pub use chat::{parse_chat_line, run_chat_session, run_chat_session_stdio, ChatLine};
