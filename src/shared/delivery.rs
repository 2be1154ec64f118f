use sha2::{Digest, Sha256};

/// Fingerprint of a transport-provided message id for one agent.
pub fn message_fingerprint(agent_id: &str, message_id: &str) -> String {
    digest(&["message", agent_id, message_id.trim()])
}

/// Fingerprint of one media reference submitted against one installation.
pub fn media_fingerprint(agent_id: &str, installation: &str, media_ref: &str) -> String {
    digest(&["media", agent_id, installation, media_ref.trim()])
}

pub(crate) fn digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    to_hex(&hasher.finalize())
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for byte in bytes {
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0f) as usize] as char);
    }
    out
}
