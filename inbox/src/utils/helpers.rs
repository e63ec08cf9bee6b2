use sha2::{Digest, Sha256};

/// Length of a conversation key in hex characters
const KEY_LEN: usize = 16;

/// Generate a deterministic conversation key from two user IDs
/// This ensures both participants get the same key regardless of who sent first
pub fn conversation_key(user_id_1: &str, user_id_2: &str) -> String {
    let (low, high) = if user_id_1 <= user_id_2 {
        (user_id_1, user_id_2)
    } else {
        (user_id_2, user_id_1)
    };
    let key = format!("chat_{}_{}", low, high);

    let digest = Sha256::digest(key.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(KEY_LEN);
    id
}

/// Shorten message content for one-line listings, respecting char boundaries
pub fn preview(content: &str, max_chars: usize) -> String {
    let single_line: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let mut cut: String = single_line.chars().take(max_chars.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
