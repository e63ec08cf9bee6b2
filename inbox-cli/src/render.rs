use haven_inbox::{preview, total_unread, Conversation, GroupingReport};

const NAME_WIDTH: usize = 24;
const PREVIEW_CHARS: usize = 48;

/// One line per conversation under a header with the unread total
pub fn render_summary(conversations: &[Conversation]) -> String {
    if conversations.is_empty() {
        return "No conversations yet\n".to_string();
    }

    let mut out = format!(
        "{} conversation(s), {} unread\n",
        conversations.len(),
        total_unread(conversations)
    );
    for conversation in conversations {
        out.push_str(&summary_line(conversation));
        out.push('\n');
    }
    out
}

pub fn summary_line(conversation: &Conversation) -> String {
    let unread = if conversation.is_unread() {
        format!("({})", conversation.unread_count)
    } else {
        String::new()
    };
    format!(
        "{:<name_width$} {:>5}  {}  {}",
        preview(&conversation.counterpart_name, NAME_WIDTH),
        unread,
        conversation.last_message.created_at.format("%Y-%m-%d %H:%M"),
        preview(&conversation.last_message.content, PREVIEW_CHARS),
        name_width = NAME_WIDTH,
    )
}

/// Note about records the grouper left out, if any
pub fn render_skipped(report: &GroupingReport) -> Option<String> {
    if report.skipped() == 0 {
        return None;
    }
    Some(format!(
        "Skipped {} record(s): {} unrelated, {} self-addressed, {} malformed, {} duplicate",
        report.skipped(),
        report.unrelated,
        report.self_addressed,
        report.malformed,
        report.duplicates
    ))
}
