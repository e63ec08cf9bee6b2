use rusqlite::{params, Connection, OptionalExtension, Row};
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use crate::error::{InboxError, Result};
use crate::models::input::{NewUserInput, SendMessageInput, ValidateExt};
use crate::models::{
    Message, ParticipantProfile, ParticipantRef, RawId, RawMessage, RawTimestamp, UserId,
    UserProfile,
};

/// Local SQLite copy of users and direct messages
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Outcome of importing a message feed into the store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    /// Already present (same message id)
    pub existing: usize,
    pub malformed: usize,
}

const SELECT_MESSAGE: &str = "
    SELECT m.id, m.sender_id, m.recipient_id, m.sender_display_name, m.recipient_display_name,
           m.content, m.created_at, m.is_read,
           su.first_name, su.last_name, ru.first_name, ru.last_name
    FROM messages m
    LEFT JOIN users su ON su.id = m.sender_id
    LEFT JOIN users ru ON ru.id = m.recipient_id";

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened message store");
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            -- Marketplace users (providers and talent)
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            -- Direct messages
            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                sender_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                sender_display_name TEXT,
                recipient_display_name TEXT,
                content TEXT NOT NULL DEFAULT '',
                created_at INTEGER NOT NULL,
                is_read INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_messages_sender_id ON messages(sender_id);
            CREATE INDEX IF NOT EXISTS idx_messages_recipient_id ON messages(recipient_id);
            CREATE INDEX IF NOT EXISTS idx_messages_created_at ON messages(created_at);
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Insert or update a user profile
    pub fn upsert_user(&self, input: &NewUserInput) -> Result<UserProfile> {
        input.validate_input()?;
        let user = UserProfile {
            id: UserId::parse(&input.id)?,
            first_name: input.first_name.trim().to_string(),
            last_name: input.last_name.trim().to_string(),
        };

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO users (id, first_name, last_name, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                first_name = excluded.first_name,
                last_name = excluded.last_name,
                updated_at = excluded.updated_at",
            params![
                user.id.as_str(),
                user.first_name,
                user.last_name,
                chrono::Utc::now().timestamp_millis()
            ],
        )?;
        Ok(user)
    }

    pub fn user(&self, id: &UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn.lock()?;
        let row = conn
            .query_row(
                "SELECT id, first_name, last_name FROM users WHERE id = ?1",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(id, first_name, last_name)| -> Result<UserProfile> {
            Ok(UserProfile {
                id: UserId::parse(&id)?,
                first_name,
                last_name,
            })
        })
        .transpose()
    }

    /// Store a new outgoing message and return it in feed shape
    pub fn send(&self, from: &UserId, input: &SendMessageInput) -> Result<RawMessage> {
        input.validate_input()?;
        let recipient = UserId::parse(&input.recipient_id)?;
        if &recipient == from {
            return Err(InboxError::Validation(
                "Cannot send a message to yourself".to_string(),
            ));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();

        let conn = self.conn.lock()?;
        conn.execute(
            "INSERT INTO messages (id, sender_id, recipient_id, content, created_at, is_read)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![id, from.as_str(), recipient.as_str(), input.content, now],
        )?;
        debug!(id = %id, to = %recipient, "Stored outgoing message");

        let sql = format!("{} WHERE m.id = ?1", SELECT_MESSAGE);
        let message = conn.query_row(&sql, [&id], raw_message_from_row)?;
        Ok(message)
    }

    /// Import a feed; records that cannot be normalized are counted, not stored
    pub fn import(&self, messages: &[RawMessage]) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO messages
                    (id, sender_id, recipient_id, sender_display_name, recipient_display_name,
                     content, created_at, is_read)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            let mut insert_user = tx.prepare(
                "INSERT OR IGNORE INTO users (id, first_name, last_name, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let now = chrono::Utc::now().timestamp_millis();

            for raw in messages {
                let message = match Message::normalize(raw) {
                    Ok(m) => m,
                    Err(reason) => {
                        debug!(id = ?raw.message_id(), %reason, "Not importing malformed message");
                        report.malformed += 1;
                        continue;
                    }
                };

                for participant in [&raw.sender, &raw.recipient].into_iter().flatten() {
                    if let Some((id, first, last)) = profile_names(participant) {
                        insert_user.execute(params![id.as_str(), first, last, now])?;
                    }
                }

                let changed = insert.execute(params![
                    message.id,
                    message.sender_id.as_str(),
                    message.recipient_id.as_str(),
                    raw.sender_display_name,
                    raw.recipient_display_name,
                    message.content,
                    message.created_at.timestamp_millis(),
                    message.is_read,
                ])?;
                if changed > 0 {
                    report.inserted += 1;
                } else {
                    report.existing += 1;
                }
            }
        }
        tx.commit()?;

        info!(
            inserted = report.inserted,
            existing = report.existing,
            malformed = report.malformed,
            "Imported messages"
        );
        Ok(report)
    }

    /// Every message sent by or to `user`, unordered
    pub fn messages_for(&self, user: &UserId) -> Result<Vec<RawMessage>> {
        let conn = self.conn.lock()?;
        let sql = format!(
            "{} WHERE m.sender_id = ?1 OR m.recipient_id = ?1",
            SELECT_MESSAGE
        );
        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map([user.as_str()], raw_message_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(messages)
    }

    /// Mark one message read; returns false if no such message exists
    pub fn mark_read(&self, message_id: &str) -> Result<bool> {
        let conn = self.conn.lock()?;
        let changed = conn.execute(
            "UPDATE messages SET is_read = 1 WHERE id = ?1",
            params![message_id],
        )?;
        Ok(changed > 0)
    }

    pub fn message_count(&self) -> Result<usize> {
        let conn = self.conn.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Id and name parts of an embedded profile that carries a complete name
fn profile_names(participant: &ParticipantRef) -> Option<(UserId, String, String)> {
    let ParticipantRef::Profile(profile) = participant else {
        return None;
    };
    let id = participant.id()?;
    let first = profile.first_name.as_deref()?.trim();
    let last = profile.last_name.as_deref()?.trim();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some((id, first.to_string(), last.to_string()))
}

/// Known users come back as embedded profiles, unknown ones as bare ids
fn participant(id: String, first_name: Option<String>, last_name: Option<String>) -> ParticipantRef {
    match (first_name, last_name) {
        (None, None) => ParticipantRef::Id(RawId::Text(id)),
        (first_name, last_name) => ParticipantRef::Profile(ParticipantProfile {
            id: Some(RawId::Text(id)),
            first_name,
            last_name,
        }),
    }
}

fn raw_message_from_row(row: &Row<'_>) -> rusqlite::Result<RawMessage> {
    Ok(RawMessage {
        id: Some(RawId::Text(row.get(0)?)),
        sender: Some(participant(row.get(1)?, row.get(8)?, row.get(9)?)),
        recipient: Some(participant(row.get(2)?, row.get(10)?, row.get(11)?)),
        sender_display_name: row.get(3)?,
        recipient_display_name: row.get(4)?,
        content: row.get(5)?,
        created_at: Some(RawTimestamp::Millis(row.get(6)?)),
        is_read: row.get::<_, i32>(7)? == 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::group_conversations;
    use serde_json::json;

    fn user(id: &str) -> UserId {
        UserId::parse(id).unwrap()
    }

    fn add_user(store: &SqliteStore, id: &str, first: &str, last: &str) {
        store
            .upsert_user(&NewUserInput {
                id: id.to_string(),
                first_name: first.to_string(),
                last_name: last.to_string(),
            })
            .unwrap();
    }

    fn raw(value: serde_json::Value) -> RawMessage {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteStore::init(conn).unwrap();
        let conn = store.conn.into_inner().unwrap();
        assert!(SqliteStore::init(conn).is_ok());
    }

    #[test]
    fn test_messages_table_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM pragma_table_info('messages') ORDER BY cid")
            .unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();
        assert_eq!(
            columns,
            vec![
                "id",
                "sender_id",
                "recipient_id",
                "sender_display_name",
                "recipient_display_name",
                "content",
                "created_at",
                "is_read",
            ]
        );
    }

    #[test]
    fn test_upsert_and_load_user() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_user(&store, "u1", "Amina", "Hassan");
        add_user(&store, "u1", "Amina", "Hassan-Ali");

        let loaded = store.user(&user("u1")).unwrap().unwrap();
        assert_eq!(loaded.last_name, "Hassan-Ali");
        assert!(store.user(&user("nobody")).unwrap().is_none());
    }

    #[test]
    fn test_upsert_rejects_invalid_input() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .upsert_user(&NewUserInput {
                id: " ".to_string(),
                first_name: "A".to_string(),
                last_name: "B".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, InboxError::Validation(_)));
    }

    #[test]
    fn test_send_returns_feed_message_with_profiles() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_user(&store, "emp", "Bright", "Futures");

        let sent = store
            .send(
                &user("me"),
                &SendMessageInput {
                    recipient_id: "emp".to_string(),
                    content: "Hello!".to_string(),
                },
            )
            .unwrap();

        assert_eq!(sent.sender, Some(ParticipantRef::Id(RawId::Text("me".to_string()))));
        assert_eq!(sent.recipient.as_ref().unwrap().full_name().as_deref(), Some("Bright Futures"));
        assert_eq!(sent.content.as_deref(), Some("Hello!"));
        assert!(!sent.is_read);
        assert_eq!(store.message_count().unwrap(), 1);
    }

    #[test]
    fn test_send_to_self_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .send(
                &user("me"),
                &SendMessageInput {
                    recipient_id: "me".to_string(),
                    content: "note to self".to_string(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, InboxError::Validation(_)));
    }

    #[test]
    fn test_import_counts_and_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let feed = vec![
            raw(json!({
                "id": "m1",
                "sender": {"id": "a", "firstName": "Amina", "lastName": "Hassan"},
                "recipient": "me",
                "content": "Hi",
                "createdAt": "2024-05-01T09:00:00Z"
            })),
            raw(json!({"id": "m2", "sender": "a", "recipient": "me"})),
        ];

        let first = store.import(&feed).unwrap();
        assert_eq!(first, ImportReport { inserted: 1, existing: 0, malformed: 1 });

        let second = store.import(&feed).unwrap();
        assert_eq!(second, ImportReport { inserted: 0, existing: 1, malformed: 1 });

        // Embedded profile was stored as a user
        assert_eq!(store.user(&user("a")).unwrap().unwrap().first_name, "Amina");
    }

    #[test]
    fn test_messages_for_and_mark_read() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_user(&store, "a", "Amina", "Hassan");
        store
            .import(&[
                raw(json!({"id": "m1", "sender": "a", "recipient": "me",
                           "createdAt": "2024-05-01T09:00:00Z"})),
                raw(json!({"id": "m2", "sender": "me", "recipient": "a",
                           "createdAt": "2024-05-01T09:01:00Z", "isRead": true})),
                raw(json!({"id": "m3", "sender": "x", "recipient": "y",
                           "createdAt": "2024-05-01T09:02:00Z"})),
            ])
            .unwrap();

        let mine = store.messages_for(&user("me")).unwrap();
        assert_eq!(mine.len(), 2);

        let conversations = group_conversations(&mine, &user("me"));
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].counterpart_name, "Amina Hassan");
        assert_eq!(conversations[0].unread_count, 1);

        assert!(store.mark_read("m1").unwrap());
        assert!(!store.mark_read("missing").unwrap());

        let conversations = group_conversations(&store.messages_for(&user("me")).unwrap(), &user("me"));
        assert_eq!(conversations[0].unread_count, 0);
    }

    #[test]
    fn test_open_creates_parent_directory() {
        let dir = std::env::temp_dir().join(format!("haven-inbox-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("inbox.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            assert_eq!(store.message_count().unwrap(), 0);
        }
        assert!(path.exists());
        let _ = fs::remove_dir_all(dir);
    }
}
