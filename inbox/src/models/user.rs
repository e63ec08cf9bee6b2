use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::InboxError;
use crate::utils::validation::validate_user_id;

/// Normalized user identifier
///
/// Always trimmed and non-empty, so two ids that compare equal refer to the
/// same account no matter which shape the API delivered them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, InboxError> {
        validate_user_id(raw)
            .map(UserId)
            .map_err(InboxError::InvalidUserId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = InboxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserId::parse(&value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl FromStr for UserId {
    type Err = InboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserId::parse(s)
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An id as it appears on the wire: some endpoints send strings, some numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn normalize(&self) -> Option<UserId> {
        match self {
            RawId::Text(s) => UserId::parse(s).ok(),
            RawId::Number(n) => UserId::parse(&n.to_string()).ok(),
        }
    }
}

/// Embedded user object sent in place of a bare id
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantProfile {
    #[serde(default, alias = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<RawId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

/// Sender or recipient of a message, in either shape the API produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParticipantRef {
    Id(RawId),
    Profile(ParticipantProfile),
}

impl ParticipantRef {
    pub fn from_id(id: &UserId) -> Self {
        ParticipantRef::Id(RawId::Text(id.to_string()))
    }

    /// Bare id of the participant, if one can be recovered
    pub fn id(&self) -> Option<UserId> {
        match self {
            ParticipantRef::Id(raw) => raw.normalize(),
            ParticipantRef::Profile(profile) => profile.id.as_ref().and_then(RawId::normalize),
        }
    }

    /// "First Last" from an embedded profile; bare ids carry no name
    pub fn full_name(&self) -> Option<String> {
        let ParticipantRef::Profile(profile) = self else {
            return None;
        };
        let parts: Vec<&str> = [profile.first_name.as_deref(), profile.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// A marketplace user as kept in the local store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
}

impl From<&UserProfile> for ParticipantRef {
    fn from(user: &UserProfile) -> Self {
        ParticipantRef::Profile(ParticipantProfile {
            id: Some(RawId::Text(user.id.to_string())),
            first_name: Some(user.first_name.clone()),
            last_name: Some(user.last_name.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id_parse() {
        assert_eq!(UserId::parse(" u1 ").unwrap().as_str(), "u1");
        assert!(matches!(UserId::parse(""), Err(InboxError::InvalidUserId(_))));
        assert!("u2".parse::<UserId>().is_ok());
    }

    #[test]
    fn test_user_id_serde_rejects_blank() {
        let id: UserId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(serde_json::from_str::<UserId>("\"  \"").is_err());
    }

    #[test]
    fn test_participant_bare_id() {
        let p: ParticipantRef = serde_json::from_str("\"user-7\"").unwrap();
        assert_eq!(p.id().unwrap().as_str(), "user-7");
        assert_eq!(p.full_name(), None);
    }

    #[test]
    fn test_participant_numeric_id() {
        let p: ParticipantRef = serde_json::from_str("42").unwrap();
        assert_eq!(p.id().unwrap().as_str(), "42");
    }

    #[test]
    fn test_participant_embedded_profile() {
        let p: ParticipantRef =
            serde_json::from_str(r#"{"id":"u9","firstName":"Amina","lastName":"Hassan"}"#)
                .unwrap();
        assert_eq!(p.id().unwrap().as_str(), "u9");
        assert_eq!(p.full_name().as_deref(), Some("Amina Hassan"));
    }

    #[test]
    fn test_participant_mongo_style_id() {
        let p: ParticipantRef = serde_json::from_str(r#"{"_id":"abc","firstName":"Omar"}"#).unwrap();
        assert_eq!(p.id().unwrap().as_str(), "abc");
        assert_eq!(p.full_name().as_deref(), Some("Omar"));
    }

    #[test]
    fn test_participant_profile_without_id() {
        let p: ParticipantRef = serde_json::from_str(r#"{"firstName":"X","lastName":" "}"#).unwrap();
        assert_eq!(p.id(), None);
        assert_eq!(p.full_name().as_deref(), Some("X"));

        let blank: ParticipantRef = serde_json::from_str(r#"{"id":"u1"}"#).unwrap();
        assert_eq!(blank.full_name(), None);
    }
}
