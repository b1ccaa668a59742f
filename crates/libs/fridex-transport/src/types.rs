use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Parameter and payload maps. Key order is preserved end to end.
pub type JsonMap = serde_json::Map<String, JsonValue>;

// ── Addressing ────────────────────────────────────────────────────────────────

/// Top-level logical domain a request belongs to.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Connection,
    User,
    Voting,
}

impl Section {
    pub const ALL: [Section; 3] = [Self::Connection, Self::User, Self::Voting];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::User => "user",
            Self::Voting => "voting",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field or action inside a section.
///
/// `Information` doubles as the whole-section path: subscriptions are
/// multiplexed over it and it addresses the composite profile payload.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Path {
    Login,
    Logout,
    Register,
    Password,
    Name,
    DoubleVotes,
    PermissionLevel,
    Information,
    CreationDate,
}

impl Path {
    pub const ALL: [Path; 9] = [
        Self::Login,
        Self::Logout,
        Self::Register,
        Self::Password,
        Self::Name,
        Self::DoubleVotes,
        Self::PermissionLevel,
        Self::Information,
        Self::CreationDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Logout => "logout",
            Self::Register => "register",
            Self::Password => "password",
            Self::Name => "name",
            Self::DoubleVotes => "double_votes",
            Self::PermissionLevel => "permission_level",
            Self::Information => "information",
            Self::CreationDate => "creation_date",
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown path: {0}")]
pub struct UnknownPath(pub String);

impl FromStr for Path {
    type Err = UnknownPath;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|path| path.as_str() == s)
            .ok_or_else(|| UnknownPath(s.to_owned()))
    }
}

/// Request verb. Decides routing on the server, not the payload shape.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RequestType {
    #[serde(rename = "get")]
    Get,
    #[serde(rename = "sub")]
    Subscribe,
    #[serde(rename = "set")]
    Set,
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "del")]
    Delete,
}

impl RequestType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Subscribe => "sub",
            Self::Set => "set",
            Self::Add => "add",
            Self::Delete => "del",
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ───────────────────────────────────────────────────────────────────

/// Outbound request as the transport puts it on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RequestRecord {
    pub section: Section,
    #[serde(rename = "type")]
    pub kind: RequestType,
    pub path: Path,
    #[serde(default)]
    pub params: JsonMap,
}

/// Inbound response or push.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ResponseRecord {
    pub section: Section,
    pub path: Path,
    #[serde(default)]
    pub data: JsonMap,
}

impl ResponseRecord {
    pub fn new(section: Section, path: Path, data: JsonMap) -> Self {
        Self { section, path, data }
    }
}

/// Identifier of an underlying transport subscription.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_record_uses_wire_field_names() {
        let mut params = JsonMap::new();
        params.insert("name".to_owned(), json!("alice"));
        let record = RequestRecord {
            section: Section::User,
            kind: RequestType::Delete,
            path: Path::DoubleVotes,
            params,
        };
        let value = serde_json::to_value(&record).expect("serialize request");
        assert_eq!(
            value,
            json!({
                "section": "user",
                "type": "del",
                "path": "double_votes",
                "params": {"name": "alice"}
            })
        );
    }

    #[test]
    fn response_record_accepts_missing_data() {
        let record: ResponseRecord =
            serde_json::from_value(json!({"section": "connection", "path": "logout"}))
                .expect("parse response");
        assert_eq!(record.section, Section::Connection);
        assert_eq!(record.path, Path::Logout);
        assert!(record.data.is_empty());
    }

    #[test]
    fn path_parses_every_wire_name() {
        for path in Path::ALL {
            assert_eq!(path.as_str().parse::<Path>(), Ok(path));
            let wire = serde_json::to_value(path).expect("serialize path");
            assert_eq!(wire, json!(path.as_str()));
        }
        assert_eq!("nickname".parse::<Path>(), Err(UnknownPath("nickname".to_owned())));
    }
}
