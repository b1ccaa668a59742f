use std::sync::Arc;

use fridex_transport::{JsonMap, Path, RequestType, ResponseFuture, Section};
use serde_json::{json, Value as JsonValue};
use time::{Duration, OffsetDateTime};

use crate::credentials::password_digest;
use crate::error::BackendError;
use crate::handle::TransportHandle;
use crate::pattern::{
    decode_i64, decode_map, decode_string, Attribute, AttributePattern, Get, GetSet,
};
use crate::request::params;
use crate::worker::SubWorker;

// ── Attributes ────────────────────────────────────────────────────────────────

/// The whole user profile.
pub struct Information;

/// Display name. Settable.
pub struct Name;

/// Extra votes granted to the user. Settable.
pub struct DoubleVotes;

/// Account creation time.
pub struct CreationDate;

pub struct PermissionLevel;

/// Decoded profile. Fields the server leaves out stay `None`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserInformation {
    pub name: Option<String>,
    pub double_votes: Option<i64>,
    pub creation_date: Option<OffsetDateTime>,
    pub permission_level: Option<i64>,
}

impl Attribute for Information {
    const PATH: Path = Path::Information;
    type Value = UserInformation;

    /// Drops null fields; the profile is never narrowed.
    fn normalize(mut data: JsonMap) -> JsonMap {
        data.retain(|_, value| !value.is_null());
        data
    }

    fn extract(data: JsonMap) -> Result<JsonValue, BackendError> {
        Ok(JsonValue::Object(data))
    }

    fn decode(value: JsonValue) -> Result<UserInformation, BackendError> {
        let mut map = decode_map(Self::PATH, value)?;
        let mut field = |path: Path| map.remove(path.as_str()).filter(|v| !v.is_null());

        Ok(UserInformation {
            name: field(Path::Name).map(Name::decode).transpose()?,
            double_votes: field(Path::DoubleVotes).map(DoubleVotes::decode).transpose()?,
            creation_date: field(Path::CreationDate).map(CreationDate::decode).transpose()?,
            permission_level: field(Path::PermissionLevel)
                .map(PermissionLevel::decode)
                .transpose()?,
        })
    }
}

impl Attribute for Name {
    const PATH: Path = Path::Name;
    type Value = String;

    fn decode(value: JsonValue) -> Result<String, BackendError> {
        decode_string(Self::PATH, value)
    }
}

impl Attribute for DoubleVotes {
    const PATH: Path = Path::DoubleVotes;
    type Value = i64;

    fn decode(value: JsonValue) -> Result<i64, BackendError> {
        decode_i64(Self::PATH, value)
    }
}

impl Attribute for CreationDate {
    const PATH: Path = Path::CreationDate;
    type Value = OffsetDateTime;

    fn decode(value: JsonValue) -> Result<OffsetDateTime, BackendError> {
        decode_timestamp(Self::PATH, &value)
    }
}

impl Attribute for PermissionLevel {
    const PATH: Path = Path::PermissionLevel;
    type Value = i64;

    fn decode(value: JsonValue) -> Result<i64, BackendError> {
        decode_i64(Self::PATH, value)
    }
}

/// Unix epoch seconds as a UTC datetime.
///
/// Fractional seconds are kept to the microsecond, which is all an `f64`
/// epoch carries.
fn decode_timestamp(path: Path, value: &JsonValue) -> Result<OffsetDateTime, BackendError> {
    let parsed = if let Some(secs) = value.as_i64() {
        OffsetDateTime::from_unix_timestamp(secs).map_err(|err| err.to_string())
    } else if let Some(secs) = value.as_f64().filter(|secs| secs.is_finite()) {
        let whole = secs.floor();
        let micros = ((secs - whole) * 1e6).round() as i64;
        OffsetDateTime::from_unix_timestamp(whole as i64)
            .map_err(|err| err.to_string())
            .and_then(|date| {
                date.checked_add(Duration::microseconds(micros))
                    .ok_or_else(|| format!("{value} is out of range"))
            })
    } else {
        Err(format!("expected epoch seconds, got {value}"))
    };
    parsed.map_err(|message| BackendError::rework(path, message))
}

// ── Section ───────────────────────────────────────────────────────────────────

/// The `user` section: profile attributes and account management.
pub struct User {
    worker: Arc<SubWorker>,
    information: AttributePattern<Information>,
    name: AttributePattern<Name, GetSet>,
    double_votes: AttributePattern<DoubleVotes, GetSet>,
    creation_date: AttributePattern<CreationDate, Get>,
    permission_level: AttributePattern<PermissionLevel, Get>,
}

impl User {
    pub fn new(handle: &TransportHandle) -> Self {
        let worker = SubWorker::new(Section::User, handle);
        Self {
            information: AttributePattern::new(Arc::clone(&worker)),
            name: AttributePattern::new(Arc::clone(&worker)),
            double_votes: AttributePattern::new(Arc::clone(&worker)),
            creation_date: AttributePattern::new(Arc::clone(&worker)),
            permission_level: AttributePattern::new(Arc::clone(&worker)),
            worker,
        }
    }

    pub fn information(&self) -> &AttributePattern<Information> {
        &self.information
    }

    pub fn name(&self) -> &AttributePattern<Name, GetSet> {
        &self.name
    }

    pub fn double_votes(&self) -> &AttributePattern<DoubleVotes, GetSet> {
        &self.double_votes
    }

    pub fn creation_date(&self) -> &AttributePattern<CreationDate, Get> {
        &self.creation_date
    }

    pub fn permission_level(&self) -> &AttributePattern<PermissionLevel, Get> {
        &self.permission_level
    }

    /// Create an account. Only the password digest leaves this process.
    pub fn register(&self, name: &str, password: &str) -> Result<ResponseFuture, BackendError> {
        log::info!("registering user {name}");
        self.worker.data_request(
            Path::Register,
            RequestType::Set,
            params(json!({"name": name, "password": password_digest(password)})),
        )
    }

    pub fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<ResponseFuture, BackendError> {
        self.worker.data_request(
            Path::Password,
            RequestType::Set,
            params(json!({
                "old_password": password_digest(old_password),
                "new_password": password_digest(new_password),
            })),
        )
    }

    pub(crate) fn worker(&self) -> &Arc<SubWorker> {
        &self.worker
    }
}
