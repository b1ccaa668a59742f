use std::sync::Arc;

use fridex_transport::{JsonMap, Path, Section};
use serde_json::Value as JsonValue;

use crate::error::BackendError;
use crate::handle::TransportHandle;
use crate::pattern::{decode_map, Attribute, AttributePattern};
use crate::worker::SubWorker;

/// Everything the server publishes about the current vote, undecoded.
pub struct VotingInformation;

impl Attribute for VotingInformation {
    const PATH: Path = Path::Information;
    type Value = JsonMap;

    fn normalize(data: JsonMap) -> JsonMap {
        data
    }

    fn extract(data: JsonMap) -> Result<JsonValue, BackendError> {
        Ok(JsonValue::Object(data))
    }

    fn decode(value: JsonValue) -> Result<JsonMap, BackendError> {
        decode_map(Self::PATH, value)
    }
}

/// The `voting` section. Only the section-wide information is exposed so far.
pub struct Voting {
    worker: Arc<SubWorker>,
    information: AttributePattern<VotingInformation>,
}

impl Voting {
    pub fn new(handle: &TransportHandle) -> Self {
        let worker = SubWorker::new(Section::Voting, handle);
        Self { information: AttributePattern::new(Arc::clone(&worker)), worker }
    }

    pub fn information(&self) -> &AttributePattern<VotingInformation> {
        &self.information
    }

    pub(crate) fn worker(&self) -> &Arc<SubWorker> {
        &self.worker
    }
}
