use fridex_transport::{JsonMap, Path, RequestRecord, RequestType, Section};
use serde_json::Value as JsonValue;

/// Compose a request record from its logical coordinates.
///
/// No validation happens here: whether `path` belongs to `section` is
/// settled by the call sites.
pub fn build_request(
    section: Section,
    kind: RequestType,
    path: Path,
    params: JsonMap,
) -> RequestRecord {
    RequestRecord { section, kind, path, params }
}

/// Request parameters from a `json!` object literal. Anything else yields no
/// parameters.
pub(crate) fn params(value: JsonValue) -> JsonMap {
    match value {
        JsonValue::Object(map) => map,
        _ => JsonMap::new(),
    }
}
