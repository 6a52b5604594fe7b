use crate::error::Result;
use crate::reference::ReferenceBuildRecord;

/// Serializes a resolution record as JSON.
pub fn to_json(record: &ReferenceBuildRecord, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(record)?
    } else {
        serde_json::to_string(record)?
    };
    Ok(json)
}
