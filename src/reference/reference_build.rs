use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filtered_log::FilteredLog;
use super::model::Build;

/// Id reported when no reference build has been found.
pub const NO_REFERENCE_BUILD: &str = "-";

/// Links a build to the build its results should be compared against.
#[derive(Debug, Clone)]
pub struct ReferenceBuild {
    owner: Arc<dyn Build>,
    reference: Option<Arc<dyn Build>>,
    reference_id: String,
}

impl ReferenceBuild {
    pub fn new(owner: Arc<dyn Build>, reference: Option<Arc<dyn Build>>) -> Self {
        let reference_id = reference
            .as_ref()
            .map_or_else(|| NO_REFERENCE_BUILD.to_string(), |b| b.externalizable_id());

        Self {
            owner,
            reference,
            reference_id,
        }
    }

    pub fn owner(&self) -> &Arc<dyn Build> {
        &self.owner
    }

    pub fn owner_id(&self) -> String {
        self.owner.externalizable_id()
    }

    pub fn reference_build(&self) -> Option<Arc<dyn Build>> {
        self.reference.clone()
    }

    /// Externalizable id of the reference build, or [`NO_REFERENCE_BUILD`].
    pub fn reference_build_id(&self) -> &str {
        &self.reference_id
    }

    pub fn has_reference_build(&self) -> bool {
        self.reference.is_some()
    }

    /// Detaches the result from the host objects so it can be exported.
    pub fn to_record(&self, log: &FilteredLog) -> ReferenceBuildRecord {
        ReferenceBuildRecord {
            owner: self.owner_id(),
            reference: self
                .has_reference_build()
                .then(|| self.reference_id.clone()),
            resolved_at: Utc::now(),
            info_messages: log.info_messages().to_vec(),
            error_messages: log.error_messages(),
        }
    }
}

impl PartialEq for ReferenceBuild {
    fn eq(&self, other: &Self) -> bool {
        self.owner_id() == other.owner_id() && self.reference_id == other.reference_id
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceBuildRecord {
    pub owner: String,
    pub reference: Option<String>,
    pub resolved_at: DateTime<Utc>,
    pub info_messages: Vec<String>,
    pub error_messages: Vec<String>,
}
