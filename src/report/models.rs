use crate::correlation::ImageTimeline;

/// Layer timeline reconstructed for a newly created container.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImagePulled {
    pub container_id: String,
    /// Last segment of a `registry/repository/tag` image reference, empty otherwise.
    pub label: String,
    #[serde(flatten)]
    pub timeline: ImageTimeline,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    ImagePulled(ImagePulled),
    SnapshotRemoved { key: String, snapshotter: String },
    ImageDeleted { name: String },
}

impl Report {
    pub fn kind(&self) -> &'static str {
        match self {
            Report::ImagePulled(_) => "image pulled",
            Report::SnapshotRemoved { .. } => "snapshot remove",
            Report::ImageDeleted { .. } => "image delete",
        }
    }
}
