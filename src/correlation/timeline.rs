use std::collections::HashSet;
use std::time::Duration;

use super::{ChainError, CorrelationStore};

/// Preparation latency of one layer in a reconstructed chain.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LayerTiming {
    pub id: String,
    #[serde(rename = "prep_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Chronological layer preparation timeline of the image a container was created from.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImageTimeline {
    pub image_reference: String,
    /// Parent of the container's own rootfs preparation, i.e. the topmost image layer.
    pub initial_parent: String,
    /// Base layer first.
    pub layers: Vec<LayerTiming>,
    #[serde(rename = "total_prep_ms", serialize_with = "serialize_millis")]
    pub total_preparation: Duration,
    /// Parent name at which the walk stopped without reaching a base layer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dangling_parent: Option<String>,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(duration.as_nanos() as f64 / 1_000_000.0)
}

/// Rebuilds the layer chain of the container whose rootfs preparation was keyed `container_id`.
///
/// Returns `Ok(None)` if no preparation is known for the container. The container's own
/// rootfs preparation is not part of the chain; the walk starts at its parent.
///
/// # Errors
///
/// Returns [`ChainError::Cycle`] if a layer name is reached twice while following parents.
pub fn reconstruct(
    store: &CorrelationStore,
    container_id: &str,
    image_reference: &str,
) -> Result<Option<ImageTimeline>, ChainError> {
    let Some(initial) = store.lookup_start(container_id) else {
        return Ok(None);
    };

    let mut layers = Vec::new();
    let mut total_preparation = Duration::ZERO;
    let mut visited = HashSet::new();
    let mut current = initial.parent_key.as_str();
    while let Some(completed) = store.lookup_by_name(current) {
        if !visited.insert(completed.name.as_str()) {
            return Err(ChainError::Cycle {
                container_id: container_id.to_owned(),
                name: completed.name.clone(),
            });
        }
        layers.push(LayerTiming {
            id: completed.name.clone(),
            duration: completed.duration,
        });
        total_preparation += completed.duration;
        current = completed.parent_name.as_str();
    }
    layers.reverse();

    Ok(Some(ImageTimeline {
        image_reference: image_reference.to_owned(),
        initial_parent: initial.parent_key.clone(),
        layers,
        total_preparation,
        dangling_parent: (!current.is_empty()).then(|| current.to_owned()),
    }))
}

/// Short label of an image reference of the form `registry/repository/tag`.
///
/// Returns the last segment if the reference has exactly three `/`-separated segments,
/// otherwise an empty string.
pub fn image_label(image_reference: &str) -> &str {
    let mut segments = image_reference.split('/');
    match (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) {
        (Some(_), Some(_), Some(label), None) => label,
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    /// Prepares and commits `name` on top of `parent`, taking `took` milliseconds.
    fn commit(store: &mut CorrelationStore, at: Instant, name: &str, parent: &str, took: u64) {
        let key = format!("extract-{name}");
        store.record_start(key.as_str(), parent, at);
        store.record_completion(&key, name, at + ms(took));
    }

    #[test]
    fn test_chain_is_chronological() {
        let t0 = Instant::now();
        let mut store = CorrelationStore::new();
        commit(&mut store, t0, "base", "", 10);
        commit(&mut store, t0, "l1", "base", 20);
        commit(&mut store, t0, "l2", "l1", 30);
        commit(&mut store, t0, "l3", "l2", 40);
        store.record_start("container", "l3", t0 + ms(100));

        let timeline = reconstruct(&store, "container", "registry.example/repo/tag")
            .unwrap()
            .unwrap();
        let ids: Vec<&str> = timeline.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["base", "l1", "l2", "l3"]);
        assert_eq!(timeline.layers[0].duration, ms(10));
        assert_eq!(timeline.layers[3].duration, ms(40));
        assert_eq!(timeline.total_preparation, ms(100));
        assert_eq!(timeline.image_reference, "registry.example/repo/tag");
        assert_eq!(timeline.initial_parent, "l3");
        assert_eq!(timeline.dangling_parent, None);
    }

    #[test]
    fn test_cached_image_has_empty_chain() {
        let mut store = CorrelationStore::new();
        store.record_start("container", "", Instant::now());

        let timeline = reconstruct(&store, "container", "alpine").unwrap().unwrap();
        assert!(timeline.layers.is_empty());
        assert_eq!(timeline.total_preparation, Duration::ZERO);
        assert_eq!(timeline.dangling_parent, None);
    }

    #[test]
    fn test_unresolvable_parent_has_empty_chain() {
        let mut store = CorrelationStore::new();
        store.record_start("container", "sha256:cached", Instant::now());

        let timeline = reconstruct(&store, "container", "alpine").unwrap().unwrap();
        assert!(timeline.layers.is_empty());
        assert_eq!(timeline.total_preparation, Duration::ZERO);
        assert_eq!(timeline.initial_parent, "sha256:cached");
        assert_eq!(timeline.dangling_parent.as_deref(), Some("sha256:cached"));
    }

    #[test]
    fn test_unknown_container_yields_nothing() {
        let store = CorrelationStore::new();
        assert_eq!(reconstruct(&store, "missing", "alpine").unwrap(), None);
    }

    #[test]
    fn test_partial_chain_stops_at_dangling_parent() {
        let t0 = Instant::now();
        let mut store = CorrelationStore::new();
        commit(&mut store, t0, "l1", "evicted", 5);
        commit(&mut store, t0, "l2", "l1", 7);
        store.record_start("container", "l2", t0);

        let timeline = reconstruct(&store, "container", "img").unwrap().unwrap();
        let ids: Vec<&str> = timeline.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["l1", "l2"]);
        assert_eq!(timeline.total_preparation, ms(12));
        assert_eq!(timeline.dangling_parent.as_deref(), Some("evicted"));
    }

    #[test]
    fn test_cycle_is_detected() {
        let t0 = Instant::now();
        let mut store = CorrelationStore::new();
        commit(&mut store, t0, "a", "b", 1);
        commit(&mut store, t0, "b", "a", 1);
        store.record_start("container", "a", t0);

        let err = reconstruct(&store, "container", "img").unwrap_err();
        assert!(matches!(
            err,
            ChainError::Cycle { ref container_id, ref name } if container_id == "container" && name == "a"
        ));
    }

    #[test]
    fn test_image_label() {
        assert_eq!(image_label("registry.example/repo/tag"), "tag");
        assert_eq!(
            image_label("eu.gcr.io/workspace-images/abc123:latest"),
            "abc123:latest"
        );
        assert_eq!(image_label("docker.io/library/alpine/extra"), "");
        assert_eq!(image_label("alpine:3.20"), "");
        assert_eq!(image_label(""), "");
    }

    #[test]
    fn test_timeline_serializes_milliseconds() {
        let timeline = ImageTimeline {
            image_reference: "img".to_owned(),
            initial_parent: "sha256:a".to_owned(),
            layers: vec![LayerTiming {
                id: "sha256:a".to_owned(),
                duration: Duration::from_micros(1500),
            }],
            total_preparation: Duration::from_micros(1500),
            dangling_parent: None,
        };
        let value = serde_json::to_value(&timeline).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "image_reference": "img",
                "initial_parent": "sha256:a",
                "layers": [{"id": "sha256:a", "prep_ms": 1.5}],
                "total_prep_ms": 1.5,
            })
        );
    }
}
