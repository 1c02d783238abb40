use std::time::Instant;

use crate::containerd::events::{
    ContainerCreate, ImageDelete, SnapshotCommit, SnapshotPrepare, SnapshotRemove,
};
use crate::ingest::Event;
use crate::report::{ImagePulled, Report, Reporter};

use super::{CorrelationStore, RetentionPolicy, image_label, reconstruct};

/// Owns the correlation state of one event stream and reports what it reconstructs.
///
/// All methods take `&mut self`; the correlator is meant to be driven by a single consumer.
#[derive(Debug)]
pub struct Correlator<R> {
    store: CorrelationStore,
    reporter: R,
    retention: RetentionPolicy,
}

impl<R: Reporter> Correlator<R> {
    pub fn new(reporter: R, retention: RetentionPolicy) -> Self {
        Self {
            store: CorrelationStore::new(),
            reporter,
            retention,
        }
    }

    pub fn store(&self) -> &CorrelationStore {
        &self.store
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    pub fn into_reporter(self) -> R {
        self.reporter
    }

    /// Processes a single event observed now.
    pub fn handle(&mut self, event: Event) {
        self.handle_at(event, Instant::now());
    }

    /// Processes a single event observed at `now`.
    pub fn handle_at(&mut self, event: Event, now: Instant) {
        match event {
            Event::SnapshotPrepare(prepare) => self.on_prepare(prepare, now),
            Event::SnapshotCommit(commit) => self.on_commit(commit, now),
            Event::SnapshotRemove(SnapshotRemove { key, snapshotter }) => self
                .reporter
                .report(Report::SnapshotRemoved { key, snapshotter }),
            Event::ImageDelete(ImageDelete { name }) => {
                self.reporter.report(Report::ImageDeleted { name })
            }
            Event::ContainerCreate(create) => self.on_container_create(create),
            Event::Other(type_url) => log::trace!("Ignoring event of type `{type_url}`"),
        }
    }

    /// Evicts expired correlation records.
    pub fn sweep(&mut self, now: Instant) {
        let eviction = self.store.evict(now, &self.retention);
        log::debug!(
            "Swept {} pending and {} completed preparations ({} pending, {} completed left)",
            eviction.pending,
            eviction.completed,
            self.store.pending_len(),
            self.store.completed_len(),
        );
    }

    fn on_prepare(&mut self, prepare: SnapshotPrepare, now: Instant) {
        let SnapshotPrepare { key, parent, .. } = prepare;
        log::debug!("prep: key={key} parent={parent}");
        if let Some(replaced) = self.store.record_start(key, parent, now) {
            log::warn!(
                "Preparation key `{}` reused before commit, dropping start with parent `{}`",
                replaced.key,
                replaced.parent_key
            );
        }
    }

    fn on_commit(&mut self, commit: SnapshotCommit, now: Instant) {
        let SnapshotCommit { key, name, .. } = commit;
        match self.store.record_completion(&key, name.as_str(), now) {
            Some(completed) => log::debug!(
                "commit: key={} name={} parent={} duration={:?}",
                completed.key,
                completed.name,
                completed.parent_name,
                completed.duration
            ),
            None => log::debug!("commit without matching start, key={key} name={name}"),
        }
    }

    fn on_container_create(&mut self, create: ContainerCreate) {
        let ContainerCreate { id, image, .. } = create;
        let timeline = match reconstruct(&self.store, &id, &image) {
            Ok(Some(timeline)) => timeline,
            Ok(None) => {
                log::debug!("container without prep, id={id} image={image}");
                return;
            }
            Err(err) => {
                log::warn!("{err}");
                return;
            }
        };
        if let Some(dangling) = &timeline.dangling_parent {
            log::debug!(
                "Layer chain of container `{id}` ends at unknown layer `{dangling}`, reporting partial chain"
            );
        }

        self.reporter.report(Report::ImagePulled(ImagePulled {
            label: image_label(&image).to_owned(),
            container_id: id,
            timeline,
        }));
    }
}
