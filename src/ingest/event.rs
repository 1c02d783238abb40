use prost::Message;
use prost_types::Any;

use crate::containerd::events::{
    ContainerCreate, ImageDelete, SnapshotCommit, SnapshotPrepare, SnapshotRemove,
};

use super::Error;

/// A decoded containerd event relevant to layer correlation.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SnapshotPrepare(SnapshotPrepare),
    SnapshotCommit(SnapshotCommit),
    SnapshotRemove(SnapshotRemove),
    ImageDelete(ImageDelete),
    ContainerCreate(ContainerCreate),
    /// Any other event type, identified by its type URL.
    Other(String),
}

/// Decodes the payload of an event envelope.
///
/// Type URLs are accepted with or without a `<host>/` prefix. Unknown types decode to
/// [`Event::Other`].
///
/// # Errors
///
/// Returns [`Error::EventDecode`] if the payload does not match the message its type URL names.
pub fn decode_event(event: &Any) -> Result<Event, Error> {
    fn decode<M: Message + Default>(event: &Any) -> Result<M, Error> {
        M::decode(event.value.as_slice()).map_err(|source| Error::EventDecode {
            type_url: event.type_url.clone(),
            source,
        })
    }

    let type_name = event
        .type_url
        .rsplit_once('/')
        .map_or(event.type_url.as_str(), |(_, name)| name);
    let ev = match type_name {
        "containerd.events.SnapshotPrepare" => Event::SnapshotPrepare(decode(event)?),
        "containerd.events.SnapshotCommit" => Event::SnapshotCommit(decode(event)?),
        "containerd.events.SnapshotRemove" => Event::SnapshotRemove(decode(event)?),
        "containerd.events.ImageDelete" => Event::ImageDelete(decode(event)?),
        "containerd.events.ContainerCreate" => Event::ContainerCreate(decode(event)?),
        _ => Event::Other(event.type_url.clone()),
    };

    Ok(ev)
}
