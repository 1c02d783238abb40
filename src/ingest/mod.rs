//! Event ingest from the containerd events service.
//!
//! [`subscribe`] opens the event stream for one namespace and [`consume`] drives a
//! [`Correlator`] from any [`EventSource`] until shutdown or a fatal transport error.
use std::str::FromStr;
use std::time::{Duration, Instant};

use tonic::metadata::MetadataValue;
use tonic::transport::Channel;

use crate::containerd::services::events::v1::SubscribeRequest;
use crate::containerd::services::events::v1::events_client::EventsClient;
use crate::containerd::types::Envelope;
use crate::correlation::Correlator;
use crate::report::Reporter;

mod event;

pub use event::{Event, decode_event};

/// Event topics the correlator consumes.
pub const TOPICS: [&str; 5] = [
    "/snapshot/prepare",
    "/snapshot/commit",
    "/snapshot/remove",
    "/images/delete",
    "/containers/create",
];

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid containerd namespace `{0}`")]
    InvalidNamespace(String),
    #[error("failed to subscribe to events service: {0}")]
    Subscribe(#[source] Box<tonic::Status>),
    #[error("failed to receive event message: {0}")]
    EventMessage(#[source] Box<tonic::Status>),
    #[error("event stream closed by server")]
    StreamClosed,
    #[error("failed to decode event type `{type_url}`: {source}")]
    EventDecode {
        type_url: String,
        #[source]
        source: prost::DecodeError,
    },
}

/// A source of event envelopes, polled by [`consume`].
pub trait EventSource {
    /// Waits for the next envelope. `Ok(None)` means the source is exhausted.
    ///
    /// Must be cancel safe: dropping the future before completion may not lose an envelope.
    fn next_envelope(&mut self) -> impl Future<Output = Result<Option<Envelope>, Error>> + Send;
}

impl EventSource for tonic::Streaming<Envelope> {
    async fn next_envelope(&mut self) -> Result<Option<Envelope>, Error> {
        self.message()
            .await
            .map_err(|err| Error::EventMessage(Box::new(err)))
    }
}

/// Subscription filters selecting [`TOPICS`] within `namespace`.
pub fn subscription_filters(namespace: &str) -> Vec<String> {
    TOPICS
        .iter()
        .map(|topic| format!(r#"topic=="{topic}",namespace=="{namespace}""#))
        .collect()
}

/// Subscribes to the correlated event topics of `namespace`.
///
/// # Errors
///
/// Returns [`Error::InvalidNamespace`] if `namespace` is not a valid metadata value and
/// [`Error::Subscribe`] if the events service rejects the subscription.
pub async fn subscribe(
    channel: Channel,
    namespace: &str,
) -> Result<tonic::Streaming<Envelope>, Error> {
    let namespace_value = MetadataValue::from_str(namespace)
        .map_err(|_| Error::InvalidNamespace(namespace.to_owned()))?;
    let mut request = tonic::Request::new(SubscribeRequest {
        filters: subscription_filters(namespace),
    });
    request
        .metadata_mut()
        .insert("containerd-namespace", namespace_value);

    let stream = EventsClient::new(channel)
        .subscribe(request)
        .await
        .map_err(|err| Error::Subscribe(Box::new(err)))?
        .into_inner();
    log::info!("Subscribed to containerd events in namespace `{namespace}`");

    Ok(stream)
}

/// Feeds every envelope of `source` into `correlator` until `shutdown` resolves.
///
/// Envelopes are processed one at a time to completion. Expired correlation records are
/// swept every `sweep_interval`.
///
/// # Errors
///
/// Returns an error if the source fails or ends; both are fatal to the consumer.
pub async fn consume<S, R>(
    source: &mut S,
    correlator: &mut Correlator<R>,
    sweep_interval: Duration,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Error>
where
    S: EventSource,
    R: Reporter,
{
    tokio::pin!(shutdown);
    let mut sweep = tokio::time::interval(sweep_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    sweep.reset();

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                log::info!("Shutdown requested, stopping event consumer");
                return Ok(());
            }
            envelope = source.next_envelope() => match envelope {
                Ok(Some(envelope)) => handle_envelope(correlator, envelope),
                Ok(None) => {
                    log::error!("{}", Error::StreamClosed);
                    return Err(Error::StreamClosed);
                }
                Err(err) => {
                    log::error!("{err}");
                    return Err(err);
                }
            },
            _ = sweep.tick() => correlator.sweep(Instant::now()),
        }
    }
}

fn handle_envelope<R: Reporter>(correlator: &mut Correlator<R>, envelope: Envelope) {
    log::trace!(
        "Received event: topic={}, namespace={}, timestamp={:?}",
        envelope.topic,
        envelope.namespace,
        envelope.timestamp,
    );

    match envelope.event {
        None => log::debug!("No event payload attached to `{}`!", envelope.topic),
        Some(ref event) => match decode_event(event) {
            Ok(event) => correlator.handle(event),
            Err(err) => log::warn!("skipping event: {err}"),
        },
    }
}
