//! Filtered network event subscription.

use std::collections::HashMap;

use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use futures::StreamExt;

use super::DockerClient;
use crate::error::{Error, Result};

/// A connect or disconnect observed on the monitored network.
#[derive(Debug, Clone)]
pub struct NetworkEvent {
    /// `connect` or `disconnect`.
    pub action: String,
    /// Container id from the event actor, when the runtime supplied one.
    pub container: Option<String>,
}

impl From<EventMessage> for NetworkEvent {
    fn from(message: EventMessage) -> Self {
        let container = message
            .actor
            .and_then(|actor| actor.attributes)
            .and_then(|mut attributes| attributes.remove("container"));
        Self {
            action: message.action.unwrap_or_default(),
            container,
        }
    }
}

impl DockerClient {
    /// Subscribe to connect/disconnect events on the monitored network
    /// and invoke `on_event` for each one.
    ///
    /// The filter is applied server-side, so only events for this
    /// network arrive. Events carry no payload the pipeline trusts;
    /// they are pure triggers.
    ///
    /// # Errors
    ///
    /// Never returns `Ok`. The subscription outliving the daemon is
    /// the normal case, so a transport failure surfaces as
    /// [`Error::EventStream`] and a cleanly closed stream as
    /// [`Error::EventStreamEnded`].
    pub async fn watch(&self, mut on_event: impl FnMut(NetworkEvent)) -> Result<()> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["network".to_string()]);
        filters.insert("network".to_string(), vec![self.network.clone()]);
        filters.insert(
            "event".to_string(),
            vec!["connect".to_string(), "disconnect".to_string()],
        );

        let mut stream = Box::pin(self.api.events(Some(EventsOptions {
            filters,
            ..Default::default()
        })));
        while let Some(item) = stream.next().await {
            let message = item.map_err(Error::event_stream)?;
            on_event(NetworkEvent::from(message));
        }
        Err(Error::EventStreamEnded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::EventActor;

    #[test]
    fn test_event_conversion_extracts_container() {
        let message = EventMessage {
            action: Some("connect".to_string()),
            actor: Some(EventActor {
                id: Some("net-id".to_string()),
                attributes: Some(HashMap::from([
                    ("container".to_string(), "abc123".to_string()),
                    ("name".to_string(), "edge".to_string()),
                ])),
            }),
            ..Default::default()
        };

        let event = NetworkEvent::from(message);
        assert_eq!(event.action, "connect");
        assert_eq!(event.container.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_event_conversion_tolerates_missing_fields() {
        let event = NetworkEvent::from(EventMessage::default());
        assert_eq!(event.action, "");
        assert!(event.container.is_none());
    }
}
