//! Inbound frame handling.

use tracing::{debug, warn};

use crate::listeners::ListenerRegistry;
use crate::protocol::Envelope;

/// Parse one inbound text frame and dispatch it by its `type`.
///
/// Malformed frames are logged and dropped. Returns the number of
/// listeners that handled the event, or `None` if the frame was discarded.
pub(crate) fn dispatch_frame(listeners: &ListenerRegistry, text: &str) -> Option<usize> {
    match Envelope::parse(text) {
        Ok(envelope) => {
            let delivered = listeners.emit(&envelope.event, &envelope.payload);
            debug!(event = %envelope.event, delivered, "inbound event dispatched");
            Some(delivered)
        }
        Err(e) => {
            warn!(error = %e, len = text.len(), "discarding malformed frame");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn malformed_frames_reach_no_listener() {
        let registry = ListenerRegistry::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        registry.on(
            "new_message",
            Arc::new(move |_: &serde_json::Value| *counter.lock().unwrap() += 1),
        );

        for text in ["{", "new_message", r#"{"payload":{}}"#, r#"{"type":null}"#] {
            assert_eq!(dispatch_frame(&registry, text), None);
        }
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn well_formed_frame_delivers_payload() {
        let registry = ListenerRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        registry.on(
            "chat_updated",
            Arc::new(move |p: &serde_json::Value| sink.lock().unwrap().push(p.clone())),
        );

        let delivered = dispatch_frame(&registry, r#"{"type":"chat_updated","payload":{"id":"c1"}}"#);

        assert_eq!(delivered, Some(1));
        assert_eq!(*seen.lock().unwrap(), vec![serde_json::json!({"id": "c1"})]);
    }

    #[test]
    fn unknown_event_is_accepted_but_unheard() {
        let registry = ListenerRegistry::new();
        assert_eq!(dispatch_frame(&registry, r#"{"type":"typing","payload":{}}"#), Some(0));
    }
}
