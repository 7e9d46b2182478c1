//! Update sinks receive a notification each time an entry changes state

use tokio::sync::mpsc;

/// Presentation hook invoked after every entry transition.
///
/// Called from worker tasks, so implementations must not block.
pub trait UpdateSink: Send + Sync {
    fn notify(&self, display_name: &str);
}

/// Sink that ignores every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl UpdateSink for NoopSink {
    fn notify(&self, _display_name: &str) {}
}

/// Sink that forwards changed display names into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver that observes its notifications
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl UpdateSink for ChannelSink {
    fn notify(&self, display_name: &str) {
        // The view may already be gone; nothing is listening then.
        let _ = self.sender.send(display_name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_forwards_names() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.notify("gpt-4o");
        sink.notify("gpt-4o-mini");

        assert_eq!(receiver.recv().await.as_deref(), Some("gpt-4o"));
        assert_eq!(receiver.recv().await.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.notify("gpt-4o");
    }

    #[test]
    fn test_sinks_are_object_safe() {
        let sinks: Vec<Box<dyn UpdateSink>> = vec![Box::new(NoopSink), Box::new(ChannelSink::new().0)];
        for sink in &sinks {
            sink.notify("any");
        }
    }
}
