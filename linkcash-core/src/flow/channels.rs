use tokio::sync::mpsc;

use super::events::FlowEvent;

/// Buffer of the flow event channel.
///
/// Poll progress is posted with `try_send`; a full buffer only drops
/// progress updates.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

pub type FlowEventSender = mpsc::Sender<FlowEvent>;
pub type FlowEventReceiver = mpsc::Receiver<FlowEvent>;

pub fn flow_event_channel() -> (FlowEventSender, FlowEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}
