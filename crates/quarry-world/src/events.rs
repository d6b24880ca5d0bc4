//! Outbound notifications for the protocol layer.
//!
//! The world never talks to sockets. It hands each message to an
//! [`EventSink`] along with a [`Recipient`]; the sink owns encoding and
//! routing.

use crossbeam_channel::{Receiver, Sender, unbounded};
use quarry_voxel::{BlockId, BlockPos, ChunkPos};

use crate::overlay::FixedPos;

/// Identifies a connected client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub u32);

/// Who a message is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Recipient {
    /// One client.
    Client(ClientId),
    /// Every client that has the chunk loaded.
    Watchers(ChunkPos),
}

/// A message for the protocol layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorldEvent {
    /// The client should allocate the chunk column.
    PreChunk { pos: ChunkPos },
    /// Full chunk contents.
    ChunkData {
        /// Block position of the chunk's lowest corner.
        origin: BlockPos,
        /// Extent along x, y, z.
        size: (u8, u8, u8),
        /// Zlib-deflated blocks, metadata, block light, sky light.
        payload: Vec<u8>,
    },
    SignText { pos: BlockPos, lines: [String; 4] },
    BlockChange {
        pos: BlockPos,
        id: BlockId,
        metadata: u8,
    },
    PickupSpawned {
        entity_id: u32,
        item: i16,
        count: i8,
        health: i16,
        pos: FixedPos,
    },
}

/// Receives outbound world messages.
pub trait EventSink: Send + Sync {
    fn deliver(&self, to: Recipient, event: WorldEvent);
}

/// Drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn deliver(&self, _to: Recipient, _event: WorldEvent) {}
}

/// Forwards messages into a crossbeam channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: Sender<(Recipient, WorldEvent)>,
}

impl ChannelSink {
    /// Creates a sink and the receiver that observes it.
    pub fn new() -> (Self, Receiver<(Recipient, WorldEvent)>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn deliver(&self, to: Recipient, event: WorldEvent) {
        if self.tx.send((to, event)).is_err() {
            tracing::trace!("event receiver dropped, discarding message");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_preserves_order() {
        let (sink, rx) = ChannelSink::new();
        let to = Recipient::Client(ClientId(3));
        sink.deliver(to, WorldEvent::PreChunk { pos: ChunkPos::new(1, 2) });
        sink.deliver(
            to,
            WorldEvent::BlockChange {
                pos: BlockPos::new(1, 2, 3),
                id: 4,
                metadata: 5,
            },
        );
        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0].1, WorldEvent::PreChunk { .. }));
        assert!(matches!(received[1].1, WorldEvent::BlockChange { id: 4, .. }));
    }

    #[test]
    fn test_channel_sink_survives_dropped_receiver() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        sink.deliver(
            Recipient::Watchers(ChunkPos::new(0, 0)),
            WorldEvent::PreChunk { pos: ChunkPos::new(0, 0) },
        );
    }
}
