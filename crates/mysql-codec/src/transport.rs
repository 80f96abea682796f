//! The framing interface shared by both dialects.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::CodecError;

/// Wire dialect of a connection, chosen once when it is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// 3-byte length + sequence number.
    Legacy,
    /// 4-byte length + type tag.
    Tagged,
}

/// A frame as seen by the session: a discriminant plus its payload.
///
/// The discriminant is the sequence number for the legacy dialect and the
/// message type tag for the tagged dialect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number or type tag.
    pub discriminant: u8,
    /// Complete payload.
    pub payload: Bytes,
}

/// Which way a frame travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Client to server.
    Sent,
    /// Server to client.
    Received,
}

/// Summary of one exchanged frame, kept for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    /// Direction of travel.
    pub direction: Direction,
    /// Sequence number or type tag.
    pub discriminant: u8,
    /// Payload length.
    pub length: usize,
}

/// Timestamps and last-frame record for a connection.
#[derive(Debug, Clone, Default)]
pub struct FrameActivity {
    last_sent: Option<Instant>,
    last_received: Option<Instant>,
    last_frame: Option<FrameInfo>,
}

impl FrameActivity {
    /// Record a frame.
    pub fn record(&mut self, direction: Direction, discriminant: u8, length: usize) {
        let now = Instant::now();
        match direction {
            Direction::Sent => self.last_sent = Some(now),
            Direction::Received => self.last_received = Some(now),
        }
        self.last_frame = Some(FrameInfo {
            direction,
            discriminant,
            length,
        });
    }

    /// The most recent frame in either direction.
    #[must_use]
    pub fn last_frame(&self) -> Option<FrameInfo> {
        self.last_frame
    }

    /// Time since the last frame was received.
    #[must_use]
    pub fn since_last_received(&self) -> Option<Duration> {
        self.last_received.map(|at| at.elapsed())
    }

    /// Time since the last frame was sent.
    #[must_use]
    pub fn since_last_sent(&self) -> Option<Duration> {
        self.last_sent.map(|at| at.elapsed())
    }
}

/// Reads and writes complete frames over a byte stream.
///
/// Every read consumes exactly the number of bytes the frame declares; a
/// stream that ends early is an error, never end-of-data. Any error leaves
/// the transport unusable.
#[async_trait]
pub trait FrameTransport: Send {
    /// The dialect this transport speaks.
    fn dialect(&self) -> Dialect;

    /// The discriminant the next written frame must carry.
    ///
    /// For the legacy dialect this is the next sequence number; the tagged
    /// dialect has no ordering and returns 0.
    fn next_discriminant(&self) -> u8;

    /// Reset ordering state at the start of a command.
    fn reset_sequence(&mut self);

    /// Write one frame (split into fragments as the dialect requires) and
    /// flush it.
    async fn write_frame(&mut self, discriminant: u8, payload: Bytes) -> Result<(), CodecError>;

    /// Read one complete frame.
    async fn read_frame(&mut self) -> Result<Frame, CodecError>;

    /// Frame activity for diagnostics.
    fn activity(&self) -> &FrameActivity;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_records_direction() {
        let mut activity = FrameActivity::default();
        assert!(activity.last_frame().is_none());

        activity.record(Direction::Sent, 0, 9);
        assert!(activity.since_last_sent().is_some());
        assert!(activity.since_last_received().is_none());

        activity.record(Direction::Received, 1, 7);
        let last = activity.last_frame();
        assert_eq!(
            last,
            Some(FrameInfo {
                direction: Direction::Received,
                discriminant: 1,
                length: 7
            })
        );
    }
}
