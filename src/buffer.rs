//! Bounded FIFO between the frame producer and the playback scheduler.
//!
//! `push` blocks while the buffer holds `FRAME_BUFFER_CAPACITY` frames and `pop`
//! blocks while it is empty. Dropping either end closes the buffer for the other.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};

use crate::frame::RenderedFrame;

pub const FRAME_BUFFER_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferClosed;

#[derive(Debug)]
pub enum TryPop {
    Frame(RenderedFrame),
    Empty,
    Closed,
}

#[derive(Debug)]
pub struct FrameSender {
    sender: SyncSender<RenderedFrame>,
}

#[derive(Debug)]
pub struct FrameReceiver {
    receiver: Receiver<RenderedFrame>,
}

pub fn frame_buffer() -> (FrameSender, FrameReceiver) {
    let (sender, receiver) = mpsc::sync_channel(FRAME_BUFFER_CAPACITY);
    (FrameSender { sender }, FrameReceiver { receiver })
}

impl FrameSender {
    pub fn push(&self, frame: RenderedFrame) -> Result<(), BufferClosed> {
        self.sender.send(frame).map_err(|_| BufferClosed)
    }
}

impl FrameReceiver {
    /// `None` once the buffer is empty and the sender is gone.
    pub fn pop(&self) -> Option<RenderedFrame> {
        self.receiver.recv().ok()
    }

    pub fn try_pop(&self) -> TryPop {
        match self.receiver.try_recv() {
            Ok(frame) => TryPop::Frame(frame),
            Err(TryRecvError::Empty) => TryPop::Empty,
            Err(TryRecvError::Disconnected) => TryPop::Closed,
        }
    }
}
