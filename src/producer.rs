use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};

use crate::buffer::FrameSender;
use crate::decoding::DecoderHandle;
use crate::geometry::GlyphGrid;
use crate::glyph::render_frame;
use crate::shutdown::{ShutdownCause, ShutdownSignal};

#[derive(Debug, Clone, Copy)]
pub struct ProducerConfig {
    pub grid: GlyphGrid,
    pub color: bool,
}

/// What the producer hands back on join: the decoder (still unreleased) and how it ended.
pub struct ProducerExit {
    pub decoder: DecoderHandle,
    pub frames_produced: u64,
    pub outcome: Result<()>,
}

pub struct FrameProducer {
    worker: Option<JoinHandle<ProducerExit>>,
}

impl FrameProducer {
    pub fn spawn(
        decoder: DecoderHandle,
        sender: FrameSender,
        config: ProducerConfig,
        shutdown: ShutdownSignal,
    ) -> Result<Self> {
        let worker = thread::Builder::new()
            .name("glyphreel-frame-producer".to_owned())
            .spawn(move || produce_frames(decoder, sender, config, shutdown))
            .context("failed to spawn frame producer thread")?;
        Ok(Self {
            worker: Some(worker),
        })
    }

    /// `Err` only if the worker panicked; the decoder was dropped, and so released, during unwinding.
    pub fn join(mut self) -> Result<ProducerExit> {
        let handle = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("frame producer thread missing"))?;
        handle
            .join()
            .map_err(|_| anyhow!("frame producer thread panicked"))
    }
}

/// Decode, rescale, render, push; the shutdown signal is checked once per frame.
pub fn produce_frames(
    mut decoder: DecoderHandle,
    sender: FrameSender,
    config: ProducerConfig,
    shutdown: ShutdownSignal,
) -> ProducerExit {
    let mut frames_produced = 0_u64;
    let outcome = loop {
        if shutdown.is_triggered() {
            break Ok(());
        }
        let Some(source) = decoder.source_mut() else {
            break Err(anyhow!("decoder was released while producing"));
        };

        let frame = match source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                tracing::info!(frames = frames_produced, "end of stream");
                shutdown.trigger(ShutdownCause::EndOfStream);
                break Ok(());
            }
            Err(error) => {
                shutdown.trigger(ShutdownCause::EndOfStream);
                break Err(error.context(format!("failed to decode frame {frames_produced}")));
            }
        };

        let scaled = match frame.rescale(config.grid) {
            Ok(scaled) => scaled,
            Err(error) => {
                shutdown.trigger(ShutdownCause::EndOfStream);
                break Err(error.context(format!("failed to rescale frame {frames_produced}")));
            }
        };

        let rendered = render_frame(&scaled, config.color, frames_produced);
        if sender.push(rendered).is_err() {
            // Scheduler is gone; nothing left to feed.
            break Ok(());
        }
        frames_produced += 1;
    };

    ProducerExit {
        decoder,
        frames_produced,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::buffer::{frame_buffer, FRAME_BUFFER_CAPACITY};
    use crate::decoding::FrameSource;
    use crate::frame::RgbFrame;

    struct ScriptedSource {
        frames: Vec<[u8; 3]>,
        endless: bool,
        reads: Arc<AtomicUsize>,
    }

    impl FrameSource for ScriptedSource {
        fn dimensions(&self) -> (u32, u32) {
            (1, 1)
        }

        fn frame_rate(&self) -> f64 {
            30.0
        }

        fn read_frame(&mut self) -> Result<Option<RgbFrame>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            if self.endless {
                return Ok(Some(RgbFrame::filled(1, 1, [0, 0, 0])));
            }
            if self.frames.is_empty() {
                return Ok(None);
            }
            Ok(Some(RgbFrame::filled(1, 1, self.frames.remove(0))))
        }

        fn release(&mut self) {}
    }

    fn config() -> ProducerConfig {
        ProducerConfig {
            grid: GlyphGrid { width: 1, height: 1 },
            color: false,
        }
    }

    #[test]
    fn end_of_stream_sets_shutdown_and_keeps_order() {
        let reads = Arc::new(AtomicUsize::new(0));
        let decoder = DecoderHandle::new(Box::new(ScriptedSource {
            frames: vec![[0, 0, 0], [255, 255, 255]],
            endless: false,
            reads,
        }));
        let (sender, receiver) = frame_buffer();
        let shutdown = ShutdownSignal::new();

        let exit = produce_frames(decoder, sender, config(), shutdown.clone());
        assert!(exit.outcome.is_ok());
        assert_eq!(exit.frames_produced, 2);
        assert_eq!(shutdown.cause(), Some(ShutdownCause::EndOfStream));

        let texts = std::iter::from_fn(|| receiver.pop())
            .map(|frame| frame.text().to_owned())
            .collect::<Vec<_>>();
        assert_eq!(texts, vec!["@".to_owned(), " ".to_owned()]);
    }

    #[test]
    fn preset_shutdown_stops_before_decoding() {
        let reads = Arc::new(AtomicUsize::new(0));
        let decoder = DecoderHandle::new(Box::new(ScriptedSource {
            frames: Vec::new(),
            endless: true,
            reads: reads.clone(),
        }));
        let (sender, _receiver) = frame_buffer();
        let shutdown = ShutdownSignal::new();
        shutdown.trigger(ShutdownCause::Interrupt);

        let exit = produce_frames(decoder, sender, config(), shutdown);
        assert_eq!(exit.frames_produced, 0);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn blocked_producer_exits_when_receiver_is_dropped() {
        let reads = Arc::new(AtomicUsize::new(0));
        let decoder = DecoderHandle::new(Box::new(ScriptedSource {
            frames: Vec::new(),
            endless: true,
            reads,
        }));
        let (sender, receiver) = frame_buffer();
        let producer = FrameProducer::spawn(decoder, sender, config(), ShutdownSignal::new())
            .expect("producer should spawn");

        std::thread::sleep(std::time::Duration::from_millis(50));
        drop(receiver);
        let exit = producer.join().expect("producer should not panic");
        assert!(exit.outcome.is_ok());
        assert!(exit.frames_produced >= FRAME_BUFFER_CAPACITY as u64);
    }
}
