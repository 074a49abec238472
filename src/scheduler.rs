use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::audio::AudioPlayer;
use crate::buffer::{FrameReceiver, TryPop};
use crate::producer::FrameProducer;
use crate::shutdown::{ShutdownCause, ShutdownSignal};
use crate::terminal::{write_frame, TerminalGuard};

/// Sleep between polls of an empty buffer; also the scheduler's shutdown latency.
pub const EMPTY_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Draining,
    Stopped,
}

/// Background workers the scheduler tears down when it reaches `Stopped`.
pub struct Workers {
    pub producer: FrameProducer,
    pub audio: Option<AudioPlayer>,
}

#[derive(Debug)]
pub struct PlaybackReport {
    pub frames_displayed: u64,
    pub frames_produced: u64,
    pub interrupted: bool,
    pub decoder_released: bool,
}

pub fn frame_interval(fps: f64) -> Duration {
    Duration::from_secs_f64(1.0 / fps)
}

pub struct PlaybackScheduler<W: Write> {
    out: W,
    frame_interval: Duration,
    shutdown: ShutdownSignal,
    state: SchedulerState,
}

impl<W: Write> PlaybackScheduler<W> {
    pub fn new(out: W, frame_interval: Duration, shutdown: ShutdownSignal) -> Self {
        Self {
            out,
            frame_interval,
            shutdown,
            state: SchedulerState::Running,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Displays frames until shutdown, then joins the workers and releases the decoder.
    ///
    /// After an end-of-stream shutdown, frames already buffered are still shown; after
    /// an interrupt, display stops immediately.
    pub fn run(&mut self, receiver: FrameReceiver, workers: Workers) -> Result<PlaybackReport> {
        let mut receiver = Some(receiver);
        let mut frames_displayed = 0_u64;
        let display_result = self.display_frames(&mut receiver, &mut frames_displayed);
        if display_result.is_err() {
            // Terminal is gone; the workers still have to be stopped.
            self.shutdown.trigger(ShutdownCause::Interrupt);
        }

        self.state = SchedulerState::Draining;
        tracing::debug!(frames = frames_displayed, "draining playback");
        // Unblocks a producer waiting on a full buffer.
        drop(receiver.take());

        self.state = SchedulerState::Stopped;
        let report = stop_workers(workers, frames_displayed, self.shutdown.is_interrupted());
        display_result?;
        report
    }

    fn display_frames(
        &mut self,
        receiver: &mut Option<FrameReceiver>,
        frames_displayed: &mut u64,
    ) -> Result<()> {
        let Some(frames) = receiver.as_ref() else {
            return Ok(());
        };
        let mut display = TerminalGuard::new(&mut self.out)?;

        while self.state == SchedulerState::Running {
            match self.shutdown.cause() {
                Some(ShutdownCause::Interrupt) => break,
                Some(ShutdownCause::EndOfStream) | None => {}
            }

            let started = Instant::now();
            match frames.try_pop() {
                TryPop::Empty => {
                    thread::sleep(EMPTY_POLL_INTERVAL);
                    continue;
                }
                TryPop::Closed => {
                    self.shutdown.trigger(ShutdownCause::EndOfStream);
                    break;
                }
                TryPop::Frame(frame) => {
                    write_frame(display.writer(), frame.text())?;
                    *frames_displayed += 1;
                }
            }

            let elapsed = started.elapsed();
            if elapsed < self.frame_interval {
                thread::sleep(self.frame_interval - elapsed);
            }
        }
        Ok(())
    }
}

fn stop_workers(workers: Workers, frames_displayed: u64, interrupted: bool) -> Result<PlaybackReport> {
    let Workers { producer, audio } = workers;

    let producer_exit = producer.join();
    let audio_result = match audio {
        Some(player) => player.join(),
        None => Ok(()),
    };

    let mut exit = producer_exit?;
    let decoder_released = exit.decoder.release();
    tracing::info!(
        frames_produced = exit.frames_produced,
        frames_displayed,
        "playback stopped, decoder released"
    );

    exit.outcome?;
    audio_result?;

    Ok(PlaybackReport {
        frames_displayed,
        frames_produced: exit.frames_produced,
        interrupted,
        decoder_released,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::buffer::{frame_buffer, FRAME_BUFFER_CAPACITY};
    use crate::decoding::{DecoderHandle, FrameSource};
    use crate::frame::RgbFrame;
    use crate::geometry::GlyphGrid;
    use crate::frame::RenderedFrame;
    use crate::producer::ProducerConfig;

    struct EndlessSource {
        releases: Arc<AtomicUsize>,
    }

    impl FrameSource for EndlessSource {
        fn dimensions(&self) -> (u32, u32) {
            (1, 1)
        }

        fn frame_rate(&self) -> f64 {
            30.0
        }

        fn read_frame(&mut self) -> Result<Option<RgbFrame>> {
            Ok(Some(RgbFrame::filled(1, 1, [128, 128, 128])))
        }

        fn release(&mut self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn frame_interval_is_reciprocal_of_fps() {
        assert_eq!(frame_interval(30.0), Duration::from_secs_f64(1.0 / 30.0));
        assert_eq!(frame_interval(1.0), Duration::from_secs(1));
    }

    #[test]
    fn interrupt_stops_display_and_releases_decoder_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let shutdown = ShutdownSignal::new();
        let (sender, receiver) = frame_buffer();
        let producer = FrameProducer::spawn(
            DecoderHandle::new(Box::new(EndlessSource {
                releases: releases.clone(),
            })),
            sender,
            ProducerConfig {
                grid: GlyphGrid { width: 1, height: 1 },
                color: false,
            },
            shutdown.clone(),
        )
        .expect("producer should spawn");

        let interrupter = shutdown.clone();
        let trigger = thread::spawn(move || {
            thread::sleep(Duration::from_millis(80));
            interrupter.trigger(ShutdownCause::Interrupt);
        });

        let mut scheduler =
            PlaybackScheduler::new(Vec::new(), frame_interval(100.0), shutdown.clone());
        let report = scheduler
            .run(
                receiver,
                Workers {
                    producer,
                    audio: None,
                },
            )
            .expect("playback should stop cleanly");
        trigger.join().expect("trigger thread should not panic");

        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(report.interrupted);
        assert!(report.decoder_released);
        assert!(report.frames_displayed > 0);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
    }

    /// Fills the buffer to capacity, sets `cause`, then runs the scheduler. The producer
    /// sees the signal on its first check and exits without decoding.
    fn run_with_full_buffer(cause: ShutdownCause) -> (PlaybackReport, String, usize) {
        let releases = Arc::new(AtomicUsize::new(0));
        let shutdown = ShutdownSignal::new();
        let (sender, receiver) = frame_buffer();
        for index in 0..FRAME_BUFFER_CAPACITY as u64 {
            sender
                .push(RenderedFrame::new(index, format!("<{index}>")))
                .expect("push should succeed");
        }
        shutdown.trigger(cause);

        let producer = FrameProducer::spawn(
            DecoderHandle::new(Box::new(EndlessSource {
                releases: releases.clone(),
            })),
            sender,
            ProducerConfig {
                grid: GlyphGrid { width: 1, height: 1 },
                color: false,
            },
            shutdown.clone(),
        )
        .expect("producer should spawn");

        let mut scheduler = PlaybackScheduler::new(Vec::new(), frame_interval(1000.0), shutdown);
        let report = scheduler
            .run(
                receiver,
                Workers {
                    producer,
                    audio: None,
                },
            )
            .expect("playback should stop cleanly");
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        let written = String::from_utf8(scheduler.into_output()).expect("utf8 output");
        (report, written, releases.load(Ordering::SeqCst))
    }

    #[test]
    fn interrupt_shows_none_of_the_buffered_frames() {
        let (report, written, releases) = run_with_full_buffer(ShutdownCause::Interrupt);
        assert_eq!(report.frames_displayed, 0);
        assert_eq!(report.frames_produced, 0);
        assert!(report.interrupted);
        assert!(!written.contains("<0>"));
        assert_eq!(releases, 1);
    }

    #[test]
    fn end_of_stream_shows_every_buffered_frame_in_order() {
        let (report, written, releases) = run_with_full_buffer(ShutdownCause::EndOfStream);
        assert_eq!(report.frames_displayed, FRAME_BUFFER_CAPACITY as u64);
        assert!(!report.interrupted);

        let positions = (0..FRAME_BUFFER_CAPACITY)
            .map(|index| {
                written
                    .find(&format!("<{index}>"))
                    .unwrap_or_else(|| panic!("frame {index} was not written"))
            })
            .collect::<Vec<_>>();
        assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(releases, 1);
    }
}
