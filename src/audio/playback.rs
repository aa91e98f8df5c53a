//! Playback output seam.
//!
//! The sequencer plays clips through a [`PlaybackSink`]. The real device
//! sink drives rodio from a dedicated thread; tests collect clips instead.

use async_trait::async_trait;

use crate::audio::clip::AudioClip;
use crate::error::Result;

/// Plays one clip to completion before returning.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<()>;
}

#[async_trait]
impl<T: PlaybackSink + ?Sized> PlaybackSink for std::sync::Arc<T> {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        (**self).play(clip).await
    }
}

/// Drops clips without playing them. Wired when no output device exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

#[async_trait]
impl PlaybackSink for DiscardSink {
    async fn play(&self, _clip: AudioClip) -> Result<()> {
        Ok(())
    }
}

#[cfg(feature = "playback")]
pub use device::DeviceSink;

#[cfg(feature = "playback")]
mod device {
    use std::sync::mpsc;
    use std::thread;

    use async_trait::async_trait;
    use rodio::buffer::SamplesBuffer;

    use crate::audio::clip::AudioClip;
    use crate::error::{Result, VoxpipeError};

    use super::PlaybackSink;

    type PlayRequest = (AudioClip, tokio::sync::oneshot::Sender<()>);

    /// Default-device playback.
    ///
    /// The output stream lives on its own thread for the life of the sink,
    /// so consecutive clips play back-to-back without reopening the device.
    #[derive(Debug)]
    pub struct DeviceSink {
        tx: mpsc::Sender<PlayRequest>,
    }

    impl DeviceSink {
        /// Opens the default output device and starts the playback thread.
        pub fn open() -> Result<Self> {
            let (request_tx, request_rx) = mpsc::channel::<PlayRequest>();
            let (ready_tx, ready_rx) = mpsc::channel();
            thread::Builder::new()
                .name("voxpipe-playback".to_string())
                .spawn(move || playback_thread(request_rx, ready_tx))?;
            match ready_rx.recv() {
                Ok(Ok(())) => Ok(Self { tx: request_tx }),
                Ok(Err(message)) => Err(VoxpipeError::Playback { message }),
                Err(_) => Err(VoxpipeError::Playback {
                    message: "playback thread exited during startup".to_string(),
                }),
            }
        }
    }

    #[async_trait]
    impl PlaybackSink for DeviceSink {
        async fn play(&self, clip: AudioClip) -> Result<()> {
            if clip.is_empty() {
                return Ok(());
            }
            let (done_tx, done_rx) = tokio::sync::oneshot::channel();
            self.tx
                .send((clip, done_tx))
                .map_err(|_| VoxpipeError::Playback {
                    message: "playback thread is gone".to_string(),
                })?;
            done_rx.await.map_err(|_| VoxpipeError::Playback {
                message: "playback thread dropped the clip".to_string(),
            })
        }
    }

    fn playback_thread(
        rx: mpsc::Receiver<PlayRequest>,
        ready: mpsc::Sender<std::result::Result<(), String>>,
    ) {
        let stream = match rodio::OutputStreamBuilder::open_default_stream() {
            Ok(stream) => {
                let _ = ready.send(Ok(()));
                stream
            }
            Err(e) => {
                let _ = ready.send(Err(e.to_string()));
                return;
            }
        };
        while let Ok((clip, done)) = rx.recv() {
            let sink = rodio::Sink::connect_new(stream.mixer());
            sink.append(SamplesBuffer::new(
                clip.channels,
                clip.sample_rate,
                clip.samples,
            ));
            sink.sleep_until_end();
            let _ = done.send(());
        }
    }
}
