//! Local audio output.
//!
//! [`AudioOutput`] is what the player controller drives. [`AudioBackend`] is
//! the real implementation: a worker thread downloads the enclosure, decodes
//! it with symphonia and feeds a cpal output stream through a shared sample
//! buffer.

use std::collections::VecDeque;
use std::io::{Cursor, ErrorKind};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::Time;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Seconds of decoded audio kept ahead of the output stream
const BUFFER_AHEAD_SECS: u32 = 2;
const IDLE_WAIT: Duration = Duration::from_millis(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    /// The current source is ready; duration is known when the container says so
    MetadataLoaded { duration_secs: Option<f64> },
    Ended,
    Error(String),
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no source loaded")]
    NoSource,
    #[error("audio output unavailable: {0}")]
    Unavailable(String),
}

/// One audio element the player controller owns exclusively
pub trait AudioOutput: Send {
    /// Replace the current source; playback stays paused
    fn load(&mut self, url: &str);
    fn play(&mut self) -> Result<(), AudioError>;
    fn pause(&mut self);
    fn unload(&mut self);
    /// Absolute seek, clamped to `[0, duration]`
    fn seek(&mut self, position_secs: f64);
    fn position_secs(&self) -> f64;
    fn duration_secs(&self) -> Option<f64>;
    fn poll_event(&mut self) -> Option<AudioEvent>;
}

enum Command {
    Load { url: String, generation: u64 },
    Seek { secs: f64 },
    Unload,
    Shutdown,
}

/// State shared between the handle, the worker and the output callback
#[derive(Default)]
struct Shared {
    generation: AtomicU64,
    loaded: AtomicBool,
    playing: AtomicBool,
    position_frames: AtomicU64,
    sample_rate: AtomicU32,
    channels: AtomicU32,
    /// Zero when unknown
    duration_millis: AtomicU64,
    buffer: Mutex<VecDeque<f32>>,
    decode_finished: AtomicBool,
    ended_sent: AtomicBool,
    /// Seek requested before the source opened; zero when none
    pending_seek_millis: AtomicU64,
    shutdown: AtomicBool,
    /// Wakes an in-flight download when its generation is replaced
    cancel: Notify,
}

impl Shared {
    fn clear_buffer(&self) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn reset(&self) {
        self.playing.store(false, Ordering::SeqCst);
        self.position_frames.store(0, Ordering::SeqCst);
        // Position reads 0 until the next source reports its rate
        self.sample_rate.store(0, Ordering::SeqCst);
        self.pending_seek_millis.store(0, Ordering::SeqCst);
        self.duration_millis.store(0, Ordering::SeqCst);
        self.decode_finished.store(false, Ordering::SeqCst);
        self.ended_sent.store(false, Ordering::SeqCst);
        self.clear_buffer();
    }

    fn is_cancelled(&self, generation: u64) -> bool {
        self.shutdown.load(Ordering::SeqCst) || self.generation.load(Ordering::SeqCst) != generation
    }

    fn duration_secs(&self) -> Option<f64> {
        match self.duration_millis.load(Ordering::SeqCst) {
            0 => None,
            ms => Some(ms as f64 / 1000.0),
        }
    }
}

/// cpal + symphonia backed [`AudioOutput`]
pub struct AudioBackend {
    commands: Sender<Command>,
    events: Receiver<(u64, AudioEvent)>,
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
}

impl AudioBackend {
    /// Start the worker thread. Downloads run on `runtime`.
    pub fn new(runtime: Handle) -> Result<Self> {
        let (commands, command_rx) = mpsc::channel();
        let (event_tx, events) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to build audio HTTP client")?;

        let worker_shared = shared.clone();
        let worker = thread::Builder::new()
            .name("audio-backend".to_string())
            .spawn(move || Worker::new(runtime, http, worker_shared, event_tx).run(command_rx))
            .context("Failed to spawn audio worker")?;

        info!("Audio backend started");
        Ok(Self {
            commands,
            events,
            shared,
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            error!("Audio worker is gone; command dropped");
        }
    }
}

impl AudioOutput for AudioBackend {
    fn load(&mut self, url: &str) {
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.loaded.store(true, Ordering::SeqCst);
        self.shared.reset();
        self.shared.cancel.notify_waiters();
        debug!(url, generation, "Loading audio source");
        self.send(Command::Load {
            url: url.to_string(),
            generation,
        });
    }

    fn play(&mut self) -> Result<(), AudioError> {
        if !self.shared.loaded.load(Ordering::SeqCst) {
            return Err(AudioError::NoSource);
        }
        self.shared.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.playing.store(false, Ordering::SeqCst);
    }

    fn unload(&mut self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.loaded.store(false, Ordering::SeqCst);
        self.shared.reset();
        self.shared.cancel.notify_waiters();
        self.send(Command::Unload);
    }

    fn seek(&mut self, position_secs: f64) {
        let upper = self.duration_secs().unwrap_or(f64::MAX);
        let secs = position_secs.clamp(0.0, upper);
        let rate = self.shared.sample_rate.load(Ordering::SeqCst);
        if rate > 0 {
            self.shared
                .position_frames
                .store((secs * rate as f64) as u64, Ordering::SeqCst);
        } else {
            // Still opening; the worker applies it once the rate is known
            self.shared
                .pending_seek_millis
                .store((secs * 1000.0) as u64, Ordering::SeqCst);
        }
        self.send(Command::Seek { secs });
    }

    fn position_secs(&self) -> f64 {
        let rate = self.shared.sample_rate.load(Ordering::SeqCst);
        if rate == 0 {
            return 0.0;
        }
        self.shared.position_frames.load(Ordering::SeqCst) as f64 / rate as f64
    }

    fn duration_secs(&self) -> Option<f64> {
        self.shared.duration_secs()
    }

    fn poll_event(&mut self) -> Option<AudioEvent> {
        let current = self.shared.generation.load(Ordering::SeqCst);
        // Events from a replaced source are dropped
        while let Ok((generation, event)) = self.events.try_recv() {
            if generation == current {
                return Some(event);
            }
        }
        None
    }
}

impl Drop for AudioBackend {
    fn drop(&mut self) {
        // Abandon any download in flight so the join below returns promptly
        self.shared.shutdown.store(true, Ordering::SeqCst);
        self.shared.cancel.notify_waiters();
        self.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// A decoded source bound to an open output stream
struct Session {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    // Dropping the stream stops the device callback
    _stream: cpal::Stream,
}

struct Worker {
    runtime: Handle,
    http: reqwest::Client,
    shared: Arc<Shared>,
    events: Sender<(u64, AudioEvent)>,
    generation: u64,
    session: Option<Session>,
}

impl Worker {
    fn new(
        runtime: Handle,
        http: reqwest::Client,
        shared: Arc<Shared>,
        events: Sender<(u64, AudioEvent)>,
    ) -> Self {
        Self {
            runtime,
            http,
            shared,
            events,
            generation: 0,
            session: None,
        }
    }

    fn emit(&self, event: AudioEvent) {
        let _ = self.events.send((self.generation, event));
    }

    fn run(mut self, commands: Receiver<Command>) {
        loop {
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
            let command = if self.wants_samples() {
                match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(mpsc::TryRecvError::Empty) => None,
                    Err(mpsc::TryRecvError::Disconnected) => break,
                }
            } else {
                match commands.recv_timeout(IDLE_WAIT) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            };

            match command {
                Some(Command::Load { url, generation }) => {
                    self.session = None;
                    self.generation = generation;
                    // Drop samples the previous session decoded after the handle reset
                    self.shared.clear_buffer();
                    self.shared.decode_finished.store(false, Ordering::SeqCst);
                    match self.open(&url) {
                        Ok(Some(session)) => {
                            self.session = Some(session);
                            self.emit(AudioEvent::MetadataLoaded {
                                duration_secs: self.shared.duration_secs(),
                            });
                        }
                        Ok(None) => debug!(url = %url, generation, "Audio load cancelled"),
                        Err(e) => {
                            warn!(url = %url, error = %e, "Failed to open audio source");
                            self.emit(AudioEvent::Error(format!("{e:#}")));
                        }
                    }
                }
                Some(Command::Seek { secs }) => self.seek(secs),
                Some(Command::Unload) => {
                    self.session = None;
                    self.shared.clear_buffer();
                }
                Some(Command::Shutdown) => break,
                None => {}
            }

            if self.wants_samples() {
                self.decode_next();
            }
        }
        debug!("Audio worker stopped");
    }

    fn wants_samples(&self) -> bool {
        if self.session.is_none() || self.shared.decode_finished.load(Ordering::SeqCst) {
            return false;
        }
        let ahead = self.shared.sample_rate.load(Ordering::SeqCst) as usize
            * self.shared.channels.load(Ordering::SeqCst) as usize
            * BUFFER_AHEAD_SECS as usize;
        let buffered = self
            .shared
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        buffered < ahead
    }

    /// Fetch the whole enclosure. `None` when a newer load, an unload or
    /// shutdown replaced this generation mid-download.
    fn download(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let generation = self.generation;
        let shared = &self.shared;

        let fetch = async {
            let response = self.http.get(url).send().await?.error_for_status()?;
            let bytes = response.bytes().await?;
            Ok::<_, reqwest::Error>(bytes.to_vec())
        };
        let cancelled = async {
            loop {
                // Registered before the check so a notify in between is not lost
                let notified = shared.cancel.notified();
                if shared.is_cancelled(generation) {
                    return;
                }
                notified.await;
            }
        };

        self.runtime.block_on(async {
            tokio::select! {
                result = fetch => result.map(Some).map_err(anyhow::Error::from),
                () = cancelled => Ok(None),
            }
        })
    }

    fn open(&self, url: &str) -> Result<Option<Session>> {
        let Some(bytes) = self.download(url)? else {
            return Ok(None);
        };
        debug!(url, bytes = bytes.len(), "Downloaded audio source");

        let mut hint = Hint::new();
        if let Some(ext) = url
            .rsplit('/')
            .next()
            .and_then(|name| name.split('?').next())
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext)
        {
            hint.with_extension(ext);
        }

        let source = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                source,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unsupported audio format")?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| anyhow!("No playable audio track"))?;
        let params = &track.codec_params;
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| anyhow!("Unknown sample rate"))?;
        let channels = params.channels.map(|c| c.count()).unwrap_or(2) as u16;
        let duration_millis = params
            .n_frames
            .zip(params.time_base)
            .map(|(frames, base)| {
                let time = base.calc_time(frames);
                time.seconds * 1000 + (time.frac * 1000.0) as u64
            })
            .unwrap_or(0);
        let track_id = track.id;

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .context("Unsupported codec")?;

        self.shared.sample_rate.store(sample_rate, Ordering::SeqCst);
        self.shared.channels.store(channels as u32, Ordering::SeqCst);
        let pending = self.shared.pending_seek_millis.swap(0, Ordering::SeqCst);
        if pending > 0 {
            self.shared
                .position_frames
                .store(pending * u64::from(sample_rate) / 1000, Ordering::SeqCst);
        }
        self.shared
            .duration_millis
            .store(duration_millis, Ordering::SeqCst);

        let stream = self.open_stream(sample_rate, channels)?;
        info!(sample_rate, channels, duration_millis, "Audio source ready");

        Ok(Some(Session {
            format,
            decoder,
            track_id,
            _stream: stream,
        }))
    }

    fn open_stream(&self, sample_rate: u32, channels: u16) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device found"))?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = self.shared.clone();
        let ended = self.events.clone();
        let generation = self.generation;
        let errors = self.events.clone();

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    fill_output(&shared, out, channels, |event| {
                        let _ = ended.send((generation, event));
                    });
                },
                move |e| {
                    error!(error = %e, "Audio stream error");
                    let _ = errors.send((generation, AudioEvent::Error(e.to_string())));
                },
                None,
            )
            .context("Failed to open output stream")?;
        stream.play().context("Failed to start output stream")?;
        Ok(stream)
    }

    fn seek(&mut self, secs: f64) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let rate = self.shared.sample_rate.load(Ordering::SeqCst);
        self.shared
            .position_frames
            .store((secs * rate as f64) as u64, Ordering::SeqCst);
        let target = SeekTo::Time {
            time: Time::new(secs.trunc() as u64, secs.fract()),
            track_id: Some(session.track_id),
        };
        match session.format.seek(SeekMode::Coarse, target) {
            Ok(_) => {
                session.decoder.reset();
                self.shared.clear_buffer();
                self.shared.decode_finished.store(false, Ordering::SeqCst);
                self.shared.ended_sent.store(false, Ordering::SeqCst);
            }
            Err(e) => warn!(secs, error = %e, "Seek failed"),
        }
    }

    fn decode_next(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let packet = match session.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                self.shared.decode_finished.store(true, Ordering::SeqCst);
                return;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read packet");
                self.shared.decode_finished.store(true, Ordering::SeqCst);
                return;
            }
        };
        if packet.track_id() != session.track_id {
            return;
        }

        match session.decoder.decode(&packet) {
            Ok(decoded) => {
                let mut samples = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                samples.copy_interleaved_ref(decoded);
                self.shared
                    .buffer
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(samples.samples());
            }
            // Corrupt frames are skipped
            Err(SymphoniaError::DecodeError(e)) => debug!(error = %e, "Skipping undecodable packet"),
            Err(e) => {
                warn!(error = %e, "Decoder failed");
                self.shared.decode_finished.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Output callback body: drain buffered samples while playing, silence otherwise
fn fill_output(shared: &Shared, out: &mut [f32], channels: u16, on_event: impl FnOnce(AudioEvent)) {
    if !shared.playing.load(Ordering::SeqCst) {
        out.fill(0.0);
        return;
    }

    let mut buffer = shared.buffer.lock().unwrap_or_else(PoisonError::into_inner);
    let available = buffer.len().min(out.len());
    for (slot, sample) in out.iter_mut().zip(buffer.drain(..available)) {
        *slot = sample;
    }
    out[available..].fill(0.0);
    let drained_empty = buffer.is_empty();
    drop(buffer);

    let frames = (available / channels.max(1) as usize) as u64;
    shared.position_frames.fetch_add(frames, Ordering::SeqCst);

    if drained_empty
        && shared.decode_finished.load(Ordering::SeqCst)
        && !shared.ended_sent.swap(true, Ordering::SeqCst)
    {
        shared.playing.store(false, Ordering::SeqCst);
        on_event(AudioEvent::Ended);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn shared_with(samples: &[f32]) -> Shared {
        let shared = Shared::default();
        shared.sample_rate.store(4, Ordering::SeqCst);
        shared.buffer.lock().unwrap().extend(samples);
        shared
    }

    #[test]
    fn paused_output_is_silent_and_keeps_samples() {
        let shared = shared_with(&[0.5; 8]);
        let mut out = [1.0; 4];
        fill_output(&shared, &mut out, 2, |_| panic!("no event expected"));
        assert_eq!(out, [0.0; 4]);
        assert_eq!(shared.buffer.lock().unwrap().len(), 8);
    }

    #[test]
    fn playing_output_advances_position_by_frames() {
        let shared = shared_with(&[0.5; 8]);
        shared.playing.store(true, Ordering::SeqCst);
        let mut out = [0.0; 6];
        fill_output(&shared, &mut out, 2, |_| panic!("no event expected"));
        assert_eq!(out, [0.5; 6]);
        assert_eq!(shared.position_frames.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn end_of_media_is_reported_once() {
        let shared = shared_with(&[0.25; 2]);
        shared.playing.store(true, Ordering::SeqCst);
        shared.decode_finished.store(true, Ordering::SeqCst);

        let mut events = Vec::new();
        let mut out = [0.0; 4];
        fill_output(&shared, &mut out, 2, |e| events.push(e));
        assert_eq!(out, [0.25, 0.25, 0.0, 0.0]);
        assert_eq!(events, vec![AudioEvent::Ended]);
        assert!(!shared.playing.load(Ordering::SeqCst));

        shared.playing.store(true, Ordering::SeqCst);
        fill_output(&shared, &mut out, 2, |e| events.push(e));
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn unknown_duration_is_none() {
        let shared = Shared::default();
        assert_eq!(shared.duration_secs(), None);
        shared.duration_millis.store(1500, Ordering::SeqCst);
        assert_eq!(shared.duration_secs(), Some(1.5));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn replacing_the_source_cancels_a_download_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![0u8; 16])
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;

        let shared = Arc::new(Shared::default());
        shared.generation.store(1, Ordering::SeqCst);
        let runtime = Handle::current();
        let url = format!("{}/episode.mp3", server.uri());
        let worker_shared = shared.clone();
        let download = thread::spawn(move || {
            let (events, _rx) = mpsc::channel();
            let mut worker = Worker::new(runtime, reqwest::Client::new(), worker_shared, events);
            worker.generation = 1;
            worker.download(&url).map_err(|e| e.to_string())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        let started = Instant::now();
        shared.generation.store(2, Ordering::SeqCst);
        shared.cancel.notify_waiters();

        let result = tokio::task::spawn_blocking(move || download.join().unwrap())
            .await
            .unwrap();
        assert_eq!(result, Ok(None));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn seek_before_open_is_kept_for_the_worker() {
        let mut backend = AudioBackend::new(Handle::current()).unwrap();
        backend.seek(42.0);
        assert_eq!(backend.shared.pending_seek_millis.load(Ordering::SeqCst), 42_000);
        assert_eq!(backend.position_secs(), 0.0);
    }
}
