// =============================================================================
// FFMPEG PLAYER - ONE DECODER PROCESS PER GRID SLOT
// =============================================================================
//
// Each session owns a worker thread that drives an ffmpeg child process:
// - video frames (scaled RGBA) arrive on stdout, audio (f32le stereo) on stderr
// - reader threads fill a paced frame queue and an audio ring buffer
// - a rodio Sink plays the ring buffer; its volume is the session's gain
// - the position is a wall clock anchored at the last play/seek
//
// The handle (`FfmpegBackend`) only sends commands and reads shared state,
// so transport calls from the coordinator never block on ffmpeg.
//
// =============================================================================

use std::collections::VecDeque;
use std::ffi::OsString;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rodio::{OutputStream, OutputStreamHandle, Sink, Source};

use crate::core::error::BackendError;
use crate::playback::backend::{BackendEventKind, BackendFactory, EventSink, PlayerBackend, VideoFrame};
use crate::video::probe::{self, MediaInfo};
use crate::video::runtime::{DecoderGuard, MediaRuntime};

const SAMPLE_RATE: u32 = 48_000;
const CHANNELS: u16 = 2;
/// Nine decoders at once: no slot needs more than this
const MAX_FRAME_RATE: f64 = 30.0;
const MAX_QUEUED_FRAMES: usize = 60;

/// Size every decoded frame is scaled (and letterboxed) to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    fn bytes(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }

    fn scale_filter(&self) -> String {
        format!(
            "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2",
            w = self.width,
            h = self.height
        )
    }
}

// =============================================================================
// COMMANDS AND SHARED STATE
// =============================================================================

#[derive(Debug)]
enum WorkerCommand {
    Load { path: PathBuf, load_id: u64 },
    Play,
    Pause,
    Stop,
    Seek(f64),
    SetGain(f32),
    Shutdown,
}

/// Playback position as seen by both the handle and the worker
#[derive(Debug, Default)]
struct PlaybackClock {
    anchor: f64,
    started_at: Option<Instant>,
    duration: Option<f64>,
}

impl PlaybackClock {
    fn position_at(&self, now: Instant) -> f64 {
        let position = match self.started_at {
            Some(start) => self.anchor + now.saturating_duration_since(start).as_secs_f64(),
            None => self.anchor,
        };
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    fn start(&mut self, now: Instant) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    fn freeze(&mut self, now: Instant) {
        self.anchor = self.position_at(now);
        self.started_at = None;
    }

    fn jump(&mut self, position: f64, now: Instant) {
        self.anchor = position.max(0.0);
        if self.started_at.is_some() {
            self.started_at = Some(now);
        }
    }

    fn has_reached_end(&self, now: Instant) -> bool {
        self.is_running() && self.duration.is_some_and(|d| self.position_at(now) >= d)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// AUDIO SOURCE - Streams audio samples from a ring buffer
// =============================================================================

struct AudioBuffer {
    samples: Vec<f32>,
    read_pos: usize,
    write_pos: usize,
    capacity: usize,
}

impl AudioBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
            read_pos: 0,
            write_pos: 0,
            capacity,
        }
    }

    fn write(&mut self, data: &[f32]) -> usize {
        let mut written = 0;
        for &sample in data {
            let next_write = (self.write_pos + 1) % self.capacity;
            if next_write == self.read_pos {
                break; // Full
            }
            self.samples[self.write_pos] = sample;
            self.write_pos = next_write;
            written += 1;
        }
        written
    }

    fn read(&mut self) -> Option<f32> {
        if self.read_pos == self.write_pos {
            return None;
        }
        let sample = self.samples[self.read_pos];
        self.read_pos = (self.read_pos + 1) % self.capacity;
        Some(sample)
    }

    fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    fn available(&self) -> usize {
        if self.write_pos >= self.read_pos {
            self.write_pos - self.read_pos
        } else {
            self.capacity - self.read_pos + self.write_pos
        }
    }
}

/// rodio source that plays whatever the audio reader has buffered,
/// silence on underrun
struct StreamingAudioSource {
    buffer: Arc<Mutex<AudioBuffer>>,
    stop_flag: Arc<AtomicBool>,
}

impl Iterator for StreamingAudioSource {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stop_flag.load(Ordering::Relaxed) {
            return None;
        }
        Some(lock(&self.buffer).read().unwrap_or(0.0))
    }
}

impl Source for StreamingAudioSource {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        CHANNELS
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

struct AudioOutput {
    sink: Sink,
    stop_flag: Arc<AtomicBool>,
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.sink.stop();
    }
}

// =============================================================================
// DECODER PROCESS
// =============================================================================

/// ffmpeg arguments for streaming `path` from `start` seconds
fn decoder_args(path: &Path, start: f64, frame_rate: f64, has_audio: bool, size: FrameSize) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-loglevel".into(),
        "quiet".into(),
        "-re".into(),
        "-ss".into(),
        format!("{:.3}", start).into(),
        "-i".into(),
        path.as_os_str().to_owned(),
        "-map".into(),
        "0:v:0".into(),
        "-vf".into(),
        size.scale_filter().into(),
        "-r".into(),
        format!("{:.3}", frame_rate).into(),
        "-f".into(),
        "rawvideo".into(),
        "-pix_fmt".into(),
        "rgba".into(),
        "pipe:1".into(),
    ];

    if has_audio {
        for arg in ["-map", "0:a:0", "-f", "f32le", "-ac", "2", "-ar", "48000", "pipe:2"] {
            args.push(arg.into());
        }
    }
    args
}

/// A running ffmpeg child plus its reader threads. Dropping it kills the
/// process and joins the readers.
struct Decoder {
    child: Child,
    frames: Arc<Mutex<VecDeque<VideoFrame>>>,
    stop_flag: Arc<AtomicBool>,
    video_reader: Option<JoinHandle<()>>,
    audio_reader: Option<JoinHandle<()>>,
    _guard: DecoderGuard,
}

impl Decoder {
    fn start(
        runtime: &MediaRuntime,
        path: &Path,
        info: &MediaInfo,
        start: f64,
        size: FrameSize,
        audio_buffer: &Arc<Mutex<AudioBuffer>>,
    ) -> Result<Self, String> {
        let frame_rate = info.frame_rate.min(MAX_FRAME_RATE);

        let mut child = runtime
            .ffmpeg_command()
            .args(decoder_args(path, start, frame_rate, info.has_audio, size))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(if info.has_audio { Stdio::piped() } else { Stdio::null() })
            .spawn()
            .map_err(|e| format!("failed to spawn ffmpeg: {}", e))?;
        let guard = runtime.track_decoder();

        let frames = Arc::new(Mutex::new(VecDeque::new()));
        let stop_flag = Arc::new(AtomicBool::new(false));

        let video_reader = child.stdout.take().map(|stdout| {
            let frames = Arc::clone(&frames);
            let stop_flag = Arc::clone(&stop_flag);
            thread::spawn(move || read_video(stdout, frames, stop_flag, size, frame_rate, start))
        });

        let audio_reader = child.stderr.take().map(|stderr| {
            let buffer = Arc::clone(audio_buffer);
            let stop_flag = Arc::clone(&stop_flag);
            thread::spawn(move || read_audio(stderr, buffer, stop_flag))
        });

        Ok(Self {
            child,
            frames,
            stop_flag,
            video_reader,
            audio_reader,
            _guard: guard,
        })
    }

    /// Newest frame whose timestamp has come due; older due frames are skipped
    fn take_due(&self, position: f64) -> Option<VideoFrame> {
        let mut frames = lock(&self.frames);
        let mut due = None;
        while frames.front().is_some_and(|f| f.timestamp <= position) {
            due = frames.pop_front();
        }
        due
    }

    fn exit_status(&mut self) -> Option<ExitStatus> {
        self.child.try_wait().ok().flatten()
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        // Killing the child closes the pipes, which unblocks the readers
        if let Err(e) = self.child.kill() {
            log::debug!("ffmpeg already exited: {}", e);
        }
        let _ = self.child.wait();

        for handle in [self.video_reader.take(), self.audio_reader.take()].into_iter().flatten() {
            let _ = handle.join();
        }
    }
}

fn read_video(
    mut stdout: ChildStdout,
    frames: Arc<Mutex<VecDeque<VideoFrame>>>,
    stop_flag: Arc<AtomicBool>,
    size: FrameSize,
    frame_rate: f64,
    start: f64,
) {
    let frame_duration = 1.0 / frame_rate;
    let mut buffer = vec![0u8; size.bytes()];
    let mut frame_index = 0u64;

    while !stop_flag.load(Ordering::Relaxed) {
        if let Err(e) = stdout.read_exact(&mut buffer) {
            if e.kind() != std::io::ErrorKind::UnexpectedEof {
                log::debug!("Video reader error: {}", e);
            }
            break;
        }

        let frame = VideoFrame {
            image_data: buffer.clone(),
            width: size.width,
            height: size.height,
            timestamp: start + frame_index as f64 * frame_duration,
        };

        let mut queue = lock(&frames);
        if queue.len() >= MAX_QUEUED_FRAMES {
            queue.pop_front();
        }
        queue.push_back(frame);
        frame_index += 1;
    }

    log::debug!("Video reader stopped after {} frames", frame_index);
}

fn read_audio(mut stderr: ChildStderr, audio_buffer: Arc<Mutex<AudioBuffer>>, stop_flag: Arc<AtomicBool>) {
    // Whole samples only, so reads never split an f32
    let mut bytes = vec![0u8; 4096];
    let mut total_samples = 0u64;

    while !stop_flag.load(Ordering::Relaxed) {
        if stderr.read_exact(&mut bytes).is_err() {
            break;
        }
        let samples: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        lock(&audio_buffer).write(&samples);
        total_samples += samples.len() as u64;
    }

    log::debug!("Audio reader stopped after {} samples", total_samples);
}

/// One still frame at `timestamp`, shown while paused or stopped
fn extract_frame(runtime: &MediaRuntime, path: &Path, timestamp: f64, size: FrameSize) -> Result<VideoFrame, String> {
    let output = runtime
        .ffmpeg_command()
        .arg("-loglevel")
        .arg("quiet")
        .arg("-ss")
        .arg(format!("{:.3}", timestamp))
        .arg("-i")
        .arg(path)
        .arg("-frames:v")
        .arg("1")
        .arg("-vf")
        .arg(size.scale_filter())
        .arg("-f")
        .arg("rawvideo")
        .arg("-pix_fmt")
        .arg("rgba")
        .arg("-")
        .output()
        .map_err(|e| format!("ffmpeg execution failed: {}", e))?;

    if !output.status.success() {
        return Err(format!("ffmpeg exited with {}", output.status));
    }
    if output.stdout.len() != size.bytes() {
        return Err(format!("unexpected frame size {} (expected {})", output.stdout.len(), size.bytes()));
    }

    Ok(VideoFrame {
        image_data: output.stdout,
        width: size.width,
        height: size.height,
        timestamp,
    })
}

// =============================================================================
// PLAYBACK WORKER
// =============================================================================

struct LoadedMedia {
    path: PathBuf,
    load_id: u64,
    info: MediaInfo,
}

struct PlaybackWorker {
    runtime: MediaRuntime,
    frame_size: FrameSize,
    events: EventSink,
    clock: Arc<Mutex<PlaybackClock>>,
    latest_frame: Arc<Mutex<Option<VideoFrame>>>,
    media: Option<LoadedMedia>,
    decoder: Option<Decoder>,
    audio_buffer: Arc<Mutex<AudioBuffer>>,
    audio: Option<AudioOutput>,
    output: Option<OutputStreamHandle>,
    gain: f32,
}

impl PlaybackWorker {
    fn run(mut self, commands: mpsc::Receiver<WorkerCommand>) {
        let slot = self.events.slot();
        // The stream must outlive every sink created from its handle
        let _stream: Option<OutputStream> = match OutputStream::try_default() {
            Ok((stream, handle)) => {
                self.output = Some(handle);
                Some(stream)
            }
            Err(e) => {
                log::warn!("Slot {}: no audio output ({}), playing without sound", slot, e);
                None
            }
        };
        log::debug!("Playback worker for slot {} started", slot);

        loop {
            let timeout = if self.decoder.is_some() {
                Duration::from_millis(8)
            } else {
                Duration::from_millis(50)
            };

            match commands.recv_timeout(timeout) {
                Ok(WorkerCommand::Load { path, load_id }) => self.load(path, load_id),
                Ok(WorkerCommand::Play) => self.play(),
                Ok(WorkerCommand::Pause) => self.halt(),
                Ok(WorkerCommand::Stop) => {
                    self.halt();
                    self.show_still(0.0);
                }
                Ok(WorkerCommand::Seek(position)) => self.seek(position),
                Ok(WorkerCommand::SetGain(gain)) => {
                    self.gain = gain;
                    if let Some(audio) = &self.audio {
                        audio.sink.set_volume(gain);
                    }
                }
                Ok(WorkerCommand::Shutdown) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => self.tick(),
            }
        }

        self.halt();
        log::debug!("Playback worker for slot {} exited", slot);
    }

    fn load(&mut self, path: PathBuf, load_id: u64) {
        self.halt();
        self.media = None;

        match probe::probe(&self.runtime, &path) {
            Ok(info) => {
                log::debug!(
                    "Slot {}: {} ({:?}, {:.2} fps, audio: {})",
                    self.events.slot(),
                    path.display(),
                    info.duration,
                    info.frame_rate,
                    info.has_audio
                );
                lock(&self.clock).duration = info.duration.map(|d| d.as_secs_f64());
                self.media = Some(LoadedMedia { path, load_id, info });
                self.show_still(0.0);
            }
            Err(e) => {
                log::warn!("Slot {}: {}", self.events.slot(), e);
                self.events.emit(load_id, BackendEventKind::Error(e.to_string()));
            }
        }
    }

    fn play(&mut self) {
        if self.decoder.is_some() || self.media.is_none() {
            return;
        }
        let position = lock(&self.clock).position_at(Instant::now());
        self.start_decoder(position);
    }

    fn seek(&mut self, position: f64) {
        let was_running = self.decoder.is_some();
        self.halt();
        if was_running {
            self.start_decoder(position);
        } else {
            self.show_still(position);
        }
    }

    fn start_decoder(&mut self, position: f64) {
        let Some(media) = &self.media else {
            return;
        };

        lock(&self.audio_buffer).clear();
        match Decoder::start(&self.runtime, &media.path, &media.info, position, self.frame_size, &self.audio_buffer) {
            Ok(decoder) => {
                let has_audio = media.info.has_audio;
                self.decoder = Some(decoder);
                if has_audio {
                    self.start_audio();
                }
            }
            Err(e) => {
                log::error!("Slot {}: {}", self.events.slot(), e);
                let load_id = media.load_id;
                self.events.emit(load_id, BackendEventKind::Error(e));
            }
        }
    }

    fn start_audio(&mut self) {
        let Some(handle) = &self.output else {
            return;
        };
        match Sink::try_new(handle) {
            Ok(sink) => {
                let stop_flag = Arc::new(AtomicBool::new(false));
                sink.set_volume(self.gain);
                sink.append(StreamingAudioSource {
                    buffer: Arc::clone(&self.audio_buffer),
                    stop_flag: Arc::clone(&stop_flag),
                });
                sink.play();
                self.audio = Some(AudioOutput { sink, stop_flag });
            }
            Err(e) => log::warn!("Slot {}: failed to open audio sink: {}", self.events.slot(), e),
        }
    }

    /// Stop decoding and audio; the last frame stays on screen
    fn halt(&mut self) {
        self.audio = None;
        self.decoder = None;
        lock(&self.audio_buffer).clear();
    }

    fn show_still(&mut self, position: f64) {
        let Some(media) = &self.media else {
            return;
        };
        match extract_frame(&self.runtime, &media.path, position, self.frame_size) {
            Ok(frame) => *lock(&self.latest_frame) = Some(frame),
            Err(e) => log::debug!("Slot {}: no still frame at {:.2}s: {}", self.events.slot(), position, e),
        }
    }

    fn tick(&mut self) {
        let Some(load_id) = self.media.as_ref().map(|m| m.load_id) else {
            return;
        };
        let now = Instant::now();
        let (position, reached_end, duration_known) = {
            let clock = lock(&self.clock);
            (clock.position_at(now), clock.has_reached_end(now), clock.duration.is_some())
        };

        if reached_end {
            self.finish(now, load_id, BackendEventKind::EndReached);
            return;
        }

        let Some(decoder) = &mut self.decoder else {
            return;
        };
        if let Some(frame) = decoder.take_due(position) {
            *lock(&self.latest_frame) = Some(frame);
        }

        match decoder.exit_status() {
            Some(status) if !status.success() => {
                let message = format!("decoder exited with {}", status);
                self.finish(now, load_id, BackendEventKind::Error(message));
            }
            // Without a duration the end of the process is the end of the stream
            Some(_) if !duration_known => self.finish(now, load_id, BackendEventKind::EndReached),
            _ => {}
        }
    }

    fn finish(&mut self, now: Instant, load_id: u64, kind: BackendEventKind) {
        self.halt();
        lock(&self.clock).freeze(now);
        self.events.emit(load_id, kind);
    }
}

// =============================================================================
// BACKEND HANDLE
// =============================================================================

pub struct FfmpegBackend {
    slot: usize,
    commands: mpsc::Sender<WorkerCommand>,
    clock: Arc<Mutex<PlaybackClock>>,
    latest_frame: Arc<Mutex<Option<VideoFrame>>>,
    worker: Option<JoinHandle<()>>,
    volume: u8,
    muted: bool,
}

impl FfmpegBackend {
    pub fn spawn(runtime: MediaRuntime, frame_size: FrameSize, events: EventSink) -> Result<Self, BackendError> {
        let slot = events.slot();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let clock = Arc::new(Mutex::new(PlaybackClock::default()));
        let latest_frame = Arc::new(Mutex::new(None));

        let worker = PlaybackWorker {
            runtime,
            frame_size,
            events,
            clock: Arc::clone(&clock),
            latest_frame: Arc::clone(&latest_frame),
            media: None,
            decoder: None,
            audio_buffer: Arc::new(Mutex::new(AudioBuffer::new(SAMPLE_RATE as usize * CHANNELS as usize * 2))),
            audio: None,
            output: None,
            gain: 1.0,
        };

        let handle = thread::Builder::new()
            .name(format!("playback-slot-{}", slot))
            .spawn(move || worker.run(cmd_rx))
            .map_err(|e| BackendError::Spawn(e.to_string()))?;

        Ok(Self {
            slot,
            commands: cmd_tx,
            clock,
            latest_frame,
            worker: Some(handle),
            volume: 100,
            muted: false,
        })
    }

    fn send(&self, command: WorkerCommand) -> Result<(), BackendError> {
        self.commands
            .send(command)
            .map_err(|_| BackendError::Disconnected(self.slot))
    }

    fn send_or_log(&self, command: WorkerCommand) {
        if let Err(e) = self.send(command) {
            log::warn!("{}", e);
        }
    }

    fn gain(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.volume as f32 / 100.0
        }
    }
}

impl PlayerBackend for FfmpegBackend {
    fn load(&mut self, path: &Path, load_id: u64) -> Result<(), BackendError> {
        if !path.is_file() {
            return Err(BackendError::Load {
                path: path.to_path_buf(),
                reason: "file not found".to_string(),
            });
        }

        *lock(&self.clock) = PlaybackClock::default();
        lock(&self.latest_frame).take();
        self.send(WorkerCommand::Load {
            path: path.to_path_buf(),
            load_id,
        })
    }

    fn play(&mut self) {
        lock(&self.clock).start(Instant::now());
        self.send_or_log(WorkerCommand::Play);
    }

    fn pause(&mut self) {
        lock(&self.clock).freeze(Instant::now());
        self.send_or_log(WorkerCommand::Pause);
    }

    fn stop(&mut self) {
        {
            let mut clock = lock(&self.clock);
            let now = Instant::now();
            clock.jump(0.0, now);
            clock.freeze(now);
        }
        self.send_or_log(WorkerCommand::Stop);
    }

    fn seek(&mut self, position: Duration) {
        let seconds = position.as_secs_f64();
        lock(&self.clock).jump(seconds, Instant::now());
        self.send_or_log(WorkerCommand::Seek(seconds));
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.send_or_log(WorkerCommand::SetGain(self.gain()));
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.send_or_log(WorkerCommand::SetGain(self.gain()));
    }

    fn position(&self) -> Duration {
        Duration::from_secs_f64(lock(&self.clock).position_at(Instant::now()).max(0.0))
    }

    fn duration(&self) -> Option<Duration> {
        lock(&self.clock).duration.map(Duration::from_secs_f64)
    }

    fn take_frame(&mut self) -> Option<VideoFrame> {
        lock(&self.latest_frame).take()
    }
}

impl Drop for FfmpegBackend {
    fn drop(&mut self) {
        if self.commands.send(WorkerCommand::Shutdown).is_err() {
            log::debug!("Playback worker for slot {} already gone", self.slot);
        }

        // The worker is detached, it kills its decoder once it reads Shutdown.
        // `MediaRuntime::wait_for_decoders` waits for that on exit.
        if let Some(handle) = self.worker.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

/// Creates one `FfmpegBackend` per grid slot
#[derive(Debug, Clone)]
pub struct FfmpegBackendFactory {
    runtime: MediaRuntime,
    frame_size: FrameSize,
}

impl FfmpegBackendFactory {
    pub fn new(runtime: MediaRuntime, frame_size: FrameSize) -> Self {
        Self { runtime, frame_size }
    }
}

impl BackendFactory for FfmpegBackendFactory {
    fn create(&self, events: EventSink) -> Result<Box<dyn PlayerBackend>, BackendError> {
        let backend = FfmpegBackend::spawn(self.runtime.clone(), self.frame_size, events)?;
        Ok(Box::new(backend))
    }
}
