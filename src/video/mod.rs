pub mod ffmpeg_player;
pub mod probe;
pub mod runtime;

pub use ffmpeg_player::{FfmpegBackend, FfmpegBackendFactory, FrameSize};
pub use probe::{probe, MediaInfo};
pub use runtime::MediaRuntime;
