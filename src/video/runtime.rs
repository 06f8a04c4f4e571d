use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::core::config::AppConfig;
use crate::core::error::BackendError;

/// The external ffmpeg/ffprobe binaries every session decodes through.
/// Cloned into each backend; the clones share one count of running
/// decoder processes.
#[derive(Debug, Clone)]
pub struct MediaRuntime {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    active_decoders: Arc<AtomicUsize>,
}

impl MediaRuntime {
    pub fn with_paths(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            active_decoders: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolve the binaries from the config (or `PATH`) and make sure both
    /// actually run. Failing here is fatal for the application.
    pub fn detect(config: &AppConfig) -> Result<Self, BackendError> {
        let runtime = Self::with_paths(
            config.ffmpeg_path.clone().unwrap_or_else(|| PathBuf::from("ffmpeg")),
            config.ffprobe_path.clone().unwrap_or_else(|| PathBuf::from("ffprobe")),
        );

        let ffmpeg_version = version_of(&runtime.ffmpeg)?;
        let ffprobe_version = version_of(&runtime.ffprobe)?;
        log::info!("Using {}", ffmpeg_version);
        log::debug!("Using {}", ffprobe_version);

        Ok(runtime)
    }

    pub fn ffmpeg_command(&self) -> Command {
        let mut cmd = Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner").arg("-nostdin");
        cmd
    }

    pub fn ffprobe_command(&self) -> Command {
        Command::new(&self.ffprobe)
    }

    /// Mark one decoder process as started; the guard marks it finished
    pub fn track_decoder(&self) -> DecoderGuard {
        let count = self.active_decoders.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!("Decoder started, active count: {}", count);
        DecoderGuard {
            active_decoders: Arc::clone(&self.active_decoders),
        }
    }

    pub fn active_decoders(&self) -> usize {
        self.active_decoders.load(Ordering::SeqCst)
    }

    /// Block until every decoder process is gone or `timeout` passes.
    /// Returns false on timeout.
    pub fn wait_for_decoders(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.active_decoders() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(10));
        }
        true
    }
}

/// Held alongside a running ffmpeg child
#[derive(Debug)]
pub struct DecoderGuard {
    active_decoders: Arc<AtomicUsize>,
}

impl Drop for DecoderGuard {
    fn drop(&mut self) {
        let previous = self.active_decoders.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Decoder finished, active count: {}", previous.saturating_sub(1));
    }
}

/// First line of `<binary> -version`, e.g. "ffmpeg version 6.1 ..."
fn version_of(binary: &Path) -> Result<String, BackendError> {
    let output = Command::new(binary)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| BackendError::RuntimeUnavailable(format!("{}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(BackendError::RuntimeUnavailable(format!(
            "{} -version exited with {}",
            binary.display(),
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_binary_is_runtime_unavailable() {
        let config = AppConfig {
            ffmpeg_path: Some(PathBuf::from("/definitely/not/here/ffmpeg")),
            ..AppConfig::default()
        };
        assert!(matches!(
            MediaRuntime::detect(&config),
            Err(BackendError::RuntimeUnavailable(_))
        ));
    }

    #[test]
    fn test_decoder_guard_counts() {
        let runtime = MediaRuntime::with_paths("ffmpeg", "ffprobe");
        let shared = runtime.clone();

        let first = runtime.track_decoder();
        let second = shared.track_decoder();
        assert_eq!(runtime.active_decoders(), 2);

        drop(first);
        assert_eq!(shared.active_decoders(), 1);
        drop(second);
        assert_eq!(runtime.active_decoders(), 0);
    }

    #[test]
    fn test_wait_for_decoders() {
        let runtime = MediaRuntime::with_paths("ffmpeg", "ffprobe");
        assert!(runtime.wait_for_decoders(Duration::ZERO));

        let guard = runtime.track_decoder();
        assert!(!runtime.wait_for_decoders(Duration::from_millis(30)));

        let releaser = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            drop(guard);
        });
        assert!(runtime.wait_for_decoders(Duration::from_secs(2)));
        releaser.join().unwrap();
    }
}
