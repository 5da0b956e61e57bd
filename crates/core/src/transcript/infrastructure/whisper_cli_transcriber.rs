use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use super::json_transcript_source::parse_transcript_json;
use crate::shared::cancellation::CancellationToken;
use crate::shared::constants::WHISPER_BINARY;
use crate::transcript::domain::transcript::TranscriptContext;
use crate::transcript::domain::transcript_source::TranscriptSource;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Transcribes media by running the `whisper` command-line tool.
///
/// The child process is killed when the cancellation token fires. The
/// abort listener lives only as long as the call.
#[derive(Debug, Clone)]
pub struct WhisperCliTranscriber {
    binary: PathBuf,
    model: String,
    media_dir: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl WhisperCliTranscriber {
    pub fn new(media_dir: &Path, output_dir: &Path, timeout: Duration) -> Self {
        Self {
            binary: PathBuf::from(WHISPER_BINARY),
            model: "base".to_string(),
            media_dir: media_dir.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            timeout,
        }
    }

    pub fn with_binary(mut self, binary: &Path) -> Self {
        self.binary = binary.to_path_buf();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    fn spawn(&self, media_path: &Path) -> std::io::Result<Child> {
        Command::new(&self.binary)
            .arg(media_path)
            .arg("--model")
            .arg(&self.model)
            .arg("--output_format")
            .arg("json")
            .arg("--word_timestamps")
            .arg("True")
            .arg("--output_dir")
            .arg(&self.output_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
    }
}

impl TranscriptSource for WhisperCliTranscriber {
    fn transcribe(
        &self,
        asset_id: &str,
        cancel: &CancellationToken,
    ) -> Result<TranscriptContext, Box<dyn std::error::Error + Send + Sync>> {
        cancel.check()?;
        let media_path = self.media_dir.join(asset_id);
        if !media_path.exists() {
            return Err(format!("media not found: {}", media_path.display()).into());
        }
        fs::create_dir_all(&self.output_dir)?;

        let child = Arc::new(Mutex::new(self.spawn(&media_path)?));
        let status = {
            let killer = Arc::clone(&child);
            let _listener = cancel.on_cancel(move || {
                if let Ok(mut c) = killer.lock() {
                    let _ = c.kill();
                }
            });
            wait_with_timeout(&child, self.timeout)?
        };

        cancel.check()?;
        if !status.success() {
            let stderr = read_stderr(&child);
            return Err(format!("whisper exited with {status}: {stderr}").into());
        }

        let stem = media_path
            .file_stem()
            .ok_or("media path has no file stem")?
            .to_string_lossy()
            .to_string();
        let json = fs::read_to_string(self.output_dir.join(format!("{stem}.json")))?;
        Ok(parse_transcript_json(&json)?)
    }
}

fn wait_with_timeout(
    child: &Arc<Mutex<Child>>,
    timeout: Duration,
) -> Result<std::process::ExitStatus, Box<dyn std::error::Error + Send + Sync>> {
    let started = Instant::now();
    loop {
        {
            let mut guard = child.lock().map_err(|_| "whisper process lock poisoned")?;
            if let Some(status) = guard.try_wait()? {
                return Ok(status);
            }
            if started.elapsed() > timeout {
                let _ = guard.kill();
                let _ = guard.wait();
                return Err(format!("whisper timed out after {}s", timeout.as_secs()).into());
            }
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn read_stderr(child: &Arc<Mutex<Child>>) -> String {
    use std::io::Read;

    let mut stderr = String::new();
    if let Ok(mut guard) = child.lock() {
        if let Some(pipe) = guard.stderr.as_mut() {
            let _ = pipe.read_to_string(&mut stderr);
        }
    }
    stderr.trim().to_string()
}
