//! Media generation: an injected async capability that turns a prompt into an image/video
//! or a piece of text into speech. The production implementation talks to an external script
//! over stdin/stdout; tests inject fakes.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::config::MediaSettings;

/// Prefix of the line a script prints when it echoes its stdin back.
const ECHO_PREFIX: &str = "Received input:";

/// Decoded size below which an untagged line is treated as chatter, not a payload.
const MIN_PAYLOAD_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRequest {
    /// Illustration for an answer; `video` asks the script for a clip instead of a still.
    Illustration { prompt: String, video: bool },
    /// Spoken version of an answer.
    Speech { text: String },
}

/// Generated media as a data URL ready for the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaPayload {
    Image(String),
    Video(String),
    Audio(String),
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("media generation is not configured")]
    Disabled,

    #[error("failed to start media script: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("media script I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("media script timed out after {0:?}")]
    Timeout(Duration),

    #[error("media script reported: {0}")]
    Script(String),

    #[error("media script produced no payload")]
    EmptyOutput,

    #[error("media payload is not valid base64")]
    InvalidPayload,
}

#[async_trait]
pub trait MediaGenerator: Send + Sync {
    async fn generate(&self, request: MediaRequest) -> Result<MediaPayload, MediaError>;
}

/// Generator used when no script is configured.
#[derive(Debug, Default)]
pub struct NoMedia;

#[async_trait]
impl MediaGenerator for NoMedia {
    async fn generate(&self, _request: MediaRequest) -> Result<MediaPayload, MediaError> {
        Err(MediaError::Disabled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScriptKind {
    /// Untagged payloads are read as video when `video` is set.
    Illustration { video: bool },
    Speech,
}

/// Runs an external generator per request: one JSON line in, the first payload line out.
///
/// Illustration scripts receive `{"prompt": ...}` (prefixed `!video ` for clips), speech scripts
/// `{"text": ...}`. The child is killed as soon as the call returns or times out.
#[derive(Debug, Clone)]
pub struct ScriptMediaGenerator {
    illustration_command: Option<Vec<String>>,
    speech_command: Option<Vec<String>>,
    timeout: Duration,
}

impl ScriptMediaGenerator {
    pub fn new(
        illustration_command: Option<Vec<String>>,
        speech_command: Option<Vec<String>>,
        timeout: Duration,
    ) -> Self {
        Self {
            illustration_command,
            speech_command,
            timeout,
        }
    }

    pub fn from_settings(settings: &MediaSettings) -> Self {
        Self::new(
            settings.illustration_command.clone(),
            settings.speech_command.clone(),
            settings.timeout(),
        )
    }

    pub fn is_enabled(&self) -> bool {
        self.illustration_command.is_some() || self.speech_command.is_some()
    }
}

#[async_trait]
impl MediaGenerator for ScriptMediaGenerator {
    async fn generate(&self, request: MediaRequest) -> Result<MediaPayload, MediaError> {
        let (argv, input, kind) = match &request {
            MediaRequest::Illustration { prompt, video } => {
                let prompt = if *video {
                    format!("!video {}", prompt)
                } else {
                    prompt.clone()
                };
                (
                    self.illustration_command.as_ref(),
                    serde_json::json!({ "prompt": prompt }),
                    ScriptKind::Illustration { video: *video },
                )
            }
            MediaRequest::Speech { text } => (
                self.speech_command.as_ref(),
                serde_json::json!({ "text": text }),
                ScriptKind::Speech,
            ),
        };
        let argv = argv.ok_or(MediaError::Disabled)?;

        tracing::info!(
            target: "tutor::media",
            program = %argv.join(" "),
            kind = ?kind,
            "Invoking media script"
        );
        match tokio::time::timeout(self.timeout, run_script(argv, &input.to_string(), kind)).await
        {
            Ok(result) => result,
            Err(_) => Err(MediaError::Timeout(self.timeout)),
        }
    }
}

async fn run_script(
    argv: &[String],
    input: &str,
    kind: ScriptKind,
) -> Result<MediaPayload, MediaError> {
    let (program, args) = argv.split_first().ok_or(MediaError::Disabled)?;
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(MediaError::Spawn)?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| MediaError::Script("stdin not captured".into()))?;
    stdin.write_all(input.as_bytes()).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await?;
    drop(stdin);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| MediaError::Script("stdout not captured".into()))?;
    let mut lines = BufReader::new(stdout).lines();
    while let Some(line) = lines.next_line().await? {
        match read_script_line(line.trim(), kind)? {
            Some(payload) => return Ok(payload),
            None => {
                tracing::debug!(
                    target: "tutor::media",
                    line = %truncate(&line, 120),
                    "skipping script chatter"
                )
            }
        }
    }
    Err(MediaError::EmptyOutput)
}

/// One trimmed stdout line: echoes and blank lines are skipped, error lines fail the call,
/// anything else goes through [`parse_script_line`].
fn read_script_line(line: &str, kind: ScriptKind) -> Result<Option<MediaPayload>, MediaError> {
    if line.is_empty() || line.starts_with(ECHO_PREFIX) {
        return Ok(None);
    }
    if is_script_error(line) {
        return Err(MediaError::Script(line.to_string()));
    }
    parse_script_line(line, kind)
}

fn is_script_error(line: &str) -> bool {
    line.starts_with("Error") || line.to_lowercase().contains("generation error:")
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn is_base64_payload(s: &str) -> bool {
    STANDARD
        .decode(s)
        .map(|bytes| bytes.len() >= MIN_PAYLOAD_BYTES)
        .unwrap_or(false)
}

fn tagged(raw: &str, mime: &str) -> Result<String, MediaError> {
    let raw = raw.trim();
    if is_base64_payload(raw) {
        Ok(format!("data:{};base64,{}", mime, raw))
    } else {
        Err(MediaError::InvalidPayload)
    }
}

/// Classify one stdout line. `Ok(None)` means the line is not a payload (log chatter).
fn parse_script_line(line: &str, kind: ScriptKind) -> Result<Option<MediaPayload>, MediaError> {
    match kind {
        ScriptKind::Illustration { video } => {
            if line.starts_with("data:video") {
                Ok(Some(MediaPayload::Video(line.to_string())))
            } else if line.starts_with("data:image") {
                Ok(Some(MediaPayload::Image(line.to_string())))
            } else if let Some(raw) = line.strip_prefix("video:") {
                tagged(raw, "video/mp4").map(|url| Some(MediaPayload::Video(url)))
            } else if let Some(raw) = line.strip_prefix("image:") {
                tagged(raw, "image/png").map(|url| Some(MediaPayload::Image(url)))
            } else if is_base64_payload(line) && video {
                Ok(Some(MediaPayload::Video(format!("data:video/mp4;base64,{}", line))))
            } else if is_base64_payload(line) {
                Ok(Some(MediaPayload::Image(format!("data:image/png;base64,{}", line))))
            } else {
                Ok(None)
            }
        }
        ScriptKind::Speech => {
            if line.starts_with("data:audio") {
                Ok(Some(MediaPayload::Audio(line.to_string())))
            } else if let Some(raw) = line.strip_prefix("audio:") {
                tagged(raw, "audio/wav").map(|url| Some(MediaPayload::Audio(url)))
            } else if is_base64_payload(line) {
                Ok(Some(MediaPayload::Audio(format!("data:audio/wav;base64,{}", line))))
            } else {
                Ok(None)
            }
        }
    }
}
