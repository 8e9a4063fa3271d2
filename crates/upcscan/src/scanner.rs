//! Barcode decoder abstraction.
//!
//! A [`Decoder`] turns some input stream into decoded barcodes. The
//! controller drives it through a fixed lifecycle: `init` with a
//! [`DecoderConfig`], `start` with a detection channel, `stop`. A stopped
//! decoder can be initialized and started again.
//!
//! [`KeyboardWedgeDecoder`] is the shipped implementation. Handheld USB and
//! Bluetooth barcode scanners act as keyboards and type each decoded code
//! followed by Enter, so the decoder reads lines and keeps the ones that
//! are valid codes for one of the configured symbologies.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::item::Symbology;

/// Errors raised by a decoder.
#[derive(Debug, Error)]
pub enum DecoderError {
    /// The decoder could not be initialized.
    #[error("failed to initialize decoder: {0}")]
    InitFailed(String),

    /// The decoder could not start capturing.
    #[error("failed to start decoder: {0}")]
    StartFailed(String),

    /// `start` was called on a running decoder.
    #[error("decoder already running")]
    AlreadyRunning,

    /// `start` was called before a successful `init`.
    #[error("decoder not initialized")]
    NotInitialized,
}

/// Result type for decoder operations.
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Which camera the decoder should prefer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// The rear-facing camera.
    #[default]
    Environment,
    /// The front-facing camera.
    User,
}

impl std::fmt::Display for FacingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Environment => write!(f, "environment"),
            Self::User => write!(f, "user"),
        }
    }
}

/// The kind of input stream a decoder reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputStream {
    /// A live, continuously updating stream.
    #[default]
    LiveStream,
}

/// Decoder configuration applied on every activation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderConfig {
    /// Input stream kind.
    pub input: InputStream,
    /// Preferred camera.
    pub facing_mode: FacingMode,
    /// Target frame width in pixels.
    pub width: u32,
    /// Target frame height in pixels.
    pub height: u32,
    /// Minimum accepted aspect ratio.
    pub aspect_ratio_min: f32,
    /// Maximum accepted aspect ratio.
    pub aspect_ratio_max: f32,
    /// Accepted symbologies, in match priority order.
    pub readers: Vec<Symbology>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input: InputStream::LiveStream,
            facing_mode: FacingMode::Environment,
            width: 640,
            height: 300,
            aspect_ratio_min: 1.0,
            aspect_ratio_max: 2.0,
            readers: Symbology::ALL.to_vec(),
        }
    }
}

/// A decoded barcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// The decoded digits.
    pub code: String,
    /// The symbology the code was read as.
    pub symbology: Symbology,
}

/// A barcode decoder with an init/start/stop lifecycle.
#[async_trait]
pub trait Decoder: Send {
    /// The name of this decoder (for logging).
    fn name(&self) -> &'static str;

    /// Prepare the decoder for capture with `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input device or configuration is unusable.
    async fn init(&mut self, config: &DecoderConfig) -> Result<()>;

    /// Begin capturing and send every detection through `tx`.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder is not initialized or already running.
    fn start(&mut self, tx: mpsc::Sender<Detection>) -> Result<()>;

    /// Stop capturing. Stopping an idle decoder does nothing.
    fn stop(&mut self);

    /// Check if the decoder is currently capturing.
    fn is_running(&self) -> bool;
}

type SharedLines<R> = Arc<Mutex<Lines<BufReader<R>>>>;

/// Decoder for keyboard-wedge barcode scanners.
///
/// Reads one code per line from `R`. Lines that no configured symbology
/// accepts are ignored. Each activation delivers at most one detection and
/// then ends, so lines typed ahead of a lookup are kept for the next
/// activation instead of being consumed.
#[derive(Debug)]
pub struct KeyboardWedgeDecoder<R> {
    lines: SharedLines<R>,
    readers: Option<Vec<Symbology>>,
    task: Option<JoinHandle<()>>,
}

impl KeyboardWedgeDecoder<tokio::io::Stdin> {
    /// Create a decoder reading the process's standard input.
    #[must_use]
    pub fn stdin() -> Self {
        Self::new(tokio::io::stdin())
    }
}

impl<R> KeyboardWedgeDecoder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    /// Create a decoder reading lines from `reader`.
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            lines: Arc::new(Mutex::new(BufReader::new(reader).lines())),
            readers: None,
            task: None,
        }
    }
}

#[async_trait]
impl<R> Decoder for KeyboardWedgeDecoder<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    fn name(&self) -> &'static str {
        "keyboard-wedge"
    }

    async fn init(&mut self, config: &DecoderConfig) -> Result<()> {
        if config.readers.is_empty() {
            return Err(DecoderError::InitFailed(
                "no barcode readers configured".to_string(),
            ));
        }
        debug!(
            readers = ?config.readers,
            facing_mode = %config.facing_mode,
            width = config.width,
            height = config.height,
            "Keyboard wedge decoder initialized"
        );
        self.readers = Some(config.readers.clone());
        Ok(())
    }

    fn start(&mut self, tx: mpsc::Sender<Detection>) -> Result<()> {
        if self.is_running() {
            return Err(DecoderError::AlreadyRunning);
        }
        let readers = self.readers.clone().ok_or(DecoderError::NotInitialized)?;
        let lines = Arc::clone(&self.lines);

        self.task = Some(tokio::spawn(async move {
            let mut lines = lines.lock().await;
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("Scanner input closed");
                        break;
                    }
                    Err(e) => {
                        debug!(error = %e, "Scanner input failed");
                        break;
                    }
                };

                let code = line.trim();
                if code.is_empty() {
                    continue;
                }
                let Some(symbology) = Symbology::classify(code, &readers) else {
                    debug!(input = code, "Ignoring input that is not an accepted barcode");
                    continue;
                };

                trace!(code, %symbology, "Barcode detected");
                let detection = Detection {
                    code: code.to_string(),
                    symbology,
                };
                // One code per activation. Later lines stay unread until the
                // next start.
                if tx.send(detection).await.is_err() {
                    debug!(code, "Detection dropped, receiver closed");
                }
                break;
            }
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<R> Drop for KeyboardWedgeDecoder<R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
