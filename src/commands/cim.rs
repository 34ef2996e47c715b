//! Front-end commands for CIM read, write and erase.
//!
//! Each command snapshots the settings, runs the blocking engine on the
//! blocking pool and forwards its events to `progress` from a separate
//! thread. Errors cross this boundary as display strings.
//!
//! The `base` options supply chunk size, timeouts and link parameters.
//! Pacing always comes from the settings snapshot, clamped into range.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::eeprom::{
    available_port_names, CancelToken, EepromError, OperationState, PortOpener, TransferEngine,
    TransferEvent, TransferOptions,
};
use crate::image::{load_image, load_image_sized, save_image, ImageReport};
use crate::settings::Settings;

/// Progress event sent to the front end while an operation runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CimProgressEvent {
    /// `port_opening`, `transferring`, `status`, ...
    pub stage: String,
    pub done: Option<usize>,
    pub total: Option<usize>,
    /// Progress percentage (0-100), only on progress events.
    pub percent: Option<f32>,
    pub message: String,
}

impl From<TransferEvent> for CimProgressEvent {
    fn from(event: TransferEvent) -> Self {
        match event {
            TransferEvent::State(state) => Self {
                stage: state_name(state).to_string(),
                done: None,
                total: None,
                percent: None,
                message: format!("{:?}", state),
            },
            TransferEvent::Progress { done, total } => {
                let percent = if total == 0 {
                    100.0
                } else {
                    done as f32 * 100.0 / total as f32
                };
                Self {
                    stage: "transferring".to_string(),
                    done: Some(done),
                    total: Some(total),
                    percent: Some(percent),
                    message: format!("{} of {} bytes", done, total),
                }
            }
            TransferEvent::Status { message } => Self {
                stage: "status".to_string(),
                done: None,
                total: None,
                percent: None,
                message,
            },
        }
    }
}

fn state_name(state: OperationState) -> &'static str {
    match state {
        OperationState::Idle => "idle",
        OperationState::PortOpening => "port_opening",
        OperationState::Handshaking => "handshaking",
        OperationState::Transferring => "transferring",
        OperationState::Completed => "completed",
        OperationState::Failed => "failed",
        OperationState::PortClosed => "port_closed",
    }
}

/// Everything the front end shows after a read.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadSummary {
    /// e.g. `successful read from <time>`.
    pub title: String,
    pub success: bool,
    pub bytes_read: usize,
    pub expected: usize,
    /// Bytes as they came off the wire.
    pub raw: Vec<u8>,
    /// `raw` with the XOR mask removed.
    pub image: Vec<u8>,
    /// Report lines such as `VIN: ...`; empty when the read failed.
    pub report: Vec<String>,
    pub error: Option<String>,
    /// Where the image was saved, if it was.
    pub saved_to: Option<PathBuf>,
    /// Why saving failed; the bytes above are still valid.
    pub save_error: Option<String>,
}

fn describe(error: &EepromError) -> String {
    format!("[{}] {}", error.error_code(), error)
}

fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}

/// Start a thread that converts engine events and hands them to `progress`.
///
/// The thread exits once the returned sender is dropped.
fn forward_progress<P>(progress: P) -> (mpsc::Sender<TransferEvent>, thread::JoinHandle<()>)
where
    P: Fn(CimProgressEvent) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<TransferEvent>();
    let progress_task = thread::spawn(move || {
        while let Ok(event) = rx.recv() {
            progress(CimProgressEvent::from(event));
        }
    });
    (tx, progress_task)
}

/// List serial ports the adapter might be on.
pub async fn list_ports() -> Result<Vec<String>, String> {
    tokio::task::spawn_blocking(available_port_names)
        .await
        .map_err(|e| format!("Failed to list ports: {}", e))?
        .map_err(|e| describe(&e))
}

/// Dump the chip and optionally save it.
///
/// A complete read is saved to `output`. A failed read is saved only when
/// `settings.ignore_read_errors` is set; its partial bytes are returned
/// either way.
pub async fn read_cim<O, P>(
    opener: O,
    settings: Settings,
    base: TransferOptions,
    output: Option<PathBuf>,
    cancel: CancelToken,
    progress: P,
) -> Result<ReadSummary, String>
where
    O: PortOpener + 'static,
    P: Fn(CimProgressEvent) + Send + 'static,
{
    let profile = settings.chip_profile().map_err(|e| describe(&e))?;
    let options = settings.paced(base);
    let (tx, progress_task) = forward_progress(progress);

    let result = tokio::task::spawn_blocking(move || {
        let engine = TransferEngine::new(opener, options).with_cancel_token(cancel);
        engine.read(&profile, |event| {
            let _ = tx.send(event);
        })
    })
    .await
    .map_err(|e| format!("Read task panicked: {}", e))?;

    // Wait for progress forwarding to complete
    let _ = progress_task.join();

    let keep = result.is_ok() || (settings.ignore_read_errors && !result.image.is_empty());
    let (saved_to, save_error) = match output {
        Some(path) if keep => match save_image(&path, &result.image) {
            Ok(saved) => (Some(saved), None),
            Err(e) => {
                log::warn!("Could not save read to {}: {}", path.display(), e);
                (None, Some(describe(&e)))
            }
        },
        _ => (None, None),
    };

    let report = if result.is_ok() {
        ImageReport::from_image(&result.image)
            .lines()
            .into_iter()
            .map(|(label, value)| format!("{}: {}", label, value))
            .collect()
    } else {
        Vec::new()
    };

    Ok(ReadSummary {
        title: result.title(),
        success: result.is_ok(),
        bytes_read: result.raw.len(),
        expected: result.expected_len,
        report,
        error: result.error.as_ref().map(describe),
        saved_to,
        save_error,
        raw: result.raw,
        image: result.image,
    })
}

/// Program the chip from an image file.
///
/// Returns a message like `Flashed cim.bin, took 81.23s`.
pub async fn write_cim<O, P>(
    opener: O,
    settings: Settings,
    base: TransferOptions,
    file: PathBuf,
    cancel: CancelToken,
    progress: P,
) -> Result<String, String>
where
    O: PortOpener + 'static,
    P: Fn(CimProgressEvent) + Send + 'static,
{
    let profile = settings.chip_profile().map_err(|e| describe(&e))?;
    let options = settings.paced(base);
    let image = load_image_sized(&file, profile.image_len()).map_err(|e| describe(&e))?;
    let (tx, progress_task) = forward_progress(progress);

    let result = tokio::task::spawn_blocking(move || {
        let engine = TransferEngine::new(opener, options).with_cancel_token(cancel);
        engine.write(&profile, &image, |event| {
            let _ = tx.send(event);
        })
    })
    .await
    .map_err(|e| format!("Write task panicked: {}", e))?;

    let _ = progress_task.join();

    let report = result.map_err(|e| describe(&e))?;
    Ok(format!(
        "Flashed {}, took {}",
        file_label(&file),
        format_elapsed(report.elapsed)
    ))
}

/// Clear the chip. Returns a message like `Erase took 0.42s`.
pub async fn erase_cim<O, P>(
    opener: O,
    settings: Settings,
    base: TransferOptions,
    cancel: CancelToken,
    progress: P,
) -> Result<String, String>
where
    O: PortOpener + 'static,
    P: Fn(CimProgressEvent) + Send + 'static,
{
    let profile = settings.chip_profile().map_err(|e| describe(&e))?;
    let options = settings.paced(base);
    let (tx, progress_task) = forward_progress(progress);

    let result = tokio::task::spawn_blocking(move || {
        let engine = TransferEngine::new(opener, options).with_cancel_token(cancel);
        engine.erase(&profile, |event| {
            let _ = tx.send(event);
        })
    })
    .await
    .map_err(|e| format!("Erase task panicked: {}", e))?;

    let _ = progress_task.join();

    let elapsed = result.map_err(|e| describe(&e))?;
    Ok(format!("Erase took {}", format_elapsed(elapsed)))
}

/// Checksum and decode an image file without touching the device.
pub async fn view_image(path: PathBuf) -> Result<ImageReport, String> {
    tokio::task::spawn_blocking(move || {
        let image = load_image(&path).map_err(|e| describe(&e))?;
        Ok(ImageReport::from_image(&image))
    })
    .await
    .map_err(|e| format!("View failed: {}", e))?
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
