//! Decoder subprocess supervision.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::UnpackError;
use crate::progress::{MonotonicPercent, parse_percent};
use crate::scan;

/// Archive file extension the download is expected to contain.
pub const ARCHIVE_EXT: &str = "7z";

/// Name of the output directory created next to the archive.
pub const EXTRACT_DIR: &str = "extracted";

/// Read buffer for the decoder's stdout. The decoder redraws its progress
/// line with carriage returns, so reading is chunk-based, not line-based.
const STDOUT_CHUNK: usize = 8 * 1024;

/// Events emitted while unpacking one item.
///
/// Terminal success/failure is the return value of
/// [`Unpacker::extract`], not an event, so the caller can commit its
/// install record even when the delivery channel is gone.
#[derive(Debug, Clone, PartialEq)]
pub enum UnpackEvent {
    /// The decoder subprocess has been spawned.
    Started,
    /// Extraction percentage, non-decreasing.
    Progress(u8),
}

/// Supervises one decoder subprocess per extraction run.
pub struct Unpacker {
    decoder: PathBuf,
}

impl Default for Unpacker {
    fn default() -> Self {
        Self::new()
    }
}

impl Unpacker {
    /// Creates an unpacker using the `7z` binary from `PATH`.
    pub fn new() -> Self {
        Self {
            decoder: PathBuf::from("7z"),
        }
    }

    /// Creates an unpacker using a specific decoder program.
    pub fn with_decoder(program: impl Into<PathBuf>) -> Self {
        Self {
            decoder: program.into(),
        }
    }

    /// Runs the full extraction stage for one downloaded item.
    ///
    /// Selects the first archive in `archive_dir`, decodes it into the
    /// `extracted/` subdirectory while streaming progress events, verifies
    /// the output is non-empty and resolves `target` (the launchable file
    /// name) inside it. Progress delivery is best-effort; the returned
    /// path is authoritative.
    pub async fn extract(
        &self,
        archive_dir: &Path,
        item_id: &str,
        target: &str,
        events: mpsc::Sender<UnpackEvent>,
    ) -> Result<PathBuf, UnpackError> {
        let archive = find_archive(archive_dir)?;
        let out_dir = archive_dir.join(EXTRACT_DIR);
        std::fs::create_dir_all(&out_dir)?;

        let _ = events.send(UnpackEvent::Started).await;
        tracing::info!(item_id, archive = %archive.display(), "extraction started");

        let mut child = Command::new(&self.decoder)
            .arg("x")
            .arg(&archive)
            .arg(format!("-o{}", out_dir.display()))
            .arg("-y")
            .arg("-bsp1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(UnpackError::Spawn)?;

        if let Some(stderr) = child.stderr.take() {
            let item_id = item_id.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::warn!(item_id, line, "decoder stderr");
                }
            });
        }

        if let Some(mut stdout) = child.stdout.take() {
            let mut filter = MonotonicPercent::new();
            let mut buf = vec![0u8; STDOUT_CHUNK];
            loop {
                let read = stdout.read(&mut buf).await?;
                if read == 0 {
                    break;
                }
                let chunk = String::from_utf8_lossy(&buf[..read]);
                if let Some(percent) = parse_percent(&chunk).and_then(|v| filter.accept(v)) {
                    let _ = events.send(UnpackEvent::Progress(percent)).await;
                }
            }
        }

        let status = child.wait().await?;
        if !status.success() {
            let code = status.code().unwrap_or(-1);
            tracing::warn!(item_id, code, "decoder exited with failure");
            return Err(UnpackError::DecoderExit(code));
        }

        let mut extracted = std::fs::read_dir(&out_dir)?;
        if extracted.next().is_none() {
            return Err(UnpackError::EmptyExtraction);
        }

        match scan::find_executable(&out_dir, target) {
            Some(exec_path) => {
                tracing::info!(item_id, exec = %exec_path.display(), "extraction complete");
                Ok(exec_path)
            }
            None => Err(UnpackError::ExecutableNotFound),
        }
    }
}

/// Selects the first entry in `dir` whose name carries the archive
/// extension, in listing order.
fn find_archive(dir: &Path) -> Result<PathBuf, UnpackError> {
    let entries = std::fs::read_dir(dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if is_file
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXT))
        {
            return Ok(path);
        }
    }
    Err(UnpackError::NoArchive)
}
