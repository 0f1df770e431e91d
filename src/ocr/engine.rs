//! Text-recognition engine boundary
//!
//! External OCR engines reach the voting layer solely through the
//! [`TextEngine`] contract: an image and an engine config string in, UTF-8
//! text out. The stock primary engine drives a `tesseract` executable
//! through temp-file I/O; anything honoring the contract can be injected as
//! primary or secondary.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use image::GrayImage;
use tracing::{debug, info};

use crate::error::RecognitionError;

/// The narrow contract every OCR engine is reduced to.
pub trait TextEngine: Send + Sync {
    /// Short engine identifier used in logs and vote metadata.
    fn name(&self) -> &str;

    /// Recognize text in a grayscale image under an engine config string
    /// (segmentation mode, character whitelist, ...).
    fn recognize(&self, img: &GrayImage, config: &str) -> Result<String, RecognitionError>;
}

/// Tesseract driven as an external process.
pub struct TesseractEngine {
    executable: PathBuf,
}

impl TesseractEngine {
    /// Resolve the executable from `TESSERACT_EXE` or `PATH`.
    pub fn new() -> Result<Self, RecognitionError> {
        let executable = Self::find_executable().ok_or_else(|| {
            RecognitionError::EngineUnavailable(
                "no tesseract executable found (set TESSERACT_EXE to override)".to_string(),
            )
        })?;
        info!("Tesseract engine ready: {:?}", executable);
        Ok(Self { executable })
    }

    /// Use an explicit executable path.
    pub fn with_executable(path: impl Into<PathBuf>) -> Result<Self, RecognitionError> {
        let executable = path.into();
        if !probe(&executable) {
            return Err(RecognitionError::EngineUnavailable(format!(
                "{:?} did not respond to --version",
                executable
            )));
        }
        Ok(Self { executable })
    }

    fn find_executable() -> Option<PathBuf> {
        if let Ok(exe) = std::env::var("TESSERACT_EXE") {
            let path = PathBuf::from(exe);
            if probe(&path) {
                return Some(path);
            }
        }
        let path = PathBuf::from("tesseract");
        probe(&path).then_some(path)
    }
}

fn probe(path: &Path) -> bool {
    Command::new(path)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

impl TextEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, img: &GrayImage, config: &str) -> Result<String, RecognitionError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(RecognitionError::MalformedInput {
                width: img.width(),
                height: img.height(),
            });
        }

        let failed = |message: String| RecognitionError::EngineFailed {
            engine: "tesseract".to_string(),
            message,
        };

        let input = tempfile::Builder::new()
            .prefix("cardvision-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| failed(format!("temp file: {}", e)))?;
        img.save(input.path())
            .map_err(|e| failed(format!("write input image: {}", e)))?;

        let mut command = Command::new(&self.executable);
        command.arg(input.path()).arg("stdout");
        for arg in config.split_whitespace() {
            command.arg(arg);
        }

        let output = command
            .output()
            .map_err(|e| failed(format!("spawn: {}", e)))?;
        if !output.status.success() {
            return Err(failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!("tesseract [{}] -> {:?}", config, text);
        Ok(text)
    }
}

/// Engine returning the same text for every call: a deterministic stand-in
/// for wiring tests, dry runs, and environments without any OCR installed.
pub struct FixedEngine {
    name: String,
    text: String,
}

impl FixedEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self::named("fixed", text)
    }

    pub fn named(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }

    /// Engine that recognizes nothing, so voting degrades to zero votes.
    pub fn silent() -> Self {
        Self::new("")
    }
}

impl TextEngine for FixedEngine {
    fn name(&self) -> &str {
        &self.name
    }

    fn recognize(&self, img: &GrayImage, _config: &str) -> Result<String, RecognitionError> {
        if img.width() == 0 || img.height() == 0 {
            return Err(RecognitionError::MalformedInput {
                width: img.width(),
                height: img.height(),
            });
        }
        Ok(self.text.clone())
    }
}
