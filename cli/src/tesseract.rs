use image::GrayImage;
use log::debug;
use semantris_solver::{Error, TextRecognizer};
use std::process::Command;
use tempfile::NamedTempFile;

const WHITELIST: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Text recognition by the `tesseract` executable, restricted to letters.
pub struct TesseractRecognizer {
    exe: String,
}

fn failed<E: ToString>(err: E) -> Error {
    Error::Collaborator("tesseract", err.to_string())
}

impl TesseractRecognizer {
    pub fn new<S: Into<String>>(exe: S) -> TesseractRecognizer {
        TesseractRecognizer { exe: exe.into() }
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&mut self, image: &GrayImage) -> Result<String, Error> {
        let input = NamedTempFile::with_suffix(".png")?;
        image.save(input.path()).map_err(failed)?;

        let output = Command::new(&self.exe)
            .arg(input.path())
            .arg("stdout")
            .arg("-c")
            .arg(format!("tessedit_char_whitelist={}", WHITELIST))
            .output()
            .map_err(failed)?;
        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr)));
        }
        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("tesseract read {:?}", text);
        Ok(text)
    }
}
