use image::imageops;
use image::math::Rect;
use image::RgbImage;
use semantris_solver::{Error, Keyboard, ScreenCapture};
use std::process::Command;
use std::time::Duration;
use tempfile::NamedTempFile;

fn run(what: &'static str, command: &mut Command) -> Result<(), Error> {
    let output = command
        .output()
        .map_err(|e| Error::Collaborator(what, e.to_string()))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Collaborator(what, stderr.trim().to_string()));
    }
    Ok(())
}

/// Screenshots taken by an external command that writes a PNG file.
pub struct CommandCapture {
    command: Vec<String>,
}

impl CommandCapture {
    /// `command` is split on whitespace; a `{}` argument is replaced by the
    /// output file, which is appended when there is no placeholder.
    pub fn new(command: &str) -> CommandCapture {
        let mut command: Vec<String> = command.split_whitespace().map(String::from).collect();
        if !command.iter().any(|a| a.contains("{}")) {
            command.push(String::from("{}"));
        }
        CommandCapture { command }
    }
}

impl ScreenCapture for CommandCapture {
    fn capture(&mut self, region: Option<Rect>) -> Result<RgbImage, Error> {
        let output = NamedTempFile::with_suffix(".png")?;
        let path = output.path().display().to_string();
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| Error::Collaborator("capture", String::from("empty command")))?;
        let args = args.iter().map(|a| a.replace("{}", &path));
        run("capture", Command::new(program).args(args))?;

        let screen = image::open(output.path())
            .map_err(|source| Error::ImageError { path, source })?
            .into_rgb8();
        Ok(match region {
            Some(r) => imageops::crop_imm(&screen, r.x, r.y, r.width, r.height).to_image(),
            None => screen,
        })
    }
}

/// Keyboard input through `xdotool`, typed into the focused window.
pub struct XdotoolKeyboard;

impl Keyboard for XdotoolKeyboard {
    fn type_text(&mut self, text: &str, per_char_delay: Duration) -> Result<(), Error> {
        run(
            "xdotool",
            Command::new("xdotool")
                .arg("type")
                .arg("--delay")
                .arg(per_char_delay.as_millis().to_string())
                .arg("--")
                .arg(text),
        )
    }

    fn press_enter(&mut self) -> Result<(), Error> {
        run("xdotool", Command::new("xdotool").arg("key").arg("Return"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_command() {
        let capture = CommandCapture::new("grim {}");
        assert_eq!(capture.command, ["grim", "{}"]);
        let capture = CommandCapture::new("scrot -o");
        assert_eq!(capture.command, ["scrot", "-o", "{}"]);
    }

    #[test]
    fn test_missing_program() {
        let mut capture = CommandCapture::new("semantris-no-such-screenshot-tool {}");
        let err = capture.capture(None).unwrap_err();
        assert!(matches!(err, Error::Collaborator("capture", _)));
    }
}
