use crate::association::Selector;
use crate::embedding::EmbeddingModel;
use crate::marker::Marker;
use crate::palette::{block_colors, pick_block_color};
use crate::segment::extract_block;
use crate::Error;
use image::math::Rect;
use image::{GrayImage, RgbImage};
use log::{debug, info};
use rand::Rng;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::thread::sleep;
use std::time::Duration;

/// Takes screenshots of the game.
pub trait ScreenCapture {
    /// Capture the screen, or only `region` of it.
    fn capture(&mut self, region: Option<Rect>) -> Result<RgbImage, Error>;
}

/// Types into the focused game window.
pub trait Keyboard {
    fn type_text(&mut self, text: &str, per_char_delay: Duration) -> Result<(), Error>;
    fn press_enter(&mut self) -> Result<(), Error>;
}

/// Reads the text in a word area.
pub trait TextRecognizer {
    /// The letters (A-Z, a-z) in `image`, or an empty string if there are none.
    fn recognize(&mut self, image: &GrayImage) -> Result<String, Error>;
}

/// The Semantris game modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameMode {
    /// One highlighted word, marked by a triangle
    Arcade,
    /// Colored word blocks over a gray background
    Blocks,
}

impl FromStr for GameMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "arcade" => Ok(GameMode::Arcade),
            "blocks" => Ok(GameMode::Blocks),
            _ => Err(Error::UnsupportedMode(s.to_string())),
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameMode::Arcade => write!(f, "arcade"),
            GameMode::Blocks => write!(f, "blocks"),
        }
    }
}

/// Finds the word areas in a screenshot, one way per game mode.
pub enum Extractor {
    Arcade(Marker),
    Blocks,
}

impl Extractor {
    /// The extractor for `mode`. Arcade mode loads its marker from `template`.
    pub fn for_mode<P: AsRef<Path>>(mode: GameMode, template: P) -> Result<Extractor, Error> {
        match mode {
            GameMode::Arcade => Ok(Extractor::Arcade(Marker::open(template)?)),
            GameMode::Blocks => Ok(Extractor::Blocks),
        }
    }

    pub fn mode(&self) -> GameMode {
        match self {
            Extractor::Arcade(_) => GameMode::Arcade,
            Extractor::Blocks => GameMode::Blocks,
        }
    }

    /// Word areas in `frame`. An empty list means there is nothing to do this cycle.
    pub fn regions<R: Rng + ?Sized>(&self, frame: &RgbImage, rng: &mut R) -> Vec<GrayImage> {
        match self {
            Extractor::Arcade(marker) => marker.regions(frame),
            Extractor::Blocks => {
                let candidates = block_colors(frame);
                debug!("{} block colors", candidates.len());
                pick_block_color(&candidates, rng)
                    .and_then(|c| extract_block(frame, c.color))
                    .into_iter()
                    .collect()
            }
        }
    }
}

/// Timings of the poll loop.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Pause before the first screenshot, to focus the game window
    pub initial_wait: Duration,
    /// Pause between cycles
    pub refresh: Duration,
    /// Upper bound of the random delay between typed characters
    pub max_key_delay: Duration,
    /// Screen area to capture, `None` for the whole screen
    pub region: Option<Rect>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            initial_wait: Duration::from_secs(10),
            refresh: Duration::from_secs(2),
            max_key_delay: Duration::from_millis(500),
            region: None,
        }
    }
}

/// A word typed into the game.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// The recognized word
    pub word: String,
    /// What was typed
    pub answer: String,
    /// False if the recognized word itself was typed again
    pub related: bool,
}

/// Lowercase letters of recognized text, words separated by single spaces.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_ascii_alphabetic())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A game session: the model, the association history and the collaborators.
pub struct Player<M, R> {
    extractor: Extractor,
    model: M,
    selector: Selector,
    capture: Box<dyn ScreenCapture>,
    keyboard: Box<dyn Keyboard>,
    recognizer: Box<dyn TextRecognizer>,
    rng: R,
    config: PlayerConfig,
}

impl<M: EmbeddingModel, R: Rng> Player<M, R> {
    pub fn new(
        extractor: Extractor,
        model: M,
        capture: Box<dyn ScreenCapture>,
        keyboard: Box<dyn Keyboard>,
        recognizer: Box<dyn TextRecognizer>,
        rng: R,
        config: PlayerConfig,
    ) -> Player<M, R> {
        Player {
            extractor,
            model,
            selector: Selector::new(),
            capture,
            keyboard,
            recognizer,
            rng,
            config,
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The word to type for `word`: a related word, or `word` itself when the
    /// model has nothing new to offer.
    pub fn respond(&mut self, word: &str) -> Submission {
        match self.selector.associate(word, &self.model, &mut self.rng) {
            Ok(answer) => Submission {
                word: word.to_string(),
                answer,
                related: true,
            },
            Err(err) => {
                debug!("{}, submitting {:?} again", err, word);
                Submission {
                    word: word.to_string(),
                    answer: word.to_string(),
                    related: false,
                }
            }
        }
    }

    fn key_delay(&mut self) -> Duration {
        let steps = self.config.max_key_delay.as_millis() as u64 / 10;
        Duration::from_millis(self.rng.gen_range(0..=steps) * 10)
    }

    fn submit(&mut self, submission: &Submission) -> Result<(), Error> {
        info!(
            "entering {:?} for {:?}",
            submission.answer, submission.word
        );
        let delay = self.key_delay();
        self.keyboard.type_text(&submission.answer, delay)?;
        self.keyboard.press_enter()
    }

    /// One poll cycle: capture, find the focus words, answer each of them.
    ///
    /// Misses (no word area, no text) yield no submissions. Failing
    /// collaborators end the cycle with their error.
    pub fn run_cycle(&mut self) -> Result<Vec<Submission>, Error> {
        debug!("taking screenshot");
        let frame = self.capture.capture(self.config.region)?;
        let regions = self.extractor.regions(&frame, &mut self.rng);
        debug!("{} word areas", regions.len());

        let mut submissions = Vec::new();
        for region in regions.iter() {
            let word = clean_text(&self.recognizer.recognize(region)?);
            if word.is_empty() {
                debug!("no text recognized");
                continue;
            }
            let submission = self.respond(&word);
            self.submit(&submission)?;
            submissions.push(submission);
        }
        Ok(submissions)
    }

    /// Play until a collaborator fails.
    pub fn run(&mut self) -> Result<(), Error> {
        info!(
            "waiting {:?} before starting the {} game",
            self.config.initial_wait,
            self.extractor.mode()
        );
        sleep(self.config.initial_wait);
        loop {
            self.run_cycle()?;
            debug!("waiting {:?} before next screenshot", self.config.refresh);
            sleep(self.config.refresh);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_mode() {
        assert_eq!("arcade".parse::<GameMode>().unwrap(), GameMode::Arcade);
        assert_eq!("Blocks".parse::<GameMode>().unwrap(), GameMode::Blocks);
        let err = "classic".parse::<GameMode>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedMode(m) if m == "classic"));
        assert_eq!(GameMode::Blocks.to_string(), "blocks");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("Debit\n  Card\n\x0c"), "debit card");
        assert_eq!(clean_text(" \n"), "");
        assert_eq!(clean_text("ice-cream 42"), "icecream");
    }

    #[test]
    fn test_blocks_extractor_needs_no_template() {
        let extractor = Extractor::for_mode(GameMode::Blocks, "does/not/exist.png").unwrap();
        assert_eq!(extractor.mode(), GameMode::Blocks);
        assert!(Extractor::for_mode(GameMode::Arcade, "does/not/exist.png").is_err());
    }
}
