//! A solver for the Semantris word association game that plays from screenshots.
//!
//! Every poll cycle the [Player] captures the screen, finds the area of the
//! focus word, reads it with a [TextRecognizer] and types a related word that
//! it picks from a word embedding.
//!
//! Finding the focus word depends on the game mode:
//! * arcade: the word next to the highlight [Marker] (template matching on the blue channel)
//! * blocks: the largest block of one of the block colors (color clustering and contours)
//!
//! # Basic usage
//! ```no_run
//! # use semantris_solver::{Error, Selector, Word2Vec};
//! let model = Word2Vec::load("GoogleNews-vectors-negative300.bin", true)?;
//! let mut selector = Selector::new();
//! let word = selector.associate("ocean", &model, &mut rand::thread_rng())?;
//! println!("{}", word);
//! # Ok::<(), Error>(())
//! ```
//! Asking again for the same word never returns the same answer twice.

mod association;
mod embedding;
mod error;
mod marker;
mod palette;
mod player;
mod segment;

pub use association::{lookup_key, History, Selector};
pub use embedding::{EmbeddingModel, Word2Vec};
pub use error::Error;
pub use marker::{highlight, Marker, Match, MATCH_THRESHOLD};
pub use palette::{block_colors, dominant_colors, pick_block_color, ColorSample};
pub use player::{
    clean_text, Extractor, GameMode, Keyboard, Player, PlayerConfig, ScreenCapture, Submission,
    TextRecognizer,
};
pub use segment::{color_mask, extract_block, max_area_index};
