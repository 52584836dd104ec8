use anyhow::Result;
use image::math::Rect;
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect as ProcRect;
use rand::rngs::StdRng;
use rand::SeedableRng;
use semantris_solver::{
    Error, Extractor, Keyboard, Marker, Player, PlayerConfig, ScreenCapture, TextRecognizer,
    Word2Vec,
};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

const GRAY: Rgb<u8> = Rgb([190, 190, 190]);
const BLUE: Rgb<u8> = Rgb([40, 90, 220]);

/// Returns the same screenshot every time, or fails when there is none.
struct FixedScreen(Option<RgbImage>);

impl ScreenCapture for FixedScreen {
    fn capture(&mut self, _region: Option<Rect>) -> Result<RgbImage, Error> {
        self.0
            .clone()
            .ok_or_else(|| Error::Collaborator("capture", String::from("no display")))
    }
}

#[derive(Clone, Default)]
struct Typed(Rc<RefCell<Vec<String>>>);

impl Keyboard for Typed {
    fn type_text(&mut self, text: &str, per_char_delay: Duration) -> Result<(), Error> {
        assert!(per_char_delay <= Duration::from_millis(500));
        self.0.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn press_enter(&mut self) -> Result<(), Error> {
        self.0.borrow_mut().push(String::from("\n"));
        Ok(())
    }
}

/// Reads canned texts in order, then nothing.
#[derive(Clone, Default)]
struct Script(Rc<RefCell<VecDeque<&'static str>>>);

impl Script {
    fn new(texts: &[&'static str]) -> Script {
        Script(Rc::new(RefCell::new(texts.iter().copied().collect())))
    }
}

impl TextRecognizer for Script {
    fn recognize(&mut self, _image: &GrayImage) -> Result<String, Error> {
        Ok(self.0.borrow_mut().pop_front().unwrap_or("").to_string())
    }
}

fn model() -> Word2Vec {
    Word2Vec::from_entries(vec![
        ("ocean", vec![1.0, 0.0, 0.0]),
        ("oceans", vec![0.99, 0.01, 0.0]),
        ("sea", vec![0.9, 0.1, 0.0]),
        ("mountain", vec![0.0, 0.0, 1.0]),
    ])
    .unwrap()
}

/// Gray screen with one blue word block in the bottom half.
fn blocks_screen() -> RgbImage {
    let mut frame = RgbImage::from_pixel(200, 100, GRAY);
    draw_filled_rect_mut(&mut frame, ProcRect::at(70, 60).of_size(60, 30), BLUE);
    frame
}

fn player(
    extractor: Extractor,
    screen: Option<RgbImage>,
    script: &Script,
    typed: &Typed,
) -> Player<Word2Vec, StdRng> {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = PlayerConfig {
        initial_wait: Duration::from_millis(0),
        refresh: Duration::from_millis(0),
        ..PlayerConfig::default()
    };
    Player::new(
        extractor,
        model(),
        Box::new(FixedScreen(screen)),
        Box::new(typed.clone()),
        Box::new(script.clone()),
        StdRng::seed_from_u64(7),
        config,
    )
}

#[test]
fn test_blocks_cycles() -> Result<()> {
    let script = Script::new(&["Ocean\n", "ocean", "OCEAN"]);
    let typed = Typed::default();
    let mut player = player(Extractor::Blocks, Some(blocks_screen()), &script, &typed);

    let answers: Vec<_> = (0..3)
        .map(|_| player.run_cycle())
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .map(|s| (s.answer, s.related))
        .collect();
    assert_eq!(
        answers,
        [
            ("sea".to_string(), true),
            ("mountain".to_string(), true),
            ("ocean".to_string(), false)
        ]
    );
    assert_eq!(
        *typed.0.borrow(),
        ["sea", "\n", "mountain", "\n", "ocean", "\n"]
    );
    assert_eq!(player.selector().history().offered("ocean"), ["sea", "mountain"]);
    Ok(())
}

#[test]
fn test_unreadable_word_is_skipped() -> Result<()> {
    let script = Script::new(&[" \n"]);
    let typed = Typed::default();
    let mut player = player(Extractor::Blocks, Some(blocks_screen()), &script, &typed);
    assert!(player.run_cycle()?.is_empty());
    assert!(typed.0.borrow().is_empty());
    Ok(())
}

#[test]
fn test_no_blocks() -> Result<()> {
    let script = Script::new(&["ocean"]);
    let typed = Typed::default();
    let screen = RgbImage::from_pixel(200, 100, GRAY);
    let mut player = player(Extractor::Blocks, Some(screen), &script, &typed);
    assert!(player.run_cycle()?.is_empty());
    // the recognizer was never asked
    assert_eq!(script.0.borrow().len(), 1);
    Ok(())
}

#[test]
fn test_capture_failure_is_fatal() {
    let script = Script::new(&[]);
    let typed = Typed::default();
    let mut player = player(Extractor::Blocks, None, &script, &typed);
    assert!(matches!(
        player.run_cycle(),
        Err(Error::Collaborator("capture", _))
    ));
    assert!(player.run().is_err());
}

#[test]
fn test_arcade_cycle() -> Result<()> {
    let mut template = GrayImage::new(12, 12);
    draw_polygon_mut(
        &mut template,
        &[Point::new(1, 1), Point::new(10, 5), Point::new(1, 10)],
        Luma([255]),
    );
    let mut screen = RgbImage::from_pixel(300, 120, Rgb([30, 60, 120]));
    for (x, y, p) in template.enumerate_pixels() {
        if p[0] > 0 {
            screen.put_pixel(20 + x, 40 + y, Rgb([255, 255, 255]));
        }
    }

    let script = Script::new(&["ocean"]);
    let typed = Typed::default();
    let mut player = player(
        Extractor::Arcade(Marker::new(template)?),
        Some(screen),
        &script,
        &typed,
    );
    let submissions = player.run_cycle()?;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].word, "ocean");
    assert_eq!(submissions[0].answer, "sea");
    Ok(())
}
