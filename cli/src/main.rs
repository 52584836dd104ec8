mod args;
mod desktop;
mod tesseract;

use anyhow::{Context, Result};
use args::{Args, AssociateArgs, Command, ModelArgs, PlayArgs};
use clap::Parser;
use desktop::{CommandCapture, XdotoolKeyboard};
use image::math::Rect;
use log::info;
use semantris_solver::{Extractor, Player, PlayerConfig, Selector, Word2Vec};
use std::time::Duration;
use tesseract::TesseractRecognizer;

fn load_model(args: &ModelArgs) -> Result<Word2Vec> {
    Word2Vec::load(&args.model, !args.text_model)
        .with_context(|| format!("Failed to load model {}", args.model.display()))
}

fn play(args: PlayArgs) -> Result<()> {
    let extractor = Extractor::for_mode(args.mode, &args.template)
        .with_context(|| format!("Failed to prepare {} mode", args.mode))?;
    let model = load_model(&args.model)?;
    let region = args.region.map(|r| Rect {
        x: r[0],
        y: r[1],
        width: r[2],
        height: r[3],
    });
    let config = PlayerConfig {
        initial_wait: Duration::from_secs(args.initial_wait),
        refresh: Duration::from_secs(args.refresh),
        region,
        ..PlayerConfig::default()
    };
    let mut player = Player::new(
        extractor,
        model,
        Box::new(CommandCapture::new(&args.capture)),
        Box::new(XdotoolKeyboard),
        Box::new(TesseractRecognizer::new(args.tesseract)),
        rand::thread_rng(),
        config,
    );
    info!("playing {} mode, stop with Ctrl-C", args.mode);
    player.run()?;
    Ok(())
}

fn associate(args: AssociateArgs) -> Result<()> {
    let model = load_model(&args.model)?;
    let mut selector = Selector::new();
    let mut rng = rand::thread_rng();
    for word in args.words.iter() {
        for _ in 0..args.repeat {
            match selector.associate(word, &model, &mut rng) {
                Ok(answer) => println!("{}: {}", word, answer),
                Err(err) => println!("{}: {} ({})", word, word, err),
            }
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let res = match args.command {
        Command::Play(args) => play(args),
        Command::Associate(args) => associate(args),
    };
    if let Err(err) = res {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}
