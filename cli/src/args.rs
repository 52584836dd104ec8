use clap::{Args as ClapArgs, Parser, Subcommand};
use semantris_solver::GameMode;
use std::path::PathBuf;

/// Semantris solver command line
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Print game activity logs
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play the game in the focused browser window
    Play(PlayArgs),
    /// Print the associations the solver would enter for some words
    Associate(AssociateArgs),
}

/// Where the word vectors come from
#[derive(ClapArgs, Debug)]
pub struct ModelArgs {
    /// Word2vec model file
    #[arg(long, env = "SEMANTRIS_SOLVER_WORD2VEC_PATH", value_name = "FILE")]
    pub model: PathBuf,

    /// The model file uses the word2vec text format instead of the binary one
    #[arg(long)]
    pub text_model: bool,
}

#[derive(ClapArgs, Debug)]
pub struct PlayArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Semantris game mode: arcade or blocks
    #[arg(long, default_value = "arcade")]
    pub mode: GameMode,

    /// Highlight marker template, used in arcade mode
    #[arg(long, default_value = "assets/arcade_template.png", value_name = "FILE")]
    pub template: PathBuf,

    /// Seconds to wait before the first screenshot
    #[arg(long, default_value = "10", value_name = "SECONDS")]
    pub initial_wait: u64,

    /// Seconds to wait between screenshots
    #[arg(long, default_value = "2", value_name = "SECONDS")]
    pub refresh: u64,

    /// Capture only this part of the screen
    #[arg(long, num_args = 4, value_delimiter = ',', value_name = "X,Y,WIDTH,HEIGHT")]
    pub region: Option<Vec<u32>>,

    /// Screenshot command, `{}` is replaced by the PNG file to write
    #[arg(
        long,
        env = "SEMANTRIS_SOLVER_CAPTURE",
        default_value = "import -window root {}",
        value_name = "COMMAND"
    )]
    pub capture: String,

    /// Tesseract executable
    #[arg(long, default_value = "tesseract", value_name = "FILE")]
    pub tesseract: String,
}

#[derive(ClapArgs, Debug)]
pub struct AssociateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// How many times to ask for each word
    #[arg(long, default_value = "1")]
    pub repeat: usize,

    /// Words to find associations for
    #[arg(required = true)]
    pub words: Vec<String>,
}
