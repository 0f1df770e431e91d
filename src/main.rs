//! cardvision - diagnostic CLI for the recognition engine
//!
//! Recognizes a card crop or numeric readout from an image file, or runs a
//! synthetic self-test over all 52 cards. Degrades to template matching
//! only when no OCR executable is installed.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cardvision::{
    render_card_sample, token, CardRecognizer, FixedEngine, MultiTemplateMatcher,
    NumericRecognizer, Rank, RecognitionConfig, RobustOcr, Suit, TemplateBank, TesseractEngine,
};

/// Recognize card and numeric symbols in cropped screen images
#[derive(Parser, Debug)]
#[command(name = "cardvision")]
#[command(about = "Recognize card and numeric symbols in cropped screen images")]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recognize a card crop
    Card {
        /// Path to the cropped card image
        image: PathBuf,
    },
    /// Recognize a numeric readout crop
    Number {
        /// Path to the cropped readout image
        image: PathBuf,
    },
    /// Render all 52 synthetic cards and report recognition accuracy
    Selftest,
}

fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RecognitionConfig::load(path)?,
        None => RecognitionConfig::default(),
    };

    let bank = Arc::new(match &config.template_dir {
        Some(dir) => TemplateBank::with_template_dir(dir.clone())?,
        None => TemplateBank::new(),
    });
    let ocr = Arc::new(build_ocr(&config));

    match args.command {
        Command::Card { image } => {
            let img = image::open(&image)
                .with_context(|| format!("Failed to load image: {:?}", image))?;
            let recognizer = CardRecognizer::with_config(
                MultiTemplateMatcher::with_config(bank, config.matcher.clone()),
                ocr,
                config.consensus.clone(),
            );
            let result = recognizer.recognize(&img);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                match &result.best_token {
                    Some(best) => println!(
                        "{} (confidence {:.3}, {:.1}ms)",
                        best, result.best_confidence, result.elapsed_ms
                    ),
                    None => println!("unrecognized ({:.1}ms)", result.elapsed_ms),
                }
                for m in result.all_matches.iter().take(5) {
                    println!("  {:>2}  {:.3}  {:?}", m.token, m.confidence, m.method);
                }
            }
        }
        Command::Number { image } => {
            let img = image::open(&image)
                .with_context(|| format!("Failed to load image: {:?}", image))?;
            let recognizer = NumericRecognizer::new(ocr);
            match recognizer.recognize(&img) {
                Some((value, confidence)) => {
                    if args.json {
                        println!(
                            "{}",
                            serde_json::json!({ "value": value, "confidence": confidence })
                        );
                    } else {
                        println!("{} (confidence {:.3})", value, confidence);
                    }
                }
                None => {
                    if args.json {
                        println!("{}", serde_json::json!({ "value": null }));
                    } else {
                        println!("unrecognized");
                    }
                }
            }
        }
        Command::Selftest => {
            let recognizer = CardRecognizer::with_config(
                MultiTemplateMatcher::with_config(bank, config.matcher.clone()),
                ocr,
                config.consensus.clone(),
            );
            run_selftest(&recognizer);
        }
    }

    Ok(())
}

/// Primary OCR engine, or a silent stub when none is installed so template
/// matching still works on its own.
fn build_ocr(config: &RecognitionConfig) -> RobustOcr {
    match TesseractEngine::new() {
        Ok(engine) => RobustOcr::with_config(Box::new(engine), config.ocr.clone()),
        Err(e) => {
            warn!("Primary OCR engine unavailable ({}), template matching only", e);
            RobustOcr::with_config(Box::new(FixedEngine::silent()), config.ocr.clone())
        }
    }
}

fn run_selftest(recognizer: &CardRecognizer) {
    let mut exact = 0usize;
    let mut mismatched = 0usize;
    let mut missed = 0usize;

    for rank in Rank::ALL {
        for suit in Suit::ALL {
            let expected = token(rank, suit);
            let card = render_card_sample(rank, suit, 80, 112, 255);
            let result = recognizer.recognize(&card);
            match result.best_token.as_deref() {
                Some(t) if t == expected => {
                    exact += 1;
                    info!("{}  ok     {:.3}", expected, result.best_confidence);
                }
                Some(t) => {
                    mismatched += 1;
                    warn!("{}  got {} ({:.3})", expected, t, result.best_confidence);
                }
                None => {
                    missed += 1;
                    warn!("{}  unrecognized", expected);
                }
            }
        }
    }

    println!(
        "selftest: {} exact, {} mismatched, {} unrecognized of 52",
        exact, mismatched, missed
    );
}
