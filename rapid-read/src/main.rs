//! rapid-read - speech-synchronized rapid reading of EPUB and HTML documents

mod config;
mod extract;
mod player;
mod schedule;
mod ssml;
mod text;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use config::ReaderConfig;
use player::device::SpeakerOutput;
use player::{Player, PlayerError};
use schedule::{WordSlot, highlight_index};
use speech_client::get_provider;

#[derive(Parser, Debug)]
#[command(name = "rapid-read")]
#[command(about = "Read documents one word at a time, in sync with synthesized speech", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the document (.epub, .html)
    document: Option<PathBuf>,

    /// Chunk to start reading from
    #[arg(long, default_value_t = 0)]
    chunk: usize,

    /// EPUB spine item to start extraction from
    #[arg(long)]
    item_page: Option<usize>,

    /// Synthesis voice (overrides config)
    #[arg(long)]
    voice: Option<String>,

    /// Speaking style; "default" disables style markup (overrides config)
    #[arg(long)]
    style: Option<String>,

    /// Prosody rate, e.g. "+20.00%" (overrides config)
    #[arg(long)]
    rate: Option<String>,

    /// Maximum tagged items per synthesized chunk (overrides config)
    #[arg(long)]
    max_tokens: Option<usize>,

    /// Print the table of contents and exit
    #[arg(long)]
    toc: bool,

    /// Enable debug output
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Subcommands
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set default voice
    SetVoice {
        /// Voice name, e.g. en-US-AriaNeural
        name: String,
    },
    /// Set default speaking style
    SetStyle {
        /// Style name, or "default" for none
        value: String,
    },
    /// Set default prosody rate
    SetRate {
        /// Rate, e.g. "+20.00%"
        value: String,
    },
    /// Set default chunk size
    SetMaxTokens {
        /// Maximum tagged items per synthesized chunk
        value: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Some(Commands::Config { action }) = &args.command {
        return handle_config_command(action);
    }

    let document = args.document.clone().ok_or_else(|| {
        anyhow::anyhow!("Document path is required. Run 'rapid-read --help' for usage.")
    })?;

    let mut config = ReaderConfig::load().context("Failed to load configuration")?;
    if let Some(voice) = args.voice.clone() {
        config.voice = voice;
    }
    if let Some(style) = args.style.clone() {
        config.style = style;
    }
    if let Some(rate) = args.rate.clone() {
        config.rate = rate;
    }
    if let Some(max_tokens) = args.max_tokens {
        config.max_tokens = max_tokens;
    }

    let blocks = extract::load_document(&document, args.item_page)
        .with_context(|| format!("Failed to read {}", document.display()))?;
    let chunks = text::chunk_blocks(&blocks, config.max_tokens);
    if chunks.is_empty() {
        return Err(extract::DocumentError::Empty(document).into());
    }
    eprintln!("Chunks: {}", chunks.len());

    if args.toc {
        for (i, chunk) in chunks.iter().enumerate() {
            println!("{i:4}  {}", chunk.preview());
        }
        return Ok(());
    }

    // Environment credentials win over the config file.
    let key = std::env::var("SPEECH_KEY")
        .ok()
        .or_else(|| config.speech_key.clone());
    let region = std::env::var("SPEECH_REGION")
        .ok()
        .or_else(|| config.speech_region.clone());
    let provider = get_provider(key, region)?;
    provider.is_available()?;
    let output = SpeakerOutput::new().context("Failed to open audio output")?;

    // Synthesized chunk audio lives here for the duration of the session.
    let audio_dir = tempfile::tempdir().context("Failed to create audio directory")?;

    let player = Player::new(
        chunks,
        Arc::from(provider),
        Arc::new(output),
        config.speech_style(),
        config.window,
        audio_dir.path().to_path_buf(),
        Arc::new(render_word),
    )?;

    eprintln!("Controls: [p]ause  [r]esume  [b]ack  [s]kip  [R]estart  j <n> jump  [q]uit");
    player.play_from(args.chunk).await?;

    let mut commands = spawn_stdin_reader();
    loop {
        tokio::select! {
            _ = player.wait_until_finished() => break,
            line = commands.recv() => {
                let Some(line) = line else { break };
                match handle_command(&player, line.trim()).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => eprintln!("{e}"),
                }
            }
        }
    }

    Ok(())
}

/// Render one word: left context, the word with its pivot letter
/// highlighted, right context.
fn render_word(slot: &WordSlot) {
    let pivot = highlight_index(slot.word.chars().count());
    let mut word = String::new();
    for (i, ch) in slot.word.chars().enumerate() {
        if Some(i) == pivot {
            word.push_str("\x1b[1;31m");
            word.push(ch);
            word.push_str("\x1b[0m");
        } else {
            word.push(ch);
        }
    }
    println!("{:>36} | {} | {}", slot.left, word, slot.right);
}

/// Feed stdin lines into the async control loop.
fn spawn_stdin_reader() -> tokio::sync::mpsc::UnboundedReceiver<String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

/// Dispatch one control command. Returns `Ok(true)` to quit.
async fn handle_command(player: &Player, command: &str) -> Result<bool, PlayerError> {
    match command {
        "p" | "pause" => player.pause().await?,
        "r" | "resume" | "play" => player.play().await?,
        "b" | "back" => player.back().await?,
        "s" | "skip" => player.skip().await?,
        "R" | "restart" => player.restart().await?,
        "q" | "quit" => return Ok(true),
        "" => {}
        other => {
            if let Some(n) = other
                .strip_prefix("j ")
                .or_else(|| other.strip_prefix("jump "))
                .and_then(|n| n.trim().parse::<usize>().ok())
            {
                player.jump_to(n).await?;
            } else {
                eprintln!("Unknown command: {other}");
            }
        }
    }
    Ok(false)
}

fn handle_config_command(action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = ReaderConfig::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::SetVoice { name } => {
            let mut config = ReaderConfig::load()?;
            config.voice = name.clone();
            config.save()?;
            println!("Default voice set to {name}");
        }
        ConfigAction::SetStyle { value } => {
            let mut config = ReaderConfig::load()?;
            config.style = value.clone();
            config.save()?;
            println!("Default style set to {value}");
        }
        ConfigAction::SetRate { value } => {
            let mut config = ReaderConfig::load()?;
            config.rate = value.clone();
            config.save()?;
            println!("Default rate set to {value}");
        }
        ConfigAction::SetMaxTokens { value } => {
            let mut config = ReaderConfig::load()?;
            config.max_tokens = *value;
            config.save()?;
            println!("Default chunk size set to {value}");
        }
    }
    Ok(())
}
