//! A terminal chat with the assistant, built on the `parley` library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::num::NonZeroUsize;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use parley::core::AgentBuilder;
use parley::core::ingest::PlatformMessage;
use parley::core::profile::AgentMerger;
use parley::{DEFAULT_WINDOW_SIZE, FileProfileStore, SessionBuilder};
use parley_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::interval;

const BAR_CHAR: &str = "▎";
const APOLOGY: &str = "Sorry, something went wrong. Please try again.";

/// A line typed in the terminal.
struct TerminalMessage {
    content: String,
    author: Option<String>,
}

impl PlatformMessage for TerminalMessage {
    fn content(&self) -> &str {
        &self.content
    }

    fn is_from_bot(&self) -> bool {
        false
    }

    fn author_name(&self) -> Option<&str> {
        self.author.as_deref()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(model) = env::var("OPENAI_MODEL") else {
        eprintln!("OPENAI_MODEL environment variable is not set");
        return;
    };
    let window_size = match env::var("PARLEY_WINDOW_SIZE") {
        Ok(value) => match value.parse::<NonZeroUsize>() {
            Ok(size) => size,
            Err(err) => {
                warn!("invalid PARLEY_WINDOW_SIZE {value:?}: {err}");
                DEFAULT_WINDOW_SIZE
            }
        },
        Err(_) => DEFAULT_WINDOW_SIZE,
    };
    let profile_path = env::var("PARLEY_PROFILE_PATH")
        .unwrap_or_else(|_| "profile.md".to_owned());

    // A missing key or base URL is reported by the first request.
    let config = OpenAIConfigBuilder::from_env().build();
    let model_provider = OpenAIProvider::new(config);

    let profile_merger = AgentMerger::new(
        AgentBuilder::with_model_provider(model_provider.clone())
            .with_system_prompt(include_str!("./profile_merger.md"))
            .with_config(|config| {
                config
                    .with_model(model.clone())
                    .with_temperature(0.1)
                    .with_max_tokens(3000)
            })
            .build(),
    );

    let session = SessionBuilder::with_model_provider(model_provider)
        .with_system_prompt(
            include_str!("./system_prompt.md")
                .replace("{{HOST_OS}}", host_os()),
        )
        .with_model(model)
        .with_window_size(window_size)
        .with_profile_store(FileProfileStore::new(profile_path))
        .with_profile_merger(profile_merger)
        .build()
        .await;
    let mut session = match session {
        Ok(session) => session,
        Err(err) => {
            error!("failed to start the session: {err}");
            eprintln!("Failed to start the session: {err}");
            return;
        }
    };

    let author = env::var("USER").ok();
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let message = TerminalMessage {
            content: line.to_owned(),
            author: author.clone(),
        };

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let mut reply = pin!(session.reply(&message));
        let mut ticks = interval(Duration::from_millis(100));
        let result = loop {
            select! {
                result = &mut reply => break result,
                _ = ticks.tick() => progress_bar.inc(1),
            }
        };
        progress_bar.finish_and_clear();

        let text = match result {
            Ok(Some(text)) => text,
            Ok(None) => continue,
            Err(err) => {
                error!("failed to reply: {err}");
                APOLOGY.to_owned()
            }
        };
        println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
    }
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

#[inline]
fn host_os() -> &'static str {
    match env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        _ => "some other OS",
    }
}
