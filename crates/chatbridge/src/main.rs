//! A terminal chat program demonstrating how to use `chatbridge` as a
//! library.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use chatbridge::core::StreamHandle;
use chatbridge::{
    CallParams, MemoryParams, OpenAIParams, Output, chain_call, chat_memory,
    new_openai,
};
use indicatif::style::TemplateError;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Ok(api_key) = env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY environment variable is not set");
        return;
    };
    let llm = match new_openai(OpenAIParams {
        api_key: Some(api_key),
        base_url: env::var("OPENAI_BASE_URL").ok(),
        model: env::var("OPENAI_MODEL").ok(),
    }) {
        Ok(llm) => llm,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    let memory = chat_memory(MemoryParams {
        session_id: env::var("CHATBRIDGE_SESSION").ok(),
    });
    let stream = env::var("CHATBRIDGE_STREAM").map_or(true, |v| v != "0");

    let progress_style = match progress_style() {
        Ok(style) => style,
        Err(err) => {
            eprintln!("invalid progress template: {err}");
            return;
        }
    };

    // One reader for the whole session, so buffered input isn't lost
    // between prompts.
    let mut stdin = io::BufReader::new(io::stdin());
    loop {
        print!("> ");
        flush();

        let Some(line) = read_line(&mut stdin).await else {
            break;
        };
        let prompt = line.trim();
        if prompt.is_empty() {
            continue;
        }

        let params = CallParams::new(llm.clone())
            .with_memory(memory.clone())
            .with_prompt(prompt)
            .with_stream(stream);
        let output = match with_spinner(&progress_style, chain_call(params)).await
        {
            Ok(output) => output,
            Err(err) => {
                print_error(&err);
                continue;
            }
        };

        match output.default {
            Output::Text(text) => print_assistant(&text),
            Output::Stream(handle) => {
                print_stream(&progress_style, handle).await;
            }
        }
        if let Some(call) = output.function_call {
            println!(
                "{}🔧 {}({})",
                BAR_CHAR.bright_yellow(),
                call.name.bright_white().bold(),
                call.arguments
            );
        }
        println!();
    }
}

fn progress_style() -> Result<ProgressStyle, TemplateError> {
    let style = ProgressStyle::with_template("{spinner} {wide_msg}")?;
    Ok(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"))
}

/// Ticks a spinner until `fut` completes.
async fn with_spinner<F: Future>(style: &ProgressStyle, fut: F) -> F::Output {
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(style.clone());
    progress_bar.set_message("🤔 Thinking...");

    let mut fut = pin!(fut);
    loop {
        progress_bar.inc(1);
        select! {
            output = &mut fut => {
                // Finish the progress bar before printing anything else.
                progress_bar.finish_and_clear();
                return output;
            }
            _ = sleep(Duration::from_millis(100)) => {}
        }
    }
}

async fn print_stream(style: &ProgressStyle, mut handle: StreamHandle) {
    let mut started = false;
    loop {
        let fragment = if started {
            handle.next_fragment().await
        } else {
            with_spinner(style, handle.next_fragment()).await
        };
        match fragment {
            Some(Ok(fragment)) => {
                if !started {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    started = true;
                }
                print!("{}", fragment.bright_white());
                flush();
            }
            Some(Err(err)) => {
                if started {
                    println!();
                }
                print_error(&err);
                return;
            }
            None => break,
        }
    }
    if started {
        println!();
    }
}

fn print_assistant(text: &str) {
    println!("{}🤖 {}", BAR_CHAR.bright_cyan(), text.bright_white());
}

fn print_error(err: &dyn std::error::Error) {
    println!("{}❌ {}", BAR_CHAR.bright_red(), err.bright_red());
}

fn flush() {
    if let Err(err) = std::io::stdout().flush() {
        warn!("failed to flush stdout: {err}");
    }
}

async fn read_line<R: AsyncBufRead + Unpin>(input: &mut R) -> Option<String> {
    let mut line = String::new();

    match input.read_line(&mut line).await {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
