use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use repfuel_agent::{ChatRequest, ChatResponse};
use repfuel_core::{AppConfig, LoadOptions};

use crate::bootstrap;
use crate::commands::CommandResult;

pub fn run(config_path: Option<PathBuf>, user: String, message: Option<String>) -> CommandResult {
    let config = match AppConfig::load(LoadOptions { config_path, ..Default::default() }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(async {
        let app = match bootstrap::bootstrap_with_config(config).await {
            Ok(app) => app,
            Err(error) => {
                return CommandResult::failure("chat", "bootstrap", error.to_string(), 4);
            }
        };

        let result = match message {
            Some(text) => one_shot(&app, &user, text).await,
            None => interactive(&app, &user).await,
        };
        app.db_pool.close().await;

        match result {
            Ok(()) => CommandResult::success("chat", "session complete"),
            Err(error) => CommandResult::failure("chat", "request", error, 5),
        }
    })
}

async fn one_shot(app: &bootstrap::Application, user: &str, text: String) -> Result<(), String> {
    let response = app
        .engine
        .handle_message(ChatRequest::new(user, text))
        .await
        .map_err(|error| error.to_string())?;
    println!("{}", render(&response));
    Ok(())
}

async fn interactive(app: &bootstrap::Application, user: &str) -> Result<(), String> {
    println!("Chatting as `{user}`. Type a message, or `exit` to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush().map_err(|error| error.to_string())?;
        let mut line = String::new();
        let read = stdin.lock().read_line(&mut line).map_err(|error| error.to_string())?;
        if read == 0 {
            return Ok(());
        }
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "exit" || text == "quit" {
            return Ok(());
        }
        let response = app
            .engine
            .handle_message(ChatRequest::new(user, text))
            .await
            .map_err(|error| error.to_string())?;
        println!("{}", render(&response));
    }
}

fn render(response: &ChatResponse) -> String {
    let mut out = response.response.clone();
    if !response.recommendations.is_empty() {
        out.push_str("\n\nSuggestions:");
        for recommendation in &response.recommendations {
            out.push_str(&format!("\n  - {}: {}", recommendation.title, recommendation.message));
        }
    }
    if !response.actions_taken.is_empty() {
        out.push_str(&format!("\n\n(actions: {})", response.actions_taken.join(", ")));
    }
    out
}

fn init_logging(config: &AppConfig) {
    use repfuel_core::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
