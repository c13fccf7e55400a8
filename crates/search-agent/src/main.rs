//! A terminal front end for `search-agent`.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use search_agent::core::conversation::Role;
use search_agent::core::identity::UserProfile;
use search_agent::core::search::SearchTool;
use search_agent::{Config, Session, identity_message};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

const HELP: &str = "\
Commands:
  /new           start a new conversation
  /list          list conversations
  /switch <n>    switch to conversation <n>
  /signup        create an account
  /login         log in
  /logout        log out
  /quit          exit";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(err) = dotenvy::dotenv() {
        debug!("no .env file loaded: {err}");
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err.bright_red());
            return;
        }
    };

    let (step_tx, mut step_rx) = mpsc::unbounded_channel();
    let mut session = config
        .session_builder()
        .on_step(move |step| {
            let query = step.action.tool_input["query"]
                .as_str()
                .unwrap_or(SearchTool::NAME)
                .to_owned();
            step_tx.send(query).ok();
        })
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    println!("{}", "AI-Powered Search Engine".bold());
    println!("{HELP}\n");

    loop {
        print!("> ");
        std::io::stdout().flush().unwrap();

        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            if !run_command(&mut session, command).await {
                break;
            }
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let reply = {
            let reply_fut = session.send_message(line);
            tokio::pin!(reply_fut);
            loop {
                select! {
                    reply = &mut reply_fut => break reply,
                    Some(query) = step_rx.recv() => {
                        progress_bar
                            .set_message(format!("🔎 Searched: {query}"));
                    }
                    _ = sleep(Duration::from_millis(100)) => {
                        progress_bar.inc(1);
                    }
                }
            }
        };
        progress_bar.finish_and_clear();

        if let Some(conversation) = session.current_conversation() {
            println!("{}", format!("[{}]", conversation.title()).dimmed());
        }
        println!("{}🤖 {}\n", BAR_CHAR.bright_cyan(), reply.bright_white());
    }
}

/// Runs a slash command. Returns `false` if the program should exit.
async fn run_command(session: &mut Session, command: &str) -> bool {
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map(|(name, arg)| (name, arg.trim()))
        .unwrap_or((command, ""));
    match name {
        "new" => {
            session.new_conversation();
            println!("Started a new conversation.");
        }
        "list" => list_conversations(session),
        "switch" => {
            let target = arg
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| session.conversations().get(idx))
                .map(|conversation| conversation.id());
            match target {
                Some(id) => {
                    session.select_conversation(id);
                    show_conversation(session);
                }
                None => println!("{}", "No such conversation.".bright_red()),
            }
        }
        "signup" => {
            let Some(email) = prompt("Email").await else {
                return false;
            };
            let Some(password) = prompt("Password").await else {
                return false;
            };
            let Some(department) = prompt("Department").await else {
                return false;
            };
            let Some(interests) = prompt("Interests (comma-separated)").await
            else {
                return false;
            };
            let Some(skills) = prompt("Skills (comma-separated)").await else {
                return false;
            };
            let profile =
                UserProfile::from_fields(&department, &interests, &skills);
            match session.sign_up(&email, &password, profile).await {
                Ok(_) => {
                    println!("{}", "Account created successfully!".green())
                }
                Err(err) => {
                    println!("{}", identity_message(&err).bright_red())
                }
            }
        }
        "login" => {
            let Some(email) = prompt("Email").await else {
                return false;
            };
            let Some(password) = prompt("Password").await else {
                return false;
            };
            match session.log_in(&email, &password).await {
                Ok(_) => println!("{}", "Logged in successfully!".green()),
                Err(err) => {
                    println!("{}", identity_message(&err).bright_red())
                }
            }
        }
        "logout" => {
            session.log_out();
            println!("Logged out.");
        }
        "quit" | "exit" => return false,
        _ => println!("{HELP}"),
    }
    true
}

fn list_conversations(session: &Session) {
    if session.conversations().is_empty() {
        println!("No conversations yet, just type a question.");
        return;
    }
    let current = session.current_conversation().map(|c| c.id());
    for (idx, conversation) in session.conversations().iter().enumerate() {
        let marker = if Some(conversation.id()) == current {
            "*"
        } else {
            " "
        };
        println!("{marker} {}. {}", idx + 1, conversation.title());
    }
}

fn show_conversation(session: &Session) {
    let Some(conversation) = session.current_conversation() else {
        return;
    };
    println!("{}", format!("[{}]", conversation.title()).dimmed());
    for message in conversation.messages() {
        match message.role() {
            Role::User => println!("> {}", message.content()),
            Role::Assistant => println!(
                "{}🤖 {}\n",
                BAR_CHAR.bright_cyan(),
                message.content().bright_white()
            ),
        }
    }
}

async fn prompt(label: &str) -> Option<String> {
    print!("{label}: ");
    std::io::stdout().flush().ok()?;
    read_line().await.map(|line| line.trim().to_owned())
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
