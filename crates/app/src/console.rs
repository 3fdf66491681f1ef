//! Line-oriented front end: register once, then read, page through and post
//! comments.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use domain::{CommentId, User};
use session::{register, PageOutcome, PaginationController, ReplyDraft, SessionError};
use storage::Db;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::render::render_forest;

const HELP: &str = "\
Commands:
  register <email> <username>   create your user
  post [text]                   add a comment (or the reply being drafted);
                                without text, retries the kept draft
  reply <id>                    reply to a loaded comment, e.g. `reply 12`
  cancel                        stop replying and drop the draft
  more                          load the next page of comments
  refresh                       reload from the newest comment
  show                          print the loaded comments
  reset-db                      drop and recreate all tables
  help                          this text
  quit                          exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Register { email: String, username: String },
    Post(String),
    Reply(CommentId),
    Cancel,
    More,
    Refresh,
    Show,
    ResetDb,
    Help,
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));

    match verb.to_ascii_lowercase().as_str() {
        "register" => {
            let mut args = rest.split_whitespace();
            match (args.next(), args.next(), args.next()) {
                (Some(email), Some(username), None) => Ok(Command::Register {
                    email: email.to_string(),
                    username: username.to_string(),
                }),
                _ => Err("Usage: register <email> <username>".to_string()),
            }
        }
        "post" => Ok(Command::Post(rest.to_string())),
        "reply" => rest
            .trim_start_matches('#')
            .parse::<i64>()
            .map(|id| Command::Reply(CommentId::new(id)))
            .map_err(|_| "Usage: reply <comment id>".to_string()),
        "cancel" => Ok(Command::Cancel),
        "more" => Ok(Command::More),
        "refresh" => Ok(Command::Refresh),
        "show" => Ok(Command::Show),
        "reset-db" => Ok(Command::ResetDb),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        "" => Err(String::new()),
        other => Err(format!(
            "Unknown command `{other}`. Type `help` for a list."
        )),
    }
}

pub struct Console {
    db: Arc<Db>,
    page_size: u32,
    user: Option<User>,
    feed: Arc<PaginationController<Db>>,
    draft: ReplyDraft<Db>,
}

impl Console {
    pub fn new(db: Arc<Db>, page_size: u32) -> Self {
        let feed = Arc::new(PaginationController::new(db.clone()));
        let draft = ReplyDraft::new(db.clone(), feed.clone(), page_size);
        Self {
            db,
            page_size,
            user: None,
            feed,
            draft,
        }
    }

    pub fn prompt(&self) -> String {
        match &self.user {
            None => "register> ".to_string(),
            Some(user) => format!("{} [{}]> ", user.username, self.draft.action_label()),
        }
    }

    /// Runs one command and returns what should be shown to the user.
    pub async fn execute(&mut self, command: Command) -> String {
        match command {
            Command::Help => HELP.to_string(),
            Command::Quit => String::new(),
            Command::Register { email, username } => self.register(&email, &username).await,
            Command::ResetDb => self.reset_db().await,
            other => match self.user.clone() {
                Some(user) => self.comment_command(&user, other).await,
                None => "Please register first: register <email> <username>".to_string(),
            },
        }
    }

    async fn register(&mut self, email: &str, username: &str) -> String {
        if let Some(user) = &self.user {
            return format!("Already registered as {}.", user.username);
        }
        match register(&*self.db, email, username).await {
            Ok(user) => {
                let greeting = format!("Welcome, {} ({})!", user.username, user.email);
                self.user = Some(user);
                let page = self.reload().await;
                format!("{greeting}\n{page}")
            }
            Err(SessionError::Validation(e)) => e.to_string(),
            Err(e) => format!("Registration failed: {e}"),
        }
    }

    async fn comment_command(&mut self, user: &User, command: Command) -> String {
        match command {
            Command::Post(text) => {
                // a bare `post` retries the kept draft
                if !text.is_empty() {
                    self.draft.set_text(text);
                }
                match self.draft.submit(&self.draft.text(), user.id).await {
                    Ok(outcome) => {
                        let mut out = format!("Comment {} added.\n", outcome.comment_id);
                        if !outcome.refreshed {
                            out.push_str("Could not reload comments; try `refresh`.\n");
                        }
                        out.push_str(&self.render());
                        out
                    }
                    Err(SessionError::Store(e)) => format!(
                        "Could not add comment ({e}). Your draft was kept; `post` again to retry."
                    ),
                    Err(e) => e.to_string(),
                }
            }
            Command::Reply(id) => match self.feed.find(id) {
                Some(comment) => {
                    self.draft.start_reply(&comment);
                    format!("Replying to: {}\n({})", comment.text, self.draft.prompt())
                }
                None => format!("Comment {id} is not loaded."),
            },
            Command::Cancel => {
                self.draft.cancel_reply();
                "Reply cancelled.".to_string()
            }
            Command::More => match self.feed.load_more(self.page_size).await {
                Ok(PageOutcome::Loaded { added, .. }) => {
                    format!("Loaded {added} more.\n{}", self.render())
                }
                Ok(PageOutcome::Exhausted) => "No more comments.".to_string(),
                Ok(PageOutcome::Skipped | PageOutcome::Discarded) => "Loading...".to_string(),
                Err(e) => format!("Could not load comments: {e}"),
            },
            Command::Refresh => self.reload().await,
            Command::Show => self.render(),
            Command::Register { .. } | Command::ResetDb | Command::Help | Command::Quit => {
                String::new()
            }
        }
    }

    async fn reload(&self) -> String {
        match self.feed.refresh(self.page_size).await {
            Ok(_) => self.render(),
            Err(e) => format!("Could not load comments: {e}"),
        }
    }

    async fn reset_db(&mut self) -> String {
        if let Err(e) = self.db.recreate().await {
            warn!("Failed to reset database: {:#}", e);
            return format!("Could not reset the database: {e}");
        }
        self.feed.reset();
        self.draft.cancel_reply();
        self.user = None;
        info!("database reset from console");
        "Database cleared. Please register again.".to_string()
    }

    fn render(&self) -> String {
        let mut out = render_forest(&self.feed.forest(), Utc::now().naive_utc());
        let more = if self.feed.has_more() {
            ", `more` for older"
        } else {
            ""
        };
        out.push_str(&format!("-- {} comment(s) loaded{more}", self.feed.len()));
        out
    }
}

/// Reads commands from stdin until `quit`, end of input, or `cancel` fires.
pub async fn run(db: Arc<Db>, page_size: u32, cancel: CancellationToken) -> anyhow::Result<()> {
    let mut console = Console::new(db, page_size);
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    println!("Threaded comments. Type `help` for commands.");
    loop {
        print!("{}", console.prompt());
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            next = lines.next() => match next {
                Some(line) => line.context("Failed to read input")?,
                None => break,
            },
        };

        let command = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(message) => {
                if !message.is_empty() {
                    println!("{message}");
                }
                continue;
            }
        };
        println!("{}", console.execute(command).await);
    }

    println!();
    Ok(())
}
