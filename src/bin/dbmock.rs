//! dbmock is an interactive SQL shell against an in-memory mock server. It
//! optionally loads a schema file on startup, and otherwise behaves like the
//! mock does in tests. Command history is stored in .dbmock.history.

#![warn(clippy::all)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser as _;
use itertools::Itertools as _;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Editor, Modifiers};
use rustyline_derive::{Completer, Helper, Highlighter, Hinter};

use dbmock::errinput;
use dbmock::error::Result;
use dbmock::sql::parser::{Lexer, Token};
use dbmock::{Config, Connection, Server};

fn main() {
    if let Err(error) = Command::parse().run() {
        eprintln!("Error: {error}");
    }
}

/// The dbmock command.
#[derive(clap::Parser)]
#[command(about = "An in-memory mock SQL database shell.", version, propagate_version = true)]
struct Command {
    /// A SQL statement to execute, then exit.
    #[arg()]
    statement: Option<String>,
    /// The configuration file path.
    #[arg(short = 'c', long)]
    config: Option<String>,
    /// A schema file of CREATE TABLE statements to load on startup.
    #[arg(short = 's', long)]
    schema: Option<PathBuf>,
    /// The database to use.
    #[arg(short = 'd', long, default_value = "main")]
    database: String,
}

impl Command {
    /// Runs the command.
    fn run(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        let loglevel = config.log_level.parse::<simplelog::LevelFilter>()?;
        let mut logconfig = simplelog::ConfigBuilder::new();
        if loglevel != simplelog::LevelFilter::Debug {
            logconfig.add_filter_allow_str("dbmock");
        }
        simplelog::SimpleLogger::init(loglevel, logconfig.build())?;

        let server = Arc::new(Server::new("dbmock", config));
        if let Some(schema) = &self.schema {
            server.load_schema(&self.database, &std::fs::read_to_string(schema)?)?;
        }
        let mut shell = Shell::new(Server::connect(&server, self.database))?;
        match self.statement {
            Some(statement) => shell.execute(&statement),
            None => shell.run(),
        }
    }
}

/// An interactive dbmock shell.
struct Shell {
    /// The connection to the mock server.
    conn: Connection,
    /// The Rustyline command editor.
    editor: Editor<InputValidator, DefaultHistory>,
    /// The path to the history file, if any.
    history_path: Option<PathBuf>,
    /// If true, SELECT column headers will be displayed.
    show_headers: bool,
}

impl Shell {
    /// Creates a new shell for the given connection.
    fn new(conn: Connection) -> Result<Self> {
        // Set up Rustyline. Make sure multiline pastes are handled normally.
        let mut editor = Editor::new()?;
        editor.set_helper(Some(InputValidator));
        editor.bind_sequence(
            rustyline::KeyEvent(rustyline::KeyCode::BracketedPasteStart, Modifiers::NONE),
            rustyline::Cmd::Noop,
        );
        let history_path =
            std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".dbmock.history"));
        Ok(Self { conn, editor, history_path, show_headers: false })
    }

    /// Executes a SQL statement or ! command.
    fn execute(&mut self, input: &str) -> Result<()> {
        if input.starts_with('!') {
            self.execute_command(input)
        } else if !input.is_empty() {
            self.execute_sql(input)
        } else {
            Ok(())
        }
    }

    /// Executes a dbmock ! command (e.g. !help)
    fn execute_command(&mut self, input: &str) -> Result<()> {
        let mut input = input.split_ascii_whitespace();
        let Some(command) = input.next() else {
            return errinput!("expected command");
        };
        let args = input.collect_vec();
        let server = self.conn.server().clone();

        match (command, args.as_slice()) {
            // Toggles column headers.
            ("!headers", []) => {
                self.show_headers = !self.show_headers;
                match self.show_headers {
                    true => println!("Headers enabled"),
                    false => println!("Headers disabled"),
                }
            }
            ("!headers", _) => return errinput!("!headers takes no arguments"),

            // Displays help.
            ("!help", []) => println!(
                r#"
Enter a SQL statement terminated by a semicolon (;) to execute it, or Ctrl-D to
exit. The following commands are also available:

    !headers           Toggles column headers
    !help              This help message
    !reset             Delete all rows, keeping table schemas
    !restore NAME      Restore a named snapshot
    !snapshot NAME     Save the current data as a named snapshot
    !tables            List tables in the current database
    !use DB            Switch to another database
"#
            ),
            ("!help", _) => return errinput!("!help takes no arguments"),

            ("!reset", []) => {
                server.reset()?;
                println!("Reset all tables");
            }
            ("!reset", _) => return errinput!("!reset takes no arguments"),

            ("!restore", [name]) => {
                server.restore(name)?;
                println!("Restored snapshot {name}");
            }
            ("!restore", _) => return errinput!("!restore takes 1 argument"),

            ("!snapshot", [name]) => {
                server.snapshot(name)?;
                println!("Saved snapshot {name}");
            }
            ("!snapshot", _) => return errinput!("!snapshot takes 1 argument"),

            ("!tables", []) => {
                for table in server.tables(self.conn.database())? {
                    match server.schema(self.conn.database(), &table)? {
                        Some(schema) => println!("{schema}"),
                        None => println!("{table} (schemaless)"),
                    }
                }
            }
            ("!tables", _) => return errinput!("!tables takes no arguments"),

            ("!use", [database]) => {
                self.conn.select_db(*database);
                println!("Using database {database}");
            }
            ("!use", _) => return errinput!("!use takes 1 argument"),

            (command, _) => return errinput!("unknown command {command}"),
        }
        Ok(())
    }

    /// Executes a SQL statement and displays the results.
    fn execute_sql(&mut self, statement: &str) -> Result<()> {
        let result = self.conn.query(statement)?;
        if result.affected_rows() > 0 || result.rows().is_empty() {
            println!("Affected {} rows", result.affected_rows());
            return Ok(());
        }
        if self.show_headers {
            if let Some(first) = result.rows().first() {
                println!("{}", first.keys().join(", "));
            }
        }
        for row in result.rows() {
            println!("{}", row.values().map(|v| v.to_sql()).join(", "));
        }
        Ok(())
    }

    /// Prompts the user for input.
    fn prompt(&mut self) -> rustyline::Result<String> {
        let prompt = format!("dbmock:{}> ", self.conn.database());
        self.editor.readline(&prompt)
    }

    /// Runs the interactive shell.
    fn run(&mut self) -> Result<()> {
        // Load the history file, if any.
        if let Some(history_path) = &self.history_path {
            match self.editor.load_history(history_path) {
                Ok(()) => {}
                Err(ReadlineError::Io(error)) if error.kind() == std::io::ErrorKind::NotFound => {}
                Err(error) => return Err(error.into()),
            }
        }

        println!("dbmock in-memory server. Enter !help for instructions.");

        // Prompt for commands and execute them.
        loop {
            let input = match self.prompt() {
                Ok(input) => input.trim().to_string(),
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(error) => return Err(error.into()),
            };
            self.editor.add_history_entry(&input)?;
            if let Err(error) = self.execute(&input) {
                eprintln!("Error: {error}");
            };
        }

        // Save the history file.
        if let Some(history_path) = &self.history_path {
            self.editor.save_history(history_path)?;
        }
        Ok(())
    }
}

/// A Rustyline helper for multiline editing. After a new line is entered, it
/// determines whether the input makes up a complete SQL statement that should
/// be executed (i.e. it's terminated by ;), or waits for further input.
#[derive(Completer, Helper, Highlighter, Hinter)]
struct InputValidator;

impl Validator for InputValidator {
    fn validate(&self, ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        let input = ctx.input();
        // Empty lines and ! commands are ready.
        if input.is_empty() || input.starts_with('!') || input == ";" {
            return Ok(ValidationResult::Valid(None));
        }
        // For SQL statements, just look for any semicolon or lexer error, and
        // leave further validation to the processor.
        if Lexer::new(input).any(|r| matches!(r, Ok(Token::Semicolon) | Err(_))) {
            return Ok(ValidationResult::Valid(None));
        }
        Ok(ValidationResult::Incomplete)
    }

    fn validate_while_typing(&self) -> bool {
        false
    }
}
