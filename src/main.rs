//! Revalue CLI - coerce and stringify values from the shell

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use revalue::{
    parse_str_with_type, parse_stringify, restore_str, to_stringify, to_stringify_marked,
    try_parse_str_with_type, type_name, type_of, FixSuggestion, RevalueError,
};

#[derive(Parser)]
#[command(name = "revalue")]
#[command(about = "Revalue - restore typed values from text")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Coerce text to the value it represents
    Restore {
        /// Text to coerce
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        input: Option<String>,

        /// Read the text from a file instead
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Evaluate text as a literal expression
    Parse {
        input: String,

        /// Fail instead of falling back to the input string
        #[arg(long)]
        strict: bool,
    },

    /// Coerce text, then serialize it to an envelope
    Stringify {
        input: String,

        /// Use the marker-prefixed format instead of the tagged envelope
        #[arg(long)]
        marked: bool,
    },

    /// Parse an envelope back into a value
    Unstringify { input: String },

    /// Show the type of the coerced value
    Type { input: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Restore { input, file } => restore(input, file),
        Commands::Parse { input, strict } => parse(&input, strict),
        Commands::Stringify { input, marked } => {
            let value = restore_str(&input);
            if marked {
                println!("{}", to_stringify_marked(&value));
            } else {
                println!("{}", to_stringify(&value));
            }
            Ok(())
        }
        Commands::Unstringify { input } => {
            println!("{}", parse_stringify(&input));
            Ok(())
        }
        Commands::Type { input } => {
            let value = restore_str(&input);
            println!("{} ({})", type_of(&value), type_name(&value));
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn restore(input: Option<String>, file: Option<PathBuf>) -> Result<(), RevalueError> {
    let text = match (input, file) {
        (_, Some(path)) => fs::read_to_string(path)?,
        (Some(text), None) => text,
        (None, None) => String::new(),
    };
    println!("{}", restore_str(&text));
    Ok(())
}

fn parse(input: &str, strict: bool) -> Result<(), RevalueError> {
    let value = if strict {
        try_parse_str_with_type(input)?
    } else {
        parse_str_with_type(input)
    };
    println!("{}", value);
    Ok(())
}
