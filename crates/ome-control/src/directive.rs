//! Directives: command lines forwarded between instances.

use crate::protocol::{serialize, tokenize};
use std::path::PathBuf;

/// Ordered tokens of one forwarded invocation, without the executable path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directive {
    tokens: Vec<String>,
}

impl Directive {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode one received line.
    pub fn from_line(line: &str) -> Self {
        Self {
            tokens: tokenize(line),
        }
    }

    /// Encode for transmission (no trailing newline).
    pub fn to_line(&self) -> String {
        serialize(&self.tokens)
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// What a directive asks for. Recognition is order-independent and
/// unknown tokens are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Command {
    /// First bare token.
    pub config_path: Option<PathBuf>,
    /// Second bare token.
    pub source_folder: Option<PathBuf>,
    pub minimize: bool,
    pub pause: bool,
    pub resume: bool,
    pub no_focus: bool,
    pub exit: bool,
}

impl Command {
    pub fn parse(directive: &Directive) -> Self {
        let mut command = Command::default();
        let mut bare = 0;

        for token in directive.tokens() {
            match token.as_str() {
                "--minimize" | "-m" => command.minimize = true,
                "--pause" | "-p" => command.pause = true,
                "--resume" | "-r" => command.resume = true,
                "--no-focus" | "-nf" => command.no_focus = true,
                "--exit" | "-x" => command.exit = true,
                t if t.starts_with('-') || t.is_empty() => {}
                t => {
                    match bare {
                        0 => command.config_path = Some(PathBuf::from(t)),
                        1 => command.source_folder = Some(PathBuf::from(t)),
                        _ => {}
                    }
                    bare += 1;
                }
            }
        }
        command
    }
}
