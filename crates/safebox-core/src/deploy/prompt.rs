//! Interactive prompt collaborator

use std::io::{BufRead, Write};

use parking_lot::Mutex;
use thiserror::Error;

/// Errors returned by a prompter
#[derive(Error, Debug)]
pub enum PromptError {
    /// The operator cancelled (EOF, Ctrl-C, ...)
    #[error("prompt aborted")]
    Aborted,

    /// Prompting was needed but no prompter is configured
    #[error("no interactive prompter available")]
    Unavailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single question put to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRequest<'a> {
    /// Full name of the entry
    pub name: &'a str,
    /// Short label shown to the operator
    pub label: &'a str,
    /// Value accepted when the operator just presses enter
    pub default: &'a str,
}

impl PromptRequest<'_> {
    /// Answers must be non-empty
    pub fn validate(&self, input: &str) -> Result<(), String> {
        if input.is_empty() {
            Err(format!("{} must not be empty", self.name))
        } else {
            Ok(())
        }
    }
}

/// Obtains values from the operator
///
/// Implementations should re-ask until `PromptRequest::validate` accepts
/// the answer, and return `PromptError::Aborted` if the operator gives up.
pub trait Prompter: Send + Sync {
    fn prompt(&self, request: &PromptRequest<'_>) -> Result<String, PromptError>;
}

/// Line-oriented prompter over any reader/writer pair
///
/// Shows `label [default]: `, treats an empty line as the default and
/// re-asks on invalid input. End of input aborts.
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use safebox_core::deploy::{LinePrompter, PromptRequest, Prompter};
///
/// let prompter = LinePrompter::new(Cursor::new("s3cret\n"), Vec::new());
/// let request = PromptRequest { name: "/dev/api/TOKEN", label: "TOKEN", default: "" };
/// assert_eq!(prompter.prompt(&request).unwrap(), "s3cret");
/// ```
pub struct LinePrompter<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> LinePrompter<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Recover the writer, e.g. to inspect what was shown
    pub fn into_writer(self) -> W {
        self.io.into_inner().1
    }
}

impl LinePrompter<std::io::BufReader<std::io::Stdin>, std::io::Stderr> {
    /// Prompt on the terminal: read stdin, write to stderr
    pub fn stdio() -> Self {
        Self::new(std::io::BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R, W> Prompter for LinePrompter<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn prompt(&self, request: &PromptRequest<'_>) -> Result<String, PromptError> {
        let mut io = self.io.lock();
        let (reader, writer) = &mut *io;

        loop {
            if request.default.is_empty() {
                write!(writer, "{}: ", request.label)?;
            } else {
                write!(writer, "{} [{}]: ", request.label, request.default)?;
            }
            writer.flush()?;

            let mut line = String::new();
            if reader.read_line(&mut line)? == 0 {
                return Err(PromptError::Aborted);
            }

            let answer = line.trim_end_matches(&['\r', '\n'][..]);
            let answer = if answer.is_empty() { request.default } else { answer };

            match request.validate(answer) {
                Ok(()) => return Ok(answer.to_string()),
                Err(message) => writeln!(writer, "{}", message)?,
            }
        }
    }
}
