use std::fmt;

/// Terminal result of handing a piece of source code to the virtual machine.
/// Diagnostics have already been written to stderr by the time this is
/// returned; the variant only tells the host which exit path to take.
#[derive(Debug)]
pub enum Error {
    /// The source was rejected by the compiler
    Compile,
    /// Execution was aborted by a runtime error
    Runtime,
}

impl std::error::Error for Error {}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile error"),
            Self::Runtime => write!(f, "runtime error"),
        }
    }
}

/// Error while scanning Lox source code
#[derive(Debug, Clone)]
pub enum ScanError {
    /// A string literal is unterminated
    UnterminatedString(usize),
    /// Invalid character
    UnexpectedCharacter(usize, char),
}

impl std::error::Error for ScanError {}
impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString(line) => {
                write!(f, "[line {}] Error: Unterminated string.", line)
            }
            Self::UnexpectedCharacter(line, _) => {
                write!(f, "[line {}] Error: Unexpected character.", line)
            }
        }
    }
}

/// Error while parsing and compiling Lox source code
#[derive(Debug)]
pub enum ParseError {
    /// The parser met a token that does not fit the grammar. Fields are the
    /// line, the offending lexeme, and the message.
    UnexpectedToken(usize, String, String),
    /// The source ended while the parser expected more input
    UnexpectedEof(usize, String),
    /// A hard limit of the bytecode format was exceeded. Fields are the line,
    /// the lexeme the parser was at (`None` at end of input), and the message.
    LimitExceeded(usize, Option<String>, String),
}

impl std::error::Error for ParseError {}
impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedToken(line, lexeme, msg) => {
                write!(f, "[line {}] Error at '{}': {}.", line, lexeme, msg)
            }
            Self::UnexpectedEof(line, msg) => {
                write!(f, "[line {}] Error at end: {}.", line, msg)
            }
            Self::LimitExceeded(line, Some(lexeme), msg) => {
                write!(f, "[line {}] Error at '{}': {}.", line, lexeme, msg)
            }
            Self::LimitExceeded(line, None, msg) => {
                write!(f, "[line {}] Error at end: {}.", line, msg)
            }
        }
    }
}

/// Virtual machine errors
#[derive(Debug)]
pub enum RuntimeError {
    /// Push on a full stack, or call on a full frame stack
    StackOverflow,
    /// Pop on an empty stack
    StackUnderflow,
    /// Make call on an uncallable value, or with the wrong argument count
    InvalidCall(String),
    /// Operand(s) given to an opcode are invalid
    InvalidOperand(String),
    /// Accessing an undefined variable
    UndefinedVariable(String),
}

impl std::error::Error for RuntimeError {}
impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackOverflow => write!(f, "Stack overflow."),
            Self::StackUnderflow => write!(f, "Stack underflow."),
            Self::InvalidCall(msg) => write!(f, "{}.", msg),
            Self::InvalidOperand(msg) => write!(f, "{}.", msg),
            Self::UndefinedVariable(name) => write!(f, "Undefined variable '{}'.", name),
        }
    }
}
