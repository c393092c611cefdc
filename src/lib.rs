//! LBVM: a small stack-based virtual machine for closure-capable, tail-call
//! correct code, with its assembler and binary container format.
//!
//! ```no_run
//! let program = lbvm::Program::assemble_str("PUSHINT 2\nPUSHINT 3\nADD\nEND")?;
//! assert_eq!(program.run()?, lbvm::Value::Int(5));
//! # Ok::<(), lbvm::Error>(())
//! ```

pub mod assembler;
pub mod container;
pub mod diagnostic;
pub mod isa;
pub mod lexer;
pub mod loader;
pub mod program;
pub mod value;
pub mod vm;

pub use assembler::AssemblyError;
pub use container::FormatError;
pub use loader::DecodeError;
pub use program::{ListingLine, Program};
pub use value::Value;
pub use vm::{Limits, Machine, OutputSink, RuntimeError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("assembly error: {0}")]
    Assembly(#[from] AssemblyError),
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code, see [`diagnostic::registry`].
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Error::Assembly(e) => Some(e.code()),
            Error::Format(e) => Some(e.code()),
            Error::Decode(e) => Some(e.code()),
            Error::Runtime(e) => Some(e.code()),
            Error::Io(_) => None,
        }
    }
}
