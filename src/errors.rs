//! Error handling for the stub fixer.
//!
//! Two layers live here. `StubError` describes why a single candidate address
//! could not be resolved; it is always recoverable and the driver turns it into
//! a diagnostic before moving on. `FixerError` covers the host side (loading an
//! image, missing segments), where failing the whole run is acceptable.

use thiserror::Error;
use std::fmt;

/// Which operand a parse failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandField {
    /// The page-relative immediate of the `adrp`.
    PageBase,
    /// The displacement inside the `ldr` memory operand.
    ByteOffset,
}

impl fmt::Display for OperandField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandField::PageBase => write!(f, "page base"),
            OperandField::ByteOffset => write!(f, "byte offset"),
        }
    }
}

/// Per-candidate failure raised by the string reader, pattern matcher or
/// selector resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StubError {
    /// An instruction of the stub window could not be fetched.
    #[error("couldn't read instruction at 0x{address:X}")]
    FetchFailure { address: u64 },

    /// Operand text did not have the expected shape.
    #[error("failed to parse {field} from `{text}`")]
    ParseFailure { field: OperandField, text: String },

    /// The selector reference cell holds a null pointer.
    #[error("selector reference at 0x{cell:X} is null")]
    NullPointer { cell: u64 },

    /// The selector reference cell itself is unmapped.
    #[error("selector reference at 0x{cell:X} is unreadable")]
    UnreadablePointer { cell: u64 },

    /// `page + offset` does not fit in the address space.
    #[error("cell address overflows: page 0x{page:X} with offset {offset}")]
    CellOverflow { page: u64, offset: i64 },

    /// A string byte could not be read before the terminator.
    #[error("unmapped byte at 0x{address:X} while reading string")]
    ReadFault { address: u64 },

    /// No terminator within the safety cap.
    #[error("string at 0x{start:X} exceeds {limit} bytes without a terminator")]
    LengthExceeded { start: u64, limit: usize },

    /// The selector string is empty.
    #[error("selector at 0x{address:X} is empty")]
    EmptySelector { address: u64 },

    /// String bytes are not valid UTF-8.
    #[error("string at 0x{address:X} is not valid UTF-8")]
    InvalidEncoding { address: u64 },
}

/// Result type for the analysis core.
pub type StubResult<T> = Result<T, StubError>;

/// Host-level error type.
#[derive(Error, Debug)]
pub enum FixerError {
    /// The segment the driver scans does not exist in the image.
    #[error("{0} segment not found")]
    SegmentNotFound(String),

    /// The input is not something we know how to load.
    #[error("Unsupported image: {0}")]
    UnsupportedImage(String),

    /// Errors raised while parsing the binary image.
    #[error("Image error: {0}")]
    Image(String),

    /// Errors raised while scanning candidates.
    #[error("Analysis error: {0}")]
    Analysis(String),

}

/// Result type alias for the host layer.
pub type FixerResult<T> = Result<T, FixerError>;

/// Context information for errors.
///
/// Records where an error happened: the image being processed, the component
/// and the operation, plus optional free-form details.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Image being analyzed, if known.
    pub image: Option<String>,

    /// Component where the error occurred (e.g. "macho_loader").
    pub component: String,

    /// Operation being performed (e.g. "parse header").
    pub operation: String,

    /// Additional details, such as offsets or sizes.
    pub details: Option<String>,
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "In {} while {}", self.component, self.operation)?;
        if let Some(image) = &self.image {
            write!(f, " for image {}", image)?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorExt<T> {
    /// Add context to an error.
    ///
    /// A `FixerError` keeps its variant and gains the context in its message
    /// where the variant carries one; anything else becomes `FixerError::Image`.
    fn with_context(self, context: ErrorContext) -> FixerResult<T>;

    /// Add component and operation context to an error.
    fn with_simple_context(self, component: &str, operation: &str) -> FixerResult<T>;
}

impl<T, E: std::error::Error + 'static> ErrorExt<T> for Result<T, E> {
    fn with_context(self, context: ErrorContext) -> FixerResult<T> {
        self.map_err(|e| {
            let error_msg = format!("{}: {}", context, e);
            let boxed: Box<dyn std::error::Error + 'static> = Box::new(e);
            match boxed.downcast::<FixerError>() {
                Ok(fixer_err) => match *fixer_err {
                    FixerError::Image(_) => FixerError::Image(error_msg),
                    FixerError::Analysis(_) => FixerError::Analysis(error_msg),
                    FixerError::UnsupportedImage(_) => FixerError::UnsupportedImage(error_msg),
                    other => other,
                },
                Err(_) => FixerError::Image(error_msg),
            }
        })
    }

    fn with_simple_context(self, component: &str, operation: &str) -> FixerResult<T> {
        self.with_context(ErrorContext {
            image: None,
            component: component.to_string(),
            operation: operation.to_string(),
            details: None,
        })
    }
}
