//! Data models shared by the analyzer and the host

pub mod instruction;
pub mod report;

pub use self::instruction::Instruction;
pub use self::report::{RenameReport, RenamedStub, StubFailure};
