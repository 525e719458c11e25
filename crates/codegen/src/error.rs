use thiserror::Error;


/// Limits of the generated code that a valid program can still exceed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodegenError {
    #[error("call to `{callee}` passes {count} arguments, at most 8 are supported")]
    TooManyArguments { callee: String, count: usize },

    #[error("function `{function}` declares {count} parameters, at most 8 are supported")]
    TooManyParameters { function: String, count: usize },

    #[error("stack frame of `{function}` needs {size} bytes, at most {limit} are encodable")]
    FrameTooLarge { function: String, size: i64, limit: i64 },
}
