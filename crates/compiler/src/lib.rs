pub mod config;
pub mod session;

pub use config::CompilerConfig;
pub use session::CompilationSession;
