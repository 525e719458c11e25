use std::path::PathBuf;


/// Configuration for what a compilation shows and writes
#[derive(Debug, Clone)]
pub struct CompilerConfig {
    pub show_iloc: bool,
    pub show_asm: bool,
    /// Assembly file to write, one line per instruction or directive.
    pub output_path: Option<PathBuf>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            show_iloc: false,
            show_asm: false,
            output_path: None,
        }
    }
}

impl CompilerConfig {
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }
}
