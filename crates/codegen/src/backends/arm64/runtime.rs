/// C runtime entry points the generated code links against.
pub const ALLOCATOR: &str = "malloc";
pub const DEALLOCATOR: &str = "free";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatString {
    Print,
    PrintLn,
    Read,
}

impl FormatString {
    pub fn symbol(&self) -> &'static str {
        match self {
            FormatString::Print => ".PRINT",
            FormatString::PrintLn => ".PRINT_LN",
            FormatString::Read => ".READ",
        }
    }

    /// Source form of the string, escapes included.
    fn literal(&self) -> &'static str {
        match self {
            FormatString::Print | FormatString::Read => "%ld",
            FormatString::PrintLn => "%ld\\n",
        }
    }

    /// Size in bytes including the terminating NUL.
    fn size(&self) -> usize {
        match self {
            FormatString::Print | FormatString::Read => 4,
            FormatString::PrintLn => 5,
        }
    }

    pub fn routine(&self) -> &'static str {
        match self {
            FormatString::Print | FormatString::PrintLn => "printf",
            FormatString::Read => "scanf",
        }
    }
}

/// Format strings referenced so far, each emitted once after the code.
#[derive(Debug, Default)]
pub struct FormatStrings {
    used: Vec<FormatString>,
}

impl FormatStrings {
    pub fn new() -> Self {
        Self { used: Vec::new() }
    }

    pub fn mark(&mut self, format: FormatString) {
        if !self.used.contains(&format) {
            tracing::debug!("Format string {} referenced", format.symbol());
            self.used.push(format);
        }
    }

    pub fn is_used(&self, format: FormatString) -> bool {
        self.used.contains(&format)
    }

    pub fn reset(&mut self) {
        self.used.clear();
    }

    pub fn emit(&self) -> Vec<String> {
        if self.used.is_empty() {
            return Vec::new();
        }

        let mut lines = vec!["\t.section\t.rodata".to_string()];
        for format in &self.used {
            lines.push(format!("{}:", format.symbol()));
            lines.push(format!("\t.asciz\t\"{}\"", format.literal()));
            lines.push(format!("\t.size\t{}, {}", format.symbol(), format.size()));
        }

        lines
    }
}
