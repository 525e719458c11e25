use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use golite_codegen::compile_to_arm64;
use golite_common::generators::{Generators, RegisterGenerator};
use golite_front::compilation_unit::CompilationUnit;
use golite_middle::ir::iloc::{FuncFrag, ILOCBuilder, ILOCWriter};

use crate::config::CompilerConfig;


/// State of one compilation: the register and label counters. Programs must
/// be declared through `registers()` of the session that compiles them.
///
/// Counters are never reset implicitly; call `reset` between programs to get
/// the same numbering for the same input.
pub struct CompilationSession {
    config: CompilerConfig,
    generators: Generators,
}

impl CompilationSession {
    pub fn new(config: CompilerConfig) -> Self {
        Self { config, generators: Generators::new() }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn registers(&mut self) -> &mut RegisterGenerator {
        &mut self.generators.registers
    }

    pub fn generators(&self) -> &Generators {
        &self.generators
    }

    pub fn reset(&mut self) {
        tracing::debug!(
            "Resetting session after {} registers and {} labels",
            self.generators.registers.issued(),
            self.generators.labels.issued()
        );
        self.generators.reset();
    }

    pub fn lower(&mut self, unit: &CompilationUnit) -> Result<Vec<FuncFrag>> {
        let frags = ILOCBuilder::new(unit, &mut self.generators).build();

        if self.config.show_iloc {
            println!("=== ILOC ===");
            let mut iloc_output = String::new();
            ILOCWriter::write_txt(&mut iloc_output, &frags)?;
            println!("{}", iloc_output);
        }

        Ok(frags)
    }

    pub fn compile(&mut self, unit: &CompilationUnit) -> Result<Vec<String>> {
        let frags = self.lower(unit)?;
        let lines = compile_to_arm64(&frags, &unit.symbols)
            .context("Could not generate ARM64 assembly")?;

        if self.config.show_asm {
            println!("=== ARM64 ===");
            for line in &lines {
                println!("{}", line);
            }
        }

        if let Some(path) = &self.config.output_path {
            write_assembly(path, &lines)?;
        }

        Ok(lines)
    }
}

pub fn write_assembly(path: &Path, lines: &[String]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);

    for line in lines {
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;

    tracing::debug!("Wrote {} lines to {}", lines.len(), path.display());
    Ok(())
}
