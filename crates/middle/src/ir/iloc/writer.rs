use std::fmt::Write;

use anyhow::Result;

use crate::ir::iloc::{FuncFrag, Instruction};


const INDENT: &str = "    ";

pub struct ILOCWriter<W> {
    _phantom: std::marker::PhantomData<W>,
}

impl<W> ILOCWriter<W> where W: Write {
    pub fn write_txt(writer: &mut W, frags: &[FuncFrag]) -> Result<()> {
        for frag in frags {
            writeln!(writer, "{}:", frag.label)?;

            for instruction in &frag.body {
                // labels stay flush left
                if !matches!(instruction, Instruction::Label(_)) {
                    write!(writer, "{}", INDENT)?;
                }
                writeln!(writer, "{}", instruction)?;
            }
        }

        Ok(())
    }
}
