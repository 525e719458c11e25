use golite_common::bug_report;
use golite_common::generators::VirtualRegister;
use golite_common::typings::{Type, WORD_SIZE};
use golite_front::symbol_table::SymbolTable;
use golite_middle::ir::iloc::{Address, BinaryOperator, Condition, FuncFrag, Instruction, Operand};

use crate::error::CodegenError;

pub mod frame;
pub mod registers;
pub mod runtime;

use frame::{Location, StackFrame};
use registers::{CallingConvention, PhysicalRegister, RegisterPool, ADDRESS_SCRATCH, FRAME_POINTER, LINK_REGISTER};
use runtime::{FormatString, FormatStrings, ALLOCATOR, DEALLOCATOR};


/// Smallest `[x29, #off]` offset encodable without an address register.
const MIN_DIRECT_OFFSET: i64 = -256;

/// Lines of a `mov` sequence placing `value` in `register`.
pub fn immediate_lines(register: PhysicalRegister, value: i64) -> Vec<String> {
    if (-65536..=65535).contains(&value) {
        return vec![format!("\tmov {}, #{}", register, value)];
    }

    let bits = value as u64;
    let mut lines = vec![format!("\tmovz {}, #{}", register, bits & 0xffff)];
    for shift in [16, 32, 48] {
        let chunk = (bits >> shift) & 0xffff;
        if chunk != 0 {
            lines.push(format!("\tmovk {}, #{}, lsl #{}", register, chunk, shift));
        }
    }

    lines
}

fn round_to_16(bytes: i64) -> i64 {
    (bytes + 15) & !15
}

/// The function being lowered and its layout.
struct FunctionContext<'f> {
    name: &'f str,
    frame: StackFrame,
}

/// ILOC to ARMv8-A assembly. Every value is spilled to its stack slot right
/// after being computed and reloaded into a scratch register on every use.
pub struct Arm64Codegen {
    pool: RegisterPool,
    format_strings: FormatStrings,
    local_labels: u32,
    /// Scratch registers held by the instruction being lowered.
    scratch: Vec<PhysicalRegister>,
    /// Parameter registers are currently saved at `[sp, #8*i]`.
    parameters_saved: bool,
    lines: Vec<String>,
}

impl Default for Arm64Codegen {
    fn default() -> Self {
        Self::new()
    }
}

impl Arm64Codegen {
    pub fn new() -> Self {
        Self {
            pool: RegisterPool::new(),
            format_strings: FormatStrings::new(),
            local_labels: 0,
            scratch: Vec::new(),
            parameters_saved: false,
            lines: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.pool.reset();
        self.format_strings.reset();
        self.local_labels = 0;
        self.scratch.clear();
        self.parameters_saved = false;
        self.lines.clear();
    }

    /// Generates the assembly of a whole program. `frags` must start with the
    /// global-variable fragment.
    pub fn generate(&mut self, frags: &[FuncFrag], symbols: &SymbolTable) -> Result<Vec<String>, CodegenError> {
        self.reset();

        let Some((globals, functions)) = frags.split_first() else {
            bug_report!("No fragments to generate code for");
        };
        if !globals.is_globals() {
            bug_report!("First fragment is `{}`, expected the global variables", globals.label);
        }

        self.line(".arch armv8-a");

        let mut declared: Vec<&str> = Vec::new();
        for name in globals.body.iter().filter_map(Instruction::global_name) {
            if !declared.contains(&name) {
                declared.push(name);
                self.line(&format!(".comm {},8,8", name));
            }
        }

        self.line(".text");

        for frag in functions {
            self.generate_function(frag, symbols)?;
        }

        let format_blocks = self.format_strings.emit();
        self.lines.extend(format_blocks);

        Ok(std::mem::take(&mut self.lines))
    }

    fn generate_function(&mut self, frag: &FuncFrag, symbols: &SymbolTable) -> Result<(), CodegenError> {
        let Some(function) = symbols.lookup_function(&frag.label) else {
            bug_report!("Fragment `{}` has no function declaration", frag.label);
        };

        let parameters: Vec<VirtualRegister> = symbols.parameters(function.scope).iter()
            .map(|parameter| parameter.register)
            .collect();
        let frame = StackFrame::layout(&frag.label, &frag.body, &parameters)?;
        tracing::debug!("Function `{}`: {} slots, frame size {}", frag.label, frame.slot_count(), frame.size());

        self.pool.reset();
        for register in frame.parameter_registers() {
            self.pool.occupy(*register);
        }

        let context = FunctionContext { name: &frag.label, frame };

        self.line(&format!(".type {},%function", context.name));
        self.line(&format!(".global {}", context.name));
        self.line(".p2align 2");
        self.label(context.name);
        self.prologue(&context);

        for instruction in &frag.body {
            self.generate_instruction(&context, instruction)?;
            self.release_scratch();
        }

        self.label(&Self::return_label(context.name));
        if context.name == "main" && function.return_type == Type::Void {
            self.lines.extend(immediate_lines(CallingConvention::get_return_register(), 0));
        }
        self.epilogue(&context);
        self.line(&format!(".size {},(.-{})", context.name, context.name));

        Ok(())
    }

    fn prologue(&mut self, context: &FunctionContext) {
        self.line("sub sp, sp, #16");
        self.line(&format!("stp {}, {}, [sp]", FRAME_POINTER, LINK_REGISTER));
        self.line(&format!("mov {}, sp", FRAME_POINTER));
        self.line(&format!("sub sp, sp, #{}", context.frame.bytes()));
    }

    fn epilogue(&mut self, context: &FunctionContext) {
        self.line(&format!("add sp, sp, #{}", context.frame.bytes()));
        self.line(&format!("ldp {}, {}, [sp]", FRAME_POINTER, LINK_REGISTER));
        self.line("add sp, sp, #16");
        self.line("ret");
    }

    fn return_label(function: &str) -> String {
        format!(".Lreturn_{}", function)
    }

    fn next_local_label(&mut self) -> String {
        let label = format!(".Lskip_{}", self.local_labels);
        self.local_labels += 1;
        label
    }

    fn line(&mut self, text: &str) {
        self.lines.push(format!("\t{}", text));
    }

    fn label(&mut self, label: &str) {
        self.lines.push(format!("{}:", label));
    }

    fn acquire(&mut self) -> PhysicalRegister {
        let register = self.pool.acquire();
        self.scratch.push(register);
        register
    }

    fn release_scratch(&mut self) {
        for register in std::mem::take(&mut self.scratch) {
            self.pool.release(register);
        }
    }

    fn slot_access(&mut self, mnemonic: &str, register: PhysicalRegister, offset: i64) {
        if offset >= MIN_DIRECT_OFFSET {
            self.line(&format!("{} {}, [{}, #{}]", mnemonic, register, FRAME_POINTER, offset));
        } else {
            self.line(&format!("sub {}, {}, #{}", ADDRESS_SCRATCH, FRAME_POINTER, -offset));
            self.line(&format!("{} {}, [{}]", mnemonic, register, ADDRESS_SCRATCH));
        }
    }

    /// Puts `source` in a physical register: its parameter register, or a
    /// scratch register loaded from its slot.
    fn load(&mut self, context: &FunctionContext, source: VirtualRegister) -> PhysicalRegister {
        match context.frame.location_or_panic(source) {
            Location::Parameter(register) => register,
            Location::Slot(offset) => {
                let register = self.acquire();
                self.slot_access("ldr", register, offset);
                register
            }
        }
    }

    /// Loads `source` into the fixed register `into`.
    fn load_into(&mut self, context: &FunctionContext, source: VirtualRegister, into: PhysicalRegister) {
        match context.frame.location_or_panic(source) {
            Location::Parameter(register) if self.parameters_saved => {
                let index = self.parameter_index(context, register);
                self.line(&format!("ldr {}, [sp, #{}]", into, index as i64 * WORD_SIZE));
            }
            Location::Parameter(register) => {
                if register != into {
                    self.line(&format!("mov {}, {}", into, register));
                }
            }
            Location::Slot(offset) => self.slot_access("ldr", into, offset),
        }
    }

    fn load_operand(&mut self, context: &FunctionContext, operand: Operand) -> PhysicalRegister {
        match operand {
            Operand::Register(source) => self.load(context, source),
            Operand::Immediate(value) => {
                let register = self.acquire();
                self.lines.extend(immediate_lines(register, value));
                register
            }
        }
    }

    /// Register the result of `target` is computed into.
    fn destination(&mut self, context: &FunctionContext, target: VirtualRegister) -> PhysicalRegister {
        match context.frame.location(target) {
            Some(Location::Parameter(register)) if !self.parameters_saved => register,
            _ => self.acquire(),
        }
    }

    /// Writes a computed value back to where `target` lives.
    fn store(&mut self, context: &FunctionContext, target: VirtualRegister, value: PhysicalRegister) {
        match context.frame.location_or_panic(target) {
            Location::Slot(offset) => self.slot_access("str", value, offset),
            Location::Parameter(register) if self.parameters_saved => {
                let index = self.parameter_index(context, register);
                self.line(&format!("str {}, [sp, #{}]", value, index as i64 * WORD_SIZE));
            }
            Location::Parameter(register) => {
                if register != value {
                    self.line(&format!("mov {}, {}", register, value));
                }
            }
        }
    }

    fn parameter_index(&self, context: &FunctionContext, register: PhysicalRegister) -> usize {
        match context.frame.parameter_registers().iter().position(|parameter| *parameter == register) {
            Some(index) => index,
            None => bug_report!("{} is not a parameter register of `{}`", register, context.name),
        }
    }

    /// Reserves a 16-byte aligned area of at least `words` words below sp and
    /// saves the parameter registers at its bottom. Returns the area size.
    fn save_parameters(&mut self, context: &FunctionContext, words: usize) -> i64 {
        let parameters = context.frame.parameter_registers().to_vec();
        let area = round_to_16(words.max(parameters.len()) as i64 * WORD_SIZE);
        if area == 0 {
            return 0;
        }

        self.line(&format!("sub sp, sp, #{}", area));
        for (index, register) in parameters.iter().enumerate() {
            self.line(&format!("str {}, [sp, #{}]", register, index as i64 * WORD_SIZE));
        }
        self.parameters_saved = !parameters.is_empty();

        area
    }

    fn restore_parameters(&mut self, context: &FunctionContext, area: i64) {
        if area == 0 {
            return;
        }

        for (index, register) in context.frame.parameter_registers().iter().enumerate() {
            self.line(&format!("ldr {}, [sp, #{}]", register, index as i64 * WORD_SIZE));
        }
        self.line(&format!("add sp, sp, #{}", area));
        self.parameters_saved = false;
    }

    fn call_runtime(&mut self, routine: &str) {
        self.line(&format!("bl {}", routine));
    }

    fn format_address(&mut self, format: FormatString, into: PhysicalRegister) {
        self.format_strings.mark(format);
        self.line(&format!("adrp {}, {}", into, format.symbol()));
        self.line(&format!("add {}, {}, :lo12:{}", into, into, format.symbol()));
    }

    fn global_address(&mut self, name: &str) -> PhysicalRegister {
        let register = self.acquire();
        self.line(&format!("adrp {}, {}", register, name));
        self.line(&format!("add {}, {}, :lo12:{}", register, register, name));
        register
    }

    fn memory_operand(&mut self, context: &FunctionContext, address: &Address) -> String {
        match address {
            Address::Indexed { base, offset } => {
                let base = self.load(context, *base);
                let offset = self.load(context, *offset);
                format!("[{}, {}]", base, offset)
            }
            Address::Displaced { base, offset } => {
                let base = self.load(context, *base);
                format!("[{}, #{}]", base, offset)
            }
            Address::Base(base) => {
                let base = self.load(context, *base);
                format!("[{}]", base)
            }
            Address::Global(name) => {
                let address = self.global_address(name);
                format!("[{}]", address)
            }
        }
    }

    fn generate_instruction(&mut self, context: &FunctionContext, instruction: &Instruction) -> Result<(), CodegenError> {
        match instruction {
            Instruction::Binary { operator, target, left, right } => {
                let left = self.load(context, *left);
                let right = self.load_operand(context, *right);
                let destination = self.destination(context, *target);
                let mnemonic = match operator {
                    BinaryOperator::Add => "add",
                    BinaryOperator::Sub => "sub",
                    BinaryOperator::Mul => "mul",
                    BinaryOperator::Div => "sdiv",
                    BinaryOperator::And => "and",
                    BinaryOperator::Or => "orr",
                };
                self.line(&format!("{} {}, {}, {}", mnemonic, destination, left, right));
                self.store(context, *target, destination);
            }
            Instruction::Not { target, operand } => {
                let operand = self.load(context, *operand);
                let destination = self.destination(context, *target);
                self.line(&format!("eor {}, {}, #1", destination, operand));
                self.store(context, *target, destination);
            }
            Instruction::Cmp { left, right } => {
                let left = self.load(context, *left);
                match right {
                    Operand::Immediate(value) if (0..=4095).contains(value) => {
                        self.line(&format!("cmp {}, #{}", left, value));
                    }
                    _ => {
                        let right = self.load_operand(context, *right);
                        self.line(&format!("cmp {}, {}", left, right));
                    }
                }
            }
            Instruction::Branch { condition: Condition::Always, label } => {
                self.line(&format!("b {}", label));
            }
            Instruction::Branch { condition, label } => {
                self.line(&format!("b.{} {}", condition.suffix(), label));
            }
            Instruction::Label(label) => self.label(label),
            Instruction::Ldr { target, address } => {
                let operand = self.memory_operand(context, address);
                let destination = self.destination(context, *target);
                self.line(&format!("ldr {}, {}", destination, operand));
                self.store(context, *target, destination);
            }
            Instruction::Str { value, address } => {
                let value = self.load(context, *value);
                let operand = self.memory_operand(context, address);
                self.line(&format!("str {}, {}", value, operand));
            }
            Instruction::LoadRef { target, base, index, .. } => {
                let base = self.load(context, *base);
                let destination = self.destination(context, *target);
                self.line(&format!("ldr {}, [{}, #{}]", destination, base, *index as i64 * WORD_SIZE));
                self.store(context, *target, destination);
            }
            Instruction::StrRef { value, base, index, .. } => {
                let value = self.load(context, *value);
                let base = self.load(context, *base);
                self.line(&format!("str {}, [{}, #{}]", value, base, *index as i64 * WORD_SIZE));
            }
            Instruction::New { target, field_count, .. } => {
                let area = self.save_parameters(context, 0);
                let result = CallingConvention::get_return_register();
                self.lines.extend(immediate_lines(result, *field_count as i64 * WORD_SIZE));
                self.call_runtime(ALLOCATOR);
                self.store(context, *target, result);
                self.restore_parameters(context, area);
            }
            Instruction::Delete { pointer } => {
                let area = self.save_parameters(context, 0);
                self.load_into(context, *pointer, CallingConvention::get_return_register());
                self.call_runtime(DEALLOCATOR);
                self.restore_parameters(context, area);
            }
            Instruction::Push { registers, callee } => {
                if registers.len() > CallingConvention::MAX_REGISTER_ARGUMENTS {
                    return Err(CodegenError::TooManyArguments { callee: callee.clone(), count: registers.len() });
                }

                self.save_parameters(context, registers.len());
                for (index, argument) in registers.iter().enumerate() {
                    let Some(register) = CallingConvention::get_int_arg_register(index) else {
                        bug_report!("No argument register for argument {}", index);
                    };
                    self.load_into(context, *argument, register);
                    self.pool.occupy(register);
                }
            }
            Instruction::Pop { registers, .. } => {
                let parameters = context.frame.parameter_registers().len();
                let area = round_to_16(registers.len().max(parameters) as i64 * WORD_SIZE);
                self.restore_parameters(context, area);

                for index in parameters..registers.len() {
                    if let Some(register) = CallingConvention::get_int_arg_register(index) {
                        self.pool.release(register);
                    }
                }
            }
            Instruction::Mov { target, source, condition: Condition::Always } => {
                let destination = self.destination(context, *target);
                match source {
                    Operand::Register(source) => {
                        let source = self.load(context, *source);
                        self.line(&format!("mov {}, {}", destination, source));
                    }
                    Operand::Immediate(value) => self.lines.extend(immediate_lines(destination, *value)),
                }
                self.store(context, *target, destination);
            }
            Instruction::Mov { target, source, condition } => {
                let skip = self.next_local_label();
                self.line(&format!("b.{} {}", condition.inverse().suffix(), skip));
                let value = self.load_operand(context, *source);
                self.store(context, *target, value);
                self.label(&skip);
            }
            Instruction::MovReturn { target } => {
                self.store(context, *target, CallingConvention::get_return_register());
            }
            Instruction::Ret { value } => {
                let result = CallingConvention::get_return_register();
                match value {
                    Some(Operand::Register(source)) => self.load_into(context, *source, result),
                    Some(Operand::Immediate(value)) => self.lines.extend(immediate_lines(result, *value)),
                    None => {}
                }
                self.line(&format!("b {}", Self::return_label(context.name)));
            }
            Instruction::Bl { callee } => {
                self.line(&format!("bl {}", callee));
            }
            Instruction::Print { source } => self.generate_print(context, *source, FormatString::Print),
            Instruction::Println { source } => self.generate_print(context, *source, FormatString::PrintLn),
            Instruction::Read { target, .. } => {
                let area = self.save_parameters(context, 0);
                let address = PhysicalRegister(1);
                match context.frame.location_or_panic(*target) {
                    Location::Slot(offset) => {
                        self.line(&format!("sub {}, {}, #{}", address, FRAME_POINTER, -offset));
                    }
                    Location::Parameter(register) => {
                        let index = self.parameter_index(context, register);
                        self.line(&format!("add {}, sp, #{}", address, index as i64 * WORD_SIZE));
                    }
                }
                self.format_address(FormatString::Read, CallingConvention::get_return_register());
                self.call_runtime(FormatString::Read.routine());
                self.restore_parameters(context, area);
            }
        }

        Ok(())
    }

    fn generate_print(&mut self, context: &FunctionContext, source: VirtualRegister, format: FormatString) {
        let area = self.save_parameters(context, 0);
        // value first, the format address overwrites x0
        self.load_into(context, source, PhysicalRegister(1));
        self.format_address(format, CallingConvention::get_return_register());
        self.call_runtime(format.routine());
        self.restore_parameters(context, area);
    }
}
