#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use golite_common::generators::VirtualRegister;
    use golite_common::typings::Type;
    use golite_front::ast::{BinaryOpKind, LValue, UnaryOpKind};
    use golite_middle::ir::iloc::{BinaryOperator, FuncFrag, Instruction, Operand, GLOBAL_FRAG_LABEL};

    use crate::common::{find_frag, iloc_lines, TestProgram};


    struct ILOCVerifier {
        expected: Vec<&'static str>,
        actual: Vec<String>,
    }

    impl ILOCVerifier {
        fn new(frag: &FuncFrag, expected: Vec<&'static str>) -> Self {
            Self { expected, actual: iloc_lines(frag) }
        }

        fn verify(&self) {
            assert_eq!(
                self.expected.len(), self.actual.len(),
                "Expected {} instructions, but got {}.\nActual: {:#?}", self.expected.len(), self.actual.len(), self.actual
            );

            for (index, (expected, actual)) in self.expected.iter().zip(self.actual.iter()).enumerate() {
                assert_eq!(expected, actual, "Expected `{}` at index {}, but got `{}`", expected, index, actual);
            }
        }
    }

    #[test]
    fn assignment_of_a_constant_sum() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "a", Type::Int);

        let one = program.ast().int(1);
        let other = program.ast().int(1);
        let sum = program.ast().binary(one, BinaryOpKind::Plus, other);
        let assignment = program.ast().assignment(LValue::variable("a"), sum);
        program.push(main, assignment);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "mov r1,#1",
            "mov r2,#1",
            "add r3,r1,r2",
            "mov r0,r3",
        ]).verify();
    }

    #[test]
    fn chains_fold_from_the_left() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        let a = program.local(main, "a", Type::Int);
        let b = program.local(main, "b", Type::Int);
        let c = program.local(main, "c", Type::Int);
        program.local(main, "d", Type::Int);

        let ast = program.ast();
        let head = ast.identifier("a");
        let second = ast.identifier("b");
        let third = ast.identifier("c");
        let chain = ast.chain(head, vec![(BinaryOpKind::Plus, second), (BinaryOpKind::Plus, third)]);
        let assignment = ast.assignment(LValue::variable("d"), chain);
        program.push(main, assignment);

        let frags = program.lower();
        let adds: Vec<&Instruction> = find_frag(&frags, "main").body.iter()
            .filter(|instruction| matches!(instruction, Instruction::Binary { operator: BinaryOperator::Add, .. }))
            .collect();

        assert_eq!(adds.len(), 2);
        let Instruction::Binary { target: first_target, left, right, .. } = adds[0] else { unreachable!() };
        assert_eq!((*left, *right), (a, Operand::Register(b)));

        let Instruction::Binary { left, right, .. } = adds[1] else { unreachable!() };
        assert_eq!(*left, *first_target, "Second add must consume the first add's result");
        assert_eq!(*right, Operand::Register(c));
    }

    #[test]
    fn conditional_with_else() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "x", Type::Int);
        program.local(main, "a", Type::Int);

        let ast = program.ast();
        let x = ast.identifier("x");
        let one = ast.int(1);
        let condition = ast.binary(x, BinaryOpKind::GreaterThan, one);
        let then_value = ast.int(1);
        let then_assignment = ast.assignment(LValue::variable("a"), then_value);
        let else_value = ast.int(2);
        let else_assignment = ast.assignment(LValue::variable("a"), else_value);
        let conditional = ast.conditional(condition, vec![then_assignment], Some(vec![else_assignment]));
        program.push(main, conditional);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "mov r1,#0",
            "mov r2,#1",
            "mov r3,#0",
            "cmp r0,r2",
            "movgt r3,#1",
            "cmp r3,#1",
            "bne else_L0",
            "mov r4,#1",
            "mov r1,r4",
            "b done_L1",
            "else_L0:",
            "mov r5,#2",
            "mov r1,r5",
            "done_L1:",
        ]).verify();
    }

    #[test]
    fn conditional_without_else_skips_to_done() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "flag", Type::Bool);

        let ast = program.ast();
        let flag = ast.identifier("flag");
        let body = ast.println("flag");
        let conditional = ast.conditional(flag, vec![body], None);
        program.push(main, conditional);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "cmp r0,#1",
            "bne done_L0",
            "println r0",
            "b done_L0",
            "done_L0:",
        ]).verify();
    }

    #[test]
    fn loop_checks_its_condition_at_the_bottom() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "i", Type::Int);

        let ast = program.ast();
        let i = ast.identifier("i");
        let one = ast.int(1);
        let increment = ast.binary(i, BinaryOpKind::Plus, one);
        let step = ast.assignment(LValue::variable("i"), increment);
        let i = ast.identifier("i");
        let three = ast.int(3);
        let condition = ast.binary(i, BinaryOpKind::LessThan, three);
        let for_loop = ast.loop_statement(condition, vec![step]);
        program.push(main, for_loop);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "b condLabel_L0",
            "loopBody_L1:",
            "mov r1,#1",
            "add r2,r0,r1",
            "mov r0,r2",
            "condLabel_L0:",
            "mov r3,#3",
            "mov r4,#0",
            "cmp r0,r3",
            "movlt r4,#1",
            "cmp r4,#1",
            "beq loopBody_L1",
        ]).verify();
    }

    #[test]
    fn boolean_operators_evaluate_both_sides() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "p", Type::Bool);
        program.local(main, "q", Type::Bool);
        program.local(main, "r", Type::Bool);

        let ast = program.ast();
        let p = ast.identifier("p");
        let q = ast.identifier("q");
        let negated = ast.unary(UnaryOpKind::Not, q);
        let both = ast.binary(p, BinaryOpKind::And, negated);
        let t = ast.boolean(true);
        let either = ast.binary(both, BinaryOpKind::Or, t);
        let assignment = ast.assignment(LValue::variable("r"), either);
        program.push(main, assignment);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "mov r1,#0",
            "mov r2,#0",
            "not r3,r1",
            "and r4,r0,r3",
            "mov r5,#1",
            "or r6,r4,r5",
            "mov r2,r6",
        ]).verify();
    }

    #[test]
    fn negation_subtracts_from_zero() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "n", Type::Int);

        let ast = program.ast();
        let n = ast.identifier("n");
        let parenthesised = ast.parenthesised(n);
        let negated = ast.unary(UnaryOpKind::Negate, parenthesised);
        let assignment = ast.assignment(LValue::variable("n"), negated);
        program.push(main, assignment);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r0,#0",
            "mov r1,#0",
            "sub r2,r1,r0",
            "mov r0,r2",
        ]).verify();
    }

    #[test]
    fn globals_are_initialized_and_accessed_through_memory() {
        let mut program = TestProgram::new();
        program.global("x", Type::Int);
        program.global("ready", Type::Bool);
        let main = program.function("main", &[], Type::Void);

        let ast = program.ast();
        let x = ast.identifier("x");
        let one = ast.int(1);
        let sum = ast.binary(x, BinaryOpKind::Plus, one);
        let assignment = ast.assignment(LValue::variable("x"), sum);
        let read = ast.read("x");
        program.push(main, assignment);
        program.push(main, read);

        let frags = program.lower();
        assert_eq!(frags[0].label, GLOBAL_FRAG_LABEL);
        ILOCVerifier::new(&frags[0], vec![
            "mov r0,#0",
            "str r0,@x",
            "mov r1,#0",
            "str r1,@ready",
        ]).verify();

        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "ldr r2,@x",
            "mov r3,#1",
            "add r4,r2,r3",
            "str r4,@x",
            "read r5 @x",
            "str r5,@x",
        ]).verify();
    }

    #[test]
    fn global_fragment_exists_without_globals() {
        let mut program = TestProgram::new();
        program.function("main", &[], Type::Void);

        let frags = program.lower();
        assert_eq!(frags.len(), 2);
        assert!(frags[0].is_globals());
        assert!(frags[0].body.is_empty());
        assert_eq!(frags[1].label, "main");
    }

    #[test]
    fn call_expression_captures_the_return_value() {
        let mut program = TestProgram::new();
        let add = program.function("add", &[("a", Type::Int), ("b", Type::Int)], Type::Int);
        let main = program.function("main", &[], Type::Void);
        program.local(main, "s", Type::Int);

        let ast = program.ast();
        let a = ast.identifier("a");
        let b = ast.identifier("b");
        let sum = ast.binary(a, BinaryOpKind::Plus, b);
        let ret = ast.return_statement(Some(sum));
        program.push(add, ret);

        let ast = program.ast();
        let one = ast.int(1);
        let two = ast.int(2);
        let call = ast.call("add", vec![one, two]);
        let assignment = ast.assignment(LValue::variable("s"), call);
        program.push(main, assignment);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "add"), vec![
            "add r3,r0,r1",
            "ret r3",
        ]).verify();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r2,#0",
            "mov r4,#1",
            "mov r5,#2",
            "push {r4,r5} @add",
            "bl add",
            "mov r6,@ret",
            "pop {r4,r5} @add",
            "mov r2,r6",
        ]).verify();
    }

    #[test]
    fn statement_call_has_no_capture() {
        let mut program = TestProgram::new();
        let tick = program.function("tick", &[], Type::Void);
        let main = program.function("main", &[], Type::Void);

        let ret = program.ast().return_statement(None);
        program.push(tick, ret);
        let call = program.ast().invocation("tick", vec![]);
        program.push(main, call);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "tick"), vec!["ret"]).verify();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "push {} @tick",
            "bl tick",
            "pop {} @tick",
        ]).verify();
    }

    #[test]
    fn new_and_delete_bypass_the_call_protocol() {
        let mut program = TestProgram::new();
        program.structure("Foo", &[("a", Type::Int), ("b", Type::Int), ("c", Type::Bool)]);
        let main = program.function("main", &[], Type::Void);
        let p = program.local(main, "p", Type::Struct("Foo".to_string()));

        let ast = program.ast();
        let foo = ast.identifier("Foo");
        let allocation = ast.call("new", vec![foo]);
        let assignment = ast.assignment(LValue::variable("p"), allocation);
        let pointer = ast.identifier("p");
        let release = ast.invocation("delete", vec![pointer]);
        program.push(main, assignment);
        program.push(main, release);

        let frags = program.lower();
        let body = &find_frag(&frags, "main").body;

        assert!(matches!(&body[1], Instruction::New { struct_name, field_count: 3, .. } if struct_name == "Foo"));
        assert_eq!(body.last(), Some(&Instruction::Delete { pointer: p }));
        assert!(!body.iter().any(|instruction| matches!(instruction, Instruction::Push { .. } | Instruction::Bl { .. })));
    }

    #[test]
    fn field_paths_load_each_link() {
        let mut program = TestProgram::new();
        program.structure("Node", &[("value", Type::Int), ("next", Type::Struct("Node".to_string()))]);
        let main = program.function("main", &[], Type::Void);
        let head = program.local(main, "head", Type::Struct("Node".to_string()));
        program.local(main, "v", Type::Int);

        let ast = program.ast();
        let base = ast.identifier("head");
        let selection = ast.selector(base, &["next", "value"]);
        let read_field = ast.assignment(LValue::variable("v"), selection);
        let five = ast.int(5);
        let write_field = ast.assignment(LValue::field_path("head", &["next", "value"]), five);
        program.push(main, read_field);
        program.push(main, write_field);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r2,#0",
            "mov r3,#0",
            "loadRef r4,r2,@next",
            "loadRef r5,r4,@value",
            "mov r3,r5",
            "mov r6,#5",
            "loadRef r7,r2,@next",
            "strRef r6,r7,@value",
        ]).verify();

        let body = &find_frag(&frags, "main").body;
        assert!(matches!(&body[2], Instruction::LoadRef { base, index: 1, .. } if *base == head));
        assert!(matches!(&body[7], Instruction::StrRef { index: 0, .. }));
    }

    #[test]
    fn nil_is_zero() {
        let mut program = TestProgram::new();
        program.structure("Foo", &[("a", Type::Int)]);
        let main = program.function("main", &[], Type::Void);
        program.local(main, "p", Type::Struct("Foo".to_string()));

        let nil = program.ast().nil();
        let assignment = program.ast().assignment(LValue::variable("p"), nil);
        program.push(main, assignment);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r1,#0",
            "mov r2,#0",
            "mov r1,r2",
        ]).verify();
    }

    #[test]
    fn push_and_pop_are_paired_around_each_call() {
        let mut program = TestProgram::new();
        let twice = program.function("twice", &[("n", Type::Int)], Type::Int);
        let main = program.function("main", &[], Type::Void);
        program.local(main, "x", Type::Int);

        let ast = program.ast();
        let n = ast.identifier("n");
        let m = ast.identifier("n");
        let doubled = ast.binary(n, BinaryOpKind::Plus, m);
        let ret = ast.return_statement(Some(doubled));
        program.push(twice, ret);

        let ast = program.ast();
        let three = ast.int(3);
        let inner = ast.call("twice", vec![three]);
        let outer = ast.call("twice", vec![inner]);
        let assignment = ast.assignment(LValue::variable("x"), outer);
        let x = ast.identifier("x");
        let statement_call = ast.invocation("twice", vec![x]);
        program.push(main, assignment);
        program.push(main, statement_call);

        let frags = program.lower();
        let body = &find_frag(&frags, "main").body;
        let mut pushes = 0;

        for (index, instruction) in body.iter().enumerate() {
            let Instruction::Push { registers, callee } = instruction else { continue };
            pushes += 1;

            assert_eq!(body[index + 1], Instruction::Bl { callee: callee.clone() });
            let pop_index = match &body[index + 2] {
                Instruction::MovReturn { .. } => index + 3,
                _ => index + 2,
            };
            assert_eq!(body[pop_index], Instruction::Pop { registers: registers.clone(), callee: callee.clone() });
        }

        assert_eq!(pushes, 3);
        let pops = body.iter().filter(|instruction| matches!(instruction, Instruction::Pop { .. })).count();
        assert_eq!(pops, pushes);
    }

    #[test]
    fn branch_labels_resolve_within_their_fragment() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        program.local(main, "i", Type::Int);

        let ast = program.ast();
        let i = ast.identifier("i");
        let ten = ast.int(10);
        let condition = ast.binary(i, BinaryOpKind::NotEquals, ten);
        let i = ast.identifier("i");
        let five = ast.int(5);
        let check = ast.binary(i, BinaryOpKind::GreaterThanOrEqual, five);
        let print = ast.println("i");
        let other = ast.print("i");
        let nested = ast.conditional(check, vec![print], Some(vec![other]));
        let for_loop = ast.loop_statement(condition, vec![nested]);
        program.push(main, for_loop);

        let frags = program.lower();
        for frag in &frags {
            let defined: Vec<&str> = frag.body.iter()
                .filter_map(|instruction| match instruction {
                    Instruction::Label(label) => Some(label.as_str()),
                    _ => None,
                })
                .collect();
            let unique: HashSet<&str> = defined.iter().copied().collect();
            assert_eq!(unique.len(), defined.len(), "Duplicate labels in `{}`", frag.label);

            let branches = frag.body.iter().filter(|instruction| matches!(instruction, Instruction::Branch { .. }));
            for branch in branches {
                let label = branch.label().expect("Branches name their target");
                assert!(unique.contains(label), "`{}` branches to undefined `{}`", frag.label, label);
            }
        }
    }

    #[test]
    fn fresh_registers_are_increasing_and_unique() {
        let mut program = TestProgram::new();
        let main = program.function("main", &[], Type::Void);
        let a = program.local(main, "a", Type::Int);

        let ast = program.ast();
        let one = ast.int(1);
        let two = ast.int(2);
        let three = ast.int(3);
        let product = ast.chain(one, vec![(BinaryOpKind::Multiply, two), (BinaryOpKind::Divide, three)]);
        let assignment = ast.assignment(LValue::variable("a"), product);
        program.push(main, assignment);

        let frags = program.lower();
        let fresh: Vec<VirtualRegister> = find_frag(&frags, "main").body.iter()
            .filter_map(Instruction::target)
            .filter(|target| *target != a)
            .collect();

        assert!(!fresh.is_empty());
        assert!(fresh.windows(2).all(|pair| pair[0] < pair[1]), "Registers not increasing: {:?}", fresh);
    }

    #[test]
    fn print_statements_read_their_variable() {
        let mut program = TestProgram::new();
        program.global("total", Type::Int);
        let main = program.function("main", &[], Type::Void);
        program.local(main, "n", Type::Int);

        let ast = program.ast();
        let read = ast.read("n");
        let print_local = ast.print("n");
        let print_global = ast.println("total");
        program.push(main, read);
        program.push(main, print_local);
        program.push(main, print_global);

        let frags = program.lower();
        ILOCVerifier::new(find_frag(&frags, "main"), vec![
            "mov r1,#0",
            "read r1 @n",
            "print r1",
            "ldr r2,@total",
            "println r2",
        ]).verify();
    }
}
