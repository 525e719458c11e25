#[cfg(test)]
mod tests {
    use golite_common::generators::{RegisterGenerator, VirtualRegister};
    use golite_common::typings::Type;
    use golite_front::symbol_table::{Builtin, Callee, Entry, SymbolTable, GLOBAL_SCOPE_NAME};


    #[test]
    fn contains_only_searches_the_current_scope() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        symbols.declare_variable(global, "counter", Type::Int, &mut registers);
        let main = symbols.declare_function("main", Type::Void);

        assert!(symbols.contains(global, "counter").is_some());
        assert!(symbols.contains(main, "counter").is_none());
        assert!(symbols.power_contains(main, "counter").is_some());
        assert!(symbols.power_contains(main, "missing").is_none());
        assert_eq!(symbols.scope(global).name, GLOBAL_SCOPE_NAME);
    }

    #[test]
    fn nearest_binding_decides_global_access() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        symbols.declare_variable(global, "x", Type::Int, &mut registers);
        symbols.declare_variable(global, "y", Type::Int, &mut registers);

        let main = symbols.declare_function("main", Type::Void);
        let shadow = symbols.declare_variable(main, "x", Type::Bool, &mut registers);

        assert!(symbols.check_global_variable(main, "y"));
        assert!(!symbols.check_global_variable(main, "x"));
        assert!(symbols.check_global_variable(global, "x"));
        assert_eq!(symbols.power_contains(main, "x").and_then(Entry::register), Some(shadow));
        assert!(!symbols.check_global_variable(main, "main"));
    }

    #[test]
    fn registers_are_allocated_at_declaration() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let global = symbols.global();

        let first = symbols.declare_variable(global, "a", Type::Int, &mut registers);
        let second = symbols.declare_variable(global, "b", Type::Int, &mut registers);

        assert_eq!(first, VirtualRegister(0));
        assert_eq!(second, VirtualRegister(1));
        assert_eq!(symbols.contains(global, "a").and_then(Entry::register), Some(first));
    }

    #[test]
    fn inapplicable_queries_return_none() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        symbols.declare_variable(global, "v", Type::Int, &mut registers);
        symbols.declare_function("f", Type::Int);
        symbols.declare_struct("Point", &[("x", Type::Int), ("y", Type::Int)], &mut registers);

        let var = symbols.contains(global, "v").expect("v declared");
        assert_eq!(var.return_type(), None);
        assert_eq!(var.scope(), None);
        assert_eq!(var.ty(), Some(&Type::Int));

        let func = symbols.contains(global, "f").expect("f declared");
        assert_eq!(func.return_type(), Some(&Type::Int));
        assert_eq!(func.register(), None);
        assert_eq!(func.ty(), None);

        let point = symbols.contains(global, "Point").expect("Point declared");
        assert!(point.scope().is_some());
        assert_eq!(point.return_type(), None);
        assert_eq!(point.value(), None);
    }

    #[test]
    fn literal_values_are_recorded_on_variables() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        symbols.declare_variable(global, "limit", Type::Int, &mut registers);
        symbols.set_value(global, "limit", "10");

        assert_eq!(symbols.contains(global, "limit").and_then(Entry::value), Some("10"));
    }

    #[test]
    fn struct_fields_keep_declaration_order() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        symbols.declare_struct(
            "Node",
            &[("value", Type::Int), ("next", Type::Struct("Node".to_string())), ("flag", Type::Bool)],
            &mut registers,
        );

        assert_eq!(symbols.field_count("Node"), Some(3));
        assert_eq!(symbols.field("Node", "value").map(|(index, _)| index), Some(0));
        assert_eq!(symbols.field("Node", "flag").map(|(index, _)| index), Some(2));

        let (index, next) = symbols.field("Node", "next").expect("next declared");
        assert_eq!(index, 1);
        assert_eq!(next.ty(), Some(&Type::Struct("Node".to_string())));
        assert_eq!(symbols.field("Node", "missing"), None);
        assert_eq!(symbols.field_count("Missing"), None);

        let node = symbols.lookup_struct("Node").expect("Node declared");
        let names: Vec<&String> = symbols.scope(node.scope).entries().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["value", "next", "flag"]);
    }

    #[test]
    fn parameters_are_mirrored_in_order() {
        let mut registers = RegisterGenerator::new();
        let mut symbols = SymbolTable::new();
        let scope = symbols.declare_function("sum", Type::Int);
        let a = symbols.declare_parameter(scope, "a", Type::Int, &mut registers);
        let b = symbols.declare_parameter(scope, "b", Type::Bool, &mut registers);
        symbols.declare_variable(scope, "total", Type::Int, &mut registers);

        let parameters: Vec<VirtualRegister> = symbols.parameters(scope).iter().map(|var| var.register).collect();
        assert_eq!(parameters, vec![a, b]);
        assert_eq!(symbols.scope(scope).param_names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(symbols.scope(scope).param_types, vec![Type::Int, Type::Bool]);
        assert_eq!(symbols.enclosing_return_type(scope), Some(&Type::Int));
        assert_eq!(symbols.enclosing_return_type(symbols.global()), None);
    }

    #[test]
    fn builtins_are_searched_after_the_scope_chain() {
        let mut symbols = SymbolTable::new();
        let main = symbols.declare_function("main", Type::Void);

        assert_eq!(symbols.resolve_callee(main, "delete"), Some(Callee::Builtin(Builtin::Delete)));
        assert_eq!(symbols.resolve_callee(main, "new"), Some(Callee::Builtin(Builtin::New)));
        assert_eq!(symbols.resolve_callee(main, "nothing"), None);

        symbols.declare_function("new", Type::Int);
        assert!(matches!(symbols.resolve_callee(main, "new"), Some(Callee::User(func)) if func.return_type == Type::Int));
    }

    #[test]
    fn new_scope_links_to_its_parent() {
        let mut symbols = SymbolTable::new();
        let global = symbols.global();
        let outer = symbols.new_scope(Some(global), "outer");
        let inner = symbols.new_scope(Some(outer), "inner");
        let detached = symbols.new_scope(None, "detached");

        assert_eq!(symbols.scope(inner).parent, Some(outer));
        assert_eq!(symbols.scope(outer).parent, Some(global));
        assert_eq!(symbols.scope(detached).parent, None);
        assert!(symbols.scope(inner).is_empty());
    }
}
