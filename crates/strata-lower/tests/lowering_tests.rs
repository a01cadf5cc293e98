//! Lowering integration tests
//!
//! These build resolved programs with `AstBuilder`, lower them and check the
//! shape of the flat output: names, parameters, alias objects and order.

mod common;

use common::{lower, single_unit, top_level};
use strata_ast::ast::*;
use strata_ast::{AstBuilder, Interner};
use strata_lower::flat::*;
use strata_lower::{lower_program, LowerError, LowerOptions, PrettyPrint};

// ============================================================================
// Fixtures
// ============================================================================

/// `outer(a) { function inner() { return a; } return inner; }`
fn outer_inner() -> (Program, Interner) {
    let b = AstBuilder::new();
    let (a_param, a) = b.param("a");
    let inner_binding = b.local_id();
    let inner = b.named_function(
        "inner",
        inner_binding,
        vec![],
        vec![b.return_stmt(Some(b.local_ref("a", a)))],
    );
    let item = top_level(
        &b,
        b.function_id(),
        "outer",
        vec![a_param],
        vec![
            Statement::FunctionDecl(inner),
            b.return_stmt(Some(b.local_ref("inner", inner_binding))),
        ],
    );
    (single_unit(vec![item]), b.finish())
}

/// A with a static field, B extends A with a static block; `b_first` swaps
/// the declaration order.
fn static_pair(b_first: bool) -> (Program, Interner) {
    let b = AstBuilder::new();
    let a_id = b.class_id();
    let b_id = b.class_id();
    let count = b.member_binding(a_id, "count", MemberKind::Field, true);
    let total = b.member_binding(b_id, "total", MemberKind::Field, true);

    let class_a = b.class_decl(a_id, "A", None, vec![b.field("count", true, Some(b.int(1)))], None);
    let class_b = b.class_decl(
        b_id,
        "B",
        Some(a_id),
        vec![b.field("total", true, None)],
        Some(vec![b.expr_stmt(b.assign(
            b.member_ref(total),
            b.binary(
                BinaryOperator::Add,
                b.member(b.class_ref("A", a_id), "count", Some(count)),
                b.int(1),
            ),
        ))]),
    );
    let items = if b_first {
        vec![Item::Class(class_b), Item::Class(class_a)]
    } else {
        vec![Item::Class(class_a), Item::Class(class_b)]
    };
    (single_unit(items), b.finish())
}

/// `greet(name, {greeting = "hi"}) => greeting + ", " + name;`
/// `main() { return greet("bob", greeting: "yo"); }`
fn greeting() -> (Program, Interner) {
    let b = AstBuilder::new();
    let greet_id = b.function_id();
    let (name_param, name) = b.param("name");
    let (greeting_param, greeting) = b.named_param("greeting", Some(b.string("hi")));
    let greet = b.function_decl(
        greet_id,
        "greet",
        b.arrow(
            vec![name_param, greeting_param],
            b.binary(
                BinaryOperator::Add,
                b.binary(BinaryOperator::Add, b.local_ref("greeting", greeting), b.string(", ")),
                b.local_ref("name", name),
            ),
        ),
    );
    let main = top_level(
        &b,
        b.function_id(),
        "main",
        vec![],
        vec![b.return_stmt(Some(b.call_with(
            b.function_ref("greet", greet_id),
            b.args(vec![b.string("bob")], vec![("greeting", b.string("yo"))]),
        )))],
    );
    (single_unit(vec![greet, main]), b.finish())
}

/// A little of everything: classes, closures, a trampoline and static state.
fn mixed_program() -> (Program, Interner) {
    let b = AstBuilder::new();
    let shape_id = b.class_id();
    let square_id = b.class_id();
    let side = b.member_binding(square_id, "side", MemberKind::Field, false);
    let instances = b.member_binding(shape_id, "_instances", MemberKind::Field, true);

    let shape = b.class_decl(
        shape_id,
        "Shape",
        None,
        vec![
            b.field("_instances", true, Some(b.int(0))),
            b.constructor(
                None,
                b.function(
                    vec![],
                    vec![b.expr_stmt(b.compound_assign(
                        BinaryOperator::Add,
                        b.member_ref(instances),
                        b.int(1),
                    ))],
                ),
                vec![],
                None,
            ),
        ],
        None,
    );

    let (scale_param, scale) = b.optional_param("scale", Some(b.int(1)));
    let square = b.class_decl(
        square_id,
        "Square",
        Some(shape_id),
        vec![
            b.field("side", false, Some(b.int(2))),
            b.method(
                "scaled",
                MethodKind::Method,
                false,
                b.arrow(
                    vec![scale_param],
                    b.binary(BinaryOperator::Multiply, b.member_ref(side), b.local_ref("scale", scale)),
                ),
            ),
            b.method(
                "area",
                MethodKind::Getter,
                false,
                b.arrow(vec![], b.binary(BinaryOperator::Multiply, b.member_ref(side), b.member_ref(side))),
            ),
        ],
        None,
    );

    let (k_param, k) = b.param("k");
    let (x_param, x) = b.param("x");
    let adder = top_level(
        &b,
        b.function_id(),
        "adder",
        vec![k_param],
        vec![b.return_stmt(Some(Expression::Function(b.arrow(
            vec![x_param],
            b.binary(BinaryOperator::Add, b.local_ref("x", x), b.local_ref("k", k)),
        ))))],
    );

    (
        Program::new(vec![
            CompilationUnit::new("lib/shapes.st", vec![Item::Class(shape), Item::Class(square)]),
            CompilationUnit::new("lib/util.st", vec![adder]),
        ]),
        b.finish(),
    )
}

fn statements(program: &FlatProgram, function: &str) -> Vec<FlatStmt> {
    program
        .function(function)
        .unwrap_or_else(|| panic!("missing function {}", function))
        .body
        .clone()
}

// ============================================================================
// Closure hoisting
// ============================================================================

#[test]
fn test_inner_function_is_hoisted_with_its_alias() {
    let (program, interner) = outer_inner();
    let flat = lower(&program, &interner);

    assert_eq!(
        flat.pretty_print(),
        "record outer$M$A0 { a }\n\
         \n\
         fn outer$M(a) ; function {\n  \
         alias $s0 = outer$M$A0 { a: a };\n  \
         let inner = bind(outer$M$0_inner$L, unbound, $s0);\n  \
         return inner;\n\
         }\n\
         fn outer$M$0_inner$L($s0) ; closure {\n  \
         return $s0.a;\n\
         }\n\
         barrier $barrier0 ; lib/main.st\n"
    );
}

#[test]
fn test_closure_without_captures_is_a_plain_reference() {
    let b = AstBuilder::new();
    let (x_param, x) = b.param("x");
    let closure = b.arrow(
        vec![x_param],
        b.binary(BinaryOperator::Add, b.local_ref("x", x), b.int(1)),
    );
    let item = top_level(
        &b,
        b.function_id(),
        "outer",
        vec![],
        vec![b.return_stmt(Some(Expression::Function(closure)))],
    );
    let program = single_unit(vec![item]);
    let flat = lower(&program, &b.finish());

    assert_eq!(
        statements(&flat, "outer$M"),
        vec![FlatStmt::Return(Some(FlatExpr::global("outer$M$0$L")))]
    );
    assert_eq!(flat.function("outer$M$0$L").map(|f| f.params.clone()), Some(vec!["x".to_string()]));
    assert!(flat.alias_records.is_empty());
}

#[test]
fn test_nested_closures_receive_every_enclosing_alias() {
    let b = AstBuilder::new();
    let (a_param, a) = b.param("a");
    let (b_param, b_local) = b.param("b");
    let (c_param, c) = b.param("c");
    let innermost = b.arrow(
        vec![c_param],
        b.binary(
            BinaryOperator::Add,
            b.binary(BinaryOperator::Add, b.local_ref("a", a), b.local_ref("b", b_local)),
            b.local_ref("c", c),
        ),
    );
    let middle = b.arrow(vec![b_param], Expression::Function(innermost));
    let item = top_level(
        &b,
        b.function_id(),
        "outer",
        vec![a_param],
        vec![b.return_stmt(Some(Expression::Function(middle)))],
    );
    let program = single_unit(vec![item]);
    let flat = lower(&program, &b.finish());

    let middle = flat.function("outer$M$0$L").expect("middle closure");
    let innermost = flat.function("outer$M$1$L").expect("innermost closure");
    assert_eq!(middle.params, vec!["$s0", "b"]);
    assert_eq!(innermost.params, vec!["$s0", "$s1", "c"]);
    assert_eq!(
        middle.body.last(),
        Some(&FlatStmt::Return(Some(FlatExpr::Bind {
            function: "outer$M$1$L".into(),
            receiver: false,
            scopes: vec!["$s0".into(), "$s1".into()],
        })))
    );
}

#[test]
fn test_field_initializer_closure_is_hoisted_once() {
    let b = AstBuilder::new();
    let class_id = b.class_id();
    let class = b.class_decl(
        class_id,
        "C",
        None,
        vec![
            b.field("f", false, Some(Expression::Function(b.arrow(vec![], b.int(1))))),
            b.constructor(None, b.function(vec![], vec![]), vec![], None),
            b.constructor(Some("named"), b.function(vec![], vec![]), vec![], None),
        ],
        None,
    );
    let program = single_unit(vec![Item::Class(class)]);
    let flat = lower(&program, &b.finish());

    let closures: Vec<&str> = flat
        .declarations
        .iter()
        .filter_map(|decl| match decl {
            FlatDecl::Function(func) if func.origin == FunctionOrigin::Closure => Some(func.name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(closures, vec!["C$f$F$0$L"]);

    let init = FlatStmt::Expr(FlatExpr::assign(
        Place::Field {
            object: FlatExpr::This,
            property: "f$F".into(),
        },
        FlatExpr::global("C$f$F$0$L"),
    ));
    assert_eq!(statements(&flat, "C$$C"), vec![init.clone()]);
    assert_eq!(statements(&flat, "C$named$C"), vec![init]);
}

#[test]
fn test_method_closure_binds_receiver() {
    let b = AstBuilder::new();
    let class_id = b.class_id();
    let v = b.member_binding(class_id, "v", MemberKind::Field, false);
    let class = b.class_decl(
        class_id,
        "Box",
        None,
        vec![
            b.field("v", false, Some(b.int(7))),
            b.method(
                "reader",
                MethodKind::Method,
                false,
                b.arrow(vec![], Expression::Function(b.arrow(vec![], b.member_ref(v)))),
            ),
        ],
        None,
    );
    let program = single_unit(vec![Item::Class(class)]);
    let flat = lower(&program, &b.finish());

    assert_eq!(
        statements(&flat, "Box$reader$M"),
        vec![FlatStmt::Return(Some(FlatExpr::Bind {
            function: "Box$reader$M$0$L".into(),
            receiver: true,
            scopes: vec![],
        }))]
    );
    let closure = flat.function("Box$reader$M$0$L").expect("hoisted");
    assert!(closure.receiver);
    assert!(closure.params.is_empty());
}

// ============================================================================
// Scopes and locals
// ============================================================================

#[test]
fn test_shadowed_local_gets_a_fresh_name() {
    let b = AstBuilder::new();
    let (outer_decl, x) = b.var_decl("x", Some(b.int(1)));
    let (inner_decl, _) = b.var_decl("x", Some(b.int(2)));
    let item = top_level(
        &b,
        b.function_id(),
        "f",
        vec![],
        vec![
            outer_decl,
            b.block(vec![inner_decl]),
            b.return_stmt(Some(b.local_ref("x", x))),
        ],
    );
    let program = single_unit(vec![item]);
    let flat = lower(&program, &b.finish());

    assert_eq!(
        statements(&flat, "f$M"),
        vec![
            FlatStmt::Let {
                name: "x".into(),
                value: Some(FlatExpr::int(1)),
            },
            FlatStmt::Block(vec![FlatStmt::Let {
                name: "x$7".into(),
                value: Some(FlatExpr::int(2)),
            }]),
            FlatStmt::Return(Some(FlatExpr::local("x"))),
        ]
    );
}

#[test]
fn test_reserved_words_are_not_used_as_locals() {
    let b = AstBuilder::new();
    let (decl, local) = b.var_decl("class", Some(b.int(1)));
    let item = top_level(
        &b,
        b.function_id(),
        "f",
        vec![],
        vec![decl, b.return_stmt(Some(b.local_ref("class", local)))],
    );
    let program = single_unit(vec![item]);
    let flat = lower(&program, &b.finish());

    assert_eq!(
        statements(&flat, "f$M"),
        vec![
            FlatStmt::Let {
                name: "class$7".into(),
                value: Some(FlatExpr::int(1)),
            },
            FlatStmt::Return(Some(FlatExpr::local("class$7"))),
        ]
    );
}

#[test]
fn test_local_never_takes_a_global_name() {
    // a() => 42; main() { var a$M = 1; return a(); }
    let b = AstBuilder::new();
    let a_id = b.function_id();
    let a = top_level(&b, a_id, "a", vec![], vec![b.return_stmt(Some(b.int(42)))]);
    let (decl, _) = b.var_decl("a$M", Some(b.int(1)));
    let main = top_level(
        &b,
        b.function_id(),
        "main",
        vec![],
        vec![decl, b.return_stmt(Some(b.call(b.function_ref("a", a_id), vec![])))],
    );
    let program = single_unit(vec![a, main]);
    let flat = lower(&program, &b.finish());

    assert_eq!(
        statements(&flat, "main$M"),
        vec![
            FlatStmt::Let {
                name: "a$$M".into(),
                value: Some(FlatExpr::int(1)),
            },
            FlatStmt::Return(Some(FlatExpr::Call {
                function: "a$M".into(),
                args: vec![],
            })),
        ]
    );
    assert!(!flat.names.contains("a$$M"));
}

fn captured_block() -> (Program, Interner) {
    let b = AstBuilder::new();
    let (y_decl, y) = b.var_decl("y", Some(b.int(1)));
    let (g_decl, _) = b.var_decl("g", Some(Expression::Function(b.arrow(vec![], b.local_ref("y", y)))));
    let item = top_level(&b, b.function_id(), "f", vec![], vec![b.block(vec![y_decl, g_decl])]);
    (single_unit(vec![item]), b.finish())
}

#[test]
fn test_block_alias_is_created_and_cleared() {
    let (program, interner) = captured_block();
    let flat = lower(&program, &interner);

    assert_eq!(
        statements(&flat, "f$M"),
        vec![FlatStmt::Block(vec![
            FlatStmt::InitAlias {
                alias: "$s1".into(),
                record: "f$M$A1".into(),
                fields: vec![("y".into(), FlatExpr::Absent)],
            },
            FlatStmt::Expr(FlatExpr::assign(
                Place::Alias {
                    alias: "$s1".into(),
                    field: "y".into(),
                },
                FlatExpr::int(1),
            )),
            FlatStmt::Let {
                name: "g".into(),
                value: Some(FlatExpr::Bind {
                    function: "f$M$0$L".into(),
                    receiver: false,
                    scopes: vec!["$s1".into()],
                }),
            },
            FlatStmt::ClearAlias("$s1".into()),
        ])]
    );
    assert_eq!(
        flat.function("f$M$0$L").map(|f| f.body.clone()),
        Some(vec![FlatStmt::Return(Some(FlatExpr::AliasGet {
            alias: "$s1".into(),
            field: "y".into(),
        }))])
    );
}

#[test]
fn test_alias_clearing_can_be_disabled() {
    let (program, interner) = captured_block();
    let options = LowerOptions::default().with_clear_scope_aliases(false);
    let flat = lower_program(&program, &interner, &options).expect("lowers");

    let FlatStmt::Block(body) = &statements(&flat, "f$M")[0] else {
        panic!("expected a block");
    };
    assert!(!body.iter().any(|stmt| matches!(stmt, FlatStmt::ClearAlias(_))));
    assert_eq!(body.len(), 3);
}

// ============================================================================
// Names
// ============================================================================

#[test]
fn test_private_fields_differ_across_units() {
    let b = AstBuilder::new();
    let class_a = b.class_decl(b.class_id(), "A", None, vec![b.field("_x", false, None)], None);
    let class_b = b.class_decl(b.class_id(), "B", None, vec![b.field("_x", false, None)], None);
    let program = Program::new(vec![
        CompilationUnit::new("lib/a.st", vec![Item::Class(class_a)]),
        CompilationUnit::new("lib/b.st", vec![Item::Class(class_b)]),
    ]);
    let flat = lower(&program, &b.finish());

    let field_a = flat.class("A$").expect("A").fields[0].clone();
    let field_b = flat.class("B$").expect("B").fields[0].clone();
    assert_ne!(field_a, field_b);
    for field in [&field_a, &field_b] {
        assert!(field.starts_with("_x$_"));
        assert!(field.ends_with("$F"));
        assert_eq!(field.len(), "_x$_".len() + 8 + "$F".len());
    }
}

#[test]
fn test_private_token_length_from_toml() {
    let b = AstBuilder::new();
    let class = b.class_decl(b.class_id(), "A", None, vec![b.field("_x", false, None)], None);
    let program = single_unit(vec![Item::Class(class)]);
    let options = LowerOptions::from_toml_str("private_hash_len = 4").expect("valid options");
    let flat = lower_program(&program, &b.finish(), &options).expect("lowers");

    let field = &flat.class("A$").expect("A").fields[0];
    assert_eq!(field.len(), "_x$_".len() + 4 + "$F".len());
}

#[test]
fn test_member_roles_get_distinct_names() {
    let (program, interner) = mixed_program();
    let flat = lower(&program, &interner);

    let square = flat.class("Square$").expect("Square");
    assert_eq!(square.superclass.as_deref(), Some("Shape$"));
    assert_eq!(square.fields, vec!["side$F"]);
    let slots: Vec<(&str, SlotKind, &str)> = square
        .methods
        .iter()
        .map(|slot| (slot.property.as_str(), slot.kind, slot.function.as_str()))
        .collect();
    assert_eq!(
        slots,
        vec![
            ("scaled$M", SlotKind::Method, "Square$scaled$M$N"),
            ("area$G", SlotKind::Getter, "Square$area$G"),
        ]
    );

    let shape = flat.class("Shape$").expect("Shape");
    assert_eq!(shape.static_fields.len(), 1);
    assert!(shape.static_fields[0].starts_with("Shape$_instances$_"));
}

#[test]
fn test_global_names_are_unique() {
    let (program, interner) = mixed_program();
    let flat = lower(&program, &interner);

    let mut names: Vec<&str> = flat.names.entries().iter().map(|e| e.name.as_str()).collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total);

    let mut declared = flat.declaration_names();
    let count = declared.len();
    declared.sort_unstable();
    declared.dedup();
    assert_eq!(declared.len(), count);
}

#[test]
fn test_lowering_is_deterministic() {
    let (first, first_interner) = mixed_program();
    let (second, second_interner) = mixed_program();
    let a = lower(&first, &first_interner).to_json().expect("json");
    let b = lower(&second, &second_interner).to_json().expect("json");
    assert_eq!(a, b);
}

// ============================================================================
// Trampolines
// ============================================================================

#[test]
fn test_named_parameter_call_site_uses_uniform_convention() {
    let (program, interner) = greeting();
    let flat = lower(&program, &interner);

    assert_eq!(
        statements(&flat, "main$M"),
        vec![FlatStmt::Return(Some(FlatExpr::Call {
            function: "greet$M$N".into(),
            args: vec![
                FlatExpr::int(1),
                FlatExpr::NamedBag(vec![(
                    "greeting".into(),
                    FlatExpr::Literal(FlatLiteral::String("yo".into())),
                )]),
                FlatExpr::int(1),
                FlatExpr::Literal(FlatLiteral::String("bob".into())),
            ],
        }))]
    );
}

#[test]
fn test_trampoline_shape() {
    let (program, interner) = greeting();
    let flat = lower(&program, &interner);

    let trampoline = flat.function("greet$M$N").expect("trampoline");
    assert_eq!(trampoline.origin, FunctionOrigin::Trampoline);
    assert!(!trampoline.receiver);
    assert_eq!(trampoline.params, vec!["$posCount", "$named", "$namedCount", "name"]);
    assert_eq!(
        trampoline.body.last(),
        Some(&FlatStmt::Return(Some(FlatExpr::Call {
            function: "greet$M".into(),
            args: vec![FlatExpr::local("name"), FlatExpr::local("greeting")],
        })))
    );
    let guard = &trampoline.body[trampoline.body.len() - 2];
    assert!(matches!(
        guard,
        FlatStmt::If { then_branch, .. }
            if then_branch == &vec![FlatStmt::Return(Some(FlatExpr::NoSuchMethod("greet$M".into())))]
    ));

    // The target keeps its plain signature.
    assert_eq!(flat.function("greet$M").map(|f| f.params.clone()), Some(vec!["name".into(), "greeting".into()]));
    assert!(flat.position("greet$M") < flat.position("greet$M$N"));
}

#[test]
fn test_closure_trampoline_passes_aliases_through() {
    let b = AstBuilder::new();
    let (a_param, a) = b.param("a");
    let (x_param, x) = b.param("x");
    let (y_param, y) = b.optional_param("y", Some(b.int(10)));
    let add = b.arrow(
        vec![x_param, y_param],
        b.binary(
            BinaryOperator::Add,
            b.binary(BinaryOperator::Add, b.local_ref("a", a), b.local_ref("x", x)),
            b.local_ref("y", y),
        ),
    );
    let item = top_level(
        &b,
        b.function_id(),
        "outer",
        vec![a_param],
        vec![b.return_stmt(Some(Expression::Function(add)))],
    );
    let program = single_unit(vec![item]);
    let flat = lower(&program, &b.finish());

    let trampoline = flat.function("outer$M$0$L$N").expect("trampoline");
    assert_eq!(
        trampoline.params,
        vec!["$s0", "$posCount", "$named", "$namedCount", "x", "y"]
    );
    assert_eq!(
        statements(&flat, "outer$M").last(),
        Some(&FlatStmt::Return(Some(FlatExpr::Bind {
            function: "outer$M$0$L$N".into(),
            receiver: false,
            scopes: vec!["$s0".into()],
        })))
    );
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn test_static_inits_follow_the_barrier() {
    let (program, interner) = static_pair(false);
    let flat = lower(&program, &interner);

    assert_eq!(
        flat.declaration_names(),
        vec!["A$", "A$$C", "B$", "B$$C", "$barrier0", "A$I", "B$I"]
    );
}

#[test]
fn test_superclass_is_emitted_before_subclass() {
    let (program, interner) = static_pair(true);
    let flat = lower(&program, &interner);

    let position = |name: &str| flat.position(name).unwrap_or_else(|| panic!("missing {}", name));
    assert!(position("A$") < position("B$"));
    let barrier = position("$barrier0");
    for name in ["A$", "A$$C", "B$", "B$$C"] {
        assert!(position(name) < barrier, "{} after the barrier", name);
    }
    assert_eq!(&flat.declaration_names()[barrier + 1..], &["B$I", "A$I"]);
}

#[test]
fn test_each_unit_gets_a_barrier() {
    let (program, interner) = mixed_program();
    let flat = lower(&program, &interner);

    let barriers: Vec<&str> = flat
        .declarations
        .iter()
        .filter_map(|decl| match decl {
            FlatDecl::Barrier { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(barriers, vec!["$barrier0", "$barrier1"]);
    assert!(flat.position("Shape$I") > flat.position("$barrier0"));
    assert!(flat.position("Shape$I") < flat.position("adder$M"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_self_inheritance_is_a_cycle() {
    let b = AstBuilder::new();
    let id = b.class_id();
    let class = b.class_decl(id, "A", Some(id), vec![], None);
    let program = single_unit(vec![Item::Class(class)]);

    let err = lower_program(&program, &b.finish(), &LowerOptions::default()).unwrap_err();
    assert_eq!(err, LowerError::DependencyCycle(vec!["A$".into(), "A$".into()]));
    assert!(err.is_internal());
}

#[test]
fn test_unknown_class_is_reported() {
    let b = AstBuilder::new();
    let item = top_level(
        &b,
        b.function_id(),
        "f",
        vec![],
        vec![b.return_stmt(Some(b.new_object(ClassId(99), None, Arguments::default())))],
    );
    let program = single_unit(vec![item]);

    let err = lower_program(&program, &b.finish(), &LowerOptions::default()).unwrap_err();
    assert_eq!(err, LowerError::UnknownClass(99));
}

#[test]
fn test_invalid_options_are_rejected() {
    let (program, interner) = outer_inner();
    let options = LowerOptions::default().with_private_hash_len(0);

    let err = lower_program(&program, &interner, &options).unwrap_err();
    assert!(matches!(err, LowerError::InvalidOptions { .. }));
    assert!(!err.is_internal());
}
