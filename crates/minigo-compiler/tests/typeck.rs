mod common;

use common::program;
use minigo_compiler::ast::BinOp;
use minigo_compiler::{compile, parse, typecheck, Analyzer, Diagnostic, Parser, Type};

fn diagnostics(body: &str) -> Vec<Diagnostic> {
    let prog = parse(&program(body)).unwrap_or_else(|e| panic!("parse error: {e}"));
    match typecheck(&prog) {
        Ok(()) => vec![],
        Err(d) => d,
    }
}

fn check_ok(body: &str) {
    let d = diagnostics(body);
    assert!(d.is_empty(), "expected no diagnostics for {body:?}, got {d:?}");
}

fn check_err(body: &str) -> Vec<Diagnostic> {
    let d = diagnostics(body);
    assert!(!d.is_empty(), "expected diagnostics for {body:?}");
    d
}

const OPERANDS: [(&str, Type); 3] = [("1", Type::Int), ("true", Type::Bool), ("\"s\"", Type::Str)];

const BINARY: [(&str, BinOp); 13] = [
    ("+", BinOp::Add), ("-", BinOp::Sub), ("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem),
    ("<", BinOp::Lt), ("<=", BinOp::Le), (">", BinOp::Gt), (">=", BinOp::Ge),
    ("==", BinOp::Eq), ("!=", BinOp::Ne), ("&&", BinOp::And), ("||", BinOp::Or),
];

fn accepted(op: BinOp, l: Type, r: Type) -> bool {
    match op {
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => l == Type::Int && r == Type::Int,
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => l == Type::Int && r == Type::Int,
        BinOp::Eq | BinOp::Ne => l == r,
        BinOp::And | BinOp::Or => l == Type::Bool && r == Type::Bool,
    }
}

#[test]
fn every_binary_operator_against_every_operand_pair() {
    for (sym, op) in BINARY {
        for (l, lt) in OPERANDS {
            for (r, rt) in OPERANDS {
                let body = format!("print({l} {sym} {r})");
                let d = diagnostics(&body);
                if accepted(op, lt, rt) {
                    assert!(d.is_empty(), "{body} should be accepted: {d:?}");
                } else {
                    assert_eq!(d.len(), 1, "{body} should be rejected once: {d:?}");
                    assert!(d[0].message.contains(sym), "{body}: {}", d[0]);
                }
            }
        }
    }
}

#[test]
fn every_unary_operator_against_every_operand() {
    for (l, lt) in OPERANDS {
        let neg = diagnostics(&format!("print(-{l})"));
        assert_eq!(neg.is_empty(), lt == Type::Int, "-{l}: {neg:?}");
        let not = diagnostics(&format!("print(!{l})"));
        assert_eq!(not.is_empty(), lt == Type::Bool, "!{l}: {not:?}");
    }
}

#[test]
fn operator_result_types() {
    check_ok("var a int = 1 + 2 * 3 % 4 - 5 / 6");
    check_ok("var b bool = 1 < 2 && 3 >= 4 || !(1 == 2)");
    check_ok("var c bool = true != false");
    check_ok("var d int = -(1 + 2)");
    check_err("var e int = 1 < 2");
    check_err("var f bool = 1 + 2");
}

#[test]
fn infer_type_is_fixed_by_the_operator() {
    let analyzer = Analyzer::new();
    let infer = |src: &str| analyzer.infer_type(&Parser::from_source(src).parse_expr().expect("parse error"));
    assert_eq!(infer("1 + 2"), Type::Int);
    assert_eq!(infer("1 + true"), Type::Int);
    assert_eq!(infer("\"a\" == 3"), Type::Bool);
    assert_eq!(infer("!5"), Type::Bool);
    assert_eq!(infer("\"s\""), Type::Str);
    assert_eq!(infer("nowhere"), Type::Unknown);
    assert_eq!(infer("println(1)"), Type::Void);
}

#[test]
fn mismatched_initializer_is_reported_once() {
    let d = check_err("var x bool = 1");
    assert_eq!(d.len(), 1, "{d:?}");
    assert_eq!(d[0].line, Some(2));
    assert!(d[0].message.contains("'x'"), "{}", d[0]);
    assert!(d[0].to_string().starts_with("line 2:"));
}

#[test]
fn assignment_to_undeclared_is_reported_once() {
    let d = check_err("y = 5");
    assert_eq!(d.len(), 1, "{d:?}");
    assert!(d[0].message.contains("undeclared variable 'y'"), "{}", d[0]);
}

#[test]
fn errors_do_not_cascade() {
    assert_eq!(check_err("var x int = (1 + true) * 2").len(), 1);
    assert_eq!(check_err("print(missing + 1)").len(), 1);
    assert_eq!(check_err("if missing { }").len(), 1);
    assert_eq!(check_err("y = 1 + true").len(), 2);
    // an unknown declared type is reported once, uses of the name are not
    assert_eq!(check_err("var s string = \"hi\"\ns = 3\nprint(s + 1)").len(), 1);
}

#[test]
fn analysis_keeps_going_after_errors() {
    let d = check_err("var a bool = 1\nb = 2\nif 3 { }\nfor 4 { }");
    let lines: Vec<_> = d.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![Some(2), Some(3), Some(4), Some(5)]);
}

#[test]
fn conditions_must_be_bool() {
    check_ok("var i int = 0\nfor i < 3 { i = i + 1 }");
    check_ok("if true { } else { }");
    check_err("if 1 + 1 { println(1) }");
    check_err("for 1 { }");
}

#[test]
fn shadowing_and_scopes() {
    check_ok("var x int = 1\n{ var x bool = true\n if x { } }\nx = 2");
    check_ok("var x int = 1\nif true { var x bool = false\n x = true }\nx = 3");
    check_ok("for false { var t int = 1\n t = t + 1 }\nvar t bool = true");
    check_err("var x int = 1\nvar x int = 2");
    check_err("{ var y int = 1 }\ny = 2");
    check_err("if true { var z int = 1 } else { z = 2 }");
}

#[test]
fn redeclaration_still_checks_the_initializer() {
    let d = check_err("var x int = 1\nvar x int = missing");
    assert_eq!(d.len(), 2, "{d:?}");
}

#[test]
fn initializer_cannot_see_its_own_variable() {
    let d = check_err("var x int = x");
    assert!(d[0].message.contains("undeclared variable 'x'"), "{}", d[0]);
    check_ok("var x int = 1\n{ var x int = x + 1\n print(x) }");
}

#[test]
fn print_takes_exactly_one_argument() {
    check_ok("print(1)\nprintln(\"s\")\nprintln(true && false)");
    check_err("print(1, 2)");
    check_err("println()");
}

#[test]
fn calls_produce_no_value() {
    check_err("var x int = print(1)");
    check_err("println(print(1) + 1)");
    assert_eq!(check_err("println(print(1))").len(), 1);
    assert_eq!(check_err("if print(1) == print(2) { println(3) }").len(), 1);
}

#[test]
fn clean_analysis_always_generates() {
    for body in [
        "println(\"a\" == \"b\")",
        "var b bool\nif !b || 1 / 1 == 1 { print(-3 % 2) }",
        "var x int\n{ var x bool = true\n for x { x = false } }\nprintln(x)",
    ] {
        let src = program(body);
        assert!(typecheck(&parse(&src).expect("parse error")).is_ok(), "{body}");
        assert!(compile(&src).is_ok(), "{body}");
    }
}

#[test]
fn bare_expressions_have_no_effect() {
    let d = check_err("var x int = 1\nx + 1");
    assert!(d[0].message.contains("no effect"), "{}", d[0]);
}

#[test]
fn analysis_is_deterministic() {
    let src = program("var a bool = 1\nb = 2\nprint(!3)");
    let prog = parse(&src).expect("parse error");
    let first = typecheck(&prog);
    let second = typecheck(&prog);
    assert_eq!(first, second);

    let mut analyzer = Analyzer::new();
    assert!(!analyzer.analyze(&prog));
    assert_eq!(analyzer.diagnostics(), first.unwrap_err().as_slice());
}
