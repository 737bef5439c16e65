//! End-to-end tests for the semantic passes: parse a source, run the
//! pipeline, and inspect the verdict.
use rux_lexer::Lexer;
use rux_parser::parse_module;
use rux_sema::{analyse, Analysis, SemanticError, SemanticErrorKind};

fn check(src: &str) -> Result<Analysis, SemanticError> {
    let tokens = Lexer::new(src).tokenise().expect("lexes");
    let module = parse_module(tokens).expect("parses");
    analyse(&module)
}

fn check_err(src: &str) -> SemanticErrorKind {
    check(src).expect_err("expected a semantic error").kind
}

#[test]
fn simple_arithmetic_program() {
    check("fn main() -> i32 { let x: i32 = 1; let y: i32 = 2; x + y }").unwrap();
}

#[test]
fn while_accumulator() {
    check(
        "fn main() -> i32 {\n\
            let mut s: i32 = 0;\n\
            let mut i: i32 = 1;\n\
            while (i <= 10) { s = s + i; i = i + 1; }\n\
            s\n\
         }",
    )
    .unwrap();
}

#[test]
fn unsigned_literals_unify() {
    check(
        "fn main() -> i32 {\n\
            let x: u32 = 2147483648u32;\n\
            let y: u32 = 2147483647u32;\n\
            if (x < y) { 1 } else { 0 }\n\
         }",
    )
    .unwrap();
}

#[test]
fn loop_break_value() {
    check("fn main() -> i32 { let r: i32 = loop { break 42; }; r }").unwrap();
}

#[test]
fn structs_and_methods() {
    check(
        "struct P { x: i32, y: i32 }\n\
         impl P {\n\
            fn new(x: i32, y: i32) -> P { P { x: x, y: y } }\n\
            fn sum(&self) -> i32 { self.x + self.y }\n\
            fn shift(&mut self, d: i32) { self.x = self.x + d; }\n\
         }\n\
         fn main() -> i32 { let mut p: P = P::new(3, 4); p.shift(1); p.sum() }",
    )
    .unwrap();
}

#[test]
fn traits_require_their_items() {
    let err = check_err(
        "trait Area { fn area(&self) -> i32; }\n\
         struct R { w: i32, h: i32 }\n\
         impl Area for R { }",
    );
    assert!(matches!(err, SemanticErrorKind::UnresolvedName { name } if name == "area"));
}

#[test]
fn redeclaration_in_same_scope() {
    let err = check_err("fn main() { let x: i32 = 1; let x: i32 = 2; }");
    assert!(matches!(err, SemanticErrorKind::Redeclaration { name } if name == "x"));
}

#[test]
fn shadowing_across_scopes_is_fine() {
    check("fn main() { let x: i32 = 1; { let x: bool = true; let y: bool = x; } let z: i32 = x; }")
        .unwrap();
}

#[test]
fn use_before_declaration() {
    let err = check_err("fn main() { let y: i32 = x; let x: i32 = 1; }");
    assert!(matches!(err, SemanticErrorKind::UnresolvedName { name } if name == "x"));
}

#[test]
fn assignment_needs_a_mutable_binding() {
    let err = check_err("fn main() { let x: i32 = 1; x = 2; }");
    assert_eq!(err, SemanticErrorKind::NotMutable);
}

#[test]
fn assignment_to_value_is_rejected() {
    let err = check_err("fn main() { 1 = 2; }");
    assert_eq!(err, SemanticErrorKind::NotAPlace);
}

#[test]
fn mut_borrow_needs_a_mutable_place() {
    let err = check_err("fn main() { let x: i32 = 1; let r: &mut i32 = &mut x; }");
    assert_eq!(err, SemanticErrorKind::NotMutable);
}

#[test]
fn break_outside_loop() {
    let err = check_err("fn main() { break; }");
    assert_eq!(err, SemanticErrorKind::BreakOutsideLoop);
}

#[test]
fn signedness_does_not_mix() {
    let err = check_err("fn main() { let x: i32 = 1; let y: u32 = 2u32; let z: i32 = x + y; }");
    assert!(matches!(err, SemanticErrorKind::TypeMismatch { .. }));
}

#[test]
fn casts_are_integer_only() {
    check("fn main() -> i32 { let x: u32 = 7u32; x as i32 }").unwrap();
    check("fn main() -> i32 { let b: bool = true; b as i32 }").unwrap();

    let err = check_err("fn main() -> i32 { let c: char = 'a'; c as i32 }");
    assert!(matches!(err, SemanticErrorKind::InvalidCast { .. }));
}

#[test]
fn ambiguous_literal_is_an_error() {
    let err = check_err("fn main() { let x = 5; }");
    assert_eq!(err, SemanticErrorKind::AmbiguousIntegerLiteral);
}

#[test]
fn suffixed_literal_infers_the_binding() {
    check("fn main() { let x = 5u32; let y: u32 = x; }").unwrap();
}

#[test]
fn condition_must_be_bool() {
    let err = check_err("fn main() { if 1 { } }");
    assert!(matches!(err, SemanticErrorKind::TypeMismatch { .. }));
}

#[test]
fn enums_compare_by_variant() {
    check(
        "enum Color { Red, Green, Blue }\n\
         fn main() -> i32 {\n\
            let c: Color = Color::Green;\n\
            if c == Color::Red { 1 } else { 0 }\n\
         }",
    )
    .unwrap();
}

#[test]
fn arrays_index_with_usize() {
    check(
        "fn main() -> i32 {\n\
            let a: [i32; 3] = [1, 2, 3];\n\
            let i: usize = 1;\n\
            a[i] + a[0]\n\
         }",
    )
    .unwrap();

    let err = check_err(
        "fn main() -> i32 { let a: [i32; 2] = [1, 2]; let i: i32 = 0; a[i] }",
    );
    assert!(matches!(err, SemanticErrorKind::TypeMismatch { .. }));
}

#[test]
fn arity_is_checked() {
    let err = check_err(
        "fn add(a: i32, b: i32) -> i32 { a + b }\n\
         fn main() -> i32 { add(1) }",
    );
    assert!(matches!(
        err,
        SemanticErrorKind::ArityMismatch { expected: 2, found: 1, .. }
    ));
}

#[test]
fn runtime_externs_are_visible() {
    check("fn main() { printlnInt(getInt()); }").unwrap();
}

#[test]
fn return_type_must_match() {
    let err = check_err("fn f() -> i32 { true }");
    assert!(matches!(err, SemanticErrorKind::TypeMismatch { .. }));
}

#[test]
fn loop_break_types_unify() {
    let err = check_err("fn main() -> i32 { loop { if true { break 1; } break false; } }");
    assert!(matches!(err, SemanticErrorKind::TypeMismatch { .. }));
}
