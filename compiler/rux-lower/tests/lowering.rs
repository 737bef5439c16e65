//! End-to-end lowering tests: source text in, LLVM assembly out.
//! The assertions pin down the ABI, instruction selection and
//! control-flow shapes rather than byte-exact output.
use rux_ir::{Inst, IrCtx, Module, ValueKind};
use rux_lexer::Lexer;
use rux_lower::{emit_text, lower_module};
use rux_parser::parse_module;
use rux_sema::analyse;

fn lower(src: &str) -> (Module, IrCtx) {
    let tokens = Lexer::new(src).tokenise().expect("lexes");
    let ast = parse_module(tokens).expect("parses");
    let analysis = analyse(&ast).expect("analyses");
    lower_module(&ast, &analysis).expect("lowers")
}

fn compile(src: &str) -> String {
    let (module, ctx) = lower(src);
    emit_text(&module, &ctx)
}

/// Index of `needle` in `haystack`, asserting it exists.
fn position(haystack: &str, needle: &str) -> usize {
    haystack.find(needle).unwrap_or_else(|| {
        panic!("expected to find `{needle}` in:\n{haystack}");
    })
}

#[test]
fn adds_two_locals() {
    let text = compile("fn main() -> i32 { let x: i32 = 1; let y: i32 = 2; x + y }");

    position(&text, "define i32 @main() {");
    position(&text, "alloca i32");
    position(&text, "store i32 1, ptr");
    position(&text, "add i32");
    position(&text, "ret i32");
}

#[test]
fn while_loop_shape() {
    let text = compile(
        "fn main() -> i32 {\n\
            let mut s: i32 = 0;\n\
            let mut i: i32 = 1;\n\
            while (i <= 10) { s = s + i; i = i + 1; }\n\
            s\n\
         }",
    );

    let cond = position(&text, "cond.0:");
    let cmp = position(&text, "icmp sle i32");
    let branch = position(&text, "br i1");
    let body = position(&text, "body.1:");
    let after = position(&text, "after.2:");

    assert!(cond < cmp && cmp < branch && branch < body && body < after);
    // The body jumps back to the condition.
    position(&text, "br label %cond.0");
}

#[test]
fn unsigned_comparison_selects_ult() {
    let text = compile(
        "fn main() -> i32 {\n\
            let x: u32 = 2147483648u32;\n\
            let y: u32 = 2147483647u32;\n\
            if (x < y) { 1 } else { 0 }\n\
         }",
    );

    position(&text, "icmp ult i32");
    assert!(!text.contains("icmp slt"));
}

#[test]
fn unsigned_division_selects_udiv() {
    let text = compile(
        "fn main() -> i32 {\n\
            let x: u32 = 0xFFFFFFF6u32;\n\
            let y: u32 = 3u32;\n\
            (x / y) as i32\n\
         }",
    );

    position(&text, "udiv i32");
    position(&text, "store i32 -10, ptr");
    assert!(!text.contains("sdiv"));
}

#[test]
fn signed_division_selects_sdiv() {
    let text = compile("fn main() -> i32 { let a: i32 = -7; let b: i32 = 2; a / b }");
    position(&text, "sdiv i32");
}

#[test]
fn aggregate_return_abi() {
    let text = compile(
        "struct P { x: i32, y: i32 }\n\
         fn make() -> P { P { x: 3, y: 4 } }\n\
         fn main() -> i32 { let p: P = make(); p.x + p.y }",
    );

    position(&text, "%struct.P = type { i32, i32 }");

    // The size helper computes sizeof via gep/ptrtoint.
    position(&text, "define i32 @P.size() {");
    position(&text, "getelementptr %struct.P, ptr null, i32 1");
    position(&text, "ptrtoint ptr");

    // `make` returns through a caller-allocated buffer.
    position(&text, "define void @make(ptr %ret.ptr) {");
    position(&text, "call void @make(ptr");

    // Copies are memcpys sized by the size helper.
    position(&text, "call i32 @P.size()");
    position(&text, "declare void @llvm.memcpy.p0.p0.i32(ptr, ptr, i32, i1)");
    position(&text, "call void @llvm.memcpy.p0.p0.i32(ptr");

    // Field reads walk the struct layout.
    position(&text, "getelementptr %struct.P, ptr");
    position(&text, "i32 0, i32 1");
}

#[test]
fn loop_break_value_becomes_a_phi() {
    let text = compile("fn main() -> i32 { let r: i32 = loop { break 42; }; r }");

    position(&text, "body.0:");
    position(&text, "after.1:");
    // Exactly one incoming: the break edge.
    position(&text, "phi i32 [ 42, %body.0 ]");
}

#[test]
fn short_circuit_and_defers_the_rhs() {
    let text = compile(
        "fn check() -> bool { true }\n\
         fn main() -> i32 { let a: bool = false; if a && check() { 1 } else { 0 } }",
    );

    let branch = position(&text, "br i1");
    let rhs = position(&text, "rhs.0:");
    let call = position(&text, "call void @check(ptr");
    let merge = position(&text, "merge.1:");
    let phi = position(&text, "phi i1 [ 0,");

    // The call sits strictly on the non-short-circuit path.
    assert!(branch < rhs && rhs < call && call < merge && merge < phi);
}

#[test]
fn short_circuit_or_uses_true_constant() {
    let text = compile(
        "fn main() -> i32 { let a: bool = true; let b: bool = false; if a || b { 1 } else { 0 } }",
    );
    position(&text, "phi i1 [ 1,");
}

#[test]
fn methods_pass_self_as_pointer() {
    let text = compile(
        "struct Counter { n: i32 }\n\
         impl Counter {\n\
            fn bump(&mut self) { self.n = self.n + 1; }\n\
            fn get(&self) -> i32 { self.n }\n\
         }\n\
         fn main() -> i32 { let mut c: Counter = Counter { n: 0 }; c.bump(); c.get() }",
    );

    position(&text, "define void @Counter.bump(ptr %ret.ptr, ptr %self) {");
    position(&text, "define void @Counter.get(ptr %ret.ptr, ptr %self) {");
    position(&text, "call void @Counter.bump(ptr");

    // Unit-returning paths still initialise the return buffer.
    position(&text, "store i8 0, ptr");
}

#[test]
fn constants_become_globals() {
    let text = compile(
        "const LIMIT: i32 = 10;\n\
         fn main() -> i32 { LIMIT }",
    );

    position(&text, "@LIMIT = constant i32 10");
    position(&text, "load i32, ptr @LIMIT");
}

#[test]
fn enums_lower_to_discriminants() {
    let text = compile(
        "enum Color { Red, Green, Blue }\n\
         fn main() -> i32 {\n\
            let c: Color = Color::Green;\n\
            if c == Color::Blue { 1 } else { 0 }\n\
         }",
    );

    position(&text, "store i32 1, ptr");
    position(&text, "icmp eq i32");
    assert!(!text.contains("%struct.Color"));
}

#[test]
fn array_literals_fill_slots() {
    let text = compile(
        "fn main() -> i32 {\n\
            let a: [i32; 3] = [7, 8, 9];\n\
            let i: usize = 2;\n\
            a[i]\n\
         }",
    );

    position(&text, "alloca [3 x i32]");
    position(&text, "getelementptr [3 x i32], ptr");
    position(&text, "store i32 9, ptr");
}

#[test]
fn array_repeat_evaluates_the_element_once() {
    let text = compile("fn main() -> i32 { let a: [i32; 4] = [0; 4]; a[0] }");

    position(&text, "alloca [4 x i32]");
    // Four element stores, one per slot.
    assert_eq!(text.matches("store i32 0, ptr %tmp.").count(), 4);
}

#[test]
fn runtime_calls_use_native_signatures() {
    let text = compile("fn main() { printlnInt(getInt()); }");

    position(&text, "declare i32 @getInt()");
    position(&text, "declare void @printlnInt(i32)");
    position(&text, "call i32 @getInt()");
    position(&text, "call void @printlnInt(i32");
    position(&text, "define void @main() {");
}

#[test]
fn early_return_branches_to_the_epilogue() {
    let text = compile(
        "fn pick(flag: bool) -> i32 { if flag { return 1; } 2 }\n\
         fn main() -> i32 { pick(true) }",
    );

    position(&text, "define void @pick(ptr %ret.ptr, i1 %flag) {");
    position(&text, "br label %return");
    position(&text, "return:");

    // Every return path stores through the buffer before the branch.
    let store = position(&text, "store i32 1, ptr %ret.ptr");
    let ret_block = position(&text, "return:");
    assert!(store < ret_block);
}

#[test]
fn bool_to_int_cast_zero_extends() {
    let text = compile("fn main() -> i32 { let b: bool = true; b as i32 }");
    position(&text, "zext i1");
}

#[test]
fn terminators_are_unique_and_last() {
    let (module, ctx) = lower(
        "struct P { x: i32, y: i32 }\n\
         impl P { fn norm(&self) -> i32 { self.x * self.x + self.y * self.y } }\n\
         fn main() -> i32 {\n\
            let p: P = P { x: 1, y: 2 };\n\
            let mut total: i32 = 0;\n\
            let mut i: i32 = 0;\n\
            while (i < 3) {\n\
                if i == 1 { total = total + p.norm(); } else { total = total + 1; }\n\
                i = i + 1;\n\
            }\n\
            loop { if total > 0 { break; } total = total + 1; }\n\
            total\n\
         }",
    );

    for func in module.functions.values() {
        let function = ctx.function(*func);
        if function.is_declaration {
            continue;
        }

        for block in &function.blocks {
            let insts = &ctx.block(*block).insts;
            if insts.is_empty() {
                continue;
            }

            let terminators = insts
                .iter()
                .filter(|inst| match &ctx.value(**inst).kind {
                    ValueKind::Inst(inst) => inst.is_terminator(),
                    _ => false,
                })
                .count();
            assert_eq!(
                terminators, 1,
                "block {} of @{} has {terminators} terminators",
                ctx.block(*block).label,
                function.name
            );

            let last = insts.last().unwrap();
            let ValueKind::Inst(inst) = &ctx.value(*last).kind else { unreachable!() };
            assert!(inst.is_terminator(), "the terminator is not last");
        }
    }
}

#[test]
fn phi_incomings_match_block_predecessors() {
    let (module, ctx) = lower(
        "fn main() -> i32 { let f: bool = true; if f { 10 } else { 20 } }",
    );

    let main = module.function("main").unwrap();
    let mut phis = 0;
    for block in &ctx.function(main).blocks {
        for inst in &ctx.block(*block).insts {
            if let ValueKind::Inst(Inst::Phi { incomings }) = &ctx.value(*inst).kind {
                phis += 1;
                assert_eq!(incomings.len(), 2);
                for (value, _) in incomings {
                    assert_eq!(ctx.value_ty(*value), ctx.tys.i32);
                }
            }
        }
    }
    assert_eq!(phis, 1);
}

#[test]
fn string_literals_are_unsupported() {
    let tokens = Lexer::new("fn main() { let s: str = \"hi\"; }").tokenise().unwrap();
    let ast = parse_module(tokens).unwrap();
    let analysis = analyse(&ast).unwrap();
    let err = lower_module(&ast, &analysis).unwrap_err();
    assert!(matches!(err, rux_ir::IrError::UnsupportedFeature(_)));
}

#[test]
fn a_module_without_main_is_rejected() {
    let tokens = Lexer::new("fn helper() -> i32 { 1 }").tokenise().unwrap();
    let ast = parse_module(tokens).unwrap();
    let analysis = analyse(&ast).unwrap();
    let err = lower_module(&ast, &analysis).unwrap_err();
    assert!(matches!(err, rux_ir::IrError::MissingSymbol(name) if name == "main"));
}
