//! Parser tests

use crate::ast::{
    Accessor, BinaryOp, CaseTest, ExitKind, Expr, ExprKind, LoopKind, PrintSeparator, Program,
    Stmt, StmtKind, TypeAnnotation, UnaryOp,
};
use crate::parser::parse_source;

/// Helper to parse and expect success
fn parse_ok(source: &str) -> Program {
    match parse_source(source) {
        Ok(program) => program,
        Err(err) => panic!("parse failed for {source:?}: {err}"),
    }
}

/// Helper to check if parsing fails
fn parse_fails(source: &str) -> bool {
    parse_source(source).is_err()
}

fn parse_error(source: &str) -> String {
    parse_source(source).unwrap_err().message().to_string()
}

fn first(source: &str) -> Stmt {
    parse_ok(source).statements.remove(0)
}

/// Compact prefix rendering of an expression tree
fn sexpr(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Number(n) => n.to_string(),
        ExprKind::Str(s) => format!("{s:?}"),
        ExprKind::Variable(name) => name.clone(),
        ExprKind::Array(items) => format!("[{}]", join(items)),
        ExprKind::Object(fields) => format!("{{{}}}", fields_of(fields)),
        ExprKind::Record { type_name, fields } => format!("{type_name}{{{}}}", fields_of(fields)),
        ExprKind::WithField(name) => format!(".{name}"),
        ExprKind::Unary { op, operand } => {
            let op = match op {
                UnaryOp::Neg => "neg",
                UnaryOp::Plus => "pos",
                UnaryOp::Not => "not",
            };
            format!("({op} {})", sexpr(operand))
        }
        ExprKind::Binary { op, left, right } => format!("({op} {} {})", sexpr(left), sexpr(right)),
        ExprKind::Ternary {
            cond,
            then_branch,
            else_branch,
        } => format!("(? {} {} {})", sexpr(cond), sexpr(then_branch), sexpr(else_branch)),
        ExprKind::Call { callee, args } => {
            if args.is_empty() {
                format!("(call {})", sexpr(callee))
            } else {
                format!("(call {} {})", sexpr(callee), join(args))
            }
        }
        ExprKind::Member { object, name } => format!("(. {} {name})", sexpr(object)),
        ExprKind::Index { object, index } => format!("(idx {} {})", sexpr(object), sexpr(index)),
        ExprKind::Spread(inner) => format!("(... {})", sexpr(inner)),
        ExprKind::Await(inner) => format!("(await {})", sexpr(inner)),
        ExprKind::New { type_name, args } => match args {
            Some(args) => format!("(new {type_name} {})", join(args)),
            None => format!("(new {type_name})"),
        },
    }
}

fn join(items: &[Expr]) -> String {
    items.iter().map(sexpr).collect::<Vec<_>>().join(" ")
}

fn fields_of(fields: &[(String, Expr)]) -> String {
    fields
        .iter()
        .map(|(k, v)| format!("{k}: {}", sexpr(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse `x = <expr>` and render the right-hand side
fn expr(source: &str) -> String {
    match first(&format!("x = {source}")).kind {
        StmtKind::Assign { value, .. } => sexpr(&value),
        other => panic!("expected assignment, got {other:?}"),
    }
}

// ============================================
// Expressions
// ============================================

#[test]
fn test_parse_precedence_ladder() {
    insta::assert_snapshot!(expr("1 + 2 * 3"), @"(+ 1 (* 2 3))");
    insta::assert_snapshot!(expr("a OR b AND c"), @"(OR a (AND b c))");
    insta::assert_snapshot!(expr("a = 1 OR b <> 2"), @"(OR (= a 1) (<> b 2))");
    insta::assert_snapshot!(expr("1 < 2 = -1"), @"(= (< 1 2) (neg 1))");
    insta::assert_snapshot!(expr("a & b + c"), @"(+ (& a b) c)");
    insta::assert_snapshot!(expr("7 \\ 2 MOD 3"), @r"(MOD (\ 7 2) 3)");
}

#[test]
fn test_parse_power_is_left_associative_with_unary_operands() {
    insta::assert_snapshot!(expr("2 ^ 3 ^ 2"), @"(^ (^ 2 3) 2)");
    insta::assert_snapshot!(expr("2 ^ -1"), @"(^ 2 (neg 1))");
    insta::assert_snapshot!(expr("-2 ^ 2"), @"(^ (neg 2) 2)");
}

#[test]
fn test_parse_ternary_nests_to_the_right() {
    insta::assert_snapshot!(expr("a ? 1 : b ? 2 : 3"), @"(? a 1 (? b 2 3))");
}

#[test]
fn test_parse_not_binds_tighter_than_comparison() {
    insta::assert_snapshot!(expr("NOT a = b"), @"(= (not a) b)");
}

#[test]
fn test_parse_true_false_literals() {
    insta::assert_snapshot!(expr("TRUE + FALSE"), @"(+ -1 0)");
}

#[test]
fn test_parse_postfix_chain() {
    insta::assert_snapshot!(expr("a.b(1)[2].c"), @"(. (idx (call (. a b) 1) 2) c)");
    insta::assert_snapshot!(expr("v.Length()"), @"(call (. v Length))");
}

#[test]
fn test_parse_keyword_as_member_name() {
    insta::assert_snapshot!(expr("e.Type"), @"(. e Type)");
}

#[test]
fn test_parse_spread_forms() {
    insta::assert_snapshot!(expr("F(a..., ...b)"), @"(call F (... a) (... b))");
}

#[test]
fn test_parse_literals() {
    insta::assert_snapshot!(expr(r#"[1, "two", [3]]"#), @r#"[1 "two" [3]]"#);
    insta::assert_snapshot!(expr("{name: 1, \"key\": 2}"), @"{name: 1, key: 2}");
    insta::assert_snapshot!(expr("Vector{x: 3, y: 4}"), @"Vector{x: 3, y: 4}");
    insta::assert_snapshot!(expr("Vector{}"), @"Vector{}");
}

#[test]
fn test_parse_multiline_argument_list() {
    insta::assert_snapshot!(expr("F(1,\n  2\n)"), @"(call F 1 2)");
}

#[test]
fn test_parse_new_forms() {
    insta::assert_snapshot!(expr("NEW Vector"), @"(new Vector)");
    insta::assert_snapshot!(expr("NEW Vector(1, 2).x"), @"(. (new Vector 1 2) x)");
}

#[test]
fn test_parse_await() {
    insta::assert_snapshot!(expr("AWAIT Fetch(1) + 1"), @"(+ (await (call Fetch 1)) 1)");
}

#[test]
fn test_parse_missing_operand_fails() {
    assert!(parse_fails("x = 1 +"));
    assert!(parse_error("x = (1").contains("expected ')'"));
}

// ============================================
// Statements
// ============================================

#[test]
fn test_parse_let_and_assignment_targets() {
    for source in ["LET a = 1", "a = 1", "r.f = 1", "a[0] = 1", "a(0) = 1"] {
        assert!(matches!(first(source).kind, StmtKind::Assign { .. }), "{source}");
    }
    assert!(matches!(
        first("LET a = 1").kind,
        StmtKind::Assign { explicit_let: true, .. }
    ));
    assert!(parse_error("F(1, 2) = 3").contains("cannot assign"));
}

#[test]
fn test_parse_print_separators() {
    let StmtKind::Print { items, newline } = first("PRINT a; b, c;").kind else {
        panic!("expected PRINT");
    };
    assert!(!newline);
    let seps: Vec<_> = items.iter().map(|i| i.separator).collect();
    assert_eq!(
        seps,
        vec![
            Some(PrintSeparator::Semicolon),
            Some(PrintSeparator::Comma),
            Some(PrintSeparator::Semicolon),
        ]
    );

    let StmtKind::Print { items, newline } = first("? 1").kind else {
        panic!("expected PRINT");
    };
    assert!(newline);
    assert_eq!(items.len(), 1);

    assert!(matches!(first("PRINT").kind, StmtKind::Print { ref items, newline: true } if items.is_empty()));
}

#[test]
fn test_parse_input_with_prompt() {
    let StmtKind::Input { prompt, targets } = first("INPUT \"Name\"; n$, age").kind else {
        panic!("expected INPUT");
    };
    assert_eq!(prompt.as_deref(), Some("Name"));
    assert_eq!(targets.len(), 2);
}

#[test]
fn test_parse_single_line_if_else() {
    let StmtKind::If {
        branches,
        else_branch,
        block_form,
    } = first("IF a THEN PRINT 1: PRINT 2 ELSE PRINT 3").kind
    else {
        panic!("expected IF");
    };
    assert!(!block_form);
    assert_eq!(branches[0].body.len(), 2);
    assert_eq!(else_branch.map(|b| b.len()), Some(1));
}

#[test]
fn test_parse_dangling_else_binds_inner_if() {
    let StmtKind::If {
        branches,
        else_branch,
        ..
    } = first("IF a THEN IF b THEN PRINT 1 ELSE PRINT 2").kind
    else {
        panic!("expected IF");
    };
    assert!(else_branch.is_none());
    assert!(matches!(
        &branches[0].body[0].kind,
        StmtKind::If { else_branch: Some(_), .. }
    ));
}

#[test]
fn test_parse_block_if_chain() {
    let source = "IF a THEN\n  PRINT 1\nELSEIF b THEN\n  PRINT 2\nELSE\n  PRINT 3\nEND IF";
    let StmtKind::If {
        branches,
        else_branch,
        block_form,
    } = first(source).kind
    else {
        panic!("expected IF");
    };
    assert!(block_form);
    assert_eq!(branches.len(), 2);
    assert!(else_branch.is_some());
}

#[test]
fn test_parse_block_if_requires_end_if() {
    assert!(parse_error("IF a THEN\nPRINT 1\n").contains("expected END IF"));
}

#[test]
fn test_parse_for_next_on_one_line() {
    let program = parse_ok("FOR I = 1 TO 3: PRINT I: NEXT I");
    assert_eq!(program.statements.len(), 3);
    assert!(matches!(program.statements[0].kind, StmtKind::For { step: None, .. }));
    assert!(matches!(&program.statements[2].kind, StmtKind::Next { var: Some(v) } if v == "I"));
}

#[test]
fn test_parse_for_inside_single_line_if() {
    let StmtKind::If { branches, .. } = first("IF c THEN FOR j = 1 TO 2: PRINT j: NEXT j").kind else {
        panic!("expected IF");
    };
    assert_eq!(branches[0].body.len(), 3);
    assert!(matches!(&branches[0].body[2].kind, StmtKind::Next { var: Some(v) } if v == "j"));
}

#[test]
fn test_parse_next_after_single_line_if_closes_outer_for() {
    let program = parse_ok("FOR I = 1 TO 3: IF I = 2 THEN PRINT I: NEXT I");
    assert_eq!(program.statements.len(), 3);
    let StmtKind::If { branches, .. } = &program.statements[1].kind else {
        panic!("expected IF");
    };
    assert_eq!(branches[0].body.len(), 1);
    assert!(matches!(program.statements[2].kind, StmtKind::Next { .. }));
}

#[test]
fn test_parse_while_forms() {
    assert!(matches!(first("WHILE a\nPRINT 1\nWEND").kind, StmtKind::While { .. }));
    assert!(matches!(first("WHILE a\nPRINT 1\nEND WHILE").kind, StmtKind::While { .. }));
}

#[test]
fn test_parse_do_loop_conditions() {
    let StmtKind::DoLoop { pre, post, .. } = first("DO\nx = x + 1\nLOOP UNTIL x > 3").kind else {
        panic!("expected DO");
    };
    assert!(pre.is_none());
    assert!(post.is_some_and(|c| c.until));

    let StmtKind::DoLoop { pre, post, .. } = first("DO WHILE x < 3\nx = x + 1\nLOOP").kind else {
        panic!("expected DO");
    };
    assert!(pre.is_some_and(|c| !c.until));
    assert!(post.is_none());

    assert!(parse_fails("DO WHILE a\nLOOP UNTIL b"));
}

#[test]
fn test_parse_try_on_one_line() {
    let StmtKind::Try { body, catch, finally } =
        first(r#"TRY: ERROR "boom" CATCH e: PRINT e.message END TRY"#).kind
    else {
        panic!("expected TRY");
    };
    assert_eq!(body.len(), 1);
    let catch = catch.unwrap();
    assert_eq!(catch.var.as_deref(), Some("e"));
    assert_eq!(catch.body.len(), 1);
    assert!(finally.is_none());
}

#[test]
fn test_parse_try_finally_without_catch() {
    let StmtKind::Try { catch, finally, .. } = first("TRY\nPRINT 1\nFINALLY\nPRINT 2\nEND TRY").kind else {
        panic!("expected TRY");
    };
    assert!(catch.is_none());
    assert_eq!(finally.map(|f| f.len()), Some(1));
}

#[test]
fn test_parse_error_statement_with_code() {
    assert!(matches!(
        first(r#"ERROR "bad", "E42""#).kind,
        StmtKind::Raise { code: Some(_), .. }
    ));
}

#[test]
fn test_parse_defer_forms() {
    let StmtKind::Defer { body } = first("DEFER PRINT 1").kind else {
        panic!("expected DEFER");
    };
    assert_eq!(body.len(), 1);

    let StmtKind::Defer { body } = first("DEFER\nPRINT 1\nPRINT 2\nEND DEFER").kind else {
        panic!("expected DEFER");
    };
    assert_eq!(body.len(), 2);
}

#[test]
fn test_parse_function_params() {
    let source = "FUNCTION F(REF a AS NUMBER, b$ = \"x\", rest...)\nRETURN a\nEND FUNCTION";
    let StmtKind::Function(decl) = first(source).kind else {
        panic!("expected FUNCTION");
    };
    assert!(!decl.is_sub);
    assert_eq!(decl.params.len(), 3);
    assert!(decl.params[0].by_ref);
    assert_eq!(decl.params[0].effective_type(), TypeAnnotation::Number);
    assert_eq!(decl.params[1].effective_type(), TypeAnnotation::String);
    assert!(decl.params[1].default.is_some());
    assert!(decl.params[2].variadic);
    assert_eq!(decl.params[2].effective_type(), TypeAnnotation::Array);
}

#[test]
fn test_parse_sub_on_one_line() {
    let StmtKind::Function(decl) = first("SUB Inc(REF x AS NUMBER): x = x + 1: END SUB").kind else {
        panic!("expected SUB");
    };
    assert!(decl.is_sub);
    assert_eq!(decl.body.len(), 1);
}

#[test]
fn test_parse_variadic_must_be_last() {
    assert!(parse_error("SUB S(a..., b)\nEND SUB").contains("variadic"));
}

#[test]
fn test_parse_property_declaration() {
    let source = "PROPERTY Vector.Size(self AS Vector) AS NUMBER GET\nRETURN 1\nEND PROPERTY";
    let StmtKind::Property(decl) = first(source).kind else {
        panic!("expected PROPERTY");
    };
    assert_eq!(decl.type_name, "Vector");
    assert_eq!(decl.name, "Size");
    assert_eq!(decl.accessor, Accessor::Get);
    assert_eq!(decl.return_type, Some(TypeAnnotation::Number));

    let source = "PROPERTY Vector.Size(self AS Vector, v AS NUMBER) SET\nEND PROPERTY";
    let StmtKind::Property(decl) = first(source).kind else {
        panic!("expected PROPERTY");
    };
    assert_eq!(decl.accessor, Accessor::Set);
}

#[test]
fn test_parse_property_self_type_checked() {
    assert!(parse_fails("PROPERTY Vector.Size(self AS Point) GET\nEND PROPERTY"));
    assert!(parse_fails("PROPERTY Vector.Size(self AS Vector) SET\nEND PROPERTY"));
}

#[test]
fn test_parse_type_with_spread() {
    let source = "TYPE Vector SPREAD(x, y)\n  x AS NUMBER\n  y AS NUMBER\n  label$\nEND TYPE";
    let StmtKind::TypeDecl(decl) = first(source).kind else {
        panic!("expected TYPE");
    };
    assert_eq!(decl.name, "Vector");
    assert_eq!(decl.fields.len(), 3);
    assert_eq!(decl.fields[2].ty, TypeAnnotation::String);
    assert_eq!(decl.spread, Some(vec!["x".to_string(), "y".to_string()]));
}

#[test]
fn test_parse_type_rejects_bad_fields() {
    assert!(parse_error("TYPE P\nx\nx\nEND TYPE").contains("duplicate field"));
    assert!(parse_error("TYPE P SPREAD(z)\nx\nEND TYPE").contains("unknown field"));
}

#[test]
fn test_parse_with_block() {
    let StmtKind::With { body, .. } = first("WITH p\n.x = 1\nPRINT .y\nEND WITH").kind else {
        panic!("expected WITH");
    };
    assert!(matches!(
        &body[0].kind,
        StmtKind::Assign { target, .. } if matches!(target.kind, ExprKind::WithField(_))
    ));
}

#[test]
fn test_parse_select_case() {
    let source = "SELECT CASE x\nCASE 1, 2\nPRINT \"low\"\nCASE 3 TO 5\nCASE IS > 9\nCASE ELSE\nPRINT \"other\"\nEND SELECT";
    let StmtKind::Select { cases, else_body, .. } = first(source).kind else {
        panic!("expected SELECT");
    };
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[0].tests.len(), 2);
    assert!(matches!(cases[1].tests[0], CaseTest::Range(..)));
    assert!(matches!(cases[2].tests[0], CaseTest::Is(BinaryOp::Gt, _)));
    assert_eq!(else_body.map(|b| b.len()), Some(1));
}

#[test]
fn test_parse_case_after_case_else_fails() {
    assert!(parse_error("SELECT CASE x\nCASE ELSE\nCASE 1\nEND SELECT").contains("CASE after CASE ELSE"));
}

#[test]
fn test_parse_exit_and_continue() {
    assert_eq!(first("EXIT FOR").kind, StmtKind::Exit(ExitKind::Loop(LoopKind::For)));
    assert_eq!(first("EXIT SUB").kind, StmtKind::Exit(ExitKind::Sub));
    assert_eq!(first("CONTINUE").kind, StmtKind::Continue(None));
    assert_eq!(first("CONTINUE DO").kind, StmtKind::Continue(Some(LoopKind::Do)));
    assert!(parse_fails("EXIT PRINT"));
}

#[test]
fn test_parse_dim_spawn_return_call() {
    assert!(matches!(first("DIM a(10)").kind, StmtKind::Dim { size: Some(_), .. }));
    assert!(matches!(
        first("DIM v AS Vector").kind,
        StmtKind::Dim { ty: Some(TypeAnnotation::Named(_)), .. }
    ));
    assert!(matches!(first("SPAWN worker").kind, StmtKind::Spawn { ref name } if name == "worker"));
    assert!(matches!(first("RETURN").kind, StmtKind::Return(None)));
    assert!(matches!(first("CALL Setup").kind, StmtKind::Call(_)));
    assert!(matches!(first("Setup").kind, StmtKind::Call(_)));
    assert!(matches!(first("obj.Draw").kind, StmtKind::Call(_)));
}

#[test]
fn test_parse_end_and_stop() {
    let program = parse_ok("PRINT 1\nEND\nSTOP");
    assert_eq!(program.statements[1].kind, StmtKind::End);
    assert_eq!(program.statements[2].kind, StmtKind::Stop);
}

#[test]
fn test_parse_line_numbers_and_labels() {
    let program = parse_ok("10 PRINT \"X\"\nstart: PRINT 1\n20\nPRINT 2");
    assert_eq!(program.statements[0].line_number, Some(10));
    assert_eq!(program.statements[1].label.as_deref(), Some("start"));
    assert_eq!(program.statements.len(), 3);
}

#[test]
fn test_parse_statement_ids_are_unique() {
    let program = parse_ok("FOR I = 1 TO 2\nIF I THEN PRINT I\nNEXT");
    let mut ids = Vec::new();
    fn collect(stmts: &[Stmt], ids: &mut Vec<u32>) {
        for stmt in stmts {
            ids.push(stmt.id.0);
            if let StmtKind::If { branches, .. } = &stmt.kind {
                for b in branches {
                    collect(&b.body, ids);
                }
            }
        }
    }
    collect(&program.statements, &mut ids);
    let count = ids.len();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), count);
}

// ============================================
// Errors
// ============================================

#[test]
fn test_parse_unexpected_block_close() {
    assert!(parse_error("PRINT 1\nEND IF").contains("unexpected END IF"));
    assert!(parse_error("WEND").contains("unexpected WEND"));
}

#[test]
fn test_parse_requires_statement_separator() {
    assert!(parse_error("PRINT 1 PRINT 2").contains("expected end of statement"));
}

#[test]
fn test_parse_expression_statement_rejected() {
    assert!(parse_fails("1 + 2"));
    assert!(parse_error("x + 1").contains("expected"));
}

#[test]
fn test_parse_error_position() {
    let err = parse_source("PRINT 1\nIF x PRINT 2").unwrap_err();
    assert_eq!(err.position().map(|p| p.line), Some(2));
    assert!(err.message().contains("expected THEN"));
}
