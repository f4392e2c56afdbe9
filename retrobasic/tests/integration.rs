//! Integration tests for retrobasic
//!
//! Whole programs through the public API:
//! - scanning and parsing
//! - execution and the execution result
//! - error codes and positions
//! - host environment extension

use retrobasic::interp::{
    ExecOptions, HaltReason, HostEntry, HostEnvironment, Interpreter, NativeNamespace, RuntimeError, ScriptedInput,
    Value, execute, execute_with_host,
};
use retrobasic::parser::parse_source;
use retrobasic::{Error, execute_source};

/// Run a program and return its printed lines
fn run(source: &str) -> Vec<String> {
    match execute_source(source, ExecOptions::default()) {
        Ok(result) => result.outputs,
        Err(err) => panic!("program failed: {err}\n{source}"),
    }
}

/// Run a program that must fail at runtime
fn runtime_error(source: &str) -> RuntimeError {
    let program = parse_source(source).expect("program should parse");
    execute(&program, ExecOptions::default()).expect_err("program should fail")
}

fn parse_error(source: &str) -> Error {
    parse_source(source).expect_err("program should not parse")
}

// ============================================
// End-to-end examples
// ============================================

#[test]
fn test_for_next_on_one_line() {
    assert_eq!(run("FOR I = 1 TO 3: PRINT I: NEXT I"), vec!["1", "2", "3"]);
}

#[test]
fn test_try_catch_on_one_line() {
    assert_eq!(run("TRY: ERROR \"boom\" CATCH e: PRINT e.message END TRY"), vec!["boom"]);
}

#[test]
fn test_ref_increment() {
    let program = parse_source("SUB Inc(REF x AS NUMBER): x = x + 1: END SUB\nLET n = 5: CALL Inc(n)").unwrap();
    let result = execute(&program, ExecOptions::default()).unwrap();
    assert_eq!(result.variables.get("n"), Some(&Value::Number(6.0)));
}

#[test]
fn test_vector_length_and_spread() {
    let source = r#"
TYPE Vector SPREAD(x, y)
  x AS NUMBER
  y AS NUMBER
END TYPE

FUNCTION Length(self AS Vector) AS NUMBER
  RETURN SQR(self.x ^ 2 + self.y ^ 2)
END FUNCTION

FUNCTION Join4$(a, b, c, d)
  RETURN a & "," & b & "," & c & "," & d
END FUNCTION

LET a = Vector{x: 3, y: 4}
LET b = Vector{y: 2, x: 1}
PRINT a.Length()
PRINT Join4$(a..., b...)
PRINT Join4$(a.x, a.y, b.x, b.y)
"#;
    assert_eq!(run(source), vec!["5", "3,4,1,2", "3,4,1,2"]);
}

#[test]
fn test_nested_defer_stacks() {
    let source = r#"
SUB Inner()
  DEFER PRINT "inner cleanup"
  PRINT "inner body"
END SUB

SUB Outer()
  DEFER PRINT "outer cleanup"
  CALL Inner()
  PRINT "outer body"
END SUB

CALL Outer()
"#;
    assert_eq!(run(source), vec!["inner body", "inner cleanup", "outer body", "outer cleanup"]);
}

#[test]
fn test_defer_runs_once_per_exit_path() {
    let source = r#"
FUNCTION Pick(mode)
  DEFER PRINT "a"
  DEFER PRINT "b"
  IF mode = 1 THEN RETURN 10
  IF mode = 2 THEN ERROR "fail", "E2"
  RETURN 30
END FUNCTION

PRINT Pick(1)
TRY
  PRINT Pick(2)
CATCH e
  PRINT e.code
END TRY
PRINT Pick(3)
"#;
    assert_eq!(run(source), vec!["b", "a", "10", "b", "a", "E2", "b", "a", "30"]);
}

#[test]
fn test_global_defers_drain_at_end() {
    let source = "DEFER PRINT \"last\"\nDEFER\nPRINT \"second\"\nEND DEFER\nPRINT \"first\"";
    assert_eq!(run(source), vec!["first", "second", "last"]);
}

#[test]
fn test_reexecution_is_deterministic() {
    let source = r#"
TYPE P
  n AS NUMBER
END TYPE
FUNCTION Double(p AS P)
  RETURN p.n * 2
END FUNCTION
total = 0
FOR i = 1 TO 4
  total = total + Double(P{n: i})
NEXT
PRINT total
"#;
    let program = parse_source(source).unwrap();
    let first = execute(&program, ExecOptions::default()).unwrap();
    let second = execute(&program, ExecOptions::default()).unwrap();
    assert_eq!(first.outputs, vec!["20"]);
    assert_eq!(first.outputs, second.outputs);

    let json = serde_json::to_string(&program).unwrap();
    let reparsed: retrobasic::Program = serde_json::from_str(&json).unwrap();
    let third = execute(&reparsed, ExecOptions::default()).unwrap();
    assert_eq!(first.outputs, third.outputs);
}

// ============================================
// Overloads and UFCS
// ============================================

#[test]
fn test_overloads_by_parameter_type() {
    let source = r#"
TYPE Circle
  r AS NUMBER
END TYPE
TYPE Square
  side AS NUMBER
END TYPE
FUNCTION Area(c AS Circle)
  RETURN 3 * c.r * c.r
END FUNCTION
FUNCTION Area(s AS Square)
  RETURN s.side * s.side
END FUNCTION
PRINT Circle{r: 2}.Area()
PRINT Area(Square{side: 3})
"#;
    assert_eq!(run(source), vec!["12", "9"]);
}

#[test]
fn test_ambiguity_names_both_candidates() {
    let source = r#"
FUNCTION Describe(n AS NUMBER)
  RETURN "number"
END FUNCTION
FUNCTION Describe(x AS ANY)
  RETURN "anything"
END FUNCTION
x = 1
PRINT x.Describe()
"#;
    let err = runtime_error(source);
    assert_eq!(err.code(), "AMBIGUOUS_METHOD");
    assert!(err.message.contains("Describe(NUMBER)"));
    assert!(err.message.contains("Describe(ANY)"));
    assert_eq!(err.position.line, 9);
}

#[test]
fn test_bound_method_value() {
    let source = r#"
FUNCTION Add(a AS NUMBER, b AS NUMBER)
  RETURN a + b
END FUNCTION
n = 40
f = n.Add
PRINT f(2)
"#;
    assert_eq!(run(source), vec!["42"]);
}

#[test]
fn test_builtin_probe_and_chaining() {
    assert_eq!(run("PRINT \"  hi  \".trim().upper().len()"), vec!["2"]);
    assert_eq!(run("parts = \"a,b,c\".split(\",\")\nPRINT parts.reverse().join(\"-\")"), vec!["c-b-a"]);
}

#[test]
fn test_unknown_method_suggestion() {
    let err = runtime_error("TYPE T\nvalue AS NUMBER\nEND TYPE\nt = NEW T\nPRINT t.valeu");
    assert_eq!(err.code(), "UNKNOWN_METHOD");
    assert!(err.message.contains("did you mean 'value'"));
}

// ============================================
// Statements
// ============================================

#[test]
fn test_if_forms() {
    let source = r#"
x = 7
IF x > 5 THEN PRINT "big" ELSE PRINT "small"
IF x < 0 THEN
  PRINT "negative"
ELSEIF x MOD 2 = 1 THEN
  PRINT "odd"
ELSE
  PRINT "even"
END IF
"#;
    assert_eq!(run(source), vec!["big", "odd"]);
}

#[test]
fn test_select_case() {
    let source = r#"
FOR n = 1 TO 6
  SELECT CASE n
    CASE 1, 2
      PRINT "low"
    CASE 3 TO 4
      PRINT "mid"
    CASE IS > 5
      PRINT "high"
    CASE ELSE
      PRINT "other"
  END SELECT
NEXT n
SELECT CASE "Hello"
  CASE "HELLO"
    PRINT "matched case-insensitively"
END SELECT
"#;
    assert_eq!(
        run(source),
        vec!["low", "low", "mid", "mid", "other", "high", "matched case-insensitively"]
    );
}

#[test]
fn test_with_block() {
    let source = r#"
TYPE Point
  x AS NUMBER
  y AS NUMBER
END TYPE
p = NEW Point(1, 2)
WITH p
  .x = .x + 10
  PRINT .x; ","; .y
END WITH
PRINT p.x
"#;
    assert_eq!(run(source), vec!["11,2", "11"]);
}

#[test]
fn test_finally_always_runs() {
    let source = r#"
FUNCTION Guarded()
  TRY
    RETURN 1
  FINALLY
    PRINT "finally"
  END TRY
  RETURN 2
END FUNCTION
PRINT Guarded()
"#;
    assert_eq!(run(source), vec!["finally", "1"]);
}

#[test]
fn test_uncaught_error_rethrown_after_finally() {
    let source = "TRY\nx = 1 / 0\nFINALLY\nPRINT \"cleanup\"\nEND TRY";
    let program = parse_source(source).unwrap();
    let mut interpreter = Interpreter::new(HostEnvironment::with_stdlib(), ExecOptions::default());
    let err = interpreter.run(&program).unwrap_err();
    assert_eq!(err.code(), "DIVISION_BY_ZERO");
    assert_eq!(interpreter.outputs(), ["cleanup"]);
}

#[test]
fn test_loops() {
    let source = r#"
i = 0
WHILE i < 3
  i = i + 1
WEND
PRINT i
DO
  i = i - 1
LOOP UNTIL i = 0
PRINT i
DO WHILE i < 10
  i = i + 4
  IF i > 6 THEN EXIT DO
LOOP
PRINT i
FOR k = 10 TO 1 STEP -3
  PRINT k;
  PRINT " ";
NEXT
PRINT
"#;
    assert_eq!(run(source), vec!["3", "0", "8", "10 7 4 1 "]);
}

#[test]
fn test_end_and_stop_halt() {
    let program = parse_source("PRINT 1\nEND\nPRINT 2").unwrap();
    let result = execute(&program, ExecOptions::default()).unwrap();
    assert_eq!(result.outputs, vec!["1"]);
    assert_eq!(result.halt_reason, Some(HaltReason::End));

    let program = parse_source("SUB Halt()\nSTOP\nEND SUB\nCALL Halt()\nPRINT \"unreached\"").unwrap();
    let result = execute(&program, ExecOptions::default()).unwrap();
    assert!(result.outputs.is_empty());
    assert_eq!(result.halt_reason, Some(HaltReason::Stop));

    let source = "FUNCTION Quit()\nEND\nEND FUNCTION\nPRINT \"x\"; Quit()";
    let result = execute_source(source, ExecOptions::default()).unwrap();
    assert!(result.outputs.is_empty());
    assert_eq!(result.halt_reason, Some(HaltReason::End));
}

#[test]
fn test_spawn_bookkeeping() {
    assert_eq!(
        run("SPAWN Ticker\nSPAWN ticker"),
        vec!["Spawned routine Ticker", "Routine ticker already running"]
    );
}

#[test]
fn test_input_from_scripted_source() {
    let mut host = HostEnvironment::with_stdlib();
    host.set_input(ScriptedInput::new(["Ada", "36"]));
    let program = parse_source("INPUT \"Name\"; name$\nINPUT age\nPRINT name$; \" is \"; age + 1").unwrap();
    let result = execute_with_host(&program, host, ExecOptions::default()).unwrap();
    assert_eq!(result.outputs, vec!["Ada is 37"]);
}

#[test]
fn test_line_numbers_and_labels_are_cosmetic() {
    assert_eq!(run("10 PRINT \"A\"\nstart: PRINT \"B\"\n20\n30 PRINT \"C\""), vec!["A", "B", "C"]);
}

#[test]
fn test_comments() {
    assert_eq!(run("REM heading\nPRINT 1 ' trailing\n' whole line"), vec!["1"]);
}

// ============================================
// Host environment
// ============================================

#[test]
fn test_custom_host_namespace() {
    fn shout(args: &[Value]) -> retrobasic::interp::HostResult {
        match args {
            [Value::Str(s)] => Ok(Value::Str(format!("{}!", s.to_uppercase()))),
            _ => Err("SHOUT expects one string".to_string()),
        }
    }
    let mut host = HostEnvironment::with_stdlib();
    host.register_namespace(NativeNamespace::new("LOUD").with_function("SHOUT", shout));
    let program = parse_source("PRINT LOUD.Shout(\"hey\")\nPRINT loud.shout(1)").unwrap();
    let mut interpreter = Interpreter::new(host, ExecOptions::default());
    let err = interpreter.run(&program).unwrap_err();
    assert_eq!(interpreter.outputs(), ["HEY!"]);
    assert_eq!(err.code(), "HOST_ERROR");
    assert_eq!(err.position.line, 2);
}

#[test]
fn test_host_entries_as_values() {
    let host = HostEnvironment::with_stdlib();
    assert!(matches!(host.get("math"), Some(HostEntry::Namespace(_))));
    let program = parse_source("m = MATH\nPRINT m.MAX(2, 8)\nf = MATH.MIN\nPRINT f(2, 8)").unwrap();
    let result = execute_with_host(&program, host, ExecOptions::default()).unwrap();
    assert_eq!(result.outputs, vec!["8", "2"]);
}

// ============================================
// Errors and budgets
// ============================================

#[test]
fn test_runtime_error_position() {
    let err = runtime_error("x = 1\ny = 2\nPRINT x + missing");
    assert_eq!(err.code(), "UNKNOWN_IDENTIFIER");
    assert_eq!(err.position.line, 3);
    assert!(err.position.column > 0);
}

#[test]
fn test_error_record_fields() {
    let source = "TRY\n  PRINT [1, 2][5]\nCATCH e\n  PRINT e.code; \" \"; e.line\nEND TRY";
    assert_eq!(run(source), vec!["INDEX_OUT_OF_RANGE 2"]);
}

#[test]
fn test_oversized_allocations_are_catchable() {
    let source = r#"TRY
  PRINT STR.REPEAT("ab", 1e19)
CATCH e
  PRINT e.code
END TRY
TRY
  DIM A(1e19)
CATCH e
  PRINT e.code
END TRY
PRINT "still running""#;
    assert_eq!(run(source), vec!["HOST_ERROR", "INDEX_OUT_OF_RANGE", "still running"]);
}

#[test]
fn test_step_budget_not_catchable() {
    let program = parse_source("TRY\nWHILE 1\nWEND\nCATCH e\nPRINT \"caught\"\nEND TRY").unwrap();
    let options = ExecOptions {
        max_steps: Some(100),
        ..ExecOptions::default()
    };
    let err = execute(&program, options).unwrap_err();
    assert_eq!(err.code(), "STEP_BUDGET");
}

#[test]
fn test_call_depth_budget_option() {
    let program = parse_source("FUNCTION F(n)\nRETURN F(n + 1)\nEND FUNCTION\nPRINT F(0)").unwrap();
    let options = ExecOptions {
        max_call_depth: 10,
        ..ExecOptions::default()
    };
    let err = execute(&program, options).unwrap_err();
    assert_eq!(err.code(), "CALL_DEPTH");
}

#[test]
fn test_scanner_errors() {
    assert!(matches!(parse_error("PRINT \"open"), Error::Lexer { .. }));
    assert!(matches!(parse_error("PRINT 1e"), Error::Lexer { .. }));
}

#[test]
fn test_parse_errors() {
    let err = parse_error("FOR i = 1 TO 3\nPRINT i");
    assert!(err.message().contains("without NEXT"));
    let err = parse_error("FOR i = 1 TO 3 STEP 0\nNEXT");
    assert!(err.message().contains("STEP 0"));
    let err = parse_error("NEXT j");
    assert!(err.message().contains("without FOR"));
    let err = parse_error("IF x THEN\nPRINT 1");
    assert_eq!(err.position().map(|p| p.line), Some(2));
}

#[test]
fn test_state_persists_across_runs() {
    let mut interpreter = Interpreter::new(HostEnvironment::with_stdlib(), ExecOptions::default());
    interpreter
        .run(&parse_source("FUNCTION Sq(n)\nRETURN n * n\nEND FUNCTION\nbase = 3").unwrap())
        .unwrap();
    let result = interpreter.run(&parse_source("PRINT Sq(base)").unwrap()).unwrap();
    assert_eq!(result.outputs, vec!["9"]);
}
