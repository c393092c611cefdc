use lbvm::vm::StackKind;
use lbvm::{Error, Limits, Machine, Program, RuntimeError, Value};

fn run(source: &str) -> Result<Value, Error> {
    let program = Program::assemble_str(source)?;
    Ok(program.run()?)
}

fn runtime_error(source: &str) -> RuntimeError {
    match run(source) {
        Err(Error::Runtime(e)) => e,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

const FACTORIAL: &str = "\
FUNCTION fac n
FUNCTION ifac acc i &closingover ifac
PUSHINT 0
PUSHVAR i
NUMEQUAL
BFALSE else
PUSHVAR acc
RET
else:
PUSHVAR ifac
PUSHVAR acc
PUSHVAR i
MUL
PUSHVAR i
PUSHINT 1
SUB
TAILCALL 2
ENDFUNCTION
PUSHVAR ifac
PUSHINT 1
PUSHVAR n
TAILCALL 2
ENDFUNCTION
PUSHVAR fac
PUSHINT 5
CALL 1
END
";

const NON_TAIL_FACTORIAL: &str = "\
FUNCTION fac n
PUSHINT 0
PUSHVAR n
NUMEQUAL
BFALSE recurse
PUSHINT 1
RET
recurse:
PUSHVAR n
PUSHVAR fac
PUSHVAR n
PUSHINT 1
SUB
CALL 1
MUL
RET
ENDFUNCTION
PUSHVAR fac
PUSHINT COUNT
CALL 1
END
";

// --- End to end ---

#[test]
fn factorial_of_five() {
    assert_eq!(run(FACTORIAL).unwrap(), Value::Int(120));
}

#[test]
fn tail_calls_run_in_constant_space() {
    let source = FACTORIAL.replace("PUSHINT 5", "PUSHINT 100000");
    // 100000! has far more than 32 factors of two, so the wrapped product is 0
    assert_eq!(run(&source).unwrap(), Value::Int(0));
}

#[test]
fn tail_calls_fit_a_tiny_call_stack() {
    let program = Program::assemble_str(&FACTORIAL.replace("PUSHINT 5", "PUSHINT 10")).unwrap();
    let result = Machine::new(&program).with_limits(Limits::with_call_depth(2)).run();
    assert_eq!(result.unwrap(), Value::Int(3628800));
}

#[test]
fn non_tail_recursion_works_when_shallow() {
    assert_eq!(run(&NON_TAIL_FACTORIAL.replace("COUNT", "10")).unwrap(), Value::Int(3628800));
}

#[test]
fn non_tail_recursion_overflows_the_call_stack() {
    let e = runtime_error(&NON_TAIL_FACTORIAL.replace("COUNT", "100000"));
    assert!(
        matches!(e, RuntimeError::StackOverflow { stack: StackKind::Call | StackKind::Environment }),
        "got {e:?}"
    );
}

// --- Closures ---

#[test]
fn closures_share_captured_variables() {
    let source = "\
FUNCTION counter start
FUNCTION get &closingover start
PUSHVAR start
RET
ENDFUNCTION
FUNCTION bump &closingover start
PUSHVAR start
PUSHINT 1
ADD
SET start
PUSHTRUE
RET
ENDFUNCTION
PUSHVAR get
PUSHVAR bump
MAKEPAIR
RET
ENDFUNCTION
PUSHVAR counter
PUSHINT 10
CALL 1
DEFINE p
PUSHVAR p
PAIR2
CALL 0
POP
PUSHVAR p
PAIR2
CALL 0
POP
PUSHVAR p
PAIR1
CALL 0
END
";
    assert_eq!(run(source).unwrap(), Value::Int(12));
}

#[test]
fn rest_parameters_collect_extra_arguments() {
    let source = "\
FUNCTION tail a &rest more
PUSHVAR more
RET
ENDFUNCTION
PUSHVAR tail
PUSHINT 1
PUSHINT 2
PUSHINT 3
CALL 3
END
";
    let result = run(source).unwrap();
    assert_eq!(result, Value::list([Value::Int(2), Value::Int(3)]));
    assert_eq!(format!("{result:?}"), "(2 3)");

    let empty = run(&source.replace("PUSHINT 2\nPUSHINT 3\nCALL 3", "CALL 1")).unwrap();
    assert_eq!(empty, Value::Nil);
}

#[test]
fn rest_parameters_with_captured_variables() {
    let source = "\
FUNCTION outer base
FUNCTION add-all first &rest others &closingover base
PUSHVAR base
PUSHVAR first
ADD
PUSHVAR others
PAIR1
ADD
RET
ENDFUNCTION
PUSHVAR add-all
RET
ENDFUNCTION
PUSHVAR outer
PUSHINT 100
CALL 1
PUSHINT 20
PUSHINT 3
CALL 2
END
";
    assert_eq!(run(source).unwrap(), Value::Int(123));
}

#[test]
fn empty_rest_keeps_captured_variables() {
    let source = "\
FUNCTION outer base scale
FUNCTION add-all first &rest others &closingover base scale
PUSHVAR first
PUSHVAR scale
MUL
PUSHVAR base
ADD
PUSHVAR others
MAKEPAIR
RET
ENDFUNCTION
PUSHVAR add-all
RET
ENDFUNCTION
PUSHVAR outer
PUSHINT 100
PUSHINT 3
CALL 2
PUSHINT 20
CALL 1
END
";
    let result = run(source).unwrap();
    assert_eq!(result, Value::cons(Value::Int(160), Value::Nil));
}

#[test]
fn too_few_arguments_for_rest_function() {
    let source = "\
FUNCTION f a b &rest r
PUSHVAR a
RET
ENDFUNCTION
PUSHVAR f
PUSHINT 1
CALL 1
END
";
    let e = runtime_error(source);
    assert!(matches!(e, RuntimeError::TooFewArguments { minimum: 2, actual: 1, .. }), "got {e:?}");
}

#[test]
fn local_defines_start_unassigned() {
    let body = "\
FUNCTION f &localdefines tmp
PUSHINT 5
SET tmp
PUSHVAR tmp
RET
ENDFUNCTION
PUSHVAR f
CALL 0
END
";
    assert_eq!(run(body).unwrap(), Value::Int(5));

    let e = runtime_error(&body.replace("PUSHINT 5\nSET tmp\n", ""));
    assert!(matches!(e, RuntimeError::UnassignedVariable { ref name } if name == "tmp"), "got {e:?}");
}

// --- Runtime errors ---

#[test]
fn two_values_before_end_is_unbalanced() {
    let mut code = vec![0x02];
    code.extend_from_slice(&1i32.to_le_bytes());
    code.push(0x02);
    code.extend_from_slice(&2i32.to_le_bytes());
    code.push(0x00);
    let program = Program::new(code, Vec::new()).unwrap();
    let e = program.run().unwrap_err();
    assert!(matches!(e, RuntimeError::UnbalancedExit { .. }), "got {e:?}");
}

#[test]
fn jump_into_an_operand_is_rejected() {
    let mut code = vec![0x10];
    code.extend_from_slice(&1u32.to_le_bytes());
    code.push(0x00);
    let program = Program::new(code, Vec::new()).unwrap();
    assert!(matches!(program.run(), Err(RuntimeError::InvalidPosition { ip: 1 })));
}

#[test]
fn wrong_arity_is_reported_with_function_name() {
    let source = "\
FUNCTION pair-up a b
PUSHVAR a
RET
ENDFUNCTION
PUSHVAR pair-up
PUSHINT 1
CALL 1
END
";
    let e = runtime_error(source);
    assert!(
        matches!(e, RuntimeError::ArityMismatch { ref function, expected: 2, actual: 1 } if function == "pair-up"),
        "got {e:?}"
    );
}

#[test]
fn unbound_variable() {
    let e = runtime_error("PUSHVAR nope\nEND");
    assert!(matches!(e, RuntimeError::UnboundVariable { ref name } if name == "nope"));
}

#[test]
fn calling_a_number_is_an_error() {
    let e = runtime_error("PUSHINT 3\nCALL 0\nEND");
    assert!(matches!(e, RuntimeError::InvalidCallTarget { found: "int" }), "got {e:?}");
}

#[test]
fn integer_division_by_zero() {
    assert!(matches!(runtime_error("PUSHINT 1\nPUSHINT 0\nIDIV\nEND"), RuntimeError::DivisionByZero));
}

#[test]
fn string_arithmetic_is_a_type_mismatch() {
    let e = runtime_error("PUSHSTR \"a\"\nPUSHINT 1\nADD\nEND");
    assert!(matches!(e, RuntimeError::TypeMismatch { .. }), "got {e:?}");
}

#[test]
fn ret_without_call_underflows() {
    let e = runtime_error("PUSHINT 1\nRET\nEND");
    assert!(matches!(e, RuntimeError::StackUnderflow { .. }), "got {e:?}");
}

// --- Values ---

#[test]
fn arithmetic_coercion() {
    assert_eq!(run("PUSHINT 3\nPUSHINT 4\nADD\nEND").unwrap(), Value::Int(7));
    assert_eq!(run("PUSHDBL 3.0\nPUSHINT 4\nADD\nEND").unwrap(), Value::Float(7.0));
    assert_eq!(run("PUSHINT 6\nPUSHINT 3\nDIV\nEND").unwrap(), Value::Int(2));
    assert_eq!(run("PUSHINT 7\nPUSHINT 2\nDIV\nEND").unwrap(), Value::Float(3.5));
    assert_eq!(run("PUSHINT 2\nPUSHDBL 2.5\nNUMLT\nEND").unwrap(), Value::Bool(true));
}

#[test]
fn strings_and_symbols() {
    let len = run("PUSHSTR \"Hello\"\nPUSHSTR \", world\"\nSTRAPPEND\nSTRLEN\nEND").unwrap();
    assert_eq!(len, Value::Int(12));

    let same = run("PUSHSTR \"abc\"\nSTRTOSYM\nPUSHSYM abc\nOBJEQUAL\nEND").unwrap();
    assert_eq!(same, Value::Bool(true));

    let binary = run("PUSHINT -5\nPUSHINT 2\nNUMTOSTR\nEND").unwrap();
    assert!(matches!(binary, Value::Str(_)));
    assert_eq!(binary.to_string(), "-101");
}

#[test]
fn print_goes_to_the_output_sink() {
    let program = Program::assemble_str(
        "PUSHSTR \"answer: \"\nPRINT\nPOP\nPUSHINT 42\nPRINT\nEND",
    )
    .unwrap();
    let mut out = String::new();
    let result = Machine::new(&program).with_output(&mut out).run().unwrap();
    assert_eq!(result, Value::Int(42));
    assert_eq!(out, "answer: 42");
}

#[test]
fn host_defined_globals() {
    let program = Program::assemble_str("PUSHVAR x\nPUSHINT 1\nADD\nEND").unwrap();
    let mut machine = Machine::new(&program);
    machine.define_global("x", Value::Int(41));
    assert_eq!(machine.run().unwrap(), Value::Int(42));
}

#[test]
fn program_run_with_globals() {
    let program = Program::assemble_str("PUSHVAR width\nPUSHVAR height\nMUL\nEND").unwrap();
    let area = program.run_with([("width", Value::Int(6)), ("height", Value::Int(7))]).unwrap();
    assert_eq!(area, Value::Int(42));

    let e = program.run().unwrap_err();
    assert!(matches!(e, RuntimeError::UnboundVariable { ref name } if name == "width"), "got {e:?}");
}

#[test]
fn seeded_random_is_deterministic() {
    let program = Program::assemble_str("PUSHINT 1000\nRANDOM\nEND").unwrap();
    let a = Machine::new(&program).with_seed(7).run().unwrap();
    let b = Machine::new(&program).with_seed(7).run().unwrap();
    assert_eq!(a, b);
    let Value::Int(n) = a else { panic!("RANDOM returned {a:?}") };
    assert!((0..1000).contains(&n));
}

// --- Container ---

#[test]
fn container_round_trip_runs_identically() {
    let program = Program::assemble_str(FACTORIAL).unwrap();
    let bytes = program.to_bytes().unwrap();
    let loaded = Program::read_from(bytes.as_slice()).unwrap();
    assert_eq!(loaded.code(), program.code());
    assert_eq!(loaded.symbols(), program.symbols());
    assert_eq!(loaded.run().unwrap(), program.run().unwrap());
}

#[test]
fn corrupted_container_is_rejected() {
    let mut bytes = Program::assemble_str(FACTORIAL).unwrap().to_bytes().unwrap();
    // header (8) + code block type and length (5) puts the code at 13
    bytes[14] ^= 0x10;
    assert!(matches!(Program::read_from(bytes.as_slice()), Err(Error::Format(_))));
}

// --- Assembly errors ---

#[test]
fn assembler_rejects_extra_operands() {
    let e = Program::assemble_str("ADD extra-operand\nEND").unwrap_err();
    assert!(matches!(e, Error::Assembly(_)), "got {e:?}");
    assert_eq!(e.code(), Some("LBVM-A002"));
}

#[test]
fn assembler_rejects_undeclared_labels() {
    let e = Program::assemble_str("JMP foo\nEND").unwrap_err();
    assert_eq!(e.code(), Some("LBVM-A005"));
}
