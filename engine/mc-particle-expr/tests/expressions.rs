use glam::{DVec3, IVec3};
use mc_particle_expr::{
    CompileError, CompiledExpr, EntityView, Env, EvalError, Scope, Value, ValueKind,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use test_case::test_case;

fn eval_with(source: &str, scope: &Scope, values: &[Value], seed: u64) -> Result<f64, EvalError> {
    let plan = CompiledExpr::compile(source, scope).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    plan.evaluate(&mut Env::new(values, &mut rng))
}

fn eval_const(source: &str) -> f64 {
    eval_with(source, &Scope::new(), &[], 0).unwrap()
}

/// Scope of the block `animateTick` hook
fn animate_tick_scope() -> Scope {
    Scope::new()
        .with_slot(ValueKind::BlockState)
        .with_slot(ValueKind::Level)
        .with_slot(ValueKind::BlockPos)
        .with_slot(ValueKind::Random)
        .with_alias("this", 2)
}

fn animate_tick_values(pos: IVec3) -> [Value; 4] {
    [
        Value::BlockState,
        Value::Level,
        Value::BlockPos(pos),
        Value::Random,
    ]
}

#[test_case("1 + 2 * 3", 7.0 ; "precedence")]
#[test_case("(1 + 2) * 3", 9.0 ; "parentheses")]
#[test_case("10 % 4", 2.0 ; "remainder")]
#[test_case("-2 * -3", 6.0 ; "unary minus")]
#[test_case("true ? 1 : 2", 1.0 ; "ternary")]
#[test_case("1 < 2 && 3 >= 3", 1.0 ; "comparison yields one")]
#[test_case("2 == 3 || !(1 != 1)", 1.0 ; "boolean operators")]
#[test_case("Math.sin(0)", 0.0 ; "math namespace")]
#[test_case("Mth.cos(0)", 1.0 ; "mth namespace")]
#[test_case("abs(-3) + floor(2.7)", 5.0 ; "abs and floor")]
#[test_case("pow(2, 10) - sqrt(16)", 1020.0 ; "pow and sqrt")]
#[test_case("2.5f * 2", 5.0 ; "float suffix")]
#[test_case("1.f + 2.F", 3.0 ; "suffix after bare dot")]
#[test_case("1.0E-1 * 10", 1.0 ; "exponent")]
#[test_case("3 / 2 * 2", 2.0 ; "integer division truncates")]
#[test_case("floorMod(-1, 16)", 15.0 ; "floor mod")]
fn test_constant_formulas(source: &str, expected: f64) {
    assert!((eval_const(source) - expected).abs() < 1e-12, "{source}");
}

#[test]
fn test_math_pi() {
    assert!((eval_const("Math.PI * 2") - std::f64::consts::TAU).abs() < 1e-12);
}

#[test_case("exec(1)", 0 ; "unknown function")]
#[test_case("1 + foo", 4 ; "unknown identifier")]
#[test_case("$5 + 1", 0 ; "slot out of range")]
#[test_case("1 +", 3 ; "truncated input")]
#[test_case("sin(1, 2)", 0 ; "wrong arity")]
#[test_case("true + 1", 0 ; "boolean arithmetic")]
#[test_case("1 = 2", 2 ; "single equals")]
#[test_case("random() ? 1 : 2", 0 ; "numeric condition")]
#[test_case("System.exit(0)", 0 ; "arbitrary receiver")]
fn test_compile_errors_carry_offset(source: &str, offset: usize) {
    let err = CompiledExpr::compile(source, &Scope::new()).unwrap_err();
    assert_eq!(err.offset(), offset, "{source}: {err}");
}

#[test]
fn test_unknown_accessor_names_token() {
    let err = CompiledExpr::compile("$2.getLevel()", &animate_tick_scope()).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnknownAccessor {
            token: "getLevel".to_string(),
            offset: 3,
            kind: ValueKind::BlockPos,
        }
    );
}

#[test]
fn test_non_scalar_result_is_rejected() {
    let err = CompiledExpr::compile("$2", &animate_tick_scope()).unwrap_err();
    assert!(matches!(err, CompileError::TypeMismatch { found: ValueKind::BlockPos, .. }));
}

#[test]
fn test_opaque_kinds_have_no_accessors() {
    assert!(CompiledExpr::compile("$0.getValue()", &animate_tick_scope()).is_err());
    assert!(CompiledExpr::compile("$1.getGameTime()", &animate_tick_scope()).is_err());
}

#[test]
fn test_block_pos_accessors() {
    let scope = animate_tick_scope();
    let values = animate_tick_values(IVec3::new(1, 64, -3));

    assert_eq!(eval_with("$2.getX() + $2.getY()", &scope, &values, 0), Ok(65.0));
    assert_eq!(eval_with("this.getZ()", &scope, &values, 0), Ok(-3.0));
    assert_eq!(eval_with("$2.getCenter().y", &scope, &values, 0), Ok(64.5));
    assert_eq!(eval_with("$2.getX() / 2", &scope, &values, 0), Ok(0.0));
}

#[test]
fn test_candle_offset_formula() {
    let scope = animate_tick_scope();
    let values = animate_tick_values(IVec3::new(10, 0, 0));
    for seed in 0..32 {
        let x = eval_with(
            "$2.getX() + 0.5 + 0.25 * ($3.nextInt(2) * 2 - 1)",
            &scope,
            &values,
            seed,
        )
        .unwrap();
        assert!(x == 10.25 || x == 10.75, "{x}");
    }
}

#[test]
fn test_direction_and_entity_accessors() {
    let scope = Scope::new()
        .with_slot(ValueKind::Entity)
        .with_slot(ValueKind::Direction)
        .with_slot(ValueKind::Random);
    let entity = EntityView {
        position: DVec3::new(1.0, 2.0, 3.0),
        velocity: DVec3::new(0.0, -0.5, 0.0),
        width: 0.6,
        height: 1.8,
    };
    let values = [Value::Entity(entity), Value::Direction(IVec3::Y), Value::Random];

    assert_eq!(eval_with("$1.getStepY()", &scope, &values, 0), Ok(1.0));
    assert_eq!(eval_with("$0.getBbHeight()", &scope, &values, 0), Ok(1.8));
    assert_eq!(eval_with("$0.getDeltaMovement().y", &scope, &values, 0), Ok(-0.5));
    assert_eq!(eval_with("$0.position().z", &scope, &values, 0), Ok(3.0));

    for seed in 0..16 {
        let x = eval_with("$0.getRandomX(1.0)", &scope, &values, seed).unwrap();
        assert!((0.4..=1.6).contains(&x), "{x}");
        let y = eval_with("$0.getRandomY()", &scope, &values, seed).unwrap();
        assert!((2.0..=3.8).contains(&y), "{y}");
    }
}

#[test]
fn test_random_spellings_draw_identically() {
    let scope = Scope::new().with_slot(ValueKind::Random);
    let values = [Value::Random];
    let expected = eval_with("Math.random()", &scope, &values, 42).unwrap();

    for source in ["random()", "this.Math.random()", "$0.nextDouble()", "$0.nextFloat()"] {
        assert_eq!(eval_with(source, &scope, &values, 42), Ok(expected), "{source}");
    }
    assert!((0.0..1.0).contains(&expected));
}

#[test]
fn test_random_usage_is_tracked() {
    let scope = animate_tick_scope();
    assert!(CompiledExpr::compile("$3.nextGaussian()", &scope).unwrap().uses_random());
    assert!(CompiledExpr::compile("randomInt(4)", &scope).unwrap().uses_random());
    assert!(!CompiledExpr::compile("$2.getY() + 1", &scope).unwrap().uses_random());
}

#[test]
fn test_result_kinds() {
    let scope = animate_tick_scope();
    let kind = |s: &str| CompiledExpr::compile(s, &scope).unwrap().result_kind();
    assert_eq!(kind("$2.getX() + 1"), ValueKind::Int);
    assert_eq!(kind("$2.getX() + 0.5"), ValueKind::Double);
    assert_eq!(kind("$3.nextBoolean()"), ValueKind::Bool);
    assert_eq!(kind("(int) 2.5"), ValueKind::Int);
}

#[test]
fn test_bad_random_bound() {
    let scope = Scope::new().with_slot(ValueKind::Random);
    assert_eq!(
        eval_with("$0.nextInt(0)", &scope, &[Value::Random], 0),
        Err(EvalError::InvalidArgument {
            function: "randomInt",
            value: 0,
        })
    );
    assert!(eval_with("randomInt(-3)", &scope, &[Value::Random], 0).is_err());
}

#[test]
fn test_environment_must_match_scope() {
    let scope = animate_tick_scope();
    assert_eq!(
        eval_with("$2.getY()", &scope, &[Value::Random], 0),
        Err(EvalError::ArityMismatch {
            expected: 4,
            found: 1,
        })
    );

    let values = [Value::BlockState, Value::Level, Value::Double(1.0), Value::Random];
    assert_eq!(
        eval_with("$2.getY()", &scope, &values, 0),
        Err(EvalError::BindingMismatch {
            slot: 2,
            expected: ValueKind::BlockPos,
            found: ValueKind::Double,
        })
    );
}

#[test]
fn test_named_scope_variables() {
    let scope = Scope::new()
        .with_named("age", ValueKind::Double)
        .with_named("lifetime", ValueKind::Double);
    let values = [Value::Double(5.0), Value::Double(20.0)];
    assert_eq!(eval_with("age / lifetime", &scope, &values, 0), Ok(0.25));

    let plan = CompiledExpr::compile("random() > age / lifetime", &scope).unwrap();
    assert_eq!(plan.result_kind(), ValueKind::Bool);
}

#[test]
fn test_nesting_limit() {
    let nested = |depth: usize| format!("{}1{}", "(".repeat(depth), ")".repeat(depth));
    assert_eq!(eval_const(&nested(40)), 1.0);

    let err = CompiledExpr::compile(&nested(100), &Scope::new()).unwrap_err();
    assert!(matches!(err, CompileError::TooDeep { limit: 128, .. }), "{err}");
    assert_eq!(err.offset(), 64);
    assert_eq!(err.token(), "(");

    let err = CompiledExpr::compile(&format!("{}true", "!".repeat(200)), &Scope::new()).unwrap_err();
    assert!(matches!(err, CompileError::TooDeep { offset: 127, .. }), "{err}");

    let err = CompiledExpr::compile(
        &format!("{}1 : 2", "true ? ".repeat(200)),
        &Scope::new(),
    )
    .unwrap_err();
    assert!(matches!(err, CompileError::TooDeep { .. }), "{err}");
}

#[test]
fn test_length_limit() {
    let chain = format!("1{}", " + 1".repeat(300));
    assert_eq!(eval_const(&chain), 301.0);

    let err = CompiledExpr::compile(&format!("1{}", " + 1".repeat(2000)), &Scope::new()).unwrap_err();
    assert!(matches!(err, CompileError::TooLong { limit: 1024, .. }), "{err}");

    let deep = format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000));
    assert!(matches!(
        CompiledExpr::compile(&deep, &Scope::new()),
        Err(CompileError::TooLong { .. })
    ));
}

proptest! {
    #[test]
    fn prop_compile_is_idempotent(a in -1000i64..1000, b in 1i64..1000, seed in any::<u64>()) {
        let source = format!("{a} / {b} + random() * {b} - $0.nextInt({b})");
        let scope = Scope::new().with_slot(ValueKind::Random);
        let first = CompiledExpr::compile(&source, &scope).unwrap();
        let second = CompiledExpr::compile(&source, &scope).unwrap();
        prop_assert_eq!(&first, &second);

        let mut rng_a = StdRng::seed_from_u64(seed);
        let mut rng_b = StdRng::seed_from_u64(seed);
        let x = first.evaluate(&mut Env::new(&[Value::Random], &mut rng_a)).unwrap();
        let y = second.evaluate(&mut Env::new(&[Value::Random], &mut rng_b)).unwrap();
        prop_assert_eq!(x, y);
    }

    #[test]
    fn prop_repeated_evaluation_is_stable(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6) {
        let scope = Scope::new().with_slot(ValueKind::Vec3);
        let plan = CompiledExpr::compile("$0.x * 0.5 + sign($0.y) * min($0.x, $0.y)", &scope).unwrap();
        let values = [Value::Vec3(DVec3::new(x, y, 0.0))];
        let mut rng = StdRng::seed_from_u64(0);
        let first = plan.evaluate(&mut Env::new(&values, &mut rng)).unwrap();
        for _ in 0..4 {
            prop_assert_eq!(plan.evaluate(&mut Env::new(&values, &mut rng)).unwrap(), first);
        }
    }

    #[test]
    fn prop_integer_division_truncates_toward_zero(a in -10_000i64..10_000, b in 1i64..100) {
        let value = eval_const(&format!("{a} / {b}"));
        prop_assert_eq!(value, (a / b) as f64);
    }
}
