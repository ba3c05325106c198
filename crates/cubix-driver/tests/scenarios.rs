use cubix_core::{DefId, Definition, Sort, Status};
use cubix_driver::{Driver, DriverOptions};
use cubix_syntax::{ConcreteDef, Decl, Pattern, Program, Term, build::*};
use proptest::prelude::*;

struct Nat {
    nat: DefId,
    zero: DefId,
    suc: DefId,
}

fn nat(program: &mut Program) -> Nat {
    let nat = program.fresh();
    let zero = program.fresh();
    let suc = program.fresh();
    program.add(data(
        nat,
        "Nat",
        vec![],
        None,
        vec![
            constructor(zero, "zero", vec![]),
            constructor(suc, "suc", vec![param("n", global(nat))]),
        ],
    ));
    Nat { nat, zero, suc }
}

fn list(program: &mut Program) -> DefId {
    let list = program.fresh();
    let nil = program.fresh();
    let cons = program.fresh();
    program.add(data(
        list,
        "List",
        vec![param("A", set(0))],
        None,
        vec![
            constructor(nil, "nil", vec![]),
            constructor(
                cons,
                "cons",
                vec![
                    param("x", local("A")),
                    param("xs", app(global(list), [local("A")])),
                ],
            ),
        ],
    ));
    list
}

fn truncated(mut def: ConcreteDef) -> ConcreteDef {
    if let Decl::Data(decl) = &mut def.decl {
        decl.truncated = true;
    }
    def
}

#[test]
fn naturals_are_accepted() {
    let mut program = Program::new();
    let Nat { nat, zero, suc } = nat(&mut program);
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[nat]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(nat), Some(Status::NoErrors));
    assert_eq!(driver.state().status(zero), Some(Status::NoErrors));
    assert_eq!(driver.state().status(suc), Some(Status::NoErrors));
    let Some(Definition::Data(def)) = driver.state().get(nat) else {
        panic!("Nat is not recorded");
    };
    assert!(def.sort.is_some_and(|sort| sort.leq(Sort::SET0)));
}

#[test]
fn self_reference_with_a_result_type_is_accepted() {
    let mut program = Program::new();
    let Nat { nat, .. } = nat(&mut program);
    let f = program.fresh();
    program.add(function(f, "f", vec![], Some(global(nat)), term_body(global(f))));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[f]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(f), Some(Status::NoErrors));
}

#[test]
fn self_reference_without_a_result_type_is_rejected() {
    let mut program = Program::new();
    let g = program.fresh();
    program.add(function(g, "g", vec![], None, term_body(global(g))));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[g]);

    assert_eq!(output.status(g), Some(Status::HeaderHasErrors));
    let errors: Vec<_> = output.report.with_code("header").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "Cannot infer the result type of a recursive function"
    );
}

#[test]
fn negative_data_types_are_rejected() {
    let mut program = Program::new();
    let Nat { nat, .. } = nat(&mut program);
    let bad = program.fresh();
    let mk = program.fresh();
    program.add(data(
        bad,
        "Bad",
        vec![],
        None,
        vec![constructor(mk, "mk", vec![param("f", arrow(global(bad), global(nat)))])],
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[bad]);

    assert_eq!(output.status(bad), Some(Status::BodyHasErrors));
    let errors: Vec<_> = output.report.with_code("positivity").collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("`mk`"));
}

#[test]
fn recursion_in_the_codomain_is_positive() {
    let mut program = Program::new();
    let d = program.fresh();
    let c = program.fresh();
    program.add(data(
        d,
        "D",
        vec![param("A", set(0))],
        None,
        vec![constructor(
            c,
            "c",
            vec![param("f", arrow(local("A"), app(global(d), [local("A")])))],
        )],
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[d]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(d), Some(Status::NoErrors));
}

#[test]
fn recursion_through_covariant_parameters_is_positive() {
    let mut program = Program::new();
    let list = list(&mut program);
    let rose = program.fresh();
    let node = program.fresh();
    program.add(data(
        rose,
        "Rose",
        vec![param("A", set(0))],
        None,
        vec![constructor(
            node,
            "node",
            vec![
                param("label", local("A")),
                param(
                    "children",
                    app(global(list), [app(global(rose), [local("A")])]),
                ),
            ],
        )],
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[rose]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(rose), Some(Status::NoErrors));
    assert_eq!(driver.state().status(list), Some(Status::NoErrors));
}

#[test]
fn conflicting_implementations_name_both_sources() {
    let mut program = Program::new();
    let base = program.fresh();
    let f = program.fresh();
    let a = program.fresh();
    let b = program.fresh();
    let c = program.fresh();
    program.add(class(base, "Base", vec![], vec![field(f, "f", Term::Interval)], vec![]));
    program.add(class(a, "A", vec![base], vec![], vec![implement(f, Term::Left)]));
    program.add(class(b, "B", vec![base], vec![], vec![implement(f, Term::Right)]));
    program.add(class(c, "C", vec![a, b], vec![], vec![]));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[c]);

    assert_eq!(output.status(c), Some(Status::BodyHasErrors));
    assert_eq!(driver.state().status(a), Some(Status::NoErrors));
    let errors: Vec<_> = output.report.with_code("field").collect();
    assert_eq!(errors.len(), 1);
    let trace: Vec<&str> = errors[0].trace.iter().map(|(msg, _)| msg.as_str()).collect();
    assert_eq!(trace, vec!["implemented in `A`", "implemented in `B`"]);
}

/// `Pointed` has a carrier `E` and a point `pt : E this`, with `E` as coercing field.
fn pointed(program: &mut Program) -> (DefId, DefId, DefId) {
    let pointed = program.fresh();
    let carrier = program.fresh();
    let point = program.fresh();
    let mut def = class(
        pointed,
        "Pointed",
        vec![],
        vec![
            field(carrier, "E", set(0)),
            field(point, "pt", app(global(carrier), [local("this")])),
        ],
        vec![],
    );
    if let Decl::Class(decl) = &mut def.decl {
        decl.coercing_field = Some(carrier);
    }
    program.add(def);
    (pointed, carrier, point)
}

#[test]
fn classes_may_refer_to_their_own_fields() {
    let mut program = Program::new();
    let (pointed, carrier, point) = pointed(&mut program);
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[pointed]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(pointed), Some(Status::NoErrors));
    assert_eq!(driver.state().status(carrier), Some(Status::NoErrors));
    assert_eq!(driver.state().status(point), Some(Status::NoErrors));
    let Some(Definition::Class(def)) = driver.state().get(pointed) else {
        panic!("Pointed is not recorded");
    };
    assert_eq!(def.coercing_field, Some(carrier));
}

#[test]
fn instances_elaborate_their_class_first() {
    let mut program = Program::new();
    let (pointed, carrier, point) = pointed(&mut program);
    let inst = program.fresh();
    program.add(instance(
        inst,
        "interval-pointed",
        vec![],
        pointed,
        vec![implement(carrier, Term::Interval), implement(point, Term::Left)],
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[inst]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(inst), Some(Status::NoErrors));
    assert_eq!(driver.state().status(pointed), Some(Status::NoErrors));
}

#[test]
fn one_field_renamed_twice_is_ambiguous() {
    let mut program = Program::new();
    let magma = program.fresh();
    let op = program.fresh();
    let monoid = program.fresh();
    let unit = program.fresh();
    let add_magma = program.fresh();
    let plus = program.fresh();
    let mul_monoid = program.fresh();
    let times = program.fresh();
    program.add(class(magma, "Magma", vec![], vec![field(op, "op", Term::Interval)], vec![]));
    program.add(class(monoid, "Monoid", vec![magma], vec![field(unit, "unit", Term::Interval)], vec![]));
    program.add(synonym(add_magma, "AddMagma", magma, vec![], vec![field_synonym(plus, "+", op)]));
    program.add(synonym(
        mul_monoid,
        "MulMonoid",
        monoid,
        vec![add_magma],
        vec![field_synonym(times, "*", op)],
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[mul_monoid]);

    assert_eq!(output.status(mul_monoid), Some(Status::BodyHasErrors));
    assert_eq!(driver.state().status(add_magma), Some(Status::NoErrors));
    assert_eq!(driver.state().status(monoid), Some(Status::NoErrors));
    let errors: Vec<_> = output.report.with_code("field").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Field `op` is overridden by several synonyms: *, +");
}

#[test]
fn interval_elims_must_cover_both_endpoints() {
    let mut program = Program::new();
    let f = program.fresh();
    program.add(function(
        f,
        "f",
        vec![param("i", Term::Interval)],
        Some(Term::Interval),
        elim_body(&["i"], vec![clause(vec![Pattern::Left], Term::Left)]),
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[f]);

    assert_eq!(output.status(f), Some(Status::BodyHasErrors));
    let errors: Vec<_> = output.report.with_code("body").collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Pattern matching is not exhaustive, missing: right");
}

#[test]
fn header_cycles_elaborate_none_of_their_members() {
    let mut program = Program::new();
    let f = program.fresh();
    let g = program.fresh();
    program.add(function(f, "f", vec![], Some(global(g)), term_body(Term::Interval)));
    program.add(function(g, "g", vec![], Some(global(f)), term_body(Term::Interval)));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[f]);

    assert_eq!(driver.elaborated(), 0);
    assert_eq!(output.status(f), Some(Status::HeaderHasErrors));
    assert_eq!(driver.state().status(g), Some(Status::HeaderHasErrors));
    assert_eq!(output.report.with_code("header").count(), 2);
}

#[test]
fn cycles_through_bodies_are_accepted() {
    let mut program = Program::new();
    let Nat { nat, zero, suc } = nat(&mut program);
    let even = program.fresh();
    let odd = program.fresh();
    program.add(function(even, "even", vec![], Some(global(nat)), term_body(global(odd))));
    program.add(function(
        odd,
        "odd",
        vec![],
        Some(global(nat)),
        term_body(app(global(suc), [global(even)])),
    ));
    let mut driver = Driver::default();
    let output = driver.typecheck(&program, &[even, zero]);

    assert!(output.report.is_empty(), "{:?}", output.report.diagnostics);
    assert_eq!(output.status(even), Some(Status::NoErrors));
    assert_eq!(driver.state().status(odd), Some(Status::NoErrors));
    assert_eq!(output.status(zero), Some(Status::NoErrors));
}

#[test]
fn typechecked_definitions_are_not_elaborated_again() {
    let mut program = Program::new();
    let Nat { nat, .. } = nat(&mut program);
    let mut driver = Driver::default();

    let first = driver.typecheck(&program, &[nat]);
    let elaborated = driver.elaborated();
    let before = driver.state().get(nat).cloned();
    let second = driver.typecheck(&program, &[nat]);

    assert_eq!(elaborated, 1);
    assert_eq!(driver.elaborated(), elaborated);
    assert_eq!(driver.state().get(nat).cloned(), before);
    assert_eq!(first.statuses, second.statuses);
    assert!(second.report.is_empty());
}

#[test]
fn reset_definitions_are_elaborated_again() {
    let mut program = Program::new();
    let f = program.fresh();
    program.add(function(f, "f", vec![], Some(Term::Interval), term_body(Term::Left)));
    let mut driver = Driver::default();

    driver.typecheck(&program, &[f]);
    driver.state_mut().reset(f);
    let output = driver.typecheck(&program, &[f]);

    assert_eq!(driver.elaborated(), 2);
    assert_eq!(output.status(f), Some(Status::NoErrors));
}

#[test]
fn later_failures_leave_earlier_statuses_alone() {
    let mut program = Program::new();
    let Nat { nat, .. } = nat(&mut program);
    let good = program.fresh();
    let bad = program.fresh();
    program.add(function(good, "good", vec![], Some(global(nat)), term_body(global(good))));
    program.add(function(bad, "bad", vec![], Some(global(nat)), term_body(Term::Left)));
    let mut driver = Driver::default();

    driver.typecheck(&program, &[good]);
    let output = driver.typecheck(&program, &[bad]);

    assert_eq!(output.status(bad), Some(Status::BodyHasErrors));
    assert_eq!(driver.state().status(good), Some(Status::NoErrors));
    assert_eq!(driver.state().status(nat), Some(Status::NoErrors));
}

#[test]
fn stops_after_a_failed_root_when_asked() {
    let mut program = Program::new();
    let bad = program.fresh();
    let good = program.fresh();
    program.add(function(bad, "bad", vec![], None, term_body(global(bad))));
    program.add(function(good, "good", vec![], Some(Term::Interval), term_body(Term::Left)));
    let mut driver = Driver::new(DriverOptions {
        continue_on_error: false,
        ..DriverOptions::default()
    });
    let output = driver.typecheck(&program, &[bad, good]);

    assert_eq!(output.status(bad), Some(Status::HeaderHasErrors));
    assert_eq!(output.status(good), None);
}

#[test]
fn errors_beyond_the_limit_are_dropped() {
    let mut program = Program::new();
    let roots: Vec<DefId> = (0..3)
        .map(|i| {
            let id = program.fresh();
            program.add(function(id, &format!("bad{i}"), vec![], None, term_body(global(id))));
            id
        })
        .collect();
    let mut driver = Driver::new(DriverOptions {
        error_limit: Some(2),
        ..DriverOptions::default()
    });
    let output = driver.typecheck(&program, &roots);

    assert_eq!(output.report.error_count(), 2);
    assert_eq!(output.statuses.len(), 3);
}

#[test]
fn warnings_can_be_promoted_or_dropped() {
    let mut program = Program::new();
    let unit = program.fresh();
    let tt = program.fresh();
    program.add(truncated(data(unit, "Unit", vec![], None, vec![constructor(tt, "tt", vec![])])));

    let output = Driver::default().typecheck(&program, &[unit]);
    assert_eq!(output.report.warnings().count(), 1);

    let output = Driver::new(DriverOptions {
        warnings_as_errors: true,
        ..DriverOptions::default()
    })
    .typecheck(&program, &[unit]);
    assert_eq!(output.report.warnings().count(), 0);
    assert_eq!(output.report.error_count(), 1);

    let output = Driver::new(DriverOptions {
        warnings: false,
        ..DriverOptions::default()
    })
    .typecheck(&program, &[unit]);
    assert!(output.report.is_empty());
}

#[test]
fn statuses_serialize_like_they_display() {
    let mut program = Program::new();
    let Nat { nat, .. } = nat(&mut program);
    let g = program.fresh();
    program.add(function(g, "g", vec![], None, term_body(global(g))));
    let output = Driver::default().typecheck(&program, &[nat, g]);

    let statuses: Vec<Status> = output.statuses.values().copied().collect();
    let json = serde_json::to_string(&statuses).unwrap();
    assert_eq!(json, r#"["no-errors","header-has-errors"]"#);
    let back: Vec<Status> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, statuses);
}

/// Function `i` refers to `header[i]` in its result type and to `body[i]` in its body.
fn graph(n: usize) -> impl Strategy<Value = (Vec<Option<usize>>, Vec<Option<usize>>)> {
    (
        prop::collection::vec(prop::option::weighted(0.3, 0..n), n),
        prop::collection::vec(prop::option::weighted(0.6, 0..n), n),
    )
}

fn on_header_cycle(header: &[Option<usize>], start: usize) -> bool {
    let mut current = header[start];
    for _ in 0..header.len() {
        match current {
            Some(next) if next == start => return true,
            Some(next) => current = header[next],
            None => return false,
        }
    }
    false
}

proptest! {
    #[test]
    fn every_definition_reaches_a_terminal_status(
        (header, body) in (1usize..6).prop_flat_map(graph)
    ) {
        let mut program = Program::new();
        let ids: Vec<DefId> = header.iter().map(|_| program.fresh()).collect();
        for (i, id) in ids.iter().enumerate() {
            let result_type = header[i].map_or(Term::Interval, |j| global(ids[j]));
            let body = body[i].map_or(Term::Left, |j| global(ids[j]));
            program.add(function(*id, &format!("f{i}"), vec![], Some(result_type), term_body(body)));
        }
        let mut driver = Driver::default();
        let output = driver.typecheck(&program, &ids);

        for (i, id) in ids.iter().enumerate() {
            let status = output.status(*id);
            prop_assert!(status.is_some_and(|status| status.is_terminal()), "f{i} is {status:?}");
            if on_header_cycle(&header, i) {
                prop_assert_eq!(status, Some(Status::HeaderHasErrors));
            }
        }
    }
}
