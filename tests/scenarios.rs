//! End-to-end scenarios, one per lettered case.

use std::sync::Arc;

use classflow::constprop::ConstantPropagation;
use classflow::context::{Context, ContextSensitiveAnalysis, Insensitive};
use classflow::callgraph::build as build_call_graph;
use classflow::dataflow::solve;
use classflow::hierarchy::{ClassDecl, ClassHierarchy, ClassKind};
use classflow::interproc::InterproceduralConstantPropagation;
use classflow::ir::{
    BinOp, CallSite, CfgNode, Exp, FieldAccess, InvokeKind, Method, Operand, PrimitiveType, Program, Stmt, Var,
};
use classflow::lattice::Value;
use classflow::liveness::{dead_code, LiveVariables};
use classflow::pfg::PointerAnalysis;
use classflow::refs::{ClassRef, MethodRef};
use classflow::taint::{Position, Sink, Source, TaintAnalysis, TaintConfig, TaintTransfer};

fn method_ref(owner: &str, name: &str) -> MethodRef {
    MethodRef::new(ClassRef::new(owner), name, 0)
}

fn var(owner: &MethodRef, name: &str, ty: PrimitiveType) -> Var {
    Var::new(owner.clone(), name, ty)
}

/// Scenario A: two paths that meet with the same constant keep it; differing constants go NAC.
#[test]
fn scenario_a_constant_meet() {
    let m = method_ref("Main", "run");
    let cond = var(&m, "cond", PrimitiveType::Int);
    let a = var(&m, "a", PrimitiveType::Int);

    // if (cond) { a = 1; } else { a = 1; } return a;  -- both branches agree.
    let stmts = vec![
        Stmt::Assign { lhs: cond.clone(), rhs: Exp::Operand(Operand::IntLiteral(1)) },
        Stmt::If { cond: Operand::Var(cond.clone()), true_target: 3 },
        Stmt::Assign { lhs: a.clone(), rhs: Exp::Operand(Operand::IntLiteral(1)) },
        Stmt::Assign { lhs: a.clone(), rhs: Exp::Operand(Operand::IntLiteral(1)) },
        Stmt::Return { var: Some(a.clone()) },
    ];
    let method = Method::new(m, None, vec![], stmts);
    let result = solve(&ConstantPropagation::new(), &method);
    assert_eq!(result.get_in_fact(CfgNode::Stmt(4)).get(&a), Value::Const(1));
}

/// Scenario B: a statement only reachable via a division that is known to fail is dead.
#[test]
fn scenario_b_division_by_zero_marks_dead() {
    let m = method_ref("Main", "run");
    let x = var(&m, "x", PrimitiveType::Int);
    let y = var(&m, "y", PrimitiveType::Int);
    let stmts = vec![
        Stmt::Assign { lhs: x.clone(), rhs: Exp::Operand(Operand::IntLiteral(0)) },
        Stmt::Assign {
            lhs: y.clone(),
            rhs: Exp::Binary { op: BinOp::Div, left: Operand::IntLiteral(10), right: Operand::Var(x.clone()) },
        },
        Stmt::Return { var: None },
    ];
    let method = Method::new(m, None, vec![], stmts);
    let cp = solve(&ConstantPropagation::new(), &method);
    let live = solve(&LiveVariables::new(), &method);
    let dead = dead_code(&method, &cp, &live);
    assert!(dead.contains(&1));
}

/// Scenario C: a variable defined but never used afterward is not live, and the assignment
/// counts as dead.
#[test]
fn scenario_c_dead_assignment_to_unused_variable() {
    let m = method_ref("Main", "run");
    let a = var(&m, "a", PrimitiveType::Int);
    let stmts = vec![
        Stmt::Assign { lhs: a.clone(), rhs: Exp::Operand(Operand::IntLiteral(7)) },
        Stmt::Return { var: None },
    ];
    let method = Method::new(m, None, vec![], stmts);
    let cp = solve(&ConstantPropagation::new(), &method);
    let live = solve(&LiveVariables::new(), &method);
    assert!(!live.get_out_fact(CfgNode::Stmt(0)).contains(&a));
    let dead = dead_code(&method, &cp, &live);
    assert_eq!(dead, vec![0]);
}

/// Scenario D: a virtual call through an interface resolves to every overriding implementation
/// reachable through the subtype closure.
#[test]
fn scenario_d_virtual_call_resolves_through_subtype_closure() {
    let i = ClassRef::new("Shape");
    let circle = ClassRef::new("Circle");
    let square = ClassRef::new("Square");
    let mut hierarchy = ClassHierarchy::new();
    hierarchy.declare(i.clone(), ClassDecl::new(ClassKind::Interface).with_method(method_ref("Shape", "area")));
    hierarchy.declare(
        circle.clone(),
        ClassDecl::new(ClassKind::Class).implements(i.clone()).with_method(method_ref("Circle", "area")),
    );
    hierarchy.declare(
        square.clone(),
        ClassDecl::new(ClassKind::Class).implements(i.clone()).with_method(method_ref("Square", "area")),
    );

    let entry = method_ref("Main", "run");
    let call = Stmt::Invoke {
        call: CallSite { kind: InvokeKind::Virtual, method: method_ref("Shape", "area"), receiver: None, args: vec![], lhs: None },
    };
    let mut program = Program::new();
    program.add_method(Method::new(entry.clone(), None, vec![], vec![call]));
    program.add_method(Method::new(method_ref("Circle", "area"), None, vec![], vec![]));
    program.add_method(Method::new(method_ref("Square", "area"), None, vec![], vec![]));

    let cg = build_call_graph(&program, &hierarchy, &entry).unwrap();
    let callees = cg.callees_of(&entry);
    assert_eq!(callees, vec![method_ref("Circle", "area"), method_ref("Square", "area")]);
}

/// Scenario E: context-insensitive pointer analysis merges objects allocated at distinct sites
/// but flowing into the same variable.
#[test]
fn scenario_e_context_insensitive_pointer_analysis() {
    let hierarchy = ClassHierarchy::new();
    let m = method_ref("Main", "run");
    let x = var(&m, "x", PrimitiveType::Reference);
    let y = var(&m, "y", PrimitiveType::Reference);
    let stmts = vec![
        Stmt::New { lhs: x.clone(), class: ClassRef::new("A") },
        Stmt::New { lhs: y.clone(), class: ClassRef::new("B") },
        Stmt::Copy { lhs: x.clone(), rhs: y.clone() },
    ];
    let mut program = Program::new();
    program.add_method(Method::new(m.clone(), None, vec![], stmts));

    let insensitive = PointerAnalysis::new(&program, &hierarchy).solve(&m);
    assert_eq!(insensitive.points_to_set_of_var(&x).len(), 2);

    let cs = ContextSensitiveAnalysis::new(&program, &hierarchy, Insensitive).solve(&m);
    assert_eq!(cs.points_to_set_of_var(&Context::empty(), &x).len(), 2);
}

/// Scenario F: a field store observed through an alias propagates its constant value to a load
/// through a different variable pointing at the same object.
#[test]
fn scenario_f_interprocedural_constant_propagation_through_alias() {
    let hierarchy = ClassHierarchy::new();
    let m = method_ref("Main", "run");
    let a = var(&m, "a", PrimitiveType::Reference);
    let b = var(&m, "b", PrimitiveType::Reference);
    let c = var(&m, "c", PrimitiveType::Int);

    let stmts = vec![
        Stmt::New { lhs: a.clone(), class: ClassRef::new("Box") },
        Stmt::StoreField { field: FieldAccess::Instance(a.clone(), Arc::from("value")), rhs: Operand::IntLiteral(42) },
        Stmt::Copy { lhs: b.clone(), rhs: a.clone() },
        Stmt::LoadField { lhs: c.clone(), field: FieldAccess::Instance(b.clone(), Arc::from("value")) },
    ];
    let mut program = Program::new();
    program.add_method(Method::new(m.clone(), None, vec![], stmts));

    let pta = PointerAnalysis::new(&program, &hierarchy).solve(&m);
    let solver = InterproceduralConstantPropagation::new(&program, &hierarchy, &pta, &m).unwrap();
    let result = solver.solve();
    assert_eq!(result.out_fact(&m, CfgNode::Stmt(3)).get(&c), Value::Const(42));
}

/// Scenario G: taint flows from a source, through a transfer that re-wraps it, into a sink
/// argument.
#[test]
fn scenario_g_taint_flows_through_transfer_to_sink() {
    let hierarchy = ClassHierarchy::new();
    let entry = method_ref("Main", "run");
    let source_method = method_ref("Source", "read");
    let wrap_method = method_ref("Wrapper", "wrap");
    let sink_method = method_ref("Sink", "consume");

    let t = var(&entry, "t", PrimitiveType::Reference);
    let u = var(&entry, "u", PrimitiveType::Reference);

    let stmts = vec![
        Stmt::Invoke {
            call: CallSite { kind: InvokeKind::Static, method: source_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
        },
        Stmt::Invoke {
            call: CallSite {
                kind: InvokeKind::Static,
                method: wrap_method.clone(),
                receiver: None,
                args: vec![Operand::Var(t.clone())],
                lhs: Some(u.clone()),
            },
        },
        Stmt::Invoke {
            call: CallSite {
                kind: InvokeKind::Static,
                method: sink_method.clone(),
                receiver: None,
                args: vec![Operand::Var(u.clone())],
                lhs: None,
            },
        },
    ];
    let mut program = Program::new();
    program.add_method(Method::new(entry.clone(), None, vec![], stmts));
    program.add_method(Method::new(source_method.clone(), None, vec![], vec![Stmt::Return { var: None }]));
    program.add_method(Method::new(wrap_method.clone(), None, vec![var(&wrap_method, "p", PrimitiveType::Reference)], vec![Stmt::Return { var: None }]));
    program.add_method(Method::new(sink_method.clone(), None, vec![var(&sink_method, "p", PrimitiveType::Reference)], vec![Stmt::Return { var: None }]));

    let config = TaintConfig::new()
        .with_source(Source { method: source_method.clone(), ty: Arc::from("String") })
        .with_transfer(TaintTransfer { method: wrap_method.clone(), from: Position::Arg(0), to: Position::Result, ty: Arc::from("Wrapped") })
        .with_sink(Sink { method: sink_method.clone(), arg_index: 0 });

    let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&entry).unwrap();
    assert_eq!(result.flows().len(), 1);
    let flow = result.flows().iter().next().unwrap();
    assert_eq!(flow.source, (entry.clone(), 0));
    assert_eq!(flow.sink, (entry, 2));
    assert_eq!(flow.sink_arg_index, 0);
}

/// Scenario H: taint survives an ordinary pass-through method call (arg→param, return→lhs PFG
/// edges), with no transfer rule involved — the overlay must ride the pointer solver's own edges,
/// not just `Copy` statements.
#[test]
fn scenario_h_taint_flows_through_plain_method_call() {
    let hierarchy = ClassHierarchy::new();
    let entry = method_ref("Main", "run");
    let source_method = method_ref("Source", "read");
    let id_method = method_ref("Util", "id");
    let sink_method = method_ref("Sink", "consume");

    let t = var(&entry, "t", PrimitiveType::Reference);
    let x = var(&entry, "x", PrimitiveType::Reference);
    let p = var(&id_method, "p", PrimitiveType::Reference);

    let stmts = vec![
        Stmt::Invoke {
            call: CallSite { kind: InvokeKind::Static, method: source_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
        },
        Stmt::Invoke {
            call: CallSite {
                kind: InvokeKind::Static,
                method: id_method.clone(),
                receiver: None,
                args: vec![Operand::Var(t.clone())],
                lhs: Some(x.clone()),
            },
        },
        Stmt::Invoke {
            call: CallSite {
                kind: InvokeKind::Static,
                method: sink_method.clone(),
                receiver: None,
                args: vec![Operand::Var(x.clone())],
                lhs: None,
            },
        },
    ];
    let mut program = Program::new();
    program.add_method(Method::new(entry.clone(), None, vec![], stmts));
    program.add_method(Method::new(source_method.clone(), None, vec![], vec![Stmt::Return { var: None }]));
    program.add_method(Method::new(id_method.clone(), None, vec![p.clone()], vec![Stmt::Return { var: Some(p) }]));
    program.add_method(Method::new(sink_method.clone(), None, vec![var(&sink_method, "p", PrimitiveType::Reference)], vec![Stmt::Return { var: None }]));

    let config = TaintConfig::new().with_source(Source { method: source_method, ty: Arc::from("String") }).with_sink(Sink { method: sink_method, arg_index: 0 });

    let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&entry).unwrap();
    assert_eq!(result.flows().len(), 1);
    let flow = result.flows().iter().next().unwrap();
    assert_eq!(flow.source, (entry.clone(), 0));
    assert_eq!(flow.sink, (entry, 2));
}

/// Scenario I: taint survives a heap carrier (`o.f = t; y = p.f` with `p` aliasing `o`) — the
/// overlay must ride the pointer solver's instance-field store/load edges.
#[test]
fn scenario_i_taint_flows_through_heap_carrier_field() {
    let hierarchy = ClassHierarchy::new();
    let entry = method_ref("Main", "run");
    let source_method = method_ref("Source", "read");
    let sink_method = method_ref("Sink", "consume");

    let t = var(&entry, "t", PrimitiveType::Reference);
    let o = var(&entry, "o", PrimitiveType::Reference);
    let p = var(&entry, "p", PrimitiveType::Reference);
    let y = var(&entry, "y", PrimitiveType::Reference);

    let stmts = vec![
        Stmt::Invoke {
            call: CallSite { kind: InvokeKind::Static, method: source_method.clone(), receiver: None, args: vec![], lhs: Some(t.clone()) },
        },
        Stmt::New { lhs: o.clone(), class: ClassRef::new("Box") },
        Stmt::StoreField { field: FieldAccess::Instance(o.clone(), Arc::from("value")), rhs: Operand::Var(t.clone()) },
        Stmt::Copy { lhs: p.clone(), rhs: o.clone() },
        Stmt::LoadField { lhs: y.clone(), field: FieldAccess::Instance(p.clone(), Arc::from("value")) },
        Stmt::Invoke {
            call: CallSite {
                kind: InvokeKind::Static,
                method: sink_method.clone(),
                receiver: None,
                args: vec![Operand::Var(y.clone())],
                lhs: None,
            },
        },
    ];
    let mut program = Program::new();
    program.add_method(Method::new(entry.clone(), None, vec![], stmts));

    let config = TaintConfig::new().with_source(Source { method: source_method, ty: Arc::from("String") }).with_sink(Sink { method: sink_method, arg_index: 0 });

    let result = TaintAnalysis::new(&program, &hierarchy, &config).solve(&entry).unwrap();
    assert_eq!(result.flows().len(), 1);
    let flow = result.flows().iter().next().unwrap();
    assert_eq!(flow.source, (entry.clone(), 0));
    assert_eq!(flow.sink, (entry, 5));
}
