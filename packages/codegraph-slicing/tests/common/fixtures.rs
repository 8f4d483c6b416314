//! Test programs
//!
//! Every fixture is built with `ProgramBuilder`; statements land on lines
//! 1, 2, 3... in construction order.

use codegraph_slicing::config::PipelineConfig;
use codegraph_slicing::shared::models::{
    Argument, CallSiteId, CallableId, Effects, Program, Receiver, SyntaxId, TypeId,
};
use codegraph_slicing::shared::utils::ProgramBuilder;
use codegraph_slicing::{AnalysisReport, NodeId, SlicingPipeline};

pub fn analyze(program: &Program) -> AnalysisReport {
    analyze_with(program, PipelineConfig::default())
}

pub fn analyze_with(program: &Program, config: PipelineConfig) -> AnalysisReport {
    SlicingPipeline::new(config)
        .run(program)
        .expect("pipeline should succeed on fixture")
}

/// SDG node of a source statement
pub fn node_of(report: &AnalysisReport, syntax: SyntaxId) -> NodeId {
    report
        .sdg
        .node_for_syntax(syntax)
        .unwrap_or_else(|| panic!("no node for {}", syntax))
}

pub struct Sequence {
    pub program: Program,
    pub main: CallableId,
    pub x: SyntaxId,
    pub y: SyntaxId,
}

/// `x = 1; y = x + 1`
pub fn sequence() -> Sequence {
    let mut b = ProgramBuilder::new();
    let t = b.class("Main", &[]);
    let main = b.static_method(t, "main", &[]);
    let s1 = b.assign("x = 1", "x", &[]);
    let s2 = b.assign("y = x + 1", "y", &["x"]);
    let (x, y) = (s1.id, s2.id);
    b.body(main, vec![s1, s2]);
    Sequence {
        program: b.build(),
        main,
        x,
        y,
    }
}

pub struct IfElse {
    pub program: Program,
    pub main: CallableId,
    pub cond: SyntaxId,
    pub a1: SyntaxId,
    pub a2: SyntaxId,
    pub use_a: SyntaxId,
}

/// `if (cond) { a = 1; } else { a = 2; } use(a);`
pub fn if_else() -> IfElse {
    let mut b = ProgramBuilder::new();
    let t = b.class("Main", &[]);
    let main = b.static_method(t, "main", &[]);
    let s1 = b.assign("a = 1", "a", &[]);
    let s2 = b.assign("a = 2", "a", &[]);
    let (a1, a2) = (s1.id, s2.id);
    let cond = b.if_else("if (cond)", Effects::new().uses(["cond"]), vec![s1], vec![s2]);
    let cond_id = cond.id;
    let u = b.simple("use(a)", Effects::new().uses(["a"]));
    let use_a = u.id;
    b.body(main, vec![cond, u]);
    IfElse {
        program: b.build(),
        main,
        cond: cond_id,
        a1,
        a2,
        use_a,
    }
}

pub struct Call {
    pub program: Program,
    pub main: CallableId,
    pub f: CallableId,
    pub site: CallSiteId,
    pub x: SyntaxId,
    pub r: SyntaxId,
    pub ret: SyntaxId,
}

/// `x = 1; r = f(x)` with `f(p) { return p + 1; }`
pub fn call() -> Call {
    let mut b = ProgramBuilder::new();
    let t = b.class("Main", &[]);
    let f = b.static_method(t, "f", &["p"]);
    b.returns_value(f);
    let ret = b.ret("return p + 1", Some(Effects::new().uses(["p"])));
    let ret_id = ret.id;
    b.body(f, vec![ret]);

    let main = b.static_method(t, "main", &[]);
    let s1 = b.assign("x = 1", "x", &[]);
    let site = b.call("f(x)", f, vec![Argument::var("x")]);
    let site_id = site.id;
    let s2 = b.simple("r = f(x)", Effects::new().def("r").call(site));
    let (x, r) = (s1.id, s2.id);
    b.body(main, vec![s1, s2]);
    Call {
        program: b.build(),
        main,
        f,
        site: site_id,
        x,
        r,
        ret: ret_id,
    }
}

pub struct Shapes {
    pub builder: ProgramBuilder,
    pub shape: TypeId,
    pub circle: TypeId,
    pub ring: TypeId,
    pub square: TypeId,
    pub unrelated: TypeId,
    /// Shape.area (abstract), Circle.area, Square.area
    pub areas: [CallableId; 3],
    pub client: CallableId,
}

/// Shape <- Circle <- Ring, Shape <- Square; Ring inherits Circle.area
pub fn shapes() -> Shapes {
    let mut b = ProgramBuilder::new();
    let shape = b.class("Shape", &[]);
    let circle = b.class("Circle", &[shape]);
    let ring = b.class("Ring", &[circle]);
    let square = b.class("Square", &[shape]);
    let unrelated = b.class("Report", &[]);

    let base = b.method(shape, "area", &[]);
    b.returns_value(base);
    let circle_area = b.method(circle, "area", &[]);
    b.returns_value(circle_area);
    let r1 = b.ret("return pi * r * r", Some(Effects::new().uses(["r"])));
    b.body(circle_area, vec![r1]);
    let square_area = b.method(square, "area", &[]);
    b.returns_value(square_area);
    let r2 = b.ret("return side * side", Some(Effects::new().uses(["side"])));
    b.body(square_area, vec![r2]);

    let client = b.static_method(unrelated, "print", &[]);
    Shapes {
        builder: b,
        shape,
        circle,
        ring,
        square,
        unrelated,
        areas: [base, circle_area, square_area],
        client,
    }
}

impl Shapes {
    /// Give the client a single `v = recv.area()` through `receiver`
    pub fn with_area_call(mut self, receiver: TypeId) -> (Program, CallSiteId, [CallableId; 3]) {
        let site = self.builder.virtual_call(
            "s.area()",
            self.areas[0],
            Receiver::Expr {
                static_type: receiver,
            },
            vec![],
        );
        let site_id = site.id;
        let stmt = self
            .builder
            .simple("v = s.area()", Effects::new().def("v").call(site));
        self.builder.body(self.client, vec![stmt]);
        (self.builder.build(), site_id, self.areas)
    }
}
