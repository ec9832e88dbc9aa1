//! Small planning tasks shared by the unit tests of the crate.
use crate::datatypes::*;

fn types(extra: &[&str]) -> Vec<Type> {
    ["#boolean", "number"]
        .iter()
        .chain(extra.iter())
        .map(|name| Type {
            name: name.to_string(),
            parent_types: vec![],
        })
        .collect()
}

fn objects(typed: &[(&str, usize)]) -> Vec<Object> {
    let truth = [("#false", 0), ("#true", 0)];
    truth
        .iter()
        .chain(typed.iter())
        .map(|(name, ty)| Object {
            name: name.to_string(),
            types: vec![TypeId(*ty)],
        })
        .collect()
}

pub(crate) fn param(name: &str, ty: usize) -> Parameter {
    Parameter {
        name: name.to_string(),
        types: vec![TypeId(ty)],
    }
}

fn function(name: &str, parameters: &[(&str, usize)], value_type: TypeId) -> Function {
    Function {
        name: name.to_string(),
        parameters: parameters.iter().map(|(n, t)| param(n, *t)).collect(),
        value_types: vec![value_type],
    }
}

fn literal(function: usize, params: &[Term]) -> Literal {
    Literal {
        function: FunctionId(function),
        params: params.to_vec(),
    }
}

/// `function(params) = value` of an operator
pub(crate) fn fluent(function: usize, params: &[Term], value: Term) -> OpFluent {
    OpFluent {
        variable: literal(function, params),
        value,
    }
}

pub(crate) const TRUE: Term = Term::Object(ObjectId::TRUE);
pub(crate) const FALSE: Term = Term::Object(ObjectId::FALSE);

pub(crate) fn operator(name: &str, parameters: Vec<Parameter>) -> Operator {
    Operator {
        name: name.to_string(),
        parameters,
        duration: vec![],
        at_start: OpCondition::default(),
        at_end: OpCondition::default(),
        over_all_prec: vec![],
        over_all_numeric_prec: vec![],
        equality: vec![],
        preferences: vec![],
        is_goal: false,
    }
}

fn goal_operator(prec: Vec<OpFluent>) -> Operator {
    let mut goal = operator("goal", vec![]);
    goal.at_start.prec = prec;
    goal.is_goal = true;
    goal
}

fn fixed_duration(value: f64) -> Vec<Duration> {
    vec![Duration {
        time: TimeSpecifier::None,
        comparator: Comparator::Eq,
        exp: Expression::Number(value),
    }]
}

/// One block `a` lying on the table and an operator removing it
pub(crate) fn trivial_task() -> PreprocessedTask {
    let mut remove = operator("remove", vec![param("x", 2)]);
    remove.at_start.eff = vec![fluent(0, &[Term::Param(0)], FALSE)];
    PreprocessedTask {
        task: ParsedTask {
            domain_name: "blocks".into(),
            problem_name: "trivial".into(),
            types: types(&["object"]),
            objects: objects(&[("a", 2)]),
            functions: vec![function("on", &[("x", 2)], TypeId::BOOLEAN)],
            init: vec![Fact {
                function: FunctionId(0),
                parameters: vec![ObjectId(2)],
                value: Value::Object(ObjectId::TRUE),
                time: 0.0,
            }],
            ..Default::default()
        },
        operators: vec![remove],
    }
}

/// Blocks `a` and `b`; only `a` is on the table
pub(crate) fn two_blocks_task() -> PreprocessedTask {
    let mut pick = operator("pick", vec![param("x", 2)]);
    pick.duration = fixed_duration(1.0);
    pick.at_start.prec = vec![fluent(0, &[Term::Param(0)], TRUE)];
    pick.at_end.eff = vec![fluent(0, &[Term::Param(0)], FALSE)];
    let mut task = trivial_task();
    task.task.problem_name = "two-blocks".into();
    task.task.objects = objects(&[("a", 2), ("b", 2)]);
    task.operators = vec![pick];
    task
}

/// Propositions `p` (initially true) and `q`; `go` swaps them at its end
pub(crate) fn mutex_task() -> PreprocessedTask {
    let p = |value| fluent(0, &[], value);
    let q = |value| fluent(1, &[], value);
    let mut go = operator("go", vec![]);
    go.duration = fixed_duration(1.0);
    go.at_start.prec = vec![p(TRUE)];
    go.at_end.eff = vec![p(FALSE), q(TRUE)];
    PreprocessedTask {
        task: ParsedTask {
            domain_name: "swap".into(),
            problem_name: "swap".into(),
            types: types(&[]),
            objects: objects(&[]),
            functions: vec![
                function("p", &[], TypeId::BOOLEAN),
                function("q", &[], TypeId::BOOLEAN),
            ],
            init: vec![Fact {
                function: FunctionId(0),
                parameters: vec![],
                value: Value::Object(ObjectId::TRUE),
                time: 0.0,
            }],
            ..Default::default()
        },
        operators: vec![go, goal_operator(vec![q(TRUE)])],
    }
}

/// `link ?x ?y` for every pair of distinct objects
pub(crate) fn equality_task() -> PreprocessedTask {
    let mut link = operator("link", vec![param("x", 2), param("y", 2)]);
    link.equality = vec![OpEquality {
        equal: false,
        left: Term::Param(0),
        right: Term::Param(1),
    }];
    link.at_end.eff = vec![fluent(0, &[Term::Param(0), Term::Param(1)], TRUE)];
    PreprocessedTask {
        task: ParsedTask {
            domain_name: "links".into(),
            problem_name: "links".into(),
            types: types(&["object"]),
            objects: objects(&[("a", 2), ("b", 2)]),
            functions: vec![function("linked", &[("x", 2), ("y", 2)], TypeId::BOOLEAN)],
            ..Default::default()
        },
        operators: vec![link],
    }
}

/// A truck driving from `l1` to `l2` over a road, burning fuel
///
/// Functions: `at(?t) -> location`, `road(?a ?b)`, `distance(?a ?b) -> number`,
/// `fuel(?t) -> number` and `visited(?l)`.
pub(crate) fn logistics_task() -> PreprocessedTask {
    let (t, from, to) = (Term::Param(0), Term::Param(1), Term::Param(2));
    let distance = Expression::Fluent(literal(2, &[from, to]));
    let mut drive = operator(
        "drive",
        vec![param("t", 2), param("from", 3), param("to", 3)],
    );
    drive.duration = vec![Duration {
        time: TimeSpecifier::None,
        comparator: Comparator::Eq,
        exp: distance.clone(),
    }];
    drive.at_start.prec = vec![fluent(0, &[t], from), fluent(1, &[from, to], TRUE)];
    drive.at_start.numeric_prec = vec![OpNumericPrec {
        comparator: Comparator::GreaterEq,
        operands: vec![Expression::Fluent(literal(3, &[t])), distance.clone()],
    }];
    drive.at_end.eff = vec![fluent(0, &[t], to), fluent(4, &[to], TRUE)];
    drive.at_end.numeric_eff = vec![OpEffect {
        assignment: Assignment::Decrease,
        fluent: literal(3, &[t]),
        exp: distance,
    }];
    let fact = |function: usize, parameters: &[usize], value: Value| Fact {
        function: FunctionId(function),
        parameters: parameters.iter().map(|o| ObjectId(*o)).collect(),
        value,
        time: 0.0,
    };
    PreprocessedTask {
        task: ParsedTask {
            domain_name: "logistics".into(),
            problem_name: "one-truck".into(),
            types: types(&["truck", "location"]),
            objects: objects(&[("t1", 2), ("l1", 3), ("l2", 3)]),
            functions: vec![
                function("at", &[("t", 2)], TypeId(3)),
                function("road", &[("a", 3), ("b", 3)], TypeId::BOOLEAN),
                function("distance", &[("a", 3), ("b", 3)], TypeId::NUMBER),
                function("fuel", &[("t", 2)], TypeId::NUMBER),
                function("visited", &[("l", 3)], TypeId::BOOLEAN),
            ],
            init: vec![
                fact(0, &[2], Value::Object(ObjectId(3))),
                fact(1, &[3, 4], Value::Object(ObjectId::TRUE)),
                fact(2, &[3, 4], Value::Number(10.0)),
                fact(3, &[2], Value::Number(100.0)),
            ],
            metric: Some(Metric {
                objective: Objective::Minimize,
                expression: MetricExpression::TotalTime,
            }),
            ..Default::default()
        },
        operators: vec![
            drive,
            goal_operator(vec![fluent(4, &[Term::Object(ObjectId(4))], TRUE)]),
        ],
    }
}
