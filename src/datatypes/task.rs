//! Lifted input of the grounder.
//!
//! A [PreprocessedTask] is the typed planning task ([ParsedTask]) together with the lifted
//! operator schemas ([Operator]) derived from its actions. Both are produced by an external
//! parser/preprocessor and read as JSON.
//!
//! Conventions of the tables:
//! * type `0` is `#boolean` and type `1` is `number` ([TypeId::BOOLEAN], [TypeId::NUMBER])
//! * object `0` is `#false` and object `1` is `#true` ([ObjectId::FALSE], [ObjectId::TRUE])
//! * a predicate is a function whose value types are exactly `[#boolean]`, a numeric function
//!   has the value types `[number]`
use serde::{Deserialize, Serialize};
use std::{fmt::Display, io::Read};

use super::{FunctionId, ObjectId, TypeId};
use crate::error::{Error, Result};

/// A type, optionally derived from parent types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Type {
    /// Name of the type
    pub name: String,
    /// Direct super types
    #[serde(default)]
    pub parent_types: Vec<TypeId>,
}

/// An object (or constant) of the task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    /// Name of the object
    pub name: String,
    /// Types the object belongs to
    #[serde(default)]
    pub types: Vec<TypeId>,
}

/// A typed parameter of a function, operator or quantifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Name of the parameter, without the leading `?`
    pub name: String,
    /// Admissible types (any of them)
    pub types: Vec<TypeId>,
}

/// A predicate or function symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Name of the function
    pub name: String,
    /// Typed arguments
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Types of the values the function can take
    pub value_types: Vec<TypeId>,
}

/// Argument of a literal: either a parameter reference or a concrete object
///
/// Inside an operator, `Param(i)` with `i` below the number of operator parameters refers to the
/// operator parameter `i`. Larger indices refer to the parameters of enclosing quantifiers,
/// numbered from the outermost quantifier inwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// Reference to a parameter
    Param(usize),
    /// A concrete object
    Object(ObjectId),
}

/// A function applied to terms
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    /// The applied function
    pub function: FunctionId,
    /// Arguments of the application
    #[serde(default)]
    pub params: Vec<Term>,
}

/// Numeric comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// `=`
    Eq,
    /// `<`
    Less,
    /// `<=`
    LessEq,
    /// `>`
    Greater,
    /// `>=`
    GreaterEq,
    /// `!=`
    Neq,
}

impl Comparator {
    /// Evaluates the comparison between two numbers
    pub fn holds(self, left: f64, right: f64) -> bool {
        match self {
            Comparator::Eq => left == right,
            Comparator::Less => left < right,
            Comparator::LessEq => left <= right,
            Comparator::Greater => left > right,
            Comparator::GreaterEq => left >= right,
            Comparator::Neq => left != right,
        }
    }

    /// The comparator of the negated comparison
    pub fn negated(self) -> Self {
        match self {
            Comparator::Eq => Comparator::Neq,
            Comparator::Less => Comparator::GreaterEq,
            Comparator::LessEq => Comparator::Greater,
            Comparator::Greater => Comparator::LessEq,
            Comparator::GreaterEq => Comparator::Less,
            Comparator::Neq => Comparator::Eq,
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Comparator::Eq => "=",
            Comparator::Less => "<",
            Comparator::LessEq => "<=",
            Comparator::Greater => ">",
            Comparator::GreaterEq => ">=",
            Comparator::Neq => "!=",
        };
        write!(f, "{}", symbol)
    }
}

/// Time point of a condition, effect or duration constraint of a durative action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeSpecifier {
    /// at start
    AtStart,
    /// at end
    AtEnd,
    /// over all
    OverAll,
    /// no time point given
    #[default]
    None,
}

impl Display for TimeSpecifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeSpecifier::AtStart => write!(f, "at start"),
            TimeSpecifier::AtEnd => write!(f, "at end"),
            TimeSpecifier::OverAll => write!(f, "over all"),
            TimeSpecifier::None => Ok(()),
        }
    }
}

/// Numeric assignment operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assignment {
    /// assign
    Assign,
    /// increase
    Increase,
    /// decrease
    Decrease,
    /// scale-up
    ScaleUp,
    /// scale-down
    ScaleDown,
}

impl Assignment {
    /// Applies the assignment to a current value
    pub fn apply(self, current: f64, value: f64) -> f64 {
        match self {
            Assignment::Assign => value,
            Assignment::Increase => current + value,
            Assignment::Decrease => current - value,
            Assignment::ScaleUp => current * value,
            Assignment::ScaleDown => current / value,
        }
    }
}

impl Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Assignment::Assign => "assign",
            Assignment::Increase => "increase",
            Assignment::Decrease => "decrease",
            Assignment::ScaleUp => "scale-up",
            Assignment::ScaleDown => "scale-down",
        };
        write!(f, "{}", name)
    }
}

/// Value of a fact: an object for predicates and object functions, a number for numeric functions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// An object value (`#true`/`#false` for predicates)
    Object(ObjectId),
    /// A numeric value
    Number(f64),
}

impl Value {
    /// The object, if the value is not numeric
    pub fn object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(obj) => Some(*obj),
            Value::Number(_) => None,
        }
    }

    /// The number, if the value is numeric
    pub fn number(&self) -> Option<f64> {
        match self {
            Value::Number(num) => Some(*num),
            Value::Object(_) => None,
        }
    }

    /// Returns true if the value is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Number(_))
    }
}

/// A fact of the initial state. Facts with a time point above `0` are timed initial literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// The function of the fact
    pub function: FunctionId,
    /// Objects the function is applied to
    #[serde(default)]
    pub parameters: Vec<ObjectId>,
    /// The value the function takes
    pub value: Value,
    /// Time point at which the fact becomes true
    #[serde(default)]
    pub time: f64,
}

/// Numeric expression of conditions, effects and durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// A number
    Number(f64),
    /// A parameter or object
    Term(Term),
    /// The value of a function
    Fluent(Literal),
    /// `?duration`
    Duration,
    /// `#t` of continuous effects
    SharpT,
    /// Sum of the operands
    Sum(Vec<Expression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<Expression>),
    /// Product of the operands
    Mul(Vec<Expression>),
    /// Quotient of the operands
    Div(Vec<Expression>),
}

/// A (possibly quantified) goal description as used by preferences and constraints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalDescription {
    /// The literal holds
    Literal(Literal),
    /// The literal does not hold
    NegLiteral(Literal),
    /// Conjunction
    And(Vec<GoalDescription>),
    /// Disjunction
    Or(Vec<GoalDescription>),
    /// Negation
    Not(Box<GoalDescription>),
    /// Implication
    Imply(Box<GoalDescription>, Box<GoalDescription>),
    /// Existential quantification
    Exists {
        /// The quantified parameters
        parameters: Vec<Parameter>,
        /// The quantified goal
        goal: Box<GoalDescription>,
    },
    /// Universal quantification
    Forall {
        /// The quantified parameters
        parameters: Vec<Parameter>,
        /// The quantified goal
        goal: Box<GoalDescription>,
    },
    /// Numeric comparison (or `=`/`!=` between an object function and a term)
    Compare {
        /// The comparator
        comparator: Comparator,
        /// left operand
        left: Expression,
        /// right operand
        right: Expression,
    },
    /// Two terms denote the same object
    Equality {
        /// left term
        left: Term,
        /// right term
        right: Term,
    },
    /// Two terms denote different objects
    Inequality {
        /// left term
        left: Term,
        /// right term
        right: Term,
    },
    /// Goal tied to a time point
    At {
        /// the time point
        time: TimeSpecifier,
        /// the goal
        goal: Box<GoalDescription>,
    },
}

/// Kinds of trajectory constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalKind {
    /// at end
    AtEnd,
    /// always
    Always,
    /// sometime
    Sometime,
    /// within
    Within,
    /// at-most-once
    AtMostOnce,
    /// sometime-after
    SometimeAfter,
    /// sometime-before
    SometimeBefore,
    /// always-within
    AlwaysWithin,
    /// hold-during
    HoldDuring,
    /// hold-after
    HoldAfter,
}

impl TemporalKind {
    /// Number of goals and number of time points the constraint takes
    pub fn arity(self) -> (usize, usize) {
        match self {
            TemporalKind::AtEnd
            | TemporalKind::Always
            | TemporalKind::Sometime
            | TemporalKind::AtMostOnce => (1, 0),
            TemporalKind::Within | TemporalKind::HoldAfter => (1, 1),
            TemporalKind::SometimeAfter | TemporalKind::SometimeBefore => (2, 0),
            TemporalKind::AlwaysWithin => (2, 1),
            TemporalKind::HoldDuring => (1, 2),
        }
    }
}

impl Display for TemporalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TemporalKind::AtEnd => "at end",
            TemporalKind::Always => "always",
            TemporalKind::Sometime => "sometime",
            TemporalKind::Within => "within",
            TemporalKind::AtMostOnce => "at-most-once",
            TemporalKind::SometimeAfter => "sometime-after",
            TemporalKind::SometimeBefore => "sometime-before",
            TemporalKind::AlwaysWithin => "always-within",
            TemporalKind::HoldDuring => "hold-during",
            TemporalKind::HoldAfter => "hold-after",
        };
        write!(f, "{}", name)
    }
}

/// A trajectory constraint of the problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    /// Conjunction of constraints
    And(Vec<Constraint>),
    /// Universally quantified constraint
    Forall {
        /// The quantified parameters
        parameters: Vec<Parameter>,
        /// The quantified constraint
        constraint: Box<Constraint>,
    },
    /// Named soft constraint
    Preference {
        /// Name of the preference
        name: String,
        /// The preferred constraint
        constraint: Box<Constraint>,
    },
    /// Named soft goal
    GoalPreference {
        /// Name of the preference
        name: String,
        /// The preferred goal
        goal: GoalDescription,
    },
    /// Modal constraint over goals
    Temporal {
        /// The modal operator
        kind: TemporalKind,
        /// Time points of the operator
        #[serde(default)]
        time: Vec<f64>,
        /// Goals of the operator
        goals: Vec<GoalDescription>,
    },
}

/// Arithmetic over the plan quality measures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricExpression {
    /// A number
    Number(f64),
    /// The makespan of the plan
    TotalTime,
    /// The number of violations of a named preference
    IsViolated(String),
    /// The final value of a numeric function
    Fluent {
        /// the function
        function: FunctionId,
        /// its arguments
        #[serde(default)]
        parameters: Vec<ObjectId>,
    },
    /// Sum of the operands
    Sum(Vec<MetricExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<MetricExpression>),
    /// Product of the operands
    Mul(Vec<MetricExpression>),
    /// Quotient of the operands
    Div(Vec<MetricExpression>),
}

/// Direction of the optimisation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Smaller is better
    Minimize,
    /// Larger is better
    Maximize,
}

impl Display for Objective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Objective::Minimize => write!(f, "minimize"),
            Objective::Maximize => write!(f, "maximize"),
        }
    }
}

/// The plan metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Optimisation direction
    pub objective: Objective,
    /// Measured quantity
    pub expression: MetricExpression,
}

/// The typed planning task as delivered by the parser
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParsedTask {
    /// Name of the domain
    #[serde(default)]
    pub domain_name: String,
    /// Name of the problem
    #[serde(default)]
    pub problem_name: String,
    /// Type table
    pub types: Vec<Type>,
    /// Object table
    pub objects: Vec<Object>,
    /// Function table
    pub functions: Vec<Function>,
    /// Initial state, including timed initial literals
    #[serde(default)]
    pub init: Vec<Fact>,
    /// Trajectory constraints and goal preferences
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Plan metric, if any
    #[serde(default)]
    pub metric: Option<Metric>,
}

impl ParsedTask {
    /// Returns true if the function is a predicate
    pub fn is_boolean_function(&self, function: FunctionId) -> bool {
        self.functions
            .get(function.value())
            .map(|f| f.value_types == [TypeId::BOOLEAN])
            .unwrap_or(false)
    }

    /// Returns true if the function takes numbers
    pub fn is_numeric_function(&self, function: FunctionId) -> bool {
        self.functions
            .get(function.value())
            .map(|f| f.value_types == [TypeId::NUMBER])
            .unwrap_or(false)
    }

    /// Returns true if `subtype` is `supertype` or derives from it
    pub fn is_subtype(&self, subtype: TypeId, supertype: TypeId) -> bool {
        if subtype == supertype {
            return true;
        }
        self.types
            .get(subtype.value())
            .map(|t| {
                t.parent_types
                    .iter()
                    .any(|&parent| parent != subtype && self.is_subtype(parent, supertype))
            })
            .unwrap_or(false)
    }

    /// Returns true if one of `types` is compatible with one of `valid_types`
    pub fn compatible_types(&self, types: &[TypeId], valid_types: &[TypeId]) -> bool {
        types
            .iter()
            .any(|&t| valid_types.iter().any(|&v| self.is_subtype(t, v)))
    }

    /// Name of an object, `?` for an unknown index
    pub fn object_name(&self, object: ObjectId) -> &str {
        self.objects
            .get(object.value())
            .map(|o| o.name.as_str())
            .unwrap_or("?")
    }

    /// Name of a function, `?` for an unknown index
    pub fn function_name(&self, function: FunctionId) -> &str {
        self.functions
            .get(function.value())
            .map(|f| f.name.as_str())
            .unwrap_or("?")
    }

    /// Printable name of a ground function application, e.g. `(at truck1 depot)`
    pub fn variable_name(&self, function: FunctionId, params: &[ObjectId]) -> String {
        let mut name = format!("({}", self.function_name(function));
        for &param in params {
            name.push(' ');
            name.push_str(self.object_name(param));
        }
        name.push(')');
        name
    }
}

/// Literal condition or effect `variable = value` of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpFluent {
    /// The (lifted) variable
    pub variable: Literal,
    /// The (lifted) value
    pub value: Term,
}

/// Numeric precondition of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpNumericPrec {
    /// The comparator
    pub comparator: Comparator,
    /// The two compared expressions
    pub operands: Vec<Expression>,
}

/// Numeric effect of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpEffect {
    /// The assignment operator
    pub assignment: Assignment,
    /// The modified function
    pub fluent: Literal,
    /// The assigned expression
    pub exp: Expression,
}

/// Conditions and effects of an operator at one time point
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OpCondition {
    /// Literal preconditions
    #[serde(default)]
    pub prec: Vec<OpFluent>,
    /// Numeric preconditions
    #[serde(default)]
    pub numeric_prec: Vec<OpNumericPrec>,
    /// Literal effects
    #[serde(default)]
    pub eff: Vec<OpFluent>,
    /// Numeric effects
    #[serde(default)]
    pub numeric_eff: Vec<OpEffect>,
}

/// Duration constraint `(comparator ?duration exp)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duration {
    /// Time point of the constraint
    #[serde(default)]
    pub time: TimeSpecifier,
    /// The comparator
    pub comparator: Comparator,
    /// The bound
    pub exp: Expression,
}

/// Equality or inequality between two terms of an operator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpEquality {
    /// `true` for `=`, `false` for `!=`
    pub equal: bool,
    /// left term
    pub left: Term,
    /// right term
    pub right: Term,
}

/// Named preference of an operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpPreference {
    /// Name of the preference
    pub name: String,
    /// The preferred goal
    pub preference: GoalDescription,
}

/// A lifted operator schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    /// Name of the operator
    pub name: String,
    /// Typed parameters
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Duration constraints
    #[serde(default)]
    pub duration: Vec<Duration>,
    /// Conditions and effects at start
    #[serde(default)]
    pub at_start: OpCondition,
    /// Conditions and effects at end
    #[serde(default)]
    pub at_end: OpCondition,
    /// Literal invariants
    #[serde(default)]
    pub over_all_prec: Vec<OpFluent>,
    /// Numeric invariants
    #[serde(default)]
    pub over_all_numeric_prec: Vec<OpNumericPrec>,
    /// Equality constraints between parameters
    #[serde(default)]
    pub equality: Vec<OpEquality>,
    /// Preferences
    #[serde(default)]
    pub preferences: Vec<OpPreference>,
    /// Goal pseudo-operator
    #[serde(default)]
    pub is_goal: bool,
}

/// Input of the grounder: the parsed task and its lifted operators
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreprocessedTask {
    /// The parsed task
    pub task: ParsedTask,
    /// The lifted operators
    pub operators: Vec<Operator>,
}

impl PreprocessedTask {
    /// Reads and validates a task from its JSON representation
    pub fn from_json(input: &str) -> Result<Self> {
        let task: PreprocessedTask = serde_json::from_str(input)?;
        task.validate()?;
        Ok(task)
    }

    /// Reads and validates a task from a JSON reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let task: PreprocessedTask = serde_json::from_reader(reader)?;
        task.validate()?;
        Ok(task)
    }

    /// Checks the table conventions and that every index is in range
    pub fn validate(&self) -> Result<()> {
        Validator { task: &self.task }.validate(&self.operators)
    }
}

struct Validator<'a> {
    task: &'a ParsedTask,
}

fn invalid<T>(msg: String) -> Result<T> {
    Err(Error::InvalidTask(msg))
}

impl Validator<'_> {
    fn validate(&self, operators: &[Operator]) -> Result<()> {
        let task = self.task;
        match (task.types.first(), task.types.get(1)) {
            (Some(b), Some(n)) if b.name == "#boolean" && n.name == "number" => {}
            _ => return invalid("types 0 and 1 must be #boolean and number".to_string()),
        }
        match (task.objects.first(), task.objects.get(1)) {
            (Some(f), Some(t)) if f.name == "#false" && t.name == "#true" => {}
            _ => return invalid("objects 0 and 1 must be #false and #true".to_string()),
        }
        for t in &task.types {
            self.types(&t.parent_types, &t.name)?;
        }
        for o in &task.objects {
            self.types(&o.types, &o.name)?;
        }
        for f in &task.functions {
            self.types(&f.value_types, &f.name)?;
            for p in &f.parameters {
                self.types(&p.types, &f.name)?;
            }
        }
        for fact in &task.init {
            self.function(fact.function, fact.parameters.len(), "initial state")?;
            for &obj in &fact.parameters {
                self.object(obj, "initial state")?;
            }
            match fact.value {
                Value::Object(obj) => {
                    self.object(obj, "initial state")?;
                    if task.is_numeric_function(fact.function) {
                        return invalid(format!(
                            "object value for numeric function {}",
                            task.function_name(fact.function)
                        ));
                    }
                }
                Value::Number(_) => {
                    if !task.is_numeric_function(fact.function) {
                        return invalid(format!(
                            "numeric value for non-numeric function {}",
                            task.function_name(fact.function)
                        ));
                    }
                }
            }
        }
        for c in &task.constraints {
            self.constraint(c, 0)?;
        }
        if let Some(metric) = &task.metric {
            self.metric(&metric.expression)?;
        }
        for op in operators {
            self.operator(op)?;
        }
        Ok(())
    }

    fn types(&self, types: &[TypeId], context: &str) -> Result<()> {
        match types.iter().find(|t| t.value() >= self.task.types.len()) {
            Some(t) => invalid(format!("unknown type {} in {}", t, context)),
            None => Ok(()),
        }
    }

    fn object(&self, obj: ObjectId, context: &str) -> Result<()> {
        if obj.value() >= self.task.objects.len() {
            invalid(format!("unknown object {} in {}", obj, context))
        } else {
            Ok(())
        }
    }

    fn function(&self, function: FunctionId, arity: usize, context: &str) -> Result<()> {
        match self.task.functions.get(function.value()) {
            None => invalid(format!("unknown function {} in {}", function, context)),
            Some(f) if f.parameters.len() != arity => invalid(format!(
                "function {} takes {} arguments, {} given in {}",
                f.name,
                f.parameters.len(),
                arity,
                context
            )),
            Some(_) => Ok(()),
        }
    }

    fn term(&self, term: &Term, num_params: usize, context: &str) -> Result<()> {
        match term {
            Term::Param(i) if *i >= num_params => {
                invalid(format!("unknown parameter ?{} in {}", i, context))
            }
            Term::Param(_) => Ok(()),
            Term::Object(obj) => self.object(*obj, context),
        }
    }

    fn literal(&self, literal: &Literal, num_params: usize, context: &str) -> Result<()> {
        self.function(literal.function, literal.params.len(), context)?;
        literal
            .params
            .iter()
            .try_for_each(|t| self.term(t, num_params, context))
    }

    fn expression(&self, exp: &Expression, num_params: usize, context: &str) -> Result<()> {
        match exp {
            Expression::Number(_) | Expression::Duration | Expression::SharpT => Ok(()),
            Expression::Term(t) => self.term(t, num_params, context),
            Expression::Fluent(l) => self.literal(l, num_params, context),
            Expression::Sum(ops) | Expression::Sub(ops) | Expression::Mul(ops) | Expression::Div(ops) => {
                if ops.is_empty() {
                    return invalid(format!("operation without operands in {}", context));
                }
                ops.iter()
                    .try_for_each(|e| self.expression(e, num_params, context))
            }
        }
    }

    fn goal(&self, goal: &GoalDescription, num_params: usize, context: &str) -> Result<()> {
        match goal {
            GoalDescription::Literal(l) | GoalDescription::NegLiteral(l) => {
                self.literal(l, num_params, context)
            }
            GoalDescription::And(goals) | GoalDescription::Or(goals) => goals
                .iter()
                .try_for_each(|g| self.goal(g, num_params, context)),
            GoalDescription::Not(g) | GoalDescription::At { goal: g, .. } => {
                self.goal(g, num_params, context)
            }
            GoalDescription::Imply(p, q) => {
                self.goal(p, num_params, context)?;
                self.goal(q, num_params, context)
            }
            GoalDescription::Exists { parameters, goal }
            | GoalDescription::Forall { parameters, goal } => {
                for p in parameters {
                    self.types(&p.types, context)?;
                }
                self.goal(goal, num_params + parameters.len(), context)
            }
            GoalDescription::Compare { left, right, .. } => {
                self.expression(left, num_params, context)?;
                self.expression(right, num_params, context)
            }
            GoalDescription::Equality { left, right }
            | GoalDescription::Inequality { left, right } => {
                self.term(left, num_params, context)?;
                self.term(right, num_params, context)
            }
        }
    }

    fn constraint(&self, constraint: &Constraint, num_params: usize) -> Result<()> {
        match constraint {
            Constraint::And(cs) => cs.iter().try_for_each(|c| self.constraint(c, num_params)),
            Constraint::Forall {
                parameters,
                constraint,
            } => {
                for p in parameters {
                    self.types(&p.types, "constraint")?;
                }
                self.constraint(constraint, num_params + parameters.len())
            }
            Constraint::Preference { constraint, .. } => self.constraint(constraint, num_params),
            Constraint::GoalPreference { goal, name } => self.goal(goal, num_params, name),
            Constraint::Temporal { kind, time, goals } => {
                let (num_goals, num_times) = kind.arity();
                if goals.len() != num_goals || time.len() != num_times {
                    return invalid(format!(
                        "constraint {} expects {} goals and {} time points",
                        kind, num_goals, num_times
                    ));
                }
                goals
                    .iter()
                    .try_for_each(|g| self.goal(g, num_params, "constraint"))
            }
        }
    }

    fn metric(&self, metric: &MetricExpression) -> Result<()> {
        match metric {
            MetricExpression::Number(_)
            | MetricExpression::TotalTime
            | MetricExpression::IsViolated(_) => Ok(()),
            MetricExpression::Fluent {
                function,
                parameters,
            } => {
                self.function(*function, parameters.len(), "metric")?;
                parameters.iter().try_for_each(|&o| self.object(o, "metric"))
            }
            MetricExpression::Sum(ms)
            | MetricExpression::Sub(ms)
            | MetricExpression::Mul(ms)
            | MetricExpression::Div(ms) => {
                if ms.is_empty() {
                    return invalid("metric operation without operands".to_string());
                }
                ms.iter().try_for_each(|m| self.metric(m))
            }
        }
    }

    fn fluents(&self, fluents: &[OpFluent], num_params: usize, name: &str) -> Result<()> {
        fluents.iter().try_for_each(|f| {
            self.literal(&f.variable, num_params, name)?;
            self.term(&f.value, num_params, name)
        })
    }

    fn numeric_precs(&self, precs: &[OpNumericPrec], num_params: usize, name: &str) -> Result<()> {
        precs.iter().try_for_each(|p| {
            p.operands
                .iter()
                .try_for_each(|e| self.expression(e, num_params, name))
        })
    }

    fn operator(&self, op: &Operator) -> Result<()> {
        let name = op.name.as_str();
        let num_params = op.parameters.len();
        for p in &op.parameters {
            self.types(&p.types, name)?;
        }
        for d in &op.duration {
            self.expression(&d.exp, num_params, name)?;
        }
        for cond in [&op.at_start, &op.at_end] {
            self.fluents(&cond.prec, num_params, name)?;
            self.fluents(&cond.eff, num_params, name)?;
            self.numeric_precs(&cond.numeric_prec, num_params, name)?;
            for eff in &cond.numeric_eff {
                self.literal(&eff.fluent, num_params, name)?;
                self.expression(&eff.exp, num_params, name)?;
            }
        }
        self.fluents(&op.over_all_prec, num_params, name)?;
        self.numeric_precs(&op.over_all_numeric_prec, num_params, name)?;
        for eq in &op.equality {
            self.term(&eq.left, num_params, name)?;
            self.term(&eq.right, num_params, name)?;
        }
        for pref in &op.preferences {
            self.goal(&pref.preference, num_params, name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::*;
    use test_log::test;

    #[test]
    fn conventions() {
        let task = trivial_task();
        assert!(task.validate().is_ok());
        assert!(task.task.is_boolean_function(FunctionId(0)));
        assert!(!task.task.is_numeric_function(FunctionId(0)));
        assert_eq!(
            task.task.variable_name(FunctionId(0), &[ObjectId(2)]),
            "(on a)"
        );

        let mut broken = task.clone();
        broken.task.objects.swap(0, 1);
        assert!(matches!(broken.validate(), Err(Error::InvalidTask(_))));
    }

    #[test]
    fn unknown_indices() {
        let mut task = trivial_task();
        task.operators[0].at_start.eff[0].variable.params = vec![Term::Param(3)];
        assert!(matches!(task.validate(), Err(Error::InvalidTask(_))));

        let mut task = trivial_task();
        task.task.init[0].parameters.push(ObjectId(2));
        assert!(matches!(task.validate(), Err(Error::InvalidTask(_))));

        let mut task = trivial_task();
        task.task.init[0].value = Value::Number(1.0);
        assert!(matches!(task.validate(), Err(Error::InvalidTask(_))));
    }

    #[test]
    fn subtypes() {
        let mut task = ParsedTask::default();
        task.types = vec![
            Type { name: "#boolean".into(), parent_types: vec![] },
            Type { name: "number".into(), parent_types: vec![] },
            Type { name: "object".into(), parent_types: vec![] },
            Type { name: "vehicle".into(), parent_types: vec![TypeId(2)] },
            Type { name: "truck".into(), parent_types: vec![TypeId(3)] },
        ];
        assert!(task.is_subtype(TypeId(4), TypeId(2)));
        assert!(task.is_subtype(TypeId(3), TypeId(3)));
        assert!(!task.is_subtype(TypeId(2), TypeId(4)));
        assert!(task.compatible_types(&[TypeId(0), TypeId(4)], &[TypeId(3)]));
        assert!(!task.compatible_types(&[TypeId(2)], &[TypeId(3), TypeId(4)]));
    }

    #[test]
    fn comparators() {
        for cmp in [
            Comparator::Eq,
            Comparator::Less,
            Comparator::LessEq,
            Comparator::Greater,
            Comparator::GreaterEq,
            Comparator::Neq,
        ] {
            assert_eq!(cmp.negated().negated(), cmp);
            for (a, b) in [(1.0, 2.0), (2.0, 2.0), (3.0, 2.0)] {
                assert_ne!(cmp.holds(a, b), cmp.negated().holds(a, b));
            }
        }
        assert_eq!(format!("{}", Comparator::LessEq), "<=");
    }

    #[test]
    fn equality_terms() {
        let eq: OpEquality =
            serde_json::from_str(r#"{"equal":false,"left":{"param":0},"right":{"object":2}}"#)
                .unwrap();
        let copied = eq;
        assert_eq!(eq, copied);
        assert!(!copied.equal);
        assert_eq!(copied.right, Term::Object(ObjectId(2)));
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_string(&trivial_task()).unwrap();
        let back = PreprocessedTask::from_json(&json).unwrap();
        assert_eq!(back, trivial_task());
        let term: Term = serde_json::from_str(r#"{"param":1}"#).unwrap();
        assert_eq!(term, Term::Param(1));
        let exp: Expression = serde_json::from_str(r#"{"sum":[{"number":1.0},"duration"]}"#).unwrap();
        assert_eq!(
            exp,
            Expression::Sum(vec![Expression::Number(1.0), Expression::Duration])
        );
    }
}
