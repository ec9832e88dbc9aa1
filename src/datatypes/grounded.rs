//! Output of the grounder: variables, actions and goals without parameters.
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt::Display, sync::Arc};

use super::{
    Assignment, Comparator, FunctionId, ObjectId, Objective, ParsedTask, TemporalKind,
    TimeSpecifier, TypeId, Value, VarId,
};
use crate::error::{Error, Result};

/// A function applied to concrete objects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedVar {
    /// Position in [GroundedTask::variables]
    pub index: VarId,
    /// The applied function
    pub function: FunctionId,
    /// The objects it is applied to
    pub params: Vec<ObjectId>,
    /// Whether the variable takes numbers
    pub is_numeric: bool,
    /// Level at which each value has been reached first; unreached values are absent
    pub reached_values: BTreeMap<ObjectId, u32>,
    /// `(time, value)` pairs of the initial state; timed initial literals may add several
    pub initial_values: Vec<(f64, Value)>,
}

impl GroundedVar {
    /// Returns true if the value has been reached during grounding
    pub fn is_reached(&self, value: ObjectId) -> bool {
        self.reached_values.contains_key(&value)
    }

    /// Value the variable takes at time `0`, if any
    pub fn value_at_start(&self) -> Option<Value> {
        self.initial_values
            .iter()
            .find(|(time, _)| *time == 0.0)
            .map(|(_, value)| *value)
    }
}

/// Condition or effect `var = value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroundedCondition {
    /// The grounded variable
    pub var: VarId,
    /// The object it is compared with or set to
    pub value: ObjectId,
}

/// Numeric expression over grounded variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedExpression {
    /// A number
    Number(f64),
    /// The value of a numeric variable
    Var(VarId),
    /// An object
    Object(ObjectId),
    /// `?duration`
    Duration,
    /// `#t`
    SharpT,
    /// Sum of the operands
    Sum(Vec<GroundedExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<GroundedExpression>),
    /// Product of the operands
    Mul(Vec<GroundedExpression>),
    /// Quotient of the operands
    Div(Vec<GroundedExpression>),
}

impl GroundedExpression {
    /// The number, if the expression is a constant
    pub fn number(&self) -> Option<f64> {
        match self {
            GroundedExpression::Number(num) => Some(*num),
            _ => None,
        }
    }

    /// Calls `f` on every variable the expression reads
    pub fn for_each_var<F: FnMut(VarId)>(&self, f: &mut F) {
        match self {
            GroundedExpression::Var(v) => f(*v),
            GroundedExpression::Sum(ops)
            | GroundedExpression::Sub(ops)
            | GroundedExpression::Mul(ops)
            | GroundedExpression::Div(ops) => ops.iter().for_each(|op| op.for_each_var(f)),
            _ => {}
        }
    }

    /// Evaluates the expression with `?duration` and `#t` set to `duration`.
    ///
    /// Returns `None` if the expression reads a variable, an object or an unknown duration.
    pub fn evaluate(&self, duration: Option<f64>) -> Result<Option<f64>> {
        let operands = match self {
            GroundedExpression::Number(num) => return Ok(Some(*num)),
            GroundedExpression::Duration | GroundedExpression::SharpT => return Ok(duration),
            GroundedExpression::Var(_) | GroundedExpression::Object(_) => return Ok(None),
            GroundedExpression::Sum(ops)
            | GroundedExpression::Sub(ops)
            | GroundedExpression::Mul(ops)
            | GroundedExpression::Div(ops) => ops,
        };
        let mut values = Vec::with_capacity(operands.len());
        for op in operands {
            match op.evaluate(duration)? {
                Some(value) => values.push(value),
                None => return Ok(None),
            }
        }
        let (first, rest) = match values.split_first() {
            Some(split) => split,
            None => return Ok(Some(0.0)),
        };
        Ok(Some(match self {
            GroundedExpression::Sub(_) if rest.is_empty() => -first,
            GroundedExpression::Sub(_) => rest.iter().fold(*first, |acc, v| acc - v),
            GroundedExpression::Mul(_) => values.iter().product(),
            GroundedExpression::Div(_) => {
                if rest.iter().any(|v| *v == 0.0) {
                    return Err(Error::DivisionByZero(format!("{:?}", self)));
                }
                rest.iter().fold(*first, |acc, v| acc / v)
            }
            _ => values.iter().sum(),
        }))
    }

    /// Returns true if the expression reads `?duration`
    pub fn depends_on_duration(&self) -> bool {
        match self {
            GroundedExpression::Duration => true,
            GroundedExpression::Sum(ops)
            | GroundedExpression::Sub(ops)
            | GroundedExpression::Mul(ops)
            | GroundedExpression::Div(ops) => ops.iter().any(|op| op.depends_on_duration()),
            _ => false,
        }
    }
}

/// Numeric precondition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedNumericCondition {
    /// The comparator
    pub comparator: Comparator,
    /// The compared expressions
    pub terms: Vec<GroundedExpression>,
}

/// Numeric effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedNumericEffect {
    /// The assignment operator
    pub assignment: Assignment,
    /// The modified variable
    pub var: VarId,
    /// The assigned expression
    pub exp: GroundedExpression,
}

/// Duration constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedDuration {
    /// Time point of the constraint
    pub time: TimeSpecifier,
    /// The comparator
    pub comparator: Comparator,
    /// The bound
    pub exp: GroundedExpression,
}

/// Argument of a goal that may still refer to a quantified parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialTerm {
    /// A concrete object
    Object(ObjectId),
    /// Parameter of an enclosing quantifier, numbered from the outermost one
    Quantified(usize),
}

/// Numeric expression that may still refer to quantified parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialExpression {
    /// A number
    Number(f64),
    /// The value of a grounded variable
    Var(VarId),
    /// A function applied to quantified parameters
    UngroundedVar {
        /// the function
        function: FunctionId,
        /// its arguments
        params: Vec<PartialTerm>,
    },
    /// An object or a quantified parameter
    Term(PartialTerm),
    /// Sum of the operands
    Sum(Vec<PartialExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<PartialExpression>),
    /// Product of the operands
    Mul(Vec<PartialExpression>),
    /// Quotient of the operands
    Div(Vec<PartialExpression>),
}

/// Goal description over grounded variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedGoal {
    /// `var = value` (or `var != value`)
    Fluent {
        /// the variable
        var: VarId,
        /// the compared object
        value: ObjectId,
        /// `false` for a disequality
        equal: bool,
    },
    /// Fluent whose arguments refer to quantified parameters
    UngroundedFluent {
        /// the function
        function: FunctionId,
        /// its arguments
        params: Vec<PartialTerm>,
        /// the compared value
        value: PartialTerm,
        /// `false` for a disequality
        equal: bool,
    },
    /// Conjunction
    And(Vec<GroundedGoal>),
    /// Disjunction
    Or(Vec<GroundedGoal>),
    /// Negation
    Not(Box<GroundedGoal>),
    /// Implication
    Imply(Box<GroundedGoal>, Box<GroundedGoal>),
    /// Existential quantification
    Exists {
        /// admissible types of each quantified parameter
        types: Vec<Vec<TypeId>>,
        /// the quantified goal
        goal: Box<GroundedGoal>,
    },
    /// Universal quantification
    Forall {
        /// admissible types of each quantified parameter
        types: Vec<Vec<TypeId>>,
        /// the quantified goal
        goal: Box<GroundedGoal>,
    },
    /// Two terms are (or are not) the same object
    Equality {
        /// `false` for an inequality
        equal: bool,
        /// left term
        left: PartialTerm,
        /// right term
        right: PartialTerm,
    },
    /// Numeric comparison
    Compare {
        /// the comparator
        comparator: Comparator,
        /// the compared expressions
        terms: Vec<PartialExpression>,
    },
    /// Goal tied to a time point
    At {
        /// the time point
        time: TimeSpecifier,
        /// the goal
        goal: Box<GroundedGoal>,
    },
    /// A goal that has been decided
    Constant(bool),
}

/// Preference of a grounded action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedPreference {
    /// Position in [GroundedTask::preference_names]
    pub name_index: usize,
    /// The preferred goal
    pub goal: GroundedGoal,
}

/// A fully instantiated action
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroundedAction {
    /// Position in [GroundedTask::actions] (or [GroundedTask::goals])
    pub index: usize,
    /// Operator name followed by the names of the bound objects
    pub name: String,
    /// Position of the originating operator
    pub operator: usize,
    /// Bound objects
    pub parameters: Vec<ObjectId>,
    /// Duration constraints
    pub duration: Vec<GroundedDuration>,
    /// Literal conditions at start
    pub start_cond: Vec<GroundedCondition>,
    /// Literal invariants
    pub over_cond: Vec<GroundedCondition>,
    /// Literal conditions at end
    pub end_cond: Vec<GroundedCondition>,
    /// Numeric conditions at start
    pub start_num_cond: Vec<GroundedNumericCondition>,
    /// Numeric invariants
    pub over_num_cond: Vec<GroundedNumericCondition>,
    /// Numeric conditions at end
    pub end_num_cond: Vec<GroundedNumericCondition>,
    /// Literal effects at start
    pub start_eff: Vec<GroundedCondition>,
    /// Literal effects at end
    pub end_eff: Vec<GroundedCondition>,
    /// Numeric effects at start
    pub start_num_eff: Vec<GroundedNumericEffect>,
    /// Numeric effects at end
    pub end_num_eff: Vec<GroundedNumericEffect>,
    /// Preferences
    pub preferences: Vec<GroundedPreference>,
    /// Goal pseudo-action
    pub is_goal: bool,
}

impl GroundedAction {
    /// All literal conditions in the order start, over all, end
    pub fn conditions(&self) -> impl Iterator<Item = &GroundedCondition> {
        self.start_cond
            .iter()
            .chain(self.over_cond.iter())
            .chain(self.end_cond.iter())
    }

    /// All numeric conditions in the order start, over all, end
    pub fn numeric_conditions(&self) -> impl Iterator<Item = &GroundedNumericCondition> {
        self.start_num_cond
            .iter()
            .chain(self.over_num_cond.iter())
            .chain(self.end_num_cond.iter())
    }

    /// All numeric effects in the order start, end
    pub fn numeric_effects(&self) -> impl Iterator<Item = &GroundedNumericEffect> {
        self.start_num_eff.iter().chain(self.end_num_eff.iter())
    }

    /// Returns true if the action writes the variable
    pub fn writes(&self, var: VarId) -> bool {
        self.start_eff
            .iter()
            .chain(self.end_eff.iter())
            .any(|eff| eff.var == var)
            || self.numeric_effects().any(|eff| eff.var == var)
    }
}

/// Trajectory constraint over grounded goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedConstraint {
    /// Conjunction
    And(Vec<GroundedConstraint>),
    /// Named soft constraint
    Preference {
        /// Position in [GroundedTask::preference_names]
        name_index: usize,
        /// The preferred constraint
        constraint: Box<GroundedConstraint>,
    },
    /// Named soft goal
    GoalPreference {
        /// Position in [GroundedTask::preference_names]
        name_index: usize,
        /// The preferred goal
        goal: GroundedGoal,
    },
    /// Modal constraint over goals
    Temporal {
        /// The modal operator
        kind: TemporalKind,
        /// Time points of the operator
        time: Vec<f64>,
        /// Goals of the operator
        goals: Vec<GroundedGoal>,
    },
}

/// Metric expression over grounded variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundedMetricExpression {
    /// A number
    Number(f64),
    /// The makespan
    TotalTime,
    /// Violations of the preference with the given name index
    IsViolated(usize),
    /// Final value of a numeric variable
    Var(VarId),
    /// Sum of the operands
    Sum(Vec<GroundedMetricExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<GroundedMetricExpression>),
    /// Product of the operands
    Mul(Vec<GroundedMetricExpression>),
    /// Quotient of the operands
    Div(Vec<GroundedMetricExpression>),
}

/// The plan metric over grounded variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedMetric {
    /// Optimisation direction
    pub objective: Objective,
    /// Measured quantity
    pub expression: GroundedMetricExpression,
}

/// Growth of the grounding in one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelStats {
    /// The level
    pub level: u32,
    /// Values reached first in this level
    pub new_values: usize,
    /// Actions (and goals) grounded in this level
    pub new_actions: usize,
    /// Number of variables at the end of the level
    pub variables: usize,
}

/// Per-level statistics of a grounding run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroundingStats {
    /// One entry per level
    pub levels: Vec<LevelStats>,
    /// Variables removed as static
    pub static_variables: usize,
    /// Actions dropped after grounding
    pub dropped_actions: usize,
}

impl Display for GroundingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "level new_values new_actions variables")?;
        for level in &self.levels {
            writeln!(
                f,
                "{} {} {} {}",
                level.level, level.new_values, level.new_actions, level.variables
            )?;
        }
        writeln!(f, "static variables: {}", self.static_variables)?;
        writeln!(f, "dropped actions: {}", self.dropped_actions)
    }
}

/// Result of the grounder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundedTask {
    /// The task the grounding started from
    pub task: Arc<ParsedTask>,
    /// Grounded variables
    pub variables: Vec<GroundedVar>,
    /// Grounded ordinary actions
    pub actions: Vec<GroundedAction>,
    /// Grounded goal pseudo-actions
    pub goals: Vec<GroundedAction>,
    /// Names of all preferences of actions and constraints
    pub preference_names: Vec<String>,
    /// Grounded trajectory constraints
    pub constraints: Vec<GroundedConstraint>,
    /// Grounded metric, if any
    pub metric: Option<GroundedMetric>,
    /// Statistics of the run
    pub stats: GroundingStats,
}

impl GroundedTask {
    /// Printable name of a variable, e.g. `(at truck1 depot)`
    pub fn var_name(&self, var: VarId) -> String {
        match self.variables.get(var.value()) {
            Some(v) => self.task.variable_name(v.function, &v.params),
            None => format!("{}", var),
        }
    }

    /// Returns true if the variable is a boolean proposition
    pub fn is_boolean_var(&self, var: VarId) -> bool {
        self.variables
            .get(var.value())
            .map(|v| self.task.is_boolean_function(v.function))
            .unwrap_or(false)
    }

    fn fmt_conditions(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        label: &str,
        conditions: &[GroundedCondition],
    ) -> std::fmt::Result {
        for cond in conditions {
            writeln!(
                f,
                "  {}: {} = {}",
                label,
                self.var_name(cond.var),
                self.task.object_name(cond.value)
            )?;
        }
        Ok(())
    }

    fn fmt_action(&self, f: &mut std::fmt::Formatter<'_>, action: &GroundedAction) -> std::fmt::Result {
        writeln!(f, "{}: {}", action.index, action.name)?;
        for d in &action.duration {
            writeln!(f, "  duration: {} {} {:?}", d.time, d.comparator, d.exp)?;
        }
        self.fmt_conditions(f, "at start", &action.start_cond)?;
        self.fmt_conditions(f, "over all", &action.over_cond)?;
        self.fmt_conditions(f, "at end", &action.end_cond)?;
        for c in action.numeric_conditions() {
            writeln!(f, "  numeric: {} {:?}", c.comparator, c.terms)?;
        }
        self.fmt_conditions(f, "start effect", &action.start_eff)?;
        self.fmt_conditions(f, "end effect", &action.end_eff)?;
        for e in action.numeric_effects() {
            writeln!(f, "  {} {} {:?}", e.assignment, self.var_name(e.var), e.exp)?;
        }
        for p in &action.preferences {
            writeln!(f, "  preference {}", self.preference_names[p.name_index])?;
        }
        Ok(())
    }
}

impl Display for GroundedTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "variables: {}", self.variables.len())?;
        for var in &self.variables {
            write!(f, "{}: {}", var.index.value(), self.var_name(var.index))?;
            if var.is_numeric {
                write!(f, " numeric")?;
            } else {
                write!(f, " {{")?;
                for (i, (value, level)) in var.reached_values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}@{}", self.task.object_name(*value), level)?;
                }
                write!(f, "}}")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "actions: {}", self.actions.len())?;
        for action in &self.actions {
            self.fmt_action(f, action)?;
        }
        writeln!(f, "goals: {}", self.goals.len())?;
        for goal in &self.goals {
            self.fmt_action(f, goal)?;
        }
        if !self.preference_names.is_empty() {
            writeln!(f, "preferences: {}", self.preference_names.join(" "))?;
        }
        writeln!(f, "constraints: {}", self.constraints.len())?;
        if let Some(metric) = &self.metric {
            writeln!(f, "metric: {} {:?}", metric.objective, metric.expression)?;
        }
        Ok(())
    }
}
