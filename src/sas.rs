//! Finite-domain representation of a planning task.
//!
//! A [SasTask] holds multi-valued variables over a global table of values, numeric variables and
//! actions whose conditions and effects are `(variable, value)` pairs. Values `0`, `1` and `2` of
//! the table are always `<true>`, `<false>` and `<undefined>`.
//!
//! Besides the translated task itself, the structure provides the indexes a planner needs:
//! the initial state ([SasTask::compute_initial_state]), the actions requiring and producing each
//! `(variable, value)` pair ([SasTask::compute_requirers], [SasTask::compute_producers]),
//! permanent mutexes ([SasTask::compute_permanent_mutex]) and the action costs that do not depend
//! on the state ([SasTask::compute_initial_actions_cost]).
mod costs;
mod reachability;

pub use costs::EPSILON;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::{Display, Formatter};

use crate::datatypes::{
    Assignment, Comparator, FunctionId, Objective, TemporalKind, TimeSpecifier, ValueId, VarValue,
};
use crate::error::{Error, Result};

/// An entry of the global value table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasValue {
    /// Position in [SasTask::values]
    pub index: ValueId,
    /// Name of the value: an object name, the name of a proposition or `<true>`/`<false>`/`<undefined>`
    pub name: String,
    /// The function of the proposition the value stands for, if any
    pub function: Option<FunctionId>,
}

/// A finite-domain variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasVariable {
    /// Position in [SasTask::variables]
    pub index: usize,
    /// Name of the variable
    pub name: String,
    /// Domain of the variable
    pub possible_values: Vec<ValueId>,
    /// `(time, value)` pairs of the initial state
    pub initial_values: Vec<(f64, ValueId)>,
}

impl SasVariable {
    /// Adds a value to the domain
    pub fn add_possible_value(&mut self, value: ValueId) {
        self.possible_values.push(value);
    }

    /// Position of the value in the domain
    pub fn possible_value_index(&self, value: ValueId) -> Option<usize> {
        self.possible_values.iter().position(|v| *v == value)
    }

    /// Returns true if the domain is exactly `[<false>, <true>]`
    pub fn is_boolean(&self) -> bool {
        self.possible_values == [ValueId::FALSE, ValueId::TRUE]
    }

    /// Sets the value at the given time point.
    ///
    /// If `is_true` is false the variable takes the other value of its two-valued domain instead.
    pub fn add_initial_value(&mut self, value: ValueId, is_true: bool, time: f64) -> Result<()> {
        let index = self
            .possible_value_index(value)
            .ok_or_else(|| self.invalid_value(value))?;
        let value = if is_true {
            value
        } else if self.possible_values.len() == 2 {
            self.possible_values[1 - index]
        } else {
            return Err(Error::NoOppositeValue(self.name.clone()));
        };
        self.initial_values.push((time, value));
        Ok(())
    }

    /// The other value of a two-valued domain
    pub fn opposite_value(&self, value: ValueId) -> Result<ValueId> {
        if self.possible_values.len() != 2 {
            return Err(Error::NoOppositeValue(self.name.clone()));
        }
        match self.possible_value_index(value) {
            Some(index) => Ok(self.possible_values[1 - index]),
            None => Err(self.invalid_value(value)),
        }
    }

    /// Value at time `0`, if any
    pub fn initial_state_value(&self) -> Option<ValueId> {
        self.initial_values
            .iter()
            .find(|(time, _)| *time == 0.0)
            .map(|(_, value)| *value)
    }

    fn invalid_value(&self, value: ValueId) -> Error {
        Error::InvalidValue {
            variable: self.name.clone(),
            value: value.to_string(),
        }
    }
}

/// A numeric variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericVariable {
    /// Position in [SasTask::numeric_variables]
    pub index: usize,
    /// Name of the variable
    pub name: String,
    /// `(time, value)` pairs of the initial state
    pub initial_values: Vec<(f64, f64)>,
}

impl NumericVariable {
    /// Sets the value at the given time point; a different value at the same time is an error
    pub fn add_initial_value(&mut self, value: f64, time: f64) -> Result<()> {
        match self.initial_values.iter().find(|(t, _)| *t == time) {
            Some((_, v)) if *v == value => Ok(()),
            Some(_) => Err(Error::ContradictoryInitialValue {
                variable: self.name.clone(),
                value,
                time,
            }),
            None => {
                self.initial_values.push((time, value));
                Ok(())
            }
        }
    }

    /// Value at time `0`, `0` if undefined
    pub fn initial_state_value(&self) -> f64 {
        self.initial_values
            .iter()
            .find(|(time, _)| *time == 0.0)
            .map(|(_, value)| *value)
            .unwrap_or(0.0)
    }
}

/// Numeric expression over numeric variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SasExpression {
    /// A number
    Number(f64),
    /// The value of a numeric variable
    Var(usize),
    /// `?duration`
    Duration,
    /// `#t`
    SharpT,
    /// Sum of the operands
    Sum(Vec<SasExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<SasExpression>),
    /// Product of the operands
    Mul(Vec<SasExpression>),
    /// Quotient of the operands
    Div(Vec<SasExpression>),
}

impl SasExpression {
    /// Evaluates the expression in a numeric state; `?duration` and `#t` take `duration`
    pub fn evaluate(&self, state: &[f64], duration: f64) -> Result<f64> {
        let operands = match self {
            SasExpression::Number(num) => return Ok(*num),
            SasExpression::Var(var) => {
                return state
                    .get(*var)
                    .copied()
                    .ok_or_else(|| Error::UnknownVariable(format!("numeric variable {}", var)))
            }
            SasExpression::Duration | SasExpression::SharpT => return Ok(duration),
            SasExpression::Sum(ops)
            | SasExpression::Sub(ops)
            | SasExpression::Mul(ops)
            | SasExpression::Div(ops) => ops,
        };
        let mut values = Vec::with_capacity(operands.len());
        for op in operands {
            values.push(op.evaluate(state, duration)?);
        }
        fold_operands(self.operator(), &values, || format!("{:?}", self))
    }

    fn operator(&self) -> char {
        match self {
            SasExpression::Sub(_) => '-',
            SasExpression::Mul(_) => '*',
            SasExpression::Div(_) => '/',
            _ => '+',
        }
    }

    /// Calls `f` on every numeric variable the expression reads
    pub fn for_each_var<F: FnMut(usize)>(&self, f: &mut F) {
        match self {
            SasExpression::Var(var) => f(*var),
            SasExpression::Sum(ops)
            | SasExpression::Sub(ops)
            | SasExpression::Mul(ops)
            | SasExpression::Div(ops) => ops.iter().for_each(|op| op.for_each_var(f)),
            _ => {}
        }
    }
}

/// Folds evaluated operands; a single operand of a subtraction is negated
fn fold_operands<F: Fn() -> String>(operator: char, values: &[f64], describe: F) -> Result<f64> {
    let (first, rest) = match values.split_first() {
        Some(split) => split,
        None => return Ok(0.0),
    };
    Ok(match operator {
        '-' if rest.is_empty() => -first,
        '-' => rest.iter().fold(*first, |acc, v| acc - v),
        '*' => values.iter().product(),
        '/' => {
            if rest.iter().any(|v| *v == 0.0) {
                return Err(Error::DivisionByZero(describe()));
            }
            rest.iter().fold(*first, |acc, v| acc / v)
        }
        _ => values.iter().sum(),
    })
}

/// Duration constraint of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasDuration {
    /// Time point of the constraint
    pub time: TimeSpecifier,
    /// The comparator
    pub comparator: Comparator,
    /// The bound
    pub exp: SasExpression,
}

/// Condition or effect `variable = value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SasCondition {
    /// The variable
    pub var: usize,
    /// The value
    pub value: ValueId,
    /// Whether an effect of the same action changes the variable to another value
    pub is_modified: bool,
}

impl SasCondition {
    /// Creates an unmodified condition
    pub fn new(var: usize, value: ValueId) -> Self {
        Self {
            var,
            value,
            is_modified: false,
        }
    }

    /// The packed `(variable, value)` code
    pub fn code(&self) -> Result<VarValue> {
        VarValue::new(self.var, self.value)
    }
}

/// Numeric condition of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasNumericCondition {
    /// The comparator
    pub comparator: Comparator,
    /// The compared expressions
    pub terms: Vec<SasExpression>,
}

/// Numeric effect of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasNumericEffect {
    /// The assignment operator
    pub assignment: Assignment,
    /// The modified numeric variable
    pub var: usize,
    /// The assigned expression
    pub exp: SasExpression,
}

/// Goal description over finite-domain variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SasGoal {
    /// `variable = value`
    Value {
        /// the variable
        var: usize,
        /// the value
        value: ValueId,
    },
    /// A decided goal
    Constant(bool),
    /// Conjunction
    And(Vec<SasGoal>),
    /// Disjunction
    Or(Vec<SasGoal>),
    /// Negation
    Not(Box<SasGoal>),
    /// Numeric comparison
    Compare {
        /// the comparator
        comparator: Comparator,
        /// the compared expressions
        terms: Vec<SasExpression>,
    },
    /// Goal tied to a time point
    At {
        /// the time point
        time: TimeSpecifier,
        /// the goal
        goal: Box<SasGoal>,
    },
}

/// Preference of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasPreference {
    /// Position in [SasTask::preference_names]
    pub name_index: usize,
    /// The preferred goal
    pub goal: SasGoal,
}

/// Trajectory constraint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SasConstraint {
    /// Conjunction
    And(Vec<SasConstraint>),
    /// Named soft constraint
    Preference {
        /// Position in [SasTask::preference_names]
        name_index: usize,
        /// The preferred constraint
        constraint: Box<SasConstraint>,
    },
    /// Named soft goal
    GoalPreference {
        /// Position in [SasTask::preference_names]
        name_index: usize,
        /// The preferred goal
        goal: SasGoal,
    },
    /// Modal constraint over goals
    Temporal {
        /// The modal operator
        kind: TemporalKind,
        /// Time points of the operator
        time: Vec<f64>,
        /// Goals of the operator
        goals: Vec<SasGoal>,
    },
}

/// Metric expression over numeric variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SasMetricExpression {
    /// A number
    Number(f64),
    /// The makespan
    TotalTime,
    /// Violations of the preference with the given name index
    IsViolated(usize),
    /// Value of a numeric variable
    Var(usize),
    /// Sum of the operands
    Sum(Vec<SasMetricExpression>),
    /// Difference of the operands, negation for a single operand
    Sub(Vec<SasMetricExpression>),
    /// Product of the operands
    Mul(Vec<SasMetricExpression>),
    /// Quotient of the operands
    Div(Vec<SasMetricExpression>),
}

impl SasMetricExpression {
    /// Evaluates the metric for a numeric state and a makespan. Violations count as `0`.
    pub fn evaluate(&self, state: &[f64], makespan: f64) -> Result<f64> {
        let operands = match self {
            SasMetricExpression::Number(num) => return Ok(*num),
            SasMetricExpression::TotalTime => return Ok(makespan),
            SasMetricExpression::IsViolated(_) => return Ok(0.0),
            SasMetricExpression::Var(var) => {
                return state
                    .get(*var)
                    .copied()
                    .ok_or_else(|| Error::UnknownVariable(format!("numeric variable {}", var)))
            }
            SasMetricExpression::Sum(ops)
            | SasMetricExpression::Sub(ops)
            | SasMetricExpression::Mul(ops)
            | SasMetricExpression::Div(ops) => ops,
        };
        let mut values = Vec::with_capacity(operands.len());
        for op in operands {
            values.push(op.evaluate(state, makespan)?);
        }
        let operator = match self {
            SasMetricExpression::Sub(_) => '-',
            SasMetricExpression::Mul(_) => '*',
            SasMetricExpression::Div(_) => '/',
            _ => '+',
        };
        fold_operands(operator, &values, || format!("{:?}", self))
    }
}

/// The plan metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SasMetric {
    /// Optimisation direction
    pub objective: Objective,
    /// Measured quantity
    pub expression: SasMetricExpression,
}

/// An action (or goal pseudo-action) over finite-domain variables
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SasAction {
    /// Position in [SasTask::actions] (or [SasTask::goals])
    pub index: usize,
    /// Name of the action, `<goal>` for goals
    pub name: String,
    /// Goal pseudo-action
    pub is_goal: bool,
    /// Duration constraints
    pub duration: Vec<SasDuration>,
    /// Conditions at start
    pub start_cond: Vec<SasCondition>,
    /// Invariants
    pub over_cond: Vec<SasCondition>,
    /// Conditions at end
    pub end_cond: Vec<SasCondition>,
    /// Numeric conditions at start
    pub start_num_cond: Vec<SasNumericCondition>,
    /// Numeric invariants
    pub over_num_cond: Vec<SasNumericCondition>,
    /// Numeric conditions at end
    pub end_num_cond: Vec<SasNumericCondition>,
    /// Effects at start
    pub start_eff: Vec<SasCondition>,
    /// Effects at end
    pub end_eff: Vec<SasCondition>,
    /// Numeric effects at start
    pub start_num_eff: Vec<SasNumericEffect>,
    /// Numeric effects at end
    pub end_num_eff: Vec<SasNumericEffect>,
    /// Preferences
    pub preferences: Vec<SasPreference>,
    /// Whether the duration does not depend on the state
    pub fixed_duration: bool,
    /// Value of each duration constraint, if the duration is fixed
    pub fixed_duration_value: Vec<f64>,
    /// Whether the cost does not depend on the state
    pub fixed_cost: bool,
    /// Increase of the metric caused by the action, if the cost is fixed
    pub fixed_cost_value: f64,
}

impl SasAction {
    /// All conditions in the order start, over all, end
    pub fn conditions(&self) -> impl Iterator<Item = &SasCondition> {
        self.start_cond
            .iter()
            .chain(self.over_cond.iter())
            .chain(self.end_cond.iter())
    }

    /// All effects in the order start, end
    pub fn effects(&self) -> impl Iterator<Item = &SasCondition> {
        self.start_eff.iter().chain(self.end_eff.iter())
    }

    /// All numeric effects in the order start, end
    pub fn numeric_effects(&self) -> impl Iterator<Item = &SasNumericEffect> {
        self.start_num_eff.iter().chain(self.end_num_eff.iter())
    }
}

/// A planning task over finite-domain and numeric variables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SasTask {
    /// Global value table
    pub values: Vec<SasValue>,
    #[serde(skip)]
    value_index: HashMap<String, ValueId>,
    /// Finite-domain variables
    pub variables: Vec<SasVariable>,
    /// Numeric variables
    pub numeric_variables: Vec<NumericVariable>,
    /// Actions
    pub actions: Vec<SasAction>,
    /// Goal pseudo-actions
    pub goals: Vec<SasAction>,
    /// Names of the preferences
    pub preference_names: Vec<String>,
    /// Trajectory constraints
    pub constraints: Vec<SasConstraint>,
    /// The plan metric, if any
    pub metric: Option<SasMetric>,
    /// Pairs of `(variable, value)` codes that never hold together, stored in both orders
    pub mutex: BTreeSet<(VarValue, VarValue)>,
    /// Mutex pairs whose second element is unreachable from the first
    pub permanent_mutex: BTreeSet<(VarValue, VarValue)>,
    /// Pairs of action indexes that can never be applied one after the other
    pub permanent_mutex_actions: BTreeSet<(usize, usize)>,
    /// Value of each variable at time `0`
    pub initial_state: Vec<Option<ValueId>>,
    /// Value of each numeric variable at time `0`
    pub numeric_initial_state: Vec<f64>,
    /// Actions having a condition on each `(variable, value)` code
    pub requirers: BTreeMap<VarValue, Vec<usize>>,
    /// Actions having an effect on each `(variable, value)` code
    pub producers: BTreeMap<VarValue, Vec<usize>>,
    /// Actions without any literal condition
    pub actions_without_conditions: Vec<usize>,
    /// Whether the metric reads the makespan
    pub metric_depends_on_duration: bool,
    /// Whether some action cost depends on the state
    pub variable_costs: bool,
}

impl Default for SasTask {
    fn default() -> Self {
        Self::new()
    }
}

impl SasTask {
    /// Creates an empty task with the values `<true>`, `<false>` and `<undefined>`
    pub fn new() -> Self {
        let mut task = Self {
            values: Vec::new(),
            value_index: HashMap::new(),
            variables: Vec::new(),
            numeric_variables: Vec::new(),
            actions: Vec::new(),
            goals: Vec::new(),
            preference_names: Vec::new(),
            constraints: Vec::new(),
            metric: None,
            mutex: BTreeSet::new(),
            permanent_mutex: BTreeSet::new(),
            permanent_mutex_actions: BTreeSet::new(),
            initial_state: Vec::new(),
            numeric_initial_state: Vec::new(),
            requirers: BTreeMap::new(),
            producers: BTreeMap::new(),
            actions_without_conditions: Vec::new(),
            metric_depends_on_duration: false,
            variable_costs: false,
        };
        for name in ["<true>", "<false>", "<undefined>"] {
            let index = ValueId(task.values.len());
            task.value_index.insert(name.to_string(), index);
            task.values.push(SasValue {
                index,
                name: name.to_string(),
                function: None,
            });
        }
        task
    }

    /// Returns the value with the given name, creating it if needed
    pub fn create_value(&mut self, name: &str, function: Option<FunctionId>) -> Result<ValueId> {
        if let Some(index) = self.value_index.get(name) {
            return Ok(*index);
        }
        let index = self.values.len();
        if index >= VarValue::CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "value",
                index,
            });
        }
        let index = ValueId(index);
        self.value_index.insert(name.to_string(), index);
        self.values.push(SasValue {
            index,
            name: name.to_string(),
            function,
        });
        Ok(index)
    }

    /// The value with the given name
    pub fn value_by_name(&self, name: &str) -> Option<ValueId> {
        self.value_index.get(name).copied()
    }

    /// Name of a value, `?` for an unknown index
    pub fn value_name(&self, value: ValueId) -> &str {
        self.values
            .get(value.value())
            .map(|v| v.name.as_str())
            .unwrap_or("?")
    }

    /// Adds a variable with an empty domain
    pub fn create_variable(&mut self, name: String) -> Result<usize> {
        let index = self.variables.len();
        if index >= VarValue::CAPACITY {
            return Err(Error::CapacityExceeded {
                what: "variable",
                index,
            });
        }
        self.variables.push(SasVariable {
            index,
            name,
            possible_values: Vec::new(),
            initial_values: Vec::new(),
        });
        Ok(index)
    }

    /// Adds a variable named after its index, e.g. `var3`
    pub fn create_anonymous_variable(&mut self) -> Result<usize> {
        let name = format!("var{}", self.variables.len());
        self.create_variable(name)
    }

    /// Adds a numeric variable
    pub fn create_numeric_variable(&mut self, name: String) -> usize {
        let index = self.numeric_variables.len();
        self.numeric_variables.push(NumericVariable {
            index,
            name,
            initial_values: Vec::new(),
        });
        index
    }

    /// Adds an action without conditions and effects
    pub fn create_action(&mut self, name: String) -> &mut SasAction {
        let index = self.actions.len();
        self.actions.push(SasAction {
            index,
            name,
            ..Default::default()
        });
        &mut self.actions[index]
    }

    /// Adds a goal pseudo-action named `<goal>`
    pub fn create_goal(&mut self) -> &mut SasAction {
        let index = self.goals.len();
        self.goals.push(SasAction {
            index,
            name: "<goal>".to_string(),
            is_goal: true,
            ..Default::default()
        });
        &mut self.goals[index]
    }

    /// Records that the two pairs never hold together
    pub fn add_mutex(&mut self, vv1: VarValue, vv2: VarValue) {
        self.mutex.insert((vv1, vv2));
        self.mutex.insert((vv2, vv1));
    }

    /// Returns true if the two pairs never hold together
    pub fn is_mutex(&self, vv1: VarValue, vv2: VarValue) -> bool {
        self.mutex.contains(&(vv1, vv2))
    }

    /// Returns true if `vv2` can never be reached once `vv1` holds
    pub fn is_permanent_mutex(&self, vv1: VarValue, vv2: VarValue) -> bool {
        self.permanent_mutex.contains(&(vv1, vv2))
    }

    /// Returns true if the two actions can never follow each other
    pub fn is_permanent_mutex_action(&self, a1: usize, a2: usize) -> bool {
        self.permanent_mutex_actions.contains(&(a1, a2))
    }

    /// Computes the value of every variable at time `0`
    pub fn compute_initial_state(&mut self) {
        self.initial_state = self
            .variables
            .iter()
            .map(SasVariable::initial_state_value)
            .collect();
        self.numeric_initial_state = self
            .numeric_variables
            .iter()
            .map(NumericVariable::initial_state_value)
            .collect();
    }

    /// Distinct `(variable, value)` codes required by the goals
    pub fn goal_list(&self) -> Result<Vec<VarValue>> {
        let mut list = Vec::new();
        for goal in &self.goals {
            for cond in goal.conditions() {
                let code = cond.code()?;
                if !list.contains(&code) {
                    list.push(code);
                }
            }
        }
        Ok(list)
    }

    fn fmt_expression(&self, f: &mut Formatter<'_>, exp: &SasExpression) -> std::fmt::Result {
        let (symbol, ops) = match exp {
            SasExpression::Number(num) => return write!(f, "{}", num),
            SasExpression::Var(var) => return write!(f, "{}", self.numeric_name(*var)),
            SasExpression::Duration => return write!(f, "?duration"),
            SasExpression::SharpT => return write!(f, "#t"),
            SasExpression::Sum(ops) => ("+", ops),
            SasExpression::Sub(ops) => ("-", ops),
            SasExpression::Mul(ops) => ("*", ops),
            SasExpression::Div(ops) => ("/", ops),
        };
        write!(f, "({}", symbol)?;
        for op in ops {
            write!(f, " ")?;
            self.fmt_expression(f, op)?;
        }
        write!(f, ")")
    }

    fn numeric_name(&self, var: usize) -> &str {
        self.numeric_variables
            .get(var)
            .map(|v| v.name.as_str())
            .unwrap_or("?")
    }

    fn variable_name(&self, var: usize) -> &str {
        self.variables
            .get(var)
            .map(|v| v.name.as_str())
            .unwrap_or("?")
    }

    fn preference_name(&self, index: usize) -> &str {
        self.preference_names
            .get(index)
            .map(String::as_str)
            .unwrap_or("?")
    }

    fn fmt_comparison(
        &self,
        f: &mut Formatter<'_>,
        comparator: Comparator,
        terms: &[SasExpression],
    ) -> std::fmt::Result {
        write!(f, "({}", comparator)?;
        for term in terms {
            write!(f, " ")?;
            self.fmt_expression(f, term)?;
        }
        write!(f, ")")
    }

    fn fmt_condition(&self, f: &mut Formatter<'_>, cond: &SasCondition) -> std::fmt::Result {
        write!(
            f,
            "(= {} {})",
            self.variable_name(cond.var),
            self.value_name(cond.value)
        )
    }

    fn fmt_goal(&self, f: &mut Formatter<'_>, goal: &SasGoal) -> std::fmt::Result {
        let (connective, goals) = match goal {
            SasGoal::Value { var, value } => {
                return write!(
                    f,
                    "(= {} {})",
                    self.variable_name(*var),
                    self.value_name(*value)
                )
            }
            SasGoal::Constant(value) => return write!(f, "{}", value),
            SasGoal::Compare { comparator, terms } => {
                return self.fmt_comparison(f, *comparator, terms)
            }
            SasGoal::At { time, goal } => {
                write!(f, "({} ", time)?;
                self.fmt_goal(f, goal)?;
                return write!(f, ")");
            }
            SasGoal::Not(goal) => ("not", std::slice::from_ref(goal.as_ref())),
            SasGoal::And(goals) => ("and", goals.as_slice()),
            SasGoal::Or(goals) => ("or", goals.as_slice()),
        };
        write!(f, "({}", connective)?;
        for goal in goals {
            write!(f, " ")?;
            self.fmt_goal(f, goal)?;
        }
        write!(f, ")")
    }

    fn fmt_constraint(&self, f: &mut Formatter<'_>, constraint: &SasConstraint) -> std::fmt::Result {
        match constraint {
            SasConstraint::And(terms) => {
                write!(f, "(and")?;
                for term in terms {
                    write!(f, " ")?;
                    self.fmt_constraint(f, term)?;
                }
            }
            SasConstraint::Preference {
                name_index,
                constraint,
            } => {
                write!(f, "(preference {} ", self.preference_name(*name_index))?;
                self.fmt_constraint(f, constraint)?;
            }
            SasConstraint::GoalPreference { name_index, goal } => {
                write!(f, "(preference {} ", self.preference_name(*name_index))?;
                self.fmt_goal(f, goal)?;
            }
            SasConstraint::Temporal { kind, time, goals } => {
                write!(f, "({}", kind)?;
                for t in time {
                    write!(f, " {}", t)?;
                }
                for goal in goals {
                    write!(f, " ")?;
                    self.fmt_goal(f, goal)?;
                }
            }
        }
        write!(f, ")")
    }

    fn fmt_metric(&self, f: &mut Formatter<'_>, metric: &SasMetricExpression) -> std::fmt::Result {
        let (symbol, ops) = match metric {
            SasMetricExpression::Number(num) => return write!(f, "{}", num),
            SasMetricExpression::TotalTime => return write!(f, "total-time"),
            SasMetricExpression::IsViolated(index) => {
                return write!(f, "(is-violated {})", self.preference_name(*index))
            }
            SasMetricExpression::Var(var) => return write!(f, "{}", self.numeric_name(*var)),
            SasMetricExpression::Sum(ops) => ("+", ops),
            SasMetricExpression::Sub(ops) => ("-", ops),
            SasMetricExpression::Mul(ops) => ("*", ops),
            SasMetricExpression::Div(ops) => ("/", ops),
        };
        write!(f, "({}", symbol)?;
        for op in ops {
            write!(f, " ")?;
            self.fmt_metric(f, op)?;
        }
        write!(f, ")")
    }

    fn fmt_action(&self, f: &mut Formatter<'_>, action: &SasAction) -> std::fmt::Result {
        writeln!(f, "ACTION {}", action.name)?;
        for d in &action.duration {
            write!(f, " :duration ")?;
            if d.time != TimeSpecifier::None {
                write!(f, "{} ", d.time)?;
            }
            write!(f, "({} ?duration ", d.comparator)?;
            self.fmt_expression(f, &d.exp)?;
            writeln!(f, ")")?;
        }
        let conditions = [
            ("at start", &action.start_cond, &action.start_num_cond),
            ("over all", &action.over_cond, &action.over_num_cond),
            ("at end", &action.end_cond, &action.end_num_cond),
        ];
        for (time, conds, num_conds) in conditions {
            for cond in conds {
                write!(f, " :con ({} ", time)?;
                self.fmt_condition(f, cond)?;
                writeln!(f, ")")?;
            }
            for cond in num_conds {
                write!(f, " :con ({} ", time)?;
                self.fmt_comparison(f, cond.comparator, &cond.terms)?;
                writeln!(f, ")")?;
            }
        }
        for pref in &action.preferences {
            write!(f, " :con (preference {} ", self.preference_name(pref.name_index))?;
            self.fmt_goal(f, &pref.goal)?;
            writeln!(f, ")")?;
        }
        let effects = [
            ("at start", &action.start_eff, &action.start_num_eff),
            ("at end", &action.end_eff, &action.end_num_eff),
        ];
        for (time, effs, num_effs) in effects {
            for eff in effs {
                write!(f, " :eff ({} ", time)?;
                self.fmt_condition(f, eff)?;
                writeln!(f, ")")?;
            }
            for eff in num_effs {
                write!(
                    f,
                    " :eff ({} ({} {} ",
                    time,
                    eff.assignment,
                    self.numeric_name(eff.var)
                )?;
                self.fmt_expression(f, &eff.exp)?;
                writeln!(f, "))")?;
            }
        }
        Ok(())
    }
}

impl Display for SasTask {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "OBJECTS:")?;
        for value in &self.values {
            writeln!(f, "{}:{}", value.index.value(), value.name)?;
        }
        writeln!(f, "VARIABLES:")?;
        for var in &self.variables {
            writeln!(f, "{}:{}", var.index, var.name)?;
            for value in &var.possible_values {
                writeln!(f, "* {}", self.value_name(*value))?;
            }
        }
        for var in &self.numeric_variables {
            writeln!(f, "{}:{}", var.index, var.name)?;
        }
        writeln!(f, "INITIAL STATE:")?;
        for var in &self.variables {
            if var.initial_values.is_empty() {
                writeln!(f, "Uninitialized: {}", var.name)?;
                continue;
            }
            let facts: Vec<String> = var
                .initial_values
                .iter()
                .map(|(time, value)| {
                    format!("(at {} (= {} {}))", time, var.name, self.value_name(*value))
                })
                .collect();
            writeln!(f, "{}", facts.join(" "))?;
        }
        for var in &self.numeric_variables {
            if var.initial_values.is_empty() {
                writeln!(f, "Uninitialized: {}", var.name)?;
                continue;
            }
            let facts: Vec<String> = var
                .initial_values
                .iter()
                .map(|(time, value)| format!("(at {} (= {} {}))", time, var.name, value))
                .collect();
            writeln!(f, "{}", facts.join(" "))?;
        }
        for action in self.actions.iter().chain(self.goals.iter()) {
            self.fmt_action(f, action)?;
        }
        writeln!(f, "CONSTRAINTS:")?;
        for constraint in &self.constraints {
            self.fmt_constraint(f, constraint)?;
            writeln!(f)?;
        }
        if let Some(metric) = &self.metric {
            writeln!(f, "METRIC:")?;
            let objective = match metric.objective {
                Objective::Minimize => "MINIMIZE",
                Objective::Maximize => "MAXIMIZE",
            };
            write!(f, "{} ", objective)?;
            self.fmt_metric(f, &metric.expression)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use test_log::test;

    fn boolean_variable(task: &mut SasTask, name: &str) -> usize {
        let var = task.create_variable(name.to_string()).unwrap();
        task.variables[var].add_possible_value(ValueId::FALSE);
        task.variables[var].add_possible_value(ValueId::TRUE);
        var
    }

    #[test]
    fn values() {
        let mut task = SasTask::new();
        assert_eq!(task.values.len(), 3);
        assert_eq!(task.value_name(ValueId::TRUE), "<true>");
        assert_eq!(task.value_name(ValueId::FALSE), "<false>");
        assert_eq!(task.value_name(ValueId::UNDEFINED), "<undefined>");
        let a = task.create_value("a", None).unwrap();
        assert_eq!(a, ValueId(3));
        assert_eq!(task.create_value("a", Some(FunctionId(2))).unwrap(), a);
        assert_eq!(task.value_by_name("a"), Some(a));
        assert_eq!(task.value_by_name("b"), None);
        assert_eq!(task.value_name(ValueId(42)), "?");
    }

    #[test]
    fn initial_values() {
        let mut task = SasTask::new();
        let p = boolean_variable(&mut task, "(p)");
        let var = &mut task.variables[p];
        assert!(var.is_boolean());
        var.add_initial_value(ValueId::TRUE, false, 0.0).unwrap();
        var.add_initial_value(ValueId::TRUE, true, 5.0).unwrap();
        assert_eq!(var.initial_state_value(), Some(ValueId::FALSE));
        assert_eq!(var.opposite_value(ValueId::FALSE).unwrap(), ValueId::TRUE);
        assert!(matches!(
            var.add_initial_value(ValueId::UNDEFINED, true, 0.0),
            Err(Error::InvalidValue { .. })
        ));

        let a = task.create_value("a", None).unwrap();
        let b = task.create_value("b", None).unwrap();
        let c = task.create_value("c", None).unwrap();
        let at = task.create_anonymous_variable().unwrap();
        assert_eq!(task.variables[at].name, "var1");
        for value in [a, b, c] {
            task.variables[at].add_possible_value(value);
        }
        let var = &mut task.variables[at];
        assert_eq!(var.possible_value_index(c), Some(2));
        assert!(matches!(
            var.add_initial_value(a, false, 0.0),
            Err(Error::NoOppositeValue(_))
        ));
        assert!(matches!(
            var.opposite_value(a),
            Err(Error::NoOppositeValue(_))
        ));
        assert_eq!(var.initial_state_value(), None);
    }

    #[test]
    fn numeric_initial_values() {
        let mut task = SasTask::new();
        let fuel = task.create_numeric_variable("(fuel)".to_string());
        let var = &mut task.numeric_variables[fuel];
        assert_eq!(var.initial_state_value(), 0.0);
        var.add_initial_value(10.0, 0.0).unwrap();
        var.add_initial_value(10.0, 0.0).unwrap();
        var.add_initial_value(3.0, 4.0).unwrap();
        assert_eq!(var.initial_values.len(), 2);
        assert!(matches!(
            var.add_initial_value(11.0, 0.0),
            Err(Error::ContradictoryInitialValue { .. })
        ));
        task.compute_initial_state();
        assert_eq!(task.numeric_initial_state, vec![10.0]);
    }

    #[test]
    fn mutex() {
        let mut task = SasTask::new();
        let vv1 = VarValue::new(0, ValueId::TRUE).unwrap();
        let vv2 = VarValue::new(1, ValueId(4)).unwrap();
        task.add_mutex(vv1, vv2);
        assert!(task.is_mutex(vv1, vv2));
        assert!(task.is_mutex(vv2, vv1));
        assert!(!task.is_mutex(vv1, vv1));
        assert!(!task.is_permanent_mutex(vv1, vv2));
    }

    #[test]
    fn expressions() {
        let state = [4.0, 2.0];
        let exp = SasExpression::Sub(vec![SasExpression::Var(0)]);
        assert_eq!(exp.evaluate(&state, 0.0).unwrap(), -4.0);
        let exp = SasExpression::Div(vec![
            SasExpression::Mul(vec![SasExpression::Var(0), SasExpression::Duration]),
            SasExpression::Var(1),
        ]);
        assert_eq!(exp.evaluate(&state, 3.0).unwrap(), 6.0);
        let exp = SasExpression::Div(vec![SasExpression::Number(1.0), SasExpression::Number(0.0)]);
        assert!(matches!(
            exp.evaluate(&state, 0.0),
            Err(Error::DivisionByZero(_))
        ));
        assert!(SasExpression::Var(7).evaluate(&state, 0.0).is_err());

        let metric = SasMetricExpression::Sum(vec![
            SasMetricExpression::TotalTime,
            SasMetricExpression::Var(1),
            SasMetricExpression::IsViolated(0),
        ]);
        assert_eq!(metric.evaluate(&state, 10.0).unwrap(), 12.0);
    }

    #[test]
    fn display() {
        let mut task = SasTask::new();
        let p = boolean_variable(&mut task, "(p)");
        task.variables[p]
            .add_initial_value(ValueId::TRUE, true, 0.0)
            .unwrap();
        let fuel = task.create_numeric_variable("(fuel)".to_string());
        let action = task.create_action("go".to_string());
        action.start_cond.push(SasCondition::new(p, ValueId::TRUE));
        action.end_num_eff.push(SasNumericEffect {
            assignment: Assignment::Decrease,
            var: fuel,
            exp: SasExpression::Number(1.0),
        });
        task.create_goal()
            .start_cond
            .push(SasCondition::new(p, ValueId::FALSE));
        task.metric = Some(SasMetric {
            objective: Objective::Minimize,
            expression: SasMetricExpression::TotalTime,
        });
        let text = format!("{}", task);
        assert!(text.starts_with("OBJECTS:\n0:<true>\n1:<false>\n2:<undefined>\nVARIABLES:\n0:(p)\n* <false>\n* <true>\n0:(fuel)\n"));
        assert!(text.contains("(at 0 (= (p) <true>))"));
        assert!(text.contains("Uninitialized: (fuel)"));
        assert!(text.contains("ACTION go\n :con (at start (= (p) <true>))\n :eff (at end (decrease (fuel) 1))\n"));
        assert!(text.contains("ACTION <goal>\n :con (at start (= (p) <false>))\n"));
        assert!(text.ends_with("METRIC:\nMINIMIZE total-time\n"));
        assert_eq!(task.goal_list().unwrap().len(), 1);
    }
}
