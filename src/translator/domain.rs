//! Creation of the finite-domain variables and their initial values.
use super::Translator;
use crate::config::SplitStrategy;
use crate::datatypes::{GroundedGoal, ObjectId, ValueId, VarId, VarValue};
use crate::error::{Error, Result};
use crate::mutex_graph::MutexGraph;

/// Where each grounded variable ended up in the [SasTask][crate::sas::SasTask]
#[derive(Debug, Default)]
pub(super) struct LiteralTranslation {
    /// numeric variable of a numeric grounded variable
    pub(super) numeric: Vec<Option<usize>>,
    /// SAS variable of a finite-domain grounded variable
    pub(super) finite: Vec<Option<usize>>,
    /// `(variable, value)` codes meaning "this proposition holds"
    pub(super) literals: Vec<Vec<VarValue>>,
}

impl LiteralTranslation {
    fn new(num_vars: usize) -> Self {
        Self {
            numeric: vec![None; num_vars],
            finite: vec![None; num_vars],
            literals: vec![Vec::new(); num_vars],
        }
    }

    /// The code of a proposition
    pub(super) fn literal(&self, var: VarId) -> Option<VarValue> {
        self.literals.get(var.value()).and_then(|codes| codes.first().copied())
    }
}

/// Marks the propositions the goal requires to be false, `positive` is false below a negation
fn mark_negated(goal: &GroundedGoal, positive: bool, negated: &mut [bool]) {
    match goal {
        GroundedGoal::Fluent { var, value, equal } => {
            if ((*value == ObjectId::TRUE) == *equal) != positive {
                if let Some(flag) = negated.get_mut(var.value()) {
                    *flag = true;
                }
            }
        }
        GroundedGoal::And(goals) | GroundedGoal::Or(goals) => {
            for goal in goals {
                mark_negated(goal, positive, negated);
            }
        }
        GroundedGoal::Not(goal) => mark_negated(goal, !positive, negated),
        GroundedGoal::Imply(left, right) => {
            mark_negated(left, !positive, negated);
            mark_negated(right, positive, negated);
        }
        GroundedGoal::At { goal, .. }
        | GroundedGoal::Exists { goal, .. }
        | GroundedGoal::Forall { goal, .. } => mark_negated(goal, positive, negated),
        _ => {}
    }
}

impl Translator<'_> {
    /// Propositions that some condition, preference or goal requires to be false
    pub(super) fn negated_literals(&self) -> Vec<bool> {
        let mut negated = vec![false; self.grounded.variables.len()];
        for action in self.actions.iter().copied().chain(self.grounded.goals.iter()) {
            for cond in action.conditions() {
                if cond.value == ObjectId::FALSE && self.fixpoint.is_literal[cond.var.value()] {
                    negated[cond.var.value()] = true;
                }
            }
            for preference in &action.preferences {
                mark_negated(&preference.goal, true, &mut negated);
            }
        }
        for (var, flag) in negated.iter_mut().enumerate() {
            *flag &= self.fixpoint.is_literal[var];
        }
        negated
    }

    /// Creates the numeric variables and the variables of non-boolean functions
    pub(super) fn create_variables(&mut self) -> Result<()> {
        let grounded = self.grounded;
        let task = &grounded.task;
        self.trans = LiteralTranslation::new(grounded.variables.len());
        for var in &grounded.variables {
            let index = var.index.value();
            if var.is_numeric {
                let name = grounded.var_name(var.index);
                self.trans.numeric[index] = Some(self.sas.create_numeric_variable(name));
            } else if !self.fixpoint.is_literal[index] {
                let sas_var = self.sas.create_variable(grounded.var_name(var.index))?;
                let value_types = task
                    .functions
                    .get(var.function.value())
                    .map(|f| f.value_types.as_slice())
                    .unwrap_or_default();
                for object in &task.objects {
                    if task.compatible_types(&object.types, value_types) {
                        let value = self.sas.create_value(&object.name, None)?;
                        self.sas.variables[sas_var].add_possible_value(value);
                    }
                }
                self.trans.finite[index] = Some(sas_var);
            }
        }
        Ok(())
    }

    /// Boolean variable standing for a single proposition
    fn boolean_variable(&mut self, var: VarId) -> Result<VarValue> {
        let sas_var = self.sas.create_variable(self.grounded.var_name(var))?;
        let variable = &mut self.sas.variables[sas_var];
        variable.add_possible_value(ValueId::FALSE);
        variable.add_possible_value(ValueId::TRUE);
        let code = VarValue::new(sas_var, ValueId::TRUE)?;
        self.trans.literals[var.value()].push(code);
        Ok(code)
    }

    /// Packs the propositions into multi-valued variables, one per mutex group
    pub(super) fn group_literals(&mut self, negated: &[bool]) -> Result<()> {
        let mut graph = MutexGraph::new();
        for (var, _) in self.fixpoint.is_literal.iter().enumerate().filter(|(_, l)| **l) {
            graph.add_vertex(VarId(var));
        }
        for (v1, v2) in self.fixpoint.mutex.pairs() {
            graph.add_adjacent(v1, v2);
        }
        match self.config.split {
            SplitStrategy::Cliques => graph.split(),
            SplitStrategy::Components => graph.split_components(),
        }
        for group in graph.groups() {
            if group.literals.len() == 1 {
                self.boolean_variable(group.literals[0])?;
            } else if group.literals.iter().any(|l| negated[l.value()]) {
                for &literal in &group.literals {
                    if self.trans.literals[literal.value()].is_empty() {
                        self.boolean_variable(literal)?;
                    }
                }
            } else {
                let sas_var = self.sas.create_anonymous_variable()?;
                for &literal in &group.literals {
                    let function = self.grounded.variables[literal.value()].function;
                    let value = self
                        .sas
                        .create_value(&self.grounded.var_name(literal), Some(function))?;
                    self.sas.variables[sas_var].add_possible_value(value);
                    self.trans.literals[literal.value()].push(VarValue::new(sas_var, value)?);
                }
                if group.none_of_those {
                    self.sas.variables[sas_var].add_possible_value(ValueId::UNDEFINED);
                }
            }
        }
        self.remove_multiple_values();
        Ok(())
    }

    /// Every proposition becomes its own boolean variable
    pub(super) fn boolean_literals(&mut self) -> Result<()> {
        for var in 0..self.fixpoint.is_literal.len() {
            if self.fixpoint.is_literal[var] {
                self.boolean_variable(VarId(var))?;
            }
        }
        Ok(())
    }

    /// Keeps only the first code of a proposition that landed in several groups.
    ///
    /// In the other groups the proposition is replaced by `<undefined>`, or dropped if the group
    /// can already be undefined.
    fn remove_multiple_values(&mut self) {
        for codes in &mut self.trans.literals {
            for code in codes.iter().skip(1) {
                let variable = &mut self.sas.variables[code.var()];
                if let Some(index) = variable.possible_value_index(code.value()) {
                    if variable.possible_value_index(ValueId::UNDEFINED).is_some() {
                        variable.possible_values.remove(index);
                    } else {
                        variable.possible_values[index] = ValueId::UNDEFINED;
                    }
                }
            }
            codes.truncate(1);
        }
    }

    /// Copies the initial values of the grounded variables.
    ///
    /// A proposition that is false at time `0` is left out unless its variable is boolean, so the
    /// variable keeps the value of another proposition of its group. Variables without a value at
    /// time `0` become false, or `<undefined>` if they are not boolean.
    pub(super) fn set_initial_values(&mut self) -> Result<()> {
        let grounded = self.grounded;
        let task = &grounded.task;
        for var in &grounded.variables {
            let index = var.index.value();
            if let Some(numeric) = self.trans.numeric[index] {
                for (time, value) in &var.initial_values {
                    let number = value.number().ok_or_else(|| {
                        Error::InvalidTask(format!(
                            "non-numeric initial value of {}",
                            grounded.var_name(var.index)
                        ))
                    })?;
                    self.sas.numeric_variables[numeric].add_initial_value(number, *time)?;
                }
            } else if let Some(finite) = self.trans.finite[index] {
                for (time, value) in &var.initial_values {
                    let name = value.object().map(|o| task.object_name(o)).unwrap_or("?");
                    let sas_value = self.sas.value_by_name(name).ok_or_else(|| Error::InvalidValue {
                        variable: grounded.var_name(var.index),
                        value: name.to_string(),
                    })?;
                    self.sas.variables[finite].add_initial_value(sas_value, true, *time)?;
                }
            } else if let Some(code) = self.trans.literal(var.index) {
                let variable = &mut self.sas.variables[code.var()];
                for (time, value) in &var.initial_values {
                    let is_true = value.object() == Some(ObjectId::TRUE);
                    if is_true || variable.is_boolean() {
                        variable.add_initial_value(code.value(), is_true, *time)?;
                    } else if *time > 0.0 {
                        if variable.possible_value_index(ValueId::UNDEFINED).is_none() {
                            variable.add_possible_value(ValueId::UNDEFINED);
                        }
                        variable.add_initial_value(ValueId::UNDEFINED, true, *time)?;
                    }
                }
            }
        }
        for variable in &mut self.sas.variables {
            if variable.initial_state_value().is_some() {
                continue;
            }
            if variable.is_boolean() {
                variable.add_initial_value(ValueId::TRUE, false, 0.0)?;
            } else {
                if variable.possible_value_index(ValueId::UNDEFINED).is_none() {
                    variable.add_possible_value(ValueId::UNDEFINED);
                }
                variable.add_initial_value(ValueId::UNDEFINED, true, 0.0)?;
            }
        }
        Ok(())
    }
}
