//! Compilation of the variables no action modifies.
//!
//! A static variable keeps its initial value forever, so every condition on it is decided once and
//! for all: satisfied conditions are erased, actions with violated ones are dropped and numeric
//! reads become constants. The remaining variables are renumbered, boolean and object variables
//! first, numeric ones last.
use std::collections::HashMap;

use super::GroundingContext;
use crate::datatypes::{
    Comparator, Fact, FunctionId, GroundedAction, GroundedCondition, GroundedConstraint,
    GroundedExpression, GroundedGoal, GroundedMetricExpression, GroundedNumericCondition,
    ObjectId, ParsedTask, PartialExpression, PartialTerm, Value, VarId,
};
use crate::error::Result;

/// What is known about the value of a variable over the whole plan
#[derive(Debug, Clone, Copy, PartialEq)]
enum Fixed {
    Changing,
    Undefined,
    Value(Value),
}

type FactIndex<'t> = HashMap<(FunctionId, &'t [ObjectId]), Vec<&'t Fact>>;

fn facts_by_variable(task: &ParsedTask) -> FactIndex<'_> {
    let mut index: FactIndex<'_> = HashMap::new();
    for fact in &task.init {
        index
            .entry((fact.function, fact.parameters.as_slice()))
            .or_default()
            .push(fact);
    }
    index
}

/// The expression as a [GroundedExpression] if it only contains numbers
fn constant(exp: &PartialExpression) -> Option<GroundedExpression> {
    let operands = |ops: &[PartialExpression]| ops.iter().map(constant).collect::<Option<Vec<_>>>();
    match exp {
        PartialExpression::Number(num) => Some(GroundedExpression::Number(*num)),
        PartialExpression::Sum(ops) => operands(ops).map(GroundedExpression::Sum),
        PartialExpression::Sub(ops) => operands(ops).map(GroundedExpression::Sub),
        PartialExpression::Mul(ops) => operands(ops).map(GroundedExpression::Mul),
        PartialExpression::Div(ops) => operands(ops).map(GroundedExpression::Div),
        _ => None,
    }
}

/// Rewrites the grounded task for a fixed assignment of the static variables
#[derive(Debug)]
struct Substitution<'s> {
    fixed: &'s [Fixed],
    new_index: &'s [Option<VarId>],
}

impl Substitution<'_> {
    fn lookup(&self, var: VarId) -> (Fixed, Option<VarId>) {
        (self.fixed[var.value()], self.new_index[var.value()])
    }

    /// Returns false if the action can never be applied
    fn action(&self, action: &mut GroundedAction) -> Result<bool> {
        for duration in action.duration.iter_mut() {
            if !self.expression(&mut duration.exp)? {
                return Ok(false);
            }
        }
        if let [duration] = action.duration.as_slice() {
            if let GroundedExpression::Number(value) = duration.exp {
                if value <= 0.0
                    && matches!(
                        duration.comparator,
                        Comparator::Eq | Comparator::Less | Comparator::LessEq
                    )
                {
                    log::trace!("{}: non-positive duration", action.name);
                    return Ok(false);
                }
            }
        }
        for conditions in [
            &mut action.start_cond,
            &mut action.over_cond,
            &mut action.end_cond,
            &mut action.start_eff,
            &mut action.end_eff,
        ] {
            if !self.conditions(conditions) {
                return Ok(false);
            }
        }
        for conditions in [
            &mut action.start_num_cond,
            &mut action.over_num_cond,
            &mut action.end_num_cond,
        ] {
            if !self.numeric_conditions(conditions)? {
                return Ok(false);
            }
        }
        for effect in action
            .start_num_eff
            .iter_mut()
            .chain(action.end_num_eff.iter_mut())
        {
            match self.lookup(effect.var) {
                (Fixed::Changing, Some(var)) => effect.var = var,
                _ => return Ok(false),
            }
            if !self.expression(&mut effect.exp)? {
                return Ok(false);
            }
        }
        for preference in action.preferences.iter_mut() {
            if !self.goal(&mut preference.goal)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn conditions(&self, conditions: &mut Vec<GroundedCondition>) -> bool {
        let mut i = 0;
        while i < conditions.len() {
            let cond = conditions[i];
            match self.lookup(cond.var) {
                (Fixed::Changing, Some(var)) => {
                    conditions[i].var = var;
                    i += 1;
                }
                (Fixed::Value(Value::Object(value)), _) if value == cond.value => {
                    conditions.remove(i);
                }
                _ => return false,
            }
        }
        true
    }

    fn numeric_conditions(&self, conditions: &mut [GroundedNumericCondition]) -> Result<bool> {
        for cond in conditions.iter_mut() {
            for term in cond.terms.iter_mut() {
                if !self.expression(term)? {
                    return Ok(false);
                }
            }
            if let [GroundedExpression::Number(left), GroundedExpression::Number(right)] =
                cond.terms.as_slice()
            {
                if !cond.comparator.holds(*left, *right) {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Returns false if the expression reads an undefined variable
    fn expression(&self, exp: &mut GroundedExpression) -> Result<bool> {
        let replacement = match exp {
            GroundedExpression::Var(var) => match self.lookup(*var) {
                (Fixed::Changing, Some(new)) => {
                    *var = new;
                    None
                }
                (Fixed::Value(Value::Number(num)), _) => Some(GroundedExpression::Number(num)),
                (Fixed::Value(Value::Object(obj)), _) => Some(GroundedExpression::Object(obj)),
                _ => return Ok(false),
            },
            GroundedExpression::Sum(ops)
            | GroundedExpression::Sub(ops)
            | GroundedExpression::Mul(ops)
            | GroundedExpression::Div(ops) => {
                for op in ops.iter_mut() {
                    if !self.expression(op)? {
                        return Ok(false);
                    }
                }
                None
            }
            _ => None,
        };
        if let Some(replacement) = replacement {
            *exp = replacement;
        } else if !matches!(exp, GroundedExpression::Number(_)) {
            if let Some(value) = exp.evaluate(None)? {
                *exp = GroundedExpression::Number(value);
            }
        }
        Ok(true)
    }

    fn partial_expression(&self, exp: &mut PartialExpression) -> Result<bool> {
        let replacement = match exp {
            PartialExpression::Var(var) => match self.lookup(*var) {
                (Fixed::Changing, Some(new)) => {
                    *var = new;
                    None
                }
                (Fixed::Value(Value::Number(num)), _) => Some(PartialExpression::Number(num)),
                (Fixed::Value(Value::Object(obj)), _) => {
                    Some(PartialExpression::Term(PartialTerm::Object(obj)))
                }
                _ => return Ok(false),
            },
            PartialExpression::Sum(ops)
            | PartialExpression::Sub(ops)
            | PartialExpression::Mul(ops)
            | PartialExpression::Div(ops) => {
                for op in ops.iter_mut() {
                    if !self.partial_expression(op)? {
                        return Ok(false);
                    }
                }
                None
            }
            _ => None,
        };
        if let Some(replacement) = replacement {
            *exp = replacement;
        } else if !matches!(exp, PartialExpression::Number(_)) {
            if let Some(value) = constant(exp).map(|c| c.evaluate(None)).transpose()?.flatten() {
                *exp = PartialExpression::Number(value);
            }
        }
        Ok(true)
    }

    /// Returns false if the goal reads an undefined variable
    fn goal(&self, goal: &mut GroundedGoal) -> Result<bool> {
        let replacement = match goal {
            GroundedGoal::Fluent { var, value, equal } => match self.lookup(*var) {
                (Fixed::Changing, Some(new)) => {
                    *var = new;
                    None
                }
                (Fixed::Value(Value::Object(obj)), _) => {
                    Some(GroundedGoal::Constant((obj == *value) == *equal))
                }
                _ => return Ok(false),
            },
            GroundedGoal::And(goals) | GroundedGoal::Or(goals) => {
                for g in goals.iter_mut() {
                    if !self.goal(g)? {
                        return Ok(false);
                    }
                }
                None
            }
            GroundedGoal::Not(g)
            | GroundedGoal::At { goal: g, .. }
            | GroundedGoal::Exists { goal: g, .. }
            | GroundedGoal::Forall { goal: g, .. } => {
                if !self.goal(g)? {
                    return Ok(false);
                }
                None
            }
            GroundedGoal::Imply(premise, conclusion) => {
                if !self.goal(premise)? || !self.goal(conclusion)? {
                    return Ok(false);
                }
                None
            }
            GroundedGoal::Compare { terms, .. } => {
                for term in terms.iter_mut() {
                    if !self.partial_expression(term)? {
                        return Ok(false);
                    }
                }
                None
            }
            GroundedGoal::UngroundedFluent { .. }
            | GroundedGoal::Equality { .. }
            | GroundedGoal::Constant(_) => None,
        };
        if let Some(replacement) = replacement {
            *goal = replacement;
        }
        Ok(true)
    }

    fn constraint(&self, constraint: &mut GroundedConstraint) -> Result<bool> {
        match constraint {
            GroundedConstraint::And(constraints) => {
                for c in constraints.iter_mut() {
                    if !self.constraint(c)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            GroundedConstraint::Preference { constraint, .. } => self.constraint(constraint),
            GroundedConstraint::GoalPreference { goal, .. } => self.goal(goal),
            GroundedConstraint::Temporal { goals, .. } => {
                for goal in goals.iter_mut() {
                    if !self.goal(goal)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn metric(&self, exp: &mut GroundedMetricExpression) {
        let replacement = match exp {
            GroundedMetricExpression::Var(var) => match self.lookup(*var) {
                (Fixed::Changing, Some(new)) => {
                    *var = new;
                    None
                }
                (Fixed::Value(Value::Number(num)), _) => Some(GroundedMetricExpression::Number(num)),
                (fixed, _) => {
                    log::warn!("metric reads {} with value {:?}, using 0", var, fixed);
                    Some(GroundedMetricExpression::Number(0.0))
                }
            },
            GroundedMetricExpression::Sum(ops)
            | GroundedMetricExpression::Sub(ops)
            | GroundedMetricExpression::Mul(ops)
            | GroundedMetricExpression::Div(ops) => {
                ops.iter_mut().for_each(|op| self.metric(op));
                None
            }
            _ => None,
        };
        if let Some(replacement) = replacement {
            *exp = replacement;
        }
    }

    fn actions(&self, actions: Vec<GroundedAction>) -> Result<Vec<GroundedAction>> {
        let mut kept = Vec::with_capacity(actions.len());
        for mut action in actions {
            if self.action(&mut action)? {
                action.index = kept.len();
                kept.push(action);
            } else {
                log::trace!("{}: violates a static condition", action.name);
            }
        }
        Ok(kept)
    }
}

impl GroundingContext {
    /// Removes the static variables until none is left
    pub(super) fn remove_static_variables(&mut self, task: &ParsedTask) -> Result<()> {
        log::info!("[Start] removing static variables");
        let facts = facts_by_variable(task);
        let mut removed = 0;
        loop {
            let count = self.remove_static_pass(task, &facts)?;
            if count == 0 {
                break;
            }
            removed += count;
        }
        self.stats.static_variables += removed;
        log::info!(
            "[Done] removing static variables: {} removed, {} variables left",
            removed,
            self.variables.len()
        );
        Ok(())
    }

    fn fixed_values(&self, task: &ParsedTask, facts: &FactIndex<'_>) -> Vec<Fixed> {
        let mut changing = vec![false; self.variables.len()];
        for action in &self.actions {
            for eff in action.start_eff.iter().chain(action.end_eff.iter()) {
                changing[eff.var.value()] = true;
            }
            for eff in action.numeric_effects() {
                changing[eff.var.value()] = true;
            }
        }
        self.variables
            .iter()
            .zip(changing)
            .map(|(var, changing)| {
                if changing {
                    return Fixed::Changing;
                }
                match facts
                    .get(&(var.function, var.params.as_slice()))
                    .map(Vec::as_slice)
                    .unwrap_or_default()
                {
                    [] if task.is_boolean_function(var.function) => {
                        Fixed::Value(Value::Object(ObjectId::FALSE))
                    }
                    [] => Fixed::Undefined,
                    [fact] if fact.time <= 0.0 => Fixed::Value(fact.value),
                    _ => Fixed::Changing,
                }
            })
            .collect()
    }

    /// Returns the number of variables removed in this pass
    fn remove_static_pass(&mut self, task: &ParsedTask, facts: &FactIndex<'_>) -> Result<usize> {
        let fixed = self.fixed_values(task, facts);
        let count = fixed.iter().filter(|f| **f != Fixed::Changing).count();
        if count == 0 {
            return Ok(0);
        }
        let mut new_index = vec![None; self.variables.len()];
        let mut next = 0;
        for numeric in [false, true] {
            for (i, var) in self.variables.iter().enumerate() {
                if fixed[i] == Fixed::Changing && var.is_numeric == numeric {
                    new_index[i] = Some(VarId(next));
                    next += 1;
                }
            }
        }
        let substitution = Substitution {
            fixed: &fixed,
            new_index: &new_index,
        };

        let before = self.actions.len() + self.goals.len();
        self.actions = substitution.actions(std::mem::take(&mut self.actions))?;
        self.goals = substitution.actions(std::mem::take(&mut self.goals))?;
        self.stats.dropped_actions += before - self.actions.len() - self.goals.len();

        let mut constraints = Vec::with_capacity(self.constraints.len());
        for mut constraint in std::mem::take(&mut self.constraints) {
            if substitution.constraint(&mut constraint)? {
                constraints.push(constraint);
            } else {
                log::debug!("dropping a constraint on an undefined variable");
            }
        }
        self.constraints = constraints;
        if let Some(metric) = &mut self.metric {
            substitution.metric(&mut metric.expression);
        }

        let mut slots = vec![None; next];
        for (i, mut var) in std::mem::take(&mut self.variables).into_iter().enumerate() {
            if let Some(index) = new_index[i] {
                var.index = index;
                slots[index.value()] = Some(var);
            }
        }
        self.variables = slots.into_iter().flatten().collect();
        self.variable_index = self
            .variables
            .iter()
            .map(|var| ((var.function, var.params.clone()), var.index))
            .collect();
        log::debug!("static pass: {} variables removed", count);
        Ok(count)
    }

    /// Evaluates the numeric conditions whose operands are all constant
    pub(super) fn check_numeric_conditions(&mut self) {
        let before = self.actions.len();
        self.actions.retain_mut(|action| {
            for conditions in [
                &mut action.start_num_cond,
                &mut action.over_num_cond,
                &mut action.end_num_cond,
            ] {
                let mut violated = false;
                conditions.retain(|cond| match cond.terms.as_slice() {
                    [GroundedExpression::Number(left), GroundedExpression::Number(right)] => {
                        violated |= !cond.comparator.holds(*left, *right);
                        false
                    }
                    _ => true,
                });
                if violated {
                    log::trace!("{}: violates a constant numeric condition", action.name);
                    return false;
                }
            }
            true
        });
        for (i, action) in self.actions.iter_mut().enumerate() {
            action.index = i;
        }
        self.stats.dropped_actions += before - self.actions.len();
    }

    /// Copies the initial facts (and timed initial literals) into the grounded variables
    pub(super) fn compute_initial_variable_values(&mut self, task: &ParsedTask) {
        let facts = facts_by_variable(task);
        for var in self.variables.iter_mut() {
            var.initial_values = facts
                .get(&(var.function, var.params.as_slice()))
                .map(|facts| facts.iter().map(|fact| (fact.time, fact.value)).collect())
                .unwrap_or_default();
        }
    }
}
