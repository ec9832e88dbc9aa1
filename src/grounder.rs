/*!
Level-saturation grounding of lifted temporal operators.

Instead of enumerating every combination of objects for every operator, the grounder propagates
*programmed values* (a grounded variable taking an object value) level by level, starting with the
facts of the initial state. Each new value is matched against the literal preconditions of the
operators requiring its function, the remaining preconditions are completed with values already
reached, and every action built this way programs its effects for the next level. Grounding stops
as soon as a level does not reach any new value.

Afterwards, quantified sub-goals of preferences and constraints are instantiated ([adl]), the
variables whose value never changes are compiled away ([statics]) and constant numeric conditions
are evaluated.
*/
mod adl;
mod statics;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::datatypes::{
    Assignment, Expression, FunctionId, GroundedAction, GroundedCondition, GroundedConstraint,
    GroundedDuration, GroundedExpression, GroundedMetric, GroundedMetricExpression,
    GroundedNumericCondition, GroundedNumericEffect, GroundedPreference, GroundedTask, GroundedVar,
    GroundingStats, LevelStats, Literal, MetricExpression, ObjectId, OpFluent, OpNumericPrec,
    Operator, ParsedTask, PreprocessedTask, Term, TypeId, Value, VarId,
};
use crate::error::{Error, Result};

/// Grounds every reachable action of the task.
///
/// Unless `keep_static_data` is set, variables that no action modifies are removed and the
/// conditions on them are evaluated against the initial state.
pub fn ground(task: &PreprocessedTask, keep_static_data: bool) -> Result<GroundedTask> {
    task.validate()?;
    Grounder::new(task).ground(keep_static_data)
}

/// Reflexive-transitive closure of the subtype relation
#[derive(Debug)]
struct TypeMatrix {
    size: usize,
    subtype_of: Vec<bool>,
}

impl TypeMatrix {
    fn new(task: &ParsedTask) -> Self {
        let size = task.types.len();
        let mut matrix = Self {
            size,
            subtype_of: vec![false; size * size],
        };
        for t in 0..size {
            matrix.add_type(task, t, t);
        }
        matrix
    }

    fn add_type(&mut self, task: &ParsedTask, ty: usize, supertype: usize) {
        let pos = ty * self.size + supertype;
        if self.subtype_of[pos] {
            return;
        }
        self.subtype_of[pos] = true;
        for parent in &task.types[supertype].parent_types {
            self.add_type(task, ty, parent.value());
        }
    }

    fn is_subtype(&self, ty: TypeId, supertype: TypeId) -> bool {
        self.subtype_of[ty.value() * self.size + supertype.value()]
    }

    /// Returns true if one of `types` is a subtype of one of `valid_types`
    fn compatible(&self, types: &[TypeId], valid_types: &[TypeId]) -> bool {
        types
            .iter()
            .any(|&t| valid_types.iter().any(|&v| self.is_subtype(t, v)))
    }
}

/// A variable reaching a value, numbered in order of reachability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ProgrammedValue {
    index: usize,
    var: VarId,
    value: ObjectId,
}

/// A literal precondition of an operator during matching
#[derive(Debug, Clone, Copy)]
struct GrounderAssignment<'a> {
    function: FunctionId,
    params: &'a [Term],
    value: Term,
}

impl<'a> GrounderAssignment<'a> {
    fn new(fluent: &'a OpFluent) -> Self {
        Self {
            function: fluent.variable.function,
            params: &fluent.variable.params,
            value: fluent.value,
        }
    }

    /// A negated precondition can trigger a match once the proposition reaches `false`, but it
    /// never has to be completed by another value
    fn is_negated(&self) -> bool {
        self.value == Term::Object(ObjectId::FALSE)
    }
}

/// Objects bound to the parameters of an operator, `None` while unbound
type Bindings = Vec<Option<ObjectId>>;

/// The programmed value a match started from
#[derive(Debug, Clone, Copy)]
struct Trigger {
    /// precondition matched by the value
    prec: usize,
    /// index of the value, later values of the current level may complete the match
    index: usize,
}

/// Lifted operator prepared for matching
#[derive(Debug)]
struct GrounderOperator<'a> {
    op: &'a Operator,
    compatible_objects: Vec<Vec<ObjectId>>,
    /// start preconditions followed by the over all preconditions
    preconditions: Vec<GrounderAssignment<'a>>,
}

impl GrounderOperator<'_> {
    fn unbound(&self) -> Bindings {
        vec![None; self.op.parameters.len()]
    }
}

/// Long-lived state shared by all grounding phases
#[derive(Debug, Default)]
struct GroundingContext {
    variables: Vec<GroundedVar>,
    variable_index: HashMap<(FunctionId, Vec<ObjectId>), VarId>,
    preference_index: HashMap<String, usize>,
    preference_names: Vec<String>,
    grounded_actions: HashSet<String>,
    /// operator and parameters of the grounded goals
    grounded_goals: HashSet<(usize, Vec<ObjectId>)>,
    actions: Vec<GroundedAction>,
    goals: Vec<GroundedAction>,
    constraints: Vec<GroundedConstraint>,
    metric: Option<GroundedMetric>,
    stats: GroundingStats,
}

impl GroundingContext {
    fn variable(&self, function: FunctionId, params: &[ObjectId]) -> Option<VarId> {
        self.variable_index
            .get(&(function, params.to_vec()))
            .copied()
    }

    fn get_or_create_variable(
        &mut self,
        task: &ParsedTask,
        function: FunctionId,
        params: Vec<ObjectId>,
    ) -> VarId {
        if let Some(var) = self.variable(function, &params) {
            return var;
        }
        let index = VarId(self.variables.len());
        log::trace!("new variable {}", task.variable_name(function, &params));
        self.variables.push(GroundedVar {
            index,
            function,
            params: params.clone(),
            is_numeric: task.is_numeric_function(function),
            reached_values: Default::default(),
            initial_values: Vec::new(),
        });
        self.variable_index.insert((function, params), index);
        index
    }

    fn preference_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.preference_index.get(name) {
            return *index;
        }
        let index = self.preference_names.len();
        self.preference_names.push(name.to_string());
        self.preference_index.insert(name.to_string(), index);
        index
    }
}

#[derive(Debug)]
struct Grounder<'a> {
    task: &'a PreprocessedTask,
    types: TypeMatrix,
    ops: Vec<GrounderOperator<'a>>,
    op_require_function: Vec<Vec<usize>>,
    values_by_function: Vec<Vec<ProgrammedValue>>,
    new_values: Vec<ProgrammedValue>,
    aux_values: Vec<ProgrammedValue>,
    num_values: usize,
    start_new_values: usize,
    current_level: u32,
    ctx: GroundingContext,
}

fn bind(term: &Term, parameters: &[ObjectId]) -> Result<ObjectId> {
    match term {
        Term::Param(i) => parameters.get(*i).copied().ok_or(Error::UnboundParameter(*i)),
        Term::Object(obj) => Ok(*obj),
    }
}

fn bind_all(terms: &[Term], parameters: &[ObjectId]) -> Result<Vec<ObjectId>> {
    terms.iter().map(|t| bind(t, parameters)).collect()
}

impl<'a> Grounder<'a> {
    fn new(task: &'a PreprocessedTask) -> Self {
        let parsed = &task.task;
        let types = TypeMatrix::new(parsed);
        let ops: Vec<GrounderOperator<'a>> = task
            .operators
            .iter()
            .map(|op| GrounderOperator {
                op,
                compatible_objects: op
                    .parameters
                    .iter()
                    .map(|param| {
                        parsed
                            .objects
                            .iter()
                            .enumerate()
                            .filter(|(_, obj)| types.compatible(&obj.types, &param.types))
                            .map(|(i, _)| ObjectId(i))
                            .collect()
                    })
                    .collect(),
                preconditions: op
                    .at_start
                    .prec
                    .iter()
                    .chain(op.over_all_prec.iter())
                    .map(GrounderAssignment::new)
                    .collect(),
            })
            .collect();
        let mut op_require_function = vec![Vec::new(); parsed.functions.len()];
        for (i, op) in ops.iter().enumerate() {
            for prec in &op.preconditions {
                let required: &mut Vec<usize> = &mut op_require_function[prec.function.value()];
                if !required.contains(&i) {
                    required.push(i);
                }
            }
        }
        Self {
            task,
            types,
            ops,
            op_require_function,
            values_by_function: vec![Vec::new(); parsed.functions.len()],
            new_values: Vec::new(),
            aux_values: Vec::new(),
            num_values: 0,
            start_new_values: 0,
            current_level: 0,
            ctx: GroundingContext::default(),
        }
    }

    fn parsed(&self) -> &'a ParsedTask {
        &self.task.task
    }

    fn ground(self, keep_static_data: bool) -> Result<GroundedTask> {
        let parsed = self.parsed();
        let mut ctx = self.saturate()?;
        if !keep_static_data {
            ctx.remove_static_variables(parsed)?;
        }
        ctx.check_numeric_conditions();
        ctx.compute_initial_variable_values(parsed);
        Ok(GroundedTask {
            task: Arc::new(parsed.clone()),
            variables: ctx.variables,
            actions: ctx.actions,
            goals: ctx.goals,
            preference_names: ctx.preference_names,
            constraints: ctx.constraints,
            metric: ctx.metric,
            stats: ctx.stats,
        })
    }

    /// Grounds actions until no new value is reached, then preferences, constraints and metric
    fn saturate(mut self) -> Result<GroundingContext> {
        log::info!("[Start] grounding {} operators", self.ops.len());
        self.init_initial_state();
        // operators without literal preconditions belong to level 0, their effects to level 1
        for op in 0..self.ops.len() {
            if self.ops[op].preconditions.is_empty() {
                let unbound = self.ops[op].unbound();
                self.ground_remaining_parameters(op, unbound)?;
            }
        }
        let mut actions_before = 0;
        while !self.new_values.is_empty() || !self.aux_values.is_empty() {
            let level_values = std::mem::take(&mut self.new_values);
            for pv in &level_values {
                self.match_value(*pv)?;
            }
            self.start_new_values += level_values.len();
            let level = LevelStats {
                level: self.current_level,
                new_values: level_values.len(),
                new_actions: self.ctx.actions.len() + self.ctx.goals.len() - actions_before,
                variables: self.ctx.variables.len(),
            };
            log::debug!(
                "level {}: {} new values, {} new actions, {} variables",
                level.level,
                level.new_values,
                level.new_actions,
                level.variables
            );
            self.ctx.stats.levels.push(level);
            self.swap_levels();
            self.current_level += 1;
            actions_before = self.ctx.actions.len() + self.ctx.goals.len();
        }
        log::info!(
            "[Done] grounding: {} actions, {} goals, {} variables",
            self.ctx.actions.len(),
            self.ctx.goals.len(),
            self.ctx.variables.len()
        );

        self.remove_adl_features_in_preferences()?;
        self.ground_constraints()?;
        self.ctx.metric = self.ground_metric()?;
        Ok(self.ctx)
    }

    fn init_initial_state(&mut self) {
        let parsed = self.parsed();
        for fact in &parsed.init {
            self.ctx
                .get_or_create_variable(parsed, fact.function, fact.parameters.clone());
        }
        for fact in &parsed.init {
            if let Value::Object(value) = fact.value {
                let var = self
                    .ctx
                    .get_or_create_variable(parsed, fact.function, fact.parameters.clone());
                let reached = &mut self.ctx.variables[var.value()].reached_values;
                if reached.contains_key(&value) {
                    continue;
                }
                reached.insert(value, 0);
                let pv = ProgrammedValue {
                    index: self.num_values,
                    var,
                    value,
                };
                self.num_values += 1;
                self.new_values.push(pv);
                self.values_by_function[fact.function.value()].push(pv);
            }
        }
        self.start_new_values = 0;
    }

    /// Makes the values programmed in the current level the new values of the next one
    fn swap_levels(&mut self) {
        for pv in &self.aux_values {
            let function = self.ctx.variables[pv.var.value()].function;
            self.values_by_function[function.value()].push(*pv);
        }
        self.new_values = std::mem::take(&mut self.aux_values);
    }

    fn program_new_value(&mut self, eff: GroundedCondition) {
        let reached = &mut self.ctx.variables[eff.var.value()].reached_values;
        if !reached.contains_key(&eff.value) {
            reached.insert(eff.value, self.current_level + 1);
            self.aux_values.push(ProgrammedValue {
                index: self.num_values,
                var: eff.var,
                value: eff.value,
            });
            self.num_values += 1;
        }
    }

    /// Tries every precondition the new value can satisfy as the trigger of a match
    fn match_value(&mut self, pv: ProgrammedValue) -> Result<()> {
        let function = self.ctx.variables[pv.var.value()].function;
        for k in 0..self.op_require_function[function.value()].len() {
            let op = self.op_require_function[function.value()][k];
            for prec in 0..self.ops[op].preconditions.len() {
                if self.ops[op].preconditions[prec].function != function {
                    continue;
                }
                let unbound = self.ops[op].unbound();
                if let Some(bindings) =
                    self.bind_precondition(op, prec, &unbound, pv.var, pv.value)
                {
                    let trigger = Trigger {
                        prec,
                        index: pv.index,
                    };
                    self.complete_match(op, 0, trigger, bindings)?;
                }
            }
        }
        Ok(())
    }

    /// Extends `bindings` so that precondition `prec` of the operator reads `var = value`.
    ///
    /// Returns `None` if a constant or an already bound parameter differs, or if an object does
    /// not have the type of the parameter it would be bound to.
    fn bind_precondition(
        &self,
        op: usize,
        prec: usize,
        bindings: &[Option<ObjectId>],
        var: VarId,
        value: ObjectId,
    ) -> Option<Bindings> {
        let o = &self.ops[op];
        let p = &o.preconditions[prec];
        let v = &self.ctx.variables[var.value()];
        if p.params.len() != v.params.len() {
            return None;
        }
        let mut bindings = bindings.to_vec();
        let pairs = p.params.iter().zip(v.params.iter().copied());
        for (term, obj) in pairs.chain(std::iter::once((&p.value, value))) {
            match term {
                Term::Object(constant) if *constant != obj => return None,
                Term::Object(_) => {}
                Term::Param(i) => match bindings.get_mut(*i)? {
                    Some(bound) if *bound != obj => return None,
                    Some(_) => {}
                    unbound => {
                        let types = &o.op.parameters[*i].types;
                        if !self
                            .types
                            .compatible(&self.parsed().objects[obj.value()].types, types)
                        {
                            return None;
                        }
                        *unbound = Some(obj);
                    }
                },
            }
        }
        Some(bindings)
    }

    /// Grounds the preconditions from `prec` on with values of earlier levels or values reached
    /// after the trigger in the current level
    fn complete_match(
        &mut self,
        op: usize,
        prec: usize,
        trigger: Trigger,
        bindings: Bindings,
    ) -> Result<()> {
        let preconditions = &self.ops[op].preconditions;
        let next = (prec..preconditions.len())
            .find(|&i| i != trigger.prec && !preconditions[i].is_negated());
        let (prec, function) = match next {
            Some(prec) => (prec, preconditions[prec].function.value()),
            None => return self.ground_remaining_parameters(op, bindings),
        };
        for i in 0..self.values_by_function[function].len() {
            let pv = self.values_by_function[function][i];
            if pv.index >= self.start_new_values && pv.index < trigger.index {
                continue;
            }
            if let Some(extended) = self.bind_precondition(op, prec, &bindings, pv.var, pv.value) {
                self.complete_match(op, prec + 1, trigger, extended)?;
            }
        }
        Ok(())
    }

    /// Binds the parameters no precondition constrains to every compatible object
    fn ground_remaining_parameters(&mut self, op: usize, bindings: Bindings) -> Result<()> {
        match bindings.iter().position(Option::is_none) {
            None => self.ground_action(op, bindings.into_iter().flatten().collect()),
            Some(param) => {
                for k in 0..self.ops[op].compatible_objects[param].len() {
                    let mut extended = bindings.clone();
                    extended[param] = Some(self.ops[op].compatible_objects[param][k]);
                    self.ground_remaining_parameters(op, extended)?;
                }
                Ok(())
            }
        }
    }

    fn ground_action(&mut self, op_index: usize, parameters: Vec<ObjectId>) -> Result<()> {
        let op: &'a Operator = self.ops[op_index].op;
        let name = action_name(self.parsed(), &op.name, &parameters);
        let fresh = if op.is_goal {
            self.ctx.grounded_goals.insert((op_index, parameters.clone()))
        } else {
            self.ctx.grounded_actions.insert(name.clone())
        };
        if !fresh {
            return Ok(());
        }
        if !check_equality_conditions(op, &parameters)? {
            log::trace!("{}: equality conditions do not hold", name);
            return Ok(());
        }
        let mut action = GroundedAction {
            name,
            operator: op_index,
            parameters,
            is_goal: op.is_goal,
            ..Default::default()
        };
        if !self.ground_action_parts(op, &mut action)? {
            log::trace!("{}: discarded", action.name);
            return Ok(());
        }
        for eff in action.start_eff.iter().chain(action.end_eff.iter()) {
            self.program_new_value(*eff);
        }
        log::trace!("grounded {}", action.name);
        if op.is_goal {
            action.index = self.ctx.goals.len();
            self.ctx.goals.push(action);
        } else {
            action.index = self.ctx.actions.len();
            self.ctx.actions.push(action);
        }
        Ok(())
    }

    /// Fills conditions, effects, preferences and durations; returns false if the action is invalid
    fn ground_action_parts(&mut self, op: &'a Operator, action: &mut GroundedAction) -> Result<bool> {
        let params = action.parameters.clone();
        action.start_cond = self.ground_conditions(&op.at_start.prec, &params)?;
        action.over_cond = self.ground_conditions(&op.over_all_prec, &params)?;
        action.end_cond = self.ground_conditions(&op.at_end.prec, &params)?;
        for (precs, target) in [
            (&op.at_start.numeric_prec, &mut action.start_num_cond),
            (&op.over_all_numeric_prec, &mut action.over_num_cond),
            (&op.at_end.numeric_prec, &mut action.end_num_cond),
        ] {
            match self.ground_numeric_conditions(precs, &params)? {
                Some(conditions) => *target = conditions,
                None => return Ok(false),
            }
        }
        for (effects, target) in [
            (&op.at_start.eff, &mut action.start_eff),
            (&op.at_end.eff, &mut action.end_eff),
        ] {
            match self.ground_effects(effects, &params)? {
                Some(effects) => *target = effects,
                None => return Ok(false),
            }
        }
        for (effects, literal_target, numeric_target) in [
            (
                &op.at_start.numeric_eff,
                &mut action.start_eff,
                &mut action.start_num_eff,
            ),
            (
                &op.at_end.numeric_eff,
                &mut action.end_eff,
                &mut action.end_num_eff,
            ),
        ] {
            for eff in effects {
                let var = match self
                    .ctx
                    .variable(eff.fluent.function, &bind_all(&eff.fluent.params, &params)?)
                {
                    Some(var) => var,
                    None => return Ok(false),
                };
                match (&eff.assignment, &eff.exp) {
                    (Assignment::Assign, Expression::Term(term)) => {
                        literal_target.push(GroundedCondition {
                            var,
                            value: bind(term, &params)?,
                        });
                    }
                    _ => match self.ground_expression(&eff.exp, &params)? {
                        Some(exp) => numeric_target.push(GroundedNumericEffect {
                            assignment: eff.assignment,
                            var,
                            exp,
                        }),
                        None => return Ok(false),
                    },
                }
            }
        }
        for pref in &op.preferences {
            let name_index = self.ctx.preference_index(&pref.name);
            let goal = self.ground_goal(&pref.preference, &params)?;
            action.preferences.push(GroundedPreference { name_index, goal });
        }
        for duration in &op.duration {
            match self.ground_expression(&duration.exp, &params)? {
                Some(exp) => action.duration.push(GroundedDuration {
                    time: duration.time,
                    comparator: duration.comparator,
                    exp,
                }),
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    fn ground_variable(&mut self, literal: &Literal, params: &[ObjectId]) -> Result<VarId> {
        let objects = bind_all(&literal.params, params)?;
        let parsed = self.parsed();
        Ok(self
            .ctx
            .get_or_create_variable(parsed, literal.function, objects))
    }

    fn ground_conditions(
        &mut self,
        conditions: &[OpFluent],
        params: &[ObjectId],
    ) -> Result<Vec<GroundedCondition>> {
        conditions
            .iter()
            .map(|cond| {
                Ok(GroundedCondition {
                    var: self.ground_variable(&cond.variable, params)?,
                    value: bind(&cond.value, params)?,
                })
            })
            .collect()
    }

    /// `None` if a condition reads a variable that does not exist
    fn ground_numeric_conditions(
        &self,
        conditions: &[OpNumericPrec],
        params: &[ObjectId],
    ) -> Result<Option<Vec<GroundedNumericCondition>>> {
        let mut grounded = Vec::with_capacity(conditions.len());
        for cond in conditions {
            let mut terms = Vec::with_capacity(cond.operands.len());
            for operand in &cond.operands {
                match self.ground_expression(operand, params)? {
                    Some(exp) => terms.push(exp),
                    None => return Ok(None),
                }
            }
            grounded.push(GroundedNumericCondition {
                comparator: cond.comparator,
                terms,
            });
        }
        Ok(Some(grounded))
    }

    /// `None` if two effects assign different values to the same variable
    fn ground_effects(
        &mut self,
        effects: &[OpFluent],
        params: &[ObjectId],
    ) -> Result<Option<Vec<GroundedCondition>>> {
        let mut grounded: Vec<GroundedCondition> = Vec::with_capacity(effects.len());
        for eff in effects {
            let var = self.ground_variable(&eff.variable, params)?;
            let value = bind(&eff.value, params)?;
            match grounded.iter().find(|g| g.var == var) {
                Some(other) if other.value != value => return Ok(None),
                Some(_) => {}
                None => grounded.push(GroundedCondition { var, value }),
            }
        }
        Ok(Some(grounded))
    }

    /// `None` if the expression reads a variable that does not exist
    fn ground_expression(
        &self,
        exp: &Expression,
        params: &[ObjectId],
    ) -> Result<Option<GroundedExpression>> {
        let operands = |ops: &[Expression]| -> Result<Option<Vec<GroundedExpression>>> {
            let mut grounded = Vec::with_capacity(ops.len());
            for op in ops {
                match self.ground_expression(op, params)? {
                    Some(exp) => grounded.push(exp),
                    None => return Ok(None),
                }
            }
            Ok(Some(grounded))
        };
        Ok(match exp {
            Expression::Number(num) => Some(GroundedExpression::Number(*num)),
            Expression::Term(term) => Some(GroundedExpression::Object(bind(term, params)?)),
            Expression::Fluent(literal) => self
                .ctx
                .variable(literal.function, &bind_all(&literal.params, params)?)
                .map(GroundedExpression::Var),
            Expression::Duration => Some(GroundedExpression::Duration),
            Expression::SharpT => Some(GroundedExpression::SharpT),
            Expression::Sum(ops) => operands(ops)?.map(GroundedExpression::Sum),
            Expression::Sub(ops) => operands(ops)?.map(GroundedExpression::Sub),
            Expression::Mul(ops) => operands(ops)?.map(GroundedExpression::Mul),
            Expression::Div(ops) => operands(ops)?.map(GroundedExpression::Div),
        })
    }

    fn ground_metric(&mut self) -> Result<Option<GroundedMetric>> {
        match &self.parsed().metric {
            None => Ok(None),
            Some(metric) => Ok(Some(GroundedMetric {
                objective: metric.objective,
                expression: self.ground_metric_expression(&metric.expression)?,
            })),
        }
    }

    fn ground_metric_expression(&mut self, exp: &MetricExpression) -> Result<GroundedMetricExpression> {
        Ok(match exp {
            MetricExpression::Number(num) => GroundedMetricExpression::Number(*num),
            MetricExpression::TotalTime => GroundedMetricExpression::TotalTime,
            MetricExpression::IsViolated(name) => {
                GroundedMetricExpression::IsViolated(self.ctx.preference_index(name))
            }
            MetricExpression::Fluent {
                function,
                parameters,
            } => match self.ctx.variable(*function, parameters) {
                Some(var) => GroundedMetricExpression::Var(var),
                None => {
                    return Err(Error::UnknownVariable(
                        self.parsed().variable_name(*function, parameters),
                    ))
                }
            },
            MetricExpression::Sum(ms) => GroundedMetricExpression::Sum(self.ground_metric_operands(ms)?),
            MetricExpression::Sub(ms) => GroundedMetricExpression::Sub(self.ground_metric_operands(ms)?),
            MetricExpression::Mul(ms) => GroundedMetricExpression::Mul(self.ground_metric_operands(ms)?),
            MetricExpression::Div(ms) => GroundedMetricExpression::Div(self.ground_metric_operands(ms)?),
        })
    }

    fn ground_metric_operands(
        &mut self,
        operands: &[MetricExpression],
    ) -> Result<Vec<GroundedMetricExpression>> {
        operands
            .iter()
            .map(|m| self.ground_metric_expression(m))
            .collect()
    }
}

/// Name of a grounded action, e.g. `drive t1 l1 l2`
fn action_name(task: &ParsedTask, name: &str, parameters: &[ObjectId]) -> String {
    let mut result = name.to_string();
    for &param in parameters {
        result.push(' ');
        result.push_str(task.object_name(param));
    }
    result
}

fn check_equality_conditions(op: &Operator, parameters: &[ObjectId]) -> Result<bool> {
    for eq in &op.equality {
        let left = bind(&eq.left, parameters)?;
        let right = bind(&eq.right, parameters)?;
        if (left == right) != eq.equal {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datatypes::{Metric, Objective, Type};
    use crate::test::*;
    use test_log::test;

    #[test]
    fn trivial() {
        let grounded = ground(&trivial_task(), true).unwrap();
        assert_eq!(grounded.actions.len(), 1);
        assert_eq!(grounded.actions[0].name, "remove a");
        assert_eq!(grounded.variables.len(), 1);
        let on_a = &grounded.variables[0];
        assert_eq!(on_a.reached_values.get(&ObjectId::TRUE), Some(&0));
        assert_eq!(on_a.reached_values.get(&ObjectId::FALSE), Some(&1));
        assert_eq!(on_a.value_at_start(), Some(Value::Object(ObjectId::TRUE)));
    }

    #[test]
    fn equality_conditions() {
        let grounded = ground(&equality_task(), true).unwrap();
        let names: Vec<&str> = grounded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["link a b", "link b a"]);
    }

    #[test]
    fn levels() {
        let grounded = ground(&logistics_task(), true).unwrap();
        assert_eq!(grounded.variables.len(), 5);
        assert_eq!(grounded.actions.len(), 1);
        assert_eq!(grounded.goals.len(), 1);
        assert_eq!(grounded.goals[0].name, "goal");

        let levels = &grounded.stats.levels;
        assert_eq!(levels[0].level, 0);
        assert_eq!(levels[0].new_actions, 1);
        for pair in levels.windows(2) {
            assert_eq!(pair[1].level, pair[0].level + 1);
            assert!(pair[1].variables >= pair[0].variables);
        }
        // every reached value is reached at a level that exists
        for var in &grounded.variables {
            for level in var.reached_values.values() {
                assert!((*level as usize) <= levels.len());
            }
        }
        let visited = grounded
            .variables
            .iter()
            .find(|v| grounded.var_name(v.index) == "(visited l2)")
            .unwrap();
        assert_eq!(visited.reached_values.get(&ObjectId::TRUE), Some(&1));
    }

    fn reached_level(grounded: &GroundedTask, name: &str, value: ObjectId) -> Option<u32> {
        grounded
            .variables
            .iter()
            .find(|v| grounded.var_name(v.index) == name)
            .and_then(|v| v.reached_values.get(&value).copied())
    }

    #[test]
    fn reached_levels_follow_action_chains() {
        let (a, b) = (Term::Object(ObjectId(2)), Term::Object(ObjectId(3)));
        let mut make = operator("make", vec![]);
        make.at_end.eff = vec![fluent(0, &[a], TRUE)];
        let mut next = operator("next", vec![]);
        next.at_start.prec = vec![fluent(0, &[a], TRUE)];
        next.at_end.eff = vec![fluent(0, &[b], TRUE)];
        let mut task = two_blocks_task();
        task.task.init.clear();
        task.operators = vec![make, next];

        let grounded = ground(&task, true).unwrap();
        let names: Vec<&str> = grounded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["make", "next"]);
        assert_eq!(reached_level(&grounded, "(on a)", ObjectId::TRUE), Some(1));
        assert_eq!(reached_level(&grounded, "(on b)", ObjectId::TRUE), Some(2));
        let new_actions: Vec<usize> = grounded.stats.levels.iter().map(|l| l.new_actions).collect();
        assert_eq!(new_actions, vec![1, 1, 0]);
    }

    #[test]
    fn negated_preconditions() {
        let mut put = operator("put", vec![param("x", 2)]);
        put.at_start.prec = vec![fluent(0, &[Term::Param(0)], FALSE)];
        put.at_end.eff = vec![fluent(0, &[Term::Param(0)], TRUE)];
        let mut task = trivial_task();
        task.operators.push(put);

        let grounded = ground(&task, true).unwrap();
        let names: Vec<&str> = grounded.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["remove a", "put a"]);
        assert_eq!(reached_level(&grounded, "(on a)", ObjectId::FALSE), Some(1));
        assert_eq!(grounded.stats.levels[1].new_actions, 1);
        assert_eq!(grounded.actions[1].start_cond[0].value, ObjectId::FALSE);
    }

    #[test]
    fn goal_with_negated_precondition_is_ground_once() {
        let mut task = mutex_task();
        task.operators[1].at_start.prec.push(fluent(0, &[], FALSE));
        let grounded = ground(&task, true).unwrap();
        assert_eq!(grounded.goals.len(), 1);
        assert_eq!(grounded.goals[0].start_cond.len(), 2);
    }

    #[test]
    fn deterministic() {
        let first = ground(&logistics_task(), false).unwrap();
        let second = ground(&logistics_task(), false).unwrap();
        assert_eq!(first, second);
        assert_eq!(format!("{}", first), format!("{}", second));
    }

    #[test]
    fn static_removal() {
        let grounded = ground(&logistics_task(), false).unwrap();
        let names: Vec<String> = grounded
            .variables
            .iter()
            .map(|v| grounded.var_name(v.index))
            .collect();
        assert_eq!(names, vec!["(at t1)", "(visited l2)", "(fuel t1)"]);
        assert_eq!(grounded.stats.static_variables, 2);
        let drive = &grounded.actions[0];
        assert_eq!(drive.duration[0].exp, GroundedExpression::Number(10.0));
        assert_eq!(drive.start_cond.len(), 1);
        assert_eq!(
            grounded.variables[2].initial_values,
            vec![(0.0, Value::Number(100.0))]
        );
        assert_eq!(grounded.goals[0].start_cond[0].var, VarId(1));
        assert!(matches!(
            grounded.metric,
            Some(GroundedMetric {
                expression: GroundedMetricExpression::TotalTime,
                ..
            })
        ));
    }

    #[test]
    fn unreachable_preconditions() {
        let mut task = two_blocks_task();
        task.operators[0].at_start.prec[0].variable.params = vec![Term::Object(ObjectId(3))];
        let grounded = ground(&task, true).unwrap();
        assert!(grounded.actions.is_empty());
        assert_eq!(grounded.variables.len(), 1);
    }

    #[test]
    fn unknown_metric_variable() {
        let mut task = logistics_task();
        task.task.metric = Some(Metric {
            objective: Objective::Minimize,
            expression: MetricExpression::Fluent {
                function: FunctionId(3),
                parameters: vec![ObjectId(3)],
            },
        });
        assert!(matches!(
            ground(&task, true),
            Err(Error::UnknownVariable(name)) if name == "(fuel l1)"
        ));
    }

    #[test]
    fn invalid_input() {
        let mut task = trivial_task();
        task.operators[0].at_start.eff[0].value = Term::Param(7);
        assert!(matches!(ground(&task, true), Err(Error::InvalidTask(_))));
    }

    #[test]
    fn type_matrix() {
        let mut task = trivial_task().task;
        task.types.push(Type {
            name: "block".into(),
            parent_types: vec![TypeId(2)],
        });
        let matrix = TypeMatrix::new(&task);
        assert!(matrix.is_subtype(TypeId(3), TypeId(2)));
        assert!(!matrix.is_subtype(TypeId(2), TypeId(3)));
        assert!(matrix.compatible(&[TypeId(0), TypeId(3)], &[TypeId(2)]));
    }
}
