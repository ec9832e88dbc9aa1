//! Translation of a grounded task into a [SasTask].
//!
//! Boolean propositions that are pairwise mutex are packed into one multi-valued variable, so a
//! planner needs fewer variables and gets the mutexes for free. Variables of non-boolean
//! functions are finite-domain variables already, and numeric variables are copied as they are.
mod domain;
mod mutex;

use std::path::Path;

use crate::config::Config;
use crate::datatypes::{
    GroundedAction, GroundedCondition, GroundedConstraint, GroundedExpression, GroundedGoal,
    GroundedMetricExpression, GroundedNumericCondition, GroundedNumericEffect, GroundedTask,
    ObjectId, PartialExpression, ValueId, VarId,
};
use crate::error::{Error, Result};
use crate::sas::{
    SasAction, SasCondition, SasConstraint, SasDuration, SasExpression, SasGoal, SasMetric,
    SasMetricExpression, SasNumericCondition, SasNumericEffect, SasPreference, SasTask,
};
use domain::LiteralTranslation;
use mutex::{MutexFixpoint, MutexMatrix};

/// Translates a grounded task.
///
/// Actions whose conditions can never hold together are dropped. Depending on `config`, the
/// propositions are grouped by mutex cliques or mutex components, or every proposition becomes a
/// boolean variable of its own.
pub fn translate(grounded: &GroundedTask, config: &Config) -> Result<SasTask> {
    log::info!("[Start] translation");
    let mut fixpoint = MutexFixpoint::new(grounded);
    let passes = fixpoint.run(config.mutex_pass_limit);
    log::info!(
        "{} mutex pairs found in {} passes",
        fixpoint.mutex.len(),
        passes
    );
    if config.generate_mutex_file {
        write_mutex_file(grounded, &fixpoint.mutex, &config.mutex_file)?;
    }
    let actions: Vec<&GroundedAction> = grounded
        .actions
        .iter()
        .filter(|action| {
            let mutex = fixpoint.has_mutex_conditions(action);
            if mutex {
                log::debug!("{} removed, its conditions are mutex", action.name);
            }
            !mutex
        })
        .collect();
    let translator = Translator {
        grounded,
        config,
        fixpoint,
        actions,
        trans: LiteralTranslation::default(),
        sas: SasTask::new(),
    };
    translator.run()
}

#[cfg(feature = "mutexfile")]
fn write_mutex_file(grounded: &GroundedTask, mutex: &MutexMatrix, path: &Path) -> Result<()> {
    use std::io::Write;
    let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
    for (v1, v2) in mutex.pairs() {
        writeln!(out, "{} {}", grounded.var_name(v1), grounded.var_name(v2))?;
    }
    out.flush()?;
    log::info!("mutex pairs written to {}", path.display());
    Ok(())
}

#[cfg(not(feature = "mutexfile"))]
fn write_mutex_file(_grounded: &GroundedTask, _mutex: &MutexMatrix, path: &Path) -> Result<()> {
    log::warn!(
        "built without the mutexfile feature, {} is not written",
        path.display()
    );
    Ok(())
}

/// Removes a double negation and pushes a negation into comparisons and constants
fn negate(goal: SasGoal) -> SasGoal {
    match goal {
        SasGoal::Not(inner) => *inner,
        SasGoal::Compare { comparator, terms } => SasGoal::Compare {
            comparator: comparator.negated(),
            terms,
        },
        SasGoal::Constant(value) => SasGoal::Constant(!value),
        goal => SasGoal::Not(Box::new(goal)),
    }
}

struct Translator<'g> {
    grounded: &'g GroundedTask,
    config: &'g Config,
    fixpoint: MutexFixpoint<'g>,
    /// actions without mutex conditions
    actions: Vec<&'g GroundedAction>,
    trans: LiteralTranslation,
    sas: SasTask,
}

impl Translator<'_> {
    fn run(mut self) -> Result<SasTask> {
        self.create_variables()?;
        if self.config.only_generate_mutex {
            self.boolean_literals()?;
        } else {
            let negated = self.negated_literals();
            self.group_literals(&negated)?;
        }
        self.set_initial_values()?;

        for action in std::mem::take(&mut self.actions) {
            let mut converted = self.action(action)?;
            converted.index = self.sas.actions.len();
            self.sas.actions.push(converted);
        }
        let grounded = self.grounded;
        for goal in &grounded.goals {
            let mut converted = self.action(goal)?;
            let target = self.sas.create_goal();
            converted.index = target.index;
            converted.name = std::mem::take(&mut target.name);
            converted.is_goal = true;
            *target = converted;
        }
        self.sas.preference_names = grounded.preference_names.clone();
        self.sas.constraints = grounded
            .constraints
            .iter()
            .map(|c| self.constraint(c))
            .collect::<Result<_>>()?;
        if let Some(metric) = &grounded.metric {
            self.sas.metric = Some(SasMetric {
                objective: metric.objective,
                expression: self.metric(&metric.expression)?,
            });
        }
        self.translate_mutex();

        let mut sas = self.sas;
        sas.compute_initial_state();
        sas.compute_requirers()?;
        sas.compute_producers()?;
        sas.compute_permanent_mutex()?;
        sas.compute_initial_actions_cost(self.config.keep_static_data)?;
        log::info!(
            "[Done] translation: {} variables, {} numeric variables, {} actions, {} goals",
            sas.variables.len(),
            sas.numeric_variables.len(),
            sas.actions.len(),
            sas.goals.len()
        );
        Ok(sas)
    }

    fn is_literal(&self, var: VarId) -> bool {
        self.fixpoint
            .is_literal
            .get(var.value())
            .copied()
            .unwrap_or(false)
    }

    fn unknown(&self, var: VarId) -> Error {
        Error::UnknownVariable(self.grounded.var_name(var))
    }

    fn numeric_var(&self, var: VarId) -> Result<usize> {
        self.trans
            .numeric
            .get(var.value())
            .copied()
            .flatten()
            .ok_or_else(|| self.unknown(var))
    }

    /// `(variable, value)` of a finite-domain variable taking an object
    fn object_value(&self, var: VarId, object: ObjectId) -> Result<(usize, ValueId)> {
        let sas_var = self
            .trans
            .finite
            .get(var.value())
            .copied()
            .flatten()
            .ok_or_else(|| self.unknown(var))?;
        let name = self.grounded.task.object_name(object);
        let value = self
            .sas
            .value_by_name(name)
            .filter(|v| self.sas.variables[sas_var].possible_value_index(*v).is_some())
            .ok_or_else(|| Error::InvalidValue {
                variable: self.grounded.var_name(var),
                value: name.to_string(),
            })?;
        Ok((sas_var, value))
    }

    fn condition(&self, cond: &GroundedCondition) -> Result<SasCondition> {
        if !self.is_literal(cond.var) {
            let (var, value) = self.object_value(cond.var, cond.value)?;
            return Ok(SasCondition::new(var, value));
        }
        let code = self.trans.literal(cond.var).ok_or_else(|| self.unknown(cond.var))?;
        if cond.value == ObjectId::FALSE {
            let value = self.sas.variables[code.var()].opposite_value(code.value())?;
            Ok(SasCondition::new(code.var(), value))
        } else {
            Ok(SasCondition::new(code.var(), code.value()))
        }
    }

    fn conditions(&self, conds: &[GroundedCondition]) -> Result<Vec<SasCondition>> {
        conds.iter().map(|c| self.condition(c)).collect()
    }

    /// Converts effects. Deleting a proposition sets its variable to `<false>`, or to
    /// `<undefined>` for a group, unless another proposition of the group is added at once.
    fn effects(&mut self, effs: &[GroundedCondition]) -> Result<Vec<SasCondition>> {
        let mut result = Vec::with_capacity(effs.len());
        for eff in effs {
            if !self.is_literal(eff.var) || eff.value != ObjectId::FALSE {
                result.push(self.condition(eff)?);
                continue;
            }
            let code = self.trans.literal(eff.var).ok_or_else(|| self.unknown(eff.var))?;
            let replaced = effs.iter().any(|other| {
                other.var != eff.var
                    && other.value == ObjectId::TRUE
                    && self.is_literal(other.var)
                    && self.trans.literal(other.var).map(|c| c.var()) == Some(code.var())
            });
            if replaced {
                continue;
            }
            let variable = &mut self.sas.variables[code.var()];
            let value = if variable.is_boolean() {
                ValueId::FALSE
            } else {
                if variable.possible_value_index(ValueId::UNDEFINED).is_none() {
                    variable.add_possible_value(ValueId::UNDEFINED);
                }
                ValueId::UNDEFINED
            };
            result.push(SasCondition::new(code.var(), value));
        }
        Ok(result)
    }

    fn action(&mut self, action: &GroundedAction) -> Result<SasAction> {
        let start_eff = self.effects(&action.start_eff)?;
        let end_eff = self.effects(&action.end_eff)?;
        let mut converted = SasAction {
            name: action.name.clone(),
            is_goal: action.is_goal,
            duration: action
                .duration
                .iter()
                .map(|d| -> Result<SasDuration> {
                    Ok(SasDuration {
                        time: d.time,
                        comparator: d.comparator,
                        exp: self.expression(&d.exp)?,
                    })
                })
                .collect::<Result<_>>()?,
            start_cond: self.conditions(&action.start_cond)?,
            over_cond: self.conditions(&action.over_cond)?,
            end_cond: self.conditions(&action.end_cond)?,
            start_num_cond: self.numeric_conditions(&action.start_num_cond)?,
            over_num_cond: self.numeric_conditions(&action.over_num_cond)?,
            end_num_cond: self.numeric_conditions(&action.end_num_cond)?,
            start_eff,
            end_eff,
            start_num_eff: self.numeric_effects(&action.start_num_eff)?,
            end_num_eff: self.numeric_effects(&action.end_num_eff)?,
            preferences: action
                .preferences
                .iter()
                .map(|p| -> Result<SasPreference> {
                    Ok(SasPreference {
                        name_index: p.name_index,
                        goal: self.goal(&p.goal)?,
                    })
                })
                .collect::<Result<_>>()?,
            ..Default::default()
        };
        let effects: Vec<SasCondition> = converted.effects().copied().collect();
        for cond in converted
            .start_cond
            .iter_mut()
            .chain(converted.over_cond.iter_mut())
            .chain(converted.end_cond.iter_mut())
        {
            cond.is_modified = effects
                .iter()
                .any(|eff| eff.var == cond.var && eff.value != cond.value);
        }
        Ok(converted)
    }

    fn numeric_conditions(
        &self,
        conds: &[GroundedNumericCondition],
    ) -> Result<Vec<SasNumericCondition>> {
        conds
            .iter()
            .map(|c| -> Result<SasNumericCondition> {
                Ok(SasNumericCondition {
                    comparator: c.comparator,
                    terms: c
                        .terms
                        .iter()
                        .map(|t| self.expression(t))
                        .collect::<Result<_>>()?,
                })
            })
            .collect()
    }

    fn numeric_effects(
        &self,
        effs: &[GroundedNumericEffect],
    ) -> Result<Vec<SasNumericEffect>> {
        effs.iter()
            .map(|e| -> Result<SasNumericEffect> {
                Ok(SasNumericEffect {
                    assignment: e.assignment,
                    var: self.numeric_var(e.var)?,
                    exp: self.expression(&e.exp)?,
                })
            })
            .collect()
    }

    fn expression(&self, exp: &GroundedExpression) -> Result<SasExpression> {
        let operands = |ops: &[GroundedExpression]| {
            ops.iter()
                .map(|op| self.expression(op))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match exp {
            GroundedExpression::Number(num) => SasExpression::Number(*num),
            GroundedExpression::Var(var) => SasExpression::Var(self.numeric_var(*var)?),
            GroundedExpression::Object(object) => {
                return Err(Error::InvalidTask(format!(
                    "object {} in a numeric expression",
                    self.grounded.task.object_name(*object)
                )))
            }
            GroundedExpression::Duration => SasExpression::Duration,
            GroundedExpression::SharpT => SasExpression::SharpT,
            GroundedExpression::Sum(ops) => SasExpression::Sum(operands(ops)?),
            GroundedExpression::Sub(ops) => SasExpression::Sub(operands(ops)?),
            GroundedExpression::Mul(ops) => SasExpression::Mul(operands(ops)?),
            GroundedExpression::Div(ops) => SasExpression::Div(operands(ops)?),
        })
    }

    fn partial_expression(&self, exp: &PartialExpression) -> Result<SasExpression> {
        let operands = |ops: &[PartialExpression]| {
            ops.iter()
                .map(|op| self.partial_expression(op))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match exp {
            PartialExpression::Number(num) => SasExpression::Number(*num),
            PartialExpression::Var(var) => SasExpression::Var(self.numeric_var(*var)?),
            PartialExpression::UngroundedVar { .. } | PartialExpression::Term(_) => {
                return Err(Error::InvalidTask(format!(
                    "unexpanded term {:?} in a goal",
                    exp
                )))
            }
            PartialExpression::Sum(ops) => SasExpression::Sum(operands(ops)?),
            PartialExpression::Sub(ops) => SasExpression::Sub(operands(ops)?),
            PartialExpression::Mul(ops) => SasExpression::Mul(operands(ops)?),
            PartialExpression::Div(ops) => SasExpression::Div(operands(ops)?),
        })
    }

    fn goal(&self, goal: &GroundedGoal) -> Result<SasGoal> {
        let goals = |goals: &[GroundedGoal]| {
            goals
                .iter()
                .map(|g| self.goal(g))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match goal {
            GroundedGoal::Fluent { var, value, equal } => {
                if self.is_literal(*var) {
                    let code = self.trans.literal(*var).ok_or_else(|| self.unknown(*var))?;
                    let holds = SasGoal::Value {
                        var: code.var(),
                        value: code.value(),
                    };
                    if (*value == ObjectId::TRUE) == *equal {
                        holds
                    } else {
                        negate(holds)
                    }
                } else {
                    let (var, value) = self.object_value(*var, *value)?;
                    let holds = SasGoal::Value { var, value };
                    if *equal {
                        holds
                    } else {
                        negate(holds)
                    }
                }
            }
            GroundedGoal::And(list) => SasGoal::And(goals(list)?),
            GroundedGoal::Or(list) => SasGoal::Or(goals(list)?),
            GroundedGoal::Not(inner) => negate(self.goal(inner)?),
            GroundedGoal::Compare { comparator, terms } => SasGoal::Compare {
                comparator: *comparator,
                terms: terms
                    .iter()
                    .map(|t| self.partial_expression(t))
                    .collect::<Result<_>>()?,
            },
            GroundedGoal::At { time, goal } => SasGoal::At {
                time: *time,
                goal: Box::new(self.goal(goal)?),
            },
            GroundedGoal::Constant(value) => SasGoal::Constant(*value),
            GroundedGoal::UngroundedFluent { .. }
            | GroundedGoal::Imply(..)
            | GroundedGoal::Exists { .. }
            | GroundedGoal::Forall { .. }
            | GroundedGoal::Equality { .. } => {
                return Err(Error::InvalidTask(format!("unexpanded goal {:?}", goal)))
            }
        })
    }

    fn constraint(&self, constraint: &GroundedConstraint) -> Result<SasConstraint> {
        Ok(match constraint {
            GroundedConstraint::And(list) => SasConstraint::And(
                list.iter()
                    .map(|c| self.constraint(c))
                    .collect::<Result<_>>()?,
            ),
            GroundedConstraint::Preference {
                name_index,
                constraint,
            } => SasConstraint::Preference {
                name_index: *name_index,
                constraint: Box::new(self.constraint(constraint)?),
            },
            GroundedConstraint::GoalPreference { name_index, goal } => {
                SasConstraint::GoalPreference {
                    name_index: *name_index,
                    goal: self.goal(goal)?,
                }
            }
            GroundedConstraint::Temporal { kind, time, goals } => SasConstraint::Temporal {
                kind: *kind,
                time: time.clone(),
                goals: goals
                    .iter()
                    .map(|g| self.goal(g))
                    .collect::<Result<_>>()?,
            },
        })
    }

    fn metric(&self, exp: &GroundedMetricExpression) -> Result<SasMetricExpression> {
        let operands = |ops: &[GroundedMetricExpression]| {
            ops.iter()
                .map(|op| self.metric(op))
                .collect::<Result<Vec<_>>>()
        };
        Ok(match exp {
            GroundedMetricExpression::Number(num) => SasMetricExpression::Number(*num),
            GroundedMetricExpression::TotalTime => SasMetricExpression::TotalTime,
            GroundedMetricExpression::IsViolated(index) => SasMetricExpression::IsViolated(*index),
            GroundedMetricExpression::Var(var) => SasMetricExpression::Var(self.numeric_var(*var)?),
            GroundedMetricExpression::Sum(ops) => SasMetricExpression::Sum(operands(ops)?),
            GroundedMetricExpression::Sub(ops) => SasMetricExpression::Sub(operands(ops)?),
            GroundedMetricExpression::Mul(ops) => SasMetricExpression::Mul(operands(ops)?),
            GroundedMetricExpression::Div(ops) => SasMetricExpression::Div(operands(ops)?),
        })
    }

    /// Copies the mutexes between propositions to their `(variable, value)` codes
    fn translate_mutex(&mut self) {
        for (v1, v2) in self.fixpoint.mutex.pairs() {
            if let (Some(c1), Some(c2)) = (self.trans.literal(v1), self.trans.literal(v2)) {
                if c1 != c2 {
                    self.sas.add_mutex(c1, c2);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SplitStrategy;
    use crate::datatypes::VarValue;
    use crate::grounder::ground;
    use crate::test::*;
    use test_log::test;

    fn translated(task: &crate::datatypes::PreprocessedTask, config: &Config) -> SasTask {
        let grounded = ground(task, config.keep_static_data).unwrap();
        translate(&grounded, config).unwrap()
    }

    fn variable_named<'t>(sas: &'t SasTask, name: &str) -> &'t crate::sas::SasVariable {
        sas.variables.iter().find(|v| v.name == name).unwrap()
    }

    #[test]
    fn trivial() {
        let sas = translated(&trivial_task(), &Config::default());
        assert_eq!(sas.variables.len(), 1);
        let on = &sas.variables[0];
        assert_eq!(on.name, "(on a)");
        assert!(on.is_boolean());
        assert_eq!(sas.initial_state, vec![Some(ValueId::TRUE)]);
        assert_eq!(sas.actions.len(), 1);
        assert_eq!(sas.actions[0].name, "remove a");
        assert_eq!(
            sas.actions[0].start_eff,
            vec![SasCondition::new(0, ValueId::FALSE)]
        );
        assert!(sas.mutex.is_empty());
    }

    #[test]
    fn mutex_group() {
        let sas = translated(&mutex_task(), &Config::default());
        assert_eq!(sas.variables.len(), 1);
        let group = &sas.variables[0];
        assert_eq!(group.name, "var0");
        let p = sas.value_by_name("(p)").unwrap();
        let q = sas.value_by_name("(q)").unwrap();
        assert_eq!(group.possible_values, vec![p, q]);
        assert_eq!(sas.initial_state, vec![Some(p)]);

        let go = &sas.actions[0];
        assert_eq!(go.name, "go");
        assert_eq!(go.start_cond.len(), 1);
        assert_eq!((go.start_cond[0].var, go.start_cond[0].value), (0, p));
        // `go` moves the group from `p` to `q`, the deletion of `p` is implied
        assert!(go.start_cond[0].is_modified);
        assert_eq!(go.end_eff, vec![SasCondition::new(0, q)]);
        assert_eq!(sas.goals.len(), 1);
        assert_eq!(sas.goals[0].start_cond, vec![SasCondition::new(0, q)]);

        let p_code = VarValue::new(0, p).unwrap();
        let q_code = VarValue::new(0, q).unwrap();
        assert!(sas.is_mutex(p_code, q_code));
        assert!(sas.is_mutex(q_code, p_code));
        // nothing leads back from `q` to `p`
        assert!(sas.is_permanent_mutex(q_code, p_code));
        assert!(!sas.is_permanent_mutex(p_code, q_code));
        assert!(go.fixed_duration);
        assert_eq!(go.fixed_duration_value, vec![1.0]);
    }

    #[test]
    fn components() {
        let config = Config {
            split: SplitStrategy::Components,
            ..Default::default()
        };
        let sas = translated(&mutex_task(), &config);
        assert_eq!(sas.variables.len(), 1);
        assert_eq!(sas.variables[0].possible_values.len(), 2);
        assert_eq!(sas.mutex.len(), 2);
    }

    #[test]
    fn only_mutex() {
        let config = Config {
            only_generate_mutex: true,
            ..Default::default()
        };
        let sas = translated(&mutex_task(), &config);
        let names: Vec<&str> = sas.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["(p)", "(q)"]);
        assert!(sas.variables.iter().all(|v| v.is_boolean()));
        assert_eq!(
            sas.initial_state,
            vec![Some(ValueId::TRUE), Some(ValueId::FALSE)]
        );
        let p = VarValue::new(0, ValueId::TRUE).unwrap();
        let q = VarValue::new(1, ValueId::TRUE).unwrap();
        assert!(sas.is_mutex(p, q));
        assert_eq!(
            sas.actions[0].end_eff,
            vec![
                SasCondition::new(0, ValueId::FALSE),
                SasCondition::new(1, ValueId::TRUE)
            ]
        );
        assert_eq!(sas.goals[0].start_cond, vec![SasCondition::new(1, ValueId::TRUE)]);
    }

    #[test]
    fn negated_precondition_keeps_booleans() {
        let mut task = mutex_task();
        // the goal asks for `p` to be false as well
        task.operators[1].at_start.prec.push(fluent(0, &[], FALSE));
        let sas = translated(&task, &Config::default());
        let names: Vec<&str> = sas.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["(p)", "(q)"]);
        assert_eq!(
            sas.goals[0].start_cond,
            vec![
                SasCondition::new(1, ValueId::TRUE),
                SasCondition::new(0, ValueId::FALSE)
            ]
        );
    }

    #[test]
    fn finite_domain_variables() {
        let sas = translated(&logistics_task(), &Config::default());
        let at = variable_named(&sas, "(at t1)");
        let l1 = sas.value_by_name("l1").unwrap();
        let l2 = sas.value_by_name("l2").unwrap();
        assert_eq!(at.possible_values, vec![l1, l2]);
        assert_eq!(at.initial_state_value(), Some(l1));
        let visited = variable_named(&sas, "(visited l2)");
        assert!(visited.is_boolean());
        assert_eq!(visited.initial_state_value(), Some(ValueId::FALSE));
        assert_eq!(sas.numeric_variables.len(), 1);
        assert_eq!(sas.numeric_initial_state, vec![100.0]);

        let drive = &sas.actions[0];
        assert_eq!(drive.name, "drive t1 l1 l2");
        assert_eq!(drive.start_cond, vec![SasCondition {
            var: at.index,
            value: l1,
            is_modified: true,
        }]);
        assert!(drive.end_eff.contains(&SasCondition::new(at.index, l2)));
        assert!(drive
            .end_eff
            .contains(&SasCondition::new(visited.index, ValueId::TRUE)));
        assert_eq!(drive.end_num_eff[0].exp, SasExpression::Number(10.0));
        assert!(drive.fixed_cost);
        assert_eq!(drive.fixed_cost_value, 10.0);
        assert!(sas.metric_depends_on_duration);
        assert_eq!(
            sas.goal_list().unwrap(),
            vec![VarValue::new(visited.index, ValueId::TRUE).unwrap()]
        );
    }

    #[test]
    fn actions_with_mutex_conditions() {
        let mut task = mutex_task();
        let mut both = operator("both", vec![]);
        both.at_start.prec = vec![fluent(0, &[], TRUE)];
        both.over_all_prec = vec![fluent(1, &[], TRUE)];
        task.operators.push(both);
        let grounded = ground(&task, false).unwrap();
        let sas = translate(&grounded, &Config::default()).unwrap();
        let names: Vec<&str> = sas.actions.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["go"]);
        assert_eq!(sas.actions[0].index, 0);
    }

    #[test]
    fn goal_negation() {
        assert_eq!(
            negate(SasGoal::Not(Box::new(SasGoal::Constant(true)))),
            SasGoal::Constant(true)
        );
        assert_eq!(negate(SasGoal::Constant(true)), SasGoal::Constant(false));
        assert_eq!(
            negate(SasGoal::Compare {
                comparator: crate::datatypes::Comparator::Less,
                terms: vec![]
            }),
            SasGoal::Compare {
                comparator: crate::datatypes::Comparator::GreaterEq,
                terms: vec![]
            }
        );
    }

    #[test]
    fn deterministic() {
        let first = translated(&logistics_task(), &Config::default());
        let second = translated(&logistics_task(), &Config::default());
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(format!("{}", first), format!("{}", second));
    }

    #[cfg(feature = "mutexfile")]
    #[test]
    fn mutex_file() {
        let dir = std::env::temp_dir().join(format!("ground-sas-mutex-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = Config {
            generate_mutex_file: true,
            mutex_file: dir.join("mutex.txt"),
            ..Default::default()
        };
        translated(&mutex_task(), &config);
        let content = std::fs::read_to_string(&config.mutex_file).unwrap();
        assert_eq!(content, "(p) (q)\n");
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
