//! Action durations and costs that can be computed before planning.
//!
//! The cost of an action is the change of the metric it causes. It cannot be known in advance
//! if the duration depends on the state while the metric reads the makespan, or if a numeric
//! effect on a variable of the metric depends on the state.
use super::{SasAction, SasExpression, SasMetricExpression, SasTask};
use crate::error::Result;

/// Duration of goal pseudo-actions
pub const EPSILON: f64 = 0.002;

#[derive(Debug, Default)]
struct ActionCost {
    fixed_duration: bool,
    fixed_duration_value: Vec<f64>,
    fixed_cost: bool,
    fixed_cost_value: f64,
}

struct CostModel<'t> {
    task: &'t SasTask,
    /// numeric variables no action modifies; only known when static data has been kept
    static_variables: Option<Vec<bool>>,
    on_metric: Vec<bool>,
}

impl SasMetricExpression {
    /// Marks the numeric variables the metric reads; returns true if it reads the makespan
    fn collect_variables(&self, on_metric: &mut [bool]) -> bool {
        match self {
            SasMetricExpression::TotalTime => true,
            SasMetricExpression::Var(var) => {
                if let Some(flag) = on_metric.get_mut(*var) {
                    *flag = true;
                }
                false
            }
            SasMetricExpression::Sum(ops)
            | SasMetricExpression::Sub(ops)
            | SasMetricExpression::Mul(ops)
            | SasMetricExpression::Div(ops) => ops
                .iter()
                .fold(false, |acc, op| op.collect_variables(on_metric) || acc),
            SasMetricExpression::Number(_) | SasMetricExpression::IsViolated(_) => false,
        }
    }
}

impl SasAction {
    fn set_goal_cost(&mut self) {
        self.fixed_duration = true;
        self.fixed_duration_value = vec![EPSILON];
        self.fixed_cost = true;
        self.fixed_cost_value = 0.0;
    }
}

impl CostModel<'_> {
    /// Returns true if the expression reads a non-static variable.
    /// With `on_metric`, only the variables of the metric are taken into account.
    fn depends_on_state(&self, exp: &SasExpression, on_metric: Option<&[bool]>) -> bool {
        let mut depends = false;
        exp.for_each_var(&mut |var| {
            let is_static = self
                .static_variables
                .as_ref()
                .and_then(|s| s.get(var).copied())
                .unwrap_or(false);
            if !is_static {
                depends |= on_metric
                    .map(|m| m.get(var).copied().unwrap_or(false))
                    .unwrap_or(true);
            }
        });
        depends
    }

    fn action_cost(&self, action: &SasAction) -> Result<ActionCost> {
        let mut cost = ActionCost {
            fixed_duration: !action
                .duration
                .iter()
                .any(|d| self.depends_on_state(&d.exp, None)),
            ..Default::default()
        };
        if cost.fixed_duration {
            for d in &action.duration {
                cost.fixed_duration_value
                    .push(d.exp.evaluate(&self.task.numeric_initial_state, 0.0)?);
            }
        }
        cost.fixed_cost = (cost.fixed_duration || !self.task.metric_depends_on_duration)
            && !action
                .numeric_effects()
                .any(|e| self.depends_on_state(&e.exp, Some(&self.on_metric)));
        if cost.fixed_cost {
            let duration = cost.fixed_duration_value.first().copied().unwrap_or(0.0);
            cost.fixed_cost_value =
                self.cost_in(action, &self.task.numeric_initial_state, 0.0, duration)?;
        }
        log::trace!(
            "{}: fixed duration {:?}, fixed cost {}",
            action.name,
            cost.fixed_duration_value,
            cost.fixed_cost
        );
        Ok(cost)
    }

    /// Change of the metric when the action is applied in `state` at time `makespan`
    fn cost_in(&self, action: &SasAction, state: &[f64], makespan: f64, duration: f64) -> Result<f64> {
        let metric = match &self.task.metric {
            Some(metric) => &metric.expression,
            None => return Ok(0.0),
        };
        let before = metric.evaluate(state, makespan)?;
        let mut after_state = state.to_vec();
        for eff in action.numeric_effects() {
            let value = eff.exp.evaluate(&after_state, duration)?;
            if let Some(current) = after_state.get_mut(eff.var) {
                *current = eff.assignment.apply(*current, value);
            }
        }
        Ok(metric.evaluate(&after_state, makespan + duration)? - before)
    }
}

impl SasTask {
    /// Numeric variables that no action modifies
    fn static_numeric_variables(&self) -> Vec<bool> {
        let mut is_static = vec![true; self.numeric_variables.len()];
        for action in &self.actions {
            for eff in action.numeric_effects() {
                if let Some(flag) = is_static.get_mut(eff.var) {
                    *flag = false;
                }
            }
        }
        is_static
    }

    /// Computes which actions have a fixed duration and a fixed cost, and their values.
    ///
    /// Static numeric variables have already been compiled away unless `keep_static_data` is set,
    /// in which case they are detected here.
    pub fn compute_initial_actions_cost(&mut self, keep_static_data: bool) -> Result<()> {
        if self.numeric_initial_state.len() != self.numeric_variables.len() {
            self.compute_initial_state();
        }
        let mut on_metric = vec![false; self.numeric_variables.len()];
        self.metric_depends_on_duration = self
            .metric
            .as_ref()
            .map(|m| m.expression.collect_variables(&mut on_metric))
            .unwrap_or(false);
        let costs = {
            let model = CostModel {
                task: &*self,
                static_variables: keep_static_data.then(|| self.static_numeric_variables()),
                on_metric,
            };
            self.actions
                .iter()
                .map(|a| model.action_cost(a))
                .collect::<Result<Vec<_>>>()?
        };
        self.variable_costs = costs.iter().any(|c| !c.fixed_cost);
        for (action, cost) in self.actions.iter_mut().zip(costs) {
            action.fixed_duration = cost.fixed_duration;
            action.fixed_duration_value = cost.fixed_duration_value;
            action.fixed_cost = cost.fixed_cost;
            action.fixed_cost_value = cost.fixed_cost_value;
        }
        for goal in &mut self.goals {
            goal.set_goal_cost();
        }
        log::debug!(
            "metric depends on duration: {}, variable costs: {}",
            self.metric_depends_on_duration,
            self.variable_costs
        );
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datatypes::{Assignment, Comparator, Objective, TimeSpecifier};
    use crate::sas::{SasDuration, SasMetric, SasNumericEffect};
    use test_log::test;

    fn task_with_fuel(metric: SasMetricExpression) -> SasTask {
        let mut task = SasTask::new();
        let fuel = task.create_numeric_variable("(fuel)".to_string());
        let distance = task.create_numeric_variable("(distance)".to_string());
        task.numeric_variables[fuel]
            .add_initial_value(100.0, 0.0)
            .unwrap();
        task.numeric_variables[distance]
            .add_initial_value(10.0, 0.0)
            .unwrap();
        let drive = task.create_action("drive".to_string());
        drive.duration.push(SasDuration {
            time: TimeSpecifier::None,
            comparator: Comparator::Eq,
            exp: SasExpression::Var(distance),
        });
        drive.end_num_eff.push(SasNumericEffect {
            assignment: Assignment::Decrease,
            var: fuel,
            exp: SasExpression::Var(distance),
        });
        task.create_goal();
        task.metric = Some(SasMetric {
            objective: Objective::Minimize,
            expression: metric,
        });
        task
    }

    #[test]
    fn fixed_with_static_data() {
        let mut task = task_with_fuel(SasMetricExpression::TotalTime);
        task.compute_initial_actions_cost(true).unwrap();
        assert!(task.metric_depends_on_duration);
        let drive = &task.actions[0];
        assert!(drive.fixed_duration);
        assert_eq!(drive.fixed_duration_value, vec![10.0]);
        assert!(drive.fixed_cost);
        assert_eq!(drive.fixed_cost_value, 10.0);
        assert!(!task.variable_costs);

        let goal = &task.goals[0];
        assert_eq!(goal.fixed_duration_value, vec![EPSILON]);
        assert_eq!(goal.fixed_cost_value, 0.0);
    }

    #[test]
    fn variable_duration() {
        // without static detection the distance counts as part of the state
        let mut task = task_with_fuel(SasMetricExpression::TotalTime);
        task.compute_initial_actions_cost(false).unwrap();
        assert!(!task.actions[0].fixed_duration);
        assert!(!task.actions[0].fixed_cost);
        assert!(task.variable_costs);
    }

    #[test]
    fn fuel_metric() {
        let mut task = task_with_fuel(SasMetricExpression::Sub(vec![
            SasMetricExpression::Number(100.0),
            SasMetricExpression::Var(0),
        ]));
        task.compute_initial_actions_cost(true).unwrap();
        assert!(!task.metric_depends_on_duration);
        assert!(task.actions[0].fixed_cost);
        assert_eq!(task.actions[0].fixed_cost_value, 10.0);

        // the duration reads the distance, which is part of the state now, but the metric
        // ignores the makespan and the distance itself
        task.compute_initial_actions_cost(false).unwrap();
        assert!(!task.actions[0].fixed_duration);
        assert!(task.actions[0].fixed_cost);
        assert_eq!(task.actions[0].fixed_cost_value, 10.0);
    }
}
