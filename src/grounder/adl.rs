//! Goal descriptions of preferences and constraints, and the elimination of their quantifiers.
//!
//! Goals are first grounded with the bindings of the enclosing action or constraint. Parameters of
//! `forall`/`exists` sub-goals stay symbolic ([PartialTerm::Quantified]) until [Grounder::instantiate]
//! replaces every quantifier by the conjunction or disjunction of its instances over the
//! type-compatible objects.
use super::{bind, Grounder};
use crate::datatypes::{
    Comparator, Constraint, Expression, GoalDescription, GroundedConstraint, GroundedGoal,
    Literal, ObjectId, PartialExpression, PartialTerm, Term, TypeId,
};
use crate::error::{Error, Result};

fn resolve(term: &PartialTerm, bindings: &[ObjectId]) -> Result<ObjectId> {
    match term {
        PartialTerm::Object(obj) => Ok(*obj),
        PartialTerm::Quantified(i) => bindings
            .get(*i)
            .copied()
            .ok_or(Error::UnboundParameter(*i)),
    }
}

/// Conjunction (`and = true`) or disjunction of already simplified goals
fn combine(and: bool, mut terms: Vec<GroundedGoal>) -> GroundedGoal {
    match terms.len() {
        0 => GroundedGoal::Constant(and),
        1 => terms.remove(0),
        _ if and => GroundedGoal::And(terms),
        _ => GroundedGoal::Or(terms),
    }
}

impl Grounder<'_> {
    fn partial_term(term: &Term, params: &[ObjectId]) -> PartialTerm {
        match term {
            Term::Param(i) if *i < params.len() => PartialTerm::Object(params[*i]),
            Term::Param(i) => PartialTerm::Quantified(i - params.len()),
            Term::Object(obj) => PartialTerm::Object(*obj),
        }
    }

    /// Grounds the parts of a goal that only depend on `params`
    pub(super) fn ground_goal(
        &mut self,
        goal: &GoalDescription,
        params: &[ObjectId],
    ) -> Result<GroundedGoal> {
        Ok(match goal {
            GoalDescription::Literal(literal) => {
                self.fluent_goal(literal, &Term::Object(ObjectId::TRUE), true, params)
            }
            GoalDescription::NegLiteral(literal) => {
                self.fluent_goal(literal, &Term::Object(ObjectId::FALSE), true, params)
            }
            GoalDescription::And(goals) => GroundedGoal::And(
                goals
                    .iter()
                    .map(|g| self.ground_goal(g, params))
                    .collect::<Result<_>>()?,
            ),
            GoalDescription::Or(goals) => GroundedGoal::Or(
                goals
                    .iter()
                    .map(|g| self.ground_goal(g, params))
                    .collect::<Result<_>>()?,
            ),
            GoalDescription::Not(goal) => GroundedGoal::Not(Box::new(self.ground_goal(goal, params)?)),
            GoalDescription::Imply(p, q) => GroundedGoal::Imply(
                Box::new(self.ground_goal(p, params)?),
                Box::new(self.ground_goal(q, params)?),
            ),
            GoalDescription::Exists { parameters, goal } => GroundedGoal::Exists {
                types: parameters.iter().map(|p| p.types.clone()).collect(),
                goal: Box::new(self.ground_goal(goal, params)?),
            },
            GoalDescription::Forall { parameters, goal } => GroundedGoal::Forall {
                types: parameters.iter().map(|p| p.types.clone()).collect(),
                goal: Box::new(self.ground_goal(goal, params)?),
            },
            GoalDescription::Equality { left, right } => GroundedGoal::Equality {
                equal: true,
                left: Self::partial_term(left, params),
                right: Self::partial_term(right, params),
            },
            GoalDescription::Inequality { left, right } => GroundedGoal::Equality {
                equal: false,
                left: Self::partial_term(left, params),
                right: Self::partial_term(right, params),
            },
            GoalDescription::Compare {
                comparator,
                left,
                right,
            } => {
                let equal = *comparator == Comparator::Eq;
                match (comparator, left, right) {
                    (Comparator::Eq | Comparator::Neq, Expression::Fluent(l), Expression::Term(t))
                    | (Comparator::Eq | Comparator::Neq, Expression::Term(t), Expression::Fluent(l))
                        if !self.parsed().is_numeric_function(l.function) =>
                    {
                        self.fluent_goal(l, t, equal, params)
                    }
                    (Comparator::Eq | Comparator::Neq, Expression::Term(l), Expression::Term(r)) => {
                        GroundedGoal::Equality {
                            equal,
                            left: Self::partial_term(l, params),
                            right: Self::partial_term(r, params),
                        }
                    }
                    _ => GroundedGoal::Compare {
                        comparator: *comparator,
                        terms: vec![
                            self.partial_expression(left, params)?,
                            self.partial_expression(right, params)?,
                        ],
                    },
                }
            }
            GoalDescription::At { time, goal } => GroundedGoal::At {
                time: *time,
                goal: Box::new(self.ground_goal(goal, params)?),
            },
        })
    }

    fn fluent_goal(
        &mut self,
        literal: &Literal,
        value: &Term,
        equal: bool,
        params: &[ObjectId],
    ) -> GroundedGoal {
        let args: Vec<PartialTerm> = literal
            .params
            .iter()
            .map(|t| Self::partial_term(t, params))
            .collect();
        let value = Self::partial_term(value, params);
        let objects: Option<Vec<ObjectId>> = args
            .iter()
            .map(|a| match a {
                PartialTerm::Object(obj) => Some(*obj),
                PartialTerm::Quantified(_) => None,
            })
            .collect();
        match (objects, value) {
            (Some(objects), PartialTerm::Object(value)) => {
                let parsed = self.parsed();
                let var = self
                    .ctx
                    .get_or_create_variable(parsed, literal.function, objects);
                GroundedGoal::Fluent { var, value, equal }
            }
            _ => GroundedGoal::UngroundedFluent {
                function: literal.function,
                params: args,
                value,
                equal,
            },
        }
    }

    fn partial_expression(
        &mut self,
        exp: &Expression,
        params: &[ObjectId],
    ) -> Result<PartialExpression> {
        Ok(match exp {
            Expression::Number(num) => PartialExpression::Number(*num),
            Expression::Term(term) => PartialExpression::Term(Self::partial_term(term, params)),
            Expression::Fluent(literal) => {
                let args: Vec<PartialTerm> = literal
                    .params
                    .iter()
                    .map(|t| Self::partial_term(t, params))
                    .collect();
                if args.iter().all(|a| matches!(a, PartialTerm::Object(_))) {
                    let objects = literal
                        .params
                        .iter()
                        .map(|t| bind(t, params))
                        .collect::<Result<Vec<_>>>()?;
                    let parsed = self.parsed();
                    PartialExpression::Var(self.ctx.get_or_create_variable(
                        parsed,
                        literal.function,
                        objects,
                    ))
                } else {
                    PartialExpression::UngroundedVar {
                        function: literal.function,
                        params: args,
                    }
                }
            }
            Expression::Duration | Expression::SharpT => {
                return Err(Error::InvalidTask(
                    "?duration and #t are not allowed in goals".to_string(),
                ))
            }
            Expression::Sum(ops) => PartialExpression::Sum(self.partial_operands(ops, params)?),
            Expression::Sub(ops) => PartialExpression::Sub(self.partial_operands(ops, params)?),
            Expression::Mul(ops) => PartialExpression::Mul(self.partial_operands(ops, params)?),
            Expression::Div(ops) => PartialExpression::Div(self.partial_operands(ops, params)?),
        })
    }

    fn partial_operands(
        &mut self,
        ops: &[Expression],
        params: &[ObjectId],
    ) -> Result<Vec<PartialExpression>> {
        ops.iter()
            .map(|op| self.partial_expression(op, params))
            .collect()
    }

    fn compatible_objects(&self, types: &[TypeId]) -> Vec<ObjectId> {
        self.parsed()
            .objects
            .iter()
            .enumerate()
            .filter(|(_, obj)| self.types.compatible(&obj.types, types))
            .map(|(i, _)| ObjectId(i))
            .collect()
    }

    /// Every combination of objects for a list of quantified parameters
    fn quantifier_bindings(&self, types: &[Vec<TypeId>]) -> Vec<Vec<ObjectId>> {
        let mut combinations: Vec<Vec<ObjectId>> = vec![Vec::new()];
        for valid in types {
            let objects = self.compatible_objects(valid);
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    objects.iter().map(move |obj| {
                        let mut combination = prefix.clone();
                        combination.push(*obj);
                        combination
                    })
                })
                .collect();
        }
        combinations
    }

    /// Replaces quantifiers and symbolic parameters by objects.
    ///
    /// Returns `None` if the goal refers to a non-boolean variable that has never been grounded.
    /// Missing boolean variables are never true.
    pub(super) fn instantiate(
        &self,
        goal: &GroundedGoal,
        bindings: &[ObjectId],
    ) -> Result<Option<GroundedGoal>> {
        Ok(Some(match goal {
            GroundedGoal::Fluent { .. } | GroundedGoal::Constant(_) => goal.clone(),
            GroundedGoal::UngroundedFluent {
                function,
                params,
                value,
                equal,
            } => {
                let objects = params
                    .iter()
                    .map(|p| resolve(p, bindings))
                    .collect::<Result<Vec<_>>>()?;
                let value = resolve(value, bindings)?;
                match self.ctx.variable(*function, &objects) {
                    Some(var) => GroundedGoal::Fluent {
                        var,
                        value,
                        equal: *equal,
                    },
                    None if self.parsed().is_boolean_function(*function) => {
                        GroundedGoal::Constant((value == ObjectId::FALSE) == *equal)
                    }
                    None => return Ok(None),
                }
            }
            GroundedGoal::And(goals) | GroundedGoal::Or(goals) => {
                let and = matches!(goal, GroundedGoal::And(_));
                let mut terms = Vec::with_capacity(goals.len());
                for g in goals {
                    match self.instantiate(g, bindings)? {
                        None => return Ok(None),
                        Some(GroundedGoal::Constant(b)) if b != and => {
                            return Ok(Some(GroundedGoal::Constant(b)))
                        }
                        Some(GroundedGoal::Constant(_)) => {}
                        Some(g) => terms.push(g),
                    }
                }
                combine(and, terms)
            }
            GroundedGoal::Not(g) => match self.instantiate(g, bindings)? {
                None => return Ok(None),
                Some(GroundedGoal::Constant(b)) => GroundedGoal::Constant(!b),
                Some(g) => GroundedGoal::Not(Box::new(g)),
            },
            GroundedGoal::Imply(p, q) => {
                let p = match self.instantiate(p, bindings)? {
                    None => return Ok(None),
                    Some(p) => p,
                };
                match p {
                    GroundedGoal::Constant(false) => GroundedGoal::Constant(true),
                    GroundedGoal::Constant(true) => return self.instantiate(q, bindings),
                    p => match self.instantiate(q, bindings)? {
                        None => return Ok(None),
                        Some(GroundedGoal::Constant(true)) => GroundedGoal::Constant(true),
                        Some(GroundedGoal::Constant(false)) => GroundedGoal::Not(Box::new(p)),
                        Some(q) => GroundedGoal::Or(vec![GroundedGoal::Not(Box::new(p)), q]),
                    },
                }
            }
            GroundedGoal::Exists { types, goal: inner } | GroundedGoal::Forall { types, goal: inner } => {
                let and = matches!(goal, GroundedGoal::Forall { .. });
                let mut terms = Vec::new();
                let mut instances = 0;
                let mut unresolved = 0;
                for combination in self.quantifier_bindings(types) {
                    instances += 1;
                    let mut extended = bindings.to_vec();
                    extended.extend(combination);
                    match self.instantiate(inner, &extended)? {
                        None => unresolved += 1,
                        Some(GroundedGoal::Constant(b)) if b != and => {
                            return Ok(Some(GroundedGoal::Constant(b)))
                        }
                        Some(GroundedGoal::Constant(_)) => {}
                        Some(g) => terms.push(g),
                    }
                }
                if instances > 0 && unresolved == instances {
                    return Ok(None);
                }
                combine(and, terms)
            }
            GroundedGoal::Equality { equal, left, right } => {
                let left = resolve(left, bindings)?;
                let right = resolve(right, bindings)?;
                GroundedGoal::Constant((left == right) == *equal)
            }
            GroundedGoal::Compare { comparator, terms } => {
                let mut instantiated = Vec::with_capacity(terms.len());
                for term in terms {
                    match self.instantiate_expression(term, bindings)? {
                        Some(exp) => instantiated.push(exp),
                        None => return Ok(None),
                    }
                }
                match instantiated.as_slice() {
                    [PartialExpression::Number(l), PartialExpression::Number(r)] => {
                        GroundedGoal::Constant(comparator.holds(*l, *r))
                    }
                    _ => GroundedGoal::Compare {
                        comparator: *comparator,
                        terms: instantiated,
                    },
                }
            }
            GroundedGoal::At { time, goal } => match self.instantiate(goal, bindings)? {
                None => return Ok(None),
                Some(GroundedGoal::Constant(b)) => GroundedGoal::Constant(b),
                Some(g) => GroundedGoal::At {
                    time: *time,
                    goal: Box::new(g),
                },
            },
        }))
    }

    fn instantiate_expression(
        &self,
        exp: &PartialExpression,
        bindings: &[ObjectId],
    ) -> Result<Option<PartialExpression>> {
        let operands = |ops: &[PartialExpression]| -> Result<Option<Vec<PartialExpression>>> {
            let mut result = Vec::with_capacity(ops.len());
            for op in ops {
                match self.instantiate_expression(op, bindings)? {
                    Some(e) => result.push(e),
                    None => return Ok(None),
                }
            }
            Ok(Some(result))
        };
        Ok(match exp {
            PartialExpression::Number(_) | PartialExpression::Var(_) => Some(exp.clone()),
            PartialExpression::UngroundedVar { function, params } => {
                let objects = params
                    .iter()
                    .map(|p| resolve(p, bindings))
                    .collect::<Result<Vec<_>>>()?;
                self.ctx
                    .variable(*function, &objects)
                    .filter(|var| self.ctx.variables[var.value()].is_numeric)
                    .map(PartialExpression::Var)
            }
            PartialExpression::Term(term) => Some(PartialExpression::Term(PartialTerm::Object(
                resolve(term, bindings)?,
            ))),
            PartialExpression::Sum(ops) => operands(ops)?.map(PartialExpression::Sum),
            PartialExpression::Sub(ops) => operands(ops)?.map(PartialExpression::Sub),
            PartialExpression::Mul(ops) => operands(ops)?.map(PartialExpression::Mul),
            PartialExpression::Div(ops) => operands(ops)?.map(PartialExpression::Div),
        })
    }

    /// Instantiates the quantifiers in the preferences of all actions and goals.
    /// Preferences that cannot be resolved are dropped.
    pub(super) fn remove_adl_features_in_preferences(&mut self) -> Result<()> {
        for is_goal in [false, true] {
            let count = if is_goal {
                self.ctx.goals.len()
            } else {
                self.ctx.actions.len()
            };
            for i in 0..count {
                let preferences = if is_goal {
                    std::mem::take(&mut self.ctx.goals[i].preferences)
                } else {
                    std::mem::take(&mut self.ctx.actions[i].preferences)
                };
                let mut kept = Vec::with_capacity(preferences.len());
                for mut pref in preferences {
                    match self.instantiate(&pref.goal, &[])? {
                        Some(goal) => {
                            pref.goal = goal;
                            kept.push(pref);
                        }
                        None => log::debug!(
                            "preference {} cannot be resolved, dropped",
                            self.ctx.preference_names[pref.name_index]
                        ),
                    }
                }
                if is_goal {
                    self.ctx.goals[i].preferences = kept;
                } else {
                    self.ctx.actions[i].preferences = kept;
                }
            }
        }
        Ok(())
    }

    /// Grounds the trajectory constraints of the problem
    pub(super) fn ground_constraints(&mut self) -> Result<()> {
        for constraint in &self.parsed().constraints {
            match self.ground_constraint(constraint, &[])? {
                Some(c) => self.ctx.constraints.push(c),
                None => log::debug!("constraint cannot be resolved, dropped"),
            }
        }
        Ok(())
    }

    fn ground_constraint_goal(
        &mut self,
        goal: &GoalDescription,
        bindings: &[ObjectId],
    ) -> Result<Option<GroundedGoal>> {
        let grounded = self.ground_goal(goal, bindings)?;
        self.instantiate(&grounded, &[])
    }

    fn ground_constraint(
        &mut self,
        constraint: &Constraint,
        bindings: &[ObjectId],
    ) -> Result<Option<GroundedConstraint>> {
        Ok(match constraint {
            Constraint::And(constraints) => {
                let mut terms = Vec::with_capacity(constraints.len());
                for c in constraints {
                    match self.ground_constraint(c, bindings)? {
                        Some(c) => terms.push(c),
                        None => return Ok(None),
                    }
                }
                if terms.len() == 1 {
                    terms.pop()
                } else {
                    Some(GroundedConstraint::And(terms))
                }
            }
            Constraint::Forall {
                parameters,
                constraint,
            } => {
                let types: Vec<Vec<TypeId>> = parameters.iter().map(|p| p.types.clone()).collect();
                let mut terms = Vec::new();
                for combination in self.quantifier_bindings(&types) {
                    let mut extended = bindings.to_vec();
                    extended.extend(combination);
                    if let Some(c) = self.ground_constraint(constraint, &extended)? {
                        terms.push(c);
                    }
                }
                match terms.len() {
                    0 => None,
                    1 => terms.pop(),
                    _ => Some(GroundedConstraint::And(terms)),
                }
            }
            Constraint::Preference { name, constraint } => {
                let name_index = self.ctx.preference_index(name);
                self.ground_constraint(constraint, bindings)?
                    .map(|c| GroundedConstraint::Preference {
                        name_index,
                        constraint: Box::new(c),
                    })
            }
            Constraint::GoalPreference { name, goal } => {
                let name_index = self.ctx.preference_index(name);
                self.ground_constraint_goal(goal, bindings)?
                    .map(|goal| GroundedConstraint::GoalPreference { name_index, goal })
            }
            Constraint::Temporal { kind, time, goals } => {
                let mut grounded = Vec::with_capacity(goals.len());
                for goal in goals {
                    match self.ground_constraint_goal(goal, bindings)? {
                        Some(g) => grounded.push(g),
                        None => return Ok(None),
                    }
                }
                Some(GroundedConstraint::Temporal {
                    kind: *kind,
                    time: time.clone(),
                    goals: grounded,
                })
            }
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::datatypes::{Parameter, PreprocessedTask, TemporalKind};
    use crate::test::*;
    use test_log::test;

    fn on(term: Term) -> GoalDescription {
        GoalDescription::Literal(Literal {
            function: crate::datatypes::FunctionId(0),
            params: vec![term],
        })
    }

    fn quantified(forall: bool, goal: GoalDescription) -> GoalDescription {
        let parameters = vec![Parameter {
            name: "x".into(),
            types: vec![TypeId(2)],
        }];
        let goal = Box::new(goal);
        if forall {
            GoalDescription::Forall { parameters, goal }
        } else {
            GoalDescription::Exists { parameters, goal }
        }
    }

    fn grounder(task: &PreprocessedTask) -> Grounder<'_> {
        let mut grounder = Grounder::new(task);
        grounder.init_initial_state();
        grounder
    }

    #[test]
    fn quantifiers() {
        let task = two_blocks_task();
        let mut grounder = grounder(&task);

        // (on a) holds initially, (on b) was never grounded
        let forall = grounder.ground_goal(&quantified(true, on(Term::Param(0))), &[]).unwrap();
        assert_eq!(
            grounder.instantiate(&forall, &[]).unwrap(),
            Some(GroundedGoal::Constant(false))
        );
        let exists = grounder.ground_goal(&quantified(false, on(Term::Param(0))), &[]).unwrap();
        assert!(matches!(
            grounder.instantiate(&exists, &[]).unwrap(),
            Some(GroundedGoal::Fluent { value: ObjectId::TRUE, equal: true, .. })
        ));

        // every object equals itself
        let reflexive = quantified(
            true,
            GoalDescription::Equality {
                left: Term::Param(0),
                right: Term::Param(0),
            },
        );
        let grounded = grounder.ground_goal(&reflexive, &[]).unwrap();
        assert_eq!(
            grounder.instantiate(&grounded, &[]).unwrap(),
            Some(GroundedGoal::Constant(true))
        );
    }

    #[test]
    fn implication() {
        let task = two_blocks_task();
        let mut grounder = grounder(&task);
        let a = Term::Object(ObjectId(2));
        let b = Term::Object(ObjectId(3));
        let goal = GoalDescription::Imply(Box::new(on(a)), Box::new(on(b)));
        let grounded = grounder.ground_goal(&goal, &[]).unwrap();
        // (on b) was created as a variable by grounding the goal, nothing is decided yet
        assert!(matches!(
            grounder.instantiate(&grounded, &[]).unwrap(),
            Some(GroundedGoal::Or(_))
        ));

        let trivially = GoalDescription::Imply(
            Box::new(GoalDescription::Inequality { left: a, right: a }),
            Box::new(on(b)),
        );
        let grounded = grounder.ground_goal(&trivially, &[]).unwrap();
        assert_eq!(
            grounder.instantiate(&grounded, &[]).unwrap(),
            Some(GroundedGoal::Constant(true))
        );
    }

    #[test]
    fn unbound_parameter() {
        let task = two_blocks_task();
        let grounder = grounder(&task);
        let goal = GroundedGoal::Equality {
            equal: true,
            left: PartialTerm::Quantified(0),
            right: PartialTerm::Object(ObjectId(2)),
        };
        assert!(matches!(
            grounder.instantiate(&goal, &[]),
            Err(Error::UnboundParameter(0))
        ));
    }

    #[test]
    fn constraints() {
        let mut task = two_blocks_task();
        task.task.constraints = vec![
            Constraint::Forall {
                parameters: vec![Parameter {
                    name: "x".into(),
                    types: vec![TypeId(2)],
                }],
                constraint: Box::new(Constraint::Preference {
                    name: "p0".into(),
                    constraint: Box::new(Constraint::Temporal {
                        kind: TemporalKind::Sometime,
                        time: vec![],
                        goals: vec![on(Term::Param(0))],
                    }),
                }),
            },
            Constraint::GoalPreference {
                name: "p1".into(),
                goal: quantified(false, on(Term::Param(0))),
            },
        ];
        let mut grounder = grounder(&task);
        grounder.ground_constraints().unwrap();
        assert_eq!(grounder.ctx.constraints.len(), 2);
        assert_eq!(grounder.ctx.preference_names, vec!["p0", "p1"]);
        match &grounder.ctx.constraints[0] {
            GroundedConstraint::And(terms) => assert_eq!(terms.len(), 2),
            other => panic!("unexpected constraint {:?}", other),
        }
        assert!(matches!(
            grounder.ctx.constraints[1],
            GroundedConstraint::GoalPreference { name_index: 1, .. }
        ));
    }
}
