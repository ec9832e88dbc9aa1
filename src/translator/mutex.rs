//! Fixpoint computation of the propositions that can never hold at the same time.
//!
//! Starting from the propositions of the initial state, the set of reachable propositions `F*` and
//! the mutex relation `M*` are refined by applying every action whose preconditions are reachable
//! and not pairwise mutex, until a pass neither reaches a new proposition nor changes a mutex.
use roaring::RoaringTreemap;

use crate::datatypes::{GroundedAction, GroundedCondition, GroundedTask, ObjectId, VarId};

/// Symmetric relation over grounded variables, stored as a flat `n * i + j` bitmap
#[derive(Debug, Default, Clone)]
pub(super) struct MutexMatrix {
    size: u64,
    pairs: RoaringTreemap,
}

impl MutexMatrix {
    pub(super) fn new(size: usize) -> Self {
        Self {
            size: size as u64,
            pairs: RoaringTreemap::new(),
        }
    }

    fn code(&self, v1: VarId, v2: VarId) -> u64 {
        self.size * v1.value() as u64 + v2.value() as u64
    }

    pub(super) fn contains(&self, v1: VarId, v2: VarId) -> bool {
        self.pairs.contains(self.code(v1, v2))
    }

    /// Returns true if the pair was not mutex before
    pub(super) fn insert(&mut self, v1: VarId, v2: VarId) -> bool {
        if v1 == v2 {
            return false;
        }
        let (c1, c2) = (self.code(v1, v2), self.code(v2, v1));
        self.pairs.insert(c2);
        self.pairs.insert(c1)
    }

    /// Returns true if the pair was mutex before
    pub(super) fn remove(&mut self, v1: VarId, v2: VarId) -> bool {
        let (c1, c2) = (self.code(v1, v2), self.code(v2, v1));
        self.pairs.remove(c2);
        self.pairs.remove(c1)
    }

    /// Every mutex pair once, with the smaller variable first
    pub(super) fn pairs(&self) -> impl Iterator<Item = (VarId, VarId)> + '_ {
        let size = self.size.max(1);
        self.pairs
            .iter()
            .map(move |code| (VarId((code / size) as usize), VarId((code % size) as usize)))
            .filter(|(v1, v2)| v1 < v2)
    }

    pub(super) fn len(&self) -> u64 {
        self.pairs.len() / 2
    }
}

/// State of the mutex fixpoint over the actions of a grounded task
#[derive(Debug)]
pub(super) struct MutexFixpoint<'g> {
    grounded: &'g GroundedTask,
    /// boolean propositions; other variables never take part in mutexes
    pub(super) is_literal: Vec<bool>,
    /// `F*`
    pub(super) reached: Vec<bool>,
    /// `F*` at the end of the previous pass
    reached_before: Vec<bool>,
    /// actions applied at least once
    fired: Vec<bool>,
    /// `M*`
    pub(super) mutex: MutexMatrix,
    new_literals: usize,
    changes: usize,
}

/// Literal effects of an action, with the position where the at-end part starts
#[derive(Debug, Default)]
struct Effects {
    new: Vec<VarId>,
    add: Vec<VarId>,
    del: Vec<VarId>,
    start_new: usize,
    start_add: usize,
    start_del: usize,
}

impl<'g> MutexFixpoint<'g> {
    /// Seeds `F*` with the propositions that hold at some time point of the initial state
    pub(super) fn new(grounded: &'g GroundedTask) -> Self {
        let num_vars = grounded.variables.len();
        let mut is_literal = vec![false; num_vars];
        let mut reached = vec![false; num_vars];
        let mut new_literals = 0;
        for var in &grounded.variables {
            if grounded.task.is_boolean_function(var.function) {
                is_literal[var.index.value()] = true;
                if var
                    .initial_values
                    .iter()
                    .any(|(_, value)| value.object() == Some(ObjectId::TRUE))
                {
                    reached[var.index.value()] = true;
                    new_literals += 1;
                }
            }
        }
        Self {
            grounded,
            is_literal,
            reached_before: reached.clone(),
            reached,
            fired: vec![false; grounded.actions.len()],
            mutex: MutexMatrix::new(num_vars),
            new_literals,
            changes: 0,
        }
    }

    /// Runs passes over the actions until nothing changes or `pass_limit` passes have been made
    pub(super) fn run(&mut self, pass_limit: usize) -> usize {
        let mut passes = 0;
        while self.new_literals > 0 || self.changes > 0 {
            if passes >= pass_limit {
                log::warn!(
                    "mutex computation stopped after {} passes without converging",
                    passes
                );
                break;
            }
            passes += 1;
            self.new_literals = 0;
            self.changes = 0;
            let grounded = self.grounded;
            for (index, action) in grounded.actions.iter().enumerate() {
                self.check_action(index, action);
            }
            self.reached_before.clone_from(&self.reached);
            log::debug!(
                "mutex pass {}: {} new propositions, {} mutex changes",
                passes,
                self.new_literals,
                self.changes
            );
        }
        passes
    }

    /// Pushes the literal precondition to `pre`; returns false if it has not been reached yet
    fn holds(&self, cond: &GroundedCondition, pre: &mut Vec<VarId>) -> bool {
        if !self.is_literal[cond.var.value()] || cond.value == ObjectId::FALSE {
            return true;
        }
        pre.push(cond.var);
        self.reached_before[cond.var.value()]
    }

    fn check_action(&mut self, index: usize, action: &GroundedAction) {
        let mut pre = Vec::new();
        for cond in action.start_cond.iter().chain(action.over_cond.iter()) {
            if !self.holds(cond, &mut pre) {
                return;
            }
        }
        let start_over = pre.len();
        for cond in &action.end_cond {
            if !self.holds(cond, &mut pre) {
                return;
            }
        }
        for (i, p) in pre.iter().enumerate() {
            if pre[i + 1..].iter().any(|q| self.mutex.contains(*p, *q)) {
                return;
            }
        }
        self.compute_mutex(index, action, &pre, start_over);
    }

    fn classify(&self, effects: &[GroundedCondition], into: &mut Effects) {
        for eff in effects {
            if !self.is_literal[eff.var.value()] {
                continue;
            }
            if eff.value == ObjectId::TRUE {
                into.add.push(eff.var);
                if !self.reached[eff.var.value()] {
                    into.new.push(eff.var);
                }
            } else {
                into.del.push(eff.var);
            }
        }
    }

    fn add_mutex(&mut self, v1: VarId, v2: VarId) {
        if self.mutex.insert(v1, v2) {
            log::trace!(
                "mutex {} {}",
                self.grounded.var_name(v1),
                self.grounded.var_name(v2)
            );
            self.changes += 1;
        }
    }

    fn delete_mutex(&mut self, v1: VarId, v2: VarId) {
        if self.mutex.remove(v1, v2) {
            self.changes += 1;
        }
    }

    fn compute_mutex(&mut self, index: usize, action: &GroundedAction, pre: &[VarId], start_over: usize) {
        let mut eff = Effects::default();
        self.classify(&action.start_eff, &mut eff);
        eff.start_new = eff.new.len();
        eff.start_add = eff.add.len();
        eff.start_del = eff.del.len();
        self.classify(&action.end_eff, &mut eff);
        let literals: Vec<VarId> = (0..self.is_literal.len())
            .filter(|&q| self.is_literal[q])
            .map(VarId)
            .collect();

        for (fi, &f) in eff.new.iter().enumerate() {
            let f_at_end = fi >= eff.start_new;
            for (hi, &h) in eff.del.iter().enumerate() {
                if (f_at_end || hi < eff.start_del)
                    && (pre.contains(&h) || eff.add[..eff.start_add].contains(&h))
                {
                    self.add_mutex(f, h);
                }
            }
            for (pi, &p) in pre.iter().enumerate() {
                if pi >= start_over && !f_at_end {
                    continue;
                }
                for &q in &literals {
                    if q != f && self.mutex.contains(p, q) && !eff.del.contains(&q) {
                        self.add_mutex(f, q);
                    }
                }
            }
        }

        if !self.fired[index] {
            let (start_add, end_add) = eff.add.split_at(eff.start_add);
            for (i, &p) in start_add.iter().enumerate() {
                for &q in &start_add[i + 1..] {
                    self.delete_mutex(p, q);
                }
                if !eff.del.contains(&p) {
                    for &q in end_add {
                        self.delete_mutex(p, q);
                    }
                }
            }
            for (i, &p) in end_add.iter().enumerate() {
                for &q in &end_add[i + 1..] {
                    self.delete_mutex(p, q);
                }
            }
        }

        for &l in eff.add.iter().filter(|l| !eff.new.contains(*l)) {
            for &q in &literals {
                if self.mutex.contains(l, q)
                    && !eff.del.contains(&q)
                    && !pre.iter().any(|&p| self.mutex.contains(p, q))
                {
                    self.delete_mutex(l, q);
                }
            }
        }

        for &f in &eff.new {
            if !self.reached[f.value()] {
                self.reached[f.value()] = true;
                self.new_literals += 1;
            }
        }
        self.fired[index] = true;
    }

    /// Returns true if the two conditions can never hold together.
    ///
    /// A negated proposition is mutex with the proposition itself, and two different values of a
    /// finite-domain variable are mutex with each other.
    pub(super) fn is_mutex(&self, c1: &GroundedCondition, c2: &GroundedCondition) -> bool {
        let (l1, l2) = (self.is_literal[c1.var.value()], self.is_literal[c2.var.value()]);
        match (l1, l2) {
            (true, true) => {
                let (neg1, neg2) = (c1.value == ObjectId::FALSE, c2.value == ObjectId::FALSE);
                match (neg1, neg2) {
                    (true, true) => false,
                    (false, false) => self.mutex.contains(c1.var, c2.var),
                    _ => c1.var == c2.var,
                }
            }
            (false, false) => c1.var == c2.var && c1.value != c2.value,
            _ => false,
        }
    }

    /// Returns true if two conditions of the action that must hold at the same time are mutex
    pub(super) fn has_mutex_conditions(&self, action: &GroundedAction) -> bool {
        let pairwise = |conds: &[GroundedCondition]| {
            conds
                .iter()
                .enumerate()
                .any(|(i, c1)| conds[i + 1..].iter().any(|c2| self.is_mutex(c1, c2)))
        };
        let across = |conds: &[GroundedCondition], others: &[GroundedCondition]| {
            conds
                .iter()
                .any(|c1| others.iter().any(|c2| self.is_mutex(c1, c2)))
        };
        pairwise(&action.start_cond)
            || pairwise(&action.end_cond)
            || pairwise(&action.over_cond)
            || across(&action.over_cond, &action.start_cond)
            || across(&action.over_cond, &action.end_cond)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::grounder::ground;
    use crate::test::*;
    use quickcheck_macros::quickcheck;
    use test_log::test;

    #[test]
    fn matrix() {
        let mut matrix = MutexMatrix::new(4);
        assert!(matrix.insert(VarId(3), VarId(1)));
        assert!(!matrix.insert(VarId(1), VarId(3)));
        assert!(!matrix.insert(VarId(2), VarId(2)));
        assert!(matrix.contains(VarId(1), VarId(3)));
        assert!(matrix.contains(VarId(3), VarId(1)));
        assert_eq!(matrix.pairs().collect::<Vec<_>>(), vec![(VarId(1), VarId(3))]);
        assert_eq!(matrix.len(), 1);
        assert!(matrix.remove(VarId(1), VarId(3)));
        assert!(!matrix.contains(VarId(3), VarId(1)));
        assert!(!matrix.remove(VarId(1), VarId(3)));
    }

    #[quickcheck]
    fn matrix_symmetry(pairs: Vec<(u8, u8)>) -> bool {
        let mut matrix = MutexMatrix::new(16);
        for (a, b) in pairs {
            let (a, b) = (VarId((a % 16) as usize), VarId((b % 16) as usize));
            if a.value() % 3 == 0 {
                matrix.remove(a, b);
            } else {
                matrix.insert(a, b);
            }
        }
        (0..16).all(|i| {
            (0..16).all(|j| matrix.contains(VarId(i), VarId(j)) == matrix.contains(VarId(j), VarId(i)))
        }) && (0..16).all(|i| !matrix.contains(VarId(i), VarId(i)))
    }

    #[test]
    fn swap() {
        let grounded = ground(&mutex_task(), false).unwrap();
        let mut fixpoint = MutexFixpoint::new(&grounded);
        assert_eq!(fixpoint.is_literal, vec![true, true]);
        assert_eq!(fixpoint.reached, vec![true, false]);
        let passes = fixpoint.run(100);
        assert_eq!(passes, 2);
        assert_eq!(fixpoint.reached, vec![true, true]);
        assert!(fixpoint.mutex.contains(VarId(0), VarId(1)));
        assert_eq!(fixpoint.mutex.len(), 1);
        // the evidence of an applied action is never mutex
        let go = &grounded.actions[0];
        assert!(!fixpoint.has_mutex_conditions(go));
    }

    #[test]
    fn pass_limit() {
        let grounded = ground(&mutex_task(), false).unwrap();
        let mut fixpoint = MutexFixpoint::new(&grounded);
        assert_eq!(fixpoint.run(1), 1);
        assert!(fixpoint.mutex.contains(VarId(1), VarId(0)));
    }

    #[test]
    fn mutex_conditions() {
        let grounded = ground(&mutex_task(), false).unwrap();
        let mut fixpoint = MutexFixpoint::new(&grounded);
        fixpoint.run(100);
        let (p, q) = (VarId(0), VarId(1));
        let cond = |var, value| GroundedCondition { var, value };
        assert!(fixpoint.is_mutex(&cond(p, ObjectId::TRUE), &cond(q, ObjectId::TRUE)));
        assert!(fixpoint.is_mutex(&cond(p, ObjectId::FALSE), &cond(p, ObjectId::TRUE)));
        assert!(fixpoint.is_mutex(&cond(p, ObjectId::TRUE), &cond(p, ObjectId::FALSE)));
        assert!(!fixpoint.is_mutex(&cond(p, ObjectId::FALSE), &cond(q, ObjectId::FALSE)));
        assert!(!fixpoint.is_mutex(&cond(p, ObjectId::FALSE), &cond(q, ObjectId::TRUE)));

        let mut both = grounded.actions[0].clone();
        both.start_cond = vec![cond(p, ObjectId::TRUE)];
        both.over_cond = vec![cond(q, ObjectId::TRUE)];
        assert!(fixpoint.has_mutex_conditions(&both));
        both.over_cond.clear();
        both.end_cond = vec![cond(q, ObjectId::TRUE)];
        // conditions at start and at end do not hold at the same time
        assert!(!fixpoint.has_mutex_conditions(&both));
    }
}
