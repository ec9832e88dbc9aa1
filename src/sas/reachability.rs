//! Requirer and producer indexes, and the permanent mutexes derived from them.
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use super::{SasAction, SasTask};
use crate::datatypes::VarValue;
use crate::error::Result;

fn push_unique(actions: &mut Vec<usize>, action: usize) {
    if !actions.contains(&action) {
        actions.push(action);
    }
}

impl SasTask {
    /// Indexes the actions by the `(variable, value)` pairs of their conditions and collects the
    /// actions without conditions
    pub fn compute_requirers(&mut self) -> Result<()> {
        let mut requirers: BTreeMap<VarValue, Vec<usize>> = BTreeMap::new();
        self.actions_without_conditions.clear();
        for action in &self.actions {
            let mut has_conditions = false;
            for cond in action.conditions() {
                has_conditions = true;
                push_unique(requirers.entry(cond.code()?).or_default(), action.index);
            }
            if !has_conditions {
                self.actions_without_conditions.push(action.index);
            }
        }
        self.requirers = requirers;
        Ok(())
    }

    /// Indexes the actions by the `(variable, value)` pairs of their effects
    pub fn compute_producers(&mut self) -> Result<()> {
        let mut producers: BTreeMap<VarValue, Vec<usize>> = BTreeMap::new();
        for action in &self.actions {
            for eff in action.effects() {
                push_unique(producers.entry(eff.code()?).or_default(), action.index);
            }
        }
        self.producers = producers;
        Ok(())
    }

    /// Finds the mutex pairs whose second element can not be reached from the first one by
    /// chaining actions, and the pairs of actions that can never follow each other.
    ///
    /// Requires [SasTask::compute_requirers].
    pub fn compute_permanent_mutex(&mut self) -> Result<()> {
        log::info!("[Start] permanent mutex");
        let mut mutex_with: BTreeMap<VarValue, Vec<VarValue>> = BTreeMap::new();
        for (vv1, vv2) in &self.mutex {
            mutex_with.entry(*vv1).or_default().push(*vv2);
        }
        let mut permanent = BTreeSet::new();
        for (vv, others) in &mutex_with {
            let mut goals: HashSet<VarValue> = others.iter().copied().collect();
            self.remove_reachable(*vv, &mut goals)?;
            permanent.extend(goals.into_iter().map(|goal| (*vv, goal)));
        }
        self.permanent_mutex = permanent;

        let mut actions = BTreeSet::new();
        if !self.permanent_mutex.is_empty() {
            for (i, a1) in self.actions.iter().enumerate() {
                for a2 in &self.actions[i + 1..] {
                    if self.check_action_ordering(a1, a2)? && self.check_action_ordering(a2, a1)? {
                        log::trace!("{} and {} are permanently mutex", a1.name, a2.name);
                        actions.insert((a1.index, a2.index));
                        actions.insert((a2.index, a1.index));
                    }
                }
            }
        }
        self.permanent_mutex_actions = actions;
        log::info!(
            "[Done] permanent mutex: {} pairs, {} action pairs",
            self.permanent_mutex.len(),
            self.permanent_mutex_actions.len() / 2
        );
        Ok(())
    }

    /// Removes from `goals` every pair produced by an action chain starting at `vv`
    fn remove_reachable(&self, vv: VarValue, goals: &mut HashSet<VarValue>) -> Result<()> {
        let mut visited_actions = vec![false; self.actions.len()];
        let mut visited: HashSet<VarValue> = HashSet::new();
        let mut open = VecDeque::new();
        visited.insert(vv);
        open.push_back(vv);
        while !goals.is_empty() {
            let current = match open.pop_front() {
                Some(current) => current,
                None => break,
            };
            let requirers = match self.requirers.get(&current) {
                Some(requirers) => requirers,
                None => continue,
            };
            for &index in requirers {
                if visited_actions[index] {
                    continue;
                }
                visited_actions[index] = true;
                for eff in self.actions[index].effects() {
                    let code = eff.code()?;
                    goals.remove(&code);
                    if visited.insert(code) {
                        open.push_back(code);
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns true if an effect of `a1` is permanently mutex with a condition of `a2`
    fn check_action_ordering(&self, a1: &SasAction, a2: &SasAction) -> Result<bool> {
        for eff in a1.effects() {
            let vv1 = eff.code()?;
            for cond in a2.conditions() {
                if self.is_permanent_mutex(vv1, cond.code()?) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
