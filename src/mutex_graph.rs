//! Graph of mutually exclusive propositions and its partition into cliques.
//!
//! Every vertex is a boolean [grounded variable][crate::datatypes::GroundedVar]; an edge states that
//! the two propositions never hold at the same time. A clique of the graph can therefore be encoded
//! by a single finite-domain variable, with one value per proposition.
use std::collections::HashMap;

use crate::datatypes::VarId;

/// Partition of a vertex set into groups of pairwise adjacent vertices
#[derive(Debug, Default, Clone)]
pub struct MutexGraph {
    vertex_index: HashMap<VarId, usize>,
    variables: Vec<VarId>,
    /// adjacency lists; positions from `variables.len()` on are "none of those" vertices
    adjacent: Vec<Vec<usize>>,
    groups: Vec<Vec<usize>>,
}

/// A group computed by [MutexGraph::split] or [MutexGraph::split_components]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexGroup {
    /// The propositions of the group
    pub literals: Vec<VarId>,
    /// Whether the group also contains the value "none of those"
    pub none_of_those: bool,
}

impl MutexGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a vertex for the proposition; adding it twice has no effect
    pub fn add_vertex(&mut self, var: VarId) {
        if self.vertex_index.contains_key(&var) {
            return;
        }
        self.vertex_index.insert(var, self.variables.len());
        self.variables.push(var);
        self.adjacent.push(Vec::new());
    }

    /// Links two propositions, adding their vertices if needed
    pub fn add_adjacent(&mut self, v1: VarId, v2: VarId) {
        if v1 == v2 {
            return;
        }
        self.add_vertex(v1);
        self.add_vertex(v2);
        let (a, b) = (self.vertex_index[&v1], self.vertex_index[&v2]);
        if !self.is_adjacent(a, b) {
            self.adjacent[a].push(b);
            self.adjacent[b].push(a);
        }
    }

    /// Number of real vertices
    pub fn num_vertices(&self) -> usize {
        self.variables.len()
    }

    /// Returns true if the two propositions are linked
    pub fn are_adjacent(&self, v1: VarId, v2: VarId) -> bool {
        match (self.vertex_index.get(&v1), self.vertex_index.get(&v2)) {
            (Some(a), Some(b)) => self.is_adjacent(*a, *b),
            _ => false,
        }
    }

    fn is_adjacent(&self, a: usize, b: usize) -> bool {
        self.adjacent[a].contains(&b)
    }

    fn is_fictitious(&self, v: usize) -> bool {
        v >= self.variables.len()
    }

    /// Grows a clique from every vertex that is not yet part of one.
    ///
    /// A vertex may end up in several groups, since the clique grown from a later vertex is
    /// allowed to reuse vertices of earlier ones.
    pub fn split(&mut self) {
        self.groups.clear();
        let mut assigned = vec![false; self.variables.len()];
        for v in 0..self.variables.len() {
            if !assigned[v] {
                let clique = self.grow_clique(&[v]);
                for &member in &clique {
                    assigned[member] = true;
                }
                self.groups.push(clique);
            }
        }
        log::debug!(
            "{} propositions split into {} groups",
            self.variables.len(),
            self.groups.len()
        );
    }

    /// Extends `seed` with every vertex reachable through the clique that is adjacent to all members
    fn grow_clique(&self, seed: &[usize]) -> Vec<usize> {
        let mut visited = vec![false; self.adjacent.len()];
        let mut clique = seed.to_vec();
        let mut open = seed.to_vec();
        for &v in seed {
            visited[v] = true;
        }
        while let Some(v) = open.pop() {
            for &a in &self.adjacent[v] {
                if visited[a] {
                    continue;
                }
                visited[a] = true;
                if clique.iter().all(|&member| self.is_adjacent(a, member)) {
                    open.push(a);
                    clique.push(a);
                }
            }
        }
        clique
    }

    /// Splits every connected component into cliques by repeatedly cutting the links of a
    /// highest-degree vertex. Cut links are replaced by a fictitious "none of those" vertex.
    pub fn split_components(&mut self) {
        self.groups.clear();
        let components = self.connected_components(&(0..self.variables.len()).collect::<Vec<_>>());
        for component in components {
            if self.is_clique(&component) {
                self.groups.push(component);
            } else {
                self.process_non_mutex_component(&component);
            }
        }
        let real = self.variables.len();
        self.groups.retain(|group| !(group.len() == 1 && group[0] >= real));
        log::debug!(
            "{} propositions split into {} components",
            self.variables.len(),
            self.groups.len()
        );
    }

    fn connected_components(&self, vertices: &[usize]) -> Vec<Vec<usize>> {
        let mut visited = vec![false; self.adjacent.len()];
        let mut components = Vec::new();
        for &v in vertices {
            if visited[v] {
                continue;
            }
            let mut component = Vec::new();
            let mut open = vec![v];
            visited[v] = true;
            while let Some(u) = open.pop() {
                component.push(u);
                for &a in &self.adjacent[u] {
                    if !visited[a] {
                        visited[a] = true;
                        open.push(a);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    fn is_clique(&self, component: &[usize]) -> bool {
        component.iter().enumerate().all(|(i, &a)| {
            component[i + 1..].iter().all(|&b| self.is_adjacent(a, b))
        })
    }

    fn process_non_mutex_component(&mut self, component: &[usize]) {
        let mut budget: usize =
            component.iter().map(|&v| self.adjacent[v].len()).sum::<usize>() + component.len();
        let subcomponents = loop {
            let cut = self
                .highest_degree_vertex(component)
                .and_then(|v| self.lowest_degree_neighbour(v).map(|a| (v, a)));
            let (v, a) = match cut {
                Some(cut) if budget > 0 => cut,
                _ => {
                    log::debug!(
                        "component of {} vertices does not split, using cliques",
                        component.len()
                    );
                    return self.cover_with_cliques(component);
                }
            };
            budget -= 1;
            let subcomponent = self.compute_mutex_subcomponent(v, a);
            self.remove_links(&subcomponent);
            let subcomponents = self.connected_components(component);
            if subcomponents.len() > 1 {
                break subcomponents;
            }
        };
        for sub in subcomponents {
            if self.is_clique(&sub) {
                self.groups.push(sub);
            } else {
                self.process_non_mutex_component(&sub);
            }
        }
    }

    fn cover_with_cliques(&mut self, component: &[usize]) {
        let mut assigned = vec![false; self.adjacent.len()];
        for &v in component {
            if !assigned[v] && !self.is_fictitious(v) {
                let clique = self.grow_clique(&[v]);
                for &member in &clique {
                    assigned[member] = true;
                }
                self.groups.push(clique);
            }
        }
    }

    fn highest_degree_vertex(&self, component: &[usize]) -> Option<usize> {
        component
            .iter()
            .copied()
            .filter(|&v| !self.is_fictitious(v))
            .fold(None, |best: Option<usize>, v| match best {
                Some(b) if self.adjacent[b].len() >= self.adjacent[v].len() => Some(b),
                _ => Some(v),
            })
    }

    fn lowest_degree_neighbour(&self, v: usize) -> Option<usize> {
        self.adjacent[v]
            .iter()
            .copied()
            .fold(None, |best: Option<usize>, a| match best {
                Some(b) if self.adjacent[b].len() <= self.adjacent[a].len() => Some(b),
                _ => Some(a),
            })
    }

    /// The clique grown from the edge `v1 - v2`
    fn compute_mutex_subcomponent(&self, v1: usize, v2: usize) -> Vec<usize> {
        self.grow_clique(&[v1, v2])
    }

    /// Cuts the first vertex of the subcomponent from the others and links the others to a
    /// "none of those" vertex
    fn remove_links(&mut self, subcomponent: &[usize]) {
        let (v, rest) = match subcomponent.split_first() {
            Some(split) => split,
            None => return,
        };
        let mut fictitious = None;
        for &other in rest {
            if self.is_fictitious(other) {
                fictitious = Some(other);
            }
            self.adjacent[*v].retain(|&a| a != other);
            self.adjacent[other].retain(|&a| a != *v);
        }
        let fictitious = match fictitious {
            Some(f) => f,
            None => {
                self.adjacent.push(Vec::new());
                self.adjacent.len() - 1
            }
        };
        for &other in rest {
            if other != fictitious && !self.is_adjacent(fictitious, other) {
                self.adjacent[fictitious].push(other);
                self.adjacent[other].push(fictitious);
            }
        }
    }

    /// Number of groups of the last split
    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// The `index`-th group of the last split
    pub fn group(&self, index: usize) -> Option<MutexGroup> {
        self.groups.get(index).map(|group| {
            let mut literals = Vec::with_capacity(group.len());
            let mut none_of_those = false;
            for &v in group {
                match self.variables.get(v) {
                    Some(var) => literals.push(*var),
                    None => none_of_those = true,
                }
            }
            MutexGroup {
                literals,
                none_of_those,
            }
        })
    }

    /// All groups of the last split
    pub fn groups(&self) -> impl Iterator<Item = MutexGroup> + '_ {
        (0..self.groups.len()).filter_map(|i| self.group(i))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use quickcheck_macros::quickcheck;
    use test_log::test;

    fn graph(vertices: usize, edges: &[(usize, usize)]) -> MutexGraph {
        let mut graph = MutexGraph::new();
        for v in 0..vertices {
            graph.add_vertex(VarId(v));
        }
        for &(a, b) in edges {
            graph.add_adjacent(VarId(a), VarId(b));
        }
        graph
    }

    fn check_partition(graph: &MutexGraph) -> bool {
        let mut covered = vec![false; graph.num_vertices()];
        for group in graph.groups() {
            for (i, a) in group.literals.iter().enumerate() {
                covered[a.value()] = true;
                for b in &group.literals[i + 1..] {
                    if !graph.are_adjacent(*a, *b) {
                        return false;
                    }
                }
            }
        }
        covered.into_iter().all(|c| c)
    }

    #[test]
    fn adjacency() {
        let mut graph = graph(3, &[(0, 1), (1, 0), (1, 1)]);
        assert!(graph.are_adjacent(VarId(0), VarId(1)));
        assert!(graph.are_adjacent(VarId(1), VarId(0)));
        assert!(!graph.are_adjacent(VarId(1), VarId(1)));
        assert!(!graph.are_adjacent(VarId(0), VarId(2)));
        assert_eq!(graph.adjacent[0], vec![1]);
        graph.add_adjacent(VarId(2), VarId(7));
        assert_eq!(graph.num_vertices(), 4);
    }

    #[test]
    fn cliques() {
        // a triangle plus a pendant vertex
        let mut graph = graph(4, &[(0, 1), (1, 2), (0, 2), (2, 3)]);
        graph.split();
        assert_eq!(graph.num_groups(), 2);
        let first = graph.group(0).unwrap();
        assert_eq!(first.literals.len(), 3);
        assert!(!first.none_of_those);
        let second = graph.group(1).unwrap();
        assert!(second.literals.contains(&VarId(3)));
        assert!(graph.group(2).is_none());
        assert!(check_partition(&graph));
    }

    #[test]
    fn components() {
        // a path 0 - 1 - 2 is connected but not a clique
        let mut graph = graph(4, &[(0, 1), (1, 2)]);
        graph.split_components();
        assert!(check_partition(&graph));
        assert!(graph
            .groups()
            .any(|g| g.literals == vec![VarId(3)] && !g.none_of_those));
        assert!(graph.groups().any(|g| g.none_of_those));
    }

    #[quickcheck]
    fn split_yields_cliques(edges: Vec<(u8, u8)>) -> bool {
        let edges: Vec<(usize, usize)> = edges
            .into_iter()
            .map(|(a, b)| ((a % 12) as usize, (b % 12) as usize))
            .collect();
        let mut graph = graph(12, &edges);
        graph.split();
        check_partition(&graph)
    }

    #[quickcheck]
    fn split_components_yields_cliques(edges: Vec<(u8, u8)>) -> bool {
        let edges: Vec<(usize, usize)> = edges
            .into_iter()
            .take(30)
            .map(|(a, b)| ((a % 8) as usize, (b % 8) as usize))
            .collect();
        let mut graph = graph(8, &edges);
        graph.split_components();
        check_partition(&graph)
    }
}
