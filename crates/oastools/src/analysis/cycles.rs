//! Strongly-connected components, bounded cycle enumeration and the
//! condensation dag of the schema reference graph.
//!
//! Everything here is deterministic: tarjan visits nodes in sorted id
//! order, cycle search expands neighbors sorted, and enumeration truncates
//! the latest-found cycles once the per-scc cap is reached.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use super::graph::{Edge, Graph};

/// Cycle enumeration stops after this many cycles per scc. The cutoff keeps
/// pathological graphs tractable; truncation is recorded on the analysis.
pub const MAX_CYCLES_PER_SCC: usize = 50;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scc {
    /// Member ids, sorted lexicographically.
    pub members: Vec<String>,
    /// A size-1 scc is trivial unless its sole member has a self-loop.
    pub trivial: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    /// Nodes in traversal order, starting from the lexicographically first
    /// member of the owning scc.
    pub nodes: Vec<String>,
    /// One representative edge per step; a step with parallel edges prefers
    /// a required, non-nullable, non-array edge when one exists.
    pub edges: Vec<Edge>,
    /// True when every edge is required, not nullable and not array-valued.
    pub has_required_only_path: bool,
    /// The relaxable edges that would break the cycle.
    pub break_points: Vec<Edge>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condensation {
    /// Scc indices grouped into topological layers, roots first.
    pub layers: Vec<Vec<usize>>,
    /// Deduplicated cross-scc edges as (from, to) scc indices.
    pub edges: Vec<(usize, usize)>,
    /// Number of layers.
    pub depth: usize,
}

#[derive(Clone, Debug, Default)]
pub struct CycleAnalysis {
    pub sccs: Vec<Scc>,
    pub cycles: Vec<Cycle>,
    pub condensation: Condensation,
    /// Set when any scc hit [`MAX_CYCLES_PER_SCC`].
    pub truncated: bool,
}

impl CycleAnalysis {
    pub fn scc_of(&self, id: &str) -> Option<usize> {
        self.sccs
            .iter()
            .position(|scc| scc.members.iter().any(|m| m == id))
    }

    pub fn cycles_containing(&self, id: &str) -> usize {
        self.cycles
            .iter()
            .filter(|c| c.nodes.iter().any(|n| n == id))
            .count()
    }
}

pub fn analyze_cycles(graph: &Graph) -> CycleAnalysis {
    let sccs = tarjan(graph);
    let (cycles, truncated) = enumerate_cycles(graph, &sccs);
    let condensation = condense(graph, &sccs);

    CycleAnalysis {
        sccs,
        cycles,
        condensation,
        truncated,
    }
}

/// Distinct neighbor map in sorted order.
fn adjacency(graph: &Graph) -> BTreeMap<&str, BTreeSet<&str>> {
    let mut adj: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();

    for id in graph.nodes.keys() {
        adj.entry(id).or_default();
    }
    for edge in &graph.edges {
        adj.entry(&edge.from).or_default().insert(&edge.to);
    }

    adj
}

fn tarjan(graph: &Graph) -> Vec<Scc> {
    struct State<'a> {
        adj: &'a BTreeMap<&'a str, BTreeSet<&'a str>>,
        index: usize,
        indices: HashMap<&'a str, usize>,
        lowlinks: HashMap<&'a str, usize>,
        stack: Vec<&'a str>,
        on_stack: HashSet<&'a str>,
        sccs: Vec<Vec<String>>,
    }

    fn visit<'a>(state: &mut State<'a>, v: &'a str) {
        state.indices.insert(v, state.index);
        state.lowlinks.insert(v, state.index);
        state.index += 1;
        state.stack.push(v);
        state.on_stack.insert(v);

        if let Some(neighbors) = state.adj.get(v) {
            for &w in neighbors.iter() {
                if !state.indices.contains_key(w) {
                    visit(state, w);
                    let low = state.lowlinks[w].min(state.lowlinks[v]);
                    state.lowlinks.insert(v, low);
                } else if state.on_stack.contains(w) {
                    let low = state.indices[w].min(state.lowlinks[v]);
                    state.lowlinks.insert(v, low);
                }
            }
        }

        if state.lowlinks[v] == state.indices[v] {
            let mut members = Vec::new();
            while let Some(w) = state.stack.pop() {
                state.on_stack.remove(w);
                members.push(w.to_string());
                if w == v {
                    break;
                }
            }
            members.sort();
            state.sccs.push(members);
        }
    }

    let adj = adjacency(graph);
    let mut state = State {
        adj: &adj,
        index: 0,
        indices: HashMap::new(),
        lowlinks: HashMap::new(),
        stack: Vec::new(),
        on_stack: HashSet::new(),
        sccs: Vec::new(),
    };

    // sorted start order keeps the output deterministic
    for id in graph.nodes.keys() {
        if !state.indices.contains_key(id.as_str()) {
            visit(&mut state, id);
        }
    }

    let mut sccs: Vec<Scc> = state
        .sccs
        .into_iter()
        .map(|members| {
            let trivial = members.len() == 1 && !has_self_loop(graph, &members[0]);
            Scc { members, trivial }
        })
        .collect();

    sccs.sort_by(|a, b| a.members.cmp(&b.members));
    sccs
}

fn has_self_loop(graph: &Graph, id: &str) -> bool {
    graph.edges.iter().any(|e| e.from == id && e.to == id)
}

/// Bounded dfs cycle enumeration inside each non-trivial scc, starting from
/// its lexicographically first member.
fn enumerate_cycles(graph: &Graph, sccs: &[Scc]) -> (Vec<Cycle>, bool) {
    let mut cycles = Vec::new();
    let mut truncated = false;

    for scc in sccs {
        if scc.trivial {
            continue;
        }

        let members: HashSet<&str> = scc.members.iter().map(|s| s.as_str()).collect();
        let start = scc.members[0].as_str();

        let mut found: Vec<Vec<String>> = Vec::new();
        let mut path = vec![start.to_string()];
        let mut on_path: HashSet<String> = path.iter().cloned().collect();

        dfs(graph, &members, start, start, &mut path, &mut on_path, &mut found);

        if found.len() > MAX_CYCLES_PER_SCC {
            found.truncate(MAX_CYCLES_PER_SCC);
            truncated = true;
        }

        for nodes in found {
            cycles.push(classify(graph, nodes));
        }
    }

    (cycles, truncated)
}

fn dfs(
    graph: &Graph,
    members: &HashSet<&str>,
    start: &str,
    current: &str,
    path: &mut Vec<String>,
    on_path: &mut HashSet<String>,
    found: &mut Vec<Vec<String>>,
) {
    if found.len() > MAX_CYCLES_PER_SCC {
        return;
    }

    let mut neighbors: Vec<&str> = graph
        .outgoing(current)
        .map(|e| e.to.as_str())
        .filter(|to| members.contains(to))
        .collect();
    neighbors.sort_unstable();
    neighbors.dedup();

    for to in neighbors {
        if to == start {
            found.push(path.clone());
            if found.len() > MAX_CYCLES_PER_SCC {
                return;
            }
            continue;
        }

        if !on_path.contains(to) {
            path.push(to.to_string());
            on_path.insert(to.to_string());

            dfs(graph, members, start, to, path, on_path, found);

            path.pop();
            on_path.remove(to);
        }
    }
}

/// Chooses representative edges for each step and classifies the cycle.
fn classify(graph: &Graph, nodes: Vec<String>) -> Cycle {
    let mut edges = Vec::new();

    for (i, from) in nodes.iter().enumerate() {
        let to = &nodes[(i + 1) % nodes.len()];

        let parallel: Vec<&Edge> = graph
            .edges
            .iter()
            .filter(|e| &e.from == from && &e.to == to)
            .collect();

        let representative = parallel
            .iter()
            .find(|e| e.is_required && !e.is_nullable && !e.is_array)
            .or(parallel.first())
            .copied();

        if let Some(edge) = representative {
            edges.push(edge.clone());
        }
    }

    let break_points: Vec<Edge> = edges
        .iter()
        .filter(|e| !e.is_required || e.is_nullable || e.is_array)
        .cloned()
        .collect();

    Cycle {
        nodes,
        has_required_only_path: break_points.is_empty(),
        break_points,
        edges,
    }
}

/// Collapses each scc to one node, deduplicates cross-scc edges and layers
/// the result with kahn's algorithm using longest-incoming-path placement.
fn condense(graph: &Graph, sccs: &[Scc]) -> Condensation {
    let mut scc_of: HashMap<&str, usize> = HashMap::new();
    for (i, scc) in sccs.iter().enumerate() {
        for member in &scc.members {
            scc_of.insert(member, i);
        }
    }

    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for edge in &graph.edges {
        let (Some(&from), Some(&to)) = (scc_of.get(edge.from.as_str()), scc_of.get(edge.to.as_str()))
        else {
            continue;
        };

        if from != to {
            edges.insert((from, to));
        }
    }

    let mut indegree = vec![0usize; sccs.len()];
    for &(_, to) in &edges {
        indegree[to] += 1;
    }

    let mut layer = vec![0usize; sccs.len()];
    let mut queue: Vec<usize> = (0..sccs.len()).filter(|&i| indegree[i] == 0).collect();
    let mut processed = 0usize;

    while let Some(v) = queue.pop() {
        processed += 1;

        for &(from, to) in &edges {
            if from != v {
                continue;
            }

            layer[to] = layer[to].max(layer[from] + 1);
            indegree[to] -= 1;
            if indegree[to] == 0 {
                queue.push(to);
            }
        }
    }

    debug_assert_eq!(processed, sccs.len(), "condensation must be acyclic");

    let depth = layer.iter().max().map(|&d| d + 1).unwrap_or(0);
    let mut layers = vec![Vec::new(); depth];
    for (i, &l) in layer.iter().enumerate() {
        layers[l].push(i);
    }

    Condensation {
        layers,
        edges: edges.into_iter().collect(),
        depth,
    }
}
