//! Stoer–Wagner global min-cut (spec §4.6) over a small dense graph derived
//! from k-NN cosine distances. Pure function, no I/O; negligible cost for
//! the star-graph sizes (`n <= 6`) the async auditor builds.

/// A dense undirected weighted graph on `n` nodes. `edges` is read as a full
/// adjacency matrix; out-of-range endpoints are ignored at construction,
/// duplicate edges are summed.
pub struct DenseGraph {
    n: usize,
    weights: Vec<f64>,
}

impl DenseGraph {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            weights: vec![0.0; n * n],
        }
    }

    /// Builds a graph from an edge list `(u, v, weight)`. Edges with either
    /// endpoint `>= n` are ignored; repeated `(u, v)` pairs sum their weight.
    pub fn from_edges(n: usize, edges: &[(usize, usize, f64)]) -> Self {
        let mut graph = Self::new(n);
        for &(u, v, w) in edges {
            if u < n && v < n && u != v {
                graph.add_edge(u, v, w);
            }
        }
        graph
    }

    /// A star graph: node 0 is the center, nodes `1..=leaf_weights.len()`
    /// are leaves, one edge per leaf with the given weight.
    pub fn star(leaf_weights: &[f64]) -> Self {
        let n = leaf_weights.len() + 1;
        let mut graph = Self::new(n);
        for (i, &w) in leaf_weights.iter().enumerate() {
            graph.add_edge(0, i + 1, w);
        }
        graph
    }

    fn add_edge(&mut self, u: usize, v: usize, w: f64) {
        self.weights[u * self.n + v] += w;
        self.weights[v * self.n + u] += w;
    }

    fn weight(&self, u: usize, v: usize) -> f64 {
        self.weights[u * self.n + v]
    }
}

/// Runs Stoer–Wagner and returns the global min-cut weight. `n <= 1` has no
/// cut to speak of and returns `+infinity`.
pub fn stoer_wagner(graph: &DenseGraph) -> f64 {
    let n = graph.n;
    if n <= 1 {
        return f64::INFINITY;
    }

    let mut merged: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
    let mut active: Vec<usize> = (0..n).collect();
    let mut weights = graph.weights.clone();
    let w = |weights: &[f64], u: usize, v: usize| weights[u * n + v];

    let mut best_cut = f64::INFINITY;

    while active.len() > 1 {
        let mut added = vec![active[0]];
        let mut in_a = vec![false; n];
        in_a[active[0]] = true;
        let mut key: Vec<f64> = active.iter().map(|&v| w(&weights, active[0], v)).collect();

        let mut last_two = (active[0], active[0]);
        while added.len() < active.len() {
            let mut best_idx = None;
            let mut best_key = f64::NEG_INFINITY;
            for (idx, &v) in active.iter().enumerate() {
                if !in_a[v] && key[idx] > best_key {
                    best_key = key[idx];
                    best_idx = Some(idx);
                }
            }
            let idx = best_idx.expect("active set non-empty while added < active.len()");
            let v = active[idx];
            in_a[v] = true;
            added.push(v);
            last_two = (last_two.1, v);

            for (jdx, &u) in active.iter().enumerate() {
                if !in_a[u] {
                    key[jdx] += w(&weights, v, u);
                }
            }
        }

        let (s, t) = last_two;
        let cut_of_phase: f64 = active.iter().filter(|&&v| v != t).map(|&v| w(&weights, t, v)).sum();
        best_cut = best_cut.min(cut_of_phase);

        // contract t into s
        for &u in &active {
            if u != s && u != t {
                let merged_weight = w(&weights, s, u) + w(&weights, t, u);
                weights[s * n + u] = merged_weight;
                weights[u * n + s] = merged_weight;
            }
        }
        let s_group_extra = merged[t].clone();
        merged[s].extend(s_group_extra);
        active.retain(|&v| v != t);
    }

    best_cut
}

/// Star-λ: the min-cut of a star graph equals its minimum edge weight.
/// Exposed for callers that want the closed form without building the
/// adjacency matrix; `stoer_wagner` on the same graph agrees (spec §4.5).
pub fn star_min_cut(leaf_weights: &[f64]) -> f64 {
    leaf_weights.iter().cloned().fold(f64::INFINITY, f64::min)
}

/// Extension point for an external exact min-cut solver over the full
/// neighborhood graph (not just the star the in-process auditor builds).
/// Left unimplemented by design: the in-process min-cut gate is
/// observational only (§9 design notes), and no implementation of this
/// trait may be consulted to modify a verdict. A caller plugging in a
/// backend still only gets a number to log.
pub trait ExactMinCutBackend: Send + Sync {
    fn min_cut(&self, graph: &DenseGraph) -> f64;
}
