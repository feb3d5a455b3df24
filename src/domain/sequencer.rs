//! Dependency sequencing
//!
//! Kahn's algorithm over `depends_on` edges. Among services whose
//! prerequisites are satisfied, the earliest-declared one is emitted first, so
//! the order is a pure function of the document.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::service::ServiceDefinition;
use super::topology::Topology;

/// Start order as indices into `services`.
///
/// Edges to undeclared services are skipped; the loader reports those
/// separately. On failure returns one cycle per strongly connected group of
/// blocked services, each cycle listing services that depend on the next and
/// the last on the first.
pub(crate) fn sort(services: &[ServiceDefinition]) -> Result<Vec<usize>, Vec<Vec<String>>> {
    let deps = dependency_indices(services);
    let n = services.len();

    let mut pending: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (service, service_deps) in deps.iter().enumerate() {
        for &dep in service_deps {
            dependents[dep].push(service);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in &dependents[next] {
            pending[dependent] -= 1;
            if pending[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == n {
        Ok(order)
    } else {
        Err(find_cycles(services, &deps, &pending))
    }
}

/// Group an order into waves: every member of wave N depends only on
/// services in earlier waves.
pub(crate) fn waves(services: &[ServiceDefinition], order: &[usize]) -> Vec<Vec<usize>> {
    let deps = dependency_indices(services);
    let mut level = vec![0usize; services.len()];
    let mut waves: Vec<Vec<usize>> = Vec::new();

    for &service in order {
        let wave = deps[service]
            .iter()
            .map(|&dep| level[dep] + 1)
            .max()
            .unwrap_or(0);
        level[service] = wave;
        if waves.len() <= wave {
            waves.resize_with(wave + 1, Vec::new);
        }
        waves[wave].push(service);
    }

    for wave in &mut waves {
        wave.sort_unstable();
    }
    waves
}

/// Service names in start order
pub fn start_order(topology: &Topology) -> Vec<&str> {
    topology
        .start_order()
        .into_iter()
        .map(|s| s.name.as_str())
        .collect()
}

/// Service names grouped into concurrently startable waves
pub fn start_waves(topology: &Topology) -> Vec<Vec<&str>> {
    let services = topology.services();
    waves(services, topology.order_indices())
        .into_iter()
        .map(|wave| wave.into_iter().map(|i| services[i].name.as_str()).collect())
        .collect()
}

fn dependency_indices(services: &[ServiceDefinition]) -> Vec<Vec<usize>> {
    let index: HashMap<&str, usize> = services
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name.as_str(), i))
        .collect();

    services
        .iter()
        .map(|service| {
            let mut deps: Vec<usize> = Vec::new();
            for dep in &service.depends_on {
                if let Some(&i) = index.get(dep.service.as_str()) {
                    if !deps.contains(&i) {
                        deps.push(i);
                    }
                }
            }
            deps
        })
        .collect()
}

/// Cycles among the services Kahn's algorithm could not emit.
///
/// Blocked services are grouped into strongly connected components; services
/// that are only downstream of a cycle form trivial components and are not
/// reported. Components are reported in declaration order of their earliest
/// member.
fn find_cycles(services: &[ServiceDefinition], deps: &[Vec<usize>], pending: &[usize]) -> Vec<Vec<String>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut node: HashMap<usize, NodeIndex> = HashMap::new();
    for i in (0..services.len()).filter(|&i| pending[i] > 0) {
        node.insert(i, graph.add_node(i));
    }
    for (&i, &from) in &node {
        for dep in &deps[i] {
            if let Some(&to) = node.get(dep) {
                graph.add_edge(from, to, ());
            }
        }
    }

    let mut components: Vec<Vec<usize>> = tarjan_scc(&graph)
        .into_iter()
        .map(|scc| {
            let mut members: Vec<usize> = scc.into_iter().map(|idx| graph[idx]).collect();
            members.sort_unstable();
            members
        })
        .filter(|members| members.len() > 1 || deps[members[0]].contains(&members[0]))
        .collect();
    components.sort_unstable_by_key(|members| members[0]);

    components
        .iter()
        .map(|members| {
            walk_cycle(deps, members)
                .into_iter()
                .map(|i| services[i].name.clone())
                .collect()
        })
        .collect()
}

/// Follow edges inside one component from its earliest member until a
/// service repeats.
///
/// Every member has a dependency inside the component, so the walk always
/// closes a loop.
fn walk_cycle(deps: &[Vec<usize>], members: &[usize]) -> Vec<usize> {
    let inside: HashSet<usize> = members.iter().copied().collect();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut path: Vec<usize> = Vec::new();
    let mut current = members[0];

    loop {
        if let Some(&start) = position.get(&current) {
            return path.split_off(start);
        }
        position.insert(current, path.len());
        path.push(current);

        match deps[current].iter().copied().find(|d| inside.contains(d)) {
            Some(next) => current = next,
            None => return path,
        }
    }
}
