use std::collections::HashSet;

use rayon::prelude::*;
use tracing::debug;

use crate::model::{LevelDefinition, Move, Target};

/// One explored position: an amount vector plus the moves that reached it.
#[derive(Clone)]
struct SearchNode {
    amounts: Vec<u32>,
    path: Vec<Move>,
}

/// Breadth-first search over the pour/fill/empty move graph. Returns a
/// shortest move sequence reaching a winning amount vector, or `None` when
/// no winning state is reachable. Levels with no containers are unwinnable
/// and therefore unsolvable.
pub fn solve(level: &LevelDefinition) -> Option<Vec<Move>> {
    if level.containers.is_empty() {
        return None;
    }
    let capacities: Vec<u32> = level.containers.iter().map(|c| c.capacity).collect();
    let start: Vec<u32> = level.containers.iter().map(|c| c.initial_amount).collect();
    if satisfied(level, &start) {
        return Some(Vec::new());
    }

    let mut visited: HashSet<Vec<u32>> = HashSet::new();
    visited.insert(start.clone());
    let mut frontier = vec![SearchNode {
        amounts: start,
        path: Vec::new(),
    }];

    while !frontier.is_empty() {
        let candidates: Vec<SearchNode> = frontier
            .par_iter()
            .flat_map_iter(|node| successors(level, &capacities, node))
            .collect();
        let mut next = Vec::new();
        for node in candidates {
            if !visited.insert(node.amounts.clone()) {
                continue;
            }
            if satisfied(level, &node.amounts) {
                debug!(moves = node.path.len(), states = visited.len(), "solved");
                return Some(node.path);
            }
            next.push(node);
        }
        debug!(frontier = next.len(), states = visited.len(), "layer expanded");
        frontier = next;
    }
    debug!(states = visited.len(), "search space exhausted");
    None
}

pub fn is_solvable(level: &LevelDefinition) -> bool {
    solve(level).is_some()
}

fn successors(
    level: &LevelDefinition,
    capacities: &[u32],
    node: &SearchNode,
) -> Vec<SearchNode> {
    let amounts = &node.amounts;
    let count = amounts.len();
    let mut out = Vec::new();
    let mut push = |amounts: Vec<u32>, mv: Move| {
        let mut path = node.path.clone();
        path.push(mv);
        out.push(SearchNode { amounts, path });
    };

    for from in 0..count {
        for to in 0..count {
            if from == to {
                continue;
            }
            let moved = amounts[from].min(capacities[to] - amounts[to]);
            if moved == 0 {
                continue;
            }
            let mut next = amounts.clone();
            next[from] -= moved;
            next[to] += moved;
            push(next, Move::Pour { from, to });
        }
    }
    if level.has_sink_and_tap {
        for i in 0..count {
            if amounts[i] < capacities[i] {
                let mut next = amounts.clone();
                next[i] = capacities[i];
                push(next, Move::Fill { to: i });
            }
            if amounts[i] > 0 {
                let mut next = amounts.clone();
                next[i] = 0;
                push(next, Move::Empty { from: i });
            }
        }
    }
    out
}

fn satisfied(level: &LevelDefinition, amounts: &[u32]) -> bool {
    level.targets.iter().all(|target| match target {
        Target::Any { amount } => amounts.contains(amount),
        Target::Container { id, amount } => level
            .index_of(id)
            .is_some_and(|i| amounts[i] == *amount),
    })
}
