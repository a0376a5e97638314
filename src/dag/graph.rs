//! DependencyGraph - DAG structure built from step `depends_on` lists
//!
//! - Arc<str> for zero-cost cloning of step IDs
//! - FxHashMap for faster hashing (non-crypto)
//! - SmallVec for stack-allocated small dependency lists (0-4 items)
//!
//! Cycle detection uses the DFS three-color algorithm and reports the
//! offending path.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::WaveError;
use crate::plan::Plan;

/// Stack-allocated deps: most steps have 0-4 dependencies
pub type DepVec = SmallVec<[Arc<str>; 4]>;

/// Graph of step dependencies
///
/// Edges point from a dependency to its dependents. Dependencies naming
/// unknown steps are not represented; the validator reports them first.
#[derive(Debug)]
pub struct DependencyGraph {
    /// step_id -> steps that depend on it
    dependents: FxHashMap<Arc<str>, DepVec>,
    /// step_id -> steps it depends on
    dependencies: FxHashMap<Arc<str>, DepVec>,
    /// All step IDs in plan order
    step_ids: Vec<Arc<str>>,
}

impl DependencyGraph {
    pub fn from_plan(plan: &Plan) -> Self {
        let capacity = plan.len();
        let mut dependents: FxHashMap<Arc<str>, DepVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut dependencies: FxHashMap<Arc<str>, DepVec> =
            FxHashMap::with_capacity_and_hasher(capacity, Default::default());
        let mut step_ids: Vec<Arc<str>> = Vec::with_capacity(capacity);

        for step in &plan.steps {
            let id: Arc<str> = Arc::from(step.id.as_str());
            step_ids.push(Arc::clone(&id));
            dependents.entry(Arc::clone(&id)).or_default();
            dependencies.entry(id).or_default();
        }

        for step in &plan.steps {
            // Reuse the Arc allocated above for the dependent side
            let Some((target, _)) = dependencies.get_key_value(step.id.as_str()) else {
                continue;
            };
            let target = Arc::clone(target);

            for dep in &step.depends_on {
                let Some((source, _)) = dependents.get_key_value(dep.as_str()) else {
                    continue;
                };
                let source = Arc::clone(source);

                if let Some(list) = dependents.get_mut(&source) {
                    list.push(Arc::clone(&target));
                }
                if let Some(list) = dependencies.get_mut(&target) {
                    list.push(source);
                }
            }
        }

        Self {
            dependents,
            dependencies,
            step_ids,
        }
    }

    /// Steps that `step_id` depends on
    #[inline]
    pub fn dependencies(&self, step_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.dependencies
            .get(step_id)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// Steps that depend on `step_id`
    #[inline]
    pub fn dependents(&self, step_id: &str) -> &[Arc<str>] {
        static EMPTY: &[Arc<str>] = &[];
        self.dependents
            .get(step_id)
            .map_or(EMPTY, SmallVec::as_slice)
    }

    /// Steps with no dependencies (plan order)
    pub fn roots(&self) -> Vec<Arc<str>> {
        self.step_ids
            .iter()
            .filter(|id| self.dependencies(id).is_empty())
            .cloned()
            .collect()
    }

    /// Steps nothing depends on (plan order)
    pub fn leaves(&self) -> Vec<Arc<str>> {
        self.step_ids
            .iter()
            .filter(|id| self.dependents(id).is_empty())
            .cloned()
            .collect()
    }

    #[inline]
    pub fn contains(&self, step_id: &str) -> bool {
        self.dependencies.contains_key(step_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.step_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.step_ids.is_empty()
    }

    /// Check if `to` is reachable from `from` following dependency edges (BFS)
    pub fn has_path(&self, from: &str, to: &str) -> bool {
        if from == to {
            return true;
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut queue: VecDeque<&str> = VecDeque::new();

        queue.push_back(from);
        visited.insert(from);

        while let Some(current) = queue.pop_front() {
            for next in self.dependents(current) {
                if next.as_ref() == to {
                    return true;
                }
                if visited.insert(next.as_ref()) {
                    queue.push_back(next.as_ref());
                }
            }
        }

        false
    }

    /// Detect cycles using DFS with three-color marking.
    ///
    /// Returns `Err(WaveError::Cycle)` carrying the path, closed on its
    /// first step (`a → b → a`).
    pub fn detect_cycles(&self) -> Result<(), WaveError> {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        fn dfs(
            node: &Arc<str>,
            dependents: &FxHashMap<Arc<str>, DepVec>,
            colors: &mut FxHashMap<Arc<str>, Color>,
            stack: &mut Vec<Arc<str>>,
        ) -> Result<(), Vec<String>> {
            colors.insert(Arc::clone(node), Color::Gray);
            stack.push(Arc::clone(node));

            if let Some(next) = dependents.get(node) {
                for neighbor in next {
                    match colors.get(neighbor) {
                        Some(Color::Gray) => {
                            // Gray means the neighbor is on the current DFS path
                            let start = stack
                                .iter()
                                .position(|x| x == neighbor)
                                .unwrap_or(0);
                            let mut cycle: Vec<String> =
                                stack[start..].iter().map(|s| s.to_string()).collect();
                            cycle.push(neighbor.to_string());
                            return Err(cycle);
                        }
                        Some(Color::White) | None => {
                            dfs(neighbor, dependents, colors, stack)?;
                        }
                        Some(Color::Black) => {}
                    }
                }
            }

            stack.pop();
            colors.insert(Arc::clone(node), Color::Black);
            Ok(())
        }

        let mut colors: FxHashMap<Arc<str>, Color> = self
            .step_ids
            .iter()
            .map(|id| (Arc::clone(id), Color::White))
            .collect();
        let mut stack: Vec<Arc<str>> = Vec::new();

        for step_id in &self.step_ids {
            if colors.get(step_id) == Some(&Color::White) {
                dfs(step_id, &self.dependents, &mut colors, &mut stack)
                    .map_err(|cycle| WaveError::Cycle { cycle })?;
            }
        }

        Ok(())
    }

    /// Group steps into the waves a successful run would launch
    ///
    /// Wave `n` holds every step whose dependencies all sit in waves `< n`,
    /// in plan order. Steps on a cycle never become ready and are left out.
    pub fn waves(&self) -> Vec<Vec<Arc<str>>> {
        let mut remaining: FxHashMap<&str, usize> = self
            .step_ids
            .iter()
            .map(|id| (id.as_ref(), self.dependencies(id).len()))
            .collect();
        let mut waves = Vec::new();

        loop {
            let wave: Vec<Arc<str>> = self
                .step_ids
                .iter()
                .filter(|id| remaining.get(id.as_ref()) == Some(&0))
                .cloned()
                .collect();
            if wave.is_empty() {
                break;
            }

            for id in &wave {
                remaining.remove(id.as_ref());
                for dependent in self.dependents(id) {
                    if let Some(count) = remaining.get_mut(dependent.as_ref()) {
                        *count = count.saturating_sub(1);
                    }
                }
            }
            waves.push(wave);
        }

        waves
    }
}
