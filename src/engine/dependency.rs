// ABOUTME: Dependency graph management and wave planning for workflow steps
// ABOUTME: Validates step references, detects cycles, and computes ready waves

use petgraph::algo::toposort;
use petgraph::graph::NodeIndex;
use petgraph::{Direction, Graph};
use std::collections::{HashMap, HashSet};

use super::error::GraphError;
use crate::workflow::{Workflow, WorkflowStep};

pub struct DependencyGraph<'a> {
    graph: Graph<&'a str, ()>,
    step_indices: HashMap<&'a str, NodeIndex>,
    steps: Vec<&'a WorkflowStep>,
}

/// Static wave plan assuming every step resolves.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    pub waves: Vec<Vec<String>>,
    pub total_steps: usize,
}

impl<'a> DependencyGraph<'a> {
    /// Build the graph, rejecting duplicate ids and references to unknown steps.
    pub fn from_workflow(workflow: &'a Workflow) -> Result<Self, GraphError> {
        let mut graph = Graph::new();
        let mut step_indices = HashMap::new();

        for step in &workflow.steps {
            let node_index = graph.add_node(step.step_id.as_str());
            if step_indices.insert(step.step_id.as_str(), node_index).is_some() {
                return Err(GraphError::DuplicateStep {
                    step_id: step.step_id.clone(),
                });
            }
        }

        // Edges point from dependency to dependent.
        for step in &workflow.steps {
            let step_node = step_indices[step.step_id.as_str()];
            for dependency in &step.depends_on {
                let dep_node = step_indices.get(dependency.as_str()).ok_or_else(|| {
                    GraphError::UnknownDependency {
                        step_id: step.step_id.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                graph.update_edge(*dep_node, step_node, ());
            }
        }

        Ok(Self {
            graph,
            step_indices,
            steps: workflow.steps.iter().collect(),
        })
    }

    /// Reject cycles, including steps that depend on themselves.
    pub fn validate(&self) -> Result<(), GraphError> {
        for step in &self.steps {
            if step.depends_on.iter().any(|d| d == &step.step_id) {
                return Err(GraphError::CircularDependency {
                    steps: vec![step.step_id.clone()],
                });
            }
        }

        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| GraphError::CircularDependency {
                steps: self.cycle_members(cycle.node_id()),
            })
    }

    /// Steps on some cycle through `start`, in declaration order.
    fn cycle_members(&self, start: NodeIndex) -> Vec<String> {
        let reachable_from = |origin: NodeIndex, direction: Direction| {
            let mut seen = HashSet::new();
            let mut stack = vec![origin];
            while let Some(node) = stack.pop() {
                for next in self.graph.neighbors_directed(node, direction) {
                    if seen.insert(next) {
                        stack.push(next);
                    }
                }
            }
            seen
        };

        let downstream = reachable_from(start, Direction::Outgoing);
        let upstream = reachable_from(start, Direction::Incoming);

        let members: Vec<String> = self
            .steps
            .iter()
            .filter(|s| {
                let node = self.step_indices[s.step_id.as_str()];
                downstream.contains(&node) && upstream.contains(&node)
            })
            .map(|s| s.step_id.clone())
            .collect();

        if members.is_empty() {
            vec![self.graph[start].to_string()]
        } else {
            members
        }
    }

    /// Steps not yet resolved whose dependencies are all resolved, in declaration order.
    pub fn ready_wave(&self, resolved: &HashSet<String>) -> Vec<&'a WorkflowStep> {
        self.steps
            .iter()
            .filter(|step| !resolved.contains(&step.step_id))
            .filter(|step| step.depends_on.iter().all(|d| resolved.contains(d)))
            .copied()
            .collect()
    }

    /// Static plan of waves, used for validation output and planning logs.
    pub fn create_execution_plan(&self) -> Result<ExecutionPlan, GraphError> {
        self.validate()?;

        let mut resolved = HashSet::new();
        let mut waves = Vec::new();

        while resolved.len() < self.steps.len() {
            let wave: Vec<String> = self
                .ready_wave(&resolved)
                .into_iter()
                .map(|s| s.step_id.clone())
                .collect();

            if wave.is_empty() {
                return Err(GraphError::Stalled {
                    pending: self.pending_steps(&resolved),
                });
            }

            resolved.extend(wave.iter().cloned());
            waves.push(wave);
        }

        Ok(ExecutionPlan {
            waves,
            total_steps: self.steps.len(),
        })
    }

    pub fn pending_steps(&self, resolved: &HashSet<String>) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| !resolved.contains(&s.step_id))
            .map(|s| s.step_id.clone())
            .collect()
    }

    pub fn get_dependencies(&self, step_id: &str) -> Vec<String> {
        self.neighbors(step_id, Direction::Incoming)
    }

    pub fn get_dependents(&self, step_id: &str) -> Vec<String> {
        self.neighbors(step_id, Direction::Outgoing)
    }

    fn neighbors(&self, step_id: &str, direction: Direction) -> Vec<String> {
        let Some(&node) = self.step_indices.get(step_id) else {
            return Vec::new();
        };
        let linked: HashSet<NodeIndex> = self.graph.neighbors_directed(node, direction).collect();

        self.steps
            .iter()
            .filter(|s| linked.contains(&self.step_indices[s.step_id.as_str()]))
            .map(|s| s.step_id.clone())
            .collect()
    }

    /// Steps with no dependencies, in declaration order.
    pub fn get_root_steps(&self) -> Vec<String> {
        self.steps
            .iter()
            .filter(|s| s.depends_on.is_empty())
            .map(|s| s.step_id.clone())
            .collect()
    }

    /// Whether declaration order already satisfies every dependency.
    pub fn is_declaration_order_valid(&self) -> bool {
        let mut seen = HashSet::new();
        for step in &self.steps {
            if !step.depends_on.iter().all(|d| seen.contains(d.as_str())) {
                return false;
            }
            seen.insert(step.step_id.as_str());
        }
        true
    }
}

impl ExecutionPlan {
    /// Largest wave size.
    pub fn max_parallelism(&self) -> usize {
        self.waves.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn execution_depth(&self) -> usize {
        self.waves.len()
    }

    pub fn get_wave_index(&self, step_id: &str) -> Option<usize> {
        self.waves
            .iter()
            .position(|wave| wave.iter().any(|s| s == step_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{complete_analysis_workflow, WorkflowStep};

    fn diamond() -> Workflow {
        Workflow::new("diamond", "Diamond")
            .with_step(WorkflowStep::new("a", "w1", "run"))
            .with_step(WorkflowStep::new("b", "w2", "run").depends_on(["a"]))
            .with_step(WorkflowStep::new("c", "w3", "run").depends_on(["a"]))
            .with_step(WorkflowStep::new("d", "w4", "run").depends_on(["b", "c"]))
    }

    #[test]
    fn test_execution_plan_waves() {
        let workflow = diamond();
        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        let plan = graph.create_execution_plan().unwrap();

        assert_eq!(plan.total_steps, 4);
        assert_eq!(plan.waves, vec![vec!["a"], vec!["b", "c"], vec!["d"]]);
        assert_eq!(plan.max_parallelism(), 2);
        assert_eq!(plan.execution_depth(), 3);
        assert_eq!(plan.get_wave_index("d"), Some(2));
    }

    #[test]
    fn test_complete_analysis_plan() {
        let workflow = complete_analysis_workflow();
        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        let plan = graph.create_execution_plan().unwrap();

        assert_eq!(plan.waves[0], vec!["collect_sales", "collect_social"]);
        assert_eq!(plan.waves[1], vec!["filter_signals"]);
        assert_eq!(plan.waves[2], vec!["generate_forecast"]);
        assert_eq!(plan.waves.last().unwrap(), &vec!["explain_decision".to_string()]);
    }

    #[test]
    fn test_ready_wave_reaches_back_to_earlier_waves() {
        let workflow = Workflow::new("skip", "Skip")
            .with_step(WorkflowStep::new("a", "w1", "run"))
            .with_step(WorkflowStep::new("b", "w2", "run").depends_on(["a"]))
            .with_step(WorkflowStep::new("c", "w3", "run").depends_on(["a", "b"]));
        let graph = DependencyGraph::from_workflow(&workflow).unwrap();

        let resolved: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let wave: Vec<&str> = graph
            .ready_wave(&resolved)
            .iter()
            .map(|s| s.step_id.as_str())
            .collect();

        assert_eq!(wave, vec!["c"]);
    }

    #[test]
    fn test_dependency_queries() {
        let workflow = diamond();
        let graph = DependencyGraph::from_workflow(&workflow).unwrap();

        assert!(graph.get_dependencies("a").is_empty());
        assert_eq!(graph.get_dependencies("d"), vec!["b", "c"]);
        assert_eq!(graph.get_dependents("a"), vec!["b", "c"]);
        assert_eq!(graph.get_root_steps(), vec!["a"]);
        assert!(graph.is_declaration_order_valid());
    }

    #[test]
    fn test_unknown_dependency() {
        let workflow = Workflow::new("bad", "Bad")
            .with_step(WorkflowStep::new("a", "w1", "run").depends_on(["ghost"]));

        let error = DependencyGraph::from_workflow(&workflow).err().unwrap();
        assert_eq!(
            error,
            GraphError::UnknownDependency {
                step_id: "a".to_string(),
                dependency: "ghost".to_string()
            }
        );
    }

    #[test]
    fn test_circular_dependency_detection() {
        let workflow = Workflow::new("cycle", "Cycle")
            .with_step(WorkflowStep::new("root", "w0", "run"))
            .with_step(WorkflowStep::new("a", "w1", "run").depends_on(["root", "b"]))
            .with_step(WorkflowStep::new("b", "w2", "run").depends_on(["a"]));

        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        let error = graph.create_execution_plan().unwrap_err();

        assert_eq!(
            error,
            GraphError::CircularDependency {
                steps: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn test_self_dependency_detection() {
        let workflow = Workflow::new("self", "Self")
            .with_step(WorkflowStep::new("a", "w1", "run").depends_on(["a"]));

        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        assert!(matches!(
            graph.validate(),
            Err(GraphError::CircularDependency { .. })
        ));
    }

    #[test]
    fn test_declaration_order_check() {
        let workflow = Workflow::new("order", "Order")
            .with_step(WorkflowStep::new("b", "w2", "run").depends_on(["a"]))
            .with_step(WorkflowStep::new("a", "w1", "run"));

        let graph = DependencyGraph::from_workflow(&workflow).unwrap();
        assert!(!graph.is_declaration_order_valid());
    }
}
