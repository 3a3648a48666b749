use crate::error::{DependencyCycle, Diagnostic, GraphError};
use crate::task::{ExternalRecord, Task, TaskStatus};
use chrono::NaiveDate;
use petgraph::Direction;
use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeFiltered;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

/// Why one node must be resolved before another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Declared dependency: the target may not start before the source ends.
    Dependency,
    /// The target subtask borrows the source parent's window.
    ParentWindow,
}

/// A flattened task with its evidence and resolved relationships.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: String,
    pub title: String,
    pub status: TaskStatus,
    pub record: Option<ExternalRecord>,
    /// Arena indices of direct dependencies, deduplicated, in declaration order.
    pub dependencies: Vec<usize>,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Generated from a record checklist rather than declared by the task source.
    pub from_checklist: bool,
    /// Subtask with no evidence of its own; it takes the parent's dates.
    pub inherits_parent_window: bool,
}

impl TaskNode {
    pub fn is_subtask(&self) -> bool {
        self.parent.is_some()
    }

    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Arena of tasks plus the dependency DAG used to drive scheduling.
///
/// Built once per run and read-only afterwards. Node `i` in the petgraph
/// graph always corresponds to arena slot `i`.
#[derive(Debug)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
    id_to_index: HashMap<String, usize>,
    graph: DiGraph<usize, EdgeKind>,
    order: Vec<usize>,
    blocked: Vec<usize>,
    cycles: Vec<DependencyCycle>,
    diagnostics: Vec<Diagnostic>,
    earliest_created: Option<NaiveDate>,
}

struct Flattener {
    nodes: Vec<TaskNode>,
    id_to_index: HashMap<String, usize>,
    declared_deps: Vec<Vec<String>>,
    records: BTreeMap<String, ExternalRecord>,
}

impl Flattener {
    fn push(
        &mut self,
        task: Task,
        parent: Option<usize>,
    ) -> Result<usize, GraphError> {
        let id = match parent {
            Some(parent_ix) => {
                let parent_id = &self.nodes[parent_ix].id;
                if task.id.starts_with(&format!("{parent_id}.")) {
                    task.id
                } else {
                    format!("{parent_id}.{}", task.id)
                }
            }
            None => task.id,
        };
        if self.id_to_index.contains_key(&id) {
            return Err(GraphError::DuplicateTaskId(id));
        }

        let record = self.records.remove(&id).or(task.record);
        let index = self.nodes.len();
        self.id_to_index.insert(id.clone(), index);
        self.nodes.push(TaskNode {
            id,
            title: task.title,
            status: task.status,
            record,
            dependencies: Vec::new(),
            parent,
            children: Vec::new(),
            from_checklist: false,
            inherits_parent_window: false,
        });
        self.declared_deps.push(task.dependencies);
        if let Some(parent_ix) = parent {
            self.nodes[parent_ix].children.push(index);
        }

        let explicit_children = task.subtasks.len();
        for subtask in task.subtasks {
            self.push(subtask, Some(index))?;
        }
        self.push_checklist(index, explicit_children);
        Ok(index)
    }

    fn push_checklist(&mut self, parent_ix: usize, explicit_children: usize) {
        let checklist = match &self.nodes[parent_ix].record {
            Some(record) if !record.checklist.is_empty() => record.checklist.clone(),
            _ => return,
        };
        let mut ordinal = explicit_children;
        for item in checklist {
            let id = loop {
                ordinal += 1;
                let candidate = format!("{}.{ordinal}", self.nodes[parent_ix].id);
                if !self.id_to_index.contains_key(&candidate) {
                    break candidate;
                }
            };
            let index = self.nodes.len();
            self.id_to_index.insert(id.clone(), index);
            self.nodes.push(TaskNode {
                id,
                title: item.label,
                status: if item.done {
                    TaskStatus::Done
                } else {
                    TaskStatus::Pending
                },
                record: None,
                dependencies: Vec::new(),
                parent: Some(parent_ix),
                children: Vec::new(),
                from_checklist: true,
                inherits_parent_window: false,
            });
            self.declared_deps.push(Vec::new());
            self.nodes[parent_ix].children.push(index);
        }
    }
}

impl TaskGraph {
    /// Flatten `tasks`, attach tracker records and resolve dependency ids.
    ///
    /// Unknown or self-referencing dependencies are dropped with a warning.
    /// Cycles do not fail the build; they are reported through [`cycles`]
    /// and every task on or behind a cycle is left out of the scheduling
    /// order.
    ///
    /// [`cycles`]: TaskGraph::cycles
    pub fn build<I, R>(tasks: I, records: R) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = Task>,
        R: IntoIterator<Item = (String, ExternalRecord)>,
    {
        let mut flattener = Flattener {
            nodes: Vec::new(),
            id_to_index: HashMap::new(),
            declared_deps: Vec::new(),
            records: records.into_iter().collect(),
        };
        for task in tasks {
            flattener.push(task, None)?;
        }

        let Flattener {
            mut nodes,
            id_to_index,
            declared_deps,
            records: orphaned,
        } = flattener;

        let orphan_created = orphaned.values().filter_map(|r| r.created_at).min();
        let mut diagnostics = Vec::new();
        for task_id in orphaned.into_keys() {
            tracing::warn!(task_id = %task_id, "external record linked to unknown task; ignoring");
            diagnostics.push(Diagnostic::UnknownRecord { task_id });
        }

        for (index, declared) in declared_deps.into_iter().enumerate() {
            let mut resolved: Vec<usize> = Vec::with_capacity(declared.len());
            for dep in declared {
                let node = &nodes[index];
                match Self::lookup_dependency(&nodes, &id_to_index, node, &dep) {
                    Some(dep_ix) if dep_ix == index => {
                        tracing::warn!(task_id = %node.id, "task depends on itself; dropping dependency");
                        diagnostics.push(Diagnostic::SelfDependency {
                            task_id: node.id.clone(),
                        });
                    }
                    Some(dep_ix) => {
                        if !resolved.contains(&dep_ix) {
                            resolved.push(dep_ix);
                        }
                    }
                    None => {
                        tracing::warn!(
                            task_id = %node.id,
                            missing = %dep,
                            "dependency references unknown task; dropping edge"
                        );
                        diagnostics.push(Diagnostic::UnresolvedReference {
                            task_id: node.id.clone(),
                            missing: dep,
                        });
                    }
                }
            }
            let node = &mut nodes[index];
            node.inherits_parent_window =
                node.parent.is_some() && resolved.is_empty() && node.record.is_none();
            node.dependencies = resolved;
        }

        let earliest_created = nodes
            .iter()
            .filter_map(|node| node.record.as_ref().and_then(|r| r.created_at))
            .chain(orphan_created)
            .min();

        let mut graph: DiGraph<usize, EdgeKind> = DiGraph::with_capacity(nodes.len(), nodes.len());
        for index in 0..nodes.len() {
            graph.add_node(index);
        }
        for (index, node) in nodes.iter().enumerate() {
            for &dep_ix in &node.dependencies {
                graph.add_edge(NodeIndex::new(dep_ix), NodeIndex::new(index), EdgeKind::Dependency);
            }
        }
        // A subtask the parent already waits on cannot also wait on the parent.
        for index in 0..nodes.len() {
            let node = &mut nodes[index];
            let Some(parent_ix) = node.parent.filter(|_| node.inherits_parent_window) else {
                continue;
            };
            let child = NodeIndex::new(index);
            let parent = NodeIndex::new(parent_ix);
            if has_path_connecting(&graph, child, parent, None) {
                tracing::debug!(task_id = %node.id, "parent depends on subtask; resolving it on its own");
                node.inherits_parent_window = false;
            } else {
                graph.add_edge(parent, child, EdgeKind::ParentWindow);
            }
        }

        let cycles = Self::find_cycles(&graph, &nodes);
        for cycle in &cycles {
            tracing::error!(tasks = %cycle, "dependency cycle detected");
        }
        let (order, blocked) = Self::topological_order(&graph);

        Ok(Self {
            nodes,
            id_to_index,
            graph,
            order,
            blocked,
            cycles,
            diagnostics,
            earliest_created,
        })
    }

    /// Exact id first; for subtasks, a sibling-relative id second.
    fn lookup_dependency(
        nodes: &[TaskNode],
        id_to_index: &HashMap<String, usize>,
        node: &TaskNode,
        dep: &str,
    ) -> Option<usize> {
        if let Some(&ix) = id_to_index.get(dep) {
            return Some(ix);
        }
        let parent_ix = node.parent?;
        id_to_index
            .get(&format!("{}.{dep}", nodes[parent_ix].id))
            .copied()
    }

    /// Only declared dependencies can form a cycle.
    fn find_cycles(graph: &DiGraph<usize, EdgeKind>, nodes: &[TaskNode]) -> Vec<DependencyCycle> {
        let dependencies = EdgeFiltered::from_fn(graph, |edge| *edge.weight() == EdgeKind::Dependency);
        let mut cycles: Vec<DependencyCycle> = tarjan_scc(&dependencies)
            .into_iter()
            .filter(|component| component.len() > 1)
            .map(|component| {
                let mut task_ids: Vec<String> = component
                    .into_iter()
                    .map(|ix| nodes[graph[ix]].id.clone())
                    .collect();
                task_ids.sort();
                DependencyCycle { task_ids }
            })
            .collect();
        cycles.sort_by(|a, b| a.task_ids.cmp(&b.task_ids));
        cycles
    }

    /// Kahn's algorithm; ties go to the task declared first. Nodes never
    /// released sit on or behind a cycle.
    fn topological_order(graph: &DiGraph<usize, EdgeKind>) -> (Vec<usize>, Vec<usize>) {
        let mut in_degree: Vec<usize> = graph
            .node_indices()
            .map(|ix| graph.neighbors_directed(ix, Direction::Incoming).count())
            .collect();
        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(ix, _)| Reverse(ix))
            .collect();

        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(Reverse(ix)) = ready.pop() {
            order.push(ix);
            for succ in graph.neighbors_directed(NodeIndex::new(ix), Direction::Outgoing) {
                let degree = &mut in_degree[succ.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(succ.index()));
                }
            }
        }

        let mut released = vec![false; in_degree.len()];
        for &ix in &order {
            released[ix] = true;
        }
        let blocked = (0..in_degree.len()).filter(|ix| !released[*ix]).collect();
        (order, blocked)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    pub fn node(&self, index: usize) -> &TaskNode {
        &self.nodes[index]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_index.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&TaskNode> {
        self.index_of(id).map(|ix| &self.nodes[ix])
    }

    /// Dependency-respecting order over every schedulable task.
    pub fn topological(&self) -> &[usize] {
        &self.order
    }

    /// Tasks on a cycle or depending on one.
    pub fn blocked(&self) -> &[usize] {
        &self.blocked
    }

    pub fn blocked_ids(&self) -> Vec<String> {
        self.blocked.iter().map(|&ix| self.nodes[ix].id.clone()).collect()
    }

    pub fn cycles(&self) -> &[DependencyCycle] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Earliest `created_at` across every linked record.
    pub fn earliest_created(&self) -> Option<NaiveDate> {
        self.earliest_created
    }

    pub fn edge_count(&self, kind: EdgeKind) -> usize {
        self.graph.edge_weights().filter(|w| **w == kind).count()
    }

    /// Schedulable tasks with every parent directly followed by its
    /// subtasks. Siblings keep their topological order.
    pub fn display_order(&self) -> Vec<usize> {
        let mut position = vec![None; self.nodes.len()];
        for (pos, &ix) in self.order.iter().enumerate() {
            position[ix] = Some(pos);
        }

        let mut out = Vec::with_capacity(self.order.len());
        for &ix in &self.order {
            let parent_scheduled = self.nodes[ix]
                .parent
                .is_some_and(|parent_ix| position[parent_ix].is_some());
            if !parent_scheduled {
                self.push_with_children(ix, &position, &mut out);
            }
        }
        out
    }

    fn push_with_children(&self, ix: usize, position: &[Option<usize>], out: &mut Vec<usize>) {
        out.push(ix);
        let mut children: Vec<(usize, usize)> = self.nodes[ix]
            .children
            .iter()
            .filter_map(|&child| position[child].map(|pos| (pos, child)))
            .collect();
        children.sort_unstable();
        for (_, child) in children {
            self.push_with_children(child, position, out);
        }
    }
}
