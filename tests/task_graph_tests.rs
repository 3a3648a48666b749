use chrono::NaiveDate;
use issue_schedule::graph::EdgeKind;
use issue_schedule::{ChecklistItem, Diagnostic, ExternalRecord, GraphError, Task, TaskGraph, TaskStatus};
use std::collections::HashMap;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build(tasks: Vec<Task>) -> TaskGraph {
    TaskGraph::build(tasks, HashMap::new()).unwrap()
}

fn ids(graph: &TaskGraph, indices: &[usize]) -> Vec<String> {
    indices.iter().map(|&ix| graph.node(ix).id.clone()).collect()
}

#[test]
fn builds_dependency_edges() {
    // 1 -> {2, 3}
    let graph = build(vec![
        Task::new("1", "A"),
        Task::new("2", "B").depends_on(["1"]),
        Task::new("3", "C").depends_on(["1"]),
    ]);
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edge_count(EdgeKind::Dependency), 2);
    assert_eq!(ids(&graph, graph.topological()), vec!["1", "2", "3"]);
    assert!(!graph.has_cycles());
}

#[test]
fn flattens_subtasks_under_full_ids() {
    let graph = build(vec![
        Task::new("4", "Parent")
            .with_subtask(Task::new("1", "First"))
            .with_subtask(Task::new("4.2", "Second").with_subtask(Task::new("1", "Nested"))),
    ]);

    assert_eq!(graph.len(), 4);
    let nested = graph.get("4.2.1").expect("nested subtask indexed by full id");
    assert_eq!(graph.node(nested.parent.unwrap()).id, "4.2");
    let parent = graph.get("4").unwrap();
    assert_eq!(ids(&graph, &parent.children), vec!["4.1", "4.2"]);
    assert!(graph.get("4.1").unwrap().inherits_parent_window);
    assert!(!parent.inherits_parent_window);
}

#[test]
fn subtask_dependencies_resolve_relative_to_siblings() {
    let graph = build(vec![
        Task::new("7", "Parent")
            .with_subtask(Task::new("1", "Design"))
            .with_subtask(Task::new("2", "Build").depends_on(["1"])),
    ]);
    let build_step = graph.get("7.2").unwrap();
    assert_eq!(ids(&graph, &build_step.dependencies), vec!["7.1"]);
    assert!(!build_step.inherits_parent_window);
    assert!(graph.diagnostics().is_empty());
}

#[test]
fn unknown_dependency_is_dropped_with_warning() {
    let graph = build(vec![Task::new("1", "A").depends_on(["missing", "missing"])]);
    assert!(graph.get("1").unwrap().dependencies.is_empty());
    assert_eq!(
        graph.diagnostics(),
        &[
            Diagnostic::UnresolvedReference {
                task_id: "1".into(),
                missing: "missing".into()
            },
            Diagnostic::UnresolvedReference {
                task_id: "1".into(),
                missing: "missing".into()
            },
        ]
    );
    assert_eq!(graph.topological().len(), 1);
}

#[test]
fn self_dependency_is_dropped() {
    let graph = build(vec![Task::new("1", "A").depends_on(["1"])]);
    assert!(graph.get("1").unwrap().dependencies.is_empty());
    assert_eq!(
        graph.diagnostics(),
        &[Diagnostic::SelfDependency { task_id: "1".into() }]
    );
    assert!(!graph.has_cycles());
}

#[test]
fn duplicate_dependencies_collapse() {
    let graph = build(vec![
        Task::new("1", "A"),
        Task::new("2", "B").depends_on(["1", "1"]),
    ]);
    assert_eq!(graph.get("2").unwrap().dependencies, vec![0]);
    assert_eq!(graph.edge_count(EdgeKind::Dependency), 1);
}

#[test]
fn duplicate_ids_fail_the_build() {
    let err = TaskGraph::build(vec![Task::new("1", "A"), Task::new("1", "B")], HashMap::new())
        .unwrap_err();
    assert_eq!(err, GraphError::DuplicateTaskId("1".into()));
}

#[test]
fn two_task_cycle_is_reported_and_blocked() {
    let graph = build(vec![
        Task::new("A", "A").depends_on(["B"]),
        Task::new("B", "B").depends_on(["A"]),
        Task::new("C", "C"),
    ]);
    assert!(graph.has_cycles());
    assert_eq!(graph.cycles().len(), 1);
    assert_eq!(graph.cycles()[0].task_ids, vec!["A", "B"]);
    assert_eq!(graph.blocked_ids(), vec!["A", "B"]);
    assert_eq!(ids(&graph, graph.topological()), vec!["C"]);
}

#[test]
fn tasks_downstream_of_a_cycle_are_blocked_but_not_cyclic() {
    let graph = build(vec![
        Task::new("1", "Root"),
        Task::new("2", "X").depends_on(["1", "3"]),
        Task::new("3", "Y").depends_on(["2"]),
        Task::new("4", "After").depends_on(["3"]),
        Task::new("5", "Independent").depends_on(["1"]),
    ]);
    assert_eq!(graph.cycles()[0].task_ids, vec!["2", "3"]);
    assert_eq!(graph.blocked_ids(), vec!["2", "3", "4"]);
    assert_eq!(ids(&graph, graph.topological()), vec!["1", "5"]);
}

#[test]
fn separate_cycles_are_reported_separately() {
    let graph = build(vec![
        Task::new("a", "a").depends_on(["b"]),
        Task::new("b", "b").depends_on(["a"]),
        Task::new("c", "c").depends_on(["e"]),
        Task::new("d", "d").depends_on(["c"]),
        Task::new("e", "e").depends_on(["d"]),
    ]);
    let cycles: Vec<Vec<String>> = graph.cycles().iter().map(|c| c.task_ids.clone()).collect();
    assert_eq!(cycles, vec![vec!["a", "b"], vec!["c", "d", "e"]]);
}

#[test]
fn records_attach_by_id_and_mapping_wins() {
    let mut records = HashMap::new();
    records.insert("1".to_string(), ExternalRecord::new().created(d(2024, 3, 1)));
    records.insert("ghost".to_string(), ExternalRecord::new().created(d(2023, 1, 1)));

    let graph = TaskGraph::build(
        vec![
            Task::new("1", "A").with_record(ExternalRecord::new().created(d(2024, 5, 1))),
            Task::new("2", "B").with_record(ExternalRecord::new().created(d(2024, 2, 1))),
        ],
        records,
    )
    .unwrap();

    assert_eq!(
        graph.get("1").unwrap().record.as_ref().unwrap().created_at,
        Some(d(2024, 3, 1))
    );
    // the unlinked record still counts as evidence for the run
    assert_eq!(graph.earliest_created(), Some(d(2023, 1, 1)));
    assert_eq!(
        graph.diagnostics(),
        &[Diagnostic::UnknownRecord {
            task_id: "ghost".into()
        }]
    );
}

#[test]
fn checklist_items_become_inheriting_subtasks() {
    let record = ExternalRecord::new()
        .created(d(2024, 1, 2))
        .with_checklist([ChecklistItem::new(true, "Design"), ChecklistItem::new(false, "Ship")]);
    let graph = build(vec![
        Task::new("9", "Epic")
            .with_record(record)
            .with_subtask(Task::new("1", "Explicit")),
    ]);

    let design = graph.get("9.2").unwrap();
    assert_eq!(design.title, "Design");
    assert_eq!(design.status, TaskStatus::Done);
    assert!(design.from_checklist);
    assert!(design.inherits_parent_window);
    let ship = graph.get("9.3").unwrap();
    assert_eq!(ship.status, TaskStatus::Pending);
    assert_eq!(graph.edge_count(EdgeKind::ParentWindow), 3);
}

#[test]
fn display_order_puts_subtasks_right_after_parent() {
    let graph = build(vec![
        Task::new("1", "First")
            .depends_on(["2"])
            .with_subtask(Task::new("b", "Later child").depends_on(["a"]))
            .with_subtask(Task::new("a", "Earlier child")),
        Task::new("2", "Second"),
    ]);
    assert_eq!(
        ids(&graph, &graph.display_order()),
        vec!["2", "1", "1.a", "1.b"]
    );
}

#[test]
fn display_order_promotes_children_of_blocked_parents() {
    let graph = build(vec![
        Task::new("1", "Loop A")
            .depends_on(["2"])
            .with_subtask(Task::new("x", "Own evidence").with_record(ExternalRecord::new())),
        Task::new("2", "Loop B").depends_on(["1"]),
    ]);
    assert_eq!(ids(&graph, &graph.display_order()), vec!["1.x"]);
}

#[test]
fn parent_depending_on_bare_subtask_is_not_a_cycle() {
    let graph = build(vec![
        Task::new("1", "Parent")
            .depends_on(["1.1"])
            .with_subtask(Task::new("1", "Groundwork")),
    ]);
    assert!(!graph.has_cycles());
    assert!(graph.blocked().is_empty());
    assert!(!graph.get("1.1").unwrap().inherits_parent_window);
    assert_eq!(graph.edge_count(EdgeKind::ParentWindow), 0);
    assert_eq!(ids(&graph, graph.topological()), vec!["1.1", "1"]);
    assert_eq!(ids(&graph, &graph.display_order()), vec!["1", "1.1"]);
}

#[test]
fn parent_reaching_bare_subtask_through_a_sibling_is_not_a_cycle() {
    let graph = build(vec![
        Task::new("1", "Parent")
            .depends_on(["2"])
            .with_subtask(Task::new("1", "Groundwork"))
            .with_subtask(Task::new("2", "Unrelated")),
        Task::new("2", "Bridge").depends_on(["1.1"]),
    ]);
    assert!(!graph.has_cycles());
    assert!(!graph.get("1.1").unwrap().inherits_parent_window);
    // the sibling the parent does not wait on still borrows its window
    assert!(graph.get("1.2").unwrap().inherits_parent_window);
    assert_eq!(graph.edge_count(EdgeKind::ParentWindow), 1);
    assert_eq!(graph.topological().len(), 4);
}
