use serde_json::json;
use todocal::query::{SortColumn, SortDirection, TaskView};
use todocal::{Error, JsonFileStore, MemoryStore, TaskManager, TaskStatus, TaskUpdate, UpdateOutcome};

fn statuses(tasks: &[todocal::Task]) -> Vec<TaskStatus> {
    tasks.iter().map(|task| task.status).collect()
}

#[test]
fn buy_milk_end_to_end_on_disk() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("todo_calendar.json");
    let mut tasks = TaskManager::open(JsonFileStore::new(&path));

    tasks
        .create("Buy milk", Some("2025-06-10"), Some(""))
        .expect("create");
    let task = tasks.get(0).expect("task 0");
    assert_eq!(task.id, 0);
    assert_eq!(task.status, TaskStatus::Pending);

    let outcome = tasks
        .update(0, TaskUpdate::status(TaskStatus::Completed))
        .expect("update");
    assert!(matches!(outcome, UpdateOutcome::Updated(_)));

    let completed = tasks.list_by_status_name("Completed").expect("list");
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].id, 0);

    // A second session sees the same state.
    let reopened = TaskManager::open(JsonFileStore::new(&path));
    assert_eq!(reopened.list(), tasks.list());

    assert!(tasks.delete(0).expect("delete"));
    assert!(tasks.list_by_status(TaskStatus::Completed).is_empty());
    assert_eq!(tasks.list().len(), 0);
    assert!(!tasks.delete(0).expect("delete again"));
}

#[test]
fn every_loaded_task_is_normalized() {
    let store = MemoryStore::with_records(vec![
        json!({"id": 0, "description": "a", "status": "COMPLETED", "note": null}),
        json!({"id": 1, "description": "b", "status": "archived"}),
        json!({"id": 2, "description": "c", "status": 7, "note": 12}),
        json!({"id": 3, "description": "d"}),
        json!("not a record"),
    ]);
    let tasks = TaskManager::open(store);

    assert_eq!(tasks.len(), 4);
    assert_eq!(
        statuses(&tasks.list()),
        vec![
            TaskStatus::Completed,
            TaskStatus::Pending,
            TaskStatus::Pending,
            TaskStatus::Pending
        ]
    );
    assert_eq!(tasks.get(0).expect("task").note, "");
    assert_eq!(tasks.get(2).expect("task").note, "12");
    assert_eq!(tasks.load_warnings().len(), 1);
}

#[test]
fn created_ids_strictly_increase() {
    let mut tasks = TaskManager::open(MemoryStore::new());
    let mut last = None;
    for round in 0..10 {
        let task = tasks.create(&format!("task {round}"), None, None).expect("create");
        if let Some(prev) = last {
            assert!(task.id > prev);
        }
        last = Some(task.id);
        if round % 3 == 0 {
            tasks.delete(task.id).expect("delete");
        }
    }
    assert_eq!(tasks.next_id(), 10);
}

#[test]
fn sort_by_status_uses_domain_order() {
    let store = MemoryStore::with_records(vec![
        json!({"id": 0, "description": "a", "status": "On hold"}),
        json!({"id": 1, "description": "b", "status": "Pending"}),
        json!({"id": 2, "description": "c", "status": "Completed"}),
    ]);
    let tasks = TaskManager::open(store);

    let sorted = tasks.sort_all(Some(SortColumn::Status), SortDirection::Ascending);
    assert_eq!(
        statuses(&sorted),
        vec![TaskStatus::Pending, TaskStatus::Completed, TaskStatus::OnHold]
    );

    let sorted = tasks.sort_all(Some(SortColumn::Status), SortDirection::Descending);
    assert_eq!(
        statuses(&sorted),
        vec![TaskStatus::OnHold, TaskStatus::Completed, TaskStatus::Pending]
    );
}

#[test]
fn sort_by_due_date_puts_missing_last() {
    let store = MemoryStore::with_records(vec![
        json!({"id": 0, "description": "a", "due_date": "2025-06-02"}),
        json!({"id": 1, "description": "b", "due_date": null}),
        json!({"id": 2, "description": "c", "due_date": "2025-06-01"}),
    ]);
    let tasks = TaskManager::open(store);

    let sorted = tasks.sort_all(Some(SortColumn::DueDate), SortDirection::Ascending);
    let due: Vec<_> = sorted.iter().map(|t| t.due_date.as_deref()).collect();
    assert_eq!(due, vec![Some("2025-06-01"), Some("2025-06-02"), None]);

    // The source collection is untouched.
    assert_eq!(tasks.list()[0].id, 0);
}

#[test]
fn view_uses_manager_collection() {
    let store = MemoryStore::with_records(vec![
        json!({"id": 0, "description": "a", "status": "On hold", "creation_time": "2025-01-01 00:00:00"}),
        json!({"id": 1, "description": "b", "creation_time": "2025-02-01 00:00:00"}),
    ]);
    let tasks = TaskManager::open(store);

    let summary = tasks.view(&TaskView {
        hide_on_hold: true,
        ..TaskView::default()
    });
    assert_eq!(summary.tasks.len(), 1);
    assert_eq!(summary.hidden_on_hold, 1);

    let summary = tasks.view(&TaskView::default());
    let ids: Vec<_> = summary.tasks.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 0]);
}

#[test]
fn save_failure_is_distinguishable_and_retryable() {
    let temp = tempfile::tempdir().expect("tempdir");
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "x").expect("write blocker");
    let mut tasks = TaskManager::open(JsonFileStore::new(blocker.join("tasks.json")));

    let err = tasks.create("a", None, None).expect_err("save must fail");
    assert!(matches!(err, Error::SaveFailed { .. }));
    assert_eq!(err.kind(), "persistence");
    assert_eq!(tasks.len(), 1);

    let err = tasks.create("", None, None).expect_err("validation");
    assert_eq!(err.kind(), "validation");
    assert!(!err.is_persistence());
}
