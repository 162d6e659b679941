//! Human-readable rendering of tasks.

use crate::task::{parse_date, Task};

const NOTE_PREVIEW_CHARS: usize = 60;

/// `2025-05-20 (Tue)`; text that is not a date is shown as is.
pub(crate) fn format_due(raw: Option<&str>) -> String {
    match raw {
        None | Some("") => "no due date".to_string(),
        Some(raw) => match parse_date(raw) {
            Some(date) => format!("{} ({})", raw, date.format("%a")),
            None => raw.to_string(),
        },
    }
}

/// Single-line note, cut to 60 characters.
pub(crate) fn note_preview(note: &str) -> String {
    let flat = note.replace('\n', " ");
    if flat.chars().count() > NOTE_PREVIEW_CHARS {
        let cut: String = flat.chars().take(NOTE_PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        flat
    }
}

pub(crate) fn task_line(task: &Task) -> String {
    let mut line = format!(
        "[{}] {} {} (due: {})",
        task.status,
        task.id,
        task.description,
        format_due(task.due_date.as_deref())
    );
    if !task.note.is_empty() {
        line.push_str(&format!(" - {}", note_preview(&task.note)));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;

    #[test]
    fn due_dates_show_weekday() {
        assert_eq!(format_due(Some("2025-05-20")), "2025-05-20 (Tue)");
        assert_eq!(format_due(None), "no due date");
        assert_eq!(format_due(Some("")), "no due date");
        assert_eq!(format_due(Some("bad-date")), "bad-date");
    }

    #[test]
    fn long_notes_are_cut() {
        let long = "a".repeat(61);
        assert_eq!(note_preview(&long), format!("{}...", "a".repeat(60)));
        assert_eq!(note_preview(&"b".repeat(60)), "b".repeat(60));
        assert_eq!(note_preview("one\ntwo"), "one two");
        // Counted in characters, not bytes.
        assert_eq!(note_preview(&"é".repeat(60)), "é".repeat(60));
    }

    #[test]
    fn task_line_layout() {
        let task = Task {
            id: 3,
            description: "Buy milk".to_string(),
            due_date: Some("2025-06-10".to_string()),
            status: TaskStatus::InProgress,
            note: "2%".to_string(),
            creation_time: None,
            image_path: None,
        };
        assert_eq!(
            task_line(&task),
            "[In progress] 3 Buy milk (due: 2025-06-10 (Tue)) - 2%"
        );
    }
}
