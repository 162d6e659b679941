use std::path::PathBuf;

use todocal::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let validation = Error::Validation("Task description cannot be empty.".to_string());
    assert_eq!(validation.exit_code(), exit_codes::USER_ERROR);

    let busy = Error::WriteInProgress;
    assert_eq!(busy.exit_code(), exit_codes::OPERATION_FAILED);

    let op = Error::OperationFailed("boom".to_string());
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn kinds_separate_rejection_from_persistence() {
    assert_eq!(Error::Validation("x".to_string()).kind(), "validation");
    assert_eq!(Error::TaskNotFound(3).kind(), "not_found");
    assert_eq!(Error::InvalidArgument("x".to_string()).kind(), "invalid_argument");
    assert_eq!(Error::InvalidConfig("x".to_string()).kind(), "config");
    assert_eq!(Error::WriteInProgress.kind(), "busy");

    let lock = Error::LockFailed(PathBuf::from("/tmp/t.json.lock"));
    assert!(lock.is_persistence());
}

#[test]
fn json_error_includes_code_and_cause() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = Error::SaveFailed {
        path: PathBuf::from("/data/todo_calendar.json"),
        source: Box::new(Error::Io(io)),
    };
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::OPERATION_FAILED);
    assert_eq!(json.kind, "persistence");
    assert!(json.error.contains("Save failed for /data/todo_calendar.json"));

    let details = json.details.expect("details");
    assert_eq!(details["path"], "/data/todo_calendar.json");
    assert!(details["cause"].as_str().unwrap_or_default().contains("denied"));
}
