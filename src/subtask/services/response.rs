//! JSON bodies a transport handler writes for transition results.

use super::TransitionError;
use crate::subtask::domain::{Operation, SubTask, SubTaskReport};
use serde_json::{Map, Value};

const PICK_SUCCESS: &str = "SUCCESS";
const PICK_FAILED: &str = "FAILED";

/// Builds the success body for a committed transition.
///
/// Pick responses also carry `"result": "SUCCESS"`.
///
/// # Errors
///
/// Returns [`TransitionError::InternalConsistency`] when the sub-task cannot
/// be serialized.
pub fn success_body(
    label: &str,
    sub_task: &SubTask,
    report: &SubTaskReport,
) -> Result<Value, TransitionError> {
    let sub_task_value = serde_json::to_value(sub_task)
        .map_err(|err| TransitionError::internal(format!("sub-task response: {err}")))?;

    let mut data = Map::new();
    data.insert("sub_task".to_owned(), sub_task_value);

    let mut body = Map::new();
    if label == Operation::Pick.label() {
        body.insert("result".to_owned(), Value::String(PICK_SUCCESS.to_owned()));
    }
    body.insert("data".to_owned(), Value::Object(data));
    body.insert(
        "sub_task_report_id".to_owned(),
        Value::from(report.id.value()),
    );
    body.insert(
        "sub_task_report_uid".to_owned(),
        Value::String(report.uid.to_string()),
    );
    Ok(Value::Object(body))
}

/// Builds the failure body for a rejected transition.
///
/// A failed pick answers only `{"result": "FAILED"}`; other operations
/// describe the error.
#[must_use]
pub fn failure_body(label: &str, error: &TransitionError) -> Value {
    let mut body = Map::new();
    if label == Operation::Pick.label() {
        body.insert("result".to_owned(), Value::String(PICK_FAILED.to_owned()));
        return Value::Object(body);
    }

    let mut detail = Map::new();
    detail.insert(
        "kind".to_owned(),
        Value::String(error.kind().as_str().to_owned()),
    );
    detail.insert(
        "reason".to_owned(),
        Value::String(error.reason_code().to_owned()),
    );
    detail.insert("message".to_owned(), Value::String(error.to_string()));
    body.insert("error".to_owned(), Value::Object(detail));
    Value::Object(body)
}
