//! Outbox notifications for the field executor a transition affects.

use crate::subtask::{
    domain::{ActorRef, NewNotification, NotificationKind, SubTask},
    services::{HookContext, HookError, TransitionHook},
};
use minijinja::Environment;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Notifies the sub-task's field executor with a fixed notification kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationHook {
    kind: NotificationKind,
}

impl NotificationHook {
    /// Creates a hook sending `kind` notifications.
    #[must_use]
    pub const fn new(kind: NotificationKind) -> Self {
        Self { kind }
    }
}

impl TransitionHook for NotificationHook {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let sub_task = ctx.sub_task().clone();
        let Some(recipient) = sub_task.last_field_executor().cloned() else {
            return Ok(());
        };
        notify(ctx, self.kind, &recipient, &sub_task)
    }
}

/// Renders and enqueues one notification about `sub_task` for `recipient`.
///
/// The dedupe key ties the notification to the report that triggered it,
/// so the outbox keeps at most one per event and recipient.
pub(crate) fn notify(
    ctx: &mut HookContext<'_>,
    kind: NotificationKind,
    recipient: &ActorRef,
    sub_task: &SubTask,
) -> Result<(), HookError> {
    let context = template_context(ctx, sub_task);
    let title = render(kind.title_template(), &context)?;
    let body = render(kind.body_template(), &context)?;
    let dedupe_key = dedupe_key(kind, sub_task, ctx.report().id.value(), recipient);
    let notification = NewNotification {
        recipient: recipient.user_id,
        kind,
        sub_task_id: sub_task.id(),
        task_id: sub_task.task_id(),
        title,
        body,
        dedupe_key,
        created_at: ctx.now(),
    };
    ctx.tx().enqueue_notification(notification)?;
    Ok(())
}

fn template_context(ctx: &HookContext<'_>, sub_task: &SubTask) -> Map<String, Value> {
    let mut context = Map::new();
    context.insert(
        "sub_task_type".to_owned(),
        Value::String(sub_task.sub_task_type().to_string()),
    );
    context.insert(
        "sub_task_uid".to_owned(),
        Value::String(sub_task.uid().to_string()),
    );
    if let Some(number) = &sub_task.customer().registration_number {
        context.insert("customer_number".to_owned(), Value::String(number.clone()));
    }
    context.insert(
        "report_code".to_owned(),
        Value::String(ctx.report().code.clone()),
    );
    context.insert(
        "actor".to_owned(),
        Value::String(ctx.actor().fullname.clone()),
    );
    context
}

fn render(template: &str, context: &Map<String, Value>) -> Result<String, HookError> {
    Environment::new()
        .render_str(template, context)
        .map_err(|error| HookError::Render(error.to_string()))
}

fn dedupe_key(
    kind: NotificationKind,
    sub_task: &SubTask,
    report_id: i64,
    recipient: &ActorRef,
) -> String {
    let canonical = format!(
        "{}:{}:{}:{}",
        kind.as_str(),
        sub_task.id(),
        report_id,
        recipient.user_id
    );
    let digest = Sha256::digest(canonical.as_bytes());
    digest
        .iter()
        .fold(String::with_capacity(64), |mut hex, byte| {
            hex.push_str(&format!("{byte:02x}"));
            hex
        })
}
