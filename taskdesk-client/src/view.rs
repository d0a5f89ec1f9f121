//! Plain-text rendering for the terminal
//!
//! Every function returns a `String` so output can be asserted in tests and
//! printed by the binary as-is.

use crate::api::{Health, LOCAL_ID_PREFIX};
use chrono::{DateTime, Utc};
use taskdesk_shared::models::task::TaskView;
use taskdesk_shared::models::user::{UserProfile, UserSummary};
use taskdesk_shared::seed::{DEMO_EMAIL, DEMO_PASSWORD};

/// Which tasks a list shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Pending,
    Completed,
}

impl Filter {
    fn keeps(&self, task: &TaskView) -> bool {
        match self {
            Filter::All => true,
            Filter::Pending => !task.completed,
            Filter::Completed => task.completed,
        }
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Counters line shown above the list, computed over all tasks
pub fn render_summary(tasks: &[TaskView]) -> String {
    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let pending = total - completed;
    let percentage = if total > 0 {
        (completed * 100 + total / 2) / total
    } else {
        0
    };

    format!(
        "{} of {} tasks completed ({}%)\n{} {} total, {} pending\n",
        completed,
        total,
        percentage,
        total,
        if total == 1 { "task" } else { "tasks" },
        pending
    )
}

pub fn render_task_card(task: &TaskView) -> String {
    let mut out = format!(
        "[{}] {}  {}\n",
        if task.completed { "x" } else { " " },
        task.title,
        task.priority.as_str()
    );

    for line in task.description.lines().filter(|l| !l.trim().is_empty()) {
        out.push_str(&format!("    {}\n", line));
    }

    let mut meta = vec![
        format!("id {}", task.id),
        format!("created {}", format_date(&task.created_at)),
    ];
    if let Some(due) = &task.due_date {
        meta.push(format!("due {}", format_date(due)));
    }
    if task.id.starts_with(LOCAL_ID_PREFIX) {
        meta.push("not synced".to_string());
    }
    out.push_str(&format!("    {}\n", meta.join(" | ")));

    out
}

pub fn render_task_list(tasks: &[TaskView], filter: Filter) -> String {
    if tasks.is_empty() {
        return "No tasks yet\nYour tasks will appear here once added.\n".to_string();
    }

    let mut out = render_summary(tasks);
    let shown: Vec<&TaskView> = tasks.iter().filter(|t| filter.keeps(t)).collect();

    if shown.is_empty() {
        out.push_str(match filter {
            Filter::Pending => "\nNothing pending.\n",
            _ => "\nNo completed tasks.\n",
        });
        return out;
    }

    for task in shown {
        out.push('\n');
        out.push_str(&render_task_card(task));
    }
    out
}

/// Shown instead of the list when there is no usable session
pub fn render_login_prompt() -> String {
    format!(
        "You are not signed in, or your session has expired.\n\
         Sign in with: taskdesk login --email <email>\n\
         Demo account: {} / {}\n",
        DEMO_EMAIL, DEMO_PASSWORD
    )
}

pub fn render_login_success(user: &UserSummary) -> String {
    format!(
        "Signed in as {}{}\n",
        user.email,
        user.name
            .as_deref()
            .map(|n| format!(" ({})", n))
            .unwrap_or_default()
    )
}

pub fn render_profile(user: &UserProfile) -> String {
    format!(
        "{}\n  id: {}\n  name: {}\n  member since: {}\n",
        user.email,
        user.id,
        user.name.as_deref().unwrap_or("-"),
        format_date(&user.created_at)
    )
}

pub fn render_health(api_url: &str, health: Option<&Health>) -> String {
    let Some(health) = health else {
        return format!("Backend at {} is unreachable\n", api_url);
    };

    let mut out = format!("Backend at {} is {}\n", api_url, health.status);
    if let Some(version) = &health.version {
        out.push_str(&format!("  version: {}\n", version));
    }
    if let Some(environment) = &health.environment {
        out.push_str(&format!("  environment: {}\n", environment));
    }
    if let Some(database) = &health.database {
        out.push_str(&format!("  database: {}\n", database));
    }
    if let Some(counts) = &health.counts {
        out.push_str(&format!(
            "  tasks: {}, users: {}\n",
            counts.tasks, counts.users
        ));
    }
    out
}
