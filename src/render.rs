//! Human and machine readable plan output

use std::fmt::Write as _;

use similar::{ChangeTag, TextDiff};

use crate::error::Result;
use crate::plan::{Changes, Plan};
use crate::schema::SchemaDefinition;

/// Render a plan for review
pub fn text(plan: &Plan) -> String {
    let mut out = String::new();

    if let Some(change) = &plan.global_compatibility {
        let _ = writeln!(out, "~ global compatibility: {} -> {}", change.before, change.after);
    }
    if let Some(change) = &plan.normalize {
        let _ = writeln!(out, "~ normalize: {} -> {}", change.before, change.after);
    }

    for result in &plan.incompatible {
        let _ = writeln!(out, "! {} (incompatible)", result.subject.name);
        for message in &result.messages {
            let _ = writeln!(out, "    {}", message);
        }
    }

    for subject in &plan.added {
        let _ = writeln!(out, "+ {} ({})", subject.name, subject.schema.schema_type());
        if let Some(level) = subject.compatibility {
            let _ = writeln!(out, "    compatibility: {}", level);
        }
        for line in subject.schema.pretty().lines() {
            let _ = writeln!(out, "    + {}", line);
        }
    }

    for changes in &plan.modified {
        render_changes(&mut out, changes);
    }

    for name in &plan.deleted {
        let _ = writeln!(out, "- {}", name);
    }

    if out.is_empty() {
        out.push_str("No changes. Registry is in sync with the desired state.\n");
    }

    let _ = writeln!(out, "\n{}", summary(plan));
    out
}

/// One-line count of each category
pub fn summary(plan: &Plan) -> String {
    format!(
        "Plan: {} to add, {} to change, {} to delete, {} incompatible",
        plan.added.len(),
        plan.modified.len(),
        plan.deleted.len(),
        plan.incompatible.len(),
    )
}

/// Plan as pretty printed JSON
pub fn json(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(plan)?)
}

fn render_changes(out: &mut String, changes: &Changes) {
    let _ = writeln!(out, "~ {}", changes.subject.name);

    if let Some(change) = &changes.compatibility {
        let _ = writeln!(out, "    compatibility: {} -> {}", change.before, change.after);
    }

    if let Some(change) = &changes.schema {
        if change.before == change.after {
            let _ = writeln!(out, "    schema: content unchanged, not yet registered as a version");
        } else {
            render_schema_diff(out, &change.before, &change.after);
        }
    }
}

fn render_schema_diff(out: &mut String, before: &SchemaDefinition, after: &SchemaDefinition) {
    let old = before.pretty();
    let new = after.pretty();
    let diff = TextDiff::from_lines(&old, &new);

    for change in diff.iter_all_changes() {
        let marker = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        let _ = writeln!(out, "    {} {}", marker, change.value().trim_end());
    }
}
