use crate::task::Describe;

/// Renders tasks as `- label` / `- label: description` lines, or `- None`.
pub fn format_tasks<T: Describe>(tasks: &[T]) -> String {
    if tasks.is_empty() {
        return "- None".to_string();
    }

    tasks
        .iter()
        .map(|task| match task.description().filter(|d| !d.is_empty()) {
            Some(description) => format!("- {}: {}", task.label(), description),
            None => format!("- {}", task.label()),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
