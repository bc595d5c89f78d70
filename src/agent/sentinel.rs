//! Task summary sentinel parsing
//!
//! The coding agent ends its work by emitting
//! `<task_summary>...</task_summary>` in plain text. Nothing else in the
//! model output carries control flow.

const OPEN: &str = "<task_summary>";
const CLOSE: &str = "</task_summary>";

/// Extract the task summary from assistant text.
///
/// Returns the trimmed text between the markers. An unterminated block runs
/// to the end of the text. A missing or blank block yields `None`.
pub fn extract_task_summary(text: &str) -> Option<String> {
    let start = text.find(OPEN)? + OPEN.len();
    let rest = &text[start..];
    let inner = match rest.find(CLOSE) {
        Some(end) => &rest[..end],
        None => rest,
    };
    let inner = inner.trim();
    if inner.is_empty() { None } else { Some(inner.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_delimited_block() {
        let text = "All done.\n<task_summary>\nCreated a todo app with local storage.\n</task_summary>";
        assert_eq!(
            extract_task_summary(text).as_deref(),
            Some("Created a todo app with local storage.")
        );
    }

    #[test]
    fn test_no_marker() {
        assert_eq!(extract_task_summary("I have finished the task."), None);
        assert_eq!(extract_task_summary(""), None);
    }

    #[test]
    fn test_closing_tag_alone_is_not_a_summary() {
        assert_eq!(extract_task_summary("oops </task_summary>"), None);
    }

    #[test]
    fn test_blank_block_is_not_a_summary() {
        assert_eq!(extract_task_summary("<task_summary>   </task_summary>"), None);
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        assert_eq!(
            extract_task_summary("<task_summary>Built the page").as_deref(),
            Some("Built the page")
        );
    }

    #[test]
    fn test_first_block_wins() {
        let text = "<task_summary>first</task_summary> <task_summary>second</task_summary>";
        assert_eq!(extract_task_summary(text).as_deref(), Some("first"));
    }
}
