//! File-name templates for task and test files.
//!
//! A template is plain text with two placeholders: `{block}` is replaced by the
//! block name and `{task}` by the task index padded to two digits. Only the
//! first occurrence of each placeholder is substituted.

pub const DEFAULT_TASK_TEMPLATE: &str = "{block}{task}.ts";
pub const DEFAULT_TEST_TEMPLATE: &str = "{block}{task}.test.ts";

/// `7` becomes `"07"`; indices of three digits or more are left as-is.
pub fn pad_index(task: u32) -> String {
    format!("{task:02}")
}

/// Name a task is listed under, e.g. `algo07`
pub fn display_name(block: &str, task: u32) -> String {
    format!("{block}{}", pad_index(task))
}

pub fn render(template: &str, block: &str, task: u32) -> String {
    template
        .replacen("{block}", block, 1)
        .replacen("{task}", &pad_index(task), 1)
}

/// Argument handed to the test runner: the file name without its script
/// extension.
pub fn test_name(test_file: &str) -> String {
    test_file.replacen(".ts", "", 1).replacen(".js", "", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_two_digits() {
        assert_eq!(pad_index(1), "01");
        assert_eq!(pad_index(42), "42");
        assert_eq!(pad_index(100), "100");
    }

    #[test]
    fn renders_default_templates() {
        assert_eq!(render(DEFAULT_TASK_TEMPLATE, "algo", 3), "algo03.ts");
        assert_eq!(render(DEFAULT_TEST_TEMPLATE, "algo", 3), "algo03.test.ts");
    }

    #[test]
    fn renders_custom_template() {
        assert_eq!(
            render("test_{block}_{task}.js", "graphs", 12),
            "test_graphs_12.js"
        );
    }

    #[test]
    fn only_first_placeholder_is_replaced() {
        assert_eq!(render("{block}/{block}{task}", "a", 1), "a/{block}01");
    }

    #[test]
    fn template_without_placeholders_is_unchanged() {
        assert_eq!(render("main.ts", "algo", 1), "main.ts");
    }

    #[test]
    fn test_name_strips_extension() {
        assert_eq!(test_name("algo03.test.ts"), "algo03.test");
        assert_eq!(test_name("algo03.spec.js"), "algo03.spec");
        assert_eq!(test_name("algo03"), "algo03");
    }

    #[test]
    fn display_name_matches_padding() {
        assert_eq!(display_name("algo", 5), "algo05");
    }
}
