/// A rewrite over the finished assembly text of one function.
pub trait Pass {
    fn optimize(&self, lines: Vec<String>) -> Vec<String>;

    fn name(&self) -> &'static str;
}

/// `  # ...` lines emitted for annotation; peephole patterns look through them.
pub fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Splits an unindented instruction line into its mnemonic and operand text.
/// Labels, directives and comments are indented and yield `None`.
pub fn instruction(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) || line.is_empty() {
        return None;
    }
    Some(line.split_once(' ').unwrap_or((line, "")))
}
