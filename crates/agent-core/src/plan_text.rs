//! Turning free-form planner output into ordered steps.

/// Used when the planner output contains no steps at all.
pub const DEFAULT_PLAN: [&str; 4] = [
    "Open browser",
    "Navigate to target",
    "Extract data",
    "Summarize",
];

/// One step per non-empty line, with `1)` / `1.` numbering removed.
pub fn parse_plan_text(text: &str) -> Vec<String> {
    let steps: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_numbering(line).trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    if steps.is_empty() {
        return DEFAULT_PLAN.iter().map(|step| step.to_string()).collect();
    }
    steps
}

fn strip_numbering(line: &str) -> &str {
    if !line.starts_with(|c: char| c.is_ascii_digit()) {
        return line;
    }
    let head: String = line.chars().take(3).collect();
    for marker in [')', '.'] {
        if head.contains(marker) {
            if let Some((_, rest)) = line.split_once(marker) {
                return rest;
            }
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_numbering_and_blank_lines() {
        let text = "1) open(\"https://example.com\")\n\n2. extract(\"title\")\n  10) Summarize  ";
        assert_eq!(
            parse_plan_text(text),
            vec![
                "open(\"https://example.com\")".to_string(),
                "extract(\"title\")".to_string(),
                "Summarize".to_string(),
            ]
        );
    }

    #[test]
    fn keeps_unnumbered_lines_and_falls_back_when_empty() {
        assert_eq!(parse_plan_text("wait(500)"), vec!["wait(500)".to_string()]);
        assert_eq!(parse_plan_text("  \n \n").len(), 4);
        assert_eq!(parse_plan_text("")[0], "Open browser");
    }
}
