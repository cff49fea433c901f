//! Text summary builder for CLI output.
//!
//! Formats a query outcome as human-readable lines: execution id, state and,
//! when rows were fetched, an aligned table.

use athena_query::model::{QueryOutcome, ResultSet};

const NULL: &str = "NULL";

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(outcome: &QueryOutcome) -> TextSummary {
    let mut lines = vec![format!("Execution: {}", outcome.execution_id)];
    match outcome.final_status {
        Some(state) => lines.push(format!("State: {state}")),
        None => lines.push("State: submitted".to_string()),
    }
    if let Some(set) = &outcome.result_set {
        lines.push(String::new());
        lines.extend(render_table(set));
    }
    TextSummary { lines }
}

fn render_table(set: &ResultSet) -> Vec<String> {
    let mut widths: Vec<usize> = set.columns.iter().map(|c| c.name.chars().count()).collect();
    for row in &set.rows {
        for (i, value) in row.iter().enumerate() {
            let len = value.as_deref().unwrap_or(NULL).chars().count();
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" | ")
            .trim_end()
            .to_string()
    };

    let mut lines = Vec::with_capacity(set.rows.len() + 3);
    lines.push(render(set.columns.iter().map(|c| c.name.as_str()).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-"),
    );
    for row in &set.rows {
        lines.push(render(
            row.iter().map(|v| v.as_deref().unwrap_or(NULL)).collect(),
        ));
    }
    let n = set.rows.len();
    lines.push(format!("({n} row{})", if n == 1 { "" } else { "s" }));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_query::model::{ColumnDescriptor, ExecutionId, ExecutionState};

    #[test]
    fn renders_aligned_table() {
        let outcome = QueryOutcome {
            execution_id: ExecutionId::new("12345-12345"),
            final_status: Some(ExecutionState::Succeeded),
            result_set: Some(ResultSet {
                columns: vec![
                    ColumnDescriptor::new("max_job_id", "varchar"),
                    ColumnDescriptor::new("n", "integer"),
                ],
                rows: vec![
                    vec![Some("20200825".into()), Some("12".into())],
                    vec![None, Some("3".into())],
                ],
            }),
        };
        let lines = build_text_summary(&outcome).lines;
        assert_eq!(
            lines,
            vec![
                "Execution: 12345-12345",
                "State: SUCCEEDED",
                "",
                "max_job_id | n",
                "-----------+---",
                "20200825   | 12",
                "NULL       | 3",
                "(2 rows)",
            ]
        );
    }

    #[test]
    fn submit_only_has_no_table() {
        let outcome = QueryOutcome {
            execution_id: ExecutionId::new("abc"),
            final_status: None,
            result_set: None,
        };
        assert_eq!(
            build_text_summary(&outcome).lines,
            vec!["Execution: abc", "State: submitted"]
        );
    }
}
