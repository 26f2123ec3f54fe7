use crate::RenderError;
use flipgate_domain::EWM_ALPHA;
use flipgate_types::{FlakeReport, ScoreEntry};
use handlebars::Handlebars;

fn md_cell(s: &str) -> String {
    s.replace('|', "\\|")
}

fn push_table(out: &mut String, entries: &[ScoreEntry]) {
    if entries.is_empty() {
        out.push_str("_No flaky tests detected._\n");
        return;
    }
    out.push_str("| rank | test | score |\n");
    out.push_str("|---:|---|---:|\n");
    for (idx, entry) in entries.iter().enumerate() {
        out.push_str(&format!(
            "| {} | `{}` | {} |\n",
            idx + 1,
            md_cell(&entry.test_identifier),
            entry.score
        ));
    }
}

pub fn render_markdown(report: &FlakeReport) -> String {
    let mut out = String::new();
    let params = &report.params;

    out.push_str("## flipgate: flaky test report\n\n");
    out.push_str(&format!(
        "**Grouping:** {} · window size {} · {} windows · top {} · precision {}\n\n",
        params.grouping, params.window_size, params.window_count, params.top_n, params.precision
    ));
    out.push_str(&format!(
        "**Data:** {} records across {} tests, {} non-zero fliprate rows\n\n",
        report.summary.record_count, report.summary.test_count, report.summary.row_count
    ));

    out.push_str("### Latest window fliprate\n\n");
    push_table(&mut out, &report.top.top_normal_scores);

    out.push_str(&format!(
        "\n### Latest window EWM fliprate (alpha {EWM_ALPHA})\n\n"
    ));
    push_table(&mut out, &report.top.top_ewm_scores);

    out
}

/// Render a user-supplied Handlebars template against the report.
///
/// The template sees the report's JSON shape (`params`, `top`, `table`,
/// `summary`, ...). Output is not HTML-escaped.
pub fn render_markdown_template(
    report: &FlakeReport,
    template: &str,
) -> Result<String, RenderError> {
    let mut hb = Handlebars::new();
    hb.set_strict_mode(true);
    hb.register_escape_fn(handlebars::no_escape);
    Ok(hb.render_template(template, report)?)
}
