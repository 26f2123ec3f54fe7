use flipgate_types::{ScoreEntry, TopFliprates};

pub const NORMAL_HEADLINE: &str = "flaky tests based on latest window fliprate";

pub const EWM_HEADLINE: &str =
    "flaky tests based on latest window exponential weighted moving average fliprate score";

fn push_scores(out: &mut String, entries: &[ScoreEntry]) {
    for entry in entries {
        out.push_str(&format!(
            "{} --- score: {}\n",
            entry.test_identifier, entry.score
        ));
    }
}

/// Plain-text ranking as printed by `flipgate rank`.
pub fn render_console(top: &TopFliprates, top_n: u32) -> String {
    let mut out = String::new();
    out.push_str(&format!("Top {top_n} {NORMAL_HEADLINE}\n"));
    push_scores(&mut out, &top.top_normal_scores);
    out.push('\n');
    out.push_str(&format!("Top {top_n} {EWM_HEADLINE}\n"));
    push_scores(&mut out, &top.top_ewm_scores);
    out
}
