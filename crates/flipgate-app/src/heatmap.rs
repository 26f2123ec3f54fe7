use anyhow::Context;
use flipgate_domain::{EWM_ALPHA, HeatmapMatrix, get_image_tables_from_fliprate_table};
use flipgate_render::render_heatmap_png;
use flipgate_types::{FlakeReport, Grouping, WindowParams};

/// A rendered heatmap and the name it should be saved under.
#[derive(Debug, Clone)]
pub struct HeatmapArtifact {
    pub file_name: String,
    pub title: String,
    pub png: Vec<u8>,
}

/// `(raw, ewm)` file names, e.g. `1day_flip_rate_top2.png`.
pub fn heatmap_file_names(params: &WindowParams) -> (String, String) {
    let size = params.window_size;
    let label = params.grouping.file_label();
    let n = params.top_n;
    (
        format!("{size}{label}_flip_rate_top{n}.png"),
        format!("{size}{label}_flip_rate_ewm_top{n}.png"),
    )
}

/// `(raw, ewm)` human-readable titles.
pub fn heatmap_titles(params: &WindowParams) -> (String, String) {
    let n = params.top_n;
    let span = u64::from(params.window_size) * u64::from(params.window_count);
    let scope = match params.grouping {
        Grouping::Days => format!("last {span} days of data"),
        Grouping::Runs => format!(
            "{} last runs fliprate and {span} last runs data",
            params.window_size
        ),
    };
    (
        format!(
            "Top {n} of tests with highest latest window fliprate - no exponentially weighted moving average - {scope}"
        ),
        format!(
            "Top {n} of tests with highest latest window exponentially weighted moving average fliprate score - alpha (smoothing factor) = {EWM_ALPHA} - {scope}"
        ),
    )
}

/// Turns a report into the two heatmap images.
pub struct HeatmapUseCase;

impl HeatmapUseCase {
    pub fn execute(report: &FlakeReport) -> anyhow::Result<Vec<HeatmapArtifact>> {
        let tables = get_image_tables_from_fliprate_table(
            &report.table,
            &report.top.normal_identifiers(),
            &report.top.ewm_identifiers(),
        );
        let (file_name, file_name_ewm) = heatmap_file_names(&report.params);
        let (title, title_ewm) = heatmap_titles(&report.params);

        Ok(vec![
            Self::artifact(&tables.normal_table, file_name, title)?,
            Self::artifact(&tables.ewm_table, file_name_ewm, title_ewm)?,
        ])
    }

    fn artifact(
        matrix: &HeatmapMatrix,
        file_name: String,
        title: String,
    ) -> anyhow::Result<HeatmapArtifact> {
        let png = render_heatmap_png(matrix).with_context(|| format!("render {file_name}"))?;
        tracing::debug!(
            file = %file_name,
            title = %title,
            tests = matrix.rows.len(),
            windows = matrix.windows.len(),
            "rendered heatmap"
        );
        Ok(HeatmapArtifact {
            file_name,
            title,
            png,
        })
    }
}
