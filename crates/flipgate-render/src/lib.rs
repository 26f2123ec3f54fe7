//! Rendering for flipgate.
//!
//! Pure functions from domain values to text or image bytes. Writing the
//! bytes somewhere is the caller's problem.

mod console;
mod heatmap;
mod markdown;

pub use console::{EWM_HEADLINE, NORMAL_HEADLINE, render_console};
pub use heatmap::{CELL_SIZE, heat_colour, render_heatmap_png};
pub use markdown::{render_markdown, render_markdown_template};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to encode heatmap PNG")]
    Encode(#[from] image::ImageError),

    #[error("failed to render markdown template")]
    Template(#[from] handlebars::RenderError),
}
