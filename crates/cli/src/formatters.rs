//! Text formatting shared by the run and plan output

use console::style;

/// Step identifiers stand out in plan tables: bold, and cyan when colors are on
pub(crate) fn format_step_id(id: &str, use_colors: bool) -> String {
    let styled = style(id).bold();

    if use_colors {
        styled.cyan().to_string()
    } else {
        styled.to_string()
    }
}

/// A version that may not be known until the version source is queried
pub(crate) fn format_version(version: Option<&str>) -> &str {
    version.unwrap_or("(version from version control)")
}
