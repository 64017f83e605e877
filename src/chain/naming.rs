//! Output naming rules
//!
//! The estimated name must match the backend's own naming exactly, otherwise
//! skip-if-exists checks look for the wrong file.

use crate::types::{CheckpointFormat, MergeMethod};
use regex::Regex;
use std::sync::LazyLock;

/// Marker prepended to outputs of recipes that were skipped
pub const SKIPPED_PREFIX: &str = "[skipped] ";

static UNSAFE_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[\\|:?"<>*]"#).expect("name pattern is valid")
});

/// Variable token a recipe at `position` exports its output under
pub fn output_var(position: u32) -> String {
    format!("__O{position}__")
}

/// Replace characters that are not allowed in file names with `-`
pub fn sanitize_output_name(name: &str) -> String {
    UNSAFE_NAME_CHARS.replace_all(name, "-").into_owned()
}

/// Derive the file name the backend uses when no output name is given
///
/// `<A>_<1-ratio>-<B>_<ratio>-<method>-merged.<format>` with ratios rounded
/// to two decimals.
pub fn estimate_checkpoint_name(
    primary_model_name: &str,
    secondary_model_name: &str,
    ratio: f64,
    method: MergeMethod,
    format: CheckpointFormat,
) -> String {
    format!(
        "{primary_model_name}_{}-{secondary_model_name}_{}-{}-merged.{}",
        format_ratio(1.0 - ratio),
        format_ratio(ratio),
        method.as_str().replace(' ', "_"),
        format.extension()
    )
}

/// Round to two decimals and print the shortest form, keeping a trailing
/// `.0` on whole numbers (`0.65`, `0.5`, `1.0`).
fn format_ratio(value: f64) -> String {
    let rounded: f64 = format!("{value:.2}").parse().unwrap_or(value);
    if rounded.is_finite() && rounded.fract() == 0.0 {
        format!("{rounded:.1}")
    } else {
        rounded.to_string()
    }
}
