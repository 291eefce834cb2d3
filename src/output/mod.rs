pub mod formatter;

pub use formatter::{
    format_breakdown, format_errors, format_json, format_result, format_score, format_tsv,
    format_warnings, should_use_colors,
};
