pub mod csv;
pub mod formatter;

pub use csv::{format_csv, parse_csv, read_csv, write_csv, CSV_HEADER};
pub use formatter::{
    format_check_breakdown, format_score, format_summary_table, format_tsv, rank,
    should_use_colors,
};
