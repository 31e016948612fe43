use std::io::IsTerminal;
use owo_colors::OwoColorize;
use terminal_size::{Width, terminal_size};

use crate::scoring::{Check, TestResult};

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Get terminal width, defaulting to None for pipes (unlimited)
fn get_terminal_width() -> Option<usize> {
    terminal_size().map(|(Width(w), _)| w as usize)
}

/// Truncate a label to fit available width, accounting for Unicode
fn truncate_label(label: &str, max_width: usize) -> String {
    let chars: Vec<char> = label.chars().collect();
    if chars.len() <= max_width {
        label.to_string()
    } else if max_width > 3 {
        format!("{}...", chars[..max_width - 3].iter().collect::<String>())
    } else {
        chars[..max_width].iter().collect()
    }
}

/// Format a score as "85/100"
pub fn format_score(score: u32) -> String {
    format!("{}/{}", score, Check::MAX_SCORE)
}

/// Results ordered for the leaderboard: highest score first, then category and module.
pub fn rank(results: &[TestResult]) -> Vec<&TestResult> {
    let mut ranked: Vec<&TestResult> = results.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_score()
            .cmp(&a.total_score())
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.module.cmp(&b.module))
    });
    ranked
}

/// Format results as a ranked table with columns: Index, Score, Module
/// No headers, same layout as the run summary
/// Index column: 3 chars (fits "99."), right-aligned
/// Score column is right-aligned, 7 chars wide (fits "100/100")
pub fn format_summary_table(results: &[TestResult], use_colors: bool) -> String {
    if results.is_empty() {
        return "No modules graded.".to_string();
    }

    let term_width = get_terminal_width();

    let index_width = 3;
    let score_width = 7;
    let separator = "  ";
    let fixed_width = index_width + 1 + score_width + separator.len();

    rank(results)
        .into_iter()
        .enumerate()
        .map(|(idx, result)| {
            let index_str = format!("{:>2}.", idx + 1);
            let score_padded = format!(
                "{:>width$}",
                format_score(result.total_score()),
                width = score_width
            );

            let key = result.key();
            let label = match term_width {
                Some(width) if width > fixed_width + 10 => {
                    truncate_label(&key, width - fixed_width)
                }
                Some(_) => truncate_label(&key, 20),
                None => key,
            };

            if use_colors {
                let score = result.total_score();
                let score_colored = if score == Check::MAX_SCORE {
                    score_padded.green().bold().to_string()
                } else if score == 0 {
                    score_padded.red().bold().to_string()
                } else {
                    score_padded.bold().to_string()
                };
                format!("{} {}{}{}", index_str.dimmed(), score_colored, separator, label)
            } else {
                format!("{} {}{}{}", index_str, score_padded, separator, label)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Failed checks per module, one line each, for verbose output
/// Modules with a perfect score are listed as "all checks passed"
pub fn format_check_breakdown(results: &[TestResult], use_colors: bool) -> String {
    results
        .iter()
        .map(|result| {
            let failed: Vec<String> = result
                .failed_checks()
                .into_iter()
                .map(|check| format!("{} (-{})", check.label(), check.points()))
                .collect();

            let detail = if failed.is_empty() {
                "all checks passed".to_string()
            } else {
                failed.join(", ")
            };

            if use_colors {
                format!("{}: {}", result.key().cyan(), detail)
            } else {
                format!("{}: {}", result.key(), detail)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format results as tab-separated values for scripting
/// Columns: score, category, module, timestamp (no headers, no colors)
pub fn format_tsv(results: &[TestResult]) -> String {
    rank(results)
        .into_iter()
        .map(|result| {
            format!(
                "{}\t{}\t{}\t{}",
                result.total_score(),
                result.category,
                result.module,
                result.timestamp_iso()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
