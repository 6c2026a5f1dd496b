//! thinkScript rendering of ranked open-interest levels.
//!
//! Every declared plot is bound to its strike only when the chart's symbol
//! matches the symbol it was computed for, so one study can carry levels for
//! many tickers. Output is a pure function of the input results.

use super::config;
use super::error::AnalysisError;
use super::models::{ExpirationEntry, StrikeRecord, SymbolResult};
use std::collections::HashSet;
use std::fmt::Write;

pub const SCRIPT_HEADER: &str = "
# OI Levels
# Top open interest strikes per expiration

def aggregationPeriod = AggregationPeriod.DAY;
def LastPrice = close(priceType = PriceType.LAST);
";

pub const PLACEHOLDER_ID: &str = "oi_levels_none";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Call,
    Put,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Call => "call",
            Direction::Put => "put",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Direction::Call => config::CALL_COLOR,
            Direction::Put => config::PUT_COLOR,
        }
    }
}

/// Plot identifier for a strike; ranks are 1-based
pub fn identifier(direction: Direction, stem: &str, expiration_rank: usize, strike_rank: usize) -> String {
    format!("oi_{}_{}_{}_{}", direction.as_str(), stem, expiration_rank, strike_rank)
}

/// Line weight for a 1-based strike rank: 5 for the best strike, one less per rank, never below 1
pub fn line_weight(strike_rank: usize) -> usize {
    6usize
        .saturating_sub(strike_rank)
        .clamp(config::MIN_LINE_WEIGHT, config::MAX_LINE_WEIGHT)
}

/// Symbol reduced to identifier-safe characters
pub fn sanitize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One identifier stem per result. A stem already taken by an earlier symbol
/// gets `_2`, `_3`, ... so repeated or colliding tickers stay distinct.
pub fn assign_stems(results: &[SymbolResult]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut stems = Vec::with_capacity(results.len());

    for result in results {
        let base = sanitize_symbol(&result.symbol);
        let mut stem = base.clone();
        let mut n = 2;
        while used.contains(&stem) {
            stem = format!("{}_{}", base, n);
            n += 1;
        }
        used.insert(stem.clone());
        stems.push(stem);
    }

    stems
}

fn string_literal(symbol: &str) -> String {
    let escaped = symbol.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

fn comment_text(text: &str) -> String {
    text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect()
}

/// Render results into script text without checking it
pub fn emit_script(results: &[SymbolResult]) -> String {
    let mut out = String::from(SCRIPT_HEADER);

    if results.iter().all(SymbolResult::is_empty) {
        out.push_str("\n# No expirations with open interest were available for the requested symbols.");
        let _ = write!(out, "\nplot {} = {};\n", PLACEHOLDER_ID, config::NAN_SENTINEL);
        return out;
    }

    let stems = assign_stems(results);
    for (result, stem) in results.iter().zip(stems.iter()) {
        for (i, entry) in result.entries.iter().enumerate() {
            emit_entry(&mut out, &result.symbol, stem, i + 1, entry);
        }
    }
    out.push('\n');

    out
}

fn emit_entry(out: &mut String, symbol: &str, stem: &str, expiration_rank: usize, entry: &ExpirationEntry) {
    let plots: Vec<(Direction, usize, &StrikeRecord)> = entry
        .call_strikes
        .iter()
        .enumerate()
        .map(|(j, r)| (Direction::Call, j + 1, r))
        .chain(
            entry
                .put_strikes
                .iter()
                .enumerate()
                .map(|(j, r)| (Direction::Put, j + 1, r)),
        )
        .collect();
    let ids: Vec<String> = plots
        .iter()
        .map(|(dir, rank, _)| identifier(*dir, stem, expiration_rank, *rank))
        .collect();

    let _ = write!(out, "\n# Expiration Date: {} - {}", entry.expiration, comment_text(symbol));

    for id in &ids {
        let _ = write!(out, "\nplot {};", id);
    }

    let _ = write!(out, "\nif ({} == {}) {{", config::CONTEXT_SYMBOL, string_literal(symbol));
    for (id, (_, _, record)) in ids.iter().zip(plots.iter()) {
        let _ = write!(out, "\n    {} = {:.2};", id, record.strike);
    }
    out.push_str("\n} else {");
    for id in &ids {
        let _ = write!(out, "\n    {} = {};", id, config::NAN_SENTINEL);
    }
    out.push_str("\n};");

    for (id, (dir, _, _)) in ids.iter().zip(plots.iter()) {
        let _ = write!(out, "\n{}.SetDefaultColor({});", id, dir.color());
    }
    for (id, (_, rank, _)) in ids.iter().zip(plots.iter()) {
        let _ = write!(out, "\n{}.SetLineWeight({});", id, line_weight(*rank));
    }
}

/// Render and check the grammar invariants
pub fn emit(results: &[SymbolResult]) -> Result<String, AnalysisError> {
    let script = emit_script(results);
    validate_script(&script)?;
    Ok(script)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn violation(line_no: usize, msg: impl Into<String>) -> AnalysisError {
    AnalysisError::EmissionInvariantViolation(format!("line {}: {}", line_no, msg.into()))
}

/// Check balanced conditional blocks, unique declarations and that every
/// assigned or styled identifier was declared first.
pub fn validate_script(script: &str) -> Result<(), AnalysisError> {
    let mut declared: HashSet<&str> = HashSet::new();
    let mut depth = 0usize;

    for (idx, raw_line) in script.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with("def ") {
            continue;
        }

        if line.starts_with("if (") && line.ends_with(") {") {
            depth += 1;
            continue;
        }
        if line == "} else {" {
            if depth == 0 {
                return Err(violation(line_no, "'else' without matching 'if'"));
            }
            continue;
        }
        if line == "};" {
            if depth == 0 {
                return Err(violation(line_no, "unbalanced closing brace"));
            }
            depth -= 1;
            continue;
        }

        let Some(statement) = line.strip_suffix(';') else {
            return Err(violation(line_no, format!("unterminated statement '{}'", line)));
        };

        if let Some(decl) = statement.strip_prefix("plot ") {
            let id = decl.split_once(" = ").map_or(decl, |(lhs, _)| lhs).trim();
            if !is_identifier(id) {
                return Err(violation(line_no, format!("invalid identifier '{}'", id)));
            }
            if !declared.insert(id) {
                return Err(violation(line_no, format!("duplicate declaration of '{}'", id)));
            }
            continue;
        }

        let target = if let Some((lhs, _)) = statement.split_once(" = ") {
            lhs.trim()
        } else if let Some((lhs, _)) = statement.split_once('.') {
            lhs.trim()
        } else {
            return Err(violation(line_no, format!("unrecognized statement '{}'", line)));
        };

        if !declared.contains(target) {
            return Err(violation(line_no, format!("'{}' used before declaration", target)));
        }
    }

    if depth != 0 {
        return Err(AnalysisError::EmissionInvariantViolation(format!(
            "{} conditional block(s) left open",
            depth
        )));
    }

    Ok(())
}
