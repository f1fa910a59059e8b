//! Trades still waiting on a purchase order.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::Dispatcher;
use crate::error::Result;
use crate::intent::literal_regex;
use crate::model::{QueryAnalysis, ResultEnvelope, SubphaseMatch};

/// Coarse `LIKE` prefilter; [`PO_WORD`] decides.
const PO_PATTERNS: [&str; 4] = ["%po%", "%purchase order%", "%procurement%", "%buy out%"];

/// The keyword as a whole word, with the word before it as the trade.
static PO_WORD: LazyLock<Regex> = LazyLock::new(|| {
    literal_regex(r"(?i)(?:\b([a-z]+)\s+)?\b(?:po|purchase order|procurement|buy out)\b")
});

#[derive(Debug, Serialize)]
struct TradeNeedingPo {
    trade: String,
    subphase: String,
    status: String,
    project_id: String,
    project_name: String,
    phase_name: String,
    due_date: Option<String>,
}

/// Trade named before the keyword, e.g. "Electrical PO" → "Electrical".
fn trade_name(subphase_name: &str) -> Option<String> {
    let caps = PO_WORD.captures(subphase_name)?;
    let trade = caps
        .get(1)
        .map_or_else(|| "Unknown Trade".to_string(), |m| capitalize(m.as_str()));
    Some(trade)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
    })
}

fn to_trade(m: SubphaseMatch) -> Option<TradeNeedingPo> {
    if m.subphase.status.is_completed() {
        return None;
    }
    Some(TradeNeedingPo {
        trade: trade_name(&m.subphase.name)?,
        subphase: m.subphase.name,
        status: m.subphase.status.to_string(),
        project_id: m.project_id,
        project_name: m.project_name,
        phase_name: m.phase_name,
        due_date: m.subphase.end_date,
    })
}

pub(super) fn trades_needing_po(d: &Dispatcher<'_>, analysis: &QueryAnalysis) -> Result<ResultEnvelope> {
    let project = match d.optional_project(&analysis.filters)? {
        Ok(project) => project,
        Err(envelope) => return Ok(envelope),
    };

    let trades: Vec<TradeNeedingPo> = d
        .storage()
        .find_subphases_by_name(&PO_PATTERNS, project.as_ref().map(|p| p.id.as_str()))?
        .into_iter()
        .filter_map(to_trade)
        .collect();

    let message = match &project {
        Some(p) => format!(
            "{} trades still need purchase orders for project '{}'",
            trades.len(),
            p.name
        ),
        None => format!("{} trades still need purchase orders across all projects", trades.len()),
    };
    Ok(ResultEnvelope::from_data(&trades, message))
}
