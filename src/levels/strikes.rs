use super::models::StrikeRecord;
use std::cmp::Ordering;

/// Open interest descending, then strike ascending
pub fn compare_by_open_interest(a: &StrikeRecord, b: &StrikeRecord) -> Ordering {
    b.open_interest
        .cmp(&a.open_interest)
        .then_with(|| a.strike.total_cmp(&b.strike))
}

/// Top `limit` strikes by open interest, ignoring strikes with no open interest
pub fn rank_strikes(records: &[StrikeRecord], limit: usize) -> Vec<StrikeRecord> {
    let mut ranked: Vec<StrikeRecord> = records
        .iter()
        .filter(|r| r.open_interest > 0)
        .copied()
        .collect();

    ranked.sort_by(compare_by_open_interest);
    ranked.truncate(limit);
    ranked
}
