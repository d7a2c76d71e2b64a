use crate::models::VotingStatus;
use crate::tally::drilldown::DrillDown;
use crate::tally::progress::{AggregatedRow, ProgressStatus};
use crate::tally::ranking::UnitRanking;
use crate::tally::report::{ReportDetail, StationStatus, WardSummary};
use crate::tally::ViewOutput;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

const LABEL_WIDTH: usize = 32;

pub fn json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

// Labels are Vietnamese; cut on chars, never on bytes.
fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let cut: String = text.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn pad(text: &str, width: usize) -> String {
    let text = truncate(text, width);
    let fill = width.saturating_sub(text.chars().count());
    format!("{}{}", text, " ".repeat(fill))
}

fn status_label(status: ProgressStatus) -> &'static str {
    match status {
        ProgressStatus::Good => "Tốt",
        ProgressStatus::Average => "Khá",
        ProgressStatus::Slow => "Chậm",
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M:%S %d/%m/%Y").to_string()
}

fn row_line(out: &mut String, row: &AggregatedRow) {
    let stat = &row.stat;
    let lock = if stat.is_locked {
        "ĐÃ CHỐT".to_string()
    } else if stat.locked_areas > 0 {
        format!("chốt {}/{}", stat.locked_areas, stat.area_count)
    } else {
        String::new()
    };
    let _ = writeln!(
        out,
        "{:>6}  {}  {:>7}/{:<7} {:>6.1}%  còn {:<7} {:<5} {}",
        row.display_id,
        pad(&row.label, LABEL_WIDTH),
        stat.voted,
        stat.total,
        stat.percent,
        stat.not_voted(),
        status_label(stat.status),
        lock
    );
    if !row.sub_label.is_empty() || !row.members.is_empty() {
        let _ = writeln!(
            out,
            "{:>6}  {}  {}",
            "",
            pad(&row.sub_label, LABEL_WIDTH),
            truncate(&row.members.join(", "), 60)
        );
    }
}

fn rankings_text(out: &mut String, units: &[UnitRanking]) {
    if units.is_empty() {
        out.push_str("Chưa có ứng cử viên.\n");
    }
    for unit in units {
        let _ = writeln!(
            out,
            "**{}** ({} phiếu)",
            unit.unit_name.as_deref().unwrap_or(&unit.unit_id),
            unit.total_votes
        );
        for candidate in &unit.candidates {
            let _ = writeln!(
                out,
                "{:>3}. {}  {:>8} phiếu  {:>6.2}%  {}",
                candidate.rank,
                pad(&candidate.name, LABEL_WIDTH),
                candidate.total_votes,
                candidate.percentage,
                candidate.level.label()
            );
        }
        if let Some(leader) = unit.leader().filter(|c| c.total_votes > 0) {
            let _ = writeln!(out, "Dẫn đầu: {}", leader.name);
        }
        out.push('\n');
    }
}

pub fn view_text(output: &ViewOutput, fetched_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    match output {
        ViewOutput::Rows(rows) => {
            if rows.is_empty() {
                out.push_str("Không có dữ liệu.\n");
            }
            for row in rows {
                row_line(&mut out, row);
            }
        }
        ViewOutput::Candidates(units) => rankings_text(&mut out, units),
    }
    let _ = writeln!(out, "Cập nhật lúc {}", timestamp(fetched_at));
    out
}

pub fn detail_text(detail: &ReportDetail) -> String {
    let mut out = String::new();
    let stats = &detail.stats;
    let _ = writeln!(
        out,
        "**{}**{}",
        detail.title,
        if detail.is_locked { " (đã chốt số liệu)" } else { "" }
    );
    let _ = writeln!(
        out,
        "Khu vực đã chốt: {}/{}",
        detail.locked_areas,
        detail.area_ids.len()
    );
    let _ = writeln!(out, "Tổng số cử tri:      {}", stats.total_voters);
    let _ = writeln!(out, "Số phiếu phát ra:    {}", stats.issued_ballots);
    let _ = writeln!(out, "Số phiếu thu vào:    {}", stats.received_ballots);
    let _ = writeln!(out, "Số phiếu hợp lệ:     {}", stats.valid_ballots);
    let _ = writeln!(out, "Số phiếu không hợp lệ: {}", stats.invalid_ballots);
    out.push('\n');
    if detail.candidates.is_empty() {
        out.push_str("Chưa có ứng cử viên.\n");
    }
    for (i, candidate) in detail.candidates.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>3}. {}  {:>8} phiếu  {:>6.2}%",
            i + 1,
            pad(&candidate.name, LABEL_WIDTH),
            candidate.votes,
            candidate.percentage
        );
    }
    out
}

pub fn summary_text(summary: &WardSummary, stations: &BTreeMap<&str, StationStatus>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tổng cử tri:   {}", summary.total);
    let _ = writeln!(out, "Đã bầu:        {}", summary.voted);
    let _ = writeln!(out, "Chưa bầu:      {}", summary.not_voted);
    let _ = writeln!(
        out,
        "KVBP đạt ≥90%: {}/{}",
        summary.completed_areas, summary.total_areas
    );
    let _ = writeln!(
        out,
        "KVBP đã chốt:  {}/{}",
        summary.locked_areas, summary.total_areas
    );
    out.push('\n');
    for (area_id, status) in stations {
        let mark = match status {
            StationStatus::Done => "done",
            StationStatus::Voting => "voting",
            StationStatus::Empty => "empty",
        };
        let _ = writeln!(out, "{:<6} {}", area_id.to_uppercase(), mark);
    }
    out
}

pub fn drilldown_text(title: &str, drill: &DrillDown) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "**{}**  đã bầu {}/{} ({:.1}%), chưa bầu {}",
        title, drill.voted, drill.total, drill.percent, drill.not_voted
    );
    if drill.voters.is_empty() {
        out.push_str("Không có cử tri phù hợp.\n");
    }
    for voter in &drill.voters {
        let status = match voter.voting_status {
            VotingStatus::Voted => "Đã bầu",
            VotingStatus::NotVoted => "Chưa bầu",
            VotingStatus::Declined => "Không bầu",
        };
        let _ = writeln!(
            out,
            "{}  {:<12} {:<6} {}",
            pad(&voter.name, LABEL_WIDTH),
            voter.voter_card_number.as_deref().unwrap_or("-"),
            voter.area_id.to_uppercase(),
            status
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::compute;
    use crate::tally::scope::View;
    use crate::tally::snapshot::fixtures::*;
    use crate::tally::snapshot::Snapshot;

    #[test]
    fn truncation_respects_multibyte_labels() {
        let label = "KHU VỰC BỎ PHIẾU SỐ 01 (TRẠM Y TẾ PHƯỜNG)";
        let cut = truncate(label, 10);
        assert_eq!(cut.chars().count(), 10);
        assert!(cut.ends_with("..."));
        assert_eq!(pad("ĐV 3", 6).chars().count(), 6);
    }

    #[test]
    fn text_view_lists_each_row() {
        let snapshot = Snapshot::new(voters("kv01", 10, 6), vec![locked("kv02", 200, 190)], vec![], vec![]);
        let output = compute(&View::Area(Some("unit_1".into())), &snapshot);
        let text = view_text(&output, snapshot.fetched_at());
        assert!(text.contains("KHU VỰC BỎ PHIẾU SỐ 01"));
        assert!(text.contains("60.0%"));
        assert!(text.contains("ĐÃ CHỐT"));
        assert!(text.contains("Cập nhật lúc"));
    }

    #[test]
    fn json_view_is_tagged() {
        let snapshot = Snapshot::new(voters("kv01", 2, 1), vec![], vec![], vec![]);
        let output = compute(&View::Unit(Some("unit_1".into())), &snapshot);
        let value: serde_json::Value = serde_json::from_str(&json(&output).unwrap()).unwrap();
        assert_eq!(value["kind"], "rows");
        assert_eq!(value["rows"][0]["key"], "unit_1");
        assert_eq!(value["rows"][0]["percent"], 50.0);
        assert_eq!(value["rows"][0]["status"], "slow");
    }
}
