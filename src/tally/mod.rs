pub mod drilldown;
pub mod progress;
pub mod ranking;
pub mod report;
pub mod scope;
pub mod snapshot;

use progress::{aggregate_row, AggregatedRow};
use ranking::{rank_candidates, UnitRanking};
use scope::{resolve, View};
use serde::Serialize;
use snapshot::Snapshot;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum ViewOutput {
    Rows(Vec<AggregatedRow>),
    Candidates(Vec<UnitRanking>),
}

/// Computes a whole view from scratch. Pure; call it again on every new snapshot.
pub fn compute(view: &View, snapshot: &Snapshot) -> ViewOutput {
    match view {
        View::CandidateRanking(unit) => ViewOutput::Candidates(rank_candidates(
            snapshot.candidates(),
            snapshot.tallies(),
            unit.as_deref(),
        )),
        _ => ViewOutput::Rows(
            resolve(view, snapshot)
                .rows
                .iter()
                .map(|row| aggregate_row(row, snapshot))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::snapshot::fixtures::*;

    #[test]
    fn candidate_view_ranks_per_unit() {
        let snapshot = Snapshot::new(
            vec![],
            vec![],
            vec![tally("A", "kv01", 10), tally("B", "kv02", 30), tally("X", "kv04", 5)],
            vec![candidate("A", "unit_1"), candidate("B", "unit_1"), candidate("X", "unit_2")],
        );
        match compute(&View::CandidateRanking(None), &snapshot) {
            ViewOutput::Candidates(units) => {
                assert_eq!(units.len(), 2);
                assert_eq!(units[0].candidates[0].id, "B");
                assert_eq!(units[0].candidates[0].percentage, 75.0);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn narrowing_to_a_unit_does_not_change_its_ranking() {
        let snapshot = Snapshot::new(
            vec![],
            vec![],
            vec![tally("A", "kv01", 100), tally("B", "kv02", 100), tally("A", "kv04", 50)],
            vec![candidate("A", "unit_1"), candidate("B", "unit_1")],
        );
        let unit_1 = |view: View| match compute(&view, &snapshot) {
            ViewOutput::Candidates(units) => units
                .into_iter()
                .find(|unit| unit.unit_id == "unit_1")
                .expect("unit_1 ranking"),
            other => panic!("unexpected output {:?}", other),
        };

        let whole = unit_1(View::CandidateRanking(None));
        let narrowed = unit_1(View::CandidateRanking(Some("unit_1".into())));
        assert_eq!(whole, narrowed);
        let shares: Vec<(&str, u64, f64)> = whole
            .candidates
            .iter()
            .map(|c| (c.id.as_str(), c.total_votes, c.percentage))
            .collect();
        assert_eq!(shares, vec![("A", 100, 50.0), ("B", 100, 50.0)]);
    }

    #[test]
    fn residence_rows_stay_live_when_their_stations_lock() {
        let mut all = voters("kv01", 4, 1);
        all.extend(voters("kv02", 2, 2));
        let snapshot = Snapshot::new(
            all,
            vec![locked("kv01", 300, 250), locked("kv02", 200, 180)],
            vec![],
            vec![],
        );
        match compute(&View::Ward, &snapshot) {
            ViewOutput::Rows(rows) => {
                assert_eq!(rows[0].stat.total, 500);
                assert_eq!(rows[0].stat.locked_areas, 2);
                let permanent = &rows[1];
                assert_eq!(permanent.key, "ward_perm");
                assert_eq!((permanent.stat.total, permanent.stat.voted), (6, 3));
                assert!(!permanent.stat.is_locked);
                assert_eq!(permanent.stat.locked_areas, 0);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn row_views_aggregate_every_row() {
        let snapshot = Snapshot::new(voters("kv01", 4, 4), vec![], vec![], vec![]);
        match compute(&View::Ward, &snapshot) {
            ViewOutput::Rows(rows) => {
                assert_eq!(rows.len(), 3);
                assert_eq!(rows[0].stat.total, 4);
                assert_eq!(rows[0].stat.percent, 100.0);
                assert_eq!(rows[2].stat.total, 0);
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
