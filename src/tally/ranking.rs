use crate::models::{hierarchy, Candidate, CandidateLevel, CandidateVoteTally};
use crate::tally::progress::percent_of;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub id: String,
    pub name: String,
    pub unit_id: String,
    pub level: CandidateLevel,
    pub total_votes: u64,
    pub rank: usize,
    /// Share of the votes cast for candidates of the same unit.
    pub percentage: f64,
}

// Ranked results for one electoral unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitRanking {
    pub unit_id: String,
    pub unit_name: Option<String>,
    pub total_votes: u64,
    pub candidates: Vec<CandidateResult>,
}

impl UnitRanking {
    pub fn leader(&self) -> Option<&CandidateResult> {
        self.candidates.first()
    }
}

/// Sums each candidate's tallies across areas.
pub fn votes_by_candidate(tallies: &[CandidateVoteTally]) -> HashMap<&str, u64> {
    let mut votes: HashMap<&str, u64> = HashMap::new();
    for tally in tallies {
        *votes.entry(tally.candidate_id.as_str()).or_insert(0) += tally.votes;
    }
    votes
}

/// Sums each candidate's tallies over the areas of its own unit. Units
/// outside the ward hierarchy (city, national) take every area.
fn votes_in_own_unit<'a>(
    candidates: &'a [Candidate],
    tallies: &'a [CandidateVoteTally],
) -> HashMap<&'a str, u64> {
    let units: HashMap<&str, &str> = candidates
        .iter()
        .map(|c| (c.id.as_str(), c.unit_id.as_str()))
        .collect();

    let mut votes: HashMap<&str, u64> = HashMap::new();
    for tally in tallies {
        let counts = match units.get(tally.candidate_id.as_str()) {
            Some(&unit_id) if hierarchy::find_unit(unit_id).is_some() => {
                hierarchy::find_area(&tally.area_id).and_then(|area| area.parent_id) == Some(unit_id)
            }
            _ => true,
        };
        if counts {
            *votes.entry(tally.candidate_id.as_str()).or_insert(0) += tally.votes;
        }
    }
    votes
}

/// Ranks candidates within their own unit. Units appear in the order their
/// first candidate does; ties keep the input order of `candidates`.
pub fn rank_candidates(
    candidates: &[Candidate],
    tallies: &[CandidateVoteTally],
    unit_filter: Option<&str>,
) -> Vec<UnitRanking> {
    let votes = votes_in_own_unit(candidates, tallies);

    let mut unit_order: Vec<&str> = Vec::new();
    let mut by_unit: HashMap<&str, Vec<&Candidate>> = HashMap::new();
    for candidate in candidates {
        let unit_id = candidate.unit_id.as_str();
        if unit_filter.is_some_and(|wanted| wanted != unit_id) {
            continue;
        }
        by_unit
            .entry(unit_id)
            .or_insert_with(|| {
                unit_order.push(unit_id);
                Vec::new()
            })
            .push(candidate);
    }

    unit_order
        .into_iter()
        .map(|unit_id| {
            let members = by_unit.remove(unit_id).unwrap_or_default();
            let unit_total: u64 = members
                .iter()
                .map(|c| votes.get(c.id.as_str()).copied().unwrap_or(0))
                .sum();

            let mut results: Vec<CandidateResult> = members
                .into_iter()
                .map(|c| {
                    let total_votes = votes.get(c.id.as_str()).copied().unwrap_or(0);
                    CandidateResult {
                        id: c.id.clone(),
                        name: c.name.clone(),
                        unit_id: c.unit_id.clone(),
                        level: c.level,
                        total_votes,
                        rank: 0,
                        percentage: percent_of(total_votes, unit_total, 2),
                    }
                })
                .collect();

            // sort_by is stable, so equal totals keep fetch order
            results.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
            for (i, result) in results.iter_mut().enumerate() {
                result.rank = i + 1;
            }

            UnitRanking {
                unit_id: unit_id.to_string(),
                unit_name: hierarchy::find_unit(unit_id).map(|unit| unit.name.to_string()),
                total_votes: unit_total,
                candidates: results,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tally::snapshot::fixtures::*;

    #[test]
    fn ranks_within_a_unit() {
        let candidates = vec![
            candidate("A", "unit_1"),
            candidate("B", "unit_1"),
            candidate("C", "unit_1"),
        ];
        let tallies = vec![
            tally("A", "kv01", 70),
            tally("A", "kv02", 50),
            tally("B", "kv01", 300),
            tally("C", "kv03", 80),
        ];
        let rankings = rank_candidates(&candidates, &tallies, None);
        assert_eq!(rankings.len(), 1);
        let unit = &rankings[0];
        assert_eq!(unit.total_votes, 500);
        assert_eq!(unit.unit_name.as_deref(), Some("Đơn vị số 1"));

        let order: Vec<(&str, usize, f64)> = unit
            .candidates
            .iter()
            .map(|c| (c.id.as_str(), c.rank, c.percentage))
            .collect();
        assert_eq!(order, vec![("B", 1, 60.0), ("A", 2, 24.0), ("C", 3, 16.0)]);
    }

    #[test]
    fn shares_are_per_unit_not_ward() {
        let candidates = vec![candidate("A", "unit_1"), candidate("X", "unit_2")];
        let tallies = vec![tally("A", "kv01", 10), tally("X", "kv04", 990)];
        let rankings = rank_candidates(&candidates, &tallies, None);
        assert_eq!(rankings[0].candidates[0].percentage, 100.0);
        assert_eq!(rankings[1].candidates[0].percentage, 100.0);
    }

    #[test]
    fn unit_without_votes_has_zero_percentages() {
        let candidates = vec![candidate("A", "unit_3"), candidate("B", "unit_3")];
        let rankings = rank_candidates(&candidates, &[], None);
        assert_eq!(rankings[0].total_votes, 0);
        assert!(rankings[0].candidates.iter().all(|c| c.percentage == 0.0));
        assert_eq!(rankings[0].candidates[0].id, "A");
        assert_eq!(rankings[0].candidates[1].rank, 2);
    }

    #[test]
    fn ties_keep_input_order() {
        let candidates = vec![candidate("late", "unit_4"), candidate("early", "unit_4")];
        let tallies = vec![tally("early", "kv11", 40), tally("late", "kv12", 40)];
        let rankings = rank_candidates(&candidates, &tallies, None);
        let ids: Vec<&str> = rankings[0].candidates.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }

    #[test]
    fn tallies_outside_the_candidates_unit_are_ignored() {
        let candidates = vec![candidate("A", "unit_1"), candidate("B", "unit_1")];
        let tallies = vec![
            tally("A", "kv01", 100),
            tally("B", "kv02", 100),
            tally("A", "kv04", 50),
        ];
        let rankings = rank_candidates(&candidates, &tallies, None);
        assert_eq!(rankings[0].total_votes, 200);
        let order: Vec<(&str, u64, f64)> = rankings[0]
            .candidates
            .iter()
            .map(|c| (c.id.as_str(), c.total_votes, c.percentage))
            .collect();
        assert_eq!(order, vec![("A", 100, 50.0), ("B", 100, 50.0)]);
    }

    #[test]
    fn city_candidates_sum_every_area() {
        let candidates = vec![candidate("T", "tp_hcm")];
        let tallies = vec![tally("T", "kv01", 10), tally("T", "kv32", 15)];
        let rankings = rank_candidates(&candidates, &tallies, None);
        assert_eq!(rankings[0].total_votes, 25);
        assert_eq!(rankings[0].unit_name, None);
    }

    #[test]
    fn filter_keeps_one_unit() {
        let candidates = vec![candidate("A", "unit_1"), candidate("X", "unit_2")];
        let rankings = rank_candidates(&candidates, &[], Some("unit_2"));
        assert_eq!(rankings.len(), 1);
        assert_eq!(rankings[0].unit_id, "unit_2");
        assert_eq!(rankings[0].leader().map(|c| c.id.as_str()), Some("X"));
    }
}
