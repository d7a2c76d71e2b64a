//! Turns a requested view into rows, each row owning the set of polling
//! stations (areas) it sums over and the predicate selecting its voters.

use crate::models::{hierarchy, LocationNode, VoterRecord};
use crate::tally::snapshot::Snapshot;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::iter::Peekable;
use std::str::Chars;

lazy_static! {
    static ref GROUP_PREFIX: Regex = Regex::new(r"(?i)^TỔ\s+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ViewMode {
    Ward,
    Unit,
    Neighborhood,
    Area,
    Group,
    Candidates,
}

/// A requested view. The optional id narrows the view:
/// a unit id for `Unit` and `CandidateRanking`, a neighborhood tag for
/// `Neighborhood` and `Group`, an area id (or a unit id, listing its
/// areas) for `Area`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Ward,
    Unit(Option<String>),
    Neighborhood(Option<String>),
    Area(Option<String>),
    Group(Option<String>),
    CandidateRanking(Option<String>),
}

impl View {
    pub fn new(mode: ViewMode, scope: Option<String>) -> Self {
        match mode {
            ViewMode::Ward => View::Ward,
            ViewMode::Unit => View::Unit(scope),
            ViewMode::Neighborhood => View::Neighborhood(scope),
            ViewMode::Area => View::Area(scope),
            ViewMode::Group => View::Group(scope),
            ViewMode::Candidates => View::CandidateRanking(scope),
        }
    }
}

/// Which voter records belong to a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum VoterSelector {
    All,
    Permanent,
    Temporary,
    Unit(String),
    Neighborhood(String),
    Area(String),
    Group(GroupKey),
}

impl VoterSelector {
    pub fn matches(&self, voter: &VoterRecord) -> bool {
        match self {
            VoterSelector::All => true,
            VoterSelector::Permanent => voter.is_permanent_resident(),
            VoterSelector::Temporary => voter.is_temporary_resident(),
            VoterSelector::Unit(id) => voter.unit_id.as_deref() == Some(id.as_str()),
            VoterSelector::Neighborhood(id) => voter.neighborhood_id.as_deref() == Some(id.as_str()),
            VoterSelector::Area(id) => voter.area_id == *id,
            VoterSelector::Group(key) => GroupKey::of(voter).as_ref() == Some(key),
        }
    }
}

/// Groups are free text, so the same label under two neighborhoods is two groups.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub neighborhood_id: Option<String>,
    pub label: String,
}

impl GroupKey {
    pub fn of(voter: &VoterRecord) -> Option<Self> {
        let label = normalize_group_label(voter.group_name.as_deref()?)?;
        Some(GroupKey {
            neighborhood_id: voter
                .neighborhood_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            label,
        })
    }

    pub fn composite(&self) -> String {
        format!(
            "{}__{}",
            self.neighborhood_id.as_deref().unwrap_or("unknown"),
            self.label
        )
    }
}

/// Trims, collapses inner whitespace and upper-cases a group label.
pub fn normalize_group_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(WHITESPACE.replace_all(trimmed, " ").to_uppercase())
}

/// How a row's voted/total figures are sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountSource {
    /// Locked station figures where available, live check-ins elsewhere.
    Hybrid,
    /// Live check-ins only; used where a station summary cannot be apportioned.
    LiveOnly,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScopeRow {
    pub key: String,
    pub display_id: String,
    pub label: String,
    pub sub_label: String,
    pub detail: Option<String>,
    pub members: Vec<String>,
    pub area_ids: Vec<String>,
    pub selector: VoterSelector,
    pub source: CountSource,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedScope {
    /// Every area touched by the view, in hierarchy order.
    pub area_ids: Vec<String>,
    pub rows: Vec<ScopeRow>,
}

pub fn resolve(view: &View, snapshot: &Snapshot) -> ResolvedScope {
    let rows = match view {
        View::Ward => ward_rows(snapshot),
        View::Unit(scope) => unit_rows(scope.as_deref()),
        View::Neighborhood(scope) => neighborhood_rows(scope.as_deref(), snapshot),
        View::Area(scope) => area_rows(scope.as_deref()),
        View::Group(scope) => group_rows(scope.as_deref(), snapshot),
        View::CandidateRanking(scope) => {
            let area_ids = match scope {
                Some(unit_id) => hierarchy::areas_of_unit(unit_id)
                    .map(|area| area.id.to_string())
                    .collect(),
                None => owned(hierarchy::area_ids()),
            };
            return ResolvedScope {
                area_ids,
                rows: Vec::new(),
            };
        }
    };

    let touched: BTreeSet<&str> = rows
        .iter()
        .flat_map(|row| row.area_ids.iter().map(String::as_str))
        .collect();
    ResolvedScope {
        area_ids: in_hierarchy_order(touched),
        rows,
    }
}

fn owned(ids: Vec<&str>) -> Vec<String> {
    ids.into_iter().map(str::to_string).collect()
}

/// Keeps only known areas and sorts them the way the hierarchy lists them.
fn in_hierarchy_order<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let wanted: BTreeSet<&str> = ids.into_iter().collect();
    hierarchy::areas()
        .filter(|area| wanted.contains(area.id))
        .map(|area| area.id.to_string())
        .collect()
}

fn observed_areas<'a>(voters: impl Iterator<Item = &'a VoterRecord>) -> Vec<String> {
    in_hierarchy_order(voters.map(|voter| voter.area_id.as_str()))
}

fn empty_row(key: &str, selector: VoterSelector) -> ScopeRow {
    ScopeRow {
        key: key.to_string(),
        display_id: key.to_uppercase(),
        label: key.to_uppercase(),
        sub_label: String::new(),
        detail: None,
        members: Vec::new(),
        area_ids: Vec::new(),
        selector,
        source: CountSource::Hybrid,
    }
}

// Residence rows partition voters, not geography. A station summary cannot be
// split by residence, so they count check-ins only and never lock.
fn ward_rows(snapshot: &Snapshot) -> Vec<ScopeRow> {
    let ward_name = hierarchy::ward()
        .map(|ward| ward.name.to_uppercase())
        .unwrap_or_default();
    let unit_count = hierarchy::units().count();
    let area_ids = owned(hierarchy::area_ids());

    let permanent = observed_areas(snapshot.voters().iter().filter(|v| v.is_permanent_resident()));
    let temporary = observed_areas(snapshot.voters().iter().filter(|v| v.is_temporary_resident()));

    vec![
        ScopeRow {
            key: "ward_all".to_string(),
            display_id: "ALL".to_string(),
            label: format!("TOÀN {}", ward_name),
            sub_label: "Tổng hợp chung".to_string(),
            detail: Some(format!("{:02} Đơn vị, {:02} KVBP", unit_count, area_ids.len())),
            members: vec![
                format!("{:02} Đơn vị", unit_count),
                format!("{:02} KVBP", area_ids.len()),
            ],
            area_ids,
            selector: VoterSelector::All,
            source: CountSource::Hybrid,
        },
        ScopeRow {
            key: "ward_perm".to_string(),
            display_id: "KT1/2".to_string(),
            label: "THƯỜNG TRÚ".to_string(),
            sub_label: "Cử tri KT1 / KT2".to_string(),
            detail: Some("Cử tri có hộ khẩu".to_string()),
            members: Vec::new(),
            area_ids: permanent,
            selector: VoterSelector::Permanent,
            source: CountSource::LiveOnly,
        },
        ScopeRow {
            key: "ward_temp".to_string(),
            display_id: "KT3/4".to_string(),
            label: "TẠM TRÚ".to_string(),
            sub_label: "Cử tri KT3 / KT4".to_string(),
            detail: Some("Cử tri tạm trú".to_string()),
            members: Vec::new(),
            area_ids: temporary,
            selector: VoterSelector::Temporary,
            source: CountSource::LiveOnly,
        },
    ]
}

fn unit_row(unit: &LocationNode) -> ScopeRow {
    let children: Vec<&LocationNode> = hierarchy::areas_of_unit(unit.id).collect();
    ScopeRow {
        key: unit.id.to_string(),
        display_id: unit.display_id(),
        label: unit.name.to_uppercase(),
        sub_label: "Ban Bầu Cử Đơn Vị".to_string(),
        detail: Some(format!("Gồm {} Khu vực bỏ phiếu", children.len())),
        members: children.iter().map(|area| area.short_name()).collect(),
        area_ids: children.iter().map(|area| area.id.to_string()).collect(),
        selector: VoterSelector::Unit(unit.id.to_string()),
        source: CountSource::Hybrid,
    }
}

fn unit_rows(scope: Option<&str>) -> Vec<ScopeRow> {
    match scope {
        Some(id) => match hierarchy::find_unit(id) {
            Some(unit) => vec![unit_row(unit)],
            None => vec![empty_row(id, VoterSelector::Unit(id.to_string()))],
        },
        None => hierarchy::units().map(unit_row).collect(),
    }
}

fn neighborhood_rank(id: &str) -> (usize, &str) {
    let position = hierarchy::neighborhoods()
        .iter()
        .position(|n| n.id == id)
        .unwrap_or(usize::MAX);
    (position, id)
}

fn neighborhood_rows(scope: Option<&str>, snapshot: &Snapshot) -> Vec<ScopeRow> {
    let mut tags: BTreeMap<&str, Vec<&VoterRecord>> = BTreeMap::new();
    for voter in snapshot.voters() {
        if let Some(tag) = voter.neighborhood_id.as_deref().filter(|t| !t.is_empty()) {
            tags.entry(tag).or_default().push(voter);
        }
    }

    let mut ordered: Vec<(&str, Vec<&VoterRecord>)> = tags
        .into_iter()
        .filter(|(tag, _)| scope.is_none_or(|wanted| wanted == *tag))
        .collect();
    ordered.sort_by(|a, b| neighborhood_rank(a.0).cmp(&neighborhood_rank(b.0)));

    if ordered.is_empty() {
        if let Some(id) = scope {
            return vec![empty_row(id, VoterSelector::Neighborhood(id.to_string()))];
        }
    }

    ordered
        .into_iter()
        .map(|(tag, voters)| {
            let area_ids = observed_areas(voters.into_iter());
            let members: Vec<String> = area_ids
                .iter()
                .filter_map(|id| hierarchy::find_area(id))
                .map(|area| area.short_name())
                .collect();
            let label = hierarchy::find_neighborhood(tag)
                .map(|n| n.name.to_uppercase())
                .unwrap_or_else(|| tag.to_uppercase());
            ScopeRow {
                key: tag.to_string(),
                display_id: tag.trim_start_matches("kp_").to_uppercase(),
                label,
                sub_label: "Ban Điều Hành Khu Phố".to_string(),
                detail: Some(format!("{} Khu vực bỏ phiếu", area_ids.len())),
                members,
                area_ids,
                selector: VoterSelector::Neighborhood(tag.to_string()),
                source: CountSource::Hybrid,
            }
        })
        .collect()
}

fn area_row(area: &LocationNode) -> ScopeRow {
    let unit_name = area
        .parent_id
        .and_then(hierarchy::find_unit)
        .map(|unit| unit.short_name())
        .unwrap_or_default();
    ScopeRow {
        key: area.id.to_string(),
        display_id: area.display_id(),
        label: area.name.to_uppercase(),
        sub_label: unit_name,
        detail: area.location_detail.map(str::to_string),
        members: area
            .neighborhood_ids
            .iter()
            .map(|id| {
                hierarchy::find_neighborhood(id)
                    .map(|n| n.name.clone())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect(),
        area_ids: vec![area.id.to_string()],
        selector: VoterSelector::Area(area.id.to_string()),
        source: CountSource::Hybrid,
    }
}

fn area_rows(scope: Option<&str>) -> Vec<ScopeRow> {
    match scope {
        None => hierarchy::areas().map(area_row).collect(),
        Some(id) => {
            if let Some(area) = hierarchy::find_area(id) {
                vec![area_row(area)]
            } else if hierarchy::find_unit(id).is_some() {
                hierarchy::areas_of_unit(id).map(area_row).collect()
            } else {
                vec![empty_row(id, VoterSelector::Area(id.to_string()))]
            }
        }
    }
}

fn group_rows(scope: Option<&str>, snapshot: &Snapshot) -> Vec<ScopeRow> {
    let mut groups: BTreeMap<GroupKey, Vec<&VoterRecord>> = BTreeMap::new();
    for voter in snapshot.voters() {
        if let Some(key) = GroupKey::of(voter) {
            groups.entry(key).or_default().push(voter);
        }
    }

    let mut rows: Vec<ScopeRow> = groups
        .into_iter()
        .filter(|(key, _)| scope.is_none_or(|wanted| key.neighborhood_id.as_deref() == Some(wanted)))
        .map(|(key, voters)| {
            let neighborhood = key
                .neighborhood_id
                .as_deref()
                .and_then(hierarchy::find_neighborhood)
                .map(|n| n.name.to_uppercase())
                .unwrap_or_else(|| "KP KHÁC".to_string());
            let unit = voters
                .iter()
                .find_map(|voter| voter.unit_id.as_deref())
                .and_then(hierarchy::find_unit)
                .map(|unit| unit.short_name());
            let area_ids = observed_areas(voters.iter().copied());
            let mut members: Vec<String> = area_ids.iter().map(|id| id.to_uppercase()).collect();
            members.sort();

            ScopeRow {
                key: key.composite(),
                display_id: GROUP_PREFIX.replace(&key.label, "").into_owned(),
                label: GROUP_PREFIX.replace(&key.label, "TỔ ").into_owned(),
                sub_label: neighborhood,
                detail: unit,
                members,
                area_ids,
                selector: VoterSelector::Group(key),
                source: CountSource::LiveOnly,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.sub_label
            .cmp(&b.sub_label)
            .then_with(|| natural_cmp(&a.label, &b.label))
    });
    rows
}

/// Compares strings treating runs of digits as numbers, so "TỔ 2" < "TỔ 10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let l = take_number(&mut left);
                let r = take_number(&mut right);
                let l_trim = l.trim_start_matches('0');
                let r_trim = r.trim_start_matches('0');
                let ord = l_trim
                    .len()
                    .cmp(&r_trim.len())
                    .then_with(|| l_trim.cmp(r_trim))
                    .then_with(|| l.len().cmp(&r.len()));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
        digits.push(c);
        chars.next();
    }
    digits
}
