//! The ward's electoral geography, compiled in.
//!
//! Identifiers here must match the backend's `area_id` / `unit_id` columns
//! byte for byte, otherwise joins against fetched rows silently miss.

use lazy_static::lazy_static;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationKind {
    Ward,
    Unit,
    Area,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocationNode {
    pub id: &'static str,
    pub name: &'static str,
    pub kind: LocationKind,
    /// Ward for units, unit for areas.
    pub parent_id: Option<&'static str>,
    /// Residential zones served by a polling station. The first entry is the primary one.
    pub neighborhood_ids: &'static [&'static str],
    pub location_detail: Option<&'static str>,
}

impl LocationNode {
    pub fn primary_neighborhood(&self) -> Option<&'static str> {
        self.neighborhood_ids.first().copied()
    }

    /// "kv07" -> "07", "unit_3" -> "03".
    pub fn display_id(&self) -> String {
        match self.kind {
            LocationKind::Area => self.id.trim_start_matches("kv").to_string(),
            LocationKind::Unit => format!("0{}", self.id.trim_start_matches("unit_")),
            LocationKind::Ward => self.id.to_uppercase(),
        }
    }

    /// "Khu vực bỏ phiếu số 07" -> "KV 07", "Đơn vị số 3" -> "ĐV 3".
    pub fn short_name(&self) -> String {
        match self.kind {
            LocationKind::Area => format!("KV {}", self.display_id()),
            LocationKind::Unit => self.name.replace("Đơn vị số", "ĐV"),
            LocationKind::Ward => self.name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Neighborhood {
    pub id: String,
    pub name: String,
}

const NEIGHBORHOOD_COUNT: usize = 36;

lazy_static! {
    static ref NEIGHBORHOODS: Vec<Neighborhood> = (1..=NEIGHBORHOOD_COUNT)
        .map(|i| Neighborhood {
            id: format!("kp_{}", i),
            name: format!("Khu phố {}", i),
        })
        .collect();
}

pub static WARD_LOCATIONS: &[LocationNode] = &[
    LocationNode { id: "bc", name: "Phường Bàn Cờ", kind: LocationKind::Ward, parent_id: None, neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "unit_1", name: "Đơn vị số 1", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv01", name: "Khu vực bỏ phiếu số 01", kind: LocationKind::Area, parent_id: Some("unit_1"), neighborhood_ids: &["kp_2", "kp_3"], location_detail: Some("175/4-6 Nguyễn Thiện Thuật (Trạm Y tế phường 1 cũ)") },
    LocationNode { id: "kv02", name: "Khu vực bỏ phiếu số 02", kind: LocationKind::Area, parent_id: Some("unit_1"), neighborhood_ids: &["kp_4", "kp_7"], location_detail: Some("Trường Mầm non 1 (611/10-12 Điện Biên Phủ)") },
    LocationNode { id: "kv03", name: "Khu vực bỏ phiếu số 03", kind: LocationKind::Area, parent_id: Some("unit_1"), neighborhood_ids: &["kp_5", "kp_6"], location_detail: Some("Trường THCS Phan Sào Nam (số 657-659 Điện Biên Phủ)") },
    LocationNode { id: "unit_2", name: "Đơn vị số 2", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv04", name: "Khu vực bỏ phiếu số 04", kind: LocationKind::Area, parent_id: Some("unit_2"), neighborhood_ids: &["kp_1"], location_detail: Some("Trường Tiểu học Nguyễn Thiện Thuật - cơ sở 2 (175/49 Nguyễn Thiện Thuật)") },
    LocationNode { id: "kv05", name: "Khu vực bỏ phiếu số 05", kind: LocationKind::Area, parent_id: Some("unit_2"), neighborhood_ids: &["kp_8"], location_detail: Some("Trường THCS Thăng Long (482 Nguyễn Thị Minh Khai)") },
    LocationNode { id: "kv06", name: "Khu vực bỏ phiếu số 06", kind: LocationKind::Area, parent_id: Some("unit_2"), neighborhood_ids: &["kp_9"], location_detail: Some("Trường THCS Thăng Long (482 Nguyễn Thị Minh Khai)") },
    LocationNode { id: "unit_3", name: "Đơn vị số 3", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv07", name: "Khu vực bỏ phiếu số 07", kind: LocationKind::Area, parent_id: Some("unit_3"), neighborhood_ids: &["kp_10"], location_detail: Some("Trường Tiểu học Phan Đình Phùng - Cơ sở 1 (491/7 Nguyễn Đình Chiểu)") },
    LocationNode { id: "kv08", name: "Khu vực bỏ phiếu số 08", kind: LocationKind::Area, parent_id: Some("unit_3"), neighborhood_ids: &["kp_11"], location_detail: Some("Trường THCS Thăng Long (482 Nguyễn Thị Minh Khai)") },
    LocationNode { id: "kv09", name: "Khu vực bỏ phiếu số 09", kind: LocationKind::Area, parent_id: Some("unit_3"), neighborhood_ids: &["kp_12"], location_detail: Some("Trường Tiểu học Phan Đình Phùng - Cơ sở 1 (491/7 Nguyễn Đình Chiểu)") },
    LocationNode { id: "kv10", name: "Khu vực bỏ phiếu số 10", kind: LocationKind::Area, parent_id: Some("unit_3"), neighborhood_ids: &["kp_13"], location_detail: Some("Trường Mầm non 2 (481-483 Nguyễn Đình Chiểu)") },
    LocationNode { id: "unit_4", name: "Đơn vị số 4", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv11", name: "Khu vực bỏ phiếu số 11", kind: LocationKind::Area, parent_id: Some("unit_4"), neighborhood_ids: &["kp_14"], location_detail: Some("Trường Mầm non 3 - Cơ sở 2 (144A Nguyễn Thiện Thuật)") },
    LocationNode { id: "kv12", name: "Khu vực bỏ phiếu số 12", kind: LocationKind::Area, parent_id: Some("unit_4"), neighborhood_ids: &["kp_15"], location_detail: Some("Trường Tiểu học Nguyễn Sơn Hà (55A Cao Thắng)") },
    LocationNode { id: "kv13", name: "Khu vực bỏ phiếu số 13", kind: LocationKind::Area, parent_id: Some("unit_4"), neighborhood_ids: &["kp_16"], location_detail: Some("Trường Mầm non 3- Cơ sở 1 (202 Nguyễn Thiện Thuật)") },
    LocationNode { id: "kv14", name: "Khu vực bỏ phiếu số 14", kind: LocationKind::Area, parent_id: Some("unit_4"), neighborhood_ids: &["kp_17"], location_detail: Some("Trường Mầm non 3- Cơ sở 1 (202 Nguyễn Thiện Thuật)") },
    LocationNode { id: "unit_5", name: "Đơn vị số 5", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv15", name: "Khu vực bỏ phiếu số 15", kind: LocationKind::Area, parent_id: Some("unit_5"), neighborhood_ids: &["kp_18"], location_detail: Some("Trường Tiểu học Nguyễn Sơn Hà (55A Cao Thắng)") },
    LocationNode { id: "kv16", name: "Khu vực bỏ phiếu số 16", kind: LocationKind::Area, parent_id: Some("unit_5"), neighborhood_ids: &["kp_19"], location_detail: Some("Trường Tiểu học Lương Định Của - Cơ sở 1 (576 Nguyễn Đình Chiểu)") },
    LocationNode { id: "kv17", name: "Khu vực bỏ phiếu số 17", kind: LocationKind::Area, parent_id: Some("unit_5"), neighborhood_ids: &["kp_20"], location_detail: Some("Trường Mầm non 4 (84A Cao Thắng)") },
    LocationNode { id: "kv18", name: "Khu vực bỏ phiếu số 18", kind: LocationKind::Area, parent_id: Some("unit_5"), neighborhood_ids: &["kp_22"], location_detail: Some("Trường THCS Bàn Cờ, số 16 đường số 3, cư xá Đô Thành") },
    LocationNode { id: "kv19", name: "Khu vực bỏ phiếu số 19", kind: LocationKind::Area, parent_id: Some("unit_5"), neighborhood_ids: &["kp_23"], location_detail: Some("Trường THCS Bàn Cờ, số 16 đường số 3, cư xá Đô Thành") },
    LocationNode { id: "unit_6", name: "Đơn vị số 6", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv20", name: "Khu vực bỏ phiếu số 20", kind: LocationKind::Area, parent_id: Some("unit_6"), neighborhood_ids: &["kp_21"], location_detail: Some("Trường Tiểu học Lương Định Của - Cơ sở 1 (576 Nguyễn Đình Chiểu)") },
    LocationNode { id: "kv21", name: "Khu vực bỏ phiếu số 21", kind: LocationKind::Area, parent_id: Some("unit_6"), neighborhood_ids: &["kp_25", "kp_26"], location_detail: Some("Hợp tác xã Cẩm Tú, số 441/39/43 Nguyễn Đình Chiểu") },
    LocationNode { id: "kv22", name: "Khu vực bỏ phiếu số 22", kind: LocationKind::Area, parent_id: Some("unit_6"), neighborhood_ids: &["kp_27"], location_detail: Some("405 Võ Văn Tần (Công an Phường 5 cũ)") },
    LocationNode { id: "kv23", name: "Khu vực bỏ phiếu số 23", kind: LocationKind::Area, parent_id: Some("unit_6"), neighborhood_ids: &["kp_28"], location_detail: Some("Trường Mầm non 5 - Cơ sở 2 (số 2/25-27 Cao Thắng)") },
    LocationNode { id: "unit_7", name: "Đơn vị số 7", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv24", name: "Khu vực bỏ phiếu số 24", kind: LocationKind::Area, parent_id: Some("unit_7"), neighborhood_ids: &["kp_29"], location_detail: Some("Trường Tiểu học Phan Văn Hân (số 382/26 Nguyễn Thị Minh Khai)") },
    LocationNode { id: "kv25", name: "Khu vực bỏ phiếu số 25", kind: LocationKind::Area, parent_id: Some("unit_7"), neighborhood_ids: &["kp_30"], location_detail: Some("Trường THCS Kiến Thiết, số 223/4 Nguyễn Đình Chiểu") },
    LocationNode { id: "kv26", name: "Khu vực bỏ phiếu số 26", kind: LocationKind::Area, parent_id: Some("unit_7"), neighborhood_ids: &["kp_31"], location_detail: Some("Trường Tiểu học Phan Văn Hân (số 382/26 Nguyễn Thị Minh Khai)") },
    LocationNode { id: "kv27", name: "Khu vực bỏ phiếu số 27", kind: LocationKind::Area, parent_id: Some("unit_7"), neighborhood_ids: &["kp_32"], location_detail: Some("Trường THCS Kiến Thiết, số 223/4 Nguyễn Đình Chiểu") },
    LocationNode { id: "kv28", name: "Khu vực bỏ phiếu số 28", kind: LocationKind::Area, parent_id: Some("unit_7"), neighborhood_ids: &["kp_33"], location_detail: Some("Trung tâm Cung ứng dịch vụ Văn hóa - Thể thao phường Xuân Hòa (Cơ sở 185 Cách Mạng Tháng Tám)") },
    LocationNode { id: "unit_8", name: "Đơn vị số 8", kind: LocationKind::Unit, parent_id: Some("bc"), neighborhood_ids: &[], location_detail: None },
    LocationNode { id: "kv29", name: "Khu vực bỏ phiếu số 29", kind: LocationKind::Area, parent_id: Some("unit_8"), neighborhood_ids: &["kp_24"], location_detail: Some("Trường Tiểu học Lương Định Của (Cơ sở 2), số 132/9 Vườn Chuối") },
    LocationNode { id: "kv30", name: "Khu vực bỏ phiếu số 30", kind: LocationKind::Area, parent_id: Some("unit_8"), neighborhood_ids: &["kp_34"], location_detail: Some("Trung tâm Cung ứng dịch vụ Văn hóa - Thể thao phường Xuân Hòa (Cơ sở 185 Cách Mạng Tháng Tám)") },
    LocationNode { id: "kv31", name: "Khu vực bỏ phiếu số 31", kind: LocationKind::Area, parent_id: Some("unit_8"), neighborhood_ids: &["kp_35"], location_detail: Some("Trường Mầm non 4, số 317 Điện Biên Phủ") },
    LocationNode { id: "kv32", name: "Khu vực bỏ phiếu số 32", kind: LocationKind::Area, parent_id: Some("unit_8"), neighborhood_ids: &["kp_36"], location_detail: Some("Trường Mầm non 4, số 317 Điện Biên Phủ") },
];

pub fn find(id: &str) -> Option<&'static LocationNode> {
    WARD_LOCATIONS.iter().find(|node| node.id == id)
}

pub fn ward() -> Option<&'static LocationNode> {
    WARD_LOCATIONS.iter().find(|node| node.kind == LocationKind::Ward)
}

pub fn units() -> impl Iterator<Item = &'static LocationNode> {
    WARD_LOCATIONS.iter().filter(|node| node.kind == LocationKind::Unit)
}

pub fn areas() -> impl Iterator<Item = &'static LocationNode> {
    WARD_LOCATIONS.iter().filter(|node| node.kind == LocationKind::Area)
}

pub fn area_ids() -> Vec<&'static str> {
    areas().map(|area| area.id).collect()
}

pub fn areas_of_unit(unit_id: &str) -> impl Iterator<Item = &'static LocationNode> + '_ {
    areas().filter(move |area| area.parent_id == Some(unit_id))
}

pub fn find_area(id: &str) -> Option<&'static LocationNode> {
    find(id).filter(|node| node.kind == LocationKind::Area)
}

pub fn find_unit(id: &str) -> Option<&'static LocationNode> {
    find(id).filter(|node| node.kind == LocationKind::Unit)
}

pub fn is_area(id: &str) -> bool {
    find_area(id).is_some()
}

pub fn neighborhoods() -> &'static [Neighborhood] {
    &NEIGHBORHOODS
}

pub fn find_neighborhood(id: &str) -> Option<&'static Neighborhood> {
    NEIGHBORHOODS.iter().find(|n| n.id == id)
}
