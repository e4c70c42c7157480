//! Waste categories and disposal guidance

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WasteCategory {
    Plastic,
    Paper,
    Glass,
    Organic,
    Metal,
    Other,
    Unknown,
}

/// Categories matched by substring, in priority order
const MATCHED: [WasteCategory; 5] = [
    WasteCategory::Plastic,
    WasteCategory::Paper,
    WasteCategory::Glass,
    WasteCategory::Organic,
    WasteCategory::Metal,
];

impl WasteCategory {
    pub fn key(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "plastic",
            WasteCategory::Paper => "paper",
            WasteCategory::Glass => "glass",
            WasteCategory::Organic => "organic",
            WasteCategory::Metal => "metal",
            WasteCategory::Other => "other",
            WasteCategory::Unknown => "unknown",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "Plastic",
            WasteCategory::Paper => "Paper",
            WasteCategory::Glass => "Glass",
            WasteCategory::Organic => "Organic",
            WasteCategory::Metal => "Metal",
            WasteCategory::Other => "Other",
            WasteCategory::Unknown => "Unknown",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "Includes bottles, containers, bags, and packaging.",
            WasteCategory::Paper => "Newspaper, cardboard, office paper, and magazines.",
            WasteCategory::Glass => "Glass bottles and jars of all colors.",
            WasteCategory::Organic => {
                "Food scraps, yard trimmings, and other compostable materials."
            }
            WasteCategory::Metal => "Aluminum cans, steel cans, and foil.",
            WasteCategory::Other => "Items that are not recyclable or compostable.",
            WasteCategory::Unknown => "Could not confidently determine the waste type.",
        }
    }

    fn segregation(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => {
                "Rinse containers and remove lids. Check local recycling guidelines for specific plastic types accepted."
            }
            WasteCategory::Paper => {
                "Keep it clean and dry. Flatten cardboard boxes. Avoid waxed or plastic-coated paper."
            }
            WasteCategory::Glass => {
                "Rinse and remove lids. Do not include window panes, light bulbs, or ceramics."
            }
            WasteCategory::Organic => {
                "Use a compost bin. Avoid meat, dairy, and oily foods if composting at home."
            }
            WasteCategory::Metal => "Rinse cans and foil. Labels can usually be left on.",
            WasteCategory::Other => {
                "Dispose of in your general waste bin. This includes mixed-material packaging, broken ceramics, etc."
            }
            WasteCategory::Unknown => {
                "When in doubt, it's safer to place it in general waste to avoid contaminating recycling streams."
            }
        }
    }
}

/// Display and disposal information for a waste category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteInfo {
    pub category: WasteCategory,
    /// Display label, e.g. "Plastic"
    #[serde(rename = "type")]
    pub label: &'static str,
    pub description: &'static str,
    pub segregation: &'static str,
}

impl From<WasteCategory> for WasteInfo {
    fn from(category: WasteCategory) -> Self {
        Self {
            category,
            label: category.label(),
            description: category.description(),
            segregation: category.segregation(),
        }
    }
}

/// Resolve a free-form waste type (as returned by the classifier).
///
/// Missing or empty input is `unknown`; otherwise the first category whose
/// key appears in the lower-cased text wins, falling back to `other`.
pub fn waste_info(waste_type: Option<&str>) -> WasteInfo {
    let normalized = match waste_type {
        None | Some("") => return WasteCategory::Unknown.into(),
        Some(s) => s.to_lowercase(),
    };

    MATCHED
        .iter()
        .find(|category| normalized.contains(category.key()))
        .copied()
        .unwrap_or(WasteCategory::Other)
        .into()
}
