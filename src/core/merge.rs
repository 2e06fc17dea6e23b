use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Theme {
    Requests,
    Complaints,
    Suggestions,
    Praise,
    Troubleshooting,
    Other,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Requests,
        Theme::Complaints,
        Theme::Suggestions,
        Theme::Praise,
        Theme::Troubleshooting,
        Theme::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Requests => "Requests",
            Theme::Complaints => "Complaints",
            Theme::Suggestions => "Suggestions",
            Theme::Praise => "Praise",
            Theme::Troubleshooting => "Troubleshooting",
            Theme::Other => "Other",
        }
    }

    /// Exact, case-sensitive lookup of one of the five named themes.
    /// `"Other"` and anything unrecognised return `None`.
    pub fn from_key(key: &str) -> Option<Theme> {
        Theme::ALL
            .into_iter()
            .filter(|theme| *theme != Theme::Other)
            .find(|theme| theme.name() == key)
    }
}

/// The merged analysis. Field order fixes the key order of the written report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    #[serde(rename = "Requests", default)]
    pub requests: Vec<Value>,
    #[serde(rename = "Complaints", default)]
    pub complaints: Vec<Value>,
    #[serde(rename = "Suggestions", default)]
    pub suggestions: Vec<Value>,
    #[serde(rename = "Praise", default)]
    pub praise: Vec<Value>,
    #[serde(rename = "Troubleshooting", default)]
    pub troubleshooting: Vec<Value>,
    #[serde(rename = "Other", default)]
    pub other: Vec<Value>,
}

impl FinalReport {
    pub fn theme(&self, theme: Theme) -> &[Value] {
        match theme {
            Theme::Requests => &self.requests,
            Theme::Complaints => &self.complaints,
            Theme::Suggestions => &self.suggestions,
            Theme::Praise => &self.praise,
            Theme::Troubleshooting => &self.troubleshooting,
            Theme::Other => &self.other,
        }
    }

    fn theme_mut(&mut self, theme: Theme) -> &mut Vec<Value> {
        match theme {
            Theme::Requests => &mut self.requests,
            Theme::Complaints => &mut self.complaints,
            Theme::Suggestions => &mut self.suggestions,
            Theme::Praise => &mut self.praise,
            Theme::Troubleshooting => &mut self.troubleshooting,
            Theme::Other => &mut self.other,
        }
    }

    pub fn total_insights(&self) -> usize {
        Theme::ALL.iter().map(|t| self.theme(*t).len()).sum()
    }

    pub fn counts(&self) -> Vec<(Theme, usize)> {
        Theme::ALL.iter().map(|t| (*t, self.theme(*t).len())).collect()
    }
}

/// Fold every stored chunk result into one report.
///
/// Lists under a named theme extend that theme. Anything else (unknown or
/// differently-cased keys, non-list values) lands in `Other`. Entries that are
/// not JSON objects are skipped.
pub fn merge_results(entries: &[Value]) -> FinalReport {
    let mut report = FinalReport::default();

    for (position, entry) in entries.iter().enumerate() {
        let Some(themes) = entry.as_object() else {
            warn!(position, entry = %entry, "Skipping stored result that is not a JSON object");
            continue;
        };

        for (key, value) in themes {
            match (Theme::from_key(key), value) {
                (Some(theme), Value::Array(items)) => {
                    report.theme_mut(theme).extend(items.iter().cloned());
                }
                (_, Value::Array(items)) => report.other.extend(items.iter().cloned()),
                (_, other) => report.other.push(other.clone()),
            }
        }
    }

    report
}
