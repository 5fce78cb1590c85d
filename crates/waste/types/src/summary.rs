use crate::{Category, Period, TenantId, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Monthly lifecycle status. Moves only OPEN → CLOSED → TRANSFERRED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SummaryStatus {
    Open,
    Closed,
    Transferred,
}

impl SummaryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryStatus::Open => "OPEN",
            SummaryStatus::Closed => "CLOSED",
            SummaryStatus::Transferred => "TRANSFERRED",
        }
    }
}

impl std::fmt::Display for SummaryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummaryStatus {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "OPEN" => Ok(SummaryStatus::Open),
            "CLOSED" => Ok(SummaryStatus::Closed),
            "TRANSFERRED" => Ok(SummaryStatus::Transferred),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

/// Kilograms per category. All four keys are always present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub recycling: f64,
    pub compost: f64,
    pub reuse: f64,
    pub landfill: f64,
}

impl CategoryTotals {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Recycling => self.recycling,
            Category::Compost => self.compost,
            Category::Reuse => self.reuse,
            Category::Landfill => self.landfill,
        }
    }

    pub fn add(&mut self, category: Category, kg: f64) {
        match category {
            Category::Recycling => self.recycling += kg,
            Category::Compost => self.compost += kg,
            Category::Reuse => self.reuse += kg,
            Category::Landfill => self.landfill += kg,
        }
    }

    /// recycling + compost + reuse
    pub fn circular(&self) -> f64 {
        self.recycling + self.compost + self.reuse
    }

    pub fn total(&self) -> f64 {
        self.circular() + self.landfill
    }

    /// Every category and the overall sum are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.total().is_finite() && Category::ALL.iter().all(|c| self.get(*c).is_finite())
    }
}

/// Per-material kilograms inside each category.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryBreakdowns {
    pub recycling: BTreeMap<String, f64>,
    pub compost: BTreeMap<String, f64>,
    pub reuse: BTreeMap<String, f64>,
    pub landfill: BTreeMap<String, f64>,
}

impl CategoryBreakdowns {
    pub fn get(&self, category: Category) -> &BTreeMap<String, f64> {
        match category {
            Category::Recycling => &self.recycling,
            Category::Compost => &self.compost,
            Category::Reuse => &self.reuse,
            Category::Landfill => &self.landfill,
        }
    }

    pub fn add(&mut self, category: Category, material: &str, kg: f64) {
        let bucket = match category {
            Category::Recycling => &mut self.recycling,
            Category::Compost => &mut self.compost,
            Category::Reuse => &mut self.reuse,
            Category::Landfill => &mut self.landfill,
        };
        *bucket.entry(material.to_string()).or_insert(0.0) += kg;
    }
}

/// Totals derived from one month of daily entries.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub totals: CategoryTotals,
    pub breakdowns: CategoryBreakdowns,
    pub daily_entries_count: usize,
}

/// Read view of one tenant-month.
///
/// OPEN months report live totals; CLOSED and TRANSFERRED months report the
/// totals frozen at close.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub tenant: TenantId,
    pub period: Period,
    pub totals: CategoryTotals,
    pub breakdowns: CategoryBreakdowns,
    pub daily_entries_count: usize,
    pub status: SummaryStatus,
    pub closed_by: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub transferred_to_official: bool,
}
