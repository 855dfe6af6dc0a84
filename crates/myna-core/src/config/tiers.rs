//! Recommendation tier policy
//!
//! Colleges are sorted into tiers by the margin between the student's score
//! and the college's historical cutoff (margin = score - cutoff). The table
//! is data, not code: deployments can tighten or widen the bands without a
//! rebuild, and the rendered rules are injected into the domain prompt.

use crate::error::{MynaError, Result};
use serde::{Deserialize, Serialize};

/// One tier: margins in `[min_margin, max_margin)` fall into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierBand {
    pub label: String,
    pub min_margin: f64,
    /// Open-ended when absent
    #[serde(default)]
    pub max_margin: Option<f64>,
}

/// Ordered tier table, most certain tier first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierPolicy {
    pub bands: Vec<TierBand>,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            bands: vec![
                TierBand {
                    label: "Definite".to_string(),
                    min_margin: 2.0,
                    max_margin: None,
                },
                TierBand {
                    label: "Probable".to_string(),
                    min_margin: -2.0,
                    max_margin: Some(2.0),
                },
                TierBand {
                    label: "Reach".to_string(),
                    min_margin: -5.0,
                    max_margin: Some(-2.0),
                },
            ],
        }
    }
}

impl TierPolicy {
    /// Tier label for a score margin, if any band covers it
    pub fn tier_for(&self, margin: f64) -> Option<&str> {
        self.bands
            .iter()
            .find(|band| {
                margin >= band.min_margin && band.max_margin.map_or(true, |max| margin < max)
            })
            .map(|band| band.label.as_str())
    }

    /// Bands must be non-empty, descending and non-overlapping
    pub fn validate(&self) -> Result<()> {
        if self.bands.is_empty() {
            return Err(MynaError::Config("tier policy has no bands".into()));
        }

        for band in &self.bands {
            if band.label.trim().is_empty() {
                return Err(MynaError::Config("tier band without a label".into()));
            }
            if let Some(max) = band.max_margin {
                if max <= band.min_margin {
                    return Err(MynaError::Config(format!(
                        "tier '{}' has an empty margin range",
                        band.label
                    )));
                }
            }
        }

        for pair in self.bands.windows(2) {
            let (upper, lower) = (&pair[0], &pair[1]);
            match lower.max_margin {
                Some(max) if max <= upper.min_margin => {}
                _ => {
                    return Err(MynaError::Config(format!(
                        "tier '{}' overlaps or is ordered above '{}'",
                        lower.label, upper.label
                    )))
                }
            }
        }

        Ok(())
    }

    /// Rule lines for the system prompt
    pub fn render(&self) -> String {
        self.bands
            .iter()
            .map(|band| match band.max_margin {
                None => format!(
                    "- {}: student's score is at least {} above the cutoff",
                    band.label,
                    fmt_margin(band.min_margin)
                ),
                Some(max) => format!(
                    "- {}: score minus cutoff is from {} up to (not including) {}",
                    band.label,
                    fmt_margin(band.min_margin),
                    fmt_margin(max)
                ),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn fmt_margin(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:+}", value as i64)
    } else {
        format!("{:+.2}", value)
    }
}
