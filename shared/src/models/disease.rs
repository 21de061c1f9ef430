//! Corn leaf disease labels and predictions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label stored when classification could not be performed
pub const SENTINEL_LABEL: &str = "Processing failed";

/// Disease classes produced by the corn leaf model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DiseaseLabel {
    #[serde(rename = "Blight")]
    Blight,
    #[serde(rename = "Common Rust")]
    CommonRust,
    #[serde(rename = "Gray Leaf Spot")]
    GrayLeafSpot,
    #[serde(rename = "Healthy")]
    Healthy,
}

impl DiseaseLabel {
    /// All labels in model output order
    pub const ALL: [DiseaseLabel; 4] = [
        DiseaseLabel::Blight,
        DiseaseLabel::CommonRust,
        DiseaseLabel::GrayLeafSpot,
        DiseaseLabel::Healthy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DiseaseLabel::Blight => "Blight",
            DiseaseLabel::CommonRust => "Common Rust",
            DiseaseLabel::GrayLeafSpot => "Gray Leaf Spot",
            DiseaseLabel::Healthy => "Healthy",
        }
    }
}

impl fmt::Display for DiseaseLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiseaseLabel {
    type Err = String;

    /// Accepts display names as well as dataset folder names such as
    /// `Common_Rust` or `gray_leaf_spot`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();

        match normalized.as_str() {
            "blight" | "northern leaf blight" => Ok(DiseaseLabel::Blight),
            "common rust" | "rust" => Ok(DiseaseLabel::CommonRust),
            "gray leaf spot" | "grey leaf spot" => Ok(DiseaseLabel::GrayLeafSpot),
            "healthy" => Ok(DiseaseLabel::Healthy),
            _ => Err(format!("Unknown disease label: {}", s)),
        }
    }
}

/// Result of classifying one image
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Disease label, or [`SENTINEL_LABEL`] when classification failed
    pub label: String,
    /// Probability in [0, 1]
    pub confidence: f64,
}

impl Prediction {
    pub fn new(label: DiseaseLabel, confidence: f64) -> Self {
        Self {
            label: label.as_str().to_string(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Sentinel prediction returned instead of an error
    pub fn failed() -> Self {
        Self {
            label: SENTINEL_LABEL.to_string(),
            confidence: 0.0,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.label == SENTINEL_LABEL
    }

    pub fn disease(&self) -> Option<DiseaseLabel> {
        self.label.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing_accepts_dataset_names() {
        assert_eq!("Common_Rust".parse(), Ok(DiseaseLabel::CommonRust));
        assert_eq!("gray_leaf_spot".parse(), Ok(DiseaseLabel::GrayLeafSpot));
        assert_eq!("Blight".parse(), Ok(DiseaseLabel::Blight));
        assert_eq!(" Healthy ".parse(), Ok(DiseaseLabel::Healthy));
        assert!("Tomato mosaic".parse::<DiseaseLabel>().is_err());
    }

    #[test]
    fn test_label_round_trips_through_display() {
        for label in DiseaseLabel::ALL {
            assert_eq!(label.to_string().parse(), Ok(label));
        }
    }

    #[test]
    fn test_confidence_is_clamped() {
        assert_eq!(Prediction::new(DiseaseLabel::Blight, 1.7).confidence, 1.0);
        assert_eq!(Prediction::new(DiseaseLabel::Blight, -0.2).confidence, 0.0);
    }

    #[test]
    fn test_sentinel_prediction() {
        let failed = Prediction::failed();
        assert!(failed.is_failed());
        assert_eq!(failed.confidence, 0.0);
        assert_eq!(failed.disease(), None);
    }

    #[test]
    fn test_serialized_label_uses_display_name() {
        let json = serde_json::to_string(&DiseaseLabel::GrayLeafSpot).unwrap();
        assert_eq!(json, "\"Gray Leaf Spot\"");
    }
}
