use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Output classes of the bundled fruit/vegetable model, in logit order.
pub const DEFAULT_CLASS_NAMES: [&str; 18] = [
    "freshapples",
    "freshbanana",
    "freshbittergroud",
    "freshcapsicum",
    "freshcucumber",
    "freshokra",
    "freshoranges",
    "freshpotato",
    "freshtomato",
    "rottenapples",
    "rottenbanana",
    "rottenbittergroud",
    "rottencapsicum",
    "rottencucumber",
    "rottenokra",
    "rottenoranges",
    "rottenpotato",
    "rottentomato",
];

const FRESH_MARKER: &str = "fresh";
const ROTTEN_MARKER: &str = "rotten";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quality {
    Good,
    Bad,
}

impl Quality {
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good Quality",
            Self::Bad => "Bad Quality",
        }
    }
}

/// Class distribution collapsed into a fresh/rotten verdict. Percentages are
/// in `0..=100`.
#[derive(Debug, Clone, PartialEq)]
pub struct FreshnessReport {
    pub predicted_class: String,
    pub confidence: f32,
    pub fresh_percentage: f32,
    pub rotten_percentage: f32,
    pub quality: Quality,
}

/// Wire shape returned by `POST /predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionPayload {
    pub predicted_class: String,
    pub confidence: String,
    pub fresh_percentage: String,
    pub rotten_percentage: String,
    pub quality_label: String,
}

impl FreshnessReport {
    pub fn from_probabilities(
        class_names: &[String],
        probabilities: &[f32],
    ) -> Result<Self, ModelError> {
        if class_names.is_empty() || class_names.len() != probabilities.len() {
            return Err(ModelError::Inference(format!(
                "expected {} probabilities, got {}",
                class_names.len(),
                probabilities.len()
            )));
        }

        // First maximum wins on ties.
        let mut best = 0;
        for (idx, value) in probabilities.iter().enumerate() {
            if *value > probabilities[best] {
                best = idx;
            }
        }

        let fresh = mass_for(class_names, probabilities, FRESH_MARKER);
        let rotten = mass_for(class_names, probabilities, ROTTEN_MARKER);

        Ok(Self {
            predicted_class: class_names[best].clone(),
            confidence: probabilities[best] * 100.0,
            fresh_percentage: fresh * 100.0,
            rotten_percentage: rotten * 100.0,
            quality: if fresh > rotten {
                Quality::Good
            } else {
                Quality::Bad
            },
        })
    }

    pub fn to_payload(&self) -> PredictionPayload {
        PredictionPayload {
            predicted_class: self.predicted_class.clone(),
            confidence: format!("{:.2}%", self.confidence),
            fresh_percentage: format!("{:.2}%", self.fresh_percentage),
            rotten_percentage: format!("{:.2}%", self.rotten_percentage),
            quality_label: self.quality.label().to_string(),
        }
    }
}

fn mass_for(class_names: &[String], probabilities: &[f32], marker: &str) -> f32 {
    class_names
        .iter()
        .zip(probabilities)
        .filter(|(name, _)| name.to_lowercase().contains(marker))
        .map(|(_, probability)| *probability)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        DEFAULT_CLASS_NAMES.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn sums_mass_over_fresh_and_rotten_labels() {
        let mut probs = vec![0.0_f32; 18];
        probs[8] = 0.4; // freshtomato
        probs[0] = 0.2; // freshapples
        probs[17] = 0.3; // rottentomato
        probs[9] = 0.1; // rottenapples

        let report = FreshnessReport::from_probabilities(&names(), &probs).unwrap();
        assert_eq!(report.predicted_class, "freshtomato");
        assert!((report.fresh_percentage - 60.0).abs() < 1e-3);
        assert!((report.rotten_percentage - 40.0).abs() < 1e-3);
        assert_eq!(report.quality, Quality::Good);
    }

    #[test]
    fn rotten_mass_can_outweigh_top_fresh_class() {
        let mut probs = vec![0.0_f32; 18];
        probs[1] = 0.35; // freshbanana
        probs[10] = 0.33; // rottenbanana
        probs[15] = 0.32; // rottenoranges

        let report = FreshnessReport::from_probabilities(&names(), &probs).unwrap();
        assert_eq!(report.predicted_class, "freshbanana");
        assert_eq!(report.quality, Quality::Bad);
    }

    #[test]
    fn equal_mass_is_bad_quality() {
        let names = vec!["freshokra".to_string(), "rottenokra".to_string()];
        let report = FreshnessReport::from_probabilities(&names, &[0.5, 0.5]).unwrap();
        assert_eq!(report.predicted_class, "freshokra");
        assert_eq!(report.quality, Quality::Bad);
    }

    #[test]
    fn payload_formats_percentages() {
        let names = vec!["freshokra".to_string(), "rottenokra".to_string()];
        let payload = FreshnessReport::from_probabilities(&names, &[0.91234, 0.08766])
            .unwrap()
            .to_payload();
        assert_eq!(payload.confidence, "91.23%");
        assert_eq!(payload.rotten_percentage, "8.77%");
        assert_eq!(payload.quality_label, "Good Quality");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(FreshnessReport::from_probabilities(&names(), &[1.0]).is_err());
    }
}
