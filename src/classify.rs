use std::fmt;

use serde::{Deserialize, Serialize};

/// The experiment a log was recorded for
///
/// The category decides which downstream reductions apply to a run: only baseline runs
/// are characterised as transients, and the cross-run analyses select rows by category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum MeasurementType {
    #[serde(rename = "Baseline (air)")]
    Baseline,
    #[serde(rename = "Sensitivity & Linearity")]
    SensitivityLinearity,
    #[serde(rename = "Repeatability")]
    Repeatability,
    #[serde(rename = "Reproducibility")]
    Reproducibility,
    #[serde(rename = "Unknown")]
    Unknown,
}

impl MeasurementType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Baseline => "Baseline (air)",
            Self::SensitivityLinearity => "Sensitivity & Linearity",
            Self::Repeatability => "Repeatability",
            Self::Reproducibility => "Reproducibility",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Checked in order, the first match wins.
const RULES: [(&str, MeasurementType); 4] = [
    ("baseline", MeasurementType::Baseline),
    ("sens_", MeasurementType::SensitivityLinearity),
    ("repeat_", MeasurementType::Repeatability),
    ("reprod_", MeasurementType::Reproducibility),
];

/// Classify a log from its source identifier, usually the file name
pub fn classify(identifier: &str) -> MeasurementType {
    let identifier = identifier.to_lowercase();
    RULES
        .iter()
        .find(|(pattern, _)| identifier.contains(pattern))
        .map_or(MeasurementType::Unknown, |(_, measurement_type)| {
            *measurement_type
        })
}

#[cfg(test)]
mod test {
    use super::{classify, MeasurementType};

    #[test]
    fn file_names_are_classified() {
        assert_eq!(
            classify("20251205_1547_sens_linearity.csv"),
            MeasurementType::SensitivityLinearity
        );
        assert_eq!(classify("baseline_run1.csv"), MeasurementType::Baseline);
        assert_eq!(classify("repeat_1pct.csv"), MeasurementType::Repeatability);
        assert_eq!(
            classify("20251205_1450_reprod_9C.csv"),
            MeasurementType::Reproducibility
        );
        assert_eq!(classify("unrelated.csv"), MeasurementType::Unknown);
    }

    #[test]
    fn classification_ignores_case() {
        assert_eq!(classify("BASELINE.CSV"), MeasurementType::Baseline);
        assert_eq!(classify("Repeat_2PCT.csv"), MeasurementType::Repeatability);
    }

    #[test]
    fn earlier_rules_take_priority() {
        assert_eq!(classify("baseline_sens_1pct.csv"), MeasurementType::Baseline);
        assert_eq!(
            classify("sens_repeat_reprod.csv"),
            MeasurementType::SensitivityLinearity
        );
        assert_eq!(classify("reprod_repeat_.csv"), MeasurementType::Repeatability);
    }

    #[test]
    fn underscore_is_part_of_the_pattern() {
        assert_eq!(classify("sensor.csv"), MeasurementType::Unknown);
        assert_eq!(classify("repeatability.csv"), MeasurementType::Unknown);
    }

    #[test]
    fn labels_match_display() {
        assert_eq!(MeasurementType::Baseline.to_string(), "Baseline (air)");
        assert_eq!(
            MeasurementType::SensitivityLinearity.to_string(),
            "Sensitivity & Linearity"
        );
    }
}
