//! Letter grade banding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Letter grade for a final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "C+")]
    CPlus,
    #[serde(rename = "C")]
    C,
    #[serde(rename = "C-")]
    CMinus,
    #[serde(rename = "D+")]
    DPlus,
    #[serde(rename = "D")]
    D,
    #[serde(rename = "D-")]
    DMinus,
    #[serde(rename = "F")]
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::AMinus => "A-",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::BMinus => "B-",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::CMinus => "C-",
            Grade::DPlus => "D+",
            Grade::D => "D",
            Grade::DMinus => "D-",
            Grade::F => "F",
        }
    }

    /// Whether the grade is a pass (D- or better).
    pub fn is_passing(&self) -> bool {
        *self != Grade::F
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Banding table used to turn scores into grades.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeScale {
    /// A/B/C/D/F in ten-point bands.
    #[default]
    Simple,
    /// Ten-point bands split into plus, plain and minus.
    PlusMinus,
}

impl GradeScale {
    /// Grade `score` on this scale.
    pub fn grade(&self, score: f64) -> Grade {
        match self {
            GradeScale::Simple => score_to_grade(score),
            GradeScale::PlusMinus => score_to_plus_minus_grade(score),
        }
    }
}

impl fmt::Display for GradeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeScale::Simple => write!(f, "simple"),
            GradeScale::PlusMinus => write!(f, "plus_minus"),
        }
    }
}

const SIMPLE_BANDS: &[(f64, Grade)] = &[
    (90.0, Grade::A),
    (80.0, Grade::B),
    (70.0, Grade::C),
    (60.0, Grade::D),
];

const PLUS_MINUS_BANDS: &[(f64, Grade)] = &[
    (97.0, Grade::APlus),
    (93.0, Grade::A),
    (90.0, Grade::AMinus),
    (87.0, Grade::BPlus),
    (83.0, Grade::B),
    (80.0, Grade::BMinus),
    (77.0, Grade::CPlus),
    (73.0, Grade::C),
    (70.0, Grade::CMinus),
    (67.0, Grade::DPlus),
    (63.0, Grade::D),
    (60.0, Grade::DMinus),
];

fn band(score: f64, bands: &[(f64, Grade)]) -> Grade {
    bands
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(Grade::F)
}

/// Simple letter grade: 90+ A, 80+ B, 70+ C, 60+ D, otherwise F.
///
/// NaN grades as F.
pub fn score_to_grade(score: f64) -> Grade {
    band(score, SIMPLE_BANDS)
}

/// Plus/minus letter grade.
pub fn score_to_plus_minus_grade(score: f64) -> Grade {
    band(score, PLUS_MINUS_BANDS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_band_boundaries() {
        let cases = [
            (100.0, Grade::A),
            (90.0, Grade::A),
            (89.9, Grade::B),
            (80.0, Grade::B),
            (79.0, Grade::C),
            (70.0, Grade::C),
            (69.0, Grade::D),
            (60.0, Grade::D),
            (59.9, Grade::F),
            (0.0, Grade::F),
        ];
        for (score, expected) in cases {
            assert_eq!(score_to_grade(score), expected, "score {score}");
        }
    }

    #[test]
    fn plus_minus_band_boundaries() {
        let cases = [
            (97.0, Grade::APlus),
            (96.0, Grade::A),
            (93.0, Grade::A),
            (92.0, Grade::AMinus),
            (90.0, Grade::AMinus),
            (88.0, Grade::BPlus),
            (85.0, Grade::B),
            (80.0, Grade::BMinus),
            (78.0, Grade::CPlus),
            (75.0, Grade::C),
            (71.0, Grade::CMinus),
            (67.0, Grade::DPlus),
            (64.0, Grade::D),
            (60.0, Grade::DMinus),
            (59.0, Grade::F),
        ];
        for (score, expected) in cases {
            assert_eq!(score_to_plus_minus_grade(score), expected, "score {score}");
        }
    }

    #[test]
    fn nan_is_failing() {
        assert_eq!(score_to_grade(f64::NAN), Grade::F);
        assert!(!Grade::F.is_passing());
    }

    #[test]
    fn grade_serializes_as_letter() {
        let json = serde_json::to_string(&Grade::AMinus).unwrap();
        assert_eq!(json, "\"A-\"");
        let grade: Grade = serde_json::from_str("\"B+\"").unwrap();
        assert_eq!(grade, Grade::BPlus);
    }

    #[test]
    fn scale_selects_table() {
        assert_eq!(GradeScale::Simple.grade(91.0), Grade::A);
        assert_eq!(GradeScale::PlusMinus.grade(91.0), Grade::AMinus);
        assert_eq!(GradeScale::default(), GradeScale::Simple);
    }
}
