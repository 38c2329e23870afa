//! Matching configuration: scoring weights and acceptance thresholds.
//!
//! The defaults were tuned empirically against real catalogs. They are
//! exposed as configuration, but changing them needs new calibration data.

use serde::{Deserialize, Serialize};

/// Weights and multipliers used by the match scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Weight of title similarity.
    #[serde(default = "default_name_weight")]
    pub name: f64,
    /// Weight of artist similarity.
    #[serde(default = "default_artist_weight")]
    pub artist: f64,
    /// Weight of duration closeness.
    #[serde(default = "default_duration_weight")]
    pub duration: f64,
    /// Weight of album equivalence.
    #[serde(default = "default_album_weight")]
    pub album: f64,
    /// Multiplier applied to covers, karaoke and tributes.
    #[serde(default = "default_cover_penalty")]
    pub cover_penalty: f64,
    /// Multiplier applied when both title and artist match.
    #[serde(default = "default_original_artist_bonus")]
    pub original_artist_bonus: f64,
    /// Multiplier on the title term when titles are equivalent.
    #[serde(default = "default_exact_title_bonus")]
    pub exact_title_bonus: f64,
    /// Multiplier on the artist term when the artist is the original.
    #[serde(default = "default_artist_match_multiplier")]
    pub artist_match_multiplier: f64,
}

fn default_name_weight() -> f64 {
    0.45
}

fn default_artist_weight() -> f64 {
    0.40
}

fn default_duration_weight() -> f64 {
    0.05
}

fn default_album_weight() -> f64 {
    0.10
}

fn default_cover_penalty() -> f64 {
    0.3
}

fn default_original_artist_bonus() -> f64 {
    1.2
}

fn default_exact_title_bonus() -> f64 {
    1.5
}

fn default_artist_match_multiplier() -> f64 {
    1.5
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            name: default_name_weight(),
            artist: default_artist_weight(),
            duration: default_duration_weight(),
            album: default_album_weight(),
            cover_penalty: default_cover_penalty(),
            original_artist_bonus: default_original_artist_bonus(),
            exact_title_bonus: default_exact_title_bonus(),
            artist_match_multiplier: default_artist_match_multiplier(),
        }
    }
}

/// Thresholds used to accept or reject the best scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionThresholds {
    /// No candidate below this score is ever accepted.
    #[serde(default = "default_min_score")]
    pub min_score: f64,
    /// Acceptance score when the artist is the original.
    #[serde(default = "default_original_artist_score")]
    pub original_artist_score: f64,
    /// Acceptance score when the title matches.
    #[serde(default = "default_title_match_score")]
    pub title_match_score: f64,
    /// Acceptance score when the album matches.
    #[serde(default = "default_album_match_score")]
    pub album_match_score: f64,
    /// Acceptance score with no supporting flag at all.
    #[serde(default = "default_standalone_score")]
    pub standalone_score: f64,
    /// Artist similarity at which the artist counts as the original.
    #[serde(default = "default_artist_similarity")]
    pub artist_similarity: f64,
}

fn default_min_score() -> f64 {
    0.6
}

fn default_original_artist_score() -> f64 {
    0.75
}

fn default_title_match_score() -> f64 {
    0.7
}

fn default_album_match_score() -> f64 {
    0.7
}

fn default_standalone_score() -> f64 {
    0.9
}

fn default_artist_similarity() -> f64 {
    0.7
}

impl Default for SelectionThresholds {
    fn default() -> Self {
        Self {
            min_score: default_min_score(),
            original_artist_score: default_original_artist_score(),
            title_match_score: default_title_match_score(),
            album_match_score: default_album_match_score(),
            standalone_score: default_standalone_score(),
            artist_similarity: default_artist_similarity(),
        }
    }
}

/// Matching configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Scoring weights.
    #[serde(default)]
    pub weights: MatchWeights,
    /// Acceptance thresholds.
    #[serde(default)]
    pub thresholds: SelectionThresholds,
}

impl MatchingConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        let w = &self.weights;
        for (name, value) in [
            ("name", w.name),
            ("artist", w.artist),
            ("duration", w.duration),
            ("album", w.album),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "weights.{} must be between 0.0 and 1.0, got {}",
                    name, value
                ));
            }
        }
        if !(0.0..=1.0).contains(&w.cover_penalty) {
            return Err(format!(
                "weights.cover_penalty must be between 0.0 and 1.0, got {}",
                w.cover_penalty
            ));
        }
        for (name, value) in [
            ("original_artist_bonus", w.original_artist_bonus),
            ("exact_title_bonus", w.exact_title_bonus),
            ("artist_match_multiplier", w.artist_match_multiplier),
        ] {
            if value < 1.0 {
                return Err(format!("weights.{} must be >= 1.0, got {}", name, value));
            }
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("min_score", t.min_score),
            ("original_artist_score", t.original_artist_score),
            ("title_match_score", t.title_match_score),
            ("album_match_score", t.album_match_score),
            ("standalone_score", t.standalone_score),
            ("artist_similarity", t.artist_similarity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "thresholds.{} must be between 0.0 and 1.0, got {}",
                    name, value
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let w = MatchWeights::default();
        assert_eq!(w.name, 0.45);
        assert_eq!(w.artist, 0.40);
        assert_eq!(w.duration, 0.05);
        assert_eq!(w.album, 0.10);
        assert_eq!(w.cover_penalty, 0.3);
        assert_eq!(w.original_artist_bonus, 1.2);
        assert_eq!(w.exact_title_bonus, 1.5);
        assert_eq!(w.artist_match_multiplier, 1.5);
    }

    #[test]
    fn test_default_thresholds() {
        let t = SelectionThresholds::default();
        assert_eq!(t.min_score, 0.6);
        assert_eq!(t.original_artist_score, 0.75);
        assert_eq!(t.title_match_score, 0.7);
        assert_eq!(t.album_match_score, 0.7);
        assert_eq!(t.standalone_score, 0.9);
    }

    #[test]
    fn test_validation() {
        assert!(MatchingConfig::default().validate().is_ok());

        let mut config = MatchingConfig::default();
        config.weights.cover_penalty = 1.5;
        assert!(config.validate().is_err());

        let mut config = MatchingConfig::default();
        config.weights.exact_title_bonus = 0.5;
        assert!(config.validate().is_err());

        let mut config = MatchingConfig::default();
        config.thresholds.min_score = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialization() {
        let toml = r#"
[weights]
name = 0.5

[thresholds]
standalone_score = 0.95
"#;
        let config: MatchingConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.weights.name, 0.5);
        assert_eq!(config.weights.artist, 0.40);
        assert_eq!(config.thresholds.standalone_score, 0.95);
        assert_eq!(config.thresholds.min_score, 0.6);
    }
}
