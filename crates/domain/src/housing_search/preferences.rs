//! Housing criteria an applicant is searching with.

use serde::{Deserialize, Serialize};

use crate::money::Money;

use super::{HousingSearchError, MoveTimeline, ShulId};

/// How close to a synagogue the family needs to live.
///
/// When no specific shul is preferred, any shul is acceptable; the
/// constructor and deserialization both enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ShulProximityRepr")]
pub struct ShulProximityPreference {
    preferred_shul_ids: Vec<ShulId>,
    max_walking_distance_miles: Option<f64>,
    any_shul_acceptable: bool,
}

#[derive(Deserialize)]
struct ShulProximityRepr {
    #[serde(default)]
    preferred_shul_ids: Vec<ShulId>,
    max_walking_distance_miles: Option<f64>,
    #[serde(default)]
    any_shul_acceptable: bool,
}

impl TryFrom<ShulProximityRepr> for ShulProximityPreference {
    type Error = HousingSearchError;

    fn try_from(repr: ShulProximityRepr) -> Result<Self, Self::Error> {
        Self::new(
            repr.preferred_shul_ids,
            repr.max_walking_distance_miles,
            repr.any_shul_acceptable,
        )
    }
}

impl ShulProximityPreference {
    pub fn new(
        preferred_shul_ids: impl IntoIterator<Item = ShulId>,
        max_walking_distance_miles: Option<f64>,
        any_shul_acceptable: bool,
    ) -> Result<Self, HousingSearchError> {
        if let Some(miles) = max_walking_distance_miles {
            ensure_non_negative("max_walking_distance_miles", miles)?;
        }
        let mut ids: Vec<ShulId> = Vec::new();
        for id in preferred_shul_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        let any_shul_acceptable = any_shul_acceptable || ids.is_empty();
        Ok(Self {
            preferred_shul_ids: ids,
            max_walking_distance_miles,
            any_shul_acceptable,
        })
    }

    pub fn no_preference() -> Self {
        Self {
            preferred_shul_ids: Vec::new(),
            max_walking_distance_miles: None,
            any_shul_acceptable: true,
        }
    }

    /// Any shul within the given walking distance.
    pub fn with_max_distance(miles: f64) -> Result<Self, HousingSearchError> {
        Self::new([], Some(miles), true)
    }

    pub fn preferred_shul_ids(&self) -> &[ShulId] {
        &self.preferred_shul_ids
    }

    pub fn max_walking_distance_miles(&self) -> Option<f64> {
        self.max_walking_distance_miles
    }

    pub fn any_shul_acceptable(&self) -> bool {
        self.any_shul_acceptable
    }
}

impl Default for ShulProximityPreference {
    fn default() -> Self {
        Self::no_preference()
    }
}

/// A snapshot of what the family is looking for. Replaced as a whole.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HousingPreferences {
    budget: Option<Money>,
    min_bedrooms: Option<u32>,
    min_bathrooms: Option<f64>,
    #[serde(default)]
    required_features: Vec<String>,
    #[serde(default)]
    shul_proximity: ShulProximityPreference,
    move_timeline: Option<MoveTimeline>,
}

impl HousingPreferences {
    pub fn builder() -> HousingPreferencesBuilder {
        HousingPreferencesBuilder::default()
    }

    /// Preferences with every criterion left open.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn budget(&self) -> Option<&Money> {
        self.budget.as_ref()
    }

    pub fn min_bedrooms(&self) -> Option<u32> {
        self.min_bedrooms
    }

    pub fn min_bathrooms(&self) -> Option<f64> {
        self.min_bathrooms
    }

    pub fn required_features(&self) -> &[String] {
        &self.required_features
    }

    pub fn shul_proximity(&self) -> &ShulProximityPreference {
        &self.shul_proximity
    }

    pub fn move_timeline(&self) -> Option<MoveTimeline> {
        self.move_timeline
    }
}

/// Builder for [`HousingPreferences`].
#[derive(Debug, Default)]
pub struct HousingPreferencesBuilder {
    budget: Option<Money>,
    min_bedrooms: Option<u32>,
    min_bathrooms: Option<f64>,
    required_features: Vec<String>,
    shul_proximity: Option<ShulProximityPreference>,
    move_timeline: Option<MoveTimeline>,
}

impl HousingPreferencesBuilder {
    pub fn budget(mut self, budget: Money) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn min_bedrooms(mut self, bedrooms: u32) -> Self {
        self.min_bedrooms = Some(bedrooms);
        self
    }

    /// Half bathrooms count, so this is fractional.
    pub fn min_bathrooms(mut self, bathrooms: f64) -> Self {
        self.min_bathrooms = Some(bathrooms);
        self
    }

    pub fn required_feature(mut self, feature: impl Into<String>) -> Self {
        self.required_features.push(feature.into());
        self
    }

    pub fn required_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_features
            .extend(features.into_iter().map(Into::into));
        self
    }

    pub fn shul_proximity(mut self, proximity: ShulProximityPreference) -> Self {
        self.shul_proximity = Some(proximity);
        self
    }

    pub fn move_timeline(mut self, timeline: MoveTimeline) -> Self {
        self.move_timeline = Some(timeline);
        self
    }

    /// Validates the collected criteria.
    ///
    /// Feature names are trimmed, blank ones dropped and duplicates removed
    /// keeping first occurrence.
    pub fn build(self) -> Result<HousingPreferences, HousingSearchError> {
        if let Some(bathrooms) = self.min_bathrooms {
            ensure_non_negative("min_bathrooms", bathrooms)?;
        }

        let mut required_features: Vec<String> = Vec::new();
        for feature in self.required_features {
            let feature = feature.trim();
            if !feature.is_empty() && !required_features.iter().any(|f| f == feature) {
                required_features.push(feature.to_string());
            }
        }

        Ok(HousingPreferences {
            budget: self.budget,
            min_bedrooms: self.min_bedrooms,
            min_bathrooms: self.min_bathrooms,
            required_features,
            shul_proximity: self.shul_proximity.unwrap_or_default(),
            move_timeline: self.move_timeline,
        })
    }
}

fn ensure_non_negative(field: &str, value: f64) -> Result<(), HousingSearchError> {
    if !value.is_finite() || value < 0.0 {
        return Err(HousingSearchError::InvalidPreference(format!(
            "{field} must be a finite, non-negative number (got {value})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_shul_list_means_any_shul() {
        let pref = ShulProximityPreference::new([], None, false).unwrap();
        assert!(pref.any_shul_acceptable());
        assert!(ShulProximityPreference::no_preference().any_shul_acceptable());
    }

    #[test]
    fn specific_shuls_keep_flag_and_dedupe() {
        let a = ShulId::new();
        let b = ShulId::new();
        let pref = ShulProximityPreference::new([a, b, a], Some(0.5), false).unwrap();
        assert_eq!(pref.preferred_shul_ids(), &[a, b]);
        assert!(!pref.any_shul_acceptable());
        assert_eq!(pref.max_walking_distance_miles(), Some(0.5));
    }

    #[test]
    fn negative_distance_is_rejected() {
        assert!(matches!(
            ShulProximityPreference::with_max_distance(-1.0),
            Err(HousingSearchError::InvalidPreference(_))
        ));
        assert!(ShulProximityPreference::with_max_distance(f64::NAN).is_err());
    }

    #[test]
    fn deserialization_normalizes_any_shul_flag() {
        let json = serde_json::json!({
            "preferred_shul_ids": [],
            "max_walking_distance_miles": 1.0,
            "any_shul_acceptable": false
        });
        let pref: ShulProximityPreference = serde_json::from_value(json).unwrap();
        assert!(pref.any_shul_acceptable());
    }

    #[test]
    fn builder_cleans_features() {
        let prefs = HousingPreferences::builder()
            .required_features(["  garage ", "", "Yard", "garage", "   "])
            .required_feature("Basement")
            .build()
            .unwrap();
        assert_eq!(prefs.required_features(), &["garage", "Yard", "Basement"]);
    }

    #[test]
    fn builder_rejects_negative_bathrooms() {
        let result = HousingPreferences::builder().min_bathrooms(-0.5).build();
        assert!(matches!(
            result,
            Err(HousingSearchError::InvalidPreference(_))
        ));
    }

    #[test]
    fn default_is_no_preference() {
        let prefs = HousingPreferences::none();
        assert!(prefs.budget().is_none());
        assert!(prefs.min_bedrooms().is_none());
        assert!(prefs.required_features().is_empty());
        assert!(prefs.shul_proximity().any_shul_acceptable());
        assert!(prefs.move_timeline().is_none());
    }

    #[test]
    fn preferences_round_trip_through_json() {
        let prefs = HousingPreferences::builder()
            .budget(Money::new(500_000.0).unwrap())
            .min_bedrooms(4)
            .min_bathrooms(2.5)
            .required_feature("Garage")
            .shul_proximity(ShulProximityPreference::with_max_distance(0.5).unwrap())
            .move_timeline(MoveTimeline::ShortTerm)
            .build()
            .unwrap();

        let json = serde_json::to_string(&prefs).unwrap();
        let back: HousingPreferences = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
        assert_eq!(back.budget().unwrap().amount(), 500_000.0);
        assert_eq!(back.shul_proximity().max_walking_distance_miles(), Some(0.5));
    }
}
