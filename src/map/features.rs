use crate::map::projection::{centroid, Projection};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection};
use glam::DVec2;
use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    feature: usize,
    centroid: Option<DVec2>,
}

/// Lookup from region code to the projected centroid of its boundary feature.
///
/// Codes are matched against the feature `id` first and against an alternate
/// property (e.g. `iso_a3`) second. The first feature carrying a given key wins.
#[derive(Clone, Debug, Default)]
pub struct FeatureIndex {
    by_id: HashMap<String, Entry>,
    by_property: HashMap<String, Entry>,
}

impl FeatureIndex {
    pub fn build(collection: &FeatureCollection, projection: &Projection, property: &str) -> Self {
        let keyed: Vec<(Option<String>, Option<String>, Option<DVec2>)> = collection
            .features
            .par_iter()
            .map(|f| {
                let c = f.geometry.as_ref().and_then(|g| centroid(g, projection));
                (feature_id(f), property_code(f, property), c)
            })
            .collect();

        let mut index = Self::default();
        for (feature, (id, alt, centroid)) in keyed.into_iter().enumerate() {
            let entry = Entry { feature, centroid };
            if let Some(id) = id {
                index.by_id.entry(id).or_insert(entry);
            }
            if let Some(alt) = alt {
                index.by_property.entry(alt).or_insert(entry);
            }
        }

        let conflicts = index.conflicting_codes();
        for code in &conflicts {
            warn!(
                "Code {code} is the id of one boundary feature and the `{property}` of another; using the id match"
            );
        }
        debug!(
            "Indexed {} features ({} ids, {} `{}` codes)",
            collection.features.len(),
            index.by_id.len(),
            index.by_property.len(),
            property
        );

        index
    }

    /// Codes that resolve to different features depending on which key is consulted
    pub fn conflicting_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .by_id
            .iter()
            .filter(|(code, entry)| {
                self.by_property
                    .get(*code)
                    .is_some_and(|alt| alt.feature != entry.feature)
            })
            .map(|(code, _)| code.clone())
            .collect();
        codes.sort();
        codes
    }

    /// Screen centroid for a region code. `None` if nothing matches or the
    /// matched feature has no usable geometry.
    pub fn locate(&self, code: &str) -> Option<DVec2> {
        self.by_id
            .get(code)
            .or_else(|| self.by_property.get(code))
            .and_then(|e| e.centroid)
    }
}

fn feature_id(feature: &Feature) -> Option<String> {
    feature.id.as_ref().map(|id| match id {
        Id::String(s) => s.clone(),
        Id::Number(n) => n.to_string(),
    })
}

fn property_code(feature: &Feature, property: &str) -> Option<String> {
    feature
        .property(property)
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
