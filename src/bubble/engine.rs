use crate::bubble::scale::SqrtScale;
use crate::bubble::transition::{Shape, Transition};
use crate::data::Dataset;
use crate::map::FeatureIndex;
use glam::DVec2;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Where bubbles go when their region code matches no boundary feature
pub const OFF_CANVAS: DVec2 = DVec2::new(-1000.0, -1000.0);

/// Where one visible record should end up
#[derive(Clone, Debug, PartialEq)]
pub struct Target {
    pub key: String,
    /// Index into `Dataset::records()`
    pub record: usize,
    pub value: Option<f64>,
    pub shape: Shape,
}

/// The computed visible set for one (cause, year)
#[derive(Clone, Debug)]
pub struct Plan {
    pub targets: Vec<Target>,
    pub scale: SqrtScale,
}

/// Filter, scale and position every record of `year` for `cause`.
///
/// One target per region code; a repeated code keeps its first row.
/// Unknown causes and non-numeric cells count as "no data" and get radius 0.
pub fn plan(
    dataset: &Dataset,
    index: &FeatureIndex,
    cause: &str,
    year: i32,
    max_radius: f64,
) -> Plan {
    let mut seen = HashSet::new();
    let visible: Vec<(usize, Option<f64>)> = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| r.year == year)
        .filter(|(_, r)| {
            let fresh = seen.insert(r.code.as_str());
            if !fresh {
                debug!("Duplicate row for {} in {}; keeping the first", r.code, year);
            }
            fresh
        })
        .map(|(i, r)| (i, dataset.value(r, cause)))
        .collect();

    let scale = SqrtScale::from_values(visible.iter().filter_map(|(_, v)| *v), max_radius);

    let targets = visible
        .into_iter()
        .map(|(i, value)| {
            let code = &dataset.records()[i].code;
            let center = index.locate(code).unwrap_or(OFF_CANVAS);
            Target {
                key: code.clone(),
                record: i,
                value,
                shape: Shape::new(center, value.map_or(0.0, |v| scale.radius(v))),
            }
        })
        .collect();

    Plan { targets, scale }
}

/// Keyed reconciliation between the previous bubbles and a new target set
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Diff {
    /// Keys of bubbles with no target any more
    pub to_remove: Vec<String>,
    /// Indices into the targets that have no bubble yet
    pub to_add: Vec<usize>,
    /// Indices into the targets whose bubble already exists
    pub to_update: Vec<usize>,
}

pub fn diff<'a>(previous: impl IntoIterator<Item = &'a str>, targets: &[Target]) -> Diff {
    let previous: HashSet<&str> = previous.into_iter().collect();
    let next: HashSet<&str> = targets.iter().map(|t| t.key.as_str()).collect();

    let mut result = Diff::default();
    for (i, target) in targets.iter().enumerate() {
        if previous.contains(target.key.as_str()) {
            result.to_update.push(i);
        } else {
            result.to_add.push(i);
        }
    }
    let mut removed: Vec<String> = previous
        .difference(&next)
        .map(|k| k.to_string())
        .collect();
    removed.sort();
    result.to_remove = removed;
    result
}

/// One rendered bubble
#[derive(Clone, Debug)]
pub struct Bubble {
    key: String,
    record: usize,
    value: Option<f64>,
    transition: Transition<Shape>,
}

impl Bubble {
    /// New bubbles appear at their target without animating
    fn enter(target: Target, now: Instant) -> Self {
        Self {
            key: target.key,
            record: target.record,
            value: target.value,
            transition: Transition::settled(target.shape, now),
        }
    }

    fn retarget(self, target: Target, now: Instant, duration: Duration) -> Self {
        Self {
            key: self.key,
            record: target.record,
            value: target.value,
            transition: self.transition.retarget(target.shape, now, duration),
        }
    }

    /// Region code
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Index of the backing record in the dataset
    pub fn record(&self) -> usize {
        self.record
    }

    /// Value of the cause this bubble was last rendered for
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Shape as displayed at `now`
    pub fn shape(&self, now: Instant) -> Shape {
        self.transition.sample(now)
    }

    /// Shape once the current animation finishes
    pub fn target(&self) -> Shape {
        self.transition.target()
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        !self.transition.is_done(now)
    }
}

/// Counts reported by one render pass
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RenderSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub max_value: f64,
}

impl RenderSummary {
    pub fn visible(&self) -> usize {
        self.added + self.updated
    }
}

/// Owns the current bubble set and animates it between renders
#[derive(Clone, Debug)]
pub struct BubbleEngine {
    max_radius: f64,
    duration: Duration,
    bubbles: Vec<Bubble>,
    max_value: f64,
}

impl BubbleEngine {
    pub fn new(max_radius: f64, duration: Duration) -> Self {
        Self {
            max_radius,
            duration,
            bubbles: Vec::new(),
            max_value: 0.0,
        }
    }

    /// Reconcile the bubble set with the records of `year`, sized by `cause`.
    ///
    /// The logical set switches immediately; surviving bubbles animate from
    /// wherever they are displayed at `now`, which also interrupts any
    /// animation still running from a previous render.
    pub fn render(
        &mut self,
        dataset: &Dataset,
        index: &FeatureIndex,
        cause: &str,
        year: i32,
        now: Instant,
    ) -> RenderSummary {
        let plan = plan(dataset, index, cause, year, self.max_radius);
        let diff = diff(self.bubbles.iter().map(Bubble::key), &plan.targets);

        let mut previous: HashMap<String, Bubble> = self
            .bubbles
            .drain(..)
            .map(|b| (b.key.clone(), b))
            .collect();
        for key in &diff.to_remove {
            previous.remove(key);
        }

        let mut slots: Vec<Option<Bubble>> = (0..plan.targets.len()).map(|_| None).collect();
        let mut targets: Vec<Option<Target>> = plan.targets.into_iter().map(Some).collect();

        for &i in &diff.to_update {
            if let Some(target) = targets[i].take() {
                slots[i] = Some(match previous.remove(&target.key) {
                    Some(old) => old.retarget(target, now, self.duration),
                    None => Bubble::enter(target, now),
                });
            }
        }
        for &i in &diff.to_add {
            if let Some(target) = targets[i].take() {
                slots[i] = Some(Bubble::enter(target, now));
            }
        }

        self.bubbles = slots.into_iter().flatten().collect();
        self.max_value = plan.scale.max_value();

        let summary = RenderSummary {
            added: diff.to_add.len(),
            updated: diff.to_update.len(),
            removed: diff.to_remove.len(),
            max_value: plan.scale.max_value(),
        };
        debug!(
            "Rendered {cause} {year}: +{} ~{} -{} (max {})",
            summary.added, summary.updated, summary.removed, summary.max_value
        );
        summary
    }

    /// Bubbles in draw order; later ones are on top
    pub fn bubbles(&self) -> &[Bubble] {
        &self.bubbles
    }

    pub fn get(&self, key: &str) -> Option<&Bubble> {
        self.bubbles.iter().find(|b| b.key == key)
    }

    /// Largest value of the last render's cause among the visible records
    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.bubbles.iter().any(|b| b.is_animating(now))
    }

    /// Topmost bubble whose displayed circle contains `point`
    pub fn hit_test(&self, point: DVec2, now: Instant) -> Option<&Bubble> {
        self.bubbles
            .iter()
            .rev()
            .find(|b| b.shape(now).contains(point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;
    use crate::map::Projection;
    use geojson::feature::Id;
    use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

    const D: Duration = Duration::from_millis(750);

    fn feature(id: &str, iso: Option<&str>, lon: f64, lat: f64) -> Feature {
        let mut properties = JsonObject::new();
        if let Some(iso) = iso {
            properties.insert("iso_a3".to_string(), iso.into());
        }
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![vec![
                vec![lon - 1.0, lat - 1.0],
                vec![lon + 1.0, lat - 1.0],
                vec![lon + 1.0, lat + 1.0],
                vec![lon - 1.0, lat + 1.0],
                vec![lon - 1.0, lat - 1.0],
            ]]))),
            id: Some(Id::String(id.to_string())),
            properties: Some(properties),
            foreign_members: None,
        }
    }

    fn world() -> (FeatureCollection, Projection) {
        let fc = FeatureCollection {
            bbox: None,
            features: vec![
                feature("AAA", None, -40.0, 10.0),
                feature("BBB", None, 40.0, -10.0),
                feature("CCC", None, 100.0, 30.0),
                feature("-99", Some("ATA"), 0.0, -70.0),
            ],
            foreign_members: None,
        };
        (fc, Projection::new(60.0, DVec2::new(200.0, 120.0), 400, 240))
    }

    fn index() -> FeatureIndex {
        let (fc, p) = world();
        FeatureIndex::build(&fc, &p, "iso_a3")
    }

    fn dataset() -> Dataset {
        Dataset::new(
            vec!["Flu".to_string(), "Malaria".to_string()],
            vec![
                Record::new("A", "AAA", 2000, vec![10.0, 5.0]),
                Record::new("B", "BBB", 2000, vec![30.0, 0.0]),
                Record::new("A", "AAA", 2001, vec![20.0, 1.0]),
                Record::new("C", "CCC", 2001, vec![40.0, 2.0]),
                Record::new("Antarctica", "ATA", 2001, vec![1.0, 0.0]),
                Record::new("Atlantis", "ZZZ", 2001, vec![7.0, 7.0]),
            ],
        )
    }

    fn radius(engine: &BubbleEngine, key: &str) -> f64 {
        engine.get(key).unwrap().target().radius
    }

    #[test]
    fn test_two_row_example_radii_ratio() {
        let dataset = Dataset::new(
            vec!["Flu".to_string()],
            vec![
                Record::new("A", "AAA", 2000, vec![10.0]),
                Record::new("B", "BBB", 2000, vec![30.0]),
            ],
        );
        let mut engine = BubbleEngine::new(40.0, D);
        let summary = engine.render(&dataset, &index(), "Flu", 2000, Instant::now());

        assert_eq!(summary.visible(), 2);
        assert_eq!(engine.bubbles().len(), 2);
        let ratio = radius(&engine, "AAA") / radius(&engine, "BBB");
        assert!((ratio - (10.0f64 / 30.0).sqrt()).abs() < 1e-12);
        assert_eq!(radius(&engine, "BBB"), 40.0);
    }

    #[test]
    fn test_one_bubble_per_record_of_the_year() {
        let dataset = dataset();
        let index = index();
        let mut engine = BubbleEngine::new(40.0, D);
        for &year in dataset.years() {
            for cause in dataset.causes() {
                engine.render(&dataset, &index, cause, year, Instant::now());
                let mut keys: Vec<&str> = engine.bubbles().iter().map(Bubble::key).collect();
                let mut expected: Vec<&str> = dataset
                    .records()
                    .iter()
                    .filter(|r| r.year == year)
                    .map(|r| r.code.as_str())
                    .collect();
                keys.sort();
                expected.sort();
                assert_eq!(keys, expected);
            }
        }

        engine.render(&dataset, &index, "Flu", 1850, Instant::now());
        assert!(engine.bubbles().is_empty());
    }

    #[test]
    fn test_radius_monotonic_in_value() {
        let dataset = dataset();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index(), "Flu", 2001, Instant::now());

        let mut pairs: Vec<(f64, f64)> = engine
            .bubbles()
            .iter()
            .map(|b| (b.value().unwrap(), b.target().radius))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn test_render_is_idempotent() {
        let dataset = dataset();
        let index = index();
        let t0 = Instant::now();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2001, t0);
        let once: Vec<(String, Shape)> = engine
            .bubbles()
            .iter()
            .map(|b| (b.key().to_string(), b.shape(t0)))
            .collect();

        let summary = engine.render(&dataset, &index, "Flu", 2001, t0);
        let twice: Vec<(String, Shape)> = engine
            .bubbles()
            .iter()
            .map(|b| (b.key().to_string(), b.shape(t0)))
            .collect();

        assert_eq!(once, twice);
        assert_eq!(summary.added, 0);
        assert_eq!(summary.removed, 0);
        assert!(!engine.is_animating(t0));
    }

    #[test]
    fn test_cause_change_keeps_keys_and_positions() {
        let dataset = dataset();
        let index = index();
        let t0 = Instant::now();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2001, t0);
        let before: Vec<(String, DVec2, f64)> = engine
            .bubbles()
            .iter()
            .map(|b| (b.key().to_string(), b.target().center, b.target().radius))
            .collect();

        let summary = engine.render(&dataset, &index, "Malaria", 2001, t0);
        assert_eq!(summary.added, 0);
        assert_eq!(summary.removed, 0);

        for (b, (key, center, flu_radius)) in engine.bubbles().iter().zip(&before) {
            assert_eq!(b.key(), key);
            assert_eq!(b.target().center, *center);
            if key == "AAA" {
                assert_ne!(b.target().radius, *flu_radius);
            }
        }
    }

    #[test]
    fn test_alternate_property_join() {
        let dataset = dataset();
        let index = index();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2001, Instant::now());

        let ata = engine.get("ATA").unwrap().target().center;
        assert_ne!(ata, OFF_CANVAS);
        assert_eq!(Some(ata), index.locate("ATA"));
    }

    #[test]
    fn test_unmatched_code_goes_off_canvas() {
        let dataset = dataset();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index(), "Flu", 2001, Instant::now());

        let zzz = engine.get("ZZZ").unwrap().target();
        assert_eq!(zzz.center, OFF_CANVAS);
        assert!(zzz.radius > 0.0);
        // Other bubbles still placed
        assert_ne!(engine.get("CCC").unwrap().target().center, OFF_CANVAS);
    }

    #[test]
    fn test_all_zero_values_give_zero_radius() {
        let dataset = Dataset::new(
            vec!["Flu".to_string()],
            vec![
                Record::new("A", "AAA", 2000, vec![0.0]),
                Record::new("B", "BBB", 2000, vec![0.0]),
            ],
        );
        let mut engine = BubbleEngine::new(40.0, D);
        let summary = engine.render(&dataset, &index(), "Flu", 2000, Instant::now());
        assert_eq!(summary.max_value, 0.0);
        assert!(engine.bubbles().iter().all(|b| b.target().radius == 0.0));
    }

    #[test]
    fn test_unknown_cause_is_no_data() {
        let dataset = dataset();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index(), "Cholera", 2000, Instant::now());
        assert_eq!(engine.bubbles().len(), 2);
        assert!(engine
            .bubbles()
            .iter()
            .all(|b| b.target().radius == 0.0 && b.value().is_none()));
    }

    #[test]
    fn test_non_numeric_cells_are_zero_radius() {
        let dataset = Dataset::new(
            vec!["Flu".to_string()],
            vec![
                Record::new("A", "AAA", 2000, vec![f64::NAN]),
                Record::new("B", "BBB", 2000, vec![9.0]),
            ],
        );
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index(), "Flu", 2000, Instant::now());
        assert_eq!(radius(&engine, "AAA"), 0.0);
        assert_eq!(radius(&engine, "BBB"), 40.0);
    }

    #[test]
    fn test_year_change_enters_updates_and_removes() {
        let dataset = dataset();
        let index = index();
        let t0 = Instant::now();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2000, t0);

        let summary = engine.render(&dataset, &index, "Flu", 2001, t0);
        assert_eq!(summary.updated, 1); // AAA
        assert_eq!(summary.added, 3); // CCC, ATA, ZZZ
        assert_eq!(summary.removed, 1); // BBB
        assert!(engine.get("BBB").is_none());

        // Entered bubbles sit at their target, the surviving one animates
        assert!(!engine.get("CCC").unwrap().is_animating(t0));
        let aaa = engine.get("AAA").unwrap();
        assert!(aaa.is_animating(t0));
        assert!(aaa.shape(t0).radius < aaa.target().radius);
        assert_eq!(aaa.shape(t0 + D).radius, aaa.target().radius);
    }

    #[test]
    fn test_new_render_interrupts_running_transition() {
        let dataset = dataset();
        let index = index();
        let t0 = Instant::now();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2000, t0);
        engine.render(&dataset, &index, "Malaria", 2000, t0);

        let mid = t0 + D / 2;
        let displayed = engine.get("AAA").unwrap().shape(mid);
        engine.render(&dataset, &index, "Flu", 2000, mid);

        let aaa = engine.get("AAA").unwrap();
        assert_eq!(aaa.shape(mid), displayed);
        assert_eq!(aaa.shape(mid + D).radius, radius(&engine, "AAA"));
    }

    #[test]
    fn test_duplicate_codes_get_one_bubble() {
        let dataset = Dataset::new(
            vec!["Flu".to_string()],
            vec![
                Record::new("A", "AAA", 2000, vec![1.0]),
                Record::new("A again", "AAA", 2000, vec![100.0]),
            ],
        );
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index(), "Flu", 2000, Instant::now());
        assert_eq!(engine.bubbles().len(), 1);
        assert_eq!(engine.bubbles()[0].record(), 0);
        assert_eq!(engine.max_value(), 1.0);
    }

    #[test]
    fn test_diff_sets() {
        let shape = Shape::new(DVec2::ZERO, 1.0);
        let targets: Vec<Target> = ["B", "C"]
            .iter()
            .enumerate()
            .map(|(i, k)| Target {
                key: k.to_string(),
                record: i,
                value: None,
                shape,
            })
            .collect();
        let d = diff(["A", "B"], &targets);
        assert_eq!(d.to_remove, vec!["A".to_string()]);
        assert_eq!(d.to_update, vec![0]);
        assert_eq!(d.to_add, vec![1]);
    }

    #[test]
    fn test_hit_test_prefers_topmost_and_skips_zero_radius() {
        let dataset = dataset();
        let index = index();
        let t0 = Instant::now();
        let mut engine = BubbleEngine::new(40.0, D);
        engine.render(&dataset, &index, "Flu", 2000, t0);

        let bbb = engine.get("BBB").unwrap().target().center;
        assert_eq!(engine.hit_test(bbb, t0).map(Bubble::key), Some("BBB"));
        assert!(engine.hit_test(DVec2::new(-5000.0, -5000.0), t0).is_none());

        // Malaria for BBB is 0 in 2000
        engine.render(&dataset, &index, "Malaria", 2000, t0 + D);
        let hit = engine.hit_test(bbb, t0 + D * 2).map(Bubble::key);
        assert_ne!(hit, Some("BBB"));
    }
}
