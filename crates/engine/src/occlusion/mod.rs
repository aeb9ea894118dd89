use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;
use tracing::warn;

use crate::app::{Rect, Vec2};

pub const DEFAULT_HIGH_DEPTH: f32 = 1.0e6;
pub const DEFAULT_LOW_DEPTH: f32 = -1.0;
pub const DEFAULT_BAND_HEIGHT: f32 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneryCategory {
    Decoration,
    Bush,
    Tree,
    Tower,
    Canopy,
}

impl SceneryCategory {
    pub const ALL: [SceneryCategory; 5] = [
        SceneryCategory::Decoration,
        SceneryCategory::Bush,
        SceneryCategory::Tree,
        SceneryCategory::Tower,
        SceneryCategory::Canopy,
    ];

    pub fn code(self) -> &'static str {
        match self {
            SceneryCategory::Decoration => "decoration",
            SceneryCategory::Bush => "bush",
            SceneryCategory::Tree => "tree",
            SceneryCategory::Tower => "tower",
            SceneryCategory::Canopy => "canopy",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for SceneryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case", deny_unknown_fields)]
pub enum OcclusionRule {
    /// Depth bucketed by anchor y, always opaque.
    Generic,
    /// Behind and faded while the actor is above `top + split_fraction * height`.
    Split {
        split_fraction: f32,
        reduced_alpha: f32,
    },
    /// Always drawn over the actor, faded while the actor stands inside the footprint.
    Containment { reduced_alpha: f32 },
}

impl OcclusionRule {
    fn is_valid(&self) -> bool {
        let unit = |value: f32| value.is_finite() && (0.0..=1.0).contains(&value);
        match *self {
            OcclusionRule::Generic => true,
            OcclusionRule::Split {
                split_fraction,
                reduced_alpha,
            } => unit(split_fraction) && unit(reduced_alpha),
            OcclusionRule::Containment { reduced_alpha } => unit(reduced_alpha),
        }
    }
}

pub fn default_rule(category: SceneryCategory) -> OcclusionRule {
    match category {
        SceneryCategory::Decoration | SceneryCategory::Bush => OcclusionRule::Generic,
        SceneryCategory::Tree => OcclusionRule::Split {
            split_fraction: 0.65,
            reduced_alpha: 0.5,
        },
        SceneryCategory::Tower => OcclusionRule::Split {
            split_fraction: 0.8,
            reduced_alpha: 0.5,
        },
        SceneryCategory::Canopy => OcclusionRule::Containment {
            reduced_alpha: 0.35,
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OcclusionConfig {
    pub band_height: f32,
    pub high_depth: f32,
    pub low_depth: f32,
}

impl Default for OcclusionConfig {
    fn default() -> Self {
        Self {
            band_height: DEFAULT_BAND_HEIGHT,
            high_depth: DEFAULT_HIGH_DEPTH,
            low_depth: DEFAULT_LOW_DEPTH,
        }
    }
}

/// Category -> rule table plus the depth constants the rules resolve to.
#[derive(Debug, Clone, PartialEq)]
pub struct OcclusionTable {
    config: OcclusionConfig,
    rules: BTreeMap<SceneryCategory, OcclusionRule>,
}

impl Default for OcclusionTable {
    fn default() -> Self {
        Self::new(OcclusionConfig::default(), &BTreeMap::new())
    }
}

impl OcclusionTable {
    /// Invalid band heights and out-of-range overrides are logged and replaced by defaults.
    pub fn new(
        mut config: OcclusionConfig,
        overrides: &BTreeMap<SceneryCategory, OcclusionRule>,
    ) -> Self {
        if !config.band_height.is_finite() || config.band_height <= 0.0 {
            warn!(
                band_height = config.band_height,
                fallback = DEFAULT_BAND_HEIGHT,
                "occlusion_band_height_invalid"
            );
            config.band_height = DEFAULT_BAND_HEIGHT;
        }

        let mut rules: BTreeMap<_, _> = SceneryCategory::ALL
            .into_iter()
            .map(|category| (category, default_rule(category)))
            .collect();
        for (category, rule) in overrides {
            if rule.is_valid() {
                rules.insert(*category, *rule);
            } else {
                warn!(category = %category, rule = ?rule, "occlusion_rule_override_invalid");
            }
        }
        Self { config, rules }
    }

    pub fn config(&self) -> &OcclusionConfig {
        &self.config
    }

    pub fn rule_for(&self, category: SceneryCategory) -> OcclusionRule {
        self.rules
            .get(&category)
            .copied()
            .unwrap_or_else(|| default_rule(category))
    }

    /// Draw depth of the actor. The half offset places it between generic bands.
    pub fn actor_depth(&self, actor_y: f32) -> f32 {
        (actor_y / self.config.band_height).floor() + 0.5
    }

    /// `(depth, alpha)` of one object. `None` means no actor has spawned yet.
    pub fn evaluate(&self, actor: Option<Vec2>, object: &SceneryObject) -> (f32, f32) {
        match self.rule_for(object.category) {
            OcclusionRule::Generic => (
                (object.anchor.y / self.config.band_height).floor(),
                1.0,
            ),
            OcclusionRule::Split {
                split_fraction,
                reduced_alpha,
            } => {
                let split_y = object.footprint.top() + split_fraction * object.footprint.height;
                match actor {
                    Some(position) if position.y >= split_y => (self.config.low_depth, 1.0),
                    _ => (self.config.high_depth, reduced_alpha),
                }
            }
            OcclusionRule::Containment { reduced_alpha } => match actor {
                Some(position) if !object.footprint.contains_point(position) => {
                    (self.config.high_depth, 1.0)
                }
                _ => (self.config.high_depth, reduced_alpha),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneryObject {
    pub id: u32,
    pub name: String,
    pub anchor: Vec2,
    pub footprint: Rect,
    pub category: SceneryCategory,
}

impl SceneryObject {
    /// Anchor defaults to the bottom-center of the footprint.
    pub fn from_footprint(
        id: u32,
        name: impl Into<String>,
        footprint: Rect,
        category: SceneryCategory,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            anchor: Vec2::new(footprint.center().x, footprint.bottom()),
            footprint,
            category,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneryRegistry {
    objects: Vec<SceneryObject>,
    index_by_id: BTreeMap<u32, usize>,
}

impl SceneryRegistry {
    /// Refuses a second object with an id already registered.
    pub fn insert(&mut self, object: SceneryObject) -> bool {
        if self.index_by_id.contains_key(&object.id) {
            warn!(id = object.id, name = %object.name, "scenery_duplicate_id");
            return false;
        }
        self.index_by_id.insert(object.id, self.objects.len());
        self.objects.push(object);
        true
    }

    /// Position of `id` in `objects()`.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    pub fn get(&self, id: u32) -> Option<&SceneryObject> {
        self.index_of(id).map(|index| &self.objects[index])
    }

    pub fn objects(&self) -> &[SceneryObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneryDraw {
    pub object_id: u32,
    pub depth: f32,
    pub alpha: f32,
}

/// Recomputes every object's `(depth, alpha)` into `out`, ascending by depth then id.
pub fn sort_scenery(
    table: &OcclusionTable,
    registry: &SceneryRegistry,
    actor: Option<Vec2>,
    out: &mut Vec<SceneryDraw>,
) {
    let actor = actor.filter(|position| position.is_finite());
    out.clear();
    out.extend(registry.objects().iter().map(|object| {
        let (depth, alpha) = table.evaluate(actor, object);
        SceneryDraw {
            object_id: object.id,
            depth,
            alpha,
        }
    }));
    out.sort_by(|a, b| {
        a.depth
            .total_cmp(&b.depth)
            .then_with(|| a.object_id.cmp(&b.object_id))
    });
}
