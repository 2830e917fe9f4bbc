use crate::activity::{Activity, ActivityId, ActivityLookup, AgeGroup, EffortLevel, GroupSize, Location};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// In-memory activity catalogue, ordered by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityCatalog {
    activities: BTreeMap<ActivityId, Activity>,
}

impl ActivityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_activities<I: IntoIterator<Item = Activity>>(activities: I) -> Self {
        Self {
            activities: activities
                .into_iter()
                .map(|activity| (activity.id, activity))
                .collect(),
        }
    }

    /// Inserts or replaces by id, returning the previous version.
    pub fn upsert(&mut self, activity: Activity) -> Option<Activity> {
        self.activities.insert(activity.id, activity)
    }

    pub fn remove(&mut self, id: ActivityId) -> Option<Activity> {
        self.activities.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.activities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    pub fn query(&self, filter: &ActivityFilter, page: PageRequest) -> Page<&Activity> {
        let matching: Vec<&Activity> = self
            .activities
            .values()
            .filter(|activity| filter.matches(activity))
            .collect();
        Page::from_matches(matching, page)
    }
}

impl ActivityLookup for ActivityCatalog {
    fn get_activity(&self, id: ActivityId) -> Option<&Activity> {
        self.activities.get(&id)
    }
}

/// Catalogue filter. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityFilter {
    /// Case-insensitive substring over every translation of name and description.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub group_size: Option<GroupSize>,
    #[serde(default)]
    pub effort_level: Option<EffortLevel>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub age_group: Option<AgeGroup>,
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
    #[serde(default)]
    pub educational_goal: Option<i64>,
    #[serde(default)]
    pub sdg: Option<i64>,
}

impl ActivityFilter {
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            if !activity.name.contains_ignore_case(&needle)
                && !activity.description.contains_ignore_case(&needle)
            {
                return false;
            }
        }
        if self.group_size.is_some_and(|size| size != activity.group_size) {
            return false;
        }
        if self.effort_level.is_some_and(|effort| effort != activity.effort_level) {
            return false;
        }
        if self.location.is_some_and(|location| location != activity.location) {
            return false;
        }
        if self.age_group.is_some_and(|age| age != activity.age_group) {
            return false;
        }
        if self
            .max_duration_minutes
            .is_some_and(|max| activity.duration_minutes > max)
        {
            return false;
        }
        if let Some(goal_id) = self.educational_goal {
            if !activity.educational_goals.iter().any(|goal| goal.id == goal_id) {
                return false;
            }
        }
        if let Some(sdg_id) = self.sdg {
            if !activity.sdgs.iter().any(|sdg| sdg.id == sdg_id) {
                return false;
            }
        }
        true
    }
}

/// 1-based page number; `per_page` is clamped to `1..=MAX_PER_PAGE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default = "first_page")]
    page: u32,
    #[serde(default = "default_per_page")]
    per_page: u32,
}

fn first_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    DEFAULT_PER_PAGE
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        PageRequest::new(raw.page, raw.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    fn offset(&self) -> usize {
        (self.page as usize - 1) * self.per_page as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total: usize,
    pub total_pages: u32,
}

impl<T> Page<T> {
    fn from_matches(matching: Vec<T>, request: PageRequest) -> Self {
        let total = matching.len();
        let per_page = request.per_page() as usize;
        let total_pages = total.div_ceil(per_page) as u32;
        let items = matching
            .into_iter()
            .skip(request.offset())
            .take(per_page)
            .collect();
        Self {
            items,
            page: request.page(),
            per_page: request.per_page(),
            total,
            total_pages,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
        }
    }
}
