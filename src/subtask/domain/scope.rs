//! Supervisor scopes and the area code hierarchy.

use super::SubTaskType;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Customer attributes a supervisor scope is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerScope {
    /// Sub-task type being verified.
    pub sub_task_type: SubTaskType,
    /// Customer sales area code.
    pub sales_area_code: String,
    /// Province, regency, district and village location codes, in that
    /// order; only known codes are present.
    pub location_codes: Vec<String>,
}

/// Dimension in which a supervisor scope failed to cover a sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeDimension {
    /// The membership carries no expertise at all.
    NoExpertise,
    /// The sub-task type is outside the expertise.
    Expertise,
    /// The membership carries no area at all.
    NoArea,
    /// The sales area is outside the assigned areas.
    Area,
    /// The membership carries no location at all.
    NoLocation,
    /// None of the location codes is covered.
    Location,
}

impl ScopeDimension {
    /// Returns the reason code reported to callers.
    #[must_use]
    pub const fn reason_code(self) -> &'static str {
        match self {
            Self::NoExpertise => "YOU_DONT_HAVE_ANY_EXPERTISE",
            Self::Expertise => "SUB_TASK_TYPE_NOT_WITHIN_YOUR_EXPERTISE",
            Self::NoArea => "YOU_DONT_HAVE_ANY_AREA",
            Self::Area => "SUB_TASK_CUSTOMER_SALES_AREA_NOT_WITHIN_YOUR_AREA",
            Self::NoLocation => "YOU_DONT_HAVE_ANY_LOCATION",
            Self::Location => "SUB_TASK_CUSTOMER_LOCATION_NOT_WITHIN_YOUR_LOCATION",
        }
    }
}

impl fmt::Display for ScopeDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason_code())
    }
}

/// Hierarchy-expanded sets a role membership is authorized for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveScope {
    /// Sub-task types the member may verify.
    pub expertise: BTreeSet<SubTaskType>,
    /// Sales area codes, expanded up and down the area hierarchy.
    pub area_codes: BTreeSet<String>,
    /// Location codes, expanded down the location hierarchy.
    pub location_codes: BTreeSet<String>,
}

impl EffectiveScope {
    /// Checks whether this scope covers the customer attributes.
    ///
    /// # Errors
    ///
    /// Returns the first uncovered [`ScopeDimension`], checked in the order
    /// expertise, area, location. An empty set reports the `No*` variant of
    /// its dimension.
    pub fn covers(&self, customer: &CustomerScope) -> Result<(), ScopeDimension> {
        if self.expertise.is_empty() {
            return Err(ScopeDimension::NoExpertise);
        }
        if !self.expertise.contains(&customer.sub_task_type) {
            return Err(ScopeDimension::Expertise);
        }
        if self.area_codes.is_empty() {
            return Err(ScopeDimension::NoArea);
        }
        if !self.area_codes.contains(&customer.sales_area_code) {
            return Err(ScopeDimension::Area);
        }
        if self.location_codes.is_empty() {
            return Err(ScopeDimension::NoLocation);
        }
        if !customer
            .location_codes
            .iter()
            .any(|code| self.location_codes.contains(code))
        {
            return Err(ScopeDimension::Location);
        }
        Ok(())
    }
}

/// Scope a supervisor membership was granted, before hierarchy expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignedScope {
    /// Sub-task types the member may verify.
    pub expertise: BTreeSet<SubTaskType>,
    /// Assigned sales area codes.
    pub area_codes: BTreeSet<String>,
    /// Assigned location codes.
    pub location_codes: BTreeSet<String>,
}

impl AssignedScope {
    /// Expands areas up and down `areas`, and locations down `locations`.
    #[must_use]
    pub fn expand(&self, areas: &CodeHierarchy, locations: &CodeHierarchy) -> EffectiveScope {
        EffectiveScope {
            expertise: self.expertise.clone(),
            area_codes: areas.expand_up_down(&self.area_codes),
            location_codes: locations.expand_down(&self.location_codes),
        }
    }
}

/// Parent/child relation between hierarchical codes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeHierarchy {
    parents: BTreeMap<String, String>,
}

impl CodeHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `child` as sitting directly below `parent`.
    #[must_use]
    pub fn with_edge(mut self, parent: impl Into<String>, child: impl Into<String>) -> Self {
        self.parents.insert(child.into(), parent.into());
        self
    }

    /// Returns every ancestor of `code`, nearest first.
    #[must_use]
    pub fn ancestors(&self, code: &str) -> Vec<String> {
        let mut found = Vec::new();
        let mut cursor = code;
        while let Some(parent) = self.parents.get(cursor) {
            if found.contains(parent) || parent == code {
                break;
            }
            found.push(parent.clone());
            cursor = parent.as_str();
        }
        found
    }

    /// Returns every descendant of `code`.
    #[must_use]
    pub fn descendants(&self, code: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut frontier = vec![code.to_owned()];
        while let Some(current) = frontier.pop() {
            for (child, parent) in &self.parents {
                if *parent == current && found.insert(child.clone()) {
                    frontier.push(child.clone());
                }
            }
        }
        found
    }

    /// Expands codes with their descendants.
    #[must_use]
    pub fn expand_down<'a>(&self, codes: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
        let mut expanded = BTreeSet::new();
        for code in codes {
            expanded.insert(code.clone());
            expanded.extend(self.descendants(code));
        }
        expanded
    }

    /// Expands codes with both their ancestors and their descendants.
    #[must_use]
    pub fn expand_up_down<'a>(
        &self,
        codes: impl IntoIterator<Item = &'a String>,
    ) -> BTreeSet<String> {
        let mut expanded = BTreeSet::new();
        for code in codes {
            expanded.insert(code.clone());
            expanded.extend(self.ancestors(code));
            expanded.extend(self.descendants(code));
        }
        expanded
    }
}
