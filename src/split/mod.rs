//! Runnable splitting
//!
//! Turns what a dry run discovered into a flat list of unit identifiers the
//! coordinator can schedule independently.

use std::collections::HashSet;

use crate::models::Location;

/// Separator between nesting levels in a group name
pub const GROUP_SEPARATOR: &str = "::";

/// Something a dry run found in a file, in discovery order
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscoveredUnit {
    /// An example group, named by its nesting path (`Foo::Bar::Baz`)
    Group { name: String, location: Location },
    /// A plain scenario
    Scenario { location: Location },
    /// A scenario outline header
    Outline { location: Location },
    /// One generated row of a scenario outline
    ExampleRow { outline: Location },
}

impl DiscoveredUnit {
    pub fn group(name: impl Into<String>, location: Location) -> Self {
        DiscoveredUnit::Group {
            name: name.into(),
            location,
        }
    }
}

/// Whether `ancestor` is a strict nesting ancestor of `name`
fn is_ancestor(ancestor: &str, name: &str) -> bool {
    name.len() > ancestor.len()
        && name.starts_with(ancestor)
        && name[ancestor.len()..].starts_with(GROUP_SEPARATOR)
}

/// Reduce discovered units to deduplicated unit identifiers.
///
/// Groups with a nested descendant are dropped so only the most specific
/// group is scheduled. Outline rows collapse onto their outline.
pub fn runnable_parts(units: &[DiscoveredUnit]) -> Vec<String> {
    let group_names: Vec<&str> = units
        .iter()
        .filter_map(|unit| match unit {
            DiscoveredUnit::Group { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();

    let mut seen = HashSet::new();
    let mut parts = Vec::new();

    for unit in units {
        let location = match unit {
            DiscoveredUnit::Group { name, location } => {
                if group_names.iter().any(|other| is_ancestor(name, other)) {
                    continue;
                }
                location
            }
            DiscoveredUnit::Scenario { location } | DiscoveredUnit::Outline { location } => {
                location
            }
            DiscoveredUnit::ExampleRow { outline } => outline,
        };

        let id = location.to_string();
        if seen.insert(id.clone()) {
            parts.push(id);
        }
    }

    parts
}
