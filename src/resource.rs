use serde::{Deserialize, Serialize};

pub type ResourceId = u64;

/// A bookable pool of capacity, e.g. the tickets of one event.
///
/// `version` is bumped by the store on every successful draw-down and is the
/// token the optimistic path compares against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub description: String,
    pub total_capacity: u32,
    pub available_capacity: u32,
    pub version: u64,
}

impl Resource {
    /// Capacity already drawn down by reservations.
    pub fn booked(&self) -> u32 {
        self.total_capacity - self.available_capacity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewResource {
    pub name: String,
    pub description: String,
    pub total_capacity: u32,
}

impl NewResource {
    pub fn new(name: impl Into<String>, description: impl Into<String>, total_capacity: u32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            total_capacity,
        }
    }
}

/// Caller-facing projection of a [`Resource`]; the version stays internal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    pub id: ResourceId,
    pub name: String,
    pub description: String,
    pub total_capacity: u32,
    pub available_capacity: u32,
}

impl From<Resource> for ResourceView {
    fn from(r: Resource) -> Self {
        Self {
            id: r.id,
            name: r.name,
            description: r.description,
            total_capacity: r.total_capacity,
            available_capacity: r.available_capacity,
        }
    }
}
