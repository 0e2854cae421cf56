use serde::{Deserialize, Serialize};
use utility::geo::{BoundingBox, Coordinate};
use utility::id::{HasId, Id};

/// A location dropped on the map. Photos hang off a pin through the album store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub id: Id<Pin>,
    pub coordinate: Coordinate,
}

impl HasId for Pin {
    type IdType = u64;
}

impl Pin {
    pub fn new(id: Id<Pin>, coordinate: Coordinate) -> Self {
        Self { id, coordinate }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(&self.coordinate)
    }
}
