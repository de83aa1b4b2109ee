use {
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// One of the six faces of the domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    West,
    East,
    South,
    North,
    Bottom,
    Top,
}

impl Side {
    pub const ALL: [Side; 6] = [
        Side::West,
        Side::East,
        Side::South,
        Side::North,
        Side::Bottom,
        Side::Top,
    ];

    /// Index of the axis normal to this side (0 = x, 1 = y, 2 = z)
    pub fn axis(self) -> usize {
        match self {
            Side::West | Side::East => 0,
            Side::South | Side::North => 1,
            Side::Bottom | Side::Top => 2,
        }
    }

    /// Whether this side sits at the upper end of its axis
    pub fn is_upper(self) -> bool {
        matches!(self, Side::East | Side::North | Side::Top)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Condition imposed at a boundary.
///
/// Fluxes are positive in the direction of increasing coordinate, so a
/// positive `Flux` at the `Top` leaves the domain while one at the `Bottom`
/// enters it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    Value(f64),
    Gradient(f64),
    Flux(f64),
}

impl Default for BoundaryCondition {
    fn default() -> Self {
        BoundaryCondition::Flux(0.0)
    }
}

/// A boundary condition on one side of one field, as given in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldBoundaryCondition {
    pub field: String,
    pub side: Side,
    pub condition: BoundaryCondition,
}

/// Resolved boundary conditions for every field; unset sides are no-flux
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundaryConditions {
    fields: Vec<(String, [BoundaryCondition; 6])>,
}

impl BoundaryConditions {
    pub(super) fn insert(&mut self, field: &str, side: Side, condition: BoundaryCondition) {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, sides)) => sides[side.index()] = condition,
            None => {
                let mut sides = [BoundaryCondition::default(); 6];
                sides[side.index()] = condition;
                self.fields.push((field.to_owned(), sides));
            }
        }
    }

    pub fn get(&self, field: &str, side: Side) -> BoundaryCondition {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, sides)| sides[side.index()])
            .unwrap_or_default()
    }
}
