// Domain layer: entities and the read-only contracts the recommender consumes.

pub mod model;
pub mod ports;
