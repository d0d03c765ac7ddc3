// Domain layer - Task description and value types

pub mod model;
