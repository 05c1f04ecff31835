/// Module containing order and deal enumerations
pub mod order;
