#[allow(non_snake_case)]
pub mod chelation_examples;
