#[allow(non_snake_case)]
pub mod Examples;
#[allow(non_snake_case)]
pub mod Kinetics;
#[allow(non_snake_case)]
pub mod OdeSolvers;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
