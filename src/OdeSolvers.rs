/// Variable-order (1..5) BDF integrator with quasi-constant step size,
/// simplified Newton iteration on an LU-factored iteration matrix and
/// backward-difference dense output. Built for stiff chemical kinetics where
/// rate constants span many orders of magnitude and explicit methods would
/// need prohibitively small steps.
#[allow(non_snake_case)]
pub mod BDF_solver;
