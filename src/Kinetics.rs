/// Library of competing ligands with their iron(III) formation and
/// dissociation rate constants, the shared EDTA reference parameters and the
/// error taxonomy of the crate. Ligands are selected either programmatically
/// via the `LigandId` enum or by the numeric selectors used in the
/// interactive menu.
pub mod ligand_base;
/// Competitive ligand-exchange kinetics: a pre-formed FeEDTA pool releases
/// inorganic iron that a stronger added ligand scavenges. The module defines
/// the reduced (2 equations, fixed FeEDTA) and extended (3 equations,
/// decaying FeEDTA) model variants and the `LigandExchangeIVP` driver that
/// integrates both over a 240 hour window with a stiff BDF solver.
///
/// # Examples
/// ```rust, ignore
/// use ChelKin::Kinetics::ligand_base::LigandId;
/// use ChelKin::Kinetics::ligand_exchange_IVP::LigandExchangeIVP;
/// let mut ivp = LigandExchangeIVP::new();
/// ivp.set_ligand(LigandId::Enterobactin, 50.0e-9).unwrap();
/// ivp.solve().unwrap();
/// ivp.pretty_print().unwrap();
/// ```
#[allow(non_snake_case)]
pub mod ligand_exchange_IVP;
