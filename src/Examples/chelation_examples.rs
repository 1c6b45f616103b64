pub fn chelation_examples(task: usize) {
    match task {
        0 => {
            // ENTEROBACTIN COMPETING WITH FeEDTA
            // 50 nM of the strongest library ligand against the 100 nM
            // FeEDTA pool; both variants integrated and summarized
            use crate::Kinetics::ligand_base::LigandId;
            use crate::Kinetics::ligand_exchange_IVP::LigandExchangeIVP;
            let mut ivp = LigandExchangeIVP::new();
            ivp.set_ligand(LigandId::Enterobactin, 50.0e-9).unwrap();
            ivp.solve().unwrap();
            ivp.pretty_print().unwrap();

            let extended = ivp.extended_trajectory().unwrap();
            let last = extended.len() - 1;
            println!(
                "after {} hr: Fe' = {:.4e} M, FeL = {:.4e} M, FeEDTA = {:.4e} M",
                extended.time[last],
                extended.free_iron[last],
                extended.bound_iron[last],
                extended.reference_complex.as_ref().unwrap()[last]
            );
        }
        1 => {
            // LIGAND LIBRARY OVERVIEW
            // rate constants of all five competing ligands as a table
            use crate::Kinetics::ligand_base::LigandId;
            LigandId::pretty_print();
        }
        2 => {
            // REDUCED VS EXTENDED VARIANT
            // how far the fixed-FeEDTA approximation drifts over 10 days
            use crate::Kinetics::ligand_base::LigandId;
            use crate::Kinetics::ligand_exchange_IVP::LigandExchangeIVP;
            let mut ivp = LigandExchangeIVP::new();
            ivp.set_ligand(LigandId::DesferrioxamineBWitter, 50.0e-9)
                .unwrap();
            ivp.solve().unwrap();
            let reduced = ivp.reduced_trajectory().unwrap();
            let extended = ivp.extended_trajectory().unwrap();
            for &ts in &[1.0, 24.0, 120.0, 240.0] {
                let k = reduced
                    .time
                    .iter()
                    .position(|&t| (t - ts).abs() < 1e-9)
                    .unwrap();
                let drift = (reduced.free_iron[k] - extended.free_iron[k]).abs()
                    / extended.free_iron[k];
                println!(
                    "t = {:>5.0} hr: Fe' 2 eqns = {:.4e} M, 3 eqns = {:.4e} M, drift = {:.2}%",
                    ts,
                    reduced.free_iron[k],
                    extended.free_iron[k],
                    drift * 100.0
                );
            }
        }
        3 => {
            // SAVING RESULTS
            // trajectory table and run configuration written next to the binary
            use crate::Kinetics::ligand_base::LigandId;
            use crate::Kinetics::ligand_exchange_IVP::LigandExchangeIVP;
            use crate::Utils::save_to_file::{save_config_to_file, save_trajectories_to_file};
            let mut ivp = LigandExchangeIVP::new();
            ivp.set_ligand(LigandId::FerrichromeBoiteau, 20.0e-9).unwrap();
            ivp.solve().unwrap();
            save_trajectories_to_file(
                "ferrichrome_20nM.tsv",
                ivp.reduced_trajectory().unwrap(),
                ivp.extended_trajectory().unwrap(),
            )
            .unwrap();
            save_config_to_file("ferrichrome_20nM.json", ivp.config().unwrap()).unwrap();
            println!("saved ferrichrome_20nM.tsv and ferrichrome_20nM.json");
        }
        _ => {
            println!("there is no such task");
        }
    }
}
