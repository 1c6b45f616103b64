use crate::Kinetics::ligand_base::{LigandId, dose_from_nanomolar};
use crate::Kinetics::ligand_exchange_IVP::LigandExchangeIVP;
use crate::Utils::save_to_file::{save_config_to_file, save_trajectories_to_file};
use std::io::{self, Write};

pub fn ligand_exchange_menu() {
    loop {
        println!("\n=== Ligand Exchange Kinetics IVP Solver ===");
        println!("1. Solve exchange problem");
        println!("2. Show ligand library");
        println!("3. Exit");
        print!("Choose option: ");
        io::stdout().flush().unwrap();

        let mut input = String::new();
        io::stdin().read_line(&mut input).unwrap();

        match input.trim() {
            "1" => {
                if let Err(e) = run_solver() {
                    println!("Error: {}", e);
                }
            }
            "2" => LigandId::pretty_print(),
            "3" => break,
            _ => println!("Invalid option"),
        }
    }
}

fn run_solver() -> Result<(), String> {
    // Step 1: Choose the competing ligand
    let ligand = choose_ligand()?;

    // Step 2: Amount of ligand added
    let lig_added = input_dose()?;

    // Step 3: Set up and solve both variants
    let mut ivp = LigandExchangeIVP::new();
    ivp.set_ligand(ligand, lig_added).map_err(|e| e.to_string())?;
    ivp.check_task().map_err(|e| e.to_string())?;

    println!("Solving...");
    ivp.solve().map_err(|e| e.to_string())?;

    println!("Solution complete!");
    ivp.pretty_print().map_err(|e| e.to_string())?;

    // Step 4: Optional export
    offer_export(&ivp)?;
    Ok(())
}

fn choose_ligand() -> Result<LigandId, String> {
    println!("\nWhich ligand would you like to add?");
    println!("1. Enterobactin");
    println!("2. Ferrichrome (rates from Witter et al.)");
    println!("3. Desferrioxamine B (rates from Witter et al.)");
    println!("4. Ferrichrome (rates from Boiteau et al.)");
    println!("5. Desferrioxamine B (rates from Boiteau et al.)");
    print!("Enter choice (1-5): ");
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();

    let selector: u32 = input
        .trim()
        .parse()
        .map_err(|_| "Invalid number format".to_string())?;
    LigandId::from_selector(selector).map_err(|e| e.to_string())
}

fn input_dose() -> Result<f64, String> {
    print!("How much ligand is added (nmol/L)? ");
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    dose_from_nanomolar(input.trim()).map_err(|e| e.to_string())
}

fn offer_export(ivp: &LigandExchangeIVP) -> Result<(), String> {
    print!("Save results to file? (y/n): ");
    io::stdout().flush().unwrap();

    let mut input = String::new();
    io::stdin().read_line(&mut input).unwrap();
    if !input.trim().eq_ignore_ascii_case("y") {
        return Ok(());
    }

    print!("File name (without extension): ");
    io::stdout().flush().unwrap();
    input.clear();
    io::stdin().read_line(&mut input).unwrap();
    let stem = input.trim();
    if stem.is_empty() {
        return Err("Empty file name".to_string());
    }

    let reduced = ivp.reduced_trajectory().map_err(|e| e.to_string())?;
    let extended = ivp.extended_trajectory().map_err(|e| e.to_string())?;
    save_trajectories_to_file(&format!("{}.tsv", stem), reduced, extended)?;
    let cfg = ivp.config().ok_or("No configuration to save".to_string())?;
    save_config_to_file(&format!("{}.json", stem), cfg)?;
    println!("Saved {stem}.tsv and {stem}.json");
    Ok(())
}
