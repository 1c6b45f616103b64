pub mod cli_ligand_exchange_ivp;
pub mod cli_main;
