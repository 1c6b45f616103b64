use crate::Kinetics::ligand_exchange_IVP::{ChelationConfig, Trajectory};
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes both trajectories into one tab-separated table with a header row.
/// Columns: time, free iron and bound iron of each variant, FeEDTA of the
/// extended variant. Readable by spreadsheet and plotting software.
pub fn save_trajectories_to_file(
    file_name: &str,
    reduced: &Trajectory,
    extended: &Trajectory,
) -> Result<(), String> {
    if reduced.len() != extended.len() {
        return Err(format!(
            "trajectory lengths differ: {} vs {}",
            reduced.len(),
            extended.len()
        ));
    }
    let fe_edta = extended
        .reference_complex
        .as_ref()
        .ok_or_else(|| "extended trajectory is missing the FeEDTA column".to_string())?;

    let file = File::create(Path::new(file_name))
        .map_err(|e| format!("Failed to create file '{}': {}", file_name, e))?;
    let mut writer = BufWriter::new(file);

    writeln!(
        writer,
        "t_hr\tFe_prime_2eq_M\tFeL_2eq_M\tFe_prime_3eq_M\tFeL_3eq_M\tFeEDTA_M"
    )
    .map_err(|e| format!("Failed to write to file '{}': {}", file_name, e))?;

    for k in 0..reduced.len() {
        writeln!(
            writer,
            "{:.6}\t{:.10e}\t{:.10e}\t{:.10e}\t{:.10e}\t{:.10e}",
            reduced.time[k],
            reduced.free_iron[k],
            reduced.bound_iron[k],
            extended.free_iron[k],
            extended.bound_iron[k],
            fe_edta[k]
        )
        .map_err(|e| format!("Failed to write to file '{}': {}", file_name, e))?;
    }
    writer
        .flush()
        .map_err(|e| format!("Failed to flush file '{}': {}", file_name, e))?;

    info!(
        "saved {} trajectory rows to file '{}'",
        reduced.len(),
        file_name
    );
    Ok(())
}

/// Dumps the run configuration as pretty JSON next to the data, so a saved
/// table can always be traced back to its parameters.
pub fn save_config_to_file(file_name: &str, cfg: &ChelationConfig) -> Result<(), String> {
    let json = serde_json::to_string_pretty(cfg)
        .map_err(|e| format!("Failed to serialize configuration: {}", e))?;
    let mut file = File::create(Path::new(file_name))
        .map_err(|e| format!("Failed to create file '{}': {}", file_name, e))?;
    file.write_all(json.as_bytes())
        .map_err(|e| format!("Failed to write to file '{}': {}", file_name, e))?;
    info!("saved run configuration to file '{}'", file_name);
    Ok(())
}

/////////////////////////////////////////TESTS/////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::Kinetics::ligand_base::LigandId;
    use std::io::Read;
    use tempfile::NamedTempFile;

    fn toy_trajectories() -> (Trajectory, Trajectory) {
        let reduced = Trajectory {
            time: vec![0.0, 1.0, 2.0],
            free_iron: vec![0.0, 1.0e-10, 2.0e-10],
            bound_iron: vec![0.0, 5.0e-9, 9.0e-9],
            reference_complex: None,
        };
        let extended = Trajectory {
            time: vec![0.0, 1.0, 2.0],
            free_iron: vec![0.0, 0.9e-10, 1.8e-10],
            bound_iron: vec![0.0, 4.9e-9, 8.8e-9],
            reference_complex: Some(vec![1.0e-7, 0.99e-7, 0.98e-7]),
        };
        (reduced, extended)
    }

    #[test]
    fn test_save_trajectories() {
        let (reduced, extended) = toy_trajectories();
        let temp_file = NamedTempFile::new().unwrap();
        let file_path = temp_file.path().to_str().unwrap();

        let result = save_trajectories_to_file(file_path, &reduced, &extended);
        assert!(result.is_ok());

        let mut content = String::new();
        temp_file.reopen().unwrap().read_to_string(&mut content).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // header + 3 data rows
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("t_hr\t"));
        assert_eq!(lines[0].split('\t').count(), 6);
        assert!(lines[1].starts_with("0.000000\t"));
        assert!(lines[2].contains("5.0000000000e-9") || lines[2].contains("5e-9"));
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let (reduced, mut extended) = toy_trajectories();
        extended.time.pop();
        extended.free_iron.pop();
        extended.bound_iron.pop();
        let temp_file = NamedTempFile::new().unwrap();
        let result =
            save_trajectories_to_file(temp_file.path().to_str().unwrap(), &reduced, &extended);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("lengths differ"));
    }

    #[test]
    fn test_missing_reference_column_rejected() {
        let (reduced, mut extended) = toy_trajectories();
        extended.reference_complex = None;
        let temp_file = NamedTempFile::new().unwrap();
        let result =
            save_trajectories_to_file(temp_file.path().to_str().unwrap(), &reduced, &extended);
        assert!(result.is_err());
    }

    #[test]
    fn test_save_config_round_trip() {
        let cfg = ChelationConfig::from_ligand(LigandId::Enterobactin, 50.0e-9);
        let temp_file = NamedTempFile::new().unwrap();
        let file_path = temp_file.path().to_str().unwrap();

        assert!(save_config_to_file(file_path, &cfg).is_ok());

        let mut content = String::new();
        temp_file.reopen().unwrap().read_to_string(&mut content).unwrap();
        let parsed: ChelationConfig = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_unwritable_path_is_reported() {
        let (reduced, extended) = toy_trajectories();
        let result =
            save_trajectories_to_file("/no/such/dir/output.tsv", &reduced, &extended);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to create file"));
    }
}
