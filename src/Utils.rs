/// Saving simulation results: tab-separated trajectory tables readable by
/// spreadsheet and plotting software, and JSON dumps of the run
/// configuration for reproducibility.
pub mod save_to_file;
