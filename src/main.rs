//! CLI entry point (spec's ambient A3), adapted from the teacher's
//! `main.rs`: parse options, load the parameter file, bring up the
//! communicator for the active feature set, then drive every snapshot
//! transition in order.
use std::process::ExitCode;

use clap::Parser;
use mergertree::catalog::AsciiCatalogReader;
use mergertree::cli::CommandLineOptions;
use mergertree::logging;
use mergertree::output::write_step;
use mergertree::parameters::RunMode;
use mergertree::parameters::RuntimeConfig;
use mergertree::snapshot_driver::SnapshotDriver;
use mergertree::snapshot_index::SnapshotIndex;
use mergertree::snapshot_index::TableSnapshotIndex;

#[cfg(feature = "local")]
fn bootstrap_communicator() -> mergertree::communication::Communicator<mergertree::buffer_exchange::BufferEntry> {
    mergertree::communication::get_local_communicators(1).pop().expect("size-1 communicator mesh is never empty")
}

#[cfg(not(feature = "local"))]
fn bootstrap_communicator() -> mergertree::communication::MpiBufferWorld {
    mergertree::communication::MpiBufferWorld::new()
}

fn rank_of<C: mergertree::communication::SizedCommunicator>(communicator: &C) -> i32 {
    communicator.rank()
}

fn run() -> mergertree::error::Result<()> {
    let options = CommandLineOptions::parse();
    let config = RuntimeConfig::from_file(&options.parameter_file, &options.parameter_overrides)?;

    let communicator = bootstrap_communicator();
    let rank = rank_of(&communicator);
    logging::init(rank, options.verbosity);

    let index_path = std::path::Path::new(&config.path_input).join("snapshot_index.txt");
    let index_contents = std::fs::read_to_string(&index_path).map_err(|_| mergertree::error::MergerTreeError::MissingRequiredCatalog {
        path: index_path.clone(),
    })?;
    let index = TableSnapshotIndex::from_table_str(&index_contents)?;

    // runMode 1 (read-precomputed) skips the match/clean/orphan pipeline
    // entirely and trusts the tree files a prior compute run already
    // wrote; runMode 2 (hybrid) still runs the full pipeline here, since
    // the source's hybrid/compute split is only a particle-map reuse
    // optimization around `ShiftHalosPartsGrids`, not a difference in
    // what gets computed.
    if matches!(config.run_mode, RunMode::ReadPrecomputed) {
        for step in 1..index.snapshots().len() {
            let out_path = format!("tree.{step:03}.out");
            if !std::path::Path::new(&out_path).exists() {
                return Err(mergertree::error::MergerTreeError::MissingRequiredCatalog { path: out_path.into() });
            }
            mergertree::root_println!("step {}: using precomputed {}", step, out_path);
        }
        return Ok(());
    }

    let reader = AsciiCatalogReader {
        path_input: config.path_input.clone(),
        halo_prefix: config.halo_prefix.clone(),
        halo_suffix: config.halo_suffix.clone(),
        part_suffix: config.part_suffix.clone(),
        n_ptypes: config.n_ptypes,
    };

    let mut driver = SnapshotDriver::new(config, reader, communicator);
    let all_records = driver.run(index.snapshots())?;

    for (step, records) in all_records.iter().enumerate() {
        let out_path = format!("tree.{:03}.out", step + 1);
        let file = std::fs::File::create(&out_path).map_err(|e| mergertree::error::MergerTreeError::InvariantViolation {
            detail: format!("could not write {out_path}: {e}"),
        })?;
        write_step(file, records).map_err(|e| mergertree::error::MergerTreeError::InvariantViolation {
            detail: format!("could not write {out_path}: {e}"),
        })?;
        mergertree::root_println!("step {}: wrote {} descendant record(s) to {}", step + 1, records.len(), out_path);
    }

    #[cfg(not(feature = "local"))]
    mergertree::communication::MPI_UNIVERSE.finalize();

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
