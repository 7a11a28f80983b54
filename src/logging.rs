//! Rank-aware logging setup.
//!
//! Adapted from the teacher's `mpi_log` module: a process-wide rank
//! number is stashed in an atomic so that log lines and the `maindbg!`
//! macro can be rank-prefixed (or root-only) without threading a rank
//! value through every call site.
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use log::LevelFilter;
use simplelog::ColorChoice;
use simplelog::CombinedLogger;
use simplelog::Config;
use simplelog::TermLogger;
use simplelog::TerminalMode;

pub static RANK: AtomicI32 = AtomicI32::new(0);

pub fn set_rank(rank: i32) {
    RANK.store(rank, Ordering::SeqCst);
}

pub fn rank() -> i32 {
    RANK.load(Ordering::SeqCst)
}

/// Initializes the term logger at the given verbosity. `verbosity` is
/// the number of repeated `-v` flags from the command line (0 = Warn,
/// 1 = Info, 2 = Debug, 3+ = Trace), mirroring the teacher's
/// `CommandLineOptions::verbosity` field.
pub fn init(rank: i32, verbosity: usize) {
    set_rank(rank);
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

/// Prints only on the root rank, regardless of log level. Used for the
/// collective orphan-tracker diagnostics of spec §7, which are
/// "printed on the root process only".
#[macro_export]
macro_rules! root_println {
    ($($arg:tt)*) => {
        if $crate::logging::rank() == 0 {
            println!($($arg)*);
        }
    };
}
