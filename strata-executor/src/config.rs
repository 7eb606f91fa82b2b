//! Environment knobs.
//!
//! All knobs are integers; a missing, zero, or unparseable value falls back
//! to the default.

/// Probe rows handed to a worker per fetch of the chunk counter.
pub const PROBE_CHUNK_ROWS: usize = 1984;

/// Baseline worker count when no knob overrides it.
pub(crate) const DEFAULT_THREAD_COUNT: usize = 4;

/// Builds below this many rows always run single-threaded.
pub(crate) const SERIAL_BUILD_MAX: usize = 200_000;

/// Default minimum build-side rows for the partitioned build path.
pub(crate) const DEFAULT_THREADED_MIN_BUILD: usize = 600_000;

fn parse_positive(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|v| *v > 0)
}

fn env_positive(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| parse_positive(&v))
}

/// Baseline worker count: `SPC_FORCE_THREADS` when set, else
/// `SPC__THREAD_COUNT`, else the compiled default of 4.
pub fn baseline_threads() -> usize {
    env_positive("SPC_FORCE_THREADS")
        .or_else(|| env_positive("SPC__THREAD_COUNT"))
        .unwrap_or(DEFAULT_THREAD_COUNT)
}

/// Minimum build-side rows to enable the partitioned build
/// (`SPC_THREADED_MIN_BUILD`, default 600 000).
pub fn threaded_min_build() -> usize {
    env_positive("SPC_THREADED_MIN_BUILD").unwrap_or(DEFAULT_THREADED_MIN_BUILD)
}

/// How one join will run: worker count (equal to the partition count, a
/// power of two) and whether the partitioned build path is taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JoinStrategy {
    pub num_threads: usize,
    pub use_partitioned: bool,
}

/// Resolve the strategy for a build side of `build_size` rows given the
/// baseline thread count and partitioned-build threshold.
///
/// The baseline is rounded up to a power of two (workers and partitions are
/// the same count); small builds are forced single-threaded.
pub fn join_strategy_with(
    build_size: usize,
    baseline_threads: usize,
    threaded_min_build: usize,
) -> JoinStrategy {
    let mut num_threads = baseline_threads.max(1).next_power_of_two();
    if build_size < SERIAL_BUILD_MAX {
        num_threads = 1;
    }
    JoinStrategy {
        num_threads,
        use_partitioned: build_size >= threaded_min_build,
    }
}

/// [`join_strategy_with`] under the current environment knobs.
pub fn join_strategy(build_size: usize) -> JoinStrategy {
    join_strategy_with(build_size, baseline_threads(), threaded_min_build())
}
