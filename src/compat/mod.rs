use tracing::debug;

/// Environment flag that tells the Intel OpenMP runtime to tolerate a second
/// copy of itself being loaded into the process.
///
/// The TensorFlow backend of the pretrained StarDist models links its own
/// OpenMP runtime; when a second copy arrives through the numerical stack the
/// process aborts unless this flag is set. The flag must be in place before
/// any of the native libraries are loaded.
pub const DUPLICATE_OMP_FLAG: &str = "KMP_DUPLICATE_LIB_OK";

/// Sets the duplicate-OpenMP-runtime flag for the current process.
///
/// Overwrites any prior value unconditionally. Call this first in `main`,
/// before settings are loaded or any model work starts.
pub fn allow_duplicate_omp_runtimes() {
    std::env::set_var(DUPLICATE_OMP_FLAG, "TRUE");
    debug!("{} set to TRUE", DUPLICATE_OMP_FLAG);
}
