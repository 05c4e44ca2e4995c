// src/utils/env.rs
use std::path::PathBuf;

/// Loads variables from a `.env` file in the working directory or any
/// parent, if one exists. Variables already set in the process win.
///
/// Runs before the logger is initialised so that `RUST_LOG` can come from
/// the file; callers log the returned path themselves.
pub fn load_env() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_env_keeps_process_variables() {
        std::env::set_var("OPPORTUNITY_MATCHING_ENV_TEST", "process");
        load_env();
        assert_eq!(std::env::var("OPPORTUNITY_MATCHING_ENV_TEST").unwrap(), "process");

        // Cleanup
        std::env::remove_var("OPPORTUNITY_MATCHING_ENV_TEST");
    }
}
