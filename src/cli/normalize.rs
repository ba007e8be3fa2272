//! Normalize command - grow view boxes toward the target aspect ratio.

use anyhow::Result;

use crate::cli::common::load_session;
use crate::config::TinctConfig;
use crate::log;

/// Run the normalize command
pub fn run_normalize(config: &TinctConfig) -> Result<()> {
    let mut session = load_session(config, false)?;

    let mut changed = 0;
    for name in session.file_names() {
        match session.fix_aspect(&name) {
            Ok(true) => {
                log!("normalize"; "{name}");
                changed += 1;
            }
            Ok(false) => {}
            Err(e) => log!("error"; "{name}: {e}"),
        }
    }

    if changed == 0 {
        log!(
            "normalize";
            "all view boxes within {:.0}% of {}",
            session.options().ratio_tolerance * 100.0,
            session.options().target_ratio
        );
    } else {
        log!("normalize"; "adjusted {changed} documents");
    }
    Ok(())
}
