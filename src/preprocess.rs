//! Header preprocessing through an external C preprocessor.
//!
//! The generator never parses raw headers: the configured preprocessor
//! expands includes and macros first, and the parser only ever sees the
//! resulting translation unit. Two shim headers shadow `stddef.h` and
//! `stdbool.h` so that a hosted toolchain's system headers cannot leak
//! declarations outside the modeled C subset into the parse.

use anyhow::{bail, Context, Result};
use std::fs;
use std::process::Command;

use crate::config::Config;

const STDDEF_SHIM: &str = include_str!("../shims/stddef.h");
const STDBOOL_SHIM: &str = include_str!("../shims/stdbool.h");

/// Run the preprocessor over the configured header and return the expanded
/// translation unit.
pub fn preprocess(config: &Config) -> Result<String> {
    let shims = tempfile::tempdir().context("failed to create the shim include directory")?;
    fs::write(shims.path().join("stddef.h"), STDDEF_SHIM)
        .context("failed to write the stddef.h shim")?;
    fs::write(shims.path().join("stdbool.h"), STDBOOL_SHIM)
        .context("failed to write the stdbool.h shim")?;

    let mut command = Command::new(&config.cpp);
    command.arg("-E").arg("-I").arg(shims.path());
    for include in &config.includes {
        command.arg("-I").arg(include);
    }
    for define in &config.defines {
        command.arg(format!("-D{}={}", define.name, define.value));
    }
    command.arg(&config.header);

    let output = command
        .output()
        .with_context(|| format!("failed to run the C preprocessor `{}`", config.cpp))?;
    if !output.status.success() {
        bail!(
            "preprocessing {} failed with {}:\n{}",
            config.header.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    String::from_utf8(output.stdout).context("the preprocessor produced non UTF-8 output")
}
