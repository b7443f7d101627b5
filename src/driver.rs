//! Pipeline orchestration: preprocess, parse, extract, render, write.
//!
//! Rendering happens entirely in memory before the first file is touched,
//! and each file is moved into place atomically, so a failing run leaves
//! every output directory exactly as it found it.

use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use crate::codegen::{fortran, python, write_output};
use crate::config::Config;
use crate::diagnostics::{format_error, BindgenError};
use crate::ir::{self, Interface};
use crate::parser;
use crate::preprocess;

pub fn run(config: &Config) -> Result<()> {
    if config.targets.available().is_empty() {
        bail!("the manifest requests no targets; nothing to generate");
    }

    let source = preprocess::preprocess(config)?;
    let header_name = config
        .header
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| config.header.display().to_string());
    let interface = build_interface(&source, &header_name)?;

    let mut outputs: Vec<(PathBuf, String)> = Vec::new();
    if let Some(target) = &config.targets.fortran {
        let root = &target.output;
        outputs.push((root.join("cenums.f90"), fortran::render_enums(&interface)));
        outputs.push((root.join("cdef.f90"), fortran::render_cdef(&interface)));
        outputs.push((root.join("ftypes.f90"), fortran::render_types(&interface)));
        outputs.push((
            root.join("interface.f90"),
            fortran::render_interface(&interface),
        ));
    }
    if let Some(target) = &config.targets.python {
        outputs.push((target.output.join("ffi.py"), python::render_ffi(&interface)));
    }

    for (path, contents) in &outputs {
        write_output(path, contents)?;
    }
    Ok(())
}

/// Lex, parse and lower the preprocessed unit, turning pipeline errors into
/// source-anchored diagnostics.
pub fn build_interface(source: &str, header_name: &str) -> Result<Interface> {
    let ast = parser::parse_header(source, header_name)
        .map_err(|err| anyhow!(format_error(source, &err)))?;
    ir::extract(&ast)
        .map_err(|err| anyhow!(format_error(source, &BindgenError::from(err))))
}
