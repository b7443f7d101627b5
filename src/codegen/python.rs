//! Python ctypes emitter.
//!
//! Renders the whole dynamic interface as one module: enum value groups,
//! empty `Structure` placeholders for the opaque handles, and a declarative
//! argtypes/restype table per function. Functions returning a plain status
//! code get the shared `_check` hook attached, so every call raises on a
//! non-zero status instead of returning it.

use std::fmt::Write;

use crate::ir::naming::MSH_HANDLE_TYPES;
use crate::ir::{CType, Extent, Interface, Primitive};

const PREAMBLE: &str = "\
# =========================================================================== #
# !!!! AUTO-GENERATED FILE !!!! Do not edit !!!!
#
# ctypes interface to the meshly library, generated from its C API header by
# msh-bindgen. Change the header or the generator, never this file.
# =========================================================================== #
'''
Foreign function interface declaration for the Python interface to meshly
'''

import sys

from numpy.ctypeslib import ndpointer
import numpy as np
from ctypes import *

from .errors import _check
from .find_meshly import find_meshly

c_lib = find_meshly()
";

pub fn render_ffi(interface: &Interface) -> String {
    let mut out = String::from(PREAMBLE);

    for def in &interface.enums {
        out.push('\n');
        out.push('\n');
        writeln!(out, "class {}(c_int):", def.name).unwrap();
        for (name, value) in def.resolved_values() {
            writeln!(out, "    {name} = {value}").unwrap();
        }
    }

    for handle in MSH_HANDLE_TYPES {
        out.push('\n');
        out.push('\n');
        writeln!(out, "class {handle}(Structure):").unwrap();
        writeln!(out, "    pass").unwrap();
    }

    for func in &interface.functions {
        let argtypes = func
            .args
            .iter()
            .map(|arg| type_to_python(&arg.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let restype = type_to_python(&func.ret);
        out.push('\n');
        writeln!(out, "# Function \"{}\", at {}", func.name, func.coord).unwrap();
        writeln!(out, "c_lib.{}.argtypes = [{argtypes}]", func.name).unwrap();
        writeln!(out, "c_lib.{}.restype = {restype}", func.name).unwrap();
        if restype == "c_int" {
            writeln!(out, "c_lib.{}.errcheck = _check", func.name).unwrap();
        }
    }

    out
}

fn type_to_python(ty: &CType) -> String {
    match ty {
        CType::CStr { .. } => "c_char_p".to_string(),
        CType::Array { prim, dims, .. } => {
            let mut descriptor = format!(
                "ndpointer(np.{}, flags=\"C_CONTIGUOUS\", ndim={}",
                numpy_dtype(*prim),
                dims.len()
            );
            if dims.iter().all(|d| matches!(d, Extent::Fixed(_))) {
                let shape = dims
                    .iter()
                    .map(|d| match d {
                        Extent::Fixed(n) => n.to_string(),
                        Extent::Runtime => unreachable!("checked all-fixed above"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(descriptor, ", shape=({shape})").unwrap();
            }
            descriptor.push(')');
            descriptor
        }
        CType::Handle { name, .. } => format!("POINTER({name})"),
        CType::Enum { is_ptr, .. } => wrap_pointer("c_int", *is_ptr),
        CType::Scalar { prim, is_ptr, .. } => wrap_pointer(ctypes_name(*prim), *is_ptr),
    }
}

fn wrap_pointer(name: &str, is_ptr: bool) -> String {
    if is_ptr {
        format!("POINTER({name})")
    } else {
        name.to_string()
    }
}

fn ctypes_name(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Float => "c_float",
        Primitive::Double => "c_double",
        Primitive::SizeT => "c_size_t",
        Primitive::Int => "c_int",
        Primitive::Bool => "c_bool",
    }
}

fn numpy_dtype(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Float => "float32",
        Primitive::Double => "float64",
        Primitive::SizeT => "uintp",
        Primitive::Int => "int32",
        Primitive::Bool => "bool_",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;
    use crate::parser::parse_header;

    fn render(source: &str) -> String {
        let ast = parse_header(source, "meshly.h").expect("parsing failed");
        render_ffi(&ir::extract(&ast).expect("extraction failed"))
    }

    #[test]
    fn status_returns_attach_the_errcheck_hook() {
        let ffi = render("int msh_mesh_point_count(const MSH_MESH* mesh, size_t* n);");
        assert!(ffi.contains(
            "c_lib.msh_mesh_point_count.argtypes = [POINTER(MSH_MESH), POINTER(c_size_t)]"
        ));
        assert!(ffi.contains("c_lib.msh_mesh_point_count.restype = c_int"));
        assert!(ffi.contains("c_lib.msh_mesh_point_count.errcheck = _check"));
    }

    #[test]
    fn constructors_and_strings_have_no_errcheck() {
        let ffi = render(
            "MSH_SCENE* msh_open(const char* path, const char* mode);\n\
             const char* msh_last_error();",
        );
        assert!(ffi.contains("c_lib.msh_open.argtypes = [c_char_p, c_char_p]"));
        assert!(ffi.contains("c_lib.msh_open.restype = POINTER(MSH_SCENE)"));
        assert!(!ffi.contains("c_lib.msh_open.errcheck"));
        assert!(ffi.contains("c_lib.msh_last_error.restype = c_char_p"));
        assert!(!ffi.contains("c_lib.msh_last_error.errcheck"));
    }

    #[test]
    fn arrays_declare_shape_only_when_static() {
        let ffi = render(
            "int msh_mesh_set_points(MSH_MESH* mesh, float (*points)[3], size_t n);\n\
             int msh_camera_matrix(const MSH_CAMERA* camera, double mat[3][3]);",
        );
        assert!(ffi.contains("ndpointer(np.float32, flags=\"C_CONTIGUOUS\", ndim=2)"));
        assert!(ffi.contains("ndpointer(np.float64, flags=\"C_CONTIGUOUS\", ndim=2, shape=(3, 3))"));
    }

    #[test]
    fn enums_and_handles_render_as_value_groups_and_placeholders() {
        let ffi = render("typedef enum MSH_WINDING { CW = 5, CCW } msh_winding_t;");
        assert!(ffi.contains("class MSH_WINDING(c_int):"));
        assert!(ffi.contains("    CW = 5"));
        assert!(ffi.contains("    CCW = 0"));
        assert!(ffi.contains("class MSH_SCENE(Structure):"));
        assert!(ffi.contains("class MSH_CAMERA(Structure):"));
    }

    #[test]
    fn function_comments_carry_source_coordinates() {
        let ffi = render("int msh_log_stderr(void);");
        assert!(ffi.contains("# Function \"msh_log_stderr\", at meshly.h:1"));
    }
}
