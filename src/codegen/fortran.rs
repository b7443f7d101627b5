//! Fortran 2003 ISO-C-binding emitter.
//!
//! Renders four include files: the enum blocks (`cenums.f90`), the raw
//! `bind(C)` declarations (`cdef.f90`), the type-bound procedure tables
//! (`ftypes.f90`) and the human-callable wrappers (`interface.f90`). The
//! wrappers rely on three support routines provided by the hand-written
//! part of the Fortran package: `f_to_c_str`, `c_to_f_str` and
//! `rm_c_null_in_str`.

use std::fmt::Write;

use super::fortran_type_name;
use crate::ir::naming::MSH_HANDLE_TYPES;
use crate::ir::{Argument, Binding, CType, EnumRegistry, Extent, FunctionSignature, Interface, Primitive};

/// Capacity of the character buffers returned by string-returning wrappers;
/// the C side is free to return anything shorter.
const STRING_LENGTH: usize = 1024;

const BANNER: &str = "\
! =========================================================================== !
! !!!! AUTO-GENERATED FILE !!!! Do not edit !!!!
!
! Fortran 2003 ISO C binding interface to the meshly library, generated from
! its C API header by msh-bindgen. Change the header or the generator, never
! this file.
!
! This file is not compilable on its own, but should be 'include'd in
! another fortran compilation unit.
! =========================================================================== !
";

pub fn render_enums(interface: &Interface) -> String {
    let mut out = String::from(BANNER);
    for def in &interface.enums {
        out.push('\n');
        writeln!(out, "enum, bind(C)").unwrap();
        for (name, value) in def.resolved_values() {
            writeln!(out, "    enumerator :: {name} = {value}").unwrap();
        }
        writeln!(out, "    ! Enumeration name:").unwrap();
        writeln!(out, "    enumerator :: {}", def.name).unwrap();
        writeln!(out, "end enum").unwrap();
    }
    out
}

pub fn render_cdef(interface: &Interface) -> String {
    let mut out = String::from(BANNER);
    out.push_str("interface\n");
    for func in &interface.functions {
        out.push('\n');
        writeln!(out, "! Function \"{}\", at {}", func.name, func.coord).unwrap();
        let args = func
            .args
            .iter()
            .map(|arg| arg.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(
            out,
            "function {name}_c({args}) bind(C, name=\"{name}\")",
            name = func.name
        )
        .unwrap();
        writeln!(out, "    use iso_c_binding").unwrap();
        writeln!(out, "    implicit none").unwrap();
        writeln!(out, "    {} :: {}_c", c_return_type(func), func.name).unwrap();
        for arg in &func.args {
            writeln!(out, "    {} :: {}", cdef_type(&arg.ty), arg.name).unwrap();
        }
        writeln!(out, "end function").unwrap();
    }
    out.push_str("\nend interface\n");
    out
}

pub fn render_types(interface: &Interface) -> String {
    let mut out = String::from(BANNER);
    for handle in MSH_HANDLE_TYPES {
        let procedures: Vec<(String, String)> = interface
            .functions
            .iter()
            .filter_map(|func| match func.binding() {
                Binding::Method { owner, member } if owner == handle => {
                    Some((member, wrapper_name(func)))
                }
                _ => None,
            })
            .collect();
        if procedures.is_empty() {
            continue;
        }
        out.push('\n');
        writeln!(out, "type {}", fortran_type_name(handle)).unwrap();
        writeln!(out, "    private").unwrap();
        writeln!(out, "    type(c_ptr) :: ptr").unwrap();
        writeln!(out, "contains").unwrap();
        for (member, target) in procedures {
            writeln!(out, "    procedure :: {member} => {target}").unwrap();
        }
        writeln!(out, "end type").unwrap();
    }
    out
}

pub fn render_interface(interface: &Interface) -> String {
    let mut out = String::from(BANNER);
    for func in &interface.functions {
        out.push('\n');
        if func.returns_string() {
            render_string_function(&mut out, func, &interface.registry);
        } else {
            render_subroutine(&mut out, func, &interface.registry);
        }
    }
    out
}

/// String-returning functions cannot follow the status-code wrapper model:
/// they are rendered as functions returning a fixed-capacity buffer.
fn render_string_function(out: &mut String, func: &FunctionSignature, registry: &EnumRegistry) {
    let args = func
        .args
        .iter()
        .map(|arg| arg.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(out, "function {}({args}) result(string)", func.name).unwrap();
    writeln!(out, "    implicit none").unwrap();
    for arg in &func.args {
        writeln!(out, "    {} :: {}", interface_type(&arg.ty, registry), arg.name).unwrap();
    }
    writeln!(out, "    character(len={STRING_LENGTH}) :: string").unwrap();
    writeln!(out, "    type(c_ptr) :: c_string").unwrap();
    writeln!(out).unwrap();
    writeln!(out, "    c_string = {}_c({args})", func.name).unwrap();
    writeln!(out, "    string = c_to_f_str(c_string)").unwrap();
    writeln!(out, "end function").unwrap();
}

fn render_subroutine(out: &mut String, func: &FunctionSignature, registry: &EnumRegistry) {
    let mut args = func.args.clone();
    if let CType::Handle { name: owner, .. } = func.ret {
        // The constructed object becomes an output receiver.
        args.insert(
            0,
            Argument {
                name: "this".to_string(),
                ty: CType::Handle {
                    name: owner,
                    is_ptr: true,
                    is_const: false,
                },
            },
        );
    } else if let Some(first) = args.first_mut() {
        if matches!(first.ty, CType::Handle { .. }) {
            first.name = "this".to_string();
        }
    }

    let mut names = args.iter().map(|arg| arg.name.clone()).collect::<Vec<_>>();
    names.push("status".to_string());
    writeln!(out, "subroutine {}({})", wrapper_name(func), names.join(", ")).unwrap();
    writeln!(out, "    implicit none").unwrap();
    if args.iter().any(|arg| matches!(arg.ty, CType::Enum { .. })) {
        writeln!(out, "    include \"cenums.f90\"").unwrap();
    }
    for arg in &args {
        writeln!(out, "    {} :: {}", interface_type(&arg.ty, registry), arg.name).unwrap();
    }
    writeln!(out, "    integer, optional :: status").unwrap();
    writeln!(out, "    integer :: status_tmp_").unwrap();
    writeln!(out).unwrap();

    if func.is_constructor() {
        writeln!(
            out,
            "    this%ptr = {}_c({})",
            func.name,
            call_arguments(&args[1..])
        )
        .unwrap();
        writeln!(out).unwrap();
        writeln!(out, "    if (.not. c_associated(this%ptr)) then").unwrap();
        writeln!(out, "        status_tmp_ = -1").unwrap();
        writeln!(out, "    else").unwrap();
        writeln!(out, "        status_tmp_ = 0").unwrap();
        writeln!(out, "    end if").unwrap();
    } else {
        writeln!(
            out,
            "    status_tmp_ = {}_c({})",
            func.name,
            call_arguments(&args)
        )
        .unwrap();
    }

    writeln!(out, "    if (present(status)) then").unwrap();
    writeln!(out, "        status = status_tmp_").unwrap();
    writeln!(out, "    end if").unwrap();
    for arg in &args {
        if matches!(arg.ty, CType::CStr { is_const: false }) {
            writeln!(out, "    {name} = rm_c_null_in_str({name})", name = arg.name).unwrap();
        }
    }
    writeln!(out, "end subroutine").unwrap();
}

pub fn wrapper_name(func: &FunctionSignature) -> String {
    if func.is_constructor() {
        format!("{}_init_", func.name)
    } else {
        func.name.clone()
    }
}

fn c_return_type(func: &FunctionSignature) -> &'static str {
    if func.ret.is_ptr() {
        "type(c_ptr)"
    } else {
        "integer(kind=c_int)"
    }
}

/// Marshal wrapper arguments into the C call: handles unwrap to their
/// stored pointer, arrays pass their address, const strings are converted
/// to C representation.
fn call_arguments(args: &[Argument]) -> String {
    args.iter()
        .map(|arg| match &arg.ty {
            CType::CStr { is_const: true } => format!("f_to_c_str({})", arg.name),
            CType::Array { .. } => format!("c_loc({})", arg.name),
            CType::Handle { .. } => format!("{}%ptr", arg.name),
            _ => arg.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Declaration of one argument in the raw `bind(C)` interface.
fn cdef_type(ty: &CType) -> String {
    let mut decl = match ty {
        CType::Scalar { prim, .. } => prim_fortran(*prim).to_string(),
        CType::Enum { .. } => "integer(kind=c_int)".to_string(),
        CType::Handle { .. } | CType::Array { .. } => "type(c_ptr), value".to_string(),
        CType::CStr { .. } => "character(len=1, kind=c_char), dimension(*)".to_string(),
    };
    if !ty.is_ptr() {
        decl.push_str(", value");
    }
    if ty.is_const() {
        decl.push_str(", intent(in)");
    }
    decl
}

/// Declaration of one argument in the human-callable wrappers.
fn interface_type(ty: &CType, registry: &EnumRegistry) -> String {
    let mut decl = match ty {
        CType::Scalar { prim, .. } => prim_fortran(*prim).to_string(),
        CType::Enum { name, .. } => {
            let emitted = registry.emitted_name(name).unwrap_or(name);
            format!("integer(kind=kind({emitted}))")
        }
        CType::Handle { name, .. } => format!("class({})", fortran_type_name(name)),
        CType::CStr { .. } => "character(len=*)".to_string(),
        CType::Array { prim, dims, is_const } => {
            let mut decl = prim_fortran(*prim).to_string();
            if *is_const {
                decl.push_str(", intent(in)");
            }
            let extents = if dims.iter().any(|d| matches!(d, Extent::Runtime)) {
                dims.iter().map(|_| ":".to_string()).collect::<Vec<_>>()
            } else {
                dims.iter()
                    .map(|d| match d {
                        Extent::Fixed(n) => n.to_string(),
                        Extent::Runtime => unreachable!("mixed extents are all-colon"),
                    })
                    .collect::<Vec<_>>()
            };
            decl.push_str(&format!(", dimension({}), target", extents.join(", ")));
            return decl;
        }
    };
    if !ty.is_ptr() {
        decl.push_str(", value");
    }
    if ty.is_const() {
        decl.push_str(", intent(in)");
    }
    decl
}

fn prim_fortran(prim: Primitive) -> &'static str {
    match prim {
        Primitive::Float => "real(kind=c_float)",
        Primitive::Double => "real(kind=c_double)",
        Primitive::SizeT => "integer(kind=c_size_t)",
        Primitive::Int => "integer(kind=c_int)",
        Primitive::Bool => "logical(kind=c_bool)",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;
    use crate::parser::parse_header;

    fn interface_from(source: &str) -> Interface {
        let ast = parse_header(source, "meshly.h").expect("parsing failed");
        ir::extract(&ast).expect("extraction failed")
    }

    #[test]
    fn cdef_binds_to_the_native_symbol() {
        let iface = interface_from("int msh_mesh_point_count(const MSH_MESH* mesh, size_t* n);");
        let cdef = render_cdef(&iface);
        assert!(cdef.contains(
            "function msh_mesh_point_count_c(mesh, n) bind(C, name=\"msh_mesh_point_count\")"
        ));
        assert!(cdef.contains("type(c_ptr), value, intent(in) :: mesh"));
        assert!(cdef.contains("integer(kind=c_size_t) :: n"));
        assert!(cdef.contains("integer(kind=c_int) :: msh_mesh_point_count_c"));
    }

    #[test]
    fn wrappers_append_the_optional_status() {
        let iface = interface_from("int msh_mesh_point_count(const MSH_MESH* mesh, size_t* n);");
        let wrappers = render_interface(&iface);
        assert!(wrappers.contains("subroutine msh_mesh_point_count(this, n, status)"));
        assert!(wrappers.contains("integer, optional :: status"));
        assert!(wrappers.contains("status_tmp_ = msh_mesh_point_count_c(this%ptr, n)"));
        assert!(wrappers.contains("if (present(status)) then"));
    }

    #[test]
    fn constructors_fill_the_receiver_and_check_for_null() {
        let iface = interface_from("MSH_MESH* msh_mesh(size_t points);");
        let wrappers = render_interface(&iface);
        assert!(wrappers.contains("subroutine msh_mesh_init_(this, points, status)"));
        assert!(wrappers.contains("class(msh_mesh) :: this"));
        assert!(wrappers.contains("this%ptr = msh_mesh_c(points)"));
        assert!(wrappers.contains("if (.not. c_associated(this%ptr)) then"));
    }

    #[test]
    fn string_returns_use_a_fixed_buffer() {
        let iface = interface_from("const char* msh_strerror(int status);");
        let wrappers = render_interface(&iface);
        assert!(wrappers.contains("function msh_strerror(status) result(string)"));
        assert!(wrappers.contains("character(len=1024) :: string"));
        assert!(wrappers.contains("string = c_to_f_str(c_string)"));
        assert!(!wrappers.contains("subroutine msh_strerror"));
    }

    #[test]
    fn array_extents_render_per_declaration() {
        let iface = interface_from(
            "int msh_mesh_set_points(MSH_MESH* mesh, float (*points)[3], size_t n);\n\
             int msh_camera_matrix(const MSH_CAMERA* camera, double mat[3][3]);",
        );
        let wrappers = render_interface(&iface);
        assert!(wrappers
            .contains("real(kind=c_float), dimension(:, :), target :: points"));
        assert!(wrappers
            .contains("real(kind=c_double), dimension(3, 3), target :: mat"));
        assert!(wrappers.contains("c_loc(points)"));
    }

    #[test]
    fn method_tables_bind_members_in_handle_order() {
        let iface = interface_from(
            "MSH_SCENE* msh_open(const char* path, const char* mode);\n\
             int msh_scene_mesh_count(const MSH_SCENE* scene, size_t* n);\n\
             MSH_MESH* msh_mesh(size_t points);",
        );
        let types = render_types(&iface);
        let scene = types.find("type msh_scene").expect("scene type missing");
        let mesh = types.find("type msh_mesh").expect("mesh type missing");
        assert!(scene < mesh, "handle tables must follow the fixed set order");
        assert!(types.contains("procedure :: open => msh_open_init_"));
        assert!(types.contains("procedure :: mesh_count => msh_scene_mesh_count"));
        assert!(types.contains("procedure :: init => msh_mesh_init_"));
        assert!(!types.contains("type msh_node"), "empty tables are omitted");
    }

    #[test]
    fn enum_arguments_reference_the_native_kind() {
        let iface = interface_from(
            "typedef enum MSH_LOG_LEVEL { SILENT } msh_log_level_t;\n\
             int msh_loglevel(msh_log_level_t level);",
        );
        let wrappers = render_interface(&iface);
        assert!(wrappers.contains("include \"cenums.f90\""));
        assert!(wrappers.contains("integer(kind=kind(MSH_LOG_LEVEL)), value :: level"));
    }

    #[test]
    fn enum_blocks_carry_explicit_gap_filled_values() {
        let iface = interface_from("enum MSH_WINDING { CLOCKWISE = 5, COUNTER_CLOCKWISE };");
        let enums = render_enums(&iface);
        assert!(enums.contains("enumerator :: CLOCKWISE = 5"));
        assert!(enums.contains("enumerator :: COUNTER_CLOCKWISE = 0"));
        assert!(enums.contains("enumerator :: MSH_WINDING"));
    }
}
