use msh_bindgen::codegen::{fortran, python, write_output};
use msh_bindgen::driver::build_interface;
use msh_bindgen::ir::{CType, Extent};

const SCENARIO_HEADER: &str = "\
typedef struct MSH_MESH MSH_MESH;
typedef enum MSH_COLOR { RED, GREEN, BLUE } msh_color_t;
MSH_MESH* msh_mesh();
int msh_mesh_set_color(MSH_MESH* mesh, msh_color_t color);
";

#[test]
fn end_to_end_scenario_produces_both_targets() {
    let interface = build_interface(SCENARIO_HEADER, "meshly.h").expect("pipeline failed");

    assert_eq!(interface.enums.len(), 1);
    assert_eq!(
        interface.enums[0].resolved_values(),
        vec![("RED", 0), ("GREEN", 1), ("BLUE", 2)]
    );
    assert!(interface.functions[0].is_constructor());
    assert_eq!(
        interface.functions[0].member_name().as_deref(),
        Some("init")
    );
    assert_eq!(
        interface.functions[1].member_name().as_deref(),
        Some("set_color")
    );

    let wrappers = fortran::render_interface(&interface);
    assert!(
        wrappers.contains("subroutine msh_mesh_init_(this, status)"),
        "constructor wrapper must expose only the receiver and the status:\n{wrappers}"
    );
    assert!(
        wrappers.contains("subroutine msh_mesh_set_color(this, color, status)"),
        "method wrapper must take an implicit receiver:\n{wrappers}"
    );

    let enums = fortran::render_enums(&interface);
    assert!(enums.contains("enumerator :: RED = 0"));
    assert!(enums.contains("enumerator :: GREEN = 1"));
    assert!(enums.contains("enumerator :: BLUE = 2"));

    let ffi = python::render_ffi(&interface);
    assert!(ffi.contains("class MSH_COLOR(c_int):"));
    assert!(ffi.contains("    BLUE = 2"));
    assert!(ffi.contains("c_lib.msh_mesh.restype = POINTER(MSH_MESH)"));
    assert!(ffi.contains("c_lib.msh_mesh_set_color.errcheck = _check"));
}

#[test]
fn gap_filling_ignores_explicit_values_elsewhere_in_the_enum() {
    let interface = build_interface(
        "enum MSH_AXIS { A = 5, B, C = 2, D };",
        "meshly.h",
    )
    .expect("pipeline failed");
    assert_eq!(
        interface.enums[0].resolved_values(),
        vec![("A", 5), ("B", 0), ("C", 2), ("D", 1)]
    );
}

#[test]
fn constructors_are_classified_by_return_type_alone() {
    let interface = build_interface(
        "typedef struct MSH_CAMERA MSH_CAMERA;\nMSH_CAMERA* msh_make_default_camera();",
        "meshly.h",
    )
    .expect("pipeline failed");
    let func = &interface.functions[0];
    assert!(func.is_constructor(), "the name does not matter here");
    assert_eq!(func.owning_type(), Some("MSH_CAMERA"));
}

#[test]
fn status_parameter_exists_only_on_the_fortran_side() {
    let interface = build_interface(
        "int msh_mesh_point_count(const MSH_MESH* mesh, size_t* n);",
        "meshly.h",
    )
    .expect("pipeline failed");

    let wrappers = fortran::render_interface(&interface);
    assert!(wrappers.contains("subroutine msh_mesh_point_count(this, n, status)"));
    assert!(wrappers.contains("integer, optional :: status"));

    let ffi = python::render_ffi(&interface);
    assert!(!ffi.contains("status"), "ctypes tables carry no extra parameter");
    assert!(ffi.contains("c_lib.msh_mesh_point_count.errcheck = _check"));
}

#[test]
fn array_dimensions_render_consistently_across_targets() {
    let interface = build_interface(
        "int msh_mesh_set_points(MSH_MESH* mesh, double (*points)[3], size_t n);\n\
         int msh_camera_matrix(const MSH_CAMERA* camera, double mat[3][3]);",
        "meshly.h",
    )
    .expect("pipeline failed");

    match &interface.functions[0].args[1].ty {
        CType::Array { dims, .. } => {
            assert_eq!(dims.as_slice(), &[Extent::Runtime, Extent::Fixed(3)])
        }
        other => panic!("expected an array, got {other:?}"),
    }

    let wrappers = fortran::render_interface(&interface);
    assert!(wrappers.contains("real(kind=c_double), dimension(:, :), target :: points"));
    assert!(wrappers.contains("real(kind=c_double), dimension(3, 3), target :: mat"));

    let ffi = python::render_ffi(&interface);
    assert!(ffi.contains("ndpointer(np.float64, flags=\"C_CONTIGUOUS\", ndim=2)"));
    assert!(ffi.contains("ndpointer(np.float64, flags=\"C_CONTIGUOUS\", ndim=2, shape=(3, 3))"));
}

#[test]
fn regeneration_is_byte_identical() {
    let first = build_interface(SCENARIO_HEADER, "meshly.h").expect("pipeline failed");
    let second = build_interface(SCENARIO_HEADER, "meshly.h").expect("pipeline failed");

    assert_eq!(
        fortran::render_enums(&first),
        fortran::render_enums(&second)
    );
    assert_eq!(fortran::render_cdef(&first), fortran::render_cdef(&second));
    assert_eq!(
        fortran::render_types(&first),
        fortran::render_types(&second)
    );
    assert_eq!(
        fortran::render_interface(&first),
        fortran::render_interface(&second)
    );
    assert_eq!(python::render_ffi(&first), python::render_ffi(&second));
}

#[test]
fn outputs_are_written_atomically() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("generated").join("ffi.py");

    let interface = build_interface(SCENARIO_HEADER, "meshly.h").expect("pipeline failed");
    let rendered = python::render_ffi(&interface);
    write_output(&path, &rendered).expect("first write failed");
    write_output(&path, &rendered).expect("rewrite failed");

    let on_disk = std::fs::read_to_string(&path).expect("reading output failed");
    assert_eq!(on_disk, rendered);
    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .expect("listing output dir failed")
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec!["ffi.py"], "no temp files may remain");
}

#[test]
fn malformed_declarations_fail_with_a_source_coordinate() {
    let err = build_interface(
        "typedef struct MSH_MESH MSH_MESH;\nint msh_mesh_resize(MSH_MESH* mesh, uint64_t n);",
        "meshly.h",
    )
    .unwrap_err();
    let message = format!("{err}");
    assert!(message.contains("uint64_t"), "got: {message}");
    assert!(message.contains("meshly.h:2"), "got: {message}");
}
