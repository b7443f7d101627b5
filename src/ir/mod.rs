pub mod naming;

use crate::ast::{Decl, EnumDecl, FuncDecl, HeaderAst, TypeExpr};
use crate::diagnostics::ModelError;

pub use naming::Binding;

/// The fixed scalar vocabulary. Any other base type name in the header is a
/// modeling gap and fails the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Float,
    Double,
    SizeT,
    Int,
    Bool,
}

impl Primitive {
    pub fn from_c_name(name: &str) -> Option<Primitive> {
        match name {
            "float" => Some(Primitive::Float),
            "double" => Some(Primitive::Double),
            "size_t" => Some(Primitive::SizeT),
            "int" => Some(Primitive::Int),
            "bool" => Some(Primitive::Bool),
            _ => None,
        }
    }
}

/// One array extent. Runtime extents come from the pointer level of a
/// pointer-to-array declarator, whose row count only exists at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Fixed(u64),
    Runtime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CType {
    Scalar {
        prim: Primitive,
        is_ptr: bool,
        is_const: bool,
    },
    /// An enum-typed value, by whichever name the declaration used (tag or
    /// typedef alias). Binary-compatible with a native int on both sides.
    Enum {
        name: String,
        is_ptr: bool,
        is_const: bool,
    },
    /// An opaque handle from the fixed set; only ever passed by address.
    Handle {
        name: &'static str,
        is_ptr: bool,
        is_const: bool,
    },
    /// A null-terminated `char*`.
    CStr { is_const: bool },
    Array {
        prim: Primitive,
        dims: Vec<Extent>,
        is_const: bool,
    },
}

impl CType {
    pub fn is_ptr(&self) -> bool {
        match self {
            CType::Scalar { is_ptr, .. }
            | CType::Enum { is_ptr, .. }
            | CType::Handle { is_ptr, .. } => *is_ptr,
            CType::CStr { .. } | CType::Array { .. } => true,
        }
    }

    pub fn is_const(&self) -> bool {
        match self {
            CType::Scalar { is_const, .. }
            | CType::Enum { is_const, .. }
            | CType::Handle { is_const, .. }
            | CType::CStr { is_const }
            | CType::Array { is_const, .. } => *is_const,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub ty: CType,
}

#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub name: String,
    /// `file:line` of the declaration, kept in generated output comments.
    pub coord: String,
    pub ret: CType,
    pub args: Vec<Argument>,
}

impl FunctionSignature {
    /// A function returning an opaque handle constructs that handle, no
    /// matter what it is called.
    pub fn is_constructor(&self) -> bool {
        matches!(self.ret, CType::Handle { .. })
    }

    pub fn binding(&self) -> Binding {
        naming::resolve(&self.name, &self.ret)
    }

    pub fn owning_type(&self) -> Option<&'static str> {
        match self.binding() {
            Binding::Method { owner, .. } => Some(owner),
            Binding::Free => None,
        }
    }

    pub fn member_name(&self) -> Option<String> {
        match self.binding() {
            Binding::Method { member, .. } => Some(member),
            Binding::Free => None,
        }
    }

    /// String-returning functions get a dedicated wrapper shape: the C side
    /// hands back a borrowed `char*`, not a status code.
    pub fn returns_string(&self) -> bool {
        matches!(self.ret, CType::CStr { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    /// The name generated code refers to: the C tag, or the typedef alias
    /// for tagless `typedef enum { .. } name_t;` declarations.
    pub name: String,
    pub alias: Option<String>,
    pub enumerators: Vec<Enumerator>,
}

impl EnumDef {
    /// Assign enumerator values: explicit values are preserved, the rest get
    /// 0, 1, 2, ... in declaration order, counted independently of any
    /// explicit values in the same enum.
    pub fn resolved_values(&self) -> Vec<(&str, i64)> {
        let mut next = 0i64;
        self.enumerators
            .iter()
            .map(|e| match e.value {
                Some(value) => (e.name.as_str(), value),
                None => {
                    let value = next;
                    next += 1;
                    (e.name.as_str(), value)
                }
            })
            .collect()
    }
}

/// The enum type names visible in argument position, built from the parsed
/// unit itself and passed to the type model explicitly.
#[derive(Debug, Clone, Default)]
pub struct EnumRegistry {
    /// (declared name, emitted enum name) pairs; tags and aliases both map
    /// to the name the enum is emitted under.
    entries: Vec<(String, String)>,
}

impl EnumRegistry {
    fn register(&mut self, def: &EnumDef) {
        self.entries.push((def.name.clone(), def.name.clone()));
        if let Some(alias) = &def.alias {
            self.entries.push((alias.clone(), def.name.clone()));
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(declared, _)| declared == name)
    }

    /// The emitted enum name to reference for a declared type name, used by
    /// the Fortran side for `kind(..)` expressions.
    pub fn emitted_name(&self, declared: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == declared)
            .map(|(_, emitted)| emitted.as_str())
    }
}

/// The full typed interface recovered from one header: everything the
/// emitters consume, in declaration order.
#[derive(Debug, Clone)]
pub struct Interface {
    pub enums: Vec<EnumDef>,
    pub functions: Vec<FunctionSignature>,
    pub registry: EnumRegistry,
}

pub fn extract(ast: &HeaderAst) -> Result<Interface, ModelError> {
    let mut enums = Vec::new();
    let mut registry = EnumRegistry::default();
    for decl in &ast.decls {
        if let Decl::Enum(decl) = decl {
            let def = lower_enum(decl)?;
            registry.register(&def);
            enums.push(def);
        }
    }

    let mut functions = Vec::new();
    for decl in &ast.decls {
        if let Decl::Function(decl) = decl {
            functions.push(lower_function(decl, &registry)?);
        }
    }

    Ok(Interface {
        enums,
        functions,
        registry,
    })
}

fn lower_enum(decl: &EnumDecl) -> Result<EnumDef, ModelError> {
    let name = decl
        .tag
        .clone()
        .or_else(|| decl.alias.clone())
        .ok_or_else(|| ModelError::AnonymousEnum {
            coord: decl.coord.clone(),
        })?;
    Ok(EnumDef {
        name,
        alias: decl.alias.clone(),
        enumerators: decl
            .enumerators
            .iter()
            .map(|e| Enumerator {
                name: e.name.clone(),
                value: e.value,
            })
            .collect(),
    })
}

fn lower_function(
    decl: &FuncDecl,
    registry: &EnumRegistry,
) -> Result<FunctionSignature, ModelError> {
    let ret = build_type(&decl.ret, registry, &decl.coord)?;
    let mut args = Vec::with_capacity(decl.params.len());
    for param in &decl.params {
        args.push(Argument {
            name: param.name.clone(),
            ty: build_type(&param.ty, registry, &decl.coord)?,
        });
    }
    Ok(FunctionSignature {
        name: decl.name.clone(),
        coord: decl.coord.clone(),
        ret,
        args,
    })
}

/// Convert one raw declarator into its `CType`. The accepted shapes form a
/// closed set; everything else is a hole in the model and aborts the run.
fn build_type(expr: &TypeExpr, registry: &EnumRegistry, coord: &str) -> Result<CType, ModelError> {
    match expr {
        TypeExpr::Ptr { inner } => match &**inner {
            TypeExpr::Array { inner, len } => {
                let (prim, is_const) = array_element(inner, coord)?;
                Ok(CType::Array {
                    prim,
                    dims: vec![Extent::Runtime, Extent::Fixed(*len)],
                    is_const,
                })
            }
            TypeExpr::Named {
                name,
                is_const,
                ..
            } => {
                if name == "char" {
                    return Ok(CType::CStr {
                        is_const: *is_const,
                    });
                }
                if let Some(handle) = naming::handle_type(name) {
                    return Ok(CType::Handle {
                        name: handle,
                        is_ptr: true,
                        is_const: *is_const,
                    });
                }
                if registry.contains(name) {
                    return Ok(CType::Enum {
                        name: name.clone(),
                        is_ptr: true,
                        is_const: *is_const,
                    });
                }
                match Primitive::from_c_name(name) {
                    Some(prim) => Ok(CType::Scalar {
                        prim,
                        is_ptr: true,
                        is_const: *is_const,
                    }),
                    None => Err(ModelError::UnknownType {
                        name: name.clone(),
                        coord: coord.to_string(),
                    }),
                }
            }
            TypeExpr::Ptr { .. } => Err(ModelError::UnsupportedType {
                detail: "pointer to pointer".to_string(),
                coord: coord.to_string(),
            }),
        },
        TypeExpr::Array { inner, len } => match &**inner {
            TypeExpr::Array {
                inner: element,
                len: inner_len,
            } => {
                let (prim, is_const) = array_element(element, coord)?;
                Ok(CType::Array {
                    prim,
                    dims: vec![Extent::Fixed(*len), Extent::Fixed(*inner_len)],
                    is_const,
                })
            }
            _ => {
                let (prim, is_const) = array_element(inner, coord)?;
                Ok(CType::Array {
                    prim,
                    dims: vec![Extent::Fixed(*len)],
                    is_const,
                })
            }
        },
        TypeExpr::Named {
            name,
            is_const,
            ..
        } => {
            if naming::handle_type(name).is_some() {
                return Err(ModelError::UnsupportedType {
                    detail: format!("opaque handle `{name}` passed by value"),
                    coord: coord.to_string(),
                });
            }
            if registry.contains(name) {
                return Ok(CType::Enum {
                    name: name.clone(),
                    is_ptr: false,
                    is_const: *is_const,
                });
            }
            match Primitive::from_c_name(name) {
                Some(prim) => Ok(CType::Scalar {
                    prim,
                    is_ptr: false,
                    is_const: *is_const,
                }),
                None => Err(ModelError::UnknownType {
                    name: name.clone(),
                    coord: coord.to_string(),
                }),
            }
        }
    }
}

fn array_element(expr: &TypeExpr, coord: &str) -> Result<(Primitive, bool), ModelError> {
    match expr {
        TypeExpr::Named {
            name,
            is_const,
            ..
        } => match Primitive::from_c_name(name) {
            Some(prim) => Ok((prim, *is_const)),
            None => Err(ModelError::UnknownType {
                name: name.clone(),
                coord: coord.to_string(),
            }),
        },
        _ => Err(ModelError::UnsupportedType {
            detail: "array of non-scalar elements".to_string(),
            coord: coord.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_header;

    fn extract_source(source: &str) -> Interface {
        let ast = parse_header(source, "meshly.h").expect("parsing failed");
        extract(&ast).expect("extraction failed")
    }

    #[test]
    fn gap_filling_is_independent_of_explicit_values() {
        let iface = extract_source("enum E { A = 5, B, C = 2, D };");
        let values = iface.enums[0].resolved_values();
        assert_eq!(
            values,
            vec![("A", 5), ("B", 0), ("C", 2), ("D", 1)],
            "unspecified values must count from 0 on their own"
        );
    }

    #[test]
    fn pointer_to_array_has_runtime_leading_extent() {
        let iface =
            extract_source("int msh_mesh_set_points(MSH_MESH* mesh, float (*points)[3], size_t n);");
        let func = &iface.functions[0];
        match &func.args[1].ty {
            CType::Array { prim, dims, .. } => {
                assert_eq!(*prim, Primitive::Float);
                assert_eq!(dims.as_slice(), &[Extent::Runtime, Extent::Fixed(3)]);
            }
            other => panic!("expected an array type, got {other:?}"),
        }
    }

    #[test]
    fn plain_matrix_has_fixed_extents() {
        let iface = extract_source("int msh_camera_matrix(const MSH_CAMERA* camera, double mat[3][3]);");
        match &iface.functions[0].args[1].ty {
            CType::Array { dims, .. } => {
                assert_eq!(dims.as_slice(), &[Extent::Fixed(3), Extent::Fixed(3)]);
            }
            other => panic!("expected an array type, got {other:?}"),
        }
    }

    #[test]
    fn char_pointer_is_a_string() {
        let iface = extract_source("int msh_logfile(const char* path);");
        assert_eq!(
            iface.functions[0].args[0].ty,
            CType::CStr { is_const: true }
        );
    }

    #[test]
    fn enum_arguments_resolve_through_the_registry() {
        let iface = extract_source(
            "typedef enum MSH_LOG_LEVEL { SILENT } msh_log_level_t;\nint msh_loglevel(msh_log_level_t level);",
        );
        match &iface.functions[0].args[0].ty {
            CType::Enum { name, is_ptr, .. } => {
                assert_eq!(name, "msh_log_level_t");
                assert!(!is_ptr);
            }
            other => panic!("expected an enum type, got {other:?}"),
        }
        assert_eq!(
            iface.registry.emitted_name("msh_log_level_t"),
            Some("MSH_LOG_LEVEL")
        );
    }

    #[test]
    fn unknown_type_names_are_fatal() {
        let ast = parse_header("int msh_mesh_resize(MSH_MESH* mesh, uint64_t n);", "meshly.h")
            .expect("parsing failed");
        let err = extract(&ast).unwrap_err();
        match err {
            ModelError::UnknownType { name, coord } => {
                assert_eq!(name, "uint64_t");
                assert_eq!(coord, "meshly.h:1");
            }
            other => panic!("expected an unknown-type error, got {other:?}"),
        }
    }

    #[test]
    fn by_value_handles_are_rejected() {
        let ast = parse_header("int msh_mesh_check(MSH_MESH mesh);", "meshly.h")
            .expect("parsing failed");
        assert!(matches!(
            extract(&ast),
            Err(ModelError::UnsupportedType { .. })
        ));
    }
}
