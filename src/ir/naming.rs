//! Classification of API functions by naming convention.
//!
//! meshly names its functions `msh_<type>_<member>` for methods and
//! `msh_<member>` for free functions; the owning type of a method is never
//! expressed in the C signature itself, so it is reconstructed here from
//! the name and the return type alone.

use super::CType;

/// The opaque handle types of the meshly API. Closed set: a new handle in
/// the header means extending this table (and is a generator release).
pub const MSH_HANDLE_TYPES: [&str; 5] = [
    "MSH_SCENE",
    "MSH_MESH",
    "MSH_NODE",
    "MSH_MATERIAL",
    "MSH_CAMERA",
];

/// Functions that belong to no handle type even though their names could be
/// mistaken for methods. Versioned override list, kept in sync with the
/// header by hand.
pub const MSH_FREE_FUNCTIONS: [&str; 5] = [
    "msh_strerror",
    "msh_last_error",
    "msh_loglevel",
    "msh_logfile",
    "msh_log_stderr",
];

/// Functions bound to a handle type under a member name the convention
/// cannot derive. `msh_open` predates the naming scheme and stays for
/// compatibility.
pub const MSH_METHOD_OVERRIDES: [(&str, &str, &str); 1] = [("msh_open", "MSH_SCENE", "open")];

/// The sentinel member name for a type's canonical constructor
/// (`msh_mesh` -> `mesh%init`).
pub const INIT_MEMBER: &str = "init";

const PREFIX: &str = "msh_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Method {
        owner: &'static str,
        member: String,
    },
    Free,
}

/// Look up a type name in the fixed handle set.
pub fn handle_type(name: &str) -> Option<&'static str> {
    MSH_HANDLE_TYPES.iter().find(|h| **h == name).copied()
}

/// Resolve a function to the handle type owning it (and its member name),
/// or classify it as free. Pure function of the name, the return type and
/// the override tables above.
pub fn resolve(name: &str, ret: &CType) -> Binding {
    if let Some((_, owner, member)) = MSH_METHOD_OVERRIDES.iter().find(|(n, _, _)| *n == name) {
        return Binding::Method {
            owner: handle_type(owner).expect("override table names a known handle"),
            member: (*member).to_string(),
        };
    }
    if MSH_FREE_FUNCTIONS.contains(&name) {
        return Binding::Free;
    }

    // msh_mesh_set_points -> MSH_MESH; msh_mesh -> MSH_MESH with the
    // `init` sentinel member.
    let candidate: String = name
        .splitn(3, '_')
        .take(2)
        .collect::<Vec<_>>()
        .join("_")
        .to_uppercase();
    if let Some(owner) = handle_type(&candidate) {
        let member = if name.len() > candidate.len() {
            name[candidate.len() + 1..].to_string()
        } else {
            INIT_MEMBER.to_string()
        };
        return Binding::Method { owner, member };
    }

    // A function returning a handle constructs it even when its name does
    // not follow the convention.
    if let CType::Handle { name: owner, .. } = ret {
        let member = name.strip_prefix(PREFIX).unwrap_or(name).to_string();
        return Binding::Method {
            owner: *owner,
            member,
        };
    }

    Binding::Free
}
