//! msh-bindgen generates the Fortran and Python bindings of the meshly
//! library from its public C API header. The pipeline is a single pass:
//! preprocess the header, parse the declarations, lower them into a typed
//! interface model, and render each requested target from that one model.

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod driver;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod preprocess;
pub mod span;
pub mod token;

pub use config::Config;
pub use driver::run;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
