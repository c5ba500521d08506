mod core;
mod headers;

pub use self::core::{compile_pass, link_pass, log_command};
pub use headers::{list_dependencies, parse_make_rule};
pub use test::test_pass;
