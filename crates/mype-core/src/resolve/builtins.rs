/// Names provided by the runtime; calls to them become system calls
pub const BUILTINS: &[&str] = &[
    "print", "println", "input", "str", "int", "float", "bool", "exit", "assert", "range", "sys",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}
