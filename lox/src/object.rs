use std::fmt;

use crate::{intern, Chunk, StrId};

/// A function object that holds the bytecode of the function along with other
/// metadata
#[derive(Debug)]
pub struct ObjFun {
    /// The name of the function; the empty string names the top-level script
    pub name: StrId,
    /// Number of parameters the function has
    pub arity: u8,
    /// The bytecode chunk of this function
    pub chunk: Chunk,
}

impl ObjFun {
    /// Create a new function object with no parameters and an empty chunk.
    pub fn new(name: StrId) -> Self {
        Self {
            name,
            arity: 0,
            chunk: Chunk::default(),
        }
    }
}

impl fmt::Display for ObjFun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name_str = intern::str(self.name);
        if name_str.is_empty() {
            write!(f, "<script>")
        } else {
            write!(f, "<fn {}>", name_str)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ObjFun;
    use crate::intern;

    #[test]
    fn named_and_script_functions_display_differently() {
        assert_eq!(ObjFun::new(intern::id("fib")).to_string(), "<fn fib>");
        assert_eq!(ObjFun::new(intern::id("")).to_string(), "<script>");
    }
}
