//! Text scanning: physical lines, character-level combinators and operand
//! parsing. Everything here works on borrowed `&str` slices and never
//! allocates except to hand back owned operand names.

pub mod cursor;
pub mod lines;
pub mod operand;
