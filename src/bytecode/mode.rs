use bitflags::bitflags;

bitflags! {
    /// Operand shapes used by one instruction.
    ///
    /// At most one of `IMM`/`REG`/`DIR` is set per slot. An empty mode is a
    /// zero-operand instruction; `LABEL` marks a jump-target operand.
    #[derive(Default)]
    pub struct OperandMode: u16 {
        const LABEL = 0x0001;

        const IMM1 = 0x0010;
        const REG1 = 0x0020;
        const DIR1 = 0x0040;

        const IMM2 = 0x0100;
        const REG2 = 0x0200;
        const DIR2 = 0x0400;
    }
}

impl OperandMode {
    /// Const-friendly union of two modes, for the instruction table.
    pub const fn with(self, other: OperandMode) -> OperandMode {
        OperandMode::from_bits_truncate(self.bits() | other.bits())
    }

    fn slot_name(self, imm: OperandMode, reg: OperandMode, dir: OperandMode) -> Option<&'static str> {
        if self.contains(imm) {
            Some("imm")
        } else if self.contains(reg) {
            Some("reg")
        } else if self.contains(dir) {
            Some("dir")
        } else {
            None
        }
    }
}

impl std::fmt::Display for OperandMode {
    /// `none`, `label`, `reg`, `dir, imm`, ...
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        if self.contains(OperandMode::LABEL) {
            return write!(f, "label");
        }

        let first = self.slot_name(OperandMode::IMM1, OperandMode::REG1, OperandMode::DIR1);
        let second = self.slot_name(OperandMode::IMM2, OperandMode::REG2, OperandMode::DIR2);
        match (first, second) {
            (Some(a), Some(b)) => write!(f, "{}, {}", a, b),
            (Some(a), None) => write!(f, "{}", a),
            (None, Some(b)) => write!(f, "?, {}", b),
            (None, None) => write!(f, "none"),
        }
    }
}
