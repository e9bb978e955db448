/// One-byte instruction codes. Operands follow the opcode little-endian:
/// 8 bytes for `PushInt`, 4 bytes for every slot, pool index, jump target
/// and line number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    PushInt = 0x01,
    PushString = 0x02,
    PushVariable = 0x03,
    StoreVariable = 0x04,

    Add = 0x10,
    Sub = 0x11,
    Mul = 0x12,
    Div = 0x13,
    Concat = 0x14,
    And = 0x15,
    Not = 0x16,

    IsLessInt = 0x20,
    IsLessString = 0x21,
    IsLessBool = 0x22,
    IsEqualInt = 0x23,
    IsEqualString = 0x24,
    IsEqualBool = 0x25,
    IsLessOrEqualInt = 0x26,

    JumpIfTrue = 0x30,

    PrintInt = 0x40,
    PrintString = 0x41,
    ReadInt = 0x42,
    ReadString = 0x43,
    Assert = 0x44,
}

impl Opcode {
    const ALL: [Opcode; 24] = [
        Opcode::PushInt,
        Opcode::PushString,
        Opcode::PushVariable,
        Opcode::StoreVariable,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Concat,
        Opcode::And,
        Opcode::Not,
        Opcode::IsLessInt,
        Opcode::IsLessString,
        Opcode::IsLessBool,
        Opcode::IsEqualInt,
        Opcode::IsEqualString,
        Opcode::IsEqualBool,
        Opcode::IsLessOrEqualInt,
        Opcode::JumpIfTrue,
        Opcode::PrintInt,
        Opcode::PrintString,
        Opcode::ReadInt,
        Opcode::ReadString,
        Opcode::Assert,
    ];

    /// Width in bytes of the operand that follows this opcode.
    pub fn operand_width(self) -> usize {
        match self {
            Opcode::PushInt => 8,
            Opcode::PushString
            | Opcode::PushVariable
            | Opcode::StoreVariable
            | Opcode::JumpIfTrue
            | Opcode::Assert => 4,
            _ => 0,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::PushInt => "PUSH_INT",
            Opcode::PushString => "PUSH_STRING",
            Opcode::PushVariable => "PUSH_VARIABLE",
            Opcode::StoreVariable => "STORE_VARIABLE",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Concat => "CONCAT",
            Opcode::And => "AND",
            Opcode::Not => "NOT",
            Opcode::IsLessInt => "IS_LESS_INT",
            Opcode::IsLessString => "IS_LESS_STRING",
            Opcode::IsLessBool => "IS_LESS_BOOL",
            Opcode::IsEqualInt => "IS_EQUAL_INT",
            Opcode::IsEqualString => "IS_EQUAL_STRING",
            Opcode::IsEqualBool => "IS_EQUAL_BOOL",
            Opcode::IsLessOrEqualInt => "IS_LESS_OR_EQUAL_INT",
            Opcode::JumpIfTrue => "JUMP_IF_TRUE",
            Opcode::PrintInt => "PRINT_INT",
            Opcode::PrintString => "PRINT_STRING",
            Opcode::ReadInt => "READ_INT",
            Opcode::ReadString => "READ_STRING",
            Opcode::Assert => "ASSERT",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Opcode::ALL
            .iter()
            .copied()
            .find(|opcode| *opcode as u8 == byte)
            .ok_or(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_opcode() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::try_from(opcode as u8), Ok(opcode));
        }
        assert_eq!(Opcode::try_from(0x00), Err(0x00));
        assert_eq!(Opcode::try_from(0xff), Err(0xff));
    }
}
