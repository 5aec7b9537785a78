use std::fmt;

use serde::{Deserialize, Serialize};

/// Element type of a tensor's samples.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dtype {
    Bool = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    I8 = 5,
    I16 = 6,
    I32 = 7,
    I64 = 8,
    F32 = 9,
    F64 = 10,
}

impl Dtype {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Dtype::Bool),
            1 => Some(Dtype::U8),
            2 => Some(Dtype::U16),
            3 => Some(Dtype::U32),
            4 => Some(Dtype::U64),
            5 => Some(Dtype::I8),
            6 => Some(Dtype::I16),
            7 => Some(Dtype::I32),
            8 => Some(Dtype::I64),
            9 => Some(Dtype::F32),
            10 => Some(Dtype::F64),
            _ => None,
        }
    }

    pub const fn itemsize(self) -> usize {
        match self {
            Dtype::Bool | Dtype::U8 | Dtype::I8 => 1,
            Dtype::U16 | Dtype::I16 => 2,
            Dtype::U32 | Dtype::I32 | Dtype::F32 => 4,
            Dtype::U64 | Dtype::I64 | Dtype::F64 => 8,
        }
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Dtype::F32 | Dtype::F64)
    }

    pub const fn is_signed(self) -> bool {
        matches!(self, Dtype::I8 | Dtype::I16 | Dtype::I32 | Dtype::I64)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Dtype::Bool => "bool",
            Dtype::U8 => "uint8",
            Dtype::U16 => "uint16",
            Dtype::U32 => "uint32",
            Dtype::U64 => "uint64",
            Dtype::I8 => "int8",
            Dtype::I16 => "int16",
            Dtype::I32 => "int32",
            Dtype::I64 => "int64",
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_round_trip() {
        for raw in 0..=10u8 {
            let dtype = Dtype::from_u8(raw).unwrap();
            assert_eq!(dtype as u8, raw);
        }
        assert_eq!(Dtype::from_u8(11), None);
    }

    #[test]
    fn item_sizes() {
        assert_eq!(Dtype::Bool.itemsize(), 1);
        assert_eq!(Dtype::I16.itemsize(), 2);
        assert_eq!(Dtype::F32.itemsize(), 4);
        assert_eq!(Dtype::U64.itemsize(), 8);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Dtype::F32).unwrap(), "\"f32\"");
        let dtype: Dtype = serde_json::from_str("\"u16\"").unwrap();
        assert_eq!(dtype, Dtype::U16);
    }
}
