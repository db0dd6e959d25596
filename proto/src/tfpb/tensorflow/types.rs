use crate::schema::EnumDesc;

/// Element type of a tensor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(i32)]
pub enum DataType {
    #[default]
    DtInvalid = 0,
    DtFloat = 1,
    DtDouble = 2,
    DtInt32 = 3,
    DtUint8 = 4,
    DtInt16 = 5,
    DtInt8 = 6,
    DtString = 7,
    DtComplex64 = 8,
    DtInt64 = 9,
    DtBool = 10,
    DtQint8 = 11,
    DtQuint8 = 12,
    DtQint32 = 13,
    DtBfloat16 = 14,
    DtQint16 = 15,
    DtQuint16 = 16,
    DtUint16 = 17,
    DtComplex128 = 18,
    DtHalf = 19,
    DtResource = 20,
    DtVariant = 21,
    DtUint32 = 22,
    DtUint64 = 23,
}

const ALL: [DataType; 24] = [
    DataType::DtInvalid,
    DataType::DtFloat,
    DataType::DtDouble,
    DataType::DtInt32,
    DataType::DtUint8,
    DataType::DtInt16,
    DataType::DtInt8,
    DataType::DtString,
    DataType::DtComplex64,
    DataType::DtInt64,
    DataType::DtBool,
    DataType::DtQint8,
    DataType::DtQuint8,
    DataType::DtQint32,
    DataType::DtBfloat16,
    DataType::DtQint16,
    DataType::DtQuint16,
    DataType::DtUint16,
    DataType::DtComplex128,
    DataType::DtHalf,
    DataType::DtResource,
    DataType::DtVariant,
    DataType::DtUint32,
    DataType::DtUint64,
];

pub static DATA_TYPE: EnumDesc = EnumDesc {
    name: "tensorflow.DataType",
    values: &[
        (0, "DT_INVALID"),
        (1, "DT_FLOAT"),
        (2, "DT_DOUBLE"),
        (3, "DT_INT32"),
        (4, "DT_UINT8"),
        (5, "DT_INT16"),
        (6, "DT_INT8"),
        (7, "DT_STRING"),
        (8, "DT_COMPLEX64"),
        (9, "DT_INT64"),
        (10, "DT_BOOL"),
        (11, "DT_QINT8"),
        (12, "DT_QUINT8"),
        (13, "DT_QINT32"),
        (14, "DT_BFLOAT16"),
        (15, "DT_QINT16"),
        (16, "DT_QUINT16"),
        (17, "DT_UINT16"),
        (18, "DT_COMPLEX128"),
        (19, "DT_HALF"),
        (20, "DT_RESOURCE"),
        (21, "DT_VARIANT"),
        (22, "DT_UINT32"),
        (23, "DT_UINT64"),
    ],
};

impl DataType {
    pub fn from_i32(value: i32) -> Option<DataType> {
        ALL.get(usize::try_from(value).ok()?).copied()
    }

    pub fn as_str_name(&self) -> &'static str {
        DATA_TYPE.name_of(*self as i32).unwrap_or("DT_INVALID")
    }

    pub fn from_str_name(name: &str) -> Option<DataType> {
        DATA_TYPE.value_of(name).and_then(DataType::from_i32)
    }

    /// Size in bytes of one element, for fixed size numeric types.
    pub fn size_of(&self) -> Option<usize> {
        use DataType::*;
        match self {
            DtBool | DtInt8 | DtUint8 | DtQint8 | DtQuint8 => Some(1),
            DtInt16 | DtUint16 | DtQint16 | DtQuint16 | DtHalf | DtBfloat16 => Some(2),
            DtFloat | DtInt32 | DtUint32 | DtQint32 => Some(4),
            DtDouble | DtInt64 | DtUint64 | DtComplex64 => Some(8),
            DtComplex128 => Some(16),
            DtInvalid | DtString | DtResource | DtVariant => None,
        }
    }
}

impl From<DataType> for i32 {
    fn from(dt: DataType) -> i32 {
        dt as i32
    }
}
