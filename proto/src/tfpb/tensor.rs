//! Conversions between `TensorProto` and flat vectors of elements.
use anyhow::{bail, ensure, format_err};

use super::tensorflow::{DataType, TensorProto, TensorShapeProto};

/// Number of elements of a tensor of this shape, `None` if it does not fit in
/// a `usize`.
pub fn element_count(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// A Rust type a tensor element can be read into or built from.
pub trait Element: Copy + Default + std::fmt::Debug + Send + Sync + 'static {
    const DATA_TYPE: DataType;

    /// Decodes one element from `tensor_content`, in host byte order.
    fn read_content(bytes: &[u8]) -> Self;
    fn write_content(self, out: &mut Vec<u8>);

    /// The typed `*_val` field holding elements of this type.
    fn values(t: &TensorProto) -> Vec<Self>;
    fn set_values(t: &mut TensorProto, values: &[Self]);
}

macro_rules! element {
    ($t: ty, $dt: ident, $field: ident, $to_field: expr, $from_field: expr) => {
        impl Element for $t {
            const DATA_TYPE: DataType = DataType::$dt;

            fn read_content(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$t>()];
                raw.copy_from_slice(bytes);
                <$t>::from_ne_bytes(raw)
            }

            fn write_content(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&<$t>::to_ne_bytes(self))
            }

            fn values(t: &TensorProto) -> Vec<Self> {
                t.$field.iter().map($from_field).collect()
            }

            fn set_values(t: &mut TensorProto, values: &[Self]) {
                t.$field = values.iter().map($to_field).collect();
            }
        }
    };
}

element!(f32, DtFloat, float_val, |x| *x, |x| *x);
element!(f64, DtDouble, double_val, |x| *x, |x| *x);
element!(i32, DtInt32, int_val, |x| *x, |x| *x);
element!(i64, DtInt64, int64_val, |x| *x, |x| *x);
element!(u8, DtUint8, int_val, |x| *x as i32, |x| *x as u8);

impl Element for bool {
    const DATA_TYPE: DataType = DataType::DtBool;

    fn read_content(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_content(self, out: &mut Vec<u8>) {
        out.push(self as u8)
    }

    fn values(t: &TensorProto) -> Vec<Self> {
        t.bool_val.clone()
    }

    fn set_values(t: &mut TensorProto, values: &[Self]) {
        t.bool_val = values.to_vec();
    }
}

impl TensorProto {
    /// Builds a tensor holding `values` in its typed field.
    pub fn from_slice<T: Element>(shape: &[usize], values: &[T]) -> TensorProto {
        let mut t = TensorProto {
            dtype: T::DATA_TYPE.into(),
            tensor_shape: Some(TensorShapeProto::from_dims(shape)),
            ..TensorProto::default()
        };
        T::set_values(&mut t, values);
        t
    }

    pub fn scalar<T: Element>(value: T) -> TensorProto {
        TensorProto::from_slice(&[], &[value])
    }

    pub fn datum_type(&self) -> anyhow::Result<DataType> {
        DataType::from_i32(self.dtype).ok_or_else(|| format_err!("Unknown DataType {}", self.dtype))
    }

    pub fn shape(&self) -> anyhow::Result<Vec<usize>> {
        match &self.tensor_shape {
            None => Ok(vec![]),
            Some(shape) => {
                shape.dims().ok_or_else(|| format_err!("Tensor shape is not fully known"))
            }
        }
    }

    /// Reads all elements, from `tensor_content` when it is populated, from
    /// the typed field otherwise. A single typed value is repeated over the
    /// whole shape.
    pub fn to_vec<T: Element>(&self) -> anyhow::Result<Vec<T>> {
        let dt = self.datum_type()?;
        ensure!(dt == T::DATA_TYPE, "Tensor is {:?}, can not read it as {:?}", dt, T::DATA_TYPE);
        let shape = self.shape()?;
        let size = std::mem::size_of::<T>();
        let Some(len) = element_count(&shape)
            .filter(|len| len.checked_mul(size).is_some_and(|b| b <= isize::MAX as usize))
        else {
            bail!("Tensor shape {:?} is too large", shape)
        };
        if !self.tensor_content.is_empty() {
            ensure!(
                self.tensor_content.len() == len * size,
                "Tensor content is {} bytes, expected {} elements of {} bytes",
                self.tensor_content.len(),
                len,
                size
            );
            return Ok(self.tensor_content.chunks_exact(size).map(T::read_content).collect());
        }
        let values = T::values(self);
        if values.len() == len {
            Ok(values)
        } else if values.len() <= 1 {
            let mut filled = Vec::new();
            filled.try_reserve_exact(len).map_err(|e| {
                format_err!("Can not allocate {} elements for shape {:?}: {}", len, shape, e)
            })?;
            filled.resize(len, values.first().copied().unwrap_or_default());
            Ok(filled)
        } else {
            bail!("Tensor has {} values for {} elements", values.len(), len)
        }
    }
}
