use std::fmt;

use anyhow::Context;
use ndarray::{ArrayD, IxDyn};
use tfbind_proto::tfpb::{Element, element_count};
use tfbind_proto::tfpb::tensorflow::{DataType, TensorProto};

/// Element types the engine computes on.
pub trait Datum: Element + PartialEq {
    fn wrap(array: ArrayD<Self>) -> Tensor;
    fn array(t: &Tensor) -> Option<&ArrayD<Self>>;
}

#[derive(Clone, PartialEq)]
enum Data {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    U8(ArrayD<u8>),
    Bool(ArrayD<bool>),
}

macro_rules! dispatch {
    ($data: expr, $a: ident => $e: expr) => {
        match $data {
            Data::F32($a) => $e,
            Data::F64($a) => $e,
            Data::I32($a) => $e,
            Data::I64($a) => $e,
            Data::U8($a) => $e,
            Data::Bool($a) => $e,
        }
    };
}

macro_rules! datum {
    ($t: ty, $v: ident) => {
        impl Datum for $t {
            fn wrap(array: ArrayD<$t>) -> Tensor {
                let array = if array.is_standard_layout() {
                    array
                } else {
                    array.as_standard_layout().into_owned()
                };
                Tensor(Data::$v(array))
            }

            fn array(t: &Tensor) -> Option<&ArrayD<$t>> {
                match &t.0 {
                    Data::$v(a) => Some(a),
                    _ => None,
                }
            }
        }
    };
}

datum!(f32, F32);
datum!(f64, F64);
datum!(i32, I32);
datum!(i64, I64);
datum!(u8, U8);
datum!(bool, Bool);

/// A dense tensor, always in standard (row major, contiguous) layout.
#[derive(Clone, PartialEq)]
pub struct Tensor(Data);

impl Tensor {
    pub fn datum_type(&self) -> DataType {
        match &self.0 {
            Data::F32(_) => DataType::DtFloat,
            Data::F64(_) => DataType::DtDouble,
            Data::I32(_) => DataType::DtInt32,
            Data::I64(_) => DataType::DtInt64,
            Data::U8(_) => DataType::DtUint8,
            Data::Bool(_) => DataType::DtBool,
        }
    }

    pub fn shape(&self) -> &[usize] {
        dispatch!(&self.0, a => a.shape())
    }

    pub fn len(&self) -> usize {
        dispatch!(&self.0, a => a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_array<T: Datum>(array: ArrayD<T>) -> Tensor {
        T::wrap(array)
    }

    pub fn from_shape<T: Datum>(shape: &[usize], data: Vec<T>) -> anyhow::Result<Tensor> {
        let array = ArrayD::from_shape_vec(IxDyn(shape), data).map_err(|e| {
            failure!(InvalidArgument, "Can not build a tensor of shape {:?}: {}", shape, e)
        })?;
        Ok(T::wrap(array))
    }

    pub fn scalar<T: Datum>(value: T) -> Tensor {
        T::wrap(ndarray::arr0(value).into_dyn())
    }

    pub fn to_array_view<T: Datum>(&self) -> anyhow::Result<&ArrayD<T>> {
        T::array(self).ok_or_else(|| {
            failure!(
                InvalidArgument,
                "Tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                T::DATA_TYPE
            )
        })
    }

    /// The elements, in host byte order.
    pub fn as_bytes(&self) -> &[u8] {
        fn bytes<T>(a: &ArrayD<T>) -> &[u8] {
            match a.as_slice() {
                Some(s) => unsafe {
                    std::slice::from_raw_parts(s.as_ptr() as *const u8, std::mem::size_of_val(s))
                },
                None => &[],
            }
        }
        dispatch!(&self.0, a => bytes(a))
    }

    /// Builds a tensor from elements laid out in host byte order.
    pub fn from_bytes(dt: DataType, shape: &[usize], bytes: &[u8]) -> anyhow::Result<Tensor> {
        fn read<T: Datum>(shape: &[usize], bytes: &[u8]) -> anyhow::Result<Tensor> {
            let size = std::mem::size_of::<T>();
            let Some(expected) = element_count(shape).and_then(|len| len.checked_mul(size)) else {
                fail!(InvalidArgument, "Tensor shape {:?} is too large", shape)
            };
            if bytes.len() != expected {
                fail!(
                    InvalidArgument,
                    "Expected {} bytes for a {:?} tensor of shape {:?}, got {}",
                    expected,
                    T::DATA_TYPE,
                    shape,
                    bytes.len()
                );
            }
            Tensor::from_shape(shape, bytes.chunks_exact(size).map(T::read_content).collect())
        }
        match dt {
            DataType::DtFloat => read::<f32>(shape, bytes),
            DataType::DtDouble => read::<f64>(shape, bytes),
            DataType::DtInt32 => read::<i32>(shape, bytes),
            DataType::DtInt64 => read::<i64>(shape, bytes),
            DataType::DtUint8 => read::<u8>(shape, bytes),
            DataType::DtBool => read::<bool>(shape, bytes),
            _ => fail!(Unimplemented, "Unsupported tensor type {:?}", dt),
        }
    }

    pub fn from_proto(proto: &TensorProto) -> anyhow::Result<Tensor> {
        fn read<T: Datum>(proto: &TensorProto) -> anyhow::Result<Tensor> {
            let shape = proto.shape().map_err(|e| failure!(InvalidArgument, "{}", e))?;
            let values = proto.to_vec::<T>().map_err(|e| failure!(InvalidArgument, "{}", e))?;
            Tensor::from_shape(&shape, values)
        }
        let dt = proto.datum_type().map_err(|e| failure!(InvalidArgument, "{}", e))?;
        let tensor = match dt {
            DataType::DtFloat => read::<f32>(proto),
            DataType::DtDouble => read::<f64>(proto),
            DataType::DtInt32 => read::<i32>(proto),
            DataType::DtInt64 => read::<i64>(proto),
            DataType::DtUint8 => read::<u8>(proto),
            DataType::DtBool => read::<bool>(proto),
            _ => fail!(Unimplemented, "Unsupported tensor type {:?}", dt),
        };
        tensor.context("Decoding tensor")
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?} ", self.shape(), self.datum_type())?;
        dispatch!(&self.0, a => write!(f, "{:?}", a.as_slice().unwrap_or(&[])))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bytes_roundtrip() {
        let t = Tensor::from_shape(&[2, 2], vec![1i64, -2, 3, 4]).unwrap();
        let back = Tensor::from_bytes(DataType::DtInt64, &[2, 2], t.as_bytes()).unwrap();
        assert_eq!(t, back);
        assert_eq!(t.as_bytes().len(), 32);
    }

    #[test]
    fn oversized_shapes() {
        let e = Tensor::from_bytes(DataType::DtFloat, &[usize::MAX, 2], &[]).unwrap_err();
        assert_eq!(crate::Code::of(&e), crate::Code::InvalidArgument);
        let proto = TensorProto::from_slice(&[1 << 40, 1 << 40], &[1i32]);
        let e = Tensor::from_proto(&proto).unwrap_err();
        assert_eq!(crate::Code::of(&e), crate::Code::InvalidArgument);
    }

    #[test]
    fn wrong_byte_count() {
        let e = Tensor::from_bytes(DataType::DtFloat, &[3], &[0u8; 8]).unwrap_err();
        assert_eq!(crate::Code::of(&e), crate::Code::InvalidArgument);
    }

    #[test]
    fn non_standard_layout_is_normalized() {
        let a = ndarray::arr2(&[[1f32, 2.], [3., 4.]]).into_dyn();
        let t = Tensor::from_array(a.t().to_owned());
        assert_eq!(t.as_bytes().len(), 16);
        let back = Tensor::from_bytes(DataType::DtFloat, &[2, 2], t.as_bytes()).unwrap();
        assert_eq!(back.to_array_view::<f32>().unwrap().as_slice().unwrap(), &[1., 3., 2., 4.]);
    }

    #[test]
    fn from_proto_broadcasts_single_value() {
        let proto = TensorProto::from_slice(&[2, 3], &[0.5f32]);
        let t = Tensor::from_proto(&proto).unwrap();
        assert_eq!(t.shape(), &[2, 3]);
        assert!(t.to_array_view::<f32>().unwrap().iter().all(|x| *x == 0.5));
    }

    #[test]
    fn typed_access_checks_type() {
        let t = Tensor::scalar(true);
        assert!(t.to_array_view::<bool>().is_ok());
        assert!(t.to_array_view::<u8>().is_err());
    }
}
