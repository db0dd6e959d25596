use std::fmt;
use std::ptr::null_mut;

use ndarray::{ArrayBase, ArrayD, ArrayViewD, Data, Dimension, IxDyn};
use tfbind_engine as sys;
use tfbind_proto::tfpb::{Element, element_count};

use crate::{DataType, Error, Result, Status};

/// Rust element types a tensor can hold.
pub trait TensorType: Element + PartialEq {}

impl TensorType for f32 {}
impl TensorType for f64 {}
impl TensorType for i32 {}
impl TensorType for i64 {}
impl TensorType for u8 {}
impl TensorType for bool {}

wrapper!(pub Tensor, TfbTensor, tfb_tensor_delete);

// Tensors are immutable once built.
unsafe impl Send for Tensor {}
unsafe impl Sync for Tensor {}

impl Tensor {
    /// Builds a tensor of the given shape, `data` holding its elements in
    /// row major order.
    pub fn new<T: TensorType>(shape: &[usize], data: &[T]) -> Result<Tensor> {
        let Some(len) = element_count(shape) else {
            return Err(Error::InvalidArgument(format!("Shape {shape:?} is too large")));
        };
        if len != data.len() {
            return Err(Error::InvalidArgument(format!(
                "Shape {:?} needs {} elements, got {}",
                shape,
                len,
                data.len()
            )));
        }
        let mut content = Vec::with_capacity(std::mem::size_of_val(data));
        for x in data {
            x.write_content(&mut content);
        }
        Tensor::from_raw(T::DATA_TYPE, shape, &content)
    }

    fn from_raw(dt: DataType, shape: &[usize], content: &[u8]) -> Result<Tensor> {
        let dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
        let status = Status::new();
        let mut tensor = null_mut();
        unsafe {
            sys::tfb_tensor_new(
                dt.into(),
                dims.as_ptr(),
                dims.len(),
                content.as_ptr() as _,
                content.len(),
                &mut tensor,
                status.0,
            )
        };
        status.check().map_err(|(_, message)| Error::InvalidArgument(message))?;
        Ok(Tensor(tensor))
    }

    pub fn from_array<T, S, D>(array: &ArrayBase<S, D>) -> Result<Tensor>
    where
        T: TensorType,
        S: Data<Elem = T>,
        D: Dimension,
    {
        let data: Vec<T> = array.iter().copied().collect();
        Tensor::new(array.shape(), &data)
    }

    pub fn scalar<T: TensorType>(value: T) -> Result<Tensor> {
        Tensor::new(&[], &[value])
    }

    pub fn datum_type(&self) -> DataType {
        DataType::from_i32(unsafe { sys::tfb_tensor_type(self.0) }).unwrap_or_default()
    }

    pub fn shape(&self) -> Vec<usize> {
        unsafe {
            (0..sys::tfb_tensor_num_dims(self.0))
                .map(|ix| sys::tfb_tensor_dim(self.0, ix) as usize)
                .collect()
        }
    }

    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn as_bytes(&self) -> &[u8] {
        unsafe {
            let len = sys::tfb_tensor_byte_size(self.0);
            if len == 0 {
                return &[];
            }
            std::slice::from_raw_parts(sys::tfb_tensor_data(self.0) as *const u8, len)
        }
    }

    pub fn as_slice<T: TensorType>(&self) -> Result<&[T]> {
        if self.datum_type() != T::DATA_TYPE {
            return Err(Error::InvalidArgument(format!(
                "Tensor is {:?}, accessed as {:?}",
                self.datum_type(),
                T::DATA_TYPE
            )));
        }
        let bytes = self.as_bytes();
        if bytes.is_empty() {
            return Ok(&[]);
        }
        // the engine keeps elements in a properly aligned buffer of T
        Ok(unsafe {
            std::slice::from_raw_parts(
                bytes.as_ptr() as *const T,
                bytes.len() / std::mem::size_of::<T>(),
            )
        })
    }

    pub fn to_array_view<T: TensorType>(&self) -> Result<ArrayViewD<'_, T>> {
        ArrayViewD::from_shape(IxDyn(&self.shape()), self.as_slice::<T>()?)
            .map_err(|e| Error::InvalidArgument(e.to_string()))
    }

    pub fn to_array<T: TensorType>(&self) -> Result<ArrayD<T>> {
        Ok(self.to_array_view::<T>()?.to_owned())
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Tensor) -> bool {
        self.datum_type() == other.datum_type()
            && self.shape() == other.shape()
            && self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn values<T: TensorType>(t: &Tensor, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, " {:?}", t.as_slice::<T>().unwrap_or(&[]))
        }
        write!(f, "Tensor {:?} {:?}", self.shape(), self.datum_type())?;
        match self.datum_type() {
            DataType::DtFloat => values::<f32>(self, f),
            DataType::DtDouble => values::<f64>(self, f),
            DataType::DtInt32 => values::<i32>(self, f),
            DataType::DtInt64 => values::<i64>(self, f),
            DataType::DtUint8 => values::<u8>(self, f),
            DataType::DtBool => values::<bool>(self, f),
            _ => Ok(()),
        }
    }
}
