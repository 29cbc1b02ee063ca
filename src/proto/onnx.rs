//! ONNX graph message types
//!
//! Declared with `prost` derives so the field tags line up with
//! `onnx.proto3`. Only the messages the rewrite engine touches are modeled;
//! a host can still encode and decode them with the ONNX wire format.

/// A named, typed attribute attached to a node
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AttributeProto {
    /// Attribute name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Float value
    #[prost(float, tag = "2")]
    pub f: f32,
    /// Int value
    #[prost(int64, tag = "3")]
    pub i: i64,
    /// String value (UTF-8 bytes)
    #[prost(bytes = "vec", tag = "4")]
    pub s: Vec<u8>,
    /// Tensor value
    #[prost(message, optional, tag = "5")]
    pub t: Option<TensorProto>,
    /// Subgraph value
    #[prost(message, optional, tag = "6")]
    pub g: Option<GraphProto>,
    /// Float list
    #[prost(float, repeated, tag = "7")]
    pub floats: Vec<f32>,
    /// Int list
    #[prost(int64, repeated, tag = "8")]
    pub ints: Vec<i64>,
    /// String list
    #[prost(bytes = "vec", repeated, tag = "9")]
    pub strings: Vec<Vec<u8>>,
    /// Tensor list
    #[prost(message, repeated, tag = "10")]
    pub tensors: Vec<TensorProto>,
    /// Subgraph list
    #[prost(message, repeated, tag = "11")]
    pub graphs: Vec<GraphProto>,
    /// Documentation
    #[prost(string, tag = "13")]
    pub doc_string: String,
    /// Which of the value fields is set
    #[prost(enumeration = "attribute_proto::AttributeType", tag = "20")]
    pub r#type: i32,
}

/// Nested types for [`AttributeProto`]
pub mod attribute_proto {
    /// Discriminates the value field of an attribute
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum AttributeType {
        /// Unset
        Undefined = 0,
        /// `f`
        Float = 1,
        /// `i`
        Int = 2,
        /// `s`
        String = 3,
        /// `t`
        Tensor = 4,
        /// `g`
        Graph = 5,
        /// `floats`
        Floats = 6,
        /// `ints`
        Ints = 7,
        /// `strings`
        Strings = 8,
        /// `tensors`
        Tensors = 9,
        /// `graphs`
        Graphs = 10,
    }
}

/// Type and shape metadata for a named tensor
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ValueInfoProto {
    /// Tensor name
    #[prost(string, tag = "1")]
    pub name: String,
    /// Declared type
    #[prost(message, optional, tag = "2")]
    pub r#type: Option<TypeProto>,
    /// Documentation
    #[prost(string, tag = "3")]
    pub doc_string: String,
}

/// A single operation in the graph
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NodeProto {
    /// Input tensor names; an empty string marks an absent optional input
    #[prost(string, repeated, tag = "1")]
    pub input: Vec<String>,
    /// Output tensor names
    #[prost(string, repeated, tag = "2")]
    pub output: Vec<String>,
    /// Unique node name
    #[prost(string, tag = "3")]
    pub name: String,
    /// Operator name
    #[prost(string, tag = "4")]
    pub op_type: String,
    /// Static attributes
    #[prost(message, repeated, tag = "5")]
    pub attribute: Vec<AttributeProto>,
    /// Documentation
    #[prost(string, tag = "6")]
    pub doc_string: String,
    /// Operator domain (empty = default ONNX domain)
    #[prost(string, tag = "7")]
    pub domain: String,
}

/// A computation graph: nodes in topological order plus constants and metadata
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphProto {
    /// Nodes in topological order
    #[prost(message, repeated, tag = "1")]
    pub node: Vec<NodeProto>,
    /// Graph name
    #[prost(string, tag = "2")]
    pub name: String,
    /// Named constant tensors
    #[prost(message, repeated, tag = "5")]
    pub initializer: Vec<TensorProto>,
    /// Documentation
    #[prost(string, tag = "10")]
    pub doc_string: String,
    /// Graph inputs
    #[prost(message, repeated, tag = "11")]
    pub input: Vec<ValueInfoProto>,
    /// Graph outputs
    #[prost(message, repeated, tag = "12")]
    pub output: Vec<ValueInfoProto>,
    /// Metadata for intermediate tensors
    #[prost(message, repeated, tag = "13")]
    pub value_info: Vec<ValueInfoProto>,
}

/// A constant tensor
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorProto {
    /// Dimensions
    #[prost(int64, repeated, tag = "1")]
    pub dims: Vec<i64>,
    /// Element type, see [`tensor_proto::DataType`]
    #[prost(int32, tag = "2")]
    pub data_type: i32,
    /// Float payload
    #[prost(float, repeated, tag = "4")]
    pub float_data: Vec<f32>,
    /// Int32-family payload
    #[prost(int32, repeated, tag = "5")]
    pub int32_data: Vec<i32>,
    /// String payload
    #[prost(bytes = "vec", repeated, tag = "6")]
    pub string_data: Vec<Vec<u8>>,
    /// Int64 payload
    #[prost(int64, repeated, tag = "7")]
    pub int64_data: Vec<i64>,
    /// Tensor name
    #[prost(string, tag = "8")]
    pub name: String,
    /// Little-endian packed payload
    #[prost(bytes = "vec", tag = "9")]
    pub raw_data: Vec<u8>,
    /// Double payload
    #[prost(double, repeated, tag = "10")]
    pub double_data: Vec<f64>,
    /// Unsigned 64-bit payload
    #[prost(uint64, repeated, tag = "11")]
    pub uint64_data: Vec<u64>,
    /// Documentation
    #[prost(string, tag = "12")]
    pub doc_string: String,
}

/// Nested types for [`TensorProto`]
pub mod tensor_proto {
    /// Tensor element types
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum DataType {
        /// Unset
        Undefined = 0,
        /// f32
        Float = 1,
        /// u8
        Uint8 = 2,
        /// i8
        Int8 = 3,
        /// u16
        Uint16 = 4,
        /// i16
        Int16 = 5,
        /// i32
        Int32 = 6,
        /// i64
        Int64 = 7,
        /// string
        String = 8,
        /// bool
        Bool = 9,
        /// f16
        Float16 = 10,
        /// f64
        Double = 11,
        /// u32
        Uint32 = 12,
        /// u64
        Uint64 = 13,
        /// complex64
        Complex64 = 14,
        /// complex128
        Complex128 = 15,
        /// bf16
        Bfloat16 = 16,
    }
}

/// Tensor shape: a list of fixed or symbolic dimensions
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TensorShapeProto {
    /// Dimensions
    #[prost(message, repeated, tag = "1")]
    pub dim: Vec<tensor_shape_proto::Dimension>,
}

/// Nested types for [`TensorShapeProto`]
pub mod tensor_shape_proto {
    /// One dimension of a shape
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Dimension {
        /// Semantic tag
        #[prost(string, tag = "3")]
        pub denotation: String,
        /// Fixed value or symbolic name
        #[prost(oneof = "dimension::Value", tags = "1, 2")]
        pub value: Option<dimension::Value>,
    }

    /// Nested types for [`Dimension`]
    pub mod dimension {
        /// Fixed or symbolic dimension
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Value {
            /// Fixed size
            #[prost(int64, tag = "1")]
            DimValue(i64),
            /// Symbolic name
            #[prost(string, tag = "2")]
            DimParam(String),
        }
    }
}

/// Type of a value
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypeProto {
    /// Semantic tag
    #[prost(string, tag = "6")]
    pub denotation: String,
    /// The concrete type
    #[prost(oneof = "type_proto::Value", tags = "1")]
    pub value: Option<type_proto::Value>,
}

/// Nested types for [`TypeProto`]
pub mod type_proto {
    /// Dense tensor type
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Tensor {
        /// Element type, see [`super::tensor_proto::DataType`]
        #[prost(int32, tag = "1")]
        pub elem_type: i32,
        /// Shape, absent when unknown
        #[prost(message, optional, tag = "2")]
        pub shape: Option<super::TensorShapeProto>,
    }

    /// The concrete type
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        /// Dense tensor
        #[prost(message, tag = "1")]
        TensorType(Tensor),
    }
}
